use reqwest::header::{COOKIE, SET_COOKIE};
use serde::Deserialize;

// Mirrors the server's response body.
#[derive(Debug, Deserialize)]
struct RollResponse {
    result: i8,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    histogram: Vec<u64>,
    last_draw_time: Option<f64>,
}

fn session_from(response: &reqwest::Response) -> Option<String> {
    let raw = response.headers().get(SET_COOKIE)?.to_str().ok()?;
    let pair = raw.split(';').next()?;
    Some(pair.trim().to_string())
}

async fn roll(client: &reqwest::Client, url: &str, session: Option<&str>) -> Result<(i8, Option<String>), reqwest::Error> {
    let mut request = client.post(url);
    if let Some(session) = session {
        request = request.header(COOKIE, session);
    }
    let response = request.send().await?;
    let issued = session_from(&response);
    let body = response.json::<RollResponse>().await?;
    Ok((body.result, issued))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base_url = std::env::var("GONG_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
    let roll_url = format!("{}/", base_url);
    let client = reqwest::Client::new();

    println!("--- GONG RNG TEST CLIENT ---");

    println!("\n[1] First roll...");
    let (result, issued) = roll(&client, &roll_url, None).await?;
    let session = issued.ok_or("server did not issue a session cookie")?;
    println!("Result: {}  (cookie: {})", result, session);

    println!("\n[2] Immediate re-roll (expect -1 from cooldown)...");
    let (result, issued) = roll(&client, &roll_url, Some(&session)).await?;
    println!("Result: {}  (new cookie issued: {})", result, issued.is_some());

    println!("\n[3] Waiting out the cooldown, then firing 10 concurrent rolls...");
    tokio::time::sleep(tokio::time::Duration::from_secs(6)).await;
    let burst = (0..10).map(|_| roll(&client, &roll_url, Some(&session)));
    let results = futures::future::join_all(burst).await;
    let accepted = results
        .iter()
        .filter(|r| matches!(r, Ok((value, _)) if *value != -1))
        .count();
    println!("Accepted: {} of {}", accepted, results.len());

    println!("\n[4] History...");
    let history = client
        .get(format!("{}/history", base_url))
        .header(COOKIE, &session)
        .send()
        .await?
        .json::<HistoryResponse>()
        .await?;
    println!(
        "Total draws: {}  last draw at: {:?}",
        history.histogram.iter().sum::<u64>(),
        history.last_draw_time
    );

    Ok(())
}
