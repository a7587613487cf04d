use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    config::CookieConfig,
    data::ClientRecord,
    error::AppError,
    identity::SessionToken,
    state::SharedState,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct RollResponse {
    pub result: i8,
}

// ==============================================================================
// === REST API Handlers
// =============================================================================

#[instrument(skip(state, jar))]
pub async fn roll_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<RollResponse>), AppError> {
    let cookie_config = &state.config.cookie;
    let presented = jar.get(&cookie_config.name).map(|c| c.value().to_string());

    let roll = state.roll_service.roll(presented.as_deref()).await?;

    let jar = if roll.issued {
        tracing::info!(token = %roll.token, "Issuing session cookie to new client");
        jar.add(session_cookie(cookie_config, &roll.token))
    } else {
        jar
    };

    Ok((jar, Json(RollResponse { result: roll.outcome.wire_value() })))
}

#[instrument(skip(state, jar))]
pub async fn history_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<Json<ClientRecord>, AppError> {
    let token = jar
        .get(&state.config.cookie.name)
        .and_then(|c| SessionToken::parse(c.value()))
        .ok_or(AppError::MissingSession)?;

    let record = state.roll_service.store().get(&token).await?;
    Ok(Json(record))
}

/// Readable from scripts, sent cross-site, secure unless configured otherwise.
fn session_cookie(config: &CookieConfig, token: &SessionToken) -> Cookie<'static> {
    let mut builder = Cookie::build((config.name.clone(), token.to_string()))
        .http_only(false)
        .secure(config.secure)
        .same_site(SameSite::None)
        .path("/");

    if let Some(domain) = &config.domain {
        builder = builder.domain(domain.clone());
    }
    builder.build()
}
