pub mod clock;
pub mod config;
pub mod data;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod rank;
pub mod service;
pub mod state;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use config::{Config, StorageBackend, StorageConfig};
use handlers::rest;
use state::{AppState, SharedState};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::data::{ClientStateStore, FileBackend, MemoryBackend, RecordBackend, RedisBackend};
use crate::error::AppError;
use crate::rank::{Sampler, ThreadRngSource, GONG_TABLE};
use crate::service::RollService;

pub fn build_backend(storage: &StorageConfig) -> Result<Arc<dyn RecordBackend>, AppError> {
    let backend: Arc<dyn RecordBackend> = match storage.backend {
        StorageBackend::File => {
            tracing::info!(dir = %storage.data_dir.display(), "Using file storage");
            Arc::new(FileBackend::new(&storage.data_dir)?)
        }
        StorageBackend::Redis => {
            tracing::info!("Using Redis storage");
            Arc::new(RedisBackend::new(redis::Client::open(storage.redis_url.as_str())?))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, records are lost on restart");
            Arc::new(MemoryBackend::default())
        }
    };
    Ok(backend)
}

pub fn create_app(config: Config) -> Result<Router, AppError> {
    let backend = build_backend(&config.storage)?;
    let store = Arc::new(ClientStateStore::new(backend, config.roll.cooldown_secs));
    let roll_service = RollService::new(store, Sampler::new(Arc::new(GONG_TABLE)), Arc::new(ThreadRngSource));

    let state = Arc::new(AppState {
        roll_service,
        config: Arc::new(config),
    });
    Ok(router(state))
}

pub fn router(state: SharedState) -> Router {
    let config = state.config.clone();

    let origins: Vec<HeaderValue> = config
        .cors
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::list(origins))
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    let roll_path = if config.roll.path.starts_with('/') {
        config.roll.path.clone()
    } else {
        format!("/{}", config.roll.path)
    };

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/history", get(rest::history_handler))
        .route(&roll_path, post(rest::roll_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default().include_headers(true)))
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CookieConfig, CorsConfig, LoggingConfig, RollConfig, ServerConfig};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn test_config(backend: StorageBackend, data_dir: std::path::PathBuf) -> Config {
        Config {
            server: ServerConfig { addr: "0.0.0.0:0".to_string() },
            storage: StorageConfig {
                backend,
                data_dir,
                redis_url: "redis://127.0.0.1:6379/".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string() },
            roll: RollConfig { path: "/roll".to_string(), cooldown_secs: 5.0 },
            cookie: CookieConfig { name: "session_key".to_string(), domain: None, secure: true },
            cors: CorsConfig { allowed_origins: vec!["https://jaydengong.com".to_string()] },
        }
    }

    async fn post_roll(app: &Router, cookie: Option<&str>) -> axum::response::Response {
        let mut request = Request::builder().method("POST").uri("/roll");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, format!("session_key={}", cookie));
        }
        app.clone().oneshot(request.body(Body::empty()).unwrap()).await.unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_create_app_initialization() {
        let app = create_app(test_config(StorageBackend::Memory, "unused".into())).unwrap();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_roll_flow_over_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("clientdata");
        let app = create_app(test_config(StorageBackend::File, data_dir.clone())).unwrap();

        let first = post_roll(&app, None).await;
        assert_eq!(first.status(), StatusCode::OK);
        let set_cookie = first.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
        let token = set_cookie
            .strip_prefix("session_key=")
            .and_then(|rest| rest.split(';').next())
            .unwrap()
            .to_string();
        let body = json_body(first).await;
        let result = body["result"].as_i64().unwrap();
        assert!((-1..=16).contains(&result));

        let stored = std::fs::read_to_string(data_dir.join(&token)).unwrap();
        let record = crate::data::ClientRecord::decode(&stored).unwrap();
        assert_eq!(record.total_draws(), 1);

        let second = post_roll(&app, Some(&token)).await;
        assert!(second.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(json_body(second).await["result"], -1);
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let app = create_app(test_config(StorageBackend::Memory, "unused".into())).unwrap();
        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/roll")
                    .header(header::ORIGIN, "https://jaydengong.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "https://jaydengong.com");
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");
    }
}
