use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::instrument;
use uuid::Uuid;

use crate::data::ClientStateStore;
use crate::error::AppError;

const MAX_TOKEN_LEN: usize = 64;

/// Opaque client identity carried in the session cookie. Doubles as the
/// storage key, so only `[A-Za-z0-9_-]` is ever accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Coarse creation time (whole seconds, zero padded) joined to a random v4 UUID.
    pub fn mint(now_secs: f64) -> Self {
        let secs = now_secs.max(0.0) as u64;
        Self(format!("{:0>12}-{}", secs, Uuid::new_v4().simple()))
    }

    /// Accepts a cookie value only if it is safe to use as a storage key.
    pub fn parse(raw: &str) -> Option<Self> {
        is_safe_key(raw).then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn is_safe_key(raw: &str) -> bool {
    !raw.is_empty()
        && raw.len() <= MAX_TOKEN_LEN
        && raw.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Returns the caller's token and whether it was freshly minted.
///
/// A cookie that is missing, malformed, or has no stored record is treated
/// as a new client.
#[instrument(skip(store))]
pub async fn resolve(store: &ClientStateStore, cookie: Option<&str>) -> Result<(SessionToken, bool), AppError> {
    if let Some(token) = cookie.and_then(SessionToken::parse) {
        if store.exists(&token).await? {
            return Ok((token, false));
        }
        tracing::debug!(token = %token, "Cookie has no stored record, minting a new identity");
    }

    let token = SessionToken::mint(store.clock().now());
    Ok((token, true))
}
