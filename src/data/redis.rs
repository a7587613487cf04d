use ::redis::AsyncCommands;
use async_trait::async_trait;
use tracing::instrument;

use super::RecordBackend;
use crate::error::AppError;

/// Records stored as plain strings under `client:{token}`, without expiry.
#[derive(Debug, Clone)]
pub struct RedisBackend {
    client: ::redis::Client,
}

impl RedisBackend {
    pub fn new(client: ::redis::Client) -> Self {
        Self { client }
    }

    fn key(token: &str) -> String {
        format!("client:{}", token)
    }
}

#[async_trait]
impl RecordBackend for RedisBackend {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(Self::key(key)).await?;
        Ok(value)
    }

    #[instrument(skip(self, value))]
    async fn put(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(Self::key(key), value).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn exists(&self, key: &str) -> Result<bool, AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let found: bool = conn.exists(Self::key(key)).await?;
        Ok(found)
    }
}
