pub mod file;
pub mod locks;
pub mod memory;
pub mod record;
pub mod redis;
pub mod store;

use async_trait::async_trait;

use crate::error::AppError;

pub use self::file::FileBackend;
pub use self::memory::MemoryBackend;
pub use self::record::ClientRecord;
pub use self::redis::RedisBackend;
pub use self::store::ClientStateStore;

/// Flat key-value medium holding one encoded record per session token.
///
/// `put` must replace the whole value or leave the old one in place.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), AppError>;
    async fn exists(&self, key: &str) -> Result<bool, AppError>;
}
