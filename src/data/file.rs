use async_trait::async_trait;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::instrument;
use uuid::Uuid;

use super::RecordBackend;
use crate::error::AppError;
use crate::identity::is_safe_key;

/// One file per key inside `dir`. Writes go to a hidden temp file first and
/// are renamed over the target, so readers see the old or the new record.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, AppError> {
        if !is_safe_key(key) {
            return Err(AppError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl RecordBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The write runs to completion on the blocking pool even if the caller
    /// is dropped, so a cancelled request never strands a temp file.
    #[instrument(skip(self, value))]
    async fn put(&self, key: &str, value: &str) -> Result<(), AppError> {
        let path = self.path_for(key)?;
        let tmp = self.dir.join(format!(".{}.{}.tmp", key, Uuid::new_v4().simple()));
        let contents = value.to_owned();

        tokio::task::spawn_blocking(move || replace_file(tmp, &path, contents.as_bytes())).await??;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, AppError> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}

/// Removes the temp file on every exit path except a successful rename.
struct TempFile {
    path: PathBuf,
    renamed: bool,
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.renamed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

fn replace_file(tmp: PathBuf, target: &Path, contents: &[u8]) -> io::Result<()> {
    let mut temp = TempFile { path: tmp, renamed: false };

    let mut file = fs::File::create(&temp.path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    fs::rename(&temp.path, target)?;

    temp.renamed = true;
    Ok(())
}
