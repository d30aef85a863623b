//! Backends listed in a local file.
//!
//! The file holds addresses separated by commas or newlines. Its contents
//! are cached after the first read and only re-read on a forced refresh,
//! so an operator (or a sidecar) can rewrite the file and let the topology
//! watcher pick the change up.

use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{split_address_list, BackendDirectory, DirectoryError};

pub struct FileDirectory {
    path: PathBuf,
    cached: Mutex<Option<Vec<String>>>,
}

impl FileDirectory {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cached: Mutex::new(None),
        }
    }

    async fn read(&self) -> Result<Vec<String>, DirectoryError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| DirectoryError::ReadFile {
                path: self.path.clone(),
                source: e,
            })?;

        let backends = split_address_list(&contents);
        tracing::debug!(path = %self.path.display(), count = backends.len(), "Read backends file");
        Ok(backends)
    }
}

#[async_trait]
impl BackendDirectory for FileDirectory {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn backend_addresses(&self, force_refresh: bool) -> Result<Vec<String>, DirectoryError> {
        if !force_refresh {
            if let Some(cached) = self.cached.lock().as_ref() {
                return Ok(cached.clone());
            }
        }

        let backends = self.read().await?;
        *self.cached.lock() = Some(backends.clone());
        Ok(backends)
    }
}
