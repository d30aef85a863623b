use async_trait::async_trait;

use super::{BackendDirectory, DirectoryError};

/// Fixed list of backends from configuration. Refreshing is a no-op.
pub struct StaticDirectory {
    backends: Vec<String>,
}

impl StaticDirectory {
    pub fn new(backends: Vec<String>) -> Self {
        Self { backends }
    }
}

#[async_trait]
impl BackendDirectory for StaticDirectory {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn backend_addresses(&self, _force_refresh: bool) -> Result<Vec<String>, DirectoryError> {
        Ok(self.backends.clone())
    }
}
