//! Backend discovery.
//!
//! A [`BackendDirectory`] supplies the ordered list of cache node base
//! addresses. The forwarding core only ever talks to the trait; the
//! concrete provider is picked once at startup from configuration.

mod error;
mod file;
mod registry;
mod static_list;

use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;

use crate::config::ProviderConfig;

pub use error::DirectoryError;
pub use file::FileDirectory;
pub use registry::RegistryDirectory;
pub use static_list::StaticDirectory;

/// Source of backend base addresses.
///
/// Implementations may cache. With `force_refresh == false` the cached set
/// is returned (populated lazily on first use); with `force_refresh == true`
/// the authoritative source is queried again and the cache replaced.
#[async_trait]
pub trait BackendDirectory: Send + Sync {
    /// Short provider name for logging.
    fn name(&self) -> &'static str;

    async fn backend_addresses(&self, force_refresh: bool) -> Result<Vec<String>, DirectoryError>;
}

/// Build the directory selected by configuration.
pub fn build_directory(
    provider: &ProviderConfig,
) -> Result<Arc<dyn BackendDirectory>, DirectoryError> {
    let directory: Arc<dyn BackendDirectory> = match provider {
        ProviderConfig::Static { backends } => Arc::new(StaticDirectory::new(backends.clone())),
        ProviderConfig::File { path } => Arc::new(FileDirectory::new(path.clone())),
        ProviderConfig::Registry(registry) => Arc::new(RegistryDirectory::new(registry.clone())?),
    };
    Ok(directory)
}

/// Immutable snapshot of backend addresses.
///
/// Cloning is a reference count bump, so every broadcast iterates its own
/// snapshot while refreshes swap in new ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSet(Arc<[String]>);

impl BackendSet {
    pub fn new(addresses: Vec<String>) -> Self {
        Self(addresses.into())
    }

    pub fn empty() -> Self {
        Self(Arc::from(Vec::new()))
    }

    /// Addresses present here but absent from `previous`, in snapshot order.
    pub fn added_since(&self, previous: &BackendSet) -> Vec<String> {
        let known: HashSet<&str> = previous.iter().map(String::as_str).collect();
        self.iter()
            .filter(|address| !known.contains(address.as_str()))
            .cloned()
            .collect()
    }

    /// Addresses present in `previous` but gone from this snapshot.
    pub fn removed_since(&self, previous: &BackendSet) -> Vec<String> {
        previous.added_since(self)
    }
}

impl Deref for BackendSet {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<String>> for BackendSet {
    fn from(addresses: Vec<String>) -> Self {
        Self::new(addresses)
    }
}

impl fmt::Display for BackendSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Check that a discovered set is usable: non-empty, and every entry an
/// absolute http(s) URL with a host.
pub fn validate_backend_set(addresses: &[String]) -> Result<(), DirectoryError> {
    if addresses.is_empty() {
        return Err(DirectoryError::Empty);
    }

    for address in addresses {
        let url = Url::parse(address).map_err(|e| DirectoryError::InvalidAddress {
            address: address.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(DirectoryError::InvalidAddress {
                address: address.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if url.host_str().map_or(true, str::is_empty) {
            return Err(DirectoryError::InvalidAddress {
                address: address.clone(),
                reason: "missing host".to_string(),
            });
        }
    }

    Ok(())
}

/// Split a provider-supplied list on commas and newlines, trimming
/// whitespace and dropping blank entries.
pub(crate) fn split_address_list(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
