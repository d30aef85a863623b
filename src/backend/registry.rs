//! Service-registry backed discovery.
//!
//! Queries the Consul health API for passing instances of the cache
//! service and turns each into `{scheme}://{address}:{port}`. The result
//! is cached until a forced refresh, so steady-state request handling never
//! touches the registry.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, Url};
use serde::Deserialize;

use super::{BackendDirectory, DirectoryError};
use crate::config::RegistryConfig;

const REGISTRY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct HealthEntry {
    #[serde(rename = "Node")]
    node: NodeInfo,
    #[serde(rename = "Service")]
    service: ServiceInfo,
}

#[derive(Debug, Deserialize)]
struct NodeInfo {
    #[serde(rename = "Address")]
    address: String,
}

#[derive(Debug, Deserialize)]
struct ServiceInfo {
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "Port")]
    port: u16,
}

pub struct RegistryDirectory {
    config: RegistryConfig,
    client: Client,
    cached: Mutex<Option<Vec<String>>>,
}

impl RegistryDirectory {
    pub fn new(config: RegistryConfig) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(REGISTRY_TIMEOUT)
            .build()
            .map_err(DirectoryError::ClientInit)?;

        Ok(Self {
            config,
            client,
            cached: Mutex::new(None),
        })
    }

    fn lookup_url(&self) -> String {
        format!(
            "{}/v1/health/service/{}",
            self.config.registry_addr.trim_end_matches('/'),
            self.config.service
        )
    }

    fn lookup_request_url(&self) -> Result<Url, DirectoryError> {
        Url::parse_with_params(
            &self.lookup_url(),
            &[("passing", "true"), ("dc", self.config.cluster.as_str())],
        )
        .map_err(|e| DirectoryError::InvalidAddress {
            address: self.config.registry_addr.clone(),
            reason: e.to_string(),
        })
    }

    async fn lookup(&self) -> Result<Vec<String>, DirectoryError> {
        let registry_error = |source| DirectoryError::Registry {
            service: self.config.service.clone(),
            source,
        };

        let response = self
            .client
            .get(self.lookup_request_url()?)
            .send()
            .await
            .map_err(registry_error)?;

        if !response.status().is_success() {
            return Err(DirectoryError::RegistryStatus {
                service: self.config.service.clone(),
                status: response.status().as_u16(),
            });
        }

        let entries: Vec<HealthEntry> = response.json().await.map_err(registry_error)?;
        let backends = backend_urls(&entries, &self.config.scheme, self.config.port);

        tracing::debug!(
            service = %self.config.service,
            cluster = %self.config.cluster,
            count = backends.len(),
            "Registry lookup complete"
        );
        Ok(backends)
    }
}

/// Build base URLs from registry entries. The service address wins over the
/// node address when the registration carries one; an explicit port
/// override wins over the registered port.
fn backend_urls(entries: &[HealthEntry], scheme: &str, port_override: Option<u16>) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let host = if entry.service.address.is_empty() {
                &entry.node.address
            } else {
                &entry.service.address
            };
            let port = port_override.unwrap_or(entry.service.port);
            format!("{}://{}:{}", scheme, host, port)
        })
        .collect()
}

#[async_trait]
impl BackendDirectory for RegistryDirectory {
    fn name(&self) -> &'static str {
        "registry"
    }

    async fn backend_addresses(&self, force_refresh: bool) -> Result<Vec<String>, DirectoryError> {
        if !force_refresh {
            if let Some(cached) = self.cached.lock().as_ref() {
                return Ok(cached.clone());
            }
        }

        let backends = self.lookup().await?;
        *self.cached.lock() = Some(backends.clone());
        Ok(backends)
    }
}
