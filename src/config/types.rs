use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: ListenConfig,
    pub provider: ProviderConfig,
    /// Topology watcher interval. Zero disables the watcher.
    pub refresh_interval: Duration,
    pub client: ClientConfig,
    pub purge: PurgeConfig,
    /// Upper bound for a buffered inbound body.
    pub max_body_bytes: usize,
}

/// Listener settings for the inbound server.
#[derive(Debug, Clone)]
pub struct ListenConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl ListenConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Which backend directory to use, with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    Static { backends: Vec<String> },
    File { path: PathBuf },
    Registry(RegistryConfig),
}

impl ProviderConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderConfig::Static { .. } => "static",
            ProviderConfig::File { .. } => "file",
            ProviderConfig::Registry(_) => "registry",
        }
    }
}

/// Service-registry lookup parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Registry HTTP API base (e.g., "http://127.0.0.1:8500").
    pub registry_addr: String,
    /// Service name the cache nodes register under.
    pub service: String,
    /// Cluster / datacenter to query.
    pub cluster: String,
    /// Scheme used to build discovered backend URLs.
    pub scheme: String,
    /// Port override for discovered backends; the registered port otherwise.
    pub port: Option<u16>,
}

/// Outbound HTTP client settings shared by broadcasts and purges.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Total time allowed for one outbound call.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 8,
        }
    }
}

/// Cache invalidation settings.
#[derive(Debug, Clone)]
pub struct PurgeConfig {
    /// Value sent in the `Cache-Tags` header of every BAN.
    pub cache_tags: String,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            cache_tags: "http_response".to_string(),
        }
    }
}
