use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Backend directory implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// Comma separated list from `FWD_BACKENDS`.
    Static,
    /// Comma or newline separated list read from `FWD_BACKENDS_FILE`.
    File,
    /// Passing instances of a service in the Consul service registry.
    Registry,
    /// AWS ECS task discovery. Recognised so that it can be refused with a
    /// clear error; it is not implemented.
    Ecs,
}

/// Command line and environment surface. Every flag can also be set through
/// the environment variable shown in `--help`.
#[derive(Debug, Parser)]
#[command(
    name = "varnish-fwd",
    version,
    about = "Mirror every inbound request to all cache nodes and purge on topology changes"
)]
pub struct Cli {
    /// Port to listen on.
    #[arg(long, env = "FWD_PORT", default_value_t = 6081)]
    pub port: u16,

    /// Address to bind the listener to.
    #[arg(long, env = "FWD_BIND_HOST", default_value = "0.0.0.0")]
    pub bind_host: IpAddr,

    /// Backend provider. Required: there is no default discovery source.
    #[arg(long, env = "FWD_PROVIDER", value_enum)]
    pub provider: Option<ProviderKind>,

    /// Static backends, comma separated.
    #[arg(long, env = "FWD_BACKENDS")]
    pub backends: Option<String>,

    /// File holding the backend list.
    #[arg(long, env = "FWD_BACKENDS_FILE")]
    pub backends_file: Option<PathBuf>,

    /// Service registry HTTP API address.
    #[arg(long, env = "FWD_REGISTRY_ADDR", default_value = "http://127.0.0.1:8500")]
    pub registry_addr: String,

    /// Registry service name of the cache nodes.
    #[arg(long, env = "VARNISH_SERVICE_NAME")]
    pub service_name: Option<String>,

    /// Registry cluster (datacenter) to query.
    #[arg(long, env = "CLUSTER_NAME")]
    pub cluster: Option<String>,

    /// Scheme for discovered backends.
    #[arg(long, env = "VARNISH_SCHEME", default_value = "http")]
    pub backend_scheme: String,

    /// Port for discovered backends; defaults to the registered port.
    #[arg(long, env = "VARNISH_PORT")]
    pub backend_port: Option<u16>,

    /// Topology refresh interval (e.g. "30s", "5m"); "0" disables it.
    #[arg(long, env = "FWD_REFRESH_INTERVAL", default_value = "5m")]
    pub refresh_interval: String,

    /// Timeout for each forwarded request.
    #[arg(long, env = "FWD_REQUEST_TIMEOUT", default_value = "10s")]
    pub request_timeout: String,

    /// Connect timeout for each forwarded request.
    #[arg(long, env = "FWD_CONNECT_TIMEOUT", default_value = "5s")]
    pub connect_timeout: String,

    /// Largest inbound body that will be buffered and mirrored.
    #[arg(long, env = "FWD_MAX_BODY_BYTES", default_value_t = 1024 * 1024)]
    pub max_body_bytes: usize,

    /// `Cache-Tags` value sent with every purge.
    #[arg(long, env = "FWD_PURGE_TAGS", default_value = "http_response")]
    pub purge_tags: String,
}
