//! Inbound server and the broadcast engine behind it.

pub mod dispatcher;
pub mod error;
pub mod router;
pub mod server;
pub mod status;
pub mod upstream;

use tracing_subscriber::EnvFilter;

pub use dispatcher::{Dispatcher, InboundRequest};
pub use error::{ErrorResponse, ProxyError, ServerError};
pub use server::{ForwardHandle, ForwardServer};
pub use status::{BackendOutcome, BroadcastOutcome, StatusVector, TRANSPORT_FAILURE};
pub use upstream::UpstreamClient;

/// Install the global `fmt` subscriber. Level comes from `RUST_LOG`,
/// defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();
}
