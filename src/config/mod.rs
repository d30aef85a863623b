//! Process configuration.
//!
//! Settings come from command line flags or their environment variable
//! equivalents, and are validated into a [`Config`] before anything starts.

mod cli;
mod loader;
mod types;

pub use cli::{Cli, ProviderKind};
pub use loader::{parse_duration, ConfigError};
pub use types::{ClientConfig, Config, ListenConfig, ProviderConfig, PurgeConfig, RegistryConfig};
