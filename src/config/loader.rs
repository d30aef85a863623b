use std::time::Duration;

use thiserror::Error;

use crate::backend::split_address_list;
use crate::config::cli::{Cli, ProviderKind};
use crate::config::types::{
    ClientConfig, Config, ListenConfig, ProviderConfig, PurgeConfig, RegistryConfig,
};

/// Errors that can occur when building configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("The {name} setting is empty or not set (required by the {provider} provider)")]
    MissingSetting {
        name: &'static str,
        provider: &'static str,
    },

    #[error("FWD_PROVIDER is not set (choose static, file or registry)")]
    MissingProvider,

    #[error("Provider '{provider}' is not supported: {reason}")]
    UnsupportedProvider {
        provider: &'static str,
        reason: &'static str,
    },

    #[error("{name}={value:?} is not a valid duration")]
    InvalidDuration { name: &'static str, value: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// Build and validate configuration from parsed arguments.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let provider = provider_from_cli(&cli)?;

        let refresh_interval = duration_setting("FWD_REFRESH_INTERVAL", &cli.refresh_interval)?;
        let request_timeout = duration_setting("FWD_REQUEST_TIMEOUT", &cli.request_timeout)?;
        let connect_timeout = duration_setting("FWD_CONNECT_TIMEOUT", &cli.connect_timeout)?;

        let config = Config {
            listen: ListenConfig {
                host: cli.bind_host,
                port: cli.port,
            },
            provider,
            refresh_interval,
            client: ClientConfig {
                request_timeout,
                connect_timeout,
                ..ClientConfig::default()
            },
            purge: PurgeConfig {
                cache_tags: cli.purge_tags,
            },
            max_body_bytes: cli.max_body_bytes,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - Outbound timeouts are finite and non-zero
    /// - The body limit is non-zero
    /// - The purge tag header value is non-empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError {
                message: "FWD_REQUEST_TIMEOUT must be greater than zero".to_string(),
            });
        }

        if self.client.connect_timeout.is_zero() {
            return Err(ConfigError::ValidationError {
                message: "FWD_CONNECT_TIMEOUT must be greater than zero".to_string(),
            });
        }

        if self.max_body_bytes == 0 {
            return Err(ConfigError::ValidationError {
                message: "FWD_MAX_BODY_BYTES must be greater than zero".to_string(),
            });
        }

        if self.purge.cache_tags.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "FWD_PURGE_TAGS must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

fn provider_from_cli(cli: &Cli) -> Result<ProviderConfig, ConfigError> {
    let kind = cli.provider.ok_or(ConfigError::MissingProvider)?;

    match kind {
        ProviderKind::Static => {
            let raw = non_empty(cli.backends.as_deref()).ok_or(ConfigError::MissingSetting {
                name: "FWD_BACKENDS",
                provider: "static",
            })?;
            let backends = split_address_list(raw);
            if backends.is_empty() {
                return Err(ConfigError::ValidationError {
                    message: "FWD_BACKENDS contains no backends".to_string(),
                });
            }
            Ok(ProviderConfig::Static { backends })
        }
        ProviderKind::File => {
            let path = cli
                .backends_file
                .clone()
                .filter(|p| !p.as_os_str().is_empty())
                .ok_or(ConfigError::MissingSetting {
                    name: "FWD_BACKENDS_FILE",
                    provider: "file",
                })?;
            Ok(ProviderConfig::File { path })
        }
        ProviderKind::Registry => {
            let service = non_empty(cli.service_name.as_deref()).ok_or(ConfigError::MissingSetting {
                name: "VARNISH_SERVICE_NAME",
                provider: "registry",
            })?;
            let cluster = non_empty(cli.cluster.as_deref()).ok_or(ConfigError::MissingSetting {
                name: "CLUSTER_NAME",
                provider: "registry",
            })?;

            let scheme = cli.backend_scheme.trim().to_ascii_lowercase();
            if scheme != "http" && scheme != "https" {
                return Err(ConfigError::ValidationError {
                    message: format!("VARNISH_SCHEME '{}' must be http or https", cli.backend_scheme),
                });
            }

            Ok(ProviderConfig::Registry(RegistryConfig {
                registry_addr: cli.registry_addr.clone(),
                service: service.to_string(),
                cluster: cluster.to_string(),
                scheme,
                port: cli.backend_port,
            }))
        }
        ProviderKind::Ecs => Err(ConfigError::UnsupportedProvider {
            provider: "ecs",
            reason: "ECS task discovery is not available; register the cache \
                     nodes in Consul and use --provider registry",
        }),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn duration_setting(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    parse_duration(value).ok_or_else(|| ConfigError::InvalidDuration {
        name,
        value: value.to_string(),
    })
}

/// Parse `<n>ms`, `<n>s`, `<n>m`, `<n>h` or `<n>d`. A bare `0` is accepted
/// so that intervals can be switched off without picking a unit.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    if digits.is_empty() {
        return None;
    }

    let magnitude: u64 = digits.parse().ok()?;
    match unit {
        "" if magnitude == 0 => Some(Duration::ZERO),
        "ms" => Some(Duration::from_millis(magnitude)),
        "s" => Some(Duration::from_secs(magnitude)),
        "m" => magnitude.checked_mul(60).map(Duration::from_secs),
        "h" => magnitude.checked_mul(60 * 60).map(Duration::from_secs),
        "d" => magnitude.checked_mul(60 * 60 * 24).map(Duration::from_secs),
        _ => None,
    }
}
