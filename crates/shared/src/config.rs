//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Journal engine settings.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Reference-data cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Whether an account holding a balance may be deactivated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeactivationPolicy {
    /// Deactivation fails while the posted balance is nonzero.
    #[default]
    RequireZeroBalance,
    /// Deactivation always succeeds; historical lines stay intact.
    AllowWithBalance,
}

/// Journal engine settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Zero-padding width of the numeric part of an entry number.
    #[serde(default = "default_entry_number_width")]
    pub entry_number_width: usize,
    /// Prefix given to newly registered tenants.
    #[serde(default = "default_entry_prefix")]
    pub default_entry_prefix: String,
    /// Deadline applied to every ledger operation, in milliseconds.
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
    /// Account deactivation policy.
    #[serde(default)]
    pub deactivation_policy: DeactivationPolicy,
}

fn default_entry_number_width() -> usize {
    5
}

fn default_entry_prefix() -> String {
    "JE".to_string()
}

fn default_operation_timeout_ms() -> u64 {
    5_000
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            entry_number_width: default_entry_number_width(),
            default_entry_prefix: default_entry_prefix(),
            operation_timeout_ms: default_operation_timeout_ms(),
            deactivation_policy: DeactivationPolicy::default(),
        }
    }
}

/// Per-tenant cache settings for accounts and tax rates.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached records.
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,
    /// Time-to-live of a cached record, in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

fn default_cache_capacity() -> u64 {
    10_000
}

fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_filter() -> String {
    "tally=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_applies_defaults() {
        temp_env::with_vars(
            [
                ("TALLY__DATABASE__URL", Some("postgres://localhost/tally")),
                ("RUN_MODE", Some("test-defaults")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/tally");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.ledger.entry_number_width, 5);
                assert_eq!(config.ledger.default_entry_prefix, "JE");
                assert_eq!(config.ledger.operation_timeout_ms, 5_000);
                assert_eq!(
                    config.ledger.deactivation_policy,
                    DeactivationPolicy::RequireZeroBalance
                );
                assert_eq!(config.cache.ttl_secs, 300);
                assert_eq!(config.logging.format, LogFormat::Pretty);
            },
        );
    }

    #[test]
    fn test_load_reads_nested_environment_overrides() {
        temp_env::with_vars(
            [
                ("TALLY__DATABASE__URL", Some("postgres://db/tally")),
                ("TALLY__LEDGER__ENTRY_NUMBER_WIDTH", Some("7")),
                (
                    "TALLY__LEDGER__DEACTIVATION_POLICY",
                    Some("allow_with_balance"),
                ),
                ("TALLY__LOGGING__FORMAT", Some("json")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.ledger.entry_number_width, 7);
                assert_eq!(
                    config.ledger.deactivation_policy,
                    DeactivationPolicy::AllowWithBalance
                );
                assert_eq!(config.logging.format, LogFormat::Json);
            },
        );
    }

    #[test]
    fn test_load_requires_database_url() {
        temp_env::with_var_unset("TALLY__DATABASE__URL", || {
            assert!(AppConfig::load().is_err());
        });
    }
}
