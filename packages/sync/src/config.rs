//! Service configuration.
//!
//! Loaded from a TOML file. `DATABASE_URL` and `SYNCLOC_ADDRESS` override
//! the `dsn` and `address` keys.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use syncloc_database::ColumnLimits;
use syncloc_database::snapshot::is_valid_table_name;
use syncloc_occupancy_models::Windows;
use syncloc_telemetry::client::ClientOptions;

/// Environment variable overriding `dsn`.
pub const DSN_ENV: &str = "DATABASE_URL";

/// Environment variable overriding `address`.
pub const ADDRESS_ENV: &str = "SYNCLOC_ADDRESS";

/// Log level used when neither `RUST_LOG` nor `log_level` is set.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Interval used when `interval` is zero or negative.
pub const DEFAULT_INTERVAL_SECS: u64 = 5;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is missing or out of range.
    #[error("Invalid config: {message}")]
    Invalid {
        /// Description of the problem.
        message: String,
    },
}

/// Configuration file schema. Every key is optional in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct ConfigFile {
    address: Option<String>,
    interval: i64,
    cols: usize,
    depts: usize,
    dsn: Option<String>,
    table: String,
    active_time: u64,
    leave_time: u64,
    log_level: String,
    http_timeout: u64,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            address: None,
            interval: 5,
            cols: 64,
            depts: 64,
            dsn: None,
            table: "tb_inwell".to_string(),
            active_time: 300,
            leave_time: 600,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            http_timeout: 5,
        }
    }
}

/// Validated service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base address of the tracking service.
    pub address: String,
    /// Pause between the end of one cycle and the start of the next.
    pub interval: Duration,
    /// Dynamic column limits of the snapshot table.
    pub limits: ColumnLimits,
    /// Sink connection string.
    pub dsn: String,
    /// Snapshot table name.
    pub table: String,
    /// Staleness windows.
    pub windows: Windows,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Per-request HTTP timeout.
    pub http_timeout: Duration,
    /// Values that were replaced by a fallback. Loading happens before
    /// logging is set up, so these are reported by the caller.
    pub warnings: Vec<String>,
}

impl Config {
    /// Reads and validates the config at `path`, applying environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, |key| std::env::var(key).ok())
    }

    /// Parses and validates `contents`, looking overrides up with `env`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is malformed or a value is
    /// missing or out of range.
    pub fn parse(
        contents: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut file: ConfigFile = toml::de::from_str(contents)?;

        if let Some(dsn) = env(DSN_ENV).filter(|v| !v.is_empty()) {
            file.dsn = Some(dsn);
        }
        if let Some(address) = env(ADDRESS_ENV).filter(|v| !v.is_empty()) {
            file.address = Some(address);
        }

        Self::validate(file)
    }

    fn validate(file: ConfigFile) -> Result<Self, ConfigError> {
        let address = file
            .address
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| invalid(format!("`address` is required (or set {ADDRESS_ENV})")))?;

        let dsn = file
            .dsn
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| invalid(format!("`dsn` is required (or set {DSN_ENV})")))?;

        let mut warnings = Vec::new();

        let interval = u64::try_from(file.interval)
            .ok()
            .filter(|&secs| secs > 0)
            .unwrap_or_else(|| {
                warnings.push(format!(
                    "interval {} is not positive, using {DEFAULT_INTERVAL_SECS}s",
                    file.interval
                ));
                DEFAULT_INTERVAL_SECS
            });

        if file.leave_time < file.active_time {
            return Err(invalid(format!(
                "`leave_time` ({}) must not be less than `active_time` ({})",
                file.leave_time, file.active_time
            )));
        }

        if file.http_timeout == 0 {
            return Err(invalid("`http_timeout` must be positive".to_string()));
        }

        if !is_valid_table_name(&file.table) {
            return Err(invalid(format!(
                "`table` {:?} is not a plain SQL identifier",
                file.table
            )));
        }

        Ok(Self {
            address,
            interval: Duration::from_secs(interval),
            limits: ColumnLimits {
                areas: file.cols,
                departments: file.depts,
            },
            dsn,
            table: file.table,
            windows: Windows {
                active: Duration::from_secs(file.active_time),
                leave: Duration::from_secs(file.leave_time),
            },
            log_level: file.log_level,
            http_timeout: Duration::from_secs(file.http_timeout),
            warnings,
        })
    }

    /// HTTP client settings derived from this config.
    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: self.http_timeout,
            ..ClientOptions::default()
        }
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        address = "http://10.0.0.5:8080"
        dsn = "sqlite://data/sink.db"
    "#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn applies_defaults() {
        let config = Config::parse(MINIMAL, no_env).unwrap();
        assert_eq!(config.address, "http://10.0.0.5:8080");
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(
            config.limits,
            ColumnLimits {
                areas: 64,
                departments: 64
            }
        );
        assert_eq!(config.table, "tb_inwell");
        assert_eq!(config.windows.active, Duration::from_secs(300));
        assert_eq!(config.windows.leave, Duration::from_secs(600));
        assert_eq!(config.log_level, "warn");
        assert!(config.warnings.is_empty());
        assert_eq!(config.client_options().timeout, Duration::from_secs(5));
        assert_eq!(config.client_options().max_idle_per_host, 10);
    }

    #[test]
    fn non_positive_interval_falls_back() {
        for interval in ["0", "-3"] {
            let toml = format!("{MINIMAL}\ninterval = {interval}");
            let config = Config::parse(&toml, no_env).unwrap();
            assert_eq!(config.interval, Duration::from_secs(DEFAULT_INTERVAL_SECS));
            assert_eq!(config.warnings.len(), 1);
            assert!(config.warnings[0].contains(interval), "{:?}", config.warnings);
        }
    }

    #[test]
    fn reads_every_key() {
        let toml = r#"
            address = "http://tracker"
            interval = 30
            cols = 3
            depts = 2
            dsn = "postgres://u:p@db/loc"
            table = "dbo.occupancy"
            active_time = 120
            leave_time = 120
            log_level = "syncloc=debug"
            http_timeout = 10
        "#;
        let config = Config::parse(toml, no_env).unwrap();
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.limits.areas, 3);
        assert_eq!(config.limits.departments, 2);
        assert_eq!(config.table, "dbo.occupancy");
        assert_eq!(config.windows.active, config.windows.leave);
        assert_eq!(config.log_level, "syncloc=debug");
        assert_eq!(config.http_timeout, Duration::from_secs(10));
    }

    #[test]
    fn environment_overrides_file() {
        let env = |key: &str| match key {
            DSN_ENV => Some("sqlite::memory:".to_string()),
            ADDRESS_ENV => Some("http://override".to_string()),
            _ => None,
        };
        let config = Config::parse(MINIMAL, env).unwrap();
        assert_eq!(config.dsn, "sqlite::memory:");
        assert_eq!(config.address, "http://override");
    }

    #[test]
    fn environment_supplies_missing_keys() {
        let env = |key: &str| match key {
            DSN_ENV => Some("sqlite::memory:".to_string()),
            ADDRESS_ENV => Some("http://tracker".to_string()),
            _ => None,
        };
        assert!(Config::parse("", env).is_ok());
    }

    #[test]
    fn missing_address_is_invalid() {
        let err = Config::parse(r#"dsn = "sqlite::memory:""#, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref message } if message.contains("address")));
    }

    #[test]
    fn missing_dsn_is_invalid() {
        let err = Config::parse(r#"address = "http://tracker""#, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref message } if message.contains("dsn")));
    }

    #[test]
    fn leave_shorter_than_active_is_invalid() {
        let toml = format!("{MINIMAL}\nactive_time = 600\nleave_time = 300");
        assert!(matches!(
            Config::parse(&toml, no_env),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn unsafe_table_is_invalid() {
        let toml = format!("{MINIMAL}\ntable = \"x; DROP TABLE y\"");
        assert!(matches!(
            Config::parse(&toml, no_env),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            Config::parse("address = ", no_env),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::parse("cols = \"many\"", no_env),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load(Path::new("/nonexistent/syncloc/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
