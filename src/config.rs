//! Configuration Module
//!
//! This module defines all configuration structures for the dispatch service.
//! Configuration is loaded from TOML files and parsed using serde.

use crate::types::{TransportCredentials, TransportMethod};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
///
/// Contains all configuration sections for the dispatch service.
/// Loaded from a TOML file (e.g., config/default.toml).
///
/// # Example TOML
/// ```toml
/// [batch]
/// scratch_dir = "tmp"
/// max_number_attempts = 100
///
/// [transport]
/// timeout_ms = 10000
/// max_retries = 2
/// retry_backoff_ms = 500
///
/// [api]
/// host = "127.0.0.1"
/// port = 8650
///
/// [[couriers]]
/// name = "Royal Mail"
/// reference = "RM"
/// transport_method = "email"
/// credentials = { to = "ops@courier.example", from = "no-reply@dispatch.example" }
/// number_format = { kind = "country-suffixed", country = "GB" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    pub api: ApiConfig,
    #[serde(default)]
    pub couriers: Vec<CourierConfig>,
}

/// Batch accumulation configuration
///
/// # Fields
/// - `scratch_dir`: Directory for temporary FTP batch artifacts
/// - `max_number_attempts`: Candidates tried before giving up on a unique consignment number
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    pub scratch_dir: PathBuf,
    pub max_number_attempts: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir().join("dispatch-batch"),
            max_number_attempts: 100,
        }
    }
}

/// Transport attempt configuration
///
/// Controls how long a single delivery attempt may take and how transient
/// failures are retried.
///
/// # Fields
/// - `timeout_ms`: Upper bound for one delivery attempt (in milliseconds)
/// - `max_retries`: Retries after the initial attempt
/// - `retry_backoff_ms`: Initial backoff, doubled for each further retry
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

/// API server configuration
///
/// Controls the JSON-RPC API endpoint settings.
///
/// # Fields
/// - `host`: IP address to bind to (e.g., "127.0.0.1" or "0.0.0.0")
/// - `port`: TCP port to listen on (e.g., 8650)
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

/// A courier to register at startup
///
/// `reference` defaults to `name` when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct CourierConfig {
    pub name: String,
    pub reference: Option<String>,
    pub transport_method: TransportMethod,
    #[serde(default)]
    pub credentials: TransportCredentials,
    pub number_format: NumberFormat,
}

impl CourierConfig {
    pub fn reference(&self) -> &str {
        self.reference.as_deref().unwrap_or(&self.name)
    }
}

/// Built-in consignment number formats
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NumberFormat {
    /// Random digits (first one non-zero) followed by `-<country>`, e.g. `4821730596-GB`
    CountrySuffixed {
        #[serde(default = "default_suffixed_digits")]
        digits: usize,
        country: String,
    },
    /// Today's date as `YYYYMMDD` followed by random digits, e.g. `20201021482173`
    DatePrefixed {
        #[serde(default = "default_prefixed_digits")]
        digits: usize,
    },
}

fn default_suffixed_digits() -> usize {
    10
}

fn default_prefixed_digits() -> usize {
    6
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    /// * `Ok(Config)` if the file was successfully loaded and parsed
    /// * `Err` if the file couldn't be read or the TOML is invalid
    ///
    /// # Example
    /// ```no_run
    /// # use dispatch_batch::Config;
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [batch]
        scratch_dir = "/tmp/dispatch"
        max_number_attempts = 5

        [api]
        host = "127.0.0.1"
        port = 8650

        [[couriers]]
        name = "Royal Mail"
        reference = "RM"
        transport_method = "email"
        credentials = { to = "a@b.com", from = "c@d.com" }
        number_format = { kind = "country-suffixed", country = "GB" }

        [[couriers]]
        name = "ANC"
        transport_method = "ftp"
        credentials = { server = "ftp.example.com", username = "anonymous", password = "secret" }
        number_format = { kind = "date-prefixed" }
    "#;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(SAMPLE).unwrap();

        assert_eq!(config.batch.scratch_dir, PathBuf::from("/tmp/dispatch"));
        assert_eq!(config.batch.max_number_attempts, 5);
        assert_eq!(config.api.port, 8650);
        assert_eq!(config.couriers.len(), 2);

        let rm = &config.couriers[0];
        assert_eq!(rm.reference(), "RM");
        assert_eq!(rm.transport_method, TransportMethod::Email);
        assert_eq!(rm.credentials.get("to").map(String::as_str), Some("a@b.com"));
        assert_eq!(
            rm.number_format,
            NumberFormat::CountrySuffixed { digits: 10, country: "GB".into() }
        );

        let anc = &config.couriers[1];
        assert_eq!(anc.reference(), "ANC");
        assert_eq!(anc.transport_method, TransportMethod::Ftp);
        assert_eq!(anc.number_format, NumberFormat::DatePrefixed { digits: 6 });
    }

    #[test]
    fn test_transport_defaults_apply() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.transport.timeout(), Duration::from_secs(10));
        assert_eq!(config.transport.max_retries, 2);
    }

    #[test]
    fn test_unknown_transport_method_is_kept() {
        let config = Config::parse(
            r#"
            [api]
            host = "0.0.0.0"
            port = 1

            [[couriers]]
            name = "Carrier Pigeon"
            transport_method = "pigeon"
            number_format = { kind = "date-prefixed", digits = 4 }
            "#,
        )
        .unwrap();

        assert_eq!(
            config.couriers[0].transport_method,
            TransportMethod::Unsupported("pigeon".into())
        );
        assert!(config.couriers[0].credentials.is_empty());
    }

    #[test]
    fn test_missing_api_section_fails() {
        assert!(Config::parse("[batch]\nscratch_dir = \"tmp\"\nmax_number_attempts = 1\n").is_err());
    }
}
