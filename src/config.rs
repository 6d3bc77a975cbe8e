//! Deployment configuration, loaded from a YAML file path given on the command line.

use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CoreConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub sepa: SepaConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DatabaseConfig {
    #[validate(length(min = 1))]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

fn default_pool_size() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Per-request deadline in seconds, propagated to the database driver.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Sender-side SEPA settings shared by every payout run.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SepaConfig {
    #[validate(length(min = 1))]
    pub sender_iban: String,
    #[validate(length(min = 1))]
    pub sender_name: String,
    /// Template with `{user_tag_uid}` substituted by the zero-padded uppercase hex uid.
    pub description_template: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "EUR".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_file() -> String {
    "stustapay-core.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: default_log_dir(),
            file: default_log_file(),
        }
    }
}

impl CoreConfig {
    /// Load and validate configuration from a YAML file. Exit code on failure is the
    /// caller's responsibility per the `0`/`1`/`2` CLI convention.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {path}: {e}"))?;
        let config: CoreConfig = serde_yaml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("failed to parse config file {path}: {e}"))?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_yaml() {
        let yaml = r#"
database:
  url: "postgresql://localhost/stustapay"
server:
  bind_address: "0.0.0.0:8080"
sepa:
  sender_iban: "DE89370400440532013000"
  sender_name: "StuStaPay e.V."
  description_template: "StuStaPay payout {user_tag_uid}"
"#;
        let config: CoreConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.database.pool_size, 10);
        assert_eq!(config.sepa.currency, "EUR");
        assert_eq!(config.server.request_timeout_secs, 30);
    }
}
