use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::{Cli, OutputFormat};
use crate::error::CreditError;
use crate::http_client::{ApiCredentials, HttpClientConfig};

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

impl From<ConfigError> for CreditError {
    fn from(err: ConfigError) -> Self {
        CreditError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

const CONFIG_NAMES: [&str; 4] = [
    "smartapi-credit.toml",
    "smartapi-credit.json",
    ".smartapi-credit.toml",
    ".smartapi-credit.json",
];

/// Vendor test environment, used until a real endpoint is configured
pub const DEFAULT_API_URL: &str =
    "https://demo.mortgagecreditlink.com/inetapi/request_products.aspx";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub network: NetworkConfig,
    pub polling: PollingConfig,
    pub output: OutputConfig,
}

/// Endpoint and account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub url: String,
    pub login: String,
    pub password: String,
    /// Value of the interface header identifying the integration
    pub interface_identifier: Option<String>,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// HTTP request timeout in seconds
    pub timeout_seconds: u64,
    /// Number of retry attempts for failed requests
    pub retry_attempts: u32,
    /// Retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Cap on the exponential backoff in milliseconds
    pub max_retry_delay_ms: u64,
}

/// Status polling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_seconds: u64,
    pub max_attempts: u32,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    pub verbose: bool,
    pub quiet: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            login: String::new(),
            password: String::new(),
            interface_identifier: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            max_retry_delay_ms: 30000,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 10,
            max_attempts: 30,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Human,
            log_level: "info".to_string(),
            verbose: false,
            quiet: false,
        }
    }
}

impl Config {
    /// Account credentials; login and password must both be set
    pub fn credentials(&self) -> Result<ApiCredentials> {
        if self.api.login.is_empty() || self.api.password.is_empty() {
            return Err(ConfigError::Validation(
                "api.login and api.password are required to submit orders".to_string(),
            ));
        }
        Ok(ApiCredentials {
            url: self.api.url.clone(),
            login: self.api.login.clone(),
            password: self.api.password.clone(),
            interface_identifier: self.api.interface_identifier.clone(),
        })
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout_seconds: self.network.timeout_seconds,
            retry_attempts: self.network.retry_attempts,
            retry_delay_ms: self.network.retry_delay_ms,
            max_retry_delay_ms: self.network.max_retry_delay_ms,
            ..Default::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_seconds)
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides(config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        for name in &CONFIG_NAMES {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("smartapi-credit");
            for name in &CONFIG_NAMES {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        // API settings
        if let Some(url) = env.get("SMARTAPI_URL") {
            config.api.url = url;
        }
        if let Some(login) = env.get("SMARTAPI_LOGIN") {
            config.api.login = login;
        }
        if let Some(password) = env.get("SMARTAPI_PASSWORD") {
            config.api.password = password;
        }
        if let Some(interface) = env.get("SMARTAPI_INTERFACE") {
            config.api.interface_identifier = Some(interface).filter(|value| !value.is_empty());
        }

        // Network settings
        if let Some(timeout) = parse_env(env, "SMARTAPI_TIMEOUT")? {
            config.network.timeout_seconds = timeout;
        }
        if let Some(retry_attempts) = parse_env(env, "SMARTAPI_RETRY_ATTEMPTS")? {
            config.network.retry_attempts = retry_attempts;
        }
        if let Some(retry_delay) = parse_env(env, "SMARTAPI_RETRY_DELAY_MS")? {
            config.network.retry_delay_ms = retry_delay;
        }
        if let Some(max_delay) = parse_env(env, "SMARTAPI_MAX_RETRY_DELAY_MS")? {
            config.network.max_retry_delay_ms = max_delay;
        }

        // Polling settings
        if let Some(interval) = parse_env(env, "SMARTAPI_POLL_INTERVAL")? {
            config.polling.interval_seconds = interval;
        }
        if let Some(max_attempts) = parse_env(env, "SMARTAPI_MAX_POLLS")? {
            config.polling.max_attempts = max_attempts;
        }

        // Output settings
        if let Some(format) = env.get("SMARTAPI_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormat::Human,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid SMARTAPI_FORMAT value: {}",
                        format
                    )));
                }
            };
        }
        if let Some(log_level) = env.get("SMARTAPI_LOG_LEVEL") {
            config.output.log_level = log_level;
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(url) = &cli.url {
            config.api.url = url.clone();
        }
        if let Some(timeout) = cli.timeout {
            config.network.timeout_seconds = timeout;
        }
        if let Some(retry_attempts) = cli.retry_attempts {
            config.network.retry_attempts = retry_attempts;
        }
        if let Some(max_delay) = cli.max_retry_delay_ms {
            config.network.max_retry_delay_ms = max_delay;
        }
        if let Some(interval) = cli.poll_interval {
            config.polling.interval_seconds = interval;
        }
        if let Some(max_polls) = cli.max_polls {
            config.polling.max_attempts = max_polls;
        }
        if let Some(format) = cli.format {
            config.output.format = format;
        }
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        config
    }

    /// Merge two configurations (second takes precedence for set values)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        // API settings
        if !override_config.api.url.is_empty() {
            base.api.url = override_config.api.url;
        }
        if !override_config.api.login.is_empty() {
            base.api.login = override_config.api.login;
        }
        if !override_config.api.password.is_empty() {
            base.api.password = override_config.api.password;
        }
        if override_config.api.interface_identifier.is_some() {
            base.api.interface_identifier = override_config.api.interface_identifier;
        }

        base.network = override_config.network;
        base.polling = override_config.polling;

        // Output settings
        base.output.format = override_config.output.format;
        base.output.verbose = override_config.output.verbose;
        base.output.quiet = override_config.output.quiet;
        if !override_config.output.log_level.is_empty() {
            base.output.log_level = override_config.output.log_level;
        }

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        let url = config.api.url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "API URL must start with http:// or https://: {}",
                url
            )));
        }

        if config.network.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if config.network.retry_attempts > 10 {
            return Err(ConfigError::Validation(
                "Retry attempts cannot exceed 10".to_string(),
            ));
        }

        if config.polling.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "Max polls must be greater than 0".to_string(),
            ));
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env<T: FromStr>(env: &impl EnvProvider, key: &str) -> Result<Option<T>> {
    env.get(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, value)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// Mock environment variable provider for testing
    #[derive(Default)]
    struct MockEnvProvider {
        vars: HashMap<String, String>,
    }

    impl MockEnvProvider {
        fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
            self.vars.insert(key.into(), value.into());
        }
    }

    impl EnvProvider for MockEnvProvider {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.api.url, DEFAULT_API_URL);
        assert!(config.api.login.is_empty());
        assert_eq!(config.api.interface_identifier, None);

        assert_eq!(config.network.timeout_seconds, 30);
        assert_eq!(config.network.retry_attempts, 3);
        assert_eq!(config.network.retry_delay_ms, 1000);

        assert_eq!(config.polling.interval_seconds, 10);
        assert_eq!(config.polling.max_attempts, 30);

        assert_eq!(config.output.format, OutputFormat::Human);
        assert_eq!(config.output.log_level, "info");
        assert!(ConfigManager::validate_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_load_partial_toml_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("smartapi-credit.toml");

        fs::write(
            &config_path,
            r#"
[api]
login = "lender"
password = "hunter2"
interface_identifier = "SmartAPITestingIdentifier"

[polling]
interval_seconds = 2
max_attempts = 5

[output]
format = "json"
"#,
        )
        .unwrap();

        let config = ConfigManager::load_from_file(&config_path).await.unwrap();

        assert_eq!(config.api.url, DEFAULT_API_URL);
        assert_eq!(config.api.login, "lender");
        assert_eq!(
            config.api.interface_identifier.as_deref(),
            Some("SmartAPITestingIdentifier")
        );
        assert_eq!(config.polling.interval_seconds, 2);
        assert_eq!(config.network.timeout_seconds, 30);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[tokio::test]
    async fn test_load_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        fs::write(
            &config_path,
            r#"{
  "api": { "url": "https://credit.example.com/inetapi/request_products.aspx" },
  "network": { "timeout_seconds": 45, "retry_attempts": 2, "retry_delay_ms": 500, "max_retry_delay_ms": 4000 }
}"#,
        )
        .unwrap();

        let config = ConfigManager::load_from_file(&config_path).await.unwrap();
        assert_eq!(
            config.api.url,
            "https://credit.example.com/inetapi/request_products.aspx"
        );
        assert_eq!(config.network.timeout_seconds, 45);
        assert_eq!(config.network.max_retry_delay_ms, 4000);
        assert_eq!(config.polling, PollingConfig::default());
    }

    #[tokio::test]
    async fn test_unsupported_file_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "api: {}").unwrap();

        match ConfigManager::load_from_file(&config_path).await.unwrap_err() {
            ConfigError::UnsupportedFormat(ext) => assert_eq!(ext, "yaml"),
            other => panic!("Expected UnsupportedFormat error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "invalid toml [[[").unwrap();

        let result = ConfigManager::load_from_file(&config_path).await;
        assert!(matches!(result.unwrap_err(), ConfigError::TomlParsing(_)));
    }

    #[test]
    fn test_environment_overrides() {
        let mut mock_env = MockEnvProvider::default();
        mock_env.set("SMARTAPI_URL", "https://env.example.com/api");
        mock_env.set("SMARTAPI_LOGIN", "env-user");
        mock_env.set("SMARTAPI_PASSWORD", "env-pass");
        mock_env.set("SMARTAPI_TIMEOUT", "120");
        mock_env.set("SMARTAPI_POLL_INTERVAL", "3");
        mock_env.set("SMARTAPI_MAX_POLLS", "7");
        mock_env.set("SMARTAPI_FORMAT", "JSON");
        mock_env.set("SMARTAPI_MAX_RETRY_DELAY_MS", "8000");

        let config =
            ConfigManager::apply_environment_overrides_with(&mock_env, Config::default()).unwrap();

        assert_eq!(config.api.url, "https://env.example.com/api");
        assert_eq!(config.api.login, "env-user");
        assert_eq!(config.network.timeout_seconds, 120);
        assert_eq!(config.polling.interval_seconds, 3);
        assert_eq!(config.polling.max_attempts, 7);
        assert_eq!(config.network.max_retry_delay_ms, 8000);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.credentials().is_ok());
    }

    #[test]
    fn test_invalid_environment_values() {
        let mut mock_env = MockEnvProvider::default();
        mock_env.set("SMARTAPI_MAX_POLLS", "many");

        let result = ConfigManager::apply_environment_overrides_with(&mock_env, Config::default());
        assert!(matches!(result.unwrap_err(), ConfigError::Environment(_)));

        let mut mock_env = MockEnvProvider::default();
        mock_env.set("SMARTAPI_FORMAT", "xml");
        let result = ConfigManager::apply_environment_overrides_with(&mock_env, Config::default());
        assert!(matches!(result.unwrap_err(), ConfigError::Environment(_)));
    }

    #[test]
    fn test_merge_with_cli() {
        use clap::Parser;

        let cli = Cli::try_parse_from([
            "smartapi-credit",
            "--timeout",
            "90",
            "--max-polls",
            "4",
            "--max-retry-delay",
            "2500",
            "--format",
            "json",
            "--quiet",
            "inspect",
            "response.xml",
        ])
        .unwrap();

        let mut base = Config::default();
        base.network.retry_attempts = 6;
        let config = ConfigManager::merge_with_cli(base, &cli);

        assert_eq!(config.network.timeout_seconds, 90);
        assert_eq!(config.network.retry_attempts, 6);
        assert_eq!(config.polling.max_attempts, 4);
        assert_eq!(config.network.max_retry_delay_ms, 2500);
        assert_eq!(config.http_client_config().max_retry_delay_ms, 2500);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.quiet);
    }

    #[test]
    fn test_merge_configs_keeps_unset_credentials() {
        let mut base = Config::default();
        base.api.login = "base-user".to_string();

        let mut override_config = Config::default();
        override_config.api.password = "override-pass".to_string();
        override_config.network.timeout_seconds = 60;

        let merged = ConfigManager::merge_configs(base, override_config);
        assert_eq!(merged.api.login, "base-user");
        assert_eq!(merged.api.password, "override-pass");
        assert_eq!(merged.network.timeout_seconds, 60);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(ConfigManager::validate_config(&config).is_ok());

        config.api.url = "ftp://example.com".to_string();
        assert!(ConfigManager::validate_config(&config).is_err());
        config.api.url = DEFAULT_API_URL.to_string();

        config.network.timeout_seconds = 0;
        assert!(ConfigManager::validate_config(&config).is_err());
        config.network.timeout_seconds = 30;

        config.polling.max_attempts = 0;
        assert!(ConfigManager::validate_config(&config).is_err());
        config.polling.max_attempts = 1;

        config.output.verbose = true;
        config.output.quiet = true;
        assert!(ConfigManager::validate_config(&config).is_err());
    }

    #[test]
    fn test_credentials_required_for_orders() {
        let config = Config::default();
        assert!(matches!(
            config.credentials(),
            Err(ConfigError::Validation(_))
        ));

        let err: CreditError = config.credentials().unwrap_err().into();
        assert!(matches!(err, CreditError::Config(_)));
    }

    #[test]
    fn test_derived_client_settings() {
        let mut config = Config::default();
        config.network.retry_attempts = 5;
        config.polling.interval_seconds = 4;

        assert_eq!(config.http_client_config().retry_attempts, 5);
        assert_eq!(config.poll_interval(), Duration::from_secs(4));
    }
}
