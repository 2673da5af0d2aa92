//! Configuration management for the carin CLI and client library

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::error::{CarinError, Result};

const DEFAULT_BASE_URL: &str = "http://localhost:9000";
const CREDENTIALS_FILE: &str = "credentials.json";

/// Settings the CLI keeps in its own JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub endpoint: String,
    pub timeout: u64,
    pub storage_dir: PathBuf,
    pub token_storage_enabled: bool,
    #[serde(default)]
    pub maps_api_key: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_BASE_URL.to_string(),
            timeout: 30,
            storage_dir: default_storage_dir(),
            token_storage_enabled: true,
            maps_api_key: None,
        }
    }
}

impl CliConfig {
    pub async fn load(config_path: Option<&Path>) -> Result<Self> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => default_config_path(),
        };

        if config_file.exists() {
            let content = fs::read_to_string(&config_file).await?;

            match serde_json::from_str::<Self>(&content) {
                Ok(config) => Ok(config),
                Err(e) => {
                    tracing::warn!(
                        path = %config_file.display(),
                        error = %e,
                        "unreadable config file, rewriting defaults"
                    );
                    let config = Self::default();
                    config.save(&config_file).await?;
                    Ok(config)
                }
            }
        } else {
            let config = Self::default();
            config.save(&config_file).await?;
            Ok(config)
        }
    }

    pub async fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, content).await?;
        Ok(())
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.storage_dir.join(CREDENTIALS_FILE)
    }

    /// Client settings with this file's values as defaults; `CARIN_*`
    /// environment variables still win
    pub fn to_client_config(&self) -> Result<ClientConfig> {
        self.client_config_with_env(carin_environment())
    }

    fn client_config_with_env(&self, env: Environment) -> Result<ClientConfig> {
        let use_proxy =
            !self.endpoint.contains("localhost") && !self.endpoint.contains("127.0.0.1");

        let defaults = ClientConfig {
            base_url: self.endpoint.clone(),
            timeout: self.timeout,
            use_proxy,
            token_storage: TokenStorageConfig {
                enabled: self.token_storage_enabled,
                storage_path: Some(self.credentials_path().to_string_lossy().to_string()),
                encryption_key: None,
            },
            maps_api_key: self.maps_api_key.clone(),
            ..ClientConfig::default()
        };

        ClientConfig::layered(&defaults, None, env)
    }
}

fn carin_environment() -> Environment {
    Environment::with_prefix("CARIN")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("carin")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.json")
}

pub fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("carin")
}

/// Credential storage configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TokenStorageConfig {
    #[serde(default)]
    pub enabled: bool,
    pub storage_path: Option<String>,
    pub encryption_key: Option<String>,
}

impl From<TokenStorageConfig> for crate::store::CredentialStoreConfig {
    fn from(config: TokenStorageConfig) -> Self {
        Self {
            enabled: config.enabled,
            storage_path: config.storage_path.map(PathBuf::from),
            encryption_key: config.encryption_key,
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Upper bound for one refresh exchange, in seconds
    #[serde(default = "default_renewal_timeout")]
    pub renewal_timeout: u64,
    /// Renew when fewer than this many seconds of token lifetime remain
    #[serde(default = "default_refresh_window")]
    pub refresh_window: u64,
    #[serde(default)]
    pub token_storage: TokenStorageConfig,
    #[serde(default = "default_use_proxy")]
    pub use_proxy: bool,
    /// Third-party maps key, carried for the route views
    #[serde(default)]
    pub maps_api_key: Option<String>,
}

fn default_timeout() -> u64 {
    30
}

fn default_renewal_timeout() -> u64 {
    10
}

fn default_refresh_window() -> u64 {
    60
}

fn default_use_proxy() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: default_timeout(),
            renewal_timeout: default_renewal_timeout(),
            refresh_window: default_refresh_window(),
            token_storage: TokenStorageConfig::default(),
            use_proxy: default_use_proxy(),
            maps_api_key: None,
        }
    }
}

/// Builder for ClientConfig
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    timeout: Option<u64>,
    renewal_timeout: Option<u64>,
    refresh_window: Option<u64>,
    token_storage: Option<TokenStorageConfig>,
    config_file: Option<PathBuf>,
    use_proxy: Option<bool>,
    maps_api_key: Option<String>,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn renewal_timeout(mut self, seconds: u64) -> Self {
        self.renewal_timeout = Some(seconds);
        self
    }

    pub fn refresh_window(mut self, seconds: u64) -> Self {
        self.refresh_window = Some(seconds);
        self
    }

    pub fn use_proxy(mut self, use_proxy: bool) -> Self {
        self.use_proxy = Some(use_proxy);
        self
    }

    pub fn token_storage(mut self, token_storage: TokenStorageConfig) -> Self {
        self.token_storage = Some(token_storage);
        self
    }

    pub fn maps_api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.maps_api_key = Some(key.into());
        self
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        let mut config = ClientConfig::from_file_and_env(self.config_file.as_deref())?;

        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(renewal_timeout) = self.renewal_timeout {
            config.renewal_timeout = renewal_timeout;
        }
        if let Some(refresh_window) = self.refresh_window {
            config.refresh_window = refresh_window;
        }
        if let Some(token_storage) = self.token_storage {
            config.token_storage = token_storage;
        }
        if let Some(use_proxy) = self.use_proxy {
            config.use_proxy = use_proxy;
        }
        if let Some(key) = self.maps_api_key {
            config.maps_api_key = Some(key);
        }

        config.validate()?;
        Ok(config)
    }
}

impl ClientConfig {
    pub fn new() -> Result<Self> {
        Self::from_file_and_env::<&str>(None)
    }

    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Defaults, then the optional file, then `CARIN_*` environment variables
    pub fn from_file_and_env<P: AsRef<Path>>(config_file: Option<P>) -> Result<Self> {
        Self::layered(
            &Self::default(),
            config_file.as_ref().map(|p| p.as_ref()),
            carin_environment(),
        )
    }

    /// `defaults`, then `config_file` if it exists, then `env`
    fn layered(defaults: &ClientConfig, config_file: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("base_url", defaults.base_url.as_str())?
            .set_default("timeout", defaults.timeout)?
            .set_default("renewal_timeout", defaults.renewal_timeout)?
            .set_default("refresh_window", defaults.refresh_window)?
            .set_default("use_proxy", defaults.use_proxy)?
            .set_default("token_storage.enabled", defaults.token_storage.enabled)?;

        if let Some(path) = &defaults.token_storage.storage_path {
            builder = builder.set_default("token_storage.storage_path", path.as_str())?;
        }
        if let Some(key) = &defaults.token_storage.encryption_key {
            builder = builder.set_default("token_storage.encryption_key", key.as_str())?;
        }
        if let Some(key) = &defaults.maps_api_key {
            builder = builder.set_default("maps_api_key", key.as_str())?;
        }

        if let Some(config_path) = config_file {
            if config_path.exists() {
                builder = builder.add_source(File::from(config_path));
            }
        }
        builder = builder.add_source(env);

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(CarinError::invalid_endpoint("Base URL cannot be empty"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(CarinError::invalid_endpoint(format!(
                "Base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.timeout == 0 {
            return Err(CarinError::config("timeout must be at least 1 second"));
        }
        if self.renewal_timeout == 0 {
            return Err(CarinError::config("renewal_timeout must be at least 1 second"));
        }
        Ok(())
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        let endpoint = endpoint.strip_prefix('/').unwrap_or(endpoint);
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn renewal_timeout(&self) -> Duration {
        Duration::from_secs(self.renewal_timeout)
    }

    pub fn refresh_window(&self) -> Duration {
        Duration::from_secs(self.refresh_window)
    }
}
