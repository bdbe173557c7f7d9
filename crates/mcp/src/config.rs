use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use wayfarer_core::storage::{FilesystemBackend, RedbBackend};
use wayfarer_core::ResultStore;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(skip)]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// One JSON file per record under a directory per namespace
    #[default]
    Filesystem,
    /// A table per namespace in one embedded database file
    Redb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendKind,

    #[serde(default = "default_redb_file")]
    pub redb_file: String,
}

fn default_redb_file() -> String {
    "wayfarer.redb".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            redb_file: default_redb_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_serpapi_url")]
    pub serpapi_url: String,

    #[serde(default = "default_nws_url")]
    pub nws_url: String,

    #[serde(default = "default_weatherstack_url")]
    pub weatherstack_url: String,

    #[serde(default = "default_nominatim_url")]
    pub nominatim_url: String,

    /// Sent to NWS and Nominatim, both of which require one
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_serpapi_url() -> String {
    "https://serpapi.com".to_string()
}

fn default_nws_url() -> String {
    "https://api.weather.gov".to_string()
}

fn default_weatherstack_url() -> String {
    "https://api.weatherstack.com".to_string()
}

fn default_nominatim_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_user_agent() -> String {
    concat!("wayfarer-mcp/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            serpapi_url: default_serpapi_url(),
            nws_url: default_nws_url(),
            weatherstack_url: default_weatherstack_url(),
            nominatim_url: default_nominatim_url(),
            user_agent: default_user_agent(),
        }
    }
}

/// Default `max_results` when a tool call does not give one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_flights")]
    pub flights: usize,

    #[serde(default = "default_twenty")]
    pub hotels: usize,

    #[serde(default = "default_twenty")]
    pub events: usize,

    #[serde(default = "default_locations")]
    pub locations: usize,
}

fn default_flights() -> usize {
    10
}

fn default_twenty() -> usize {
    20
}

fn default_locations() -> usize {
    10
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            flights: default_flights(),
            hotels: default_twenty(),
            events: default_twenty(),
            locations: default_locations(),
        }
    }
}

impl ServerConfig {
    pub fn load(config_path: &Path, data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        // Load config file if it exists, otherwise use defaults
        let mut config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .context("Failed to read configuration file")?;
            toml::from_str(&content).context("Failed to parse configuration file")?
        } else {
            tracing::info!("Configuration file not found, using defaults");
            Self::default()
        };

        config.data_dir = data_dir;

        Ok(config)
    }

    pub fn redb_path(&self) -> PathBuf {
        self.data_dir.join(&self.storage.redb_file)
    }

    /// Open the configured backend under the data directory
    pub fn open_store(&self) -> Result<ResultStore> {
        let store = match self.storage.backend {
            BackendKind::Filesystem => ResultStore::new(
                FilesystemBackend::new(self.data_dir.clone())
                    .context("Failed to open filesystem storage")?,
            ),
            BackendKind::Redb => ResultStore::new(
                RedbBackend::new(self.redb_path()).context("Failed to open redb storage")?,
            ),
        };
        tracing::info!(
            backend = ?self.storage.backend,
            data_dir = %self.data_dir.display(),
            "Opened result store"
        );
        Ok(store)
    }
}
