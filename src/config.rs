use std::fs;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Provider;
use crate::error::SelectorError;

pub const CONFIG_FILE: &str = "source-selector.json";
pub const ENDPOINT_ENV: &str = "SOURCE_SELECTOR_ENDPOINT";
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_COLLECTION: &str = "documents";
const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub default_collection: Option<String>,
    #[serde(default)]
    pub providers: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub endpoint: String,
    pub timeout: Duration,
    pub default_collection: String,
    pub providers: Vec<Provider>,
    pub resources: Vec<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            default_collection: DEFAULT_COLLECTION.to_string(),
            providers: Vec::new(),
            resources: Vec::new(),
        }
    }
}

impl ResolvedConfig {
    pub fn with_endpoint_override(mut self, endpoint: Option<String>) -> Self {
        if let Some(endpoint) = endpoint.filter(|value| !value.trim().is_empty()) {
            self.endpoint = endpoint.trim().to_string();
        }
        self
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    // Explicit path, then ./source-selector.json, then the per-user file.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, SelectorError> {
        let config_path = match path {
            Some(path) => Some(Utf8PathBuf::from(path)),
            None => Self::default_paths()
                .into_iter()
                .find(|candidate| candidate.as_std_path().exists()),
        };

        let resolved = match config_path {
            Some(config_path) => {
                debug!(path = %config_path, "loading config");
                let content = fs::read_to_string(config_path.as_std_path())
                    .map_err(|_| SelectorError::ConfigRead(config_path.clone().into()))?;
                let config: Config = serde_json::from_str(&content)
                    .map_err(|err| SelectorError::ConfigParse(err.to_string()))?;
                Self::resolve_config(config)?
            }
            None => ResolvedConfig::default(),
        };

        Ok(resolved.with_endpoint_override(std::env::var(ENDPOINT_ENV).ok()))
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, SelectorError> {
        let schema_version = config.schema_version.unwrap_or(SCHEMA_VERSION);
        if schema_version != SCHEMA_VERSION {
            return Err(SelectorError::UnsupportedSchema(schema_version));
        }

        let providers = config
            .providers
            .iter()
            .map(|name| name.parse::<Provider>())
            .collect::<Result<Vec<Provider>, SelectorError>>()?;

        let resources = config
            .resources
            .into_iter()
            .map(|uri| uri.trim().to_string())
            .filter(|uri| !uri.is_empty())
            .collect();

        let defaults = ResolvedConfig::default();
        Ok(ResolvedConfig {
            schema_version,
            endpoint: config.endpoint.unwrap_or(defaults.endpoint),
            timeout: config
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            default_collection: config
                .default_collection
                .unwrap_or(defaults.default_collection),
            providers,
            resources,
        })
    }

    fn default_paths() -> Vec<Utf8PathBuf> {
        let mut paths = vec![Utf8PathBuf::from(CONFIG_FILE)];
        if let Some(user) = ProjectDirs::from("", "", "source-selector")
            .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.config_dir().join("config.json")).ok())
        {
            paths.push(user);
        }
        paths
    }
}
