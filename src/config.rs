//! Run configuration
//!
//! Everything has a default, so a run can be configured entirely from the
//! command line. A TOML file may supply the same settings; flags given on
//! the command line take precedence.
//!
//! ```toml
//! output_dir = "output"
//! pages = 3
//! targets = ["sao-paulo", "campinas"]
//! sort = ["most-recent", "lowest-price"]
//!
//! [[custom_targets]]
//! id = "santos-casas"
//! url = "https://www.vivareal.com.br/venda/sp/santos/casa_residencial/"
//!
//! [extract]
//! retries = 3
//! coordinates = false
//! ```

use crate::models::SearchTarget;
use crate::scrapers::types::{ExtractOptions, HarvestOptions, SortStrategy};
use crate::sync::DEFAULT_GCS_ENDPOINT;
use crate::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Named search scopes known to the crawler
pub const KNOWN_TARGETS: &[(&str, &str)] = &[
    (
        "sao-paulo",
        "https://www.vivareal.com.br/venda/sp/sao-paulo/apartamento_residencial/",
    ),
    (
        "rio-de-janeiro",
        "https://www.vivareal.com.br/venda/rj/rio-de-janeiro/apartamento_residencial/",
    ),
    (
        "belo-horizonte",
        "https://www.vivareal.com.br/venda/mg/belo-horizonte/apartamento_residencial/",
    ),
    (
        "campinas",
        "https://www.vivareal.com.br/venda/sp/campinas/apartamento_residencial/",
    ),
    (
        "curitiba",
        "https://www.vivareal.com.br/venda/pr/curitiba/apartamento_residencial/",
    ),
];

const MAX_RETRIES: u32 = 10;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output_dir: PathBuf,
    /// Result pages harvested per target
    pub pages: u32,
    /// Cap on consolidated links sent to detail extraction
    pub links_limit: Option<usize>,
    pub headless: bool,
    /// Names from [`KNOWN_TARGETS`]
    pub targets: Vec<String>,
    pub custom_targets: Vec<CustomTarget>,
    pub sort: Vec<SortStrategy>,
    pub harvest: HarvestOptions,
    pub extract: ExtractOptions,
    pub sync: SyncConfig,
}

/// A search URL not in the built-in registry
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CustomTarget {
    pub id: String,
    pub url: String,
}

/// Bucket mirroring settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub bucket: Option<String>,
    pub endpoint: String,
    pub token: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            endpoint: DEFAULT_GCS_ENDPOINT.to_string(),
            token: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            pages: 5,
            links_limit: None,
            headless: true,
            targets: vec!["sao-paulo".to_string()],
            custom_targets: Vec::new(),
            sort: vec![SortStrategy::MostRecent],
            harvest: HarvestOptions::default(),
            extract: ExtractOptions::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl Config {
    pub fn links_dir(&self) -> PathBuf {
        self.output_dir.join("links")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.output_dir.join("dados")
    }

    pub fn debug_dir(&self) -> PathBuf {
        self.output_dir.join("debug")
    }

    /// Expands targets × sort strategies into the search targets to harvest
    pub fn search_targets(&self) -> Result<Vec<SearchTarget>, ConfigError> {
        let mut bases: Vec<(String, String)> = Vec::new();
        for name in &self.targets {
            let url = KNOWN_TARGETS
                .iter()
                .find(|(known, _)| known == name)
                .map(|(_, url)| url.to_string())
                .ok_or_else(|| ConfigError::UnknownTarget(name.clone()))?;
            bases.push((name.clone(), url));
        }
        for custom in &self.custom_targets {
            bases.push((custom.id.clone(), custom.url.clone()));
        }

        let sorts: &[SortStrategy] = if self.sort.is_empty() {
            &[SortStrategy::Relevance]
        } else {
            &self.sort
        };

        let mut targets = Vec::new();
        for (id, url) in &bases {
            for sort in sorts {
                targets.push(SearchTarget::new(
                    format!("{}_{}", id, sort.slug()),
                    url.clone(),
                    sort.suffix(),
                ));
            }
        }
        Ok(targets)
    }
}

/// Loads and validates a TOML configuration file
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.pages < 1 {
        return Err(ConfigError::Validation("pages must be >= 1".to_string()));
    }

    if config.targets.is_empty() && config.custom_targets.is_empty() {
        return Err(ConfigError::Validation(
            "at least one target is required".to_string(),
        ));
    }

    for custom in &config.custom_targets {
        if custom.id.trim().is_empty() || custom.url.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "custom target needs both id and url, got id='{}' url='{}'",
                custom.id, custom.url
            )));
        }
        if url::Url::parse(&custom.url).is_err() {
            return Err(ConfigError::Validation(format!(
                "custom target '{}' has an invalid url: {}",
                custom.id, custom.url
            )));
        }
    }

    if config.extract.retries > MAX_RETRIES {
        return Err(ConfigError::Validation(format!(
            "extract.retries must be <= {}, got {}",
            MAX_RETRIES, config.extract.retries
        )));
    }

    if config.extract.pause_min_ms > config.extract.pause_max_ms {
        return Err(ConfigError::Validation(format!(
            "extract.pause_min_ms ({}) must not exceed extract.pause_max_ms ({})",
            config.extract.pause_min_ms, config.extract.pause_max_ms
        )));
    }

    // Resolve names now so a typo fails before the browser starts
    config.search_targets()?;

    Ok(())
}
