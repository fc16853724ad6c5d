use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::{Context, eyre};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::query::QueryNormalizer;
use crate::selection::SelectionPolicy;
use crate::upstream::Stage;

const DEFAULT_CATALOG_URL: &str = "https://eu.qobuz.squid.wtf/api/get-music";
const DEFAULT_RESOLVER_URL: &str = "https://eu.qobuz.squid.wtf/api/download-music";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-call upstream timeout, e.g. "10s" or "1500ms"
    pub timeout: String,
    pub catalog: CatalogConfig,
    pub selection: SelectionConfig,
    pub resolver: ResolverConfig,
    pub normalizer: NormalizerConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermPlacement {
    /// `?q=<term>`
    Query,
    /// `<base_url>/<term>`, spaces encoded as `%20`
    Path,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    pub term_placement: TermPlacement,
    pub query_param: String,
    pub offset_param: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Deep,
    Flat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub policy: PolicyKind,
    pub id_field: String,
    /// Deep search only
    pub marker_field: String,
    /// Flat list only, dotted path such as `tracks.items`
    pub list_field: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub base_url: String,
    pub id_param: String,
    pub quality_param: String,
    pub envelope: Option<String>,
    pub url_field: String,
    pub stage: ResolveStage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveStage {
    Download,
    Stream,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub site_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseField {
    Url,
    StreamUrl,
}

impl ResponseField {
    pub fn key(self) -> &'static str {
        match self {
            ResponseField::Url => "url",
            ResponseField::StreamUrl => "stream_url",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub response_field: ResponseField,
    /// Include raw upstream error text in failure bodies
    pub expose_upstream_details: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: "10s".to_string(),
            catalog: CatalogConfig::default(),
            selection: SelectionConfig::default(),
            resolver: ResolverConfig::default(),
            normalizer: NormalizerConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CATALOG_URL.to_string(),
            term_placement: TermPlacement::Query,
            query_param: "q".to_string(),
            offset_param: "offset".to_string(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Deep,
            id_field: "id".to_string(),
            marker_field: "isrc".to_string(),
            list_field: "tracks".to_string(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_RESOLVER_URL.to_string(),
            id_param: "track_id".to_string(),
            quality_param: "quality".to_string(),
            envelope: Some("data".to_string()),
            url_field: "url".to_string(),
            stage: ResolveStage::Download,
        }
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            site_prefixes: vec![
                "https://www.last.fm/music/".to_string(),
                "https://musicbrainz.org/recording/".to_string(),
            ],
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            response_field: ResponseField::Url,
            expose_upstream_details: false,
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("track-proxy").join("config.toml"))
    }

    /// Load the default config file, falling back to built-in defaults when it doesn't exist
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Write the default config to the default path, if it doesn't exist
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().ok_or_else(|| eyre!("No config directory available"))?;
        Self::default().write_if_missing(&path)?;
        Ok(path)
    }

    fn write_if_missing(&self, path: &Path) -> Result<()> {
        if path.exists() {
            tracing::info!("Config already exists at {}", path.display());
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).wrap_err("Failed to serialize config")?;
        std::fs::write(path, contents)
            .wrap_err_with(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Checks the parts that would otherwise only fail on the first request
    pub fn validate(&self) -> Result<()> {
        self.timeout()?;
        Url::parse(&self.catalog.base_url)
            .wrap_err_with(|| format!("Invalid catalog base_url: {}", self.catalog.base_url))?;
        Url::parse(&self.resolver.base_url)
            .wrap_err_with(|| format!("Invalid resolver base_url: {}", self.resolver.base_url))?;
        Ok(())
    }

    pub fn timeout(&self) -> Result<Duration> {
        humantime::parse_duration(&self.timeout)
            .wrap_err_with(|| format!("Invalid timeout: {}", self.timeout))
    }

    pub fn selection_policy(&self) -> SelectionPolicy {
        let s = &self.selection;
        match s.policy {
            PolicyKind::Deep => SelectionPolicy::DeepSearch {
                id_field: s.id_field.clone(),
                marker_field: s.marker_field.clone(),
            },
            PolicyKind::Flat => SelectionPolicy::FlatList {
                list_field: s.list_field.clone(),
                id_field: s.id_field.clone(),
            },
        }
    }

    pub fn normalizer(&self) -> QueryNormalizer {
        QueryNormalizer::new(self.normalizer.site_prefixes.clone())
    }

    pub fn resolve_stage(&self) -> Stage {
        match self.resolver.stage {
            ResolveStage::Download => Stage::Download,
            ResolveStage::Stream => Stage::Stream,
        }
    }
}
