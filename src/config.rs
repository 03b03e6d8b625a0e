use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::engine::{RelationEngineBuilder, DEFAULT_RELATIONS_KEY};
use crate::metadata::{is_valid_element_name, MetadataStore};
use crate::serializer::{Serializer, DEFAULT_XML_ROOT_NAME};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub relations: RelationsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Relation engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelationsConfig {
    /// Key holding the relations map in JSON / YAML output
    #[serde(default = "default_relations_key")]
    pub key: String,
    /// Directories scanned for `.yml` / `.yaml` relation metadata
    #[serde(default)]
    pub metadata_dirs: Vec<PathBuf>,
    #[serde(default = "default_xml_root_name")]
    pub xml_root_name: String,
}

impl Default for RelationsConfig {
    fn default() -> Self {
        Self {
            key: default_relations_key(),
            metadata_dirs: Vec::new(),
            xml_root_name: default_xml_root_name(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_relations_key() -> String {
    DEFAULT_RELATIONS_KEY.to_string()
}

fn default_xml_root_name() -> String {
    DEFAULT_XML_ROOT_NAME.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in RELEMBED_CONFIG environment variable
    /// 2. ./relembed.toml in current directory
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let config_path = std::env::var("RELEMBED_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("relembed.toml"));

        Self::from_file(&config_path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        log::debug!("Reading config file {}", path.display());
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml_str(&config_str)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse relembed config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.relations.key.trim().is_empty() {
            anyhow::bail!("relations.key must not be empty");
        }

        if !is_valid_element_name(&self.relations.xml_root_name) {
            anyhow::bail!(
                "relations.xml_root_name is not a valid XML element name: {}",
                self.relations.xml_root_name
            );
        }

        for dir in &self.relations.metadata_dirs {
            if !dir.is_dir() {
                anyhow::bail!(
                    "metadata directory does not exist or is not a directory: {}",
                    dir.display()
                );
            }
        }

        Ok(())
    }

    /// Load every configured metadata directory into one store
    pub fn metadata_store(&self) -> Result<MetadataStore> {
        let mut builder = MetadataStore::builder();
        for dir in &self.relations.metadata_dirs {
            builder
                .add_dir(dir)
                .with_context(|| format!("Failed to load relation metadata from {}", dir.display()))?;
        }
        Ok(builder.build())
    }

    /// Engine builder preset with the configured relations key
    pub fn engine_builder(&self, store: Arc<MetadataStore>) -> RelationEngineBuilder {
        RelationEngineBuilder::new(store).relations_key(self.relations.key.clone())
    }

    /// Serializer preset with the configured XML root name
    pub fn serializer(&self) -> Serializer {
        Serializer::new().with_xml_root_name(self.relations.xml_root_name.clone())
    }
}
