//! Shared configuration loader for the keeper toolchain.
//!
//! `defaults/keeper.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`KeeperConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use keeper_babel::chain::ChainOptions;
use keeper_babel::formats::lk_json::ExportOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_TOML: &str = include_str!("../defaults/keeper.default.toml");

/// Top-level configuration consumed by keeper applications.
#[derive(Debug, Clone, Deserialize)]
pub struct KeeperConfig {
    pub export: ExportConfig,
    pub chain: ChainConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

/// Format-specific export knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub lk_json: LkJsonConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LkJsonConfig {
    pub schema_version: u64,
    pub pretty: bool,
}

impl LkJsonConfig {
    /// Options for the lk-json exporter. Unknown schema versions are rejected
    /// here rather than at the first export.
    pub fn export_options(&self) -> Result<ExportOptions, ConfigError> {
        if !matches!(self.schema_version, 1 | 2) {
            return Err(ConfigError::Message(format!(
                "export.lk_json.schema_version must be 1 or 2, got {}",
                self.schema_version
            )));
        }
        Ok(ExportOptions {
            schema_version: self.schema_version,
            pretty: self.pretty,
        })
    }
}

/// Where the chain runner puts intermediate exports.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub keep_intermediates: bool,
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

impl From<&ChainConfig> for ChainOptions {
    fn from(config: &ChainConfig) -> Self {
        ChainOptions {
            work_dir: config.work_dir.clone(),
            keep_intermediates: config.keep_intermediates,
            ..ChainOptions::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    pub directory: PathBuf,
    pub write_file: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<KeeperConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<KeeperConfig, ConfigError> {
    Loader::new().build()
}
