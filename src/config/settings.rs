//! TOML-based configuration for typeql.
//!
//! Example configuration (`typeql.toml`):
//! ```toml
//! [compiler]
//! dialect = "sqlite"    # built-in name or a key of [dialects]
//! layout = "pretty"     # or "compact" (default)
//!
//! [dialects.postgresish]
//! parameter_prefix = "$"
//! bool_encoding = "keyword"
//! string_concat = { operator = "||" }
//! paging = "limit_offset"
//! identifier_quote = "double"
//! ```
//!
//! Settings are only ever read here; compilation itself takes a resolved
//! [`CompileOptions`] value.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::compile::CompileOptions;
use crate::sql::dialect::{Dialect, DialectConfig};
use crate::sql::token::Layout;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Compiler defaults.
    pub compiler: CompilerSettings,

    /// Custom dialects, by name.
    pub dialects: HashMap<String, DialectConfig>,
}

/// Compiler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Dialect name: a key of `[dialects]` or a built-in (`sqlserver`, `sqlite`).
    pub dialect: String,

    /// Output layout.
    pub layout: Layout,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::default().to_string(),
            layout: Layout::default(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        debug!(path = %path.display(), "loading settings");
        Self::from_toml_str(&content)
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `TYPEQL_CONFIG`
    /// 2. `./typeql.toml`
    ///
    /// Falls back to defaults when neither exists.
    pub fn discover() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("TYPEQL_CONFIG") {
            return Self::load(&path);
        }

        let local_config = PathBuf::from("typeql.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Settings::default())
    }

    /// Resolve a dialect by name; custom dialects shadow built-ins.
    pub fn dialect(&self, name: &str) -> Result<DialectConfig, SettingsError> {
        if let Some(config) = self.dialects.get(name) {
            let mut config = config.clone();
            if config.name.is_empty() {
                config.name = name.to_string();
            }
            return Ok(config);
        }
        Dialect::from_name(name)
            .map(|d| d.config())
            .ok_or_else(|| SettingsError::UnknownDialect(name.to_string()))
    }

    /// Compile options for the configured dialect and layout.
    pub fn compile_options(&self) -> Result<CompileOptions, SettingsError> {
        let dialect = self.dialect(&self.compiler.dialect)?;
        Ok(CompileOptions::new(dialect).with_layout(self.compiler.layout))
    }

    fn validate(&self) -> Result<(), SettingsError> {
        for (name, config) in &self.dialects {
            if config.parameter_prefix.is_empty() {
                return Err(SettingsError::InvalidConfig(format!(
                    "dialect '{}' has an empty parameter_prefix",
                    name
                )));
            }
            if config.false_predicate.trim().is_empty() {
                return Err(SettingsError::InvalidConfig(format!(
                    "dialect '{}' has an empty false_predicate",
                    name
                )));
            }
        }
        Ok(())
    }
}
