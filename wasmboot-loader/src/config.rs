// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Loader, bindings and logging configuration.
//!
//! Read from a TOML file with `[loader]`, `[bindings]` and `[logging]`
//! sections. Every field has a default, so an empty file is valid.

use std::{fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};
use wasmboot_error::{codes, Error, Result};

use crate::{source::DEFAULT_CHUNK_SIZE, strategy::StrategyPreference};

/// Resource loaded when none is given
pub const DEFAULT_RESOURCE: &str = "main.wasm";

/// Entry point export called on the first instance
pub const DEFAULT_ENTRY_POINT: &str = "_start";

/// Import module the built-in bindings are registered under
pub const DEFAULT_BINDINGS_MODULE: &str = "env";

/// How a module is located, fetched and run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Module resource, relative to `base` unless absolute
    pub resource:   String,
    /// Directory or URL relative resources resolve against
    pub base:       Option<String>,
    /// Compile strategy preference
    pub strategy:   StrategyPreference,
    /// Chunk size for file sources
    pub chunk_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            resource:   DEFAULT_RESOURCE.to_string(),
            base:       None,
            strategy:   StrategyPreference::Auto,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl LoaderConfig {
    /// Check values serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::config_error(codes::INVALID_CONFIG, "chunk_size must be positive"));
        }
        Ok(())
    }
}

/// The default bridge: its built-in host bindings and the export it runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingsConfig {
    /// Import module name of the built-ins
    pub module:        String,
    /// Provide `log(level, ptr, len)`
    pub guest_logging: bool,
    /// Provide `exit(code)`
    pub exit:          bool,
    /// Zero-argument export run on the first instance
    pub entry_point:   String,
}

impl Default for BindingsConfig {
    fn default() -> Self {
        Self {
            module:        DEFAULT_BINDINGS_MODULE.to_string(),
            guest_logging: true,
            exit:          true,
            entry_point:   DEFAULT_ENTRY_POINT.to_string(),
        }
    }
}

impl BindingsConfig {
    /// Check values serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.entry_point.trim().is_empty() {
            return Err(Error::config_error(codes::INVALID_CONFIG, "entry_point must not be empty"));
        }
        if self.module.is_empty() {
            return Err(Error::config_error(codes::INVALID_CONFIG, "module must not be empty"));
        }
        Ok(())
    }
}

/// Output format of the daemon's log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human readable output
    #[default]
    Pretty,
    /// Single-line output
    Compact,
    /// JSON lines
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(Error::config_error(
                codes::INVALID_CONFIG,
                format!("unknown log format `{other}`"),
            )),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        })
    }
}

/// Log subscriber settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `wasmboot_loader=debug`
    pub level:  String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Pretty }
    }
}

/// Complete daemon configuration file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// `[loader]`
    pub loader:   LoaderConfig,
    /// `[bindings]`
    pub bindings: BindingsConfig,
    /// `[logging]`
    pub logging:  LoggingConfig,
}

impl DaemonConfig {
    /// Read and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::config_error(
                codes::INVALID_CONFIG,
                format!("cannot read {}: {e}", path.display()),
            )
        })?;
        Self::from_toml_str(&text).map_err(|e| e.context(path.display()))
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| Error::config_error(codes::CONFIG_PARSE, e.to_string()))?;
        config.loader.validate()?;
        config.bindings.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = DaemonConfig::from_toml_str("").unwrap();
        assert_eq!(config, DaemonConfig::default());
        assert_eq!(config.loader.resource, "main.wasm");
        assert_eq!(config.bindings.entry_point, "_start");
        assert_eq!(config.loader.chunk_size, 64 * 1024);
        assert_eq!(config.bindings.module, "env");
        assert!(config.bindings.guest_logging && config.bindings.exit);
    }

    #[test]
    fn test_partial_sections() {
        let config = DaemonConfig::from_toml_str(
            r#"
            [loader]
            base = "http://localhost:8080/plugin"
            strategy = "buffered"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.loader.base.as_deref(), Some("http://localhost:8080/plugin"));
        assert_eq!(config.loader.strategy, StrategyPreference::Buffered);
        assert_eq!(config.loader.resource, "main.wasm");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let err = DaemonConfig::from_toml_str("[loader\nresource = 1").unwrap_err();
        assert_eq!(err.code, codes::CONFIG_PARSE);

        let err = DaemonConfig::from_toml_str("[loader]\nstrategy = \"eager\"").unwrap_err();
        assert_eq!(err.code, codes::CONFIG_PARSE);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = DaemonConfig::from_toml_str("[loader]\nchunk_size = 0").unwrap_err();
        assert_eq!(err.code, codes::INVALID_CONFIG);
    }

    #[test]
    fn test_entry_point_belongs_to_bindings() {
        let config = DaemonConfig::from_toml_str("[bindings]\nentry_point = \"main\"").unwrap();
        assert_eq!(config.bindings.entry_point, "main");

        let err = DaemonConfig::from_toml_str("[bindings]\nentry_point = \"\"").unwrap_err();
        assert_eq!(err.code, codes::INVALID_CONFIG);
    }
}
