//! Builder configuration
//!
//! Loaded from an optional TOML file, then overridden by `REQL_*`
//! environment variables (`REQL_NESTING_DEPTH=32`).

use crate::error::{Error, Result};
use crate::reql::{Normalizer, DEFAULT_NESTING_DEPTH};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "REQL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Maximum nesting of raw arrays/objects accepted by the normalizer
    pub nesting_depth: usize,

    /// Whether registering an existing command name replaces it
    pub allow_redefinition: bool,

    /// Default log level for the command-line tool
    pub log_level: String,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            nesting_depth: DEFAULT_NESTING_DEPTH,
            allow_redefinition: true,
            log_level: "info".to_string(),
        }
    }
}

impl BuilderConfig {
    /// Load from `path` (if any) and the environment, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder
                .add_source(config::File::from(path).format(config::FileFormat::Toml));
        }
        let config: Self = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .and_then(|raw| raw.try_deserialize())
            .map_err(|e| Error::Config(e.to_string()))?;

        config.validate()?;
        debug!(?config, "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.nesting_depth == 0 {
            return Err(Error::Config("nesting_depth must be at least 1".into()));
        }
        Ok(())
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.nesting_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BuilderConfig::default();
        assert_eq!(config.nesting_depth, 20);
        assert!(config.allow_redefinition);
        assert_eq!(config.normalizer().nesting_depth(), 20);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BuilderConfig::from_toml_str("nesting_depth = 8").unwrap();
        assert_eq!(config.nesting_depth, 8);
        assert!(config.allow_redefinition);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_toml_round_trip() {
        let config = BuilderConfig {
            allow_redefinition: false,
            ..BuilderConfig::default()
        };
        let text = config.to_toml().unwrap();
        assert!(text.contains("allow_redefinition = false"));
        assert_eq!(BuilderConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err = BuilderConfig::from_toml_str("nesting_depth = 0").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("reql-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "nesting_depth = 5\nlog_level = \"debug\"").unwrap();

        let config = BuilderConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.nesting_depth, 5);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = BuilderConfig::load(Some(Path::new("/nonexistent/reql.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
