//! Parser configuration — limits and defaults, optionally loaded from YAML.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size given to a `table` whose size is omitted or not a plain number.
pub const DEFAULT_ARRAY_SIZE: usize = 100;

/// Parser limits and defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseConfig {
    /// Maximum canvas nesting depth, root included.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_array_size")]
    pub default_array_size: usize,
    /// Largest array whose saved contents are loaded.
    #[serde(default = "default_max_array_size")]
    pub max_array_size: usize,
}

fn default_max_depth() -> usize {
    64
}

fn default_array_size() -> usize {
    DEFAULT_ARRAY_SIZE
}

fn default_max_array_size() -> usize {
    1 << 24
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ParseConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load config from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            default_array_size: default_array_size(),
            max_array_size: default_max_array_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_config() {
        let config = ParseConfig::default();
        assert_eq!(config.max_depth, 64);
        assert_eq!(config.default_array_size, DEFAULT_ARRAY_SIZE);
        assert_eq!(config.max_array_size, 16_777_216);
    }

    #[test]
    fn serialize_deserialize() {
        let config = ParseConfig {
            max_depth: 8,
            default_array_size: 512,
            max_array_size: 4096,
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert_eq!(ParseConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config = ParseConfig::from_yaml("max_depth: 4\n").unwrap();
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.default_array_size, 100);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(matches!(
            ParseConfig::from_yaml("max_depth: deep\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "default_array_size: 35").unwrap();
        let config = ParseConfig::load(file.path()).unwrap();
        assert_eq!(config.default_array_size, 35);
        assert_eq!(config.max_depth, 64);
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ParseConfig::load(&dir.path().join("nope.yaml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
