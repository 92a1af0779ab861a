use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Worker counts and limits for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Number of producer threads.
    pub producers: usize,
    /// Number of consumer threads.
    pub consumers: usize,
    /// Total items produced and consumed before the run ends.
    pub max_items: usize,
    /// Maximum number of items buffered at once.
    pub capacity: usize,
}

impl Config {
    pub fn new(producers: usize, consumers: usize, max_items: usize, capacity: usize) -> Self {
        Self {
            producers,
            consumers,
            max_items,
            capacity,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("producers", self.producers),
            ("consumers", self.consumers),
            ("max_items", self.max_items),
            ("capacity", self.capacity),
        ];
        match fields.into_iter().find(|(_, value)| *value == 0) {
            Some((field, _)) => Err(ConfigError::NotPositive { field }),
            None => Ok(()),
        }
    }

    /// Parses and validates a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(3, 2, 100, 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_fields_rejected() {
        let cases = [
            (Config::new(0, 1, 1, 1), "producers"),
            (Config::new(1, 0, 1, 1), "consumers"),
            (Config::new(1, 1, 0, 1), "max_items"),
            (Config::new(1, 1, 1, 0), "capacity"),
        ];
        for (config, expected) in cases {
            match config.validate() {
                Err(ConfigError::NotPositive { field }) => assert_eq!(field, expected),
                other => panic!("expected NotPositive for {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_from_toml_partial() {
        let config = Config::from_toml_str("producers = 8\ncapacity = 1\n").unwrap();
        assert_eq!(config, Config::new(8, 2, 100, 1));
    }

    #[test]
    fn test_from_toml_rejects_unknown_and_zero() {
        assert!(matches!(
            Config::from_toml_str("threads = 4"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::from_toml_str("max_items = 0"),
            Err(ConfigError::NotPositive { field: "max_items" })
        ));
        assert!(matches!(
            Config::from_toml_str("consumers = -1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/prodcon.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/prodcon.toml"));
    }
}
