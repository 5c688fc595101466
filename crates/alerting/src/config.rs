//! Model configuration.
//!
//! Loaded from an optional YAML file, then overridden from the environment:
//!
//! - `ALERTING_CONFIG`: path of the YAML file
//! - `ALERTING_UNKNOWN_STATE_SORT`: `last`, `first` or `reject`
//! - `ALERTING_MATCH_SEPARATOR`: separator between eval matches
//!
//! ```yaml
//! unknownStateSort: last
//! matchSeparator: ", "
//! searchCaseInsensitive: true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::annotation::DEFAULT_MATCH_SEPARATOR;
use crate::error::{ConfigError, ConfigResult};
use crate::state::UnknownStatePolicy;

/// Environment variable naming the config file.
pub const ENV_CONFIG_PATH: &str = "ALERTING_CONFIG";
const ENV_UNKNOWN_STATE_SORT: &str = "ALERTING_UNKNOWN_STATE_SORT";
const ENV_MATCH_SEPARATOR: &str = "ALERTING_MATCH_SEPARATOR";

fn default_match_separator() -> String {
    DEFAULT_MATCH_SEPARATOR.to_string()
}

const fn default_case_insensitive() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModelConfig {
    /// Where rules in a state without an urgency rank sort
    #[serde(default)]
    pub unknown_state_sort: UnknownStatePolicy,

    /// Separator between eval matches in annotation summaries
    #[serde(default = "default_match_separator")]
    pub match_separator: String,

    /// Rule list search ignores case
    #[serde(default = "default_case_insensitive")]
    pub search_case_insensitive: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            unknown_state_sort: UnknownStatePolicy::default(),
            match_separator: default_match_separator(),
            search_case_insensitive: default_case_insensitive(),
        }
    }
}

impl ModelConfig {
    /// Load and validate a YAML config file. Environment overrides are not
    /// applied.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, does not parse, or holds invalid
    /// values.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let config = Self::from_yaml(&raw)?;
        info!(path = %path.display(), "Loaded alerting config");
        Ok(config)
    }

    /// Parse and validate a YAML document.
    ///
    /// # Errors
    ///
    /// Fails when the document does not parse or holds invalid values.
    pub fn from_yaml(raw: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, or the file named by `ALERTING_CONFIG`, with environment
    /// overrides applied.
    ///
    /// # Errors
    ///
    /// Propagates file and override errors.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`ModelConfig::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Propagates file and override errors.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(ENV_CONFIG_PATH) {
            Some(path) if !path.is_empty() => Self::from_file(path)?,
            _ => {
                debug!("No config file configured, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Fails when an override holds an unusable value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_UNKNOWN_STATE_SORT) {
            self.unknown_state_sort = value.parse().map_err(|source| ConfigError::InvalidEnv {
                var: ENV_UNKNOWN_STATE_SORT,
                value: value.clone(),
                source,
            })?;
            debug!(policy = ?self.unknown_state_sort, "Sort policy overridden from environment");
        }

        if let Some(value) = lookup(ENV_MATCH_SEPARATOR) {
            self.match_separator = value;
        }

        self.validate()
    }

    /// Check field bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an empty match separator.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.match_separator.is_empty() {
            return Err(ConfigError::Invalid(
                "matchSeparator must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ModelConfig::from_yaml("{}").unwrap();
        assert_eq!(config, ModelConfig::default());
        assert_eq!(config.match_separator, ", ");
        assert!(config.search_case_insensitive);
        assert_eq!(config.unknown_state_sort, UnknownStatePolicy::Last);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "unknownStateSort: reject\nmatchSeparator: \" | \"").unwrap();

        let config = ModelConfig::from_file(file.path()).unwrap();
        assert_eq!(config.unknown_state_sort, UnknownStatePolicy::Reject);
        assert_eq!(config.match_separator, " | ");
    }

    #[test]
    fn test_missing_file() {
        let err = ModelConfig::from_file("/nonexistent/alerting.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            ModelConfig::from_yaml("matchSeparator: \"\"").unwrap_err(),
            ConfigError::Invalid(_)
        ));
        assert!(matches!(
            ModelConfig::from_yaml("unknownStateSort: middle").unwrap_err(),
            ConfigError::Parse(_)
        ));
        assert!(matches!(
            ModelConfig::from_yaml("separator: x").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ALERTING_UNKNOWN_STATE_SORT", "First"),
            ("ALERTING_MATCH_SEPARATOR", "; "),
        ]);
        let mut config = ModelConfig::default();
        config
            .apply_overrides(|var| env.get(var).map(ToString::to_string))
            .unwrap();
        assert_eq!(config.unknown_state_sort, UnknownStatePolicy::First);
        assert_eq!(config.match_separator, "; ");

        let mut config = ModelConfig::default();
        let err = config
            .apply_overrides(|var| (var == "ALERTING_UNKNOWN_STATE_SORT").then(|| "sideways".to_string()))
            .unwrap_err();
        assert!(matches!(
            &err,
            ConfigError::InvalidEnv { source, .. } if source.0 == "sideways"
        ));
        assert_eq!(
            err.to_string(),
            "Invalid value 'sideways' for ALERTING_UNKNOWN_STATE_SORT: \
             Unknown sort policy 'sideways', expected last, first or reject"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_from_lookup_reads_config_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "unknownStateSort: first\nsearchCaseInsensitive: false").unwrap();
        let path = file.path().display().to_string();

        let env: HashMap<&str, String> = HashMap::from([
            (ENV_CONFIG_PATH, path),
            (ENV_MATCH_SEPARATOR, " + ".to_string()),
        ]);
        let config = ModelConfig::from_lookup(|var| env.get(var).cloned()).unwrap();
        assert_eq!(config.unknown_state_sort, UnknownStatePolicy::First);
        assert!(!config.search_case_insensitive);
        assert_eq!(config.match_separator, " + ");
    }

    #[test]
    fn test_from_lookup_falls_back_to_defaults() {
        let config = ModelConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ModelConfig::default());

        let config =
            ModelConfig::from_lookup(|var| (var == ENV_CONFIG_PATH).then(String::new)).unwrap();
        assert_eq!(config, ModelConfig::default());

        let err = ModelConfig::from_lookup(|var| {
            (var == ENV_CONFIG_PATH).then(|| "/nonexistent/alerting.yaml".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
