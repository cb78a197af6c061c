//! Build configuration
//!
//! Loaded from TOML, then overridden from the environment:
//!
//! ```toml
//! allow_overwrite = false
//! model = "llama-3.3-70b-versatile"
//! temperature = 0.7
//! max_tokens = 8192
//! max_command_bytes = 1048576
//! fragment_timeout_secs = 30
//! ```
//!
//! | variable | field |
//! |---|---|
//! | `FORGE_ALLOW_OVERWRITE` | `allow_overwrite` (`true`/`false`/`1`/`0`/`yes`/`no`) |
//! | `FORGE_MODEL` | `model` |

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Model used when neither the request nor the config names one
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Environment variable overriding [`BuildConfig::allow_overwrite`]
pub const ENV_ALLOW_OVERWRITE: &str = "FORGE_ALLOW_OVERWRITE";

/// Environment variable overriding [`BuildConfig::model`]
pub const ENV_MODEL: &str = "FORGE_MODEL";

/// Build session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Let `[CREATE]` replace an existing file instead of rejecting it
    pub allow_overwrite: bool,
    /// Default model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token limit
    pub max_tokens: u32,
    /// Largest payload a single command may carry
    pub max_command_bytes: Option<usize>,
    /// Idle time allowed between fragments before the build is cancelled
    pub fragment_timeout_secs: Option<u64>,
}

impl BuildConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With overwrite policy
    #[inline]
    #[must_use]
    pub fn with_allow_overwrite(mut self, allow: bool) -> Self {
        self.allow_overwrite = allow;
        self
    }

    /// With default model
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// With sampling temperature
    #[inline]
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// With completion token limit
    #[inline]
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// With per-command payload cap
    #[inline]
    #[must_use]
    pub fn with_max_command_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_command_bytes = limit;
        self
    }

    /// With idle timeout between fragments
    #[inline]
    #[must_use]
    pub fn with_fragment_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.fragment_timeout_secs = secs;
        self
    }

    /// Idle timeout as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn fragment_timeout(&self) -> Option<Duration> {
        self.fragment_timeout_secs.map(Duration::from_secs)
    }

    /// Parse TOML; missing keys take their defaults
    ///
    /// # Errors
    /// [`ConfigError::Parse`] on malformed TOML or unknown keys,
    /// [`ConfigError::InvalidValue`] on out-of-range values.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file and apply environment overrides
    ///
    /// # Errors
    /// [`ConfigError::Io`] if the file cannot be read, plus everything
    /// [`from_toml_str`](Self::from_toml_str) and
    /// [`with_env_overrides`](Self::with_env_overrides) return.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded build config");
        config.with_env_overrides(|var| std::env::var(var).ok())
    }

    /// Apply `FORGE_*` overrides using `lookup` to read variables
    ///
    /// # Errors
    /// [`ConfigError::InvalidEnv`] if a boolean variable is not recognized.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_ALLOW_OVERWRITE) {
            self.allow_overwrite = parse_bool(&value).ok_or(ConfigError::InvalidEnv {
                var: ENV_ALLOW_OVERWRITE,
                value,
            })?;
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|m| !m.trim().is_empty()) {
            self.model = model.trim().to_string();
        }
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "model",
                reason: "must not be empty".into(),
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "temperature",
                reason: format!("{} is outside 0.0..=2.0", self.temperature),
            });
        }
        if self.max_command_bytes == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_command_bytes",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            allow_overwrite: false,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 8192,
            max_command_bytes: None,
            fragment_timeout_secs: None,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults() {
        let config = BuildConfig::new();
        assert!(!config.allow_overwrite);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, 8192);
        assert!(config.fragment_timeout().is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = BuildConfig::from_toml_str("allow_overwrite = true\nfragment_timeout_secs = 5").unwrap();
        assert!(config.allow_overwrite);
        assert_eq!(config.fragment_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        assert!(matches!(
            BuildConfig::from_toml_str("overwrite = true"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            BuildConfig::from_toml_str("temperature = 9.0"),
            Err(ConfigError::InvalidValue { field: "temperature", .. })
        ));
        assert!(matches!(
            BuildConfig::from_toml_str("max_command_bytes = 0"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn env_overrides() {
        let config = BuildConfig::new()
            .with_env_overrides(env(&[("FORGE_ALLOW_OVERWRITE", "yes"), ("FORGE_MODEL", " m2 ")]))
            .unwrap();
        assert!(config.allow_overwrite);
        assert_eq!(config.model, "m2");

        let err = BuildConfig::new()
            .with_env_overrides(env(&[("FORGE_ALLOW_OVERWRITE", "sometimes")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "FORGE_ALLOW_OVERWRITE", .. }));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "model = \"local\"\nmax_command_bytes = 64").unwrap();
        let config = BuildConfig::load(file.path()).unwrap();
        assert_eq!(config.max_command_bytes, Some(64));
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = BuildConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
