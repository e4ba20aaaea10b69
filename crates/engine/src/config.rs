//! Before-image configuration via `beforeimage.toml`
//!
//! The file is read once when the engine starts. Whether the feature is
//! enabled selects the store implementation for the lifetime of the
//! process; changing it requires a restart.

use serde::{Deserialize, Serialize};
use std::path::Path;

use strata_core::log_version::check_supported;
use strata_core::{Error, Result, TimeUnit, TtlDescriptor, CURRENT_LOG_VERSION};
use strata_storage::DEFAULT_STORE_NAME;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "beforeimage.toml";

/// Before-image capture configuration
///
/// # Example
///
/// ```toml
/// enabled = true
/// default_ttl = 12
/// default_ttl_unit = "hours"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BeforeImageConfig {
    /// Capture before-images at all
    #[serde(default)]
    pub enabled: bool,
    /// Capacity of the read-through entry cache; absent disables it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_cache_capacity: Option<usize>,
    /// Internal store name
    #[serde(default = "default_store_name")]
    pub store_name: String,
    /// TTL magnitude for captured images
    #[serde(default = "default_ttl")]
    pub default_ttl: u32,
    /// TTL unit: `"hours"` or `"days"`
    #[serde(default = "default_ttl_unit")]
    pub default_ttl_unit: TimeUnit,
    /// Format version used when appending log entries
    #[serde(default = "default_log_version")]
    pub log_version: u8,
}

fn default_store_name() -> String {
    DEFAULT_STORE_NAME.to_string()
}

fn default_ttl() -> u32 {
    1
}

fn default_ttl_unit() -> TimeUnit {
    TimeUnit::Days
}

fn default_log_version() -> u8 {
    CURRENT_LOG_VERSION
}

impl Default for BeforeImageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            entry_cache_capacity: None,
            store_name: default_store_name(),
            default_ttl: default_ttl(),
            default_ttl_unit: default_ttl_unit(),
            log_version: default_log_version(),
        }
    }
}

impl BeforeImageConfig {
    /// Enabled config with the given TTL and defaults elsewhere
    pub fn enabled_with_ttl(ttl: TtlDescriptor) -> Self {
        Self {
            enabled: true,
            default_ttl: ttl.magnitude(),
            default_ttl_unit: ttl.unit(),
            ..Self::default()
        }
    }

    /// TTL applied to captured images
    pub fn ttl(&self) -> TtlDescriptor {
        TtlDescriptor::new(self.default_ttl, self.default_ttl_unit)
    }

    /// Check field consistency
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for an unsupported log version, an
    /// empty store name, a zero cache capacity, or an enabled feature with
    /// a zero TTL.
    pub fn validate(&self) -> Result<()> {
        check_supported(self.log_version).map_err(|_| {
            Error::InvalidConfig(format!(
                "log_version {} is not supported in {}",
                self.log_version, CONFIG_FILE_NAME
            ))
        })?;
        if self.store_name.is_empty() {
            return Err(Error::InvalidConfig("store_name must not be empty".into()));
        }
        if self.entry_cache_capacity == Some(0) {
            return Err(Error::InvalidConfig(
                "entry_cache_capacity must be positive when set".into(),
            ));
        }
        if self.enabled && self.default_ttl == 0 {
            return Err(Error::InvalidConfig(
                "default_ttl must be positive when before-images are enabled".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: BeforeImageConfig = toml::from_str(content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Write the default config file if it does not already exist
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to `path`
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default config file content with comments
    pub fn default_toml() -> &'static str {
        r#"# Before-image capture configuration
#
# Capture the prior value of updated, deleted and tombstoned records
# (default: false). Read once at startup.
enabled = false

# How long captured images are kept.
default_ttl = 1
default_ttl_unit = "days"    # "hours" or "days"

# Internal store holding the images.
store_name = "_sys_before_image"

# Read-through cache of recently read images (default: disabled).
# entry_cache_capacity = 1024

# Log format version for new entries. Versions below 3 carry no
# before-image TTL, which disables capture.
# log_version = 3
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_disabled() {
        let config = BeforeImageConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.store_name, DEFAULT_STORE_NAME);
        assert_eq!(config.ttl(), TtlDescriptor::days(1));
        config.validate().unwrap();
    }

    #[test]
    fn default_toml_parses_to_default() {
        let config = BeforeImageConfig::from_toml_str(BeforeImageConfig::default_toml()).unwrap();
        assert_eq!(config, BeforeImageConfig::default());
    }

    #[test]
    fn empty_file_uses_defaults() {
        assert_eq!(
            BeforeImageConfig::from_toml_str("").unwrap(),
            BeforeImageConfig::default()
        );
    }

    #[test]
    fn parse_hours() {
        let config = BeforeImageConfig::from_toml_str(
            "enabled = true\n\
             default_ttl = 6\n\
             default_ttl_unit = \"hours\"\n\
             entry_cache_capacity = 64\n",
        )
        .unwrap();
        assert!(config.enabled);
        assert_eq!(config.ttl(), TtlDescriptor::hours(6));
        assert_eq!(config.entry_cache_capacity, Some(64));
    }

    #[test]
    fn invalid_unit_is_rejected() {
        let err = BeforeImageConfig::from_toml_str("default_ttl_unit = \"weeks\"").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        for text in [
            "log_version = 0",
            "log_version = 9",
            "store_name = \"\"",
            "entry_cache_capacity = 0",
            "enabled = true\ndefault_ttl = 0",
        ] {
            assert!(
                matches!(BeforeImageConfig::from_toml_str(text), Err(Error::InvalidConfig(_))),
                "accepted: {text}"
            );
        }
    }

    #[test]
    fn write_default_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        BeforeImageConfig::write_default_if_missing(&path).unwrap();
        assert!(path.exists());
        assert!(!BeforeImageConfig::load(&path).unwrap().enabled);
    }

    #[test]
    fn write_default_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "enabled = true\n").unwrap();
        BeforeImageConfig::write_default_if_missing(&path).unwrap();
        assert!(BeforeImageConfig::load(&path).unwrap().enabled);
    }

    #[test]
    fn write_to_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = BeforeImageConfig {
            entry_cache_capacity: Some(128),
            ..BeforeImageConfig::enabled_with_ttl(TtlDescriptor::hours(3))
        };
        config.write_to_file(&path).unwrap();
        assert_eq!(BeforeImageConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_invalid_config() {
        let dir = TempDir::new().unwrap();
        let err = BeforeImageConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
