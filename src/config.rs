//! Configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! overridden by whatever the user's file sets; everything else keeps its
//! default.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [external]
//! executable = "/usr/bin/convert"    # Converter reading stdin, writing stdout
//! args = ["-", "-resize", "50%", "-"]
//! deadline_secs = 10                 # Hard limit for one conversion
//!
//! [internal]
//! scale_percent = 50                 # Output edges as % of input edges
//! quality = 95                       # JPEG quality (1-100)
//!
//! [storage]
//! account_name_env = "az_storage_name"
//! account_key_env = "az_storage_key"
//! container = "ocirocks3"
//! blob = "20181007-110205-L1016848.jpg"
//! max_retries = 5
//! retry_delay_ms = 1000
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse — override just the values you want:
//!
//! ```toml
//! [external]
//! deadline_secs = 30
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{ScalePercent, resize_geometry};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// External converter invocation.
    pub external: ExternalConfig,
    /// In-process resize settings.
    pub internal: InternalConfig,
    /// Object-storage location and credential sources.
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.external.executable.trim().is_empty() {
            return Err(ConfigError::Validation(
                "external.executable must not be empty".into(),
            ));
        }
        if self.external.deadline_secs == 0 {
            return Err(ConfigError::Validation(
                "external.deadline_secs must be positive".into(),
            ));
        }
        if !(1..=100).contains(&self.internal.scale_percent) {
            return Err(ConfigError::Validation(
                "internal.scale_percent must be 1-100".into(),
            ));
        }
        if !(1..=100).contains(&self.internal.quality) {
            return Err(ConfigError::Validation(
                "internal.quality must be 1-100".into(),
            ));
        }
        if self.storage.max_retries == 0 {
            return Err(ConfigError::Validation(
                "storage.max_retries must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// How to run the external converter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExternalConfig {
    /// Path to the converter executable.
    pub executable: String,
    /// Arguments, passed through unmodified. `-` means stdin/stdout to ImageMagick.
    pub args: Vec<String>,
    /// Wall-clock limit for one conversion, in seconds.
    pub deadline_secs: u64,
}

impl ExternalConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            executable: "/usr/bin/convert".to_string(),
            args: vec![
                "-".to_string(),
                "-resize".to_string(),
                resize_geometry(ScalePercent::default()),
                "-".to_string(),
            ],
            deadline_secs: 10,
        }
    }
}

/// In-process resize settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InternalConfig {
    /// Output width and height as a percentage of the input's.
    pub scale_percent: u32,
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for InternalConfig {
    fn default() -> Self {
        Self {
            scale_percent: 50,
            quality: 95,
        }
    }
}

/// Where the source image lives in object storage.
///
/// Only names are stored here; the credential values are read from the
/// environment when a [`BlobLocation`](crate::storage::BlobLocation) is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Environment variable holding the storage account name.
    pub account_name_env: String,
    /// Environment variable holding the storage account key.
    pub account_key_env: String,
    pub container: String,
    pub blob: String,
    /// Total attempts per request, including the first.
    pub max_retries: u32,
    /// Base delay between attempts, in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            account_name_env: "az_storage_name".to_string(),
            account_key_env: "az_storage_key".to_string(),
            container: "ocirocks3".to_string(),
            blob: "20181007-110205-L1016848.jpg".to_string(),
            max_retries: 5,
            retry_delay_ms: 1000,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// The stock defaults as a TOML table, the base `config.toml` is laid over.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default()).expect("default config must serialize")
}

/// Lay the values from `config.toml` over the stock defaults.
///
/// Sections merge key by key, so `[external] deadline_secs = 30` keeps the
/// default executable and args.
pub fn merge_toml(defaults: toml::Value, file: toml::Value) -> toml::Value {
    match (defaults, file) {
        (toml::Value::Table(mut table), toml::Value::Table(from_file)) => {
            for (key, value) in from_file {
                let merged = match table.remove(&key) {
                    Some(default) => merge_toml(default, value),
                    None => value,
                };
                table.insert(key, merged);
            }
            toml::Value::Table(table)
        }
        (_, value) => value,
    }
}

/// Read `config.toml` from `dir`, or `Ok(None)` when there is none.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Apply the file's values, if any, then deserialize and validate.
pub fn resolve_config(
    defaults: toml::Value,
    file: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match file {
        Some(file) => merge_toml(defaults, file),
        None => defaults,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective config for `dir`: stock defaults, then `config.toml`.
pub fn load_config(dir: &Path) -> Result<AppConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(dir)?)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# resize-pipe configuration
# =========================
# All settings are optional. Remove or comment out any you don't need;
# missing values fall back to the defaults shown here.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# External converter
# ---------------------------------------------------------------------------
# The image is written to the converter's stdin and the result is read from
# its stdout. The converter is killed if it runs past the deadline.
[external]
executable = "/usr/bin/convert"
# Passed through unmodified. For ImageMagick, "-" means stdin / stdout.
args = ["-", "-resize", "50%", "-"]
# Seconds allowed for one conversion, including reading and writing.
deadline_secs = 10

# ---------------------------------------------------------------------------
# In-process resize
# ---------------------------------------------------------------------------
[internal]
# Output width and height as a percentage of the input's (1-100).
scale_percent = 50
# JPEG encoding quality (1 = worst, 100 = best).
quality = 95

# ---------------------------------------------------------------------------
# Object storage
# ---------------------------------------------------------------------------
# Credentials are never stored here. These name the environment variables
# that hold them.
[storage]
account_name_env = "az_storage_name"
account_key_env = "az_storage_key"
container = "ocirocks3"
blob = "20181007-110205-L1016848.jpg"
# Total attempts per request, including the first.
max_retries = 5
# Base delay between attempts, in milliseconds.
retry_delay_ms = 1000
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = AppConfig::default();
        assert_eq!(config.external.executable, "/usr/bin/convert");
        assert_eq!(config.external.args, vec!["-", "-resize", "50%", "-"]);
        assert_eq!(config.external.deadline(), Duration::from_secs(10));
        assert_eq!(config.internal.scale_percent, 50);
        assert_eq!(config.internal.quality, 95);
        assert_eq!(config.storage.max_retries, 5);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[external]
deadline_secs = 30
"#;
        let overlay: toml::Value = toml::from_str(toml).unwrap();
        let config = resolve_config(stock_defaults_value(), Some(overlay)).unwrap();

        assert_eq!(config.external.deadline_secs, 30);
        // Siblings keep their defaults
        assert_eq!(config.external.executable, "/usr/bin/convert");
        assert_eq!(config.internal.quality, 95);
    }

    #[test]
    fn overlay_replaces_args_wholesale() {
        let overlay: toml::Value = toml::from_str(
            r#"
[external]
args = ["-", "-resize", "25%", "jpg:-"]
"#,
        )
        .unwrap();
        let config = resolve_config(stock_defaults_value(), Some(overlay)).unwrap();

        assert_eq!(config.external.args, vec!["-", "-resize", "25%", "jpg:-"]);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1").unwrap();
        let overlay: toml::Value = toml::from_str("a = 2").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("a").unwrap().as_integer(), Some(2));
    }

    #[test]
    fn merge_toml_preserves_base_keys() {
        let base: toml::Value = toml::from_str(
            r#"
[internal]
scale_percent = 50
quality = 95
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[internal]
quality = 80
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let internal = merged.get("internal").unwrap();
        assert_eq!(internal.get("scale_percent").unwrap().as_integer(), Some(50));
        assert_eq!(internal.get("quality").unwrap().as_integer(), Some(80));
    }

    // =========================================================================
    // Unknown key rejection
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<AppConfig, _> = toml::from_str(
            r#"
[external]
deadline = 10
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<AppConfig, _> = toml::from_str("[colors]\nbackground = \"#fff\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
[internal]
qualty = 90
"#,
        )
        .unwrap();

        assert!(load_config(tmp.path()).is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_zero_deadline() {
        let mut config = AppConfig::default();
        config.external.deadline_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("deadline_secs"));
    }

    #[test]
    fn validate_empty_executable() {
        let mut config = AppConfig::default();
        config.external.executable = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_quality_and_scale_bounds() {
        let mut config = AppConfig::default();
        config.internal.quality = 100;
        config.internal.scale_percent = 1;
        assert!(config.validate().is_ok());

        config.internal.quality = 0;
        assert!(config.validate().is_err());

        config.internal.quality = 95;
        config.internal.scale_percent = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_max_retries() {
        let mut config = AppConfig::default();
        config.storage.max_retries = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
[internal]
quality = 200
"#,
        )
        .unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_raw_config_returns_none_when_no_file() {
        let tmp = TempDir::new().unwrap();
        assert!(load_raw_config(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn load_config_without_file_is_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.external, ExternalConfig::default());
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "[external\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let parsed: AppConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = AppConfig::default();
        assert_eq!(parsed.external, defaults.external);
        assert_eq!(parsed.internal, defaults.internal);
        assert_eq!(parsed.storage, defaults.storage);
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let value = stock_defaults_value();
        for section in ["external", "internal", "storage"] {
            assert!(value.get(section).is_some(), "missing [{section}]");
        }
    }
}
