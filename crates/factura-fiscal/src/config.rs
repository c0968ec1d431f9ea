//! # Fiscal Configuration
//!
//! Settings for the fiscal services.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FACTURA_DEFAULT_PADDING_LENGTH=10                                  │
//! │     FACTURA_SETTINGS_PATH=/admin/numbering                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/factura-saas/fiscal.toml (Linux)                         │
//! │     ~/Library/Application Support/com.factura.saas/fiscal.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [sequences]
//! default_initial_number = 1
//! default_padding_length = 8
//!
//! [validation]
//! settings_path = "/settings/fiscal-sequences"
//!
//! [allocation]
//! initial_backoff_ms = 20
//! max_backoff_ms = 500
//! max_elapsed_ms = 3000
//! ```

use std::path::PathBuf;
use std::time::Duration;

use backoff::ExponentialBackoff;
use factura_core::validation::{validate_initial_number, validate_padding_length};
use factura_core::{SequenceConfig, DEFAULT_INITIAL_NUMBER, DEFAULT_PADDING_LENGTH, SEQUENCE_SETTINGS_PATH};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{FiscalError, FiscalResult};

// =============================================================================
// Sequence Defaults
// =============================================================================

/// Values used when a create request leaves a field out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSettings {
    #[serde(default = "default_initial_number")]
    pub default_initial_number: i64,

    #[serde(default = "default_padding_length")]
    pub default_padding_length: i64,
}

fn default_initial_number() -> i64 {
    DEFAULT_INITIAL_NUMBER
}

fn default_padding_length() -> i64 {
    DEFAULT_PADDING_LENGTH
}

impl Default for SequenceSettings {
    fn default() -> Self {
        SequenceSettings {
            default_initial_number: default_initial_number(),
            default_padding_length: default_padding_length(),
        }
    }
}

/// A create request as received, before defaults are filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDraft {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub initial_number: Option<i64>,
    #[serde(default)]
    pub padding_length: Option<i64>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl SequenceSettings {
    /// Fills the gaps of `draft` with the configured defaults.
    ///
    /// Missing prefix/suffix become empty strings; a missing `is_active`
    /// means active.
    pub fn resolve(&self, draft: SequenceDraft) -> SequenceConfig {
        SequenceConfig {
            prefix: draft.prefix.unwrap_or_default(),
            suffix: draft.suffix.unwrap_or_default(),
            initial_number: draft.initial_number.unwrap_or(self.default_initial_number),
            padding_length: draft.padding_length.unwrap_or(self.default_padding_length),
            is_active: draft.is_active.unwrap_or(true),
        }
    }
}

// =============================================================================
// Validation Settings
// =============================================================================

/// Where blocked users are sent to fix their sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSettings {
    /// Front-end page where sequences are configured.
    #[serde(default = "default_settings_path")]
    pub settings_path: String,
}

fn default_settings_path() -> String {
    SEQUENCE_SETTINGS_PATH.to_string()
}

impl Default for ValidationSettings {
    fn default() -> Self {
        ValidationSettings {
            settings_path: default_settings_path(),
        }
    }
}

impl ValidationSettings {
    /// Redirect target for a blocked document type.
    ///
    /// ```rust
    /// use factura_fiscal::config::ValidationSettings;
    ///
    /// let settings = ValidationSettings::default();
    /// assert_eq!(
    ///     settings.redirect_url(Some("abc")),
    ///     "/settings/fiscal-sequences?document_type=abc"
    /// );
    /// assert_eq!(settings.redirect_url(None), "/settings/fiscal-sequences");
    /// ```
    pub fn redirect_url(&self, document_type_id: Option<&str>) -> String {
        match document_type_id {
            Some(id) => format!("{}?document_type={}", self.settings_path, id),
            None => self.settings_path.clone(),
        }
    }
}

// =============================================================================
// Allocation Retry Settings
// =============================================================================

/// Retry budget for transient store failures during allocation.
///
/// A retried allocation is safe: the failed statement did not commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSettings {
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Total time spent retrying before giving up.
    #[serde(default = "default_max_elapsed")]
    pub max_elapsed_ms: u64,
}

fn default_initial_backoff() -> u64 {
    20
}

fn default_max_backoff() -> u64 {
    500
}

fn default_max_elapsed() -> u64 {
    3_000
}

impl Default for AllocationSettings {
    fn default() -> Self {
        AllocationSettings {
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            max_elapsed_ms: default_max_elapsed(),
        }
    }
}

impl AllocationSettings {
    /// Builds a fresh backoff policy. One per allocation call.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: Duration::from_millis(self.initial_backoff_ms),
            initial_interval: Duration::from_millis(self.initial_backoff_ms),
            max_interval: Duration::from_millis(self.max_backoff_ms),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_millis(self.max_elapsed_ms)),
            ..Default::default()
        }
    }
}

// =============================================================================
// Main Fiscal Configuration
// =============================================================================

/// Complete fiscal configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalConfig {
    #[serde(default)]
    pub sequences: SequenceSettings,

    #[serde(default)]
    pub validation: ValidationSettings,

    #[serde(default)]
    pub allocation: AllocationSettings,
}

impl FiscalConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (fiscal.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> FiscalResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading fiscal config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load fiscal config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> FiscalResult<()> {
        validate_initial_number(self.sequences.default_initial_number)?;
        validate_padding_length(self.sequences.default_padding_length)?;

        if !self.validation.settings_path.starts_with('/') {
            return Err(FiscalError::Config(format!(
                "settings_path must start with '/', got: {}",
                self.validation.settings_path
            )));
        }

        if self.allocation.initial_backoff_ms == 0
            || self.allocation.initial_backoff_ms > self.allocation.max_backoff_ms
        {
            return Err(FiscalError::Config(
                "initial_backoff_ms must be > 0 and <= max_backoff_ms".into(),
            ));
        }

        if self.allocation.max_elapsed_ms == 0 {
            return Err(FiscalError::Config(
                "max_elapsed_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("FACTURA_DEFAULT_INITIAL_NUMBER") {
            match value.parse::<i64>() {
                Ok(n) => self.sequences.default_initial_number = n,
                Err(_) => warn!(value = %value, "Ignoring invalid FACTURA_DEFAULT_INITIAL_NUMBER"),
            }
        }

        if let Ok(value) = std::env::var("FACTURA_DEFAULT_PADDING_LENGTH") {
            match value.parse::<i64>() {
                Ok(n) => self.sequences.default_padding_length = n,
                Err(_) => warn!(value = %value, "Ignoring invalid FACTURA_DEFAULT_PADDING_LENGTH"),
            }
        }

        if let Ok(path) = std::env::var("FACTURA_SETTINGS_PATH") {
            debug!(path = %path, "Overriding settings path from environment");
            self.validation.settings_path = path;
        }

        if let Ok(value) = std::env::var("FACTURA_ALLOCATION_MAX_ELAPSED_MS") {
            if let Ok(ms) = value.parse::<u64>() {
                self.allocation.max_elapsed_ms = ms;
            }
        }

        if let Ok(value) = std::env::var("FACTURA_ALLOCATION_MAX_BACKOFF_MS") {
            if let Ok(ms) = value.parse::<u64>() {
                self.allocation.max_backoff_ms = ms;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "factura", "saas")
            .map(|dirs| dirs.config_dir().join("fiscal.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = FiscalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sequences.default_initial_number, 1);
        assert_eq!(config.validation.settings_path, "/settings/fiscal-sequences");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: FiscalConfig = toml::from_str(
            r#"
            [sequences]
            default_padding_length = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.sequences.default_padding_length, 10);
        assert_eq!(config.sequences.default_initial_number, 1);
        assert_eq!(config.allocation, AllocationSettings::default());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = FiscalConfig::default();
        config.sequences.default_padding_length = 0;
        assert!(config.validate().is_err());

        let mut config = FiscalConfig::default();
        config.validation.settings_path = "settings".into();
        assert!(config.validate().is_err());

        let mut config = FiscalConfig::default();
        config.allocation.initial_backoff_ms = 1_000;
        config.allocation.max_backoff_ms = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fiscal.toml");
        std::fs::write(&path, "[validation]\nsettings_path = \"/admin/numbering\"\n").unwrap();

        let config = FiscalConfig::load(Some(path)).unwrap();
        assert_eq!(config.validation.redirect_url(Some("x")), "/admin/numbering?document_type=x");
    }

    #[test]
    fn test_resolve_draft() {
        let settings = SequenceSettings {
            default_initial_number: 100,
            default_padding_length: 6,
        };
        let config = settings.resolve(SequenceDraft {
            prefix: Some("B01-".into()),
            padding_length: Some(4),
            ..Default::default()
        });
        assert_eq!(config.prefix, "B01-");
        assert_eq!(config.suffix, "");
        assert_eq!(config.initial_number, 100);
        assert_eq!(config.padding_length, 4);
        assert!(config.is_active);
    }
}
