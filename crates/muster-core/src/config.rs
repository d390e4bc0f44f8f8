//! Application configuration management.
//!
//! Handles loading, saving, and validating muster configuration:
//! - portal endpoint and HTTP timeout
//! - signed-in user identity
//! - geofence tolerance and submission retry policy
//! - location provider options (including a fixed coordinate for hosts
//!   without positioning hardware)
//! - timezone used when displaying attendance history

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{Coordinate, DEFAULT_TOLERANCE_RADIUS_METERS};
use crate::location::LocationRequest;
use crate::retry::RetryPolicy;
use crate::types::UserContext;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    NotFound(PathBuf),

    /// The configuration file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file could not be written.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// File path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The configuration was parsed but contains an invalid value.
    #[error("Configuration validation failed: {field}: {message}")]
    Validation {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// A specialized [`Result`] type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MusterConfig {
    /// Portal endpoint settings.
    pub portal: PortalConfig,

    /// Signed-in user identity.
    pub user: UserConfig,

    /// Geofence and submission settings.
    pub attendance: AttendanceConfig,

    /// Location provider settings.
    pub location: LocationConfig,

    /// Timezone used when formatting attendance history for display.
    #[serde(with = "timezone_serde")]
    pub timezone: Tz,
}

impl Default for MusterConfig {
    fn default() -> Self {
        Self {
            portal: PortalConfig::default(),
            user: UserConfig::default(),
            attendance: AttendanceConfig::default(),
            location: LocationConfig::default(),
            timezone: chrono_tz::Asia::Karachi,
        }
    }
}

/// Portal endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Base URL of the hostel portal, e.g. `https://wwh.punjab.gov.pk`.
    pub base_url: String,

    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: 15,
        }
    }
}

/// Signed-in user identity, as the portal session stores it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Portal user id.
    pub id: String,

    /// Display name.
    pub name: String,
}

/// Geofence and submission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceConfig {
    /// Allowable range around the fixed location, in meters.
    pub tolerance_radius_meters: f64,

    /// Retry policy for attendance submissions.
    pub retry: RetryPolicy,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            tolerance_radius_meters: DEFAULT_TOLERANCE_RADIUS_METERS,
            retry: RetryPolicy::None,
        }
    }
}

/// Location provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Fixed latitude reported by hosts without positioning hardware.
    pub fixed_latitude: Option<f64>,

    /// Fixed longitude reported by hosts without positioning hardware.
    pub fixed_longitude: Option<f64>,

    /// Prefer a high-accuracy fix over a fast one.
    pub high_accuracy: bool,

    /// How long a position request may take, in seconds.
    pub timeout_secs: u64,

    /// Maximum age of a cached fix, in seconds.
    pub max_age_secs: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            fixed_latitude: None,
            fixed_longitude: None,
            high_accuracy: true,
            timeout_secs: 20,
            max_age_secs: 1,
        }
    }
}

impl MusterConfig {
    /// Load configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, cannot be read, or
    /// cannot be parsed.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(err) => Err(err),
        }
    }

    /// Save configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    /// Check the configuration for invalid values.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::Validation`] encountered.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.portal.base_url.is_empty() {
            return Err(ConfigError::Validation {
                field: "portal.base_url",
                message: "portal base URL is required".into(),
            });
        }
        if !self.portal.base_url.starts_with("http://")
            && !self.portal.base_url.starts_with("https://")
        {
            return Err(ConfigError::Validation {
                field: "portal.base_url",
                message: format!("not an http(s) URL: {}", self.portal.base_url),
            });
        }
        if self.portal.timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "portal.timeout_secs",
                message: "timeout must be non-zero".into(),
            });
        }
        if self.user.id.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "user.id",
                message: "user id is required".into(),
            });
        }
        let tolerance = self.attendance.tolerance_radius_meters;
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(ConfigError::Validation {
                field: "attendance.tolerance_radius_meters",
                message: format!("must be a positive finite number, got {tolerance}"),
            });
        }
        if self.location.timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "location.timeout_secs",
                message: "timeout must be non-zero".into(),
            });
        }
        if let Some(lat) = self.location.fixed_latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(ConfigError::Validation {
                    field: "location.fixed_latitude",
                    message: format!("latitude out of range [-90, 90]: {lat}"),
                });
            }
        }
        if let Some(lon) = self.location.fixed_longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(ConfigError::Validation {
                    field: "location.fixed_longitude",
                    message: format!("longitude out of range [-180, 180]: {lon}"),
                });
            }
        }
        if self.location.fixed_latitude.is_some() != self.location.fixed_longitude.is_some() {
            return Err(ConfigError::Validation {
                field: "location",
                message: "fixed_latitude and fixed_longitude must be set together".into(),
            });
        }
        Ok(())
    }

    /// The user context configured for this session.
    #[must_use]
    pub fn user_context(&self) -> UserContext {
        UserContext::new(self.user.id.clone(), self.user.name.clone())
    }

    /// Position request options derived from the location section.
    #[must_use]
    pub fn location_request(&self) -> LocationRequest {
        LocationRequest {
            high_accuracy: self.location.high_accuracy,
            timeout: std::time::Duration::from_secs(self.location.timeout_secs),
            max_age: std::time::Duration::from_secs(self.location.max_age_secs),
        }
    }

    /// The fixed coordinate, when both components are configured.
    #[must_use]
    pub fn fixed_coordinate(&self) -> Option<Coordinate> {
        match (self.location.fixed_latitude, self.location.fixed_longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinate::new(latitude, longitude)),
            _ => None,
        }
    }
}

/// Get the default configuration file path.
///
/// On Linux hosts: `/etc/muster/config.toml`.
/// Elsewhere: the platform config directory, e.g.
/// `~/Library/Application Support/muster/config.toml`.
#[must_use]
pub fn default_config_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/etc/muster/config.toml")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "muster")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }
}

mod timezone_serde {
    use chrono_tz::Tz;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(tz: &Tz, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(tz.name())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Tz, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> MusterConfig {
        let mut config = MusterConfig::default();
        config.portal.base_url = "https://wwh.punjab.gov.pk".into();
        config.user.id = "482".into();
        config.user.name = "Amna".into();
        config
    }

    #[test]
    fn test_defaults() {
        let config = MusterConfig::default();
        assert_eq!(config.portal.timeout_secs, 15);
        assert!(
            (config.attendance.tolerance_radius_meters - DEFAULT_TOLERANCE_RADIUS_METERS).abs()
                < f64::EPSILON
        );
        assert_eq!(config.attendance.retry, RetryPolicy::None);
        assert_eq!(config.location.timeout_secs, 20);
        assert!(config.location.high_accuracy);
        assert!(config.fixed_coordinate().is_none());
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = valid_config();
        config.location.fixed_latitude = Some(31.5204);
        config.location.fixed_longitude = Some(74.3587);
        config.attendance.retry = RetryPolicy::Fixed {
            attempts: 3,
            delay_ms: 500,
        };
        config.save(&path).unwrap();

        let loaded = MusterConfig::load(&path).unwrap();
        assert_eq!(loaded.portal.base_url, "https://wwh.punjab.gov.pk");
        assert_eq!(loaded.user.id, "482");
        assert_eq!(
            loaded.attendance.retry,
            RetryPolicy::Fixed {
                attempts: 3,
                delay_ms: 500
            }
        );
        assert_eq!(loaded.fixed_coordinate(), config.fixed_coordinate());
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            MusterConfig::load(&path),
            Err(ConfigError::NotFound(_))
        ));
        assert!(MusterConfig::load_or_default(&path).is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: MusterConfig = toml::from_str(
            r#"
            [portal]
            base_url = "https://wwh.punjab.gov.pk"

            [user]
            id = "482"
            "#,
        )
        .unwrap();
        assert_eq!(config.portal.timeout_secs, 15);
        assert_eq!(config.location.timeout_secs, 20);
        assert_eq!(config.timezone, chrono_tz::Asia::Karachi);
    }

    #[test]
    fn test_validate_accepts_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_base_url() {
        let mut config = valid_config();
        config.portal.base_url.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation {
                field: "portal.base_url",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let mut config = valid_config();
        config.portal.base_url = "ftp://example.com".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_user_id() {
        let mut config = valid_config();
        config.user.id = "  ".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { field: "user.id", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_tolerance() {
        let mut config = valid_config();
        config.attendance.tolerance_radius_meters = 0.0;
        assert!(config.validate().is_err());

        config.attendance.tolerance_radius_meters = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_fixed_location() {
        let mut config = valid_config();
        config.location.fixed_latitude = Some(91.0);
        config.location.fixed_longitude = Some(74.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_half_configured_fixed_location() {
        let mut config = valid_config();
        config.location.fixed_latitude = Some(31.5204);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config_path_is_non_empty() {
        assert!(!default_config_path().as_os_str().is_empty());
    }
}
