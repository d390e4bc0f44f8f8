//! Unified error types for the muster core library.
//!
//! This module provides a unified error type [`MusterError`] that covers
//! all failure modes across the attendance flows. Modules also expose
//! their own specific error types (`LocationError`, `StoreError`,
//! `ConfigError`) for internal use.
//!
//! # Design Principles
//!
//! - **Specific variants**: each variant captures exactly one failure mode
//! - **Actionable messages**: messages guide users toward resolution
//! - **Caught at the edge**: callers convert every variant into a
//!   user-visible message; nothing propagates past the flow that caused it

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::location::LocationError;
use crate::store::StoreError;

/// The unified error type for all muster operations.
#[derive(Debug, Error)]
pub enum MusterError {
    // =========================================================================
    // LOCATION ERRORS
    // =========================================================================
    /// The user or platform denied the location permission.
    #[error("Location permission denied. Enable location services and retry.")]
    LocationPermissionDenied,

    /// No location fix arrived within the allowed time.
    #[error("Timed out waiting for a location fix after {0:?}")]
    LocationTimeout(Duration),

    /// The location provider is unavailable or failed internally.
    #[error("Unable to get location: {0}")]
    LocationUnavailable(String),

    // =========================================================================
    // REMOTE STORE ERRORS
    // =========================================================================
    /// The geofence configuration could not be fetched.
    #[error("Failed to fetch the fixed location: {0}. Check your internet connection.")]
    GeofenceFetchFailed(String),

    /// No fixed location has been configured for the user.
    #[error("No fixed location is configured for user '{0}'")]
    GeofenceNotConfigured(String),

    /// The attendance submission failed; the record was dropped, not queued.
    #[error("Attendance submission failed: {0}")]
    SubmissionFailed(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be read or parsed.
    #[error("Failed to load configuration: {0}")]
    ConfigLoadFailed(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigInvalid(String),

    // =========================================================================
    // CONTROL FLOW
    // =========================================================================
    /// The operation was cancelled through the service's cancellation token.
    #[error("Operation cancelled")]
    Cancelled,
}

/// A specialized [`Result`] type for muster operations.
pub type Result<T> = std::result::Result<T, MusterError>;

impl MusterError {
    /// Returns `true` if this error came from the location provider.
    #[inline]
    #[must_use]
    pub fn is_location_error(&self) -> bool {
        matches!(
            self,
            Self::LocationPermissionDenied
                | Self::LocationTimeout(_)
                | Self::LocationUnavailable(_)
        )
    }

    /// Returns `true` if this error came from a remote store call.
    #[inline]
    #[must_use]
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            Self::GeofenceFetchFailed(_)
                | Self::GeofenceNotConfigured(_)
                | Self::SubmissionFailed(_)
        )
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigLoadFailed(_) | Self::ConfigInvalid(_)
        )
    }

    /// Returns `true` if retrying the same action may succeed without any
    /// change by the user.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::LocationTimeout(_)
                | Self::LocationUnavailable(_)
                | Self::GeofenceFetchFailed(_)
                | Self::SubmissionFailed(_)
        )
    }

    /// Returns a machine-readable error code.
    #[inline]
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::LocationPermissionDenied => "LOCATION_PERMISSION_DENIED",
            Self::LocationTimeout(_) => "LOCATION_TIMEOUT",
            Self::LocationUnavailable(_) => "LOCATION_UNAVAILABLE",
            Self::GeofenceFetchFailed(_) => "GEOFENCE_FETCH_FAILED",
            Self::GeofenceNotConfigured(_) => "GEOFENCE_NOT_CONFIGURED",
            Self::SubmissionFailed(_) => "SUBMISSION_FAILED",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigLoadFailed(_) => "CONFIG_LOAD_FAILED",
            Self::ConfigInvalid(_) => "CONFIG_INVALID",
            Self::Cancelled => "CANCELLED",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<LocationError> for MusterError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::PermissionDenied => Self::LocationPermissionDenied,
            LocationError::Timeout(duration) => Self::LocationTimeout(duration),
            LocationError::Unavailable(message) => Self::LocationUnavailable(message),
        }
    }
}

impl From<ConfigError> for MusterError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path),
            ConfigError::Validation { field, message } => {
                Self::ConfigInvalid(format!("{field}: {message}"))
            }
            other => Self::ConfigLoadFailed(other.to_string()),
        }
    }
}

impl From<StoreError> for MusterError {
    fn from(err: StoreError) -> Self {
        // Store errors reach the unified type only from the submission
        // path; read failures are recovered in place by the service.
        Self::SubmissionFailed(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_error_classification() {
        assert!(MusterError::LocationPermissionDenied.is_location_error());
        assert!(MusterError::LocationTimeout(Duration::from_secs(20)).is_location_error());
        assert!(MusterError::LocationUnavailable("gps off".into()).is_location_error());

        assert!(!MusterError::SubmissionFailed("500".into()).is_location_error());
    }

    #[test]
    fn test_store_error_classification() {
        assert!(MusterError::GeofenceFetchFailed("timeout".into()).is_store_error());
        assert!(MusterError::GeofenceNotConfigured("482".into()).is_store_error());
        assert!(MusterError::SubmissionFailed("500".into()).is_store_error());

        assert!(!MusterError::Cancelled.is_store_error());
    }

    #[test]
    fn test_config_error_classification() {
        assert!(MusterError::ConfigNotFound(PathBuf::from("/etc/muster")).is_config_error());
        assert!(MusterError::ConfigLoadFailed("bad toml".into()).is_config_error());
        assert!(MusterError::ConfigInvalid("user.id: required".into()).is_config_error());

        assert!(!MusterError::LocationPermissionDenied.is_config_error());
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(MusterError::SubmissionFailed("503".into()).is_recoverable());
        assert!(MusterError::LocationTimeout(Duration::from_secs(20)).is_recoverable());

        assert!(!MusterError::LocationPermissionDenied.is_recoverable());
        assert!(!MusterError::Cancelled.is_recoverable());
    }

    #[test]
    fn test_from_location_error() {
        let err: MusterError = LocationError::PermissionDenied.into();
        assert!(matches!(err, MusterError::LocationPermissionDenied));

        let err: MusterError = LocationError::Timeout(Duration::from_secs(20)).into();
        assert_eq!(err.error_code(), "LOCATION_TIMEOUT");
    }

    #[test]
    fn test_from_store_error() {
        let err: MusterError = StoreError::Status {
            status: 500,
            message: "Internal Server Error".into(),
        }
        .into();
        assert!(matches!(err, MusterError::SubmissionFailed(_)));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_from_config_error() {
        let err: MusterError = ConfigError::Validation {
            field: "user.id",
            message: "user id is required".into(),
        }
        .into();
        assert!(matches!(err, MusterError::ConfigInvalid(_)));
        assert!(err.to_string().contains("user.id"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<MusterError>();
        assert_sync::<MusterError>();
    }
}
