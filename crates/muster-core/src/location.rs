//! Device location acquisition boundary.
//!
//! The actual positioning capability (GPS, platform location services, or
//! a fixed kiosk coordinate) lives outside this crate. This module defines
//! the seam it plugs into and the failure modes it may report.

use std::time::Duration;

use thiserror::Error;

use crate::geo::Coordinate;

/// Options for a single position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    /// Prefer a high-accuracy fix over a fast one.
    pub high_accuracy: bool,

    /// How long the provider may take before giving up.
    pub timeout: Duration,

    /// Maximum age of a cached fix the provider may return.
    pub max_age: Duration,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(20),
            max_age: Duration::from_secs(1),
        }
    }
}

/// Failure modes of a position request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    /// The user or platform denied the location permission.
    #[error("Location permission denied. Enable location services and retry.")]
    PermissionDenied,

    /// The provider did not produce a fix within the allowed time.
    #[error("Timed out waiting for a location fix after {0:?}")]
    Timeout(Duration),

    /// The provider is unavailable or failed internally.
    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

/// Source of the device's current geographic coordinate.
///
/// Implementations wrap whatever positioning capability the host has.
/// Providers are queried once per attendance action; there is no
/// subscription or streaming interface.
#[allow(async_fn_in_trait)]
pub trait LocationProvider {
    /// Obtain the current position.
    ///
    /// # Errors
    ///
    /// Returns a [`LocationError`] on permission denial, timeout, or
    /// provider failure.
    async fn current_position(&self, request: &LocationRequest)
        -> Result<Coordinate, LocationError>;

    /// Request the location permission from the platform.
    ///
    /// Returns `true` when granted. The default implementation grants
    /// unconditionally, for platforms without a permission model.
    async fn request_permission(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoPermissionModel;

    impl LocationProvider for NoPermissionModel {
        async fn current_position(
            &self,
            _request: &LocationRequest,
        ) -> Result<Coordinate, LocationError> {
            Ok(Coordinate::new(0.0, 0.0))
        }
    }

    #[test]
    fn test_default_request_options() {
        let request = LocationRequest::default();
        assert!(request.high_accuracy);
        assert_eq!(request.timeout, Duration::from_secs(20));
        assert_eq!(request.max_age, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_permission_defaults_to_granted() {
        assert!(NoPermissionModel.request_permission().await);
    }

    #[test]
    fn test_location_error_messages() {
        let err = LocationError::PermissionDenied;
        assert!(err.to_string().contains("permission denied"));

        let err = LocationError::Timeout(Duration::from_secs(20));
        assert!(err.to_string().contains("Timed out"));

        let err = LocationError::Unavailable("no provider".into());
        assert!(err.to_string().contains("no provider"));
    }
}
