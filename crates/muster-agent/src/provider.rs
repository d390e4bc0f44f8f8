//! Location and notification implementations for headless hosts.
//!
//! The agent runs on machines without positioning hardware, so the
//! position comes from configuration (or environment overrides) rather
//! than a GPS fix. Notifications go to the terminal.

use muster_core::{Coordinate, LocationError, LocationProvider, LocationRequest, NotificationSink};

/// A [`LocationProvider`] that reports a statically configured position.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocationProvider {
    position: Option<Coordinate>,
}

impl FixedLocationProvider {
    /// Create a provider reporting `position`, or none at all.
    #[must_use]
    pub fn new(position: Option<Coordinate>) -> Self {
        Self { position }
    }
}

impl LocationProvider for FixedLocationProvider {
    async fn current_position(
        &self,
        _request: &LocationRequest,
    ) -> Result<Coordinate, LocationError> {
        self.position.ok_or_else(|| {
            LocationError::Unavailable(
                "no position configured; set location.fixed_latitude/fixed_longitude \
                 or MUSTER_LATITUDE/MUSTER_LONGITUDE"
                    .into(),
            )
        })
    }
}

/// A [`NotificationSink`] that prints to the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNotifier;

impl NotificationSink for TerminalNotifier {
    fn notify(&self, message: &str) {
        println!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_provider_reports_configured_position() {
        let position = Coordinate::new(31.5204, 74.3587);
        let provider = FixedLocationProvider::new(Some(position));
        let fix = provider
            .current_position(&LocationRequest::default())
            .await
            .unwrap();
        assert_eq!(fix, position);
    }

    #[tokio::test]
    async fn test_unconfigured_provider_is_unavailable() {
        let provider = FixedLocationProvider::new(None);
        let err = provider
            .current_position(&LocationRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LocationError::Unavailable(_)));
    }
}
