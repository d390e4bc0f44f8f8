//! Great-circle distance computation and geofence classification.
//!
//! This module provides the pure geometric half of attendance verification:
//! - [`haversine_distance_meters`] - geodesic distance between two coordinates
//! - [`is_within_geofence`] - tolerance-based admission classification
//!
//! Both functions are deterministic and side-effect free.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters, as used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Default geofence tolerance radius in meters.
///
/// A user within this distance of the configured center is considered
/// on premises.
pub const DEFAULT_TOLERANCE_RADIUS_METERS: f64 = 35.0;

/// A point on Earth's surface in decimal degrees.
///
/// Immutable once obtained. Latitude is expected in `[-90, 90]` and
/// longitude in `[-180, 180]`, but no validation is performed here:
/// out-of-range inputs produce mathematically defined but meaningless
/// distances, matching the behavior of the upstream location sources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in decimal degrees.
    pub latitude: f64,

    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate from decimal degrees.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// The reference location a user must be near to be admitted.
///
/// Fetched per user from the portal at session start and immutable for
/// the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeofenceConfig {
    /// Center of the circular geofence.
    pub center: Coordinate,

    /// Allowable range around the center, in meters.
    pub tolerance_radius_meters: f64,
}

impl GeofenceConfig {
    /// Create a geofence around `center` with the default tolerance radius.
    #[must_use]
    pub const fn new(center: Coordinate) -> Self {
        Self {
            center,
            tolerance_radius_meters: DEFAULT_TOLERANCE_RADIUS_METERS,
        }
    }

    /// Create a geofence with an explicit tolerance radius in meters.
    #[must_use]
    pub const fn with_tolerance(center: Coordinate, tolerance_radius_meters: f64) -> Self {
        Self {
            center,
            tolerance_radius_meters,
        }
    }
}

/// Compute the great-circle distance between two coordinates in meters.
///
/// Uses the haversine formula on a sphere of radius
/// [`EARTH_RADIUS_METERS`]. The result is non-negative and symmetric in
/// its arguments.
///
/// NaN inputs propagate into the result; they are not guarded against.
#[must_use]
pub fn haversine_distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let delta_phi = (b.latitude - a.latitude).to_radians();
    let delta_lambda = (b.longitude - a.longitude).to_radians();

    let hav = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * hav.sqrt().atan2((1.0 - hav).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Classify a distance against a tolerance radius.
///
/// The boundary is inclusive: a user exactly `tolerance_meters` away is
/// still within the geofence.
#[must_use]
pub fn is_within_geofence(distance_meters: f64, tolerance_meters: f64) -> bool {
    distance_meters <= tolerance_meters
}
