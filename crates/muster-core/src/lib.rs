//! # muster-core
//!
//! Core business logic for the muster geofenced attendance system.
//!
//! This crate provides:
//! - Great-circle distance math and geofence admission checks
//! - Attendance status derivation from the portal's event log
//! - The check-in/check-out flows, with timeout and cancellation bounds
//! - Configuration loading, saving, and validation
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`geo`] - Coordinates, haversine distance, and the geofence radius check
//! - [`attendance`] - Attendance records, status derivation, and admission policy
//! - [`service`] - The attendance flows over pluggable boundary traits
//! - [`location`] - The positioning boundary trait and its request options
//! - [`store`] - Remote store boundary traits and the notification sink
//! - [`retry`] - Submission retry policy
//! - [`config`] - Application configuration loading, saving, and validation
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Shared types

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod attendance;
pub mod config;
pub mod error;
pub mod geo;
pub mod location;
pub mod retry;
pub mod service;
pub mod store;
pub mod types;

// Re-export primary types for convenience
pub use attendance::{
    evaluate_admission, AdmissionDecision, AdmissionReason, AttendanceEntry, AttendanceRecord,
    AttendanceStatus, CheckFlag,
};
pub use config::{
    default_config_path, AttendanceConfig, ConfigError, ConfigResult, LocationConfig,
    MusterConfig, PortalConfig, UserConfig,
};
pub use error::{MusterError, Result};
pub use geo::{
    haversine_distance_meters, is_within_geofence, Coordinate, GeofenceConfig,
    DEFAULT_TOLERANCE_RADIUS_METERS, EARTH_RADIUS_METERS,
};
pub use location::{LocationError, LocationProvider, LocationRequest};
pub use retry::RetryPolicy;
pub use service::{AttendanceService, VerificationOutcome};
pub use store::{
    AttendanceRecordStore, GeofenceConfigStore, NotificationSink, StoreError, TracingNotifier,
};
pub use types::UserContext;
