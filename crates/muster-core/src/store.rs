//! Remote portal boundary contracts.
//!
//! The hostel portal owns all attendance persistence. This module defines
//! the traits the core talks through:
//!
//! - [`GeofenceConfigStore`] - the per-user fixed location record
//! - [`AttendanceRecordStore`] - the append-only attendance log
//! - [`NotificationSink`] - fire-and-forget user-visible messages
//!
//! HTTP implementations live in the agent crate; tests use in-memory ones.

use thiserror::Error;

use crate::attendance::{AttendanceEntry, AttendanceRecord};
use crate::geo::GeofenceConfig;

/// Failure modes of a remote store call.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The request never reached the portal or the connection failed.
    #[error("Transport error talking to the portal: {0}")]
    Transport(String),

    /// The portal answered with a non-success HTTP status.
    #[error("Portal returned HTTP {status}: {message}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// Response body or reason phrase, when available.
        message: String,
    },

    /// The portal answered, but the body did not match the expected shape.
    #[error("Malformed portal response: {0}")]
    MalformedResponse(String),
}

/// Source of the per-user geofence configuration.
#[allow(async_fn_in_trait)]
pub trait GeofenceConfigStore {
    /// Fetch the fixed location configured for `user_id`.
    ///
    /// Returns `Ok(None)` when no fixed location has been configured for
    /// the user.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the portal is unreachable or answers
    /// with an unexpected payload.
    async fn fetch_geofence(&self, user_id: &str) -> Result<Option<GeofenceConfig>, StoreError>;
}

/// The portal's append-only attendance log.
#[allow(async_fn_in_trait)]
pub trait AttendanceRecordStore {
    /// Fetch the user's attendance history, ordered newest-first.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the portal is unreachable or answers
    /// with an unexpected payload.
    async fn fetch_history(&self, user_id: &str) -> Result<Vec<AttendanceEntry>, StoreError>;

    /// Append one attendance event to the log.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on network failure or a non-success
    /// response. Failed submissions are never queued or retried here;
    /// retry behavior is a policy of the caller.
    async fn submit(&self, record: &AttendanceRecord) -> Result<(), StoreError>;
}

/// Destination for user-visible, fire-and-forget messages.
///
/// The core owns no state about the sink; hosts route messages to a
/// toast, a terminal, or a log as they see fit.
pub trait NotificationSink {
    /// Display `message` to the user.
    fn notify(&self, message: &str);
}

/// A [`NotificationSink`] that emits messages through `tracing`.
///
/// The default sink for headless hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, message: &str) {
        tracing::info!(target: "muster::notify", "{message}");
    }
}
