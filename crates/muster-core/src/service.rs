//! The attendance service: status derivation, geofence verification, and
//! check-in/check-out submission.
//!
//! The service owns no persistent state. Status is re-derived from the
//! remote log at the start of every flow; two flows running against the
//! same store never share a cache.
//!
//! Failure policy: remote reads recover to a safe default (`CheckedOut` /
//! empty history) and log the error; writes fail visibly with no retry
//! (unless configured) and no offline queue. Every suspension point is bounded by a timeout and races
//! the service's cancellation token.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::attendance::{
    evaluate_admission, AdmissionDecision, AttendanceEntry, AttendanceRecord, AttendanceStatus,
    CheckFlag,
};
use crate::error::{MusterError, Result};
use crate::geo::{Coordinate, GeofenceConfig};
use crate::location::{LocationProvider, LocationRequest};
use crate::retry::RetryPolicy;
use crate::store::{AttendanceRecordStore, GeofenceConfigStore, NotificationSink};
use crate::types::UserContext;

/// Default bound on a single remote store call.
const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(15);

/// Result of racing a future against its timeout and the cancel token.
enum Bounded<T> {
    Done(T),
    TimedOut,
    Cancelled,
}

async fn bounded<F: std::future::Future>(
    cancel: &CancellationToken,
    limit: Duration,
    future: F,
) -> Bounded<F::Output> {
    tokio::select! {
        // Cancellation wins over a ready result.
        biased;
        () = cancel.cancelled() => Bounded::Cancelled,
        outcome = tokio::time::timeout(limit, future) => match outcome {
            Ok(value) => Bounded::Done(value),
            Err(_) => Bounded::TimedOut,
        },
    }
}

/// Everything the pre-check flow learned about the user's situation.
///
/// Remote failures degrade the outcome (missing position or decision)
/// instead of failing it; the flow never crashes the caller.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    /// Current status, derived from the remote log (falls back to
    /// `CheckedOut` when the log is unreachable).
    pub status: AttendanceStatus,

    /// The geofence configured for the user, when it could be fetched.
    pub geofence: Option<GeofenceConfig>,

    /// The device position, when it could be obtained.
    pub position: Option<Coordinate>,

    /// The admission decision, when both geofence and position are known.
    pub decision: Option<AdmissionDecision>,
}

impl VerificationOutcome {
    /// Whether the user may proceed to mark attendance.
    ///
    /// A checked-in user always may (checkout is never geofence-gated);
    /// otherwise a computed, admitted decision is required.
    #[must_use]
    pub fn may_proceed(&self) -> bool {
        self.status.is_checked_in() || self.decision.is_some_and(|d| d.admitted)
    }
}

/// Geofenced attendance service for a single signed-in user.
///
/// Generic over the boundary traits so hosts can plug in whatever
/// positioning hardware and portal transport they have.
pub struct AttendanceService<L, G, R, N> {
    user: UserContext,
    location: L,
    geofence_store: G,
    record_store: R,
    notifier: N,
    location_request: LocationRequest,
    remote_timeout: Duration,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl<L, G, R, N> AttendanceService<L, G, R, N>
where
    L: LocationProvider,
    G: GeofenceConfigStore,
    R: AttendanceRecordStore,
    N: NotificationSink,
{
    /// Create a service with default options: high-accuracy location
    /// request with a 20 s timeout, 15 s remote timeout, single
    /// submission attempt.
    pub fn new(user: UserContext, location: L, geofence_store: G, record_store: R, notifier: N) -> Self {
        Self {
            user,
            location,
            geofence_store,
            record_store,
            notifier,
            location_request: LocationRequest::default(),
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            retry: RetryPolicy::None,
            cancel: CancellationToken::new(),
        }
    }

    /// Override the position request options.
    #[must_use]
    pub fn with_location_request(mut self, request: LocationRequest) -> Self {
        self.location_request = request;
        self
    }

    /// Override the bound on a single remote store call.
    #[must_use]
    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    /// Override the submission retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Use an externally owned cancellation token.
    ///
    /// Cancelling the token aborts any in-flight location or store call,
    /// so a host tearing down mid-flow does not leak pending work.
    #[must_use]
    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The token that cancels this service's in-flight calls.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The user this service acts for.
    #[must_use]
    pub fn user(&self) -> &UserContext {
        &self.user
    }

    /// Fetch the user's attendance history, newest-first.
    ///
    /// An unreachable store or malformed data logs the error and yields an
    /// empty history; display flows must stay usable offline.
    pub async fn load_history(&self) -> Vec<AttendanceEntry> {
        match bounded(
            &self.cancel,
            self.remote_timeout,
            self.record_store.fetch_history(&self.user.id),
        )
        .await
        {
            Bounded::Done(Ok(history)) => history,
            Bounded::Done(Err(err)) => {
                tracing::error!(user_id = %self.user.id, error = %err, "Failed to fetch attendance history");
                Vec::new()
            }
            Bounded::TimedOut => {
                tracing::error!(user_id = %self.user.id, "Attendance history fetch timed out");
                Vec::new()
            }
            Bounded::Cancelled => Vec::new(),
        }
    }

    /// Derive the user's current status from the remote log.
    ///
    /// Falls back to `CheckedOut` when the log is unreachable or empty.
    pub async fn load_status(&self) -> AttendanceStatus {
        AttendanceStatus::from_history(&self.load_history().await)
    }

    /// Fetch the geofence configured for the user.
    ///
    /// # Errors
    ///
    /// - [`MusterError::GeofenceNotConfigured`] when the portal has no
    ///   fixed location for the user
    /// - [`MusterError::GeofenceFetchFailed`] on transport or shape errors
    /// - [`MusterError::Cancelled`] when the token fired
    pub async fn fetch_geofence(&self) -> Result<GeofenceConfig> {
        match bounded(
            &self.cancel,
            self.remote_timeout,
            self.geofence_store.fetch_geofence(&self.user.id),
        )
        .await
        {
            Bounded::Done(Ok(Some(config))) => Ok(config),
            Bounded::Done(Ok(None)) => {
                Err(MusterError::GeofenceNotConfigured(self.user.id.clone()))
            }
            Bounded::Done(Err(err)) => Err(MusterError::GeofenceFetchFailed(err.to_string())),
            Bounded::TimedOut => Err(MusterError::GeofenceFetchFailed("timed out".into())),
            Bounded::Cancelled => Err(MusterError::Cancelled),
        }
    }

    /// Obtain the device's current position.
    ///
    /// # Errors
    ///
    /// - [`MusterError::LocationPermissionDenied`] when the platform
    ///   refuses the permission
    /// - [`MusterError::LocationTimeout`] / [`MusterError::LocationUnavailable`]
    ///   from the provider
    /// - [`MusterError::Cancelled`] when the token fired
    pub async fn acquire_position(&self) -> Result<Coordinate> {
        if !self.location.request_permission().await {
            return Err(MusterError::LocationPermissionDenied);
        }
        match bounded(
            &self.cancel,
            self.location_request.timeout,
            self.location.current_position(&self.location_request),
        )
        .await
        {
            Bounded::Done(Ok(position)) => Ok(position),
            Bounded::Done(Err(err)) => Err(err.into()),
            Bounded::TimedOut => Err(MusterError::LocationTimeout(self.location_request.timeout)),
            Bounded::Cancelled => Err(MusterError::Cancelled),
        }
    }

    /// Run the pre-check flow: status, geofence, position, admission.
    ///
    /// When the user is already checked in the flow returns early with no
    /// decision; the caller is expected to skip verification and move
    /// straight to the mark-attendance flow (re-verification is
    /// unnecessary, checkout is always allowed).
    ///
    /// Every remote failure is caught here, surfaced through the
    /// notification sink, and degrades the outcome instead of propagating.
    pub async fn verify(&self) -> VerificationOutcome {
        let status = self.load_status().await;

        if status.is_checked_in() {
            self.notifier.notify("Already checked in. Redirecting...");
            return VerificationOutcome {
                status,
                geofence: None,
                position: None,
                decision: None,
            };
        }

        let geofence = match self.fetch_geofence().await {
            Ok(config) => Some(config),
            Err(err) => {
                tracing::error!(user_id = %self.user.id, error = %err, "Geofence fetch failed");
                self.notifier
                    .notify("Error fetching location. Check your internet connection.");
                None
            }
        };

        let position = match self.acquire_position().await {
            Ok(position) => Some(position),
            Err(err @ MusterError::LocationPermissionDenied) => {
                tracing::warn!(error = %err, "Location permission denied");
                self.notifier
                    .notify("Location permission denied. Enable location services.");
                None
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to get current position");
                self.notifier
                    .notify("Unable to get location. Please enable location services.");
                None
            }
        };

        let decision = match (position, geofence.as_ref()) {
            (Some(position), Some(config)) => Some(evaluate_admission(position, config, status)),
            _ => None,
        };

        if let Some(decision) = decision {
            if decision.admitted {
                self.notifier.notify("You are within the hostel premises.");
            } else {
                self.notifier.notify("You are outside the hostel premises.");
            }
            tracing::info!(
                user_id = %self.user.id,
                distance_meters = decision.distance_meters,
                reason = %decision.reason,
                admitted = decision.admitted,
                "Geofence admission evaluated"
            );
        }

        VerificationOutcome {
            status,
            geofence,
            position,
            decision,
        }
    }

    /// Submit one attendance event and return the created record.
    ///
    /// Check-in admission is a caller precondition: run [`Self::verify`]
    /// first and only call this when the outcome admits the action. The
    /// submission itself never re-checks the geofence; checkout must work
    /// from anywhere.
    ///
    /// On failure the record is dropped, no local state changes, and the
    /// user must retry the action; only the configured [`RetryPolicy`]
    /// adds automatic attempts.
    ///
    /// # Errors
    ///
    /// Location errors from the position fix, [`MusterError::SubmissionFailed`]
    /// when all attempts are spent, or [`MusterError::Cancelled`].
    pub async fn mark(&self, check: CheckFlag) -> Result<AttendanceRecord> {
        let position = self.acquire_position().await?;

        let record = AttendanceRecord {
            user_id: self.user.id.clone(),
            check,
            recorded_at: Utc::now(),
            location: position,
        };

        let mut failed_attempts = 0u32;
        loop {
            let failure = match bounded(
                &self.cancel,
                self.remote_timeout,
                self.record_store.submit(&record),
            )
            .await
            {
                Bounded::Done(Ok(())) => break,
                Bounded::Done(Err(err)) => err.to_string(),
                Bounded::TimedOut => "timed out".to_string(),
                Bounded::Cancelled => return Err(MusterError::Cancelled),
            };

            failed_attempts += 1;
            match self.retry.backoff_after(failed_attempts) {
                Some(delay) => {
                    tracing::warn!(
                        user_id = %self.user.id,
                        attempt = failed_attempts,
                        error = %failure,
                        "Attendance submission failed, retrying in {delay:?}"
                    );
                    tokio::select! {
                        biased;
                        () = self.cancel.cancelled() => return Err(MusterError::Cancelled),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                None => {
                    tracing::error!(
                        user_id = %self.user.id,
                        attempts = failed_attempts,
                        error = %failure,
                        "Attendance submission failed, record dropped"
                    );
                    return Err(MusterError::SubmissionFailed(failure));
                }
            }
        }

        self.notifier.notify(&format!("Successfully {check}"));
        tracing::info!(
            user_id = %self.user.id,
            check = check.as_u8(),
            latitude = record.location.latitude,
            longitude = record.location.longitude,
            "Attendance recorded"
        );
        Ok(record)
    }
}
