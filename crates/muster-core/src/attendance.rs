//! Attendance records, status derivation, and geofence admission.
//!
//! Attendance is an append-only log of check-in/check-out events kept by
//! the remote portal. The user's current status is never stored locally;
//! it is derived from the newest record each time it is needed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{haversine_distance_meters, is_within_geofence, Coordinate, GeofenceConfig};

/// The direction of an attendance event.
///
/// Serialized as the portal's wire values: `1` for check-in, `0` for
/// check-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CheckFlag {
    /// The user checked out (wire value `0`).
    CheckOut,
    /// The user checked in (wire value `1`).
    CheckIn,
}

impl CheckFlag {
    /// The portal wire value for this flag.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::CheckOut => 0,
            Self::CheckIn => 1,
        }
    }
}

impl From<CheckFlag> for u8 {
    fn from(flag: CheckFlag) -> Self {
        flag.as_u8()
    }
}

impl TryFrom<u8> for CheckFlag {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::CheckOut),
            1 => Ok(Self::CheckIn),
            other => Err(format!("invalid check flag: {other} (expected 0 or 1)")),
        }
    }
}

impl std::fmt::Display for CheckFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CheckIn => write!(f, "checked in"),
            Self::CheckOut => write!(f, "checked out"),
        }
    }
}

/// One element of the fetched attendance history.
///
/// The portal's read endpoint returns only the flag and timestamp of each
/// event, ordered newest-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEntry {
    /// Whether this event was a check-in or a check-out.
    pub check: CheckFlag,

    /// When the event was recorded (UTC).
    pub recorded_at: DateTime<Utc>,
}

/// A full attendance event as created on submission.
///
/// Never mutated once created; the portal appends it to the user's log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Portal user the event belongs to.
    pub user_id: String,

    /// Whether this event is a check-in or a check-out.
    pub check: CheckFlag,

    /// When the event was created (UTC).
    pub recorded_at: DateTime<Utc>,

    /// Where the user was when the event was created.
    pub location: Coordinate,
}

/// The user's current presence status, derived from the newest record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    /// The newest record is a check-in.
    CheckedIn,
    /// The newest record is a check-out, or no record exists.
    #[default]
    CheckedOut,
}

impl AttendanceStatus {
    /// Derive the status from a newest-first history.
    ///
    /// An empty history means the user has never checked in and is
    /// therefore checked out.
    #[must_use]
    pub fn from_history(history: &[AttendanceEntry]) -> Self {
        match history.first() {
            Some(entry) if entry.check == CheckFlag::CheckIn => Self::CheckedIn,
            _ => Self::CheckedOut,
        }
    }

    /// Whether the user is currently checked in.
    #[must_use]
    pub const fn is_checked_in(self) -> bool {
        matches!(self, Self::CheckedIn)
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CheckedIn => write!(f, "checked in"),
            Self::CheckedOut => write!(f, "checked out"),
        }
    }
}

/// Why an admission decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionReason {
    /// The user is within the geofence tolerance radius.
    WithinRange,
    /// The user is outside the tolerance radius and not checked in.
    OutsideRange,
    /// The user is outside the radius but already checked in, so the
    /// action (proceeding to check out) is never blocked.
    AlreadyCheckedIn,
}

impl AdmissionReason {
    /// Machine-readable classification string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WithinRange => "within_range",
            Self::OutsideRange => "outside_range",
            Self::AlreadyCheckedIn => "already_checked_in",
        }
    }
}

impl std::fmt::Display for AdmissionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of evaluating a geofence admission.
///
/// A refused admission is a policy outcome, not an error: callers surface
/// a message and take no action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdmissionDecision {
    /// Whether the attendance action is permitted.
    pub admitted: bool,

    /// Distance from the geofence center in meters.
    pub distance_meters: f64,

    /// Classification of the decision.
    pub reason: AdmissionReason,
}

/// Decide whether an attendance action is permitted from `current`.
///
/// Admission holds when the user is within the tolerance radius, or when
/// the user is already checked in: checkout is allowed regardless of
/// location, so a checked-in user is never blocked from proceeding.
#[must_use]
pub fn evaluate_admission(
    current: Coordinate,
    config: &GeofenceConfig,
    status: AttendanceStatus,
) -> AdmissionDecision {
    let distance_meters = haversine_distance_meters(current, config.center);

    if is_within_geofence(distance_meters, config.tolerance_radius_meters) {
        AdmissionDecision {
            admitted: true,
            distance_meters,
            reason: AdmissionReason::WithinRange,
        }
    } else if status.is_checked_in() {
        AdmissionDecision {
            admitted: true,
            distance_meters,
            reason: AdmissionReason::AlreadyCheckedIn,
        }
    } else {
        AdmissionDecision {
            admitted: false,
            distance_meters,
            reason: AdmissionReason::OutsideRange,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CENTER: Coordinate = Coordinate::new(31.5204, 74.3587);
    // ~140 m from CENTER, well outside the default 35 m radius.
    const FAR_AWAY: Coordinate = Coordinate::new(31.5210, 74.3600);

    fn entry(check: CheckFlag, hour: u32) -> AttendanceEntry {
        AttendanceEntry {
            check,
            recorded_at: Utc.with_ymd_and_hms(2025, 3, 10, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_status_from_empty_history_is_checked_out() {
        assert_eq!(
            AttendanceStatus::from_history(&[]),
            AttendanceStatus::CheckedOut
        );
    }

    #[test]
    fn test_status_follows_newest_entry() {
        // Newest first: checked in at 10:00 after checking out at 09:00.
        let history = vec![entry(CheckFlag::CheckIn, 10), entry(CheckFlag::CheckOut, 9)];
        assert_eq!(
            AttendanceStatus::from_history(&history),
            AttendanceStatus::CheckedIn
        );

        let history = vec![entry(CheckFlag::CheckOut, 11), entry(CheckFlag::CheckIn, 10)];
        assert_eq!(
            AttendanceStatus::from_history(&history),
            AttendanceStatus::CheckedOut
        );
    }

    #[test]
    fn test_admission_within_range() {
        let fence = GeofenceConfig::new(CENTER);
        let decision = evaluate_admission(CENTER, &fence, AttendanceStatus::CheckedOut);
        assert!(decision.admitted);
        assert_eq!(decision.reason, AdmissionReason::WithinRange);
        assert!(decision.distance_meters < 1e-6);
    }

    #[test]
    fn test_admission_refused_outside_range() {
        let fence = GeofenceConfig::new(CENTER);
        let decision = evaluate_admission(FAR_AWAY, &fence, AttendanceStatus::CheckedOut);
        assert!(!decision.admitted);
        assert_eq!(decision.reason, AdmissionReason::OutsideRange);
        assert!(decision.distance_meters > fence.tolerance_radius_meters);
    }

    #[test]
    fn test_checked_in_user_is_never_blocked() {
        let fence = GeofenceConfig::new(CENTER);
        let decision = evaluate_admission(FAR_AWAY, &fence, AttendanceStatus::CheckedIn);
        assert!(decision.admitted);
        assert_eq!(decision.reason, AdmissionReason::AlreadyCheckedIn);
    }

    #[test]
    fn test_within_range_wins_over_already_checked_in() {
        let fence = GeofenceConfig::new(CENTER);
        let decision = evaluate_admission(CENTER, &fence, AttendanceStatus::CheckedIn);
        assert!(decision.admitted);
        assert_eq!(decision.reason, AdmissionReason::WithinRange);
    }

    #[test]
    fn test_check_flag_wire_values() {
        assert_eq!(CheckFlag::CheckIn.as_u8(), 1);
        assert_eq!(CheckFlag::CheckOut.as_u8(), 0);
        assert_eq!(CheckFlag::try_from(1).unwrap(), CheckFlag::CheckIn);
        assert_eq!(CheckFlag::try_from(0).unwrap(), CheckFlag::CheckOut);
        assert!(CheckFlag::try_from(2).is_err());
    }

    #[test]
    fn test_check_flag_serde_round_trip() {
        let json = serde_json::to_string(&CheckFlag::CheckIn).unwrap();
        assert_eq!(json, "1");
        let flag: CheckFlag = serde_json::from_str("0").unwrap();
        assert_eq!(flag, CheckFlag::CheckOut);
    }

    #[test]
    fn test_admission_reason_strings() {
        assert_eq!(AdmissionReason::WithinRange.as_str(), "within_range");
        assert_eq!(AdmissionReason::OutsideRange.as_str(), "outside_range");
        assert_eq!(
            AdmissionReason::AlreadyCheckedIn.as_str(),
            "already_checked_in"
        );
    }
}
