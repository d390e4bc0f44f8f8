//! HTTP client for the hostel portal's attendance API.
//!
//! Implements the core store traits over the portal's three endpoints:
//!
//! - `GET  /api/getCoordinates/{user_id}` - the user's fixed location
//! - `GET  /api/attendanceCheck/{user_id}` - attendance history, newest-first
//! - `POST /api/attendance` - append one check-in/check-out event
//!
//! The portal is a PHP application with loosely typed JSON: coordinates
//! arrive as strings or numbers depending on the backing column, and
//! timestamps come in either RFC 3339 or `YYYY-MM-DD HH:MM:SS` form. The
//! wire types here absorb both.

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use muster_core::{
    AttendanceEntry, AttendanceRecord, AttendanceRecordStore, CheckFlag, Coordinate,
    GeofenceConfig, GeofenceConfigStore, StoreError,
};

/// HTTP client for the hostel portal.
#[derive(Clone)]
pub struct PortalClient {
    client: reqwest::Client,
    base_url: Url,
    tolerance_radius_meters: f64,
}

impl PortalClient {
    /// Create a client against `base_url`.
    ///
    /// The portal only stores the geofence center; the tolerance radius is
    /// local policy and is attached to every fetched geofence here.
    pub fn new(
        base_url: Url,
        timeout: Duration,
        tolerance_radius_meters: f64,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            tolerance_radius_meters,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        self.base_url
            .join(path)
            .map_err(|err| StoreError::Transport(format!("invalid endpoint URL {path}: {err}")))
    }
}

/// Fail on a non-success HTTP status, carrying the body when there is one.
///
/// Treating 4xx/5xx as failures keeps a rejected submission from being
/// reported as success.
async fn into_success(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.text().await {
        Ok(body) if !body.trim().is_empty() => body,
        _ => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };
    Err(StoreError::Status {
        status: status.as_u16(),
        message,
    })
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Transport(err.to_string())
}

// Wire types ----------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CoordinatesResponse {
    status: String,
    #[serde(default)]
    data: Vec<WireCoordinate>,
}

#[derive(Debug, Deserialize)]
struct WireCoordinate {
    #[serde(deserialize_with = "lenient_f64")]
    latitude: f64,
    #[serde(deserialize_with = "lenient_f64")]
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct AttendanceResponse {
    #[serde(default)]
    attendance: Vec<WireEntry>,
}

#[derive(Debug, Deserialize)]
struct WireEntry {
    check: CheckFlag,
    #[serde(deserialize_with = "portal_timestamp")]
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    user_id: &'a str,
    check: CheckFlag,
    latitude: f64,
    longitude: f64,
}

/// Accept a float serialized either as a JSON number or as a string.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Accept a timestamp in RFC 3339 or the portal's `YYYY-MM-DD HH:MM:SS`
/// form; the latter is interpreted as UTC.
fn portal_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

// Trait implementations ------------------------------------------------------

impl GeofenceConfigStore for PortalClient {
    async fn fetch_geofence(&self, user_id: &str) -> Result<Option<GeofenceConfig>, StoreError> {
        let url = self.endpoint(&format!("api/getCoordinates/{user_id}"))?;
        let response = self.client.get(url).send().await.map_err(transport)?;
        let body: CoordinatesResponse = into_success(response)
            .await?
            .json()
            .await
            .map_err(|err| StoreError::MalformedResponse(err.to_string()))?;

        // The portal reports a non-"success" status when no fixed location
        // exists for the user; treat it the same as an empty data array.
        if body.status != "success" {
            return Ok(None);
        }

        Ok(body.data.first().map(|wire| {
            GeofenceConfig::with_tolerance(
                Coordinate::new(wire.latitude, wire.longitude),
                self.tolerance_radius_meters,
            )
        }))
    }
}

impl AttendanceRecordStore for PortalClient {
    async fn fetch_history(&self, user_id: &str) -> Result<Vec<AttendanceEntry>, StoreError> {
        let url = self.endpoint(&format!("api/attendanceCheck/{user_id}"))?;
        let response = self.client.get(url).send().await.map_err(transport)?;
        let body: AttendanceResponse = into_success(response)
            .await?
            .json()
            .await
            .map_err(|err| StoreError::MalformedResponse(err.to_string()))?;

        Ok(body
            .attendance
            .into_iter()
            .map(|wire| AttendanceEntry {
                check: wire.check,
                recorded_at: wire.created_at,
            })
            .collect())
    }

    async fn submit(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        let url = self.endpoint("api/attendance")?;
        let response = self
            .client
            .post(url)
            .json(&SubmitRequest {
                user_id: &record.user_id,
                check: record.check,
                latitude: record.location.latitude,
                longitude: record.location.longitude,
            })
            .send()
            .await
            .map_err(transport)?;
        into_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_response_with_string_floats() {
        let body: CoordinatesResponse = serde_json::from_str(
            r#"{"status":"success","data":[{"latitude":"31.5204","longitude":"74.3587"}]}"#,
        )
        .unwrap();
        assert_eq!(body.status, "success");
        assert!((body.data[0].latitude - 31.5204).abs() < f64::EPSILON);
        assert!((body.data[0].longitude - 74.3587).abs() < f64::EPSILON);
    }

    #[test]
    fn test_coordinates_response_with_numeric_floats() {
        let body: CoordinatesResponse = serde_json::from_str(
            r#"{"status":"success","data":[{"latitude":31.5204,"longitude":74.3587}]}"#,
        )
        .unwrap();
        assert!((body.data[0].latitude - 31.5204).abs() < f64::EPSILON);
    }

    #[test]
    fn test_coordinates_response_with_empty_data() {
        let body: CoordinatesResponse =
            serde_json::from_str(r#"{"status":"success","data":[]}"#).unwrap();
        assert!(body.data.is_empty());
    }

    #[test]
    fn test_coordinates_rejects_unparseable_string() {
        let result: Result<CoordinatesResponse, _> = serde_json::from_str(
            r#"{"status":"success","data":[{"latitude":"not a number","longitude":"74.0"}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_attendance_response_parses_wire_entries() {
        let body: AttendanceResponse = serde_json::from_str(
            r#"{"attendance":[
                {"check":1,"created_at":"2025-03-10T09:00:00Z"},
                {"check":0,"created_at":"2025-03-09 18:30:00"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(body.attendance.len(), 2);
        assert_eq!(body.attendance[0].check, CheckFlag::CheckIn);
        assert_eq!(body.attendance[1].check, CheckFlag::CheckOut);
        assert_eq!(
            body.attendance[1].created_at,
            NaiveDateTime::parse_from_str("2025-03-09 18:30:00", "%Y-%m-%d %H:%M:%S")
                .unwrap()
                .and_utc()
        );
    }

    #[test]
    fn test_attendance_response_rejects_bad_check_flag() {
        let result: Result<AttendanceResponse, _> = serde_json::from_str(
            r#"{"attendance":[{"check":2,"created_at":"2025-03-10T09:00:00Z"}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_submit_request_serializes_check_as_number() {
        let request = SubmitRequest {
            user_id: "482",
            check: CheckFlag::CheckIn,
            latitude: 31.5204,
            longitude: 74.3587,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["check"], 1);
        assert_eq!(json["user_id"], "482");
    }

    #[test]
    fn test_endpoint_joins_against_base() {
        let client = PortalClient::new(
            Url::parse("https://wwh.punjab.gov.pk/").unwrap(),
            Duration::from_secs(15),
            35.0,
        )
        .unwrap();
        let url = client.endpoint("api/getCoordinates/482").unwrap();
        assert_eq!(
            url.as_str(),
            "https://wwh.punjab.gov.pk/api/getCoordinates/482"
        );
    }
}
