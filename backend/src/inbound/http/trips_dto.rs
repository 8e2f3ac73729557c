//! Request and response bodies for the trip status endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, StudentId, TripEntry, TripRecordId, TripStatus};
use crate::inbound::http::validation::{FieldName, invalid_value_error, parse_id};

/// Open today's record for a student.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordTripBody {
    #[schema(format = "uuid")]
    pub student_id: String,
    /// Starting status; `waiting_to_be_taken_to_school` when omitted.
    #[serde(default)]
    #[schema(example = "going_to_school")]
    pub status: Option<String>,
}

/// New status for an existing record.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TripStatusBody {
    #[schema(example = "at_school")]
    pub status: String,
}

/// Parsed record payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedRecordTrip {
    pub student_id: StudentId,
    pub status: Option<TripStatus>,
}

impl TryFrom<RecordTripBody> for ParsedRecordTrip {
    type Error = Error;

    fn try_from(body: RecordTripBody) -> Result<Self, Self::Error> {
        let student_id = parse_id(&body.student_id, FieldName::new("studentId"))?;
        let status = body.status.as_deref().map(parse_status).transpose()?;
        Ok(Self { student_id, status })
    }
}

/// Parse a status token, blaming the `status` field.
pub(crate) fn parse_status(raw: &str) -> Result<TripStatus, Error> {
    raw.parse::<TripStatus>()
        .map_err(|err| invalid_value_error(FieldName::new("status"), err.to_string()))
}

/// Identifier of a freshly opened record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TripCreatedBody {
    #[schema(format = "uuid")]
    pub trip_id: String,
}

impl From<TripRecordId> for TripCreatedBody {
    fn from(trip_id: TripRecordId) -> Self {
        Self {
            trip_id: trip_id.to_string(),
        }
    }
}

/// One student's trip record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TripBody {
    #[schema(format = "uuid")]
    pub trip_id: String,
    #[schema(format = "uuid")]
    pub route_id: String,
    #[schema(format = "uuid")]
    pub driver_id: String,
    #[schema(format = "uuid")]
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub pickup_point: Option<String>,
    #[schema(format = "date", example = "2026-03-02")]
    pub service_date: String,
    #[schema(example = "waiting_to_be_taken_to_school")]
    pub status: String,
    #[schema(format = "date-time")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(format = "date-time")]
    pub updated_at: Option<String>,
}

impl From<TripEntry> for TripBody {
    fn from(entry: TripEntry) -> Self {
        let record = entry.record;
        Self {
            trip_id: record.id.to_string(),
            route_id: record.route_id.to_string(),
            driver_id: record.driver_id.to_string(),
            student_id: record.student_id.to_string(),
            first_name: entry.student.first_name,
            last_name: entry.student.last_name,
            pickup_point: entry.student.pickup_point,
            service_date: record.service_date.to_string(),
            status: record.status.as_str().to_owned(),
            created_at: record.created.at.to_rfc3339(),
            updated_at: record.updated.map(|stamp| stamp.at.to_rfc3339()),
        }
    }
}
