//! Trip record types.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::ids::{DriverId, RouteId, SchoolId, StudentId, TripRecordId, UserId};
use crate::domain::routes::{AuditStamp, StudentProfile};

/// Validation failures for trip fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TripValidationError {
    /// The status text is not one of [`TripStatus::ALL`].
    #[error("unknown trip status: {value:?}")]
    UnknownStatus {
        /// Raw status text.
        value: String,
    },
}

/// Where a student is in the day's run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    /// Waiting at the pickup point for the morning run.
    #[default]
    WaitingToBeTakenToSchool,
    /// On board, heading to school.
    GoingToSchool,
    /// Dropped at school.
    AtSchool,
    /// Waiting at school for the afternoon run.
    WaitingToBeTakenToHome,
    /// On board, heading home.
    GoingToHome,
    /// Dropped at home.
    AtHome,
}

impl TripStatus {
    /// Every status in the order a normal day passes through them.
    pub const ALL: [Self; 6] = [
        Self::WaitingToBeTakenToSchool,
        Self::GoingToSchool,
        Self::AtSchool,
        Self::WaitingToBeTakenToHome,
        Self::GoingToHome,
        Self::AtHome,
    ];

    /// Wire and storage spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WaitingToBeTakenToSchool => "waiting_to_be_taken_to_school",
            Self::GoingToSchool => "going_to_school",
            Self::AtSchool => "at_school",
            Self::WaitingToBeTakenToHome => "waiting_to_be_taken_to_home",
            Self::GoingToHome => "going_to_home",
            Self::AtHome => "at_home",
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = TripValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == trimmed)
            .ok_or_else(|| TripValidationError::UnknownStatus {
                value: s.to_owned(),
            })
    }
}

/// A student's record for one service day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripRecord {
    pub id: TripRecordId,
    pub school_id: SchoolId,
    /// Route the student rode when the record was opened.
    pub route_id: RouteId,
    pub driver_id: DriverId,
    pub student_id: StudentId,
    pub service_date: NaiveDate,
    pub status: TripStatus,
    pub created: AuditStamp,
    pub updated: Option<AuditStamp>,
}

/// A trip record joined with the student it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripEntry {
    pub record: TripRecord,
    pub student: StudentProfile,
    /// Guardian account linked to the student, if any.
    pub parent_id: Option<UserId>,
}

/// The active route binding a driver holds for a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteBinding {
    pub route_id: RouteId,
    pub school_id: SchoolId,
}
