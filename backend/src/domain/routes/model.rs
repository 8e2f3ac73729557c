//! Route and route-assignment records plus their validated field types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::identity::Username;
use crate::domain::ids::{AssignmentId, DriverId, RouteId, SchoolId, StudentId};

use super::error::RouteAssignmentError;

/// Maximum length of a route display name.
pub const ROUTE_NAME_MAX: usize = 100;

/// Validation failures for route fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteValidationError {
    /// The route name was blank.
    #[error("route name must not be empty")]
    EmptyName,
    /// The route name exceeded [`ROUTE_NAME_MAX`] characters.
    #[error("route name must be at most {max} characters")]
    NameTooLong {
        /// Maximum permitted length.
        max: usize,
    },
    /// The order token was blank or zero.
    #[error("student order must be present and non-zero, got {value:?}")]
    InvalidOrder {
        /// Raw order text.
        value: String,
    },
}

/// Display name of a route. Not unique; routes are identified by [`RouteId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RouteName(String);

impl RouteName {
    /// Validate and construct a route name.
    pub fn new(value: impl Into<String>) -> Result<Self, RouteValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(RouteValidationError::EmptyName);
        }
        if trimmed.chars().count() > ROUTE_NAME_MAX {
            return Err(RouteValidationError::NameTooLong {
                max: ROUTE_NAME_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the name text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for RouteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<RouteName> for String {
    fn from(value: RouteName) -> Self {
        value.0
    }
}

impl TryFrom<String> for RouteName {
    type Error = RouteValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Pickup-sequence token of a student on a driver's run.
///
/// The token is text, not a number: it must be present and must not be the
/// zero value, but nothing guarantees contiguity.
///
/// # Examples
/// ```
/// use shuttle_backend::domain::StudentOrder;
///
/// assert!(StudentOrder::new("2").is_ok());
/// assert!(StudentOrder::new("0").is_err());
/// assert!(StudentOrder::new("  ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StudentOrder(String);

impl StudentOrder {
    /// Validate and construct an order token.
    pub fn new(value: impl Into<String>) -> Result<Self, RouteValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        let is_zero = trimmed.parse::<i64>().is_ok_and(|parsed| parsed == 0);
        if trimmed.is_empty() || is_zero {
            return Err(RouteValidationError::InvalidOrder { value });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for StudentOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<StudentOrder> for String {
    fn from(value: StudentOrder) -> Self {
        value.0
    }
}

impl TryFrom<String> for StudentOrder {
    type Error = RouteValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Who changed a record and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditStamp {
    /// Time of the change.
    pub at: DateTime<Utc>,
    /// Actor responsible for the change.
    pub by: Username,
}

impl AuditStamp {
    /// Build a stamp for `by` at `at`.
    #[must_use]
    pub const fn new(at: DateTime<Utc>, by: Username) -> Self {
        Self { at, by }
    }
}

/// School-scoped container for one shuttle run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub id: RouteId,
    pub school_id: SchoolId,
    pub name: RouteName,
    pub description: String,
    pub created: AuditStamp,
    pub updated: Option<AuditStamp>,
}

/// Mutable route fields written by an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteChanges {
    pub id: RouteId,
    pub school_id: SchoolId,
    pub name: RouteName,
    pub description: String,
    pub updated: AuditStamp,
}

/// Binding of one driver and one student, with a pickup order, to a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteAssignment {
    pub id: AssignmentId,
    pub route_id: RouteId,
    pub school_id: SchoolId,
    pub driver_id: DriverId,
    pub student_id: StudentId,
    pub student_order: StudentOrder,
    pub created: AuditStamp,
    pub updated: Option<AuditStamp>,
}

impl RouteAssignment {
    /// Composite key identifying the binding within its route.
    #[must_use]
    pub const fn binding(&self) -> (DriverId, StudentId) {
        (self.driver_id, self.student_id)
    }
}

/// One student and their order within a driver block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentPlacement {
    pub student_id: StudentId,
    pub order: StudentOrder,
}

impl StudentPlacement {
    /// Parse a raw order token for `student_id`.
    ///
    /// Fails with [`RouteAssignmentError::InvalidStudentOrder`] so the request
    /// is rejected before any unit of work opens.
    pub fn parse(
        student_id: StudentId,
        order: impl Into<String>,
    ) -> Result<Self, RouteAssignmentError> {
        let raw = order.into();
        StudentOrder::new(raw.clone())
            .map(|order| Self { student_id, order })
            .map_err(|_| RouteAssignmentError::InvalidStudentOrder {
                student_id,
                value: raw,
            })
    }
}

/// A driver plus the ordered students on their run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentBlock {
    pub driver_id: DriverId,
    pub students: Vec<StudentPlacement>,
}

/// Lightweight listing entry for a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSummary {
    pub id: RouteId,
    pub school_id: SchoolId,
    pub name: RouteName,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Route> for RouteSummary {
    fn from(route: &Route) -> Self {
        Self {
            id: route.id,
            school_id: route.school_id,
            name: route.name.clone(),
            description: route.description.clone(),
            created_at: route.created.at,
        }
    }
}

/// Driver fields denormalised into assembled views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverProfile {
    pub id: DriverId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub vehicle_name: Option<String>,
    pub vehicle_number: Option<String>,
}

/// Student fields denormalised into assembled views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentProfile {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub pickup_point: Option<String>,
}

/// Flat joined row produced by the read path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentViewRow {
    pub route_id: RouteId,
    pub driver: DriverProfile,
    pub student: StudentProfile,
    pub student_order: StudentOrder,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1")]
    #[case("10")]
    #[case(" 3 ")]
    #[case("A-2")]
    fn accepts_non_trivial_orders(#[case] raw: &str) {
        let order = StudentOrder::new(raw).expect("valid order");
        assert_eq!(order.as_str(), raw.trim());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("0")]
    #[case("00")]
    #[case("-0")]
    fn rejects_empty_or_zero_orders(#[case] raw: &str) {
        assert_eq!(
            StudentOrder::new(raw),
            Err(RouteValidationError::InvalidOrder {
                value: raw.to_owned()
            })
        );
    }

    #[rstest]
    fn placement_parsing_reports_the_student() {
        let student_id = StudentId::random();
        assert_eq!(
            StudentPlacement::parse(student_id, "0"),
            Err(RouteAssignmentError::InvalidStudentOrder {
                student_id,
                value: "0".to_owned(),
            })
        );
    }

    #[rstest]
    fn trims_route_names() {
        let name = RouteName::new("  Route A ").expect("valid name");
        assert_eq!(name.as_str(), "Route A");
    }

    #[rstest]
    fn rejects_blank_and_overlong_route_names() {
        assert_eq!(RouteName::new(" "), Err(RouteValidationError::EmptyName));
        assert_eq!(
            RouteName::new("x".repeat(ROUTE_NAME_MAX + 1)),
            Err(RouteValidationError::NameTooLong {
                max: ROUTE_NAME_MAX
            })
        );
    }
}
