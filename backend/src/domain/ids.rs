//! UUID-backed identifiers for schools, routes, drivers, students, trips, and
//! users.
//!
//! Every identifier is a thin newtype so the compiler keeps a `DriverId` from
//! being passed where a `StudentId` is expected. They serialise as plain UUID
//! strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation errors returned when parsing identifiers from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    /// The input was empty.
    #[error("{kind} must not be empty")]
    Empty {
        /// Human-readable identifier kind.
        kind: &'static str,
    },
    /// The input was not a canonical UUID.
    #[error("{kind} must be a valid UUID")]
    Invalid {
        /// Human-readable identifier kind.
        kind: &'static str,
    },
}

fn parse_identifier(raw: &str, kind: &'static str) -> Result<Uuid, IdentifierError> {
    if raw.is_empty() {
        return Err(IdentifierError::Empty { kind });
    }
    if raw.trim() != raw {
        return Err(IdentifierError::Invalid { kind });
    }
    Uuid::parse_str(raw).map_err(|_| IdentifierError::Invalid { kind })
}

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Validate and construct the identifier from text.
            pub fn new(raw: impl AsRef<str>) -> Result<Self, IdentifierError> {
                parse_identifier(raw.as_ref(), $kind).map(Self)
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a fresh random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = IdentifierError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

uuid_identifier!(
    /// Identifier of the school that owns routes, drivers, and students.
    SchoolId,
    "school id"
);
uuid_identifier!(
    /// Server-generated identifier of a route.
    RouteId,
    "route id"
);
uuid_identifier!(
    /// Identifier of a driver in the driver directory.
    DriverId,
    "driver id"
);
uuid_identifier!(
    /// Identifier of a student in the student directory.
    StudentId,
    "student id"
);
uuid_identifier!(
    /// Row identifier of a single route assignment.
    AssignmentId,
    "assignment id"
);
uuid_identifier!(
    /// Identifier of an authenticated account.
    UserId,
    "user id"
);
uuid_identifier!(
    /// Identifier of one student's trip record for a service day.
    TripRecordId,
    "trip id"
);
