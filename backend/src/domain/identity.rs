//! Caller identity as supplied by the upstream identity gateway.
//!
//! The service trusts these values as given; it only checks that they are
//! well formed and that the role fits the operation being attempted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ids::{DriverId, SchoolId, UserId};

/// Maximum length of a username recorded in audit columns.
pub const USERNAME_MAX: usize = 64;

/// Errors raised while validating identity values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityValidationError {
    /// The username was blank.
    #[error("username must not be empty")]
    EmptyUsername,
    /// The username exceeded [`USERNAME_MAX`] characters.
    #[error("username must be at most {max} characters")]
    UsernameTooLong {
        /// Maximum permitted length.
        max: usize,
    },
    /// The role code was not recognised.
    #[error("unknown role: {value}")]
    UnknownRole {
        /// Raw role text.
        value: String,
    },
}

/// Account name of the actor performing a write, stored as `created_by`,
/// `updated_by`, or `deleted_by`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and construct a username.
    pub fn new(value: impl Into<String>) -> Result<Self, IdentityValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(IdentityValidationError::EmptyUsername);
        }
        if trimmed.chars().count() > USERNAME_MAX {
            return Err(IdentityValidationError::UsernameTooLong { max: USERNAME_MAX });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the username text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = IdentityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform operator spanning every school.
    SuperAdmin,
    /// Administrator of one school; owns route management.
    SchoolAdmin,
    /// Shuttle driver.
    Driver,
    /// Guardian of one or more students.
    Parent,
}

impl Role {
    /// Short code used by the identity gateway.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::SuperAdmin => "SA",
            Self::SchoolAdmin => "AS",
            Self::Driver => "D",
            Self::Parent => "P",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Role {
    type Err = IdentityValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "SA" | "super_admin" => Ok(Self::SuperAdmin),
            "AS" | "school_admin" => Ok(Self::SchoolAdmin),
            "D" | "driver" => Ok(Self::Driver),
            "P" | "parent" => Ok(Self::Parent),
            other => Err(IdentityValidationError::UnknownRole {
                value: other.to_owned(),
            }),
        }
    }
}

/// Authenticated caller resolved upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Account identifier.
    pub user_id: UserId,
    /// Account role.
    pub role: Role,
    /// School the account belongs to.
    pub school_id: SchoolId,
    /// Account name recorded in audit columns.
    pub username: Username,
}

impl CallerIdentity {
    /// Driver identifier when the caller is a driver.
    ///
    /// Drivers are accounts, so the driver directory shares the user id.
    #[must_use]
    pub fn driver_id(&self) -> Option<DriverId> {
        matches!(self.role, Role::Driver).then(|| DriverId::from_uuid(*self.user_id.as_uuid()))
    }
}
