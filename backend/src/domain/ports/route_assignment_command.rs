//! Driving port for route writes: add, update, delete.
//!
//! Request payloads arrive already parsed into validated domain types, so an
//! implementation never sees an empty name or a zero order token.

use async_trait::async_trait;

use crate::domain::Error;
use crate::domain::identity::Username;
use crate::domain::ids::{RouteId, SchoolId};
use crate::domain::routes::{AssignmentBlock, RouteName};

/// Create a route with its driver blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRouteRequest {
    pub school_id: SchoolId,
    pub name: RouteName,
    pub description: String,
    pub assignments: Vec<AssignmentBlock>,
    pub actor: Username,
}

/// Replace a route's name, description, and driver blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRouteRequest {
    pub route_id: RouteId,
    pub school_id: SchoolId,
    pub name: RouteName,
    pub description: String,
    pub assignments: Vec<AssignmentBlock>,
    pub actor: Username,
}

/// Soft-delete a route and its assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRouteRequest {
    pub route_id: RouteId,
    pub school_id: SchoolId,
    pub actor: Username,
}

/// Route write use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RouteAssignmentCommand: Send + Sync {
    /// Create a route and bind its drivers and students atomically.
    async fn add_route(&self, request: AddRouteRequest) -> Result<RouteId, Error>;

    /// Update a route and its bindings atomically.
    async fn update_route(&self, request: UpdateRouteRequest) -> Result<(), Error>;

    /// Delete a route and all of its bindings atomically.
    async fn delete_route(&self, request: DeleteRouteRequest) -> Result<(), Error>;
}
