//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain records live in
//! the store module so invalid persisted values surface as query errors.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{driver_route_claims, route_assignments, routes, trip_records};

/// Row struct for reading from the routes table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = routes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RouteRow {
    pub id: Uuid,
    pub school_id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

/// Insertable struct for creating routes.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = routes)]
pub(crate) struct NewRouteRow<'a> {
    pub id: Uuid,
    pub school_id: Uuid,
    pub name: &'a str,
    pub description: &'a str,
    pub created_at: DateTime<Utc>,
    pub created_by: &'a str,
}

/// Changeset for route name/description edits.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = routes)]
pub(crate) struct RouteUpdate<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub updated_at: DateTime<Utc>,
    pub updated_by: &'a str,
}

/// Changeset marking a row soft-deleted.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = routes)]
pub(crate) struct RouteDeletion<'a> {
    pub deleted_at: DateTime<Utc>,
    pub deleted_by: &'a str,
}

/// Row struct for reading from the route_assignments table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = route_assignments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RouteAssignmentRow {
    pub id: Uuid,
    pub route_id: Uuid,
    pub school_id: Uuid,
    pub driver_id: Uuid,
    pub student_id: Uuid,
    pub student_order: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

/// Insertable struct for creating route assignments.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = route_assignments)]
pub(crate) struct NewRouteAssignmentRow<'a> {
    pub id: Uuid,
    pub route_id: Uuid,
    pub school_id: Uuid,
    pub driver_id: Uuid,
    pub student_id: Uuid,
    pub student_order: &'a str,
    pub created_at: DateTime<Utc>,
    pub created_by: &'a str,
}

/// Changeset for reordering an assignment.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = route_assignments)]
pub(crate) struct RouteAssignmentUpdate<'a> {
    pub student_order: &'a str,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<&'a str>,
}

/// Changeset marking an assignment soft-deleted.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = route_assignments)]
pub(crate) struct RouteAssignmentDeletion<'a> {
    pub deleted_at: DateTime<Utc>,
    pub deleted_by: &'a str,
}

/// Insertable struct for a driver's claim on a route.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = driver_route_claims)]
pub(crate) struct NewDriverRouteClaimRow {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub route_id: Uuid,
    pub school_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Joined assignment/driver/vehicle/student row used by the read path.
///
/// Field order mirrors the tuple selected in the store.
#[derive(Debug, Clone, Queryable)]
pub(crate) struct AssignmentViewRecord {
    pub route_id: Uuid,
    pub student_order: String,
    pub driver_id: Uuid,
    pub driver_username: String,
    pub driver_first_name: String,
    pub driver_last_name: String,
    pub vehicle_name: Option<String>,
    pub vehicle_number: Option<String>,
    pub student_id: Uuid,
    pub student_first_name: String,
    pub student_last_name: String,
    pub pickup_point: Option<String>,
}

/// Row struct for reading from the trip_records table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = trip_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TripRecordRow {
    pub id: Uuid,
    pub school_id: Uuid,
    pub route_id: Uuid,
    pub driver_id: Uuid,
    pub student_id: Uuid,
    pub service_date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

/// Insertable struct for opening a trip record.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = trip_records)]
pub(crate) struct NewTripRecordRow<'a> {
    pub id: Uuid,
    pub school_id: Uuid,
    pub route_id: Uuid,
    pub driver_id: Uuid,
    pub student_id: Uuid,
    pub service_date: NaiveDate,
    pub status: &'a str,
    pub created_at: DateTime<Utc>,
    pub created_by: &'a str,
}

/// Changeset for a trip status change.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = trip_records)]
pub(crate) struct TripStatusUpdate<'a> {
    pub status: &'a str,
    pub updated_at: DateTime<Utc>,
    pub updated_by: &'a str,
}
