//! PostgreSQL-backed `AssignmentStore` implementation using Diesel ORM.
//!
//! A unit of work owns one pooled connection with an open transaction. Point
//! checks run on that connection, so they observe the unit's own writes and
//! everything committed before each statement (READ COMMITTED).
//!
//! Exclusivity is backed by two partial unique indexes: one active
//! assignment per student, and one active route claim per driver. A claim row
//! is written with a driver's first assignment on a route and released when
//! their last assignment there is retired or the route is deleted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, RunQueryDsl, TransactionManager};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::identity::Username;
use crate::domain::ids::{AssignmentId, DriverId, RouteId, SchoolId, StudentId};
use crate::domain::ports::{
    AssignmentStore, AssignmentStoreError, AssignmentUnitOfWork, DirectoryKind,
};
use crate::domain::routes::{
    AssignmentViewRow, AuditStamp, DriverProfile, Route, RouteAssignment, RouteChanges, RouteName,
    RouteSummary, StudentOrder, StudentProfile,
};

use super::diesel_helpers::{
    ExclusivityIndex, map_diesel_error, map_pool_error, violated_exclusivity_index,
};
use super::models::{
    AssignmentViewRecord, NewDriverRouteClaimRow, NewRouteAssignmentRow, NewRouteRow,
    RouteAssignmentDeletion, RouteAssignmentRow, RouteAssignmentUpdate, RouteDeletion, RouteRow,
    RouteUpdate,
};
use super::pool::{DbPool, OwnedConnection};
use super::schema::{
    driver_route_claims, drivers, route_assignments, routes, students, vehicles,
};

/// Diesel-backed implementation of the `AssignmentStore` port.
#[derive(Clone)]
pub struct DieselAssignmentStore {
    pool: DbPool,
}

impl DieselAssignmentStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Open PostgreSQL transaction on an owned connection.
///
/// Dropping the unit before `commit` or `rollback` returns the connection
/// to the pool mid-transaction; the pool discards it and the server rolls
/// the transaction back.
pub struct DieselUnitOfWork {
    conn: OwnedConnection,
    finished: bool,
}

impl DieselUnitOfWork {
    fn conn(&mut self) -> &mut AsyncPgConnection {
        &mut self.conn
    }

    async fn claim_route(
        &mut self,
        assignment: &RouteAssignment,
    ) -> Result<(), AssignmentStoreError> {
        let driver = *assignment.driver_id.as_uuid();
        let route = *assignment.route_id.as_uuid();
        let already_claimed: bool = diesel::select(diesel::dsl::exists(
            driver_route_claims::table
                .filter(driver_route_claims::driver_id.eq(driver))
                .filter(driver_route_claims::route_id.eq(route))
                .filter(driver_route_claims::deleted_at.is_null()),
        ))
        .get_result(self.conn())
        .await
        .map_err(map_diesel_error)?;
        if already_claimed {
            return Ok(());
        }

        let claim = NewDriverRouteClaimRow {
            id: Uuid::new_v4(),
            driver_id: driver,
            route_id: route,
            school_id: *assignment.school_id.as_uuid(),
            created_at: assignment.created.at,
        };
        diesel::insert_into(driver_route_claims::table)
            .values(&claim)
            .execute(self.conn())
            .await
            .map_err(|error| map_insert_error(error, assignment))?;
        debug!(driver_id = %assignment.driver_id, route_id = %assignment.route_id, "route claimed");
        Ok(())
    }

    async fn release_idle_claim(
        &mut self,
        route: Uuid,
        driver: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), AssignmentStoreError> {
        let remaining: i64 = route_assignments::table
            .filter(route_assignments::route_id.eq(route))
            .filter(route_assignments::driver_id.eq(driver))
            .filter(route_assignments::deleted_at.is_null())
            .count()
            .get_result(self.conn())
            .await
            .map_err(map_diesel_error)?;
        if remaining > 0 {
            return Ok(());
        }

        diesel::update(
            driver_route_claims::table
                .filter(driver_route_claims::route_id.eq(route))
                .filter(driver_route_claims::driver_id.eq(driver))
                .filter(driver_route_claims::deleted_at.is_null()),
        )
        .set(driver_route_claims::deleted_at.eq(at))
        .execute(self.conn())
        .await
        .map_err(map_diesel_error)?;
        debug!(%driver, %route, "route claim released");
        Ok(())
    }

    async fn directory_contains(
        &mut self,
        kind: DirectoryKind,
        id: Uuid,
        school: Uuid,
    ) -> Result<bool, AssignmentStoreError> {
        let conn = self.conn();
        let query = match kind {
            DirectoryKind::Driver => diesel::select(diesel::dsl::exists(
                drivers::table
                    .filter(drivers::id.eq(id))
                    .filter(drivers::school_id.eq(school))
                    .filter(drivers::deleted_at.is_null()),
            ))
            .get_result::<bool>(conn)
            .await,
            DirectoryKind::Student => diesel::select(diesel::dsl::exists(
                students::table
                    .filter(students::id.eq(id))
                    .filter(students::school_id.eq(school))
                    .filter(students::deleted_at.is_null()),
            ))
            .get_result::<bool>(conn)
            .await,
        };
        query.map_err(map_diesel_error)
    }
}

impl Drop for DieselUnitOfWork {
    fn drop(&mut self) {
        if !self.finished {
            warn!("unit of work dropped while open; its transaction will be rolled back");
        }
    }
}

fn map_insert_error(
    error: diesel::result::Error,
    assignment: &RouteAssignment,
) -> AssignmentStoreError {
    match violated_exclusivity_index(&error) {
        Some(ExclusivityIndex::Student) => {
            AssignmentStoreError::student_conflict(assignment.student_id)
        }
        Some(ExclusivityIndex::DriverClaim) => {
            AssignmentStoreError::driver_conflict(assignment.driver_id)
        }
        Some(ExclusivityIndex::StudentTripDay) | None => map_diesel_error(error),
    }
}

fn corrupt(field: &str, error: impl std::fmt::Display) -> AssignmentStoreError {
    AssignmentStoreError::query(format!("invalid {field} in database: {error}"))
}

fn username(field: &str, raw: String) -> Result<Username, AssignmentStoreError> {
    Username::new(raw).map_err(|error| corrupt(field, error))
}

fn optional_stamp(
    field: &str,
    at: Option<DateTime<Utc>>,
    by: Option<String>,
) -> Result<Option<AuditStamp>, AssignmentStoreError> {
    match (at, by) {
        (Some(at), Some(by)) => Ok(Some(AuditStamp::new(at, username(field, by)?))),
        _ => Ok(None),
    }
}

fn row_to_route(row: RouteRow) -> Result<Route, AssignmentStoreError> {
    Ok(Route {
        id: RouteId::from_uuid(row.id),
        school_id: SchoolId::from_uuid(row.school_id),
        name: RouteName::new(row.name).map_err(|error| corrupt("route name", error))?,
        description: row.description,
        created: AuditStamp::new(row.created_at, username("created_by", row.created_by)?),
        updated: optional_stamp("updated_by", row.updated_at, row.updated_by)?,
    })
}

fn row_to_summary(row: RouteRow) -> Result<RouteSummary, AssignmentStoreError> {
    row_to_route(row).map(|route| RouteSummary::from(&route))
}

fn row_to_assignment(row: RouteAssignmentRow) -> Result<RouteAssignment, AssignmentStoreError> {
    Ok(RouteAssignment {
        id: AssignmentId::from_uuid(row.id),
        route_id: RouteId::from_uuid(row.route_id),
        school_id: SchoolId::from_uuid(row.school_id),
        driver_id: DriverId::from_uuid(row.driver_id),
        student_id: StudentId::from_uuid(row.student_id),
        student_order: StudentOrder::new(row.student_order)
            .map_err(|error| corrupt("student order", error))?,
        created: AuditStamp::new(row.created_at, username("created_by", row.created_by)?),
        updated: optional_stamp("updated_by", row.updated_at, row.updated_by)?,
    })
}

fn record_to_view_row(record: AssignmentViewRecord) -> Result<AssignmentViewRow, AssignmentStoreError> {
    Ok(AssignmentViewRow {
        route_id: RouteId::from_uuid(record.route_id),
        driver: DriverProfile {
            id: DriverId::from_uuid(record.driver_id),
            username: record.driver_username,
            first_name: record.driver_first_name,
            last_name: record.driver_last_name,
            vehicle_name: record.vehicle_name,
            vehicle_number: record.vehicle_number,
        },
        student: StudentProfile {
            id: StudentId::from_uuid(record.student_id),
            first_name: record.student_first_name,
            last_name: record.student_last_name,
            pickup_point: record.pickup_point,
        },
        student_order: StudentOrder::new(record.student_order)
            .map_err(|error| corrupt("student order", error))?,
    })
}

#[async_trait]
impl AssignmentUnitOfWork for DieselUnitOfWork {
    async fn insert_route(&mut self, route: &Route) -> Result<RouteId, AssignmentStoreError> {
        let row = NewRouteRow {
            id: *route.id.as_uuid(),
            school_id: *route.school_id.as_uuid(),
            name: route.name.as_str(),
            description: &route.description,
            created_at: route.created.at,
            created_by: route.created.by.as_str(),
        };
        diesel::insert_into(routes::table)
            .values(&row)
            .execute(self.conn())
            .await
            .map_err(map_diesel_error)?;
        Ok(route.id)
    }

    async fn insert_assignment(
        &mut self,
        assignment: &RouteAssignment,
    ) -> Result<(), AssignmentStoreError> {
        let school = *assignment.school_id.as_uuid();
        for (kind, id) in [
            (DirectoryKind::Driver, *assignment.driver_id.as_uuid()),
            (DirectoryKind::Student, *assignment.student_id.as_uuid()),
        ] {
            if !self.directory_contains(kind, id, school).await? {
                return Err(AssignmentStoreError::reference_not_found(kind, id));
            }
        }

        let row = NewRouteAssignmentRow {
            id: *assignment.id.as_uuid(),
            route_id: *assignment.route_id.as_uuid(),
            school_id: school,
            driver_id: *assignment.driver_id.as_uuid(),
            student_id: *assignment.student_id.as_uuid(),
            student_order: assignment.student_order.as_str(),
            created_at: assignment.created.at,
            created_by: assignment.created.by.as_str(),
        };
        diesel::insert_into(route_assignments::table)
            .values(&row)
            .execute(self.conn())
            .await
            .map_err(|error| map_insert_error(error, assignment))?;
        self.claim_route(assignment).await
    }

    async fn active_route_for_driver(
        &mut self,
        driver_id: &DriverId,
    ) -> Result<Option<RouteId>, AssignmentStoreError> {
        let route: Option<Uuid> = driver_route_claims::table
            .filter(driver_route_claims::driver_id.eq(driver_id.as_uuid()))
            .filter(driver_route_claims::deleted_at.is_null())
            .select(driver_route_claims::route_id)
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(route.map(RouteId::from_uuid))
    }

    async fn active_route_for_student(
        &mut self,
        student_id: &StudentId,
    ) -> Result<Option<RouteId>, AssignmentStoreError> {
        let route: Option<Uuid> = route_assignments::table
            .filter(route_assignments::student_id.eq(student_id.as_uuid()))
            .filter(route_assignments::deleted_at.is_null())
            .select(route_assignments::route_id)
            .first(self.conn())
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(route.map(RouteId::from_uuid))
    }

    async fn route_exists(
        &mut self,
        route_id: &RouteId,
        school_id: &SchoolId,
    ) -> Result<bool, AssignmentStoreError> {
        diesel::select(diesel::dsl::exists(
            routes::table
                .filter(routes::id.eq(route_id.as_uuid()))
                .filter(routes::school_id.eq(school_id.as_uuid()))
                .filter(routes::deleted_at.is_null()),
        ))
        .get_result(self.conn())
        .await
        .map_err(map_diesel_error)
    }

    async fn route_assignments(
        &mut self,
        route_id: &RouteId,
    ) -> Result<Vec<RouteAssignment>, AssignmentStoreError> {
        let rows: Vec<RouteAssignmentRow> = route_assignments::table
            .filter(route_assignments::route_id.eq(route_id.as_uuid()))
            .filter(route_assignments::deleted_at.is_null())
            .select(RouteAssignmentRow::as_select())
            .order_by(route_assignments::created_at.asc())
            .load(self.conn())
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_assignment).collect()
    }

    async fn update_route(&mut self, changes: &RouteChanges) -> Result<(), AssignmentStoreError> {
        let changeset = RouteUpdate {
            name: changes.name.as_str(),
            description: &changes.description,
            updated_at: changes.updated.at,
            updated_by: changes.updated.by.as_str(),
        };
        let updated = diesel::update(
            routes::table
                .filter(routes::id.eq(changes.id.as_uuid()))
                .filter(routes::school_id.eq(changes.school_id.as_uuid()))
                .filter(routes::deleted_at.is_null()),
        )
        .set(&changeset)
        .execute(self.conn())
        .await
        .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(AssignmentStoreError::not_found(format!("route {}", changes.id)));
        }
        Ok(())
    }

    async fn update_assignment(
        &mut self,
        assignment: &RouteAssignment,
    ) -> Result<(), AssignmentStoreError> {
        let changeset = RouteAssignmentUpdate {
            student_order: assignment.student_order.as_str(),
            updated_at: assignment.updated.as_ref().map(|stamp| stamp.at),
            updated_by: assignment.updated.as_ref().map(|stamp| stamp.by.as_str()),
        };
        let updated = diesel::update(
            route_assignments::table
                .filter(route_assignments::id.eq(assignment.id.as_uuid()))
                .filter(route_assignments::deleted_at.is_null()),
        )
        .set(&changeset)
        .execute(self.conn())
        .await
        .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(AssignmentStoreError::not_found(format!(
                "assignment {}",
                assignment.id
            )));
        }
        Ok(())
    }

    async fn retire_assignment(
        &mut self,
        assignment_id: &AssignmentId,
        deletion: &AuditStamp,
    ) -> Result<(), AssignmentStoreError> {
        let changeset = RouteAssignmentDeletion {
            deleted_at: deletion.at,
            deleted_by: deletion.by.as_str(),
        };
        let retired: Option<(Uuid, Uuid)> = diesel::update(
            route_assignments::table
                .filter(route_assignments::id.eq(assignment_id.as_uuid()))
                .filter(route_assignments::deleted_at.is_null()),
        )
        .set(&changeset)
        .returning((route_assignments::route_id, route_assignments::driver_id))
        .get_result(self.conn())
        .await
        .optional()
        .map_err(map_diesel_error)?;
        let Some((route, driver)) = retired else {
            return Err(AssignmentStoreError::not_found(format!(
                "assignment {assignment_id}"
            )));
        };
        self.release_idle_claim(route, driver, deletion.at).await
    }

    async fn delete_route_cascade(
        &mut self,
        route_id: &RouteId,
        school_id: &SchoolId,
        deletion: &AuditStamp,
    ) -> Result<(), AssignmentStoreError> {
        let route = *route_id.as_uuid();
        let school = *school_id.as_uuid();
        let assignments = diesel::update(
            route_assignments::table
                .filter(route_assignments::route_id.eq(route))
                .filter(route_assignments::school_id.eq(school))
                .filter(route_assignments::deleted_at.is_null()),
        )
        .set(&RouteAssignmentDeletion {
            deleted_at: deletion.at,
            deleted_by: deletion.by.as_str(),
        })
        .execute(self.conn())
        .await
        .map_err(map_diesel_error)?;

        diesel::update(
            driver_route_claims::table
                .filter(driver_route_claims::route_id.eq(route))
                .filter(driver_route_claims::school_id.eq(school))
                .filter(driver_route_claims::deleted_at.is_null()),
        )
        .set(driver_route_claims::deleted_at.eq(deletion.at))
        .execute(self.conn())
        .await
        .map_err(map_diesel_error)?;

        // Nothing above is visible unless the route row is found too; the
        // caller rolls back on `NotFound`.
        let deleted = diesel::update(
            routes::table
                .filter(routes::id.eq(route))
                .filter(routes::school_id.eq(school))
                .filter(routes::deleted_at.is_null()),
        )
        .set(&RouteDeletion {
            deleted_at: deletion.at,
            deleted_by: deletion.by.as_str(),
        })
        .execute(self.conn())
        .await
        .map_err(map_diesel_error)?;
        if deleted == 0 {
            return Err(AssignmentStoreError::not_found(format!("route {route_id}")));
        }

        debug!(%route_id, assignments, "route and assignments soft-deleted");
        Ok(())
    }

    async fn commit(mut self) -> Result<(), AssignmentStoreError> {
        let outcome = AnsiTransactionManager::commit_transaction(self.conn()).await;
        self.finished = true;
        outcome.map_err(map_diesel_error)
    }

    async fn rollback(mut self) -> Result<(), AssignmentStoreError> {
        let outcome = AnsiTransactionManager::rollback_transaction(self.conn()).await;
        self.finished = true;
        outcome.map_err(map_diesel_error)
    }
}

#[async_trait]
impl AssignmentStore for DieselAssignmentStore {
    type UnitOfWork = DieselUnitOfWork;

    async fn begin(&self) -> Result<Self::UnitOfWork, AssignmentStoreError> {
        let mut conn = self.pool.get_owned().await.map_err(map_pool_error)?;
        AnsiTransactionManager::begin_transaction(&mut *conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(DieselUnitOfWork {
            conn,
            finished: false,
        })
    }

    async fn find_route(
        &self,
        route_id: &RouteId,
        school_id: &SchoolId,
    ) -> Result<Option<Route>, AssignmentStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<RouteRow> = routes::table
            .filter(routes::id.eq(route_id.as_uuid()))
            .filter(routes::school_id.eq(school_id.as_uuid()))
            .filter(routes::deleted_at.is_null())
            .select(RouteRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_route).transpose()
    }

    async fn route_rows(
        &self,
        route_id: &RouteId,
        driver: Option<&DriverId>,
    ) -> Result<Vec<AssignmentViewRow>, AssignmentStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut query = route_assignments::table
            .inner_join(students::table)
            .inner_join(drivers::table.left_join(vehicles::table))
            .filter(route_assignments::route_id.eq(*route_id.as_uuid()))
            .filter(route_assignments::deleted_at.is_null())
            .select((
                route_assignments::route_id,
                route_assignments::student_order,
                drivers::id,
                drivers::username,
                drivers::first_name,
                drivers::last_name,
                vehicles::vehicle_name.nullable(),
                vehicles::vehicle_number.nullable(),
                students::id,
                students::first_name,
                students::last_name,
                students::pickup_point,
            ))
            .order_by((
                route_assignments::student_order.desc(),
                route_assignments::created_at.asc(),
            ))
            .into_boxed();
        if let Some(driver_id) = driver {
            query = query.filter(route_assignments::driver_id.eq(*driver_id.as_uuid()));
        }

        let records: Vec<AssignmentViewRecord> =
            query.load(&mut conn).await.map_err(map_diesel_error)?;
        records.into_iter().map(record_to_view_row).collect()
    }

    async fn list_routes(
        &self,
        school_id: &SchoolId,
    ) -> Result<Vec<RouteSummary>, AssignmentStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<RouteRow> = routes::table
            .filter(routes::school_id.eq(school_id.as_uuid()))
            .filter(routes::deleted_at.is_null())
            .select(RouteRow::as_select())
            .order_by(routes::created_at.desc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_summary).collect()
    }

    async fn routes_for_driver(
        &self,
        driver_id: &DriverId,
    ) -> Result<Vec<RouteSummary>, AssignmentStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<RouteRow> = driver_route_claims::table
            .inner_join(routes::table)
            .filter(driver_route_claims::driver_id.eq(driver_id.as_uuid()))
            .filter(driver_route_claims::deleted_at.is_null())
            .filter(routes::deleted_at.is_null())
            .select(RouteRow::as_select())
            .order_by(routes::created_at.desc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_summary).collect()
    }
}
