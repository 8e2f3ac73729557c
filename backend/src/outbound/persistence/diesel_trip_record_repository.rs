//! PostgreSQL-backed `TripRecordRepository` implementation using Diesel ORM.
//!
//! Every call is one statement on a pooled connection. The per-day rule is
//! held by `trip_records_student_day_idx`; a second insert for the same
//! student and day comes back as a unique violation on that index.

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;
use uuid::Uuid;

use crate::domain::identity::Username;
use crate::domain::ids::{DriverId, RouteId, SchoolId, StudentId, TripRecordId, UserId};
use crate::domain::ports::{AssignmentStoreError, TripRecordRepository, TripRecordRepositoryError};
use crate::domain::routes::{AuditStamp, StudentProfile};
use crate::domain::trips::{RouteBinding, TripEntry, TripRecord, TripStatus};

use super::diesel_helpers::{
    ExclusivityIndex, map_diesel_error, map_pool_error, violated_exclusivity_index,
};
use super::models::{NewTripRecordRow, TripRecordRow, TripStatusUpdate};
use super::pool::DbPool;
use super::schema::{route_assignments, routes, students, trip_records};

type StudentColumns = (String, String, Option<String>, Option<Uuid>);

/// Diesel-backed implementation of the `TripRecordRepository` port.
#[derive(Clone)]
pub struct DieselTripRecordRepository {
    pool: DbPool,
}

impl DieselTripRecordRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_entries(
        &self,
        filter: EntryFilter,
    ) -> Result<Vec<TripEntry>, TripRecordRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| repository_error(map_pool_error(error)))?;
        let mut query = trip_records::table
            .inner_join(students::table)
            .select((
                TripRecordRow::as_select(),
                (
                    students::first_name,
                    students::last_name,
                    students::pickup_point,
                    students::parent_id,
                ),
            ))
            .into_boxed();
        query = match filter {
            EntryFilter::Trip(trip_id) => query.filter(trip_records::id.eq(trip_id)),
            EntryFilter::Driver(driver_id) => query
                .filter(trip_records::driver_id.eq(driver_id))
                .order_by(trip_records::created_at.desc()),
            EntryFilter::Parent(parent_id, day) => {
                let query = query
                    .filter(students::parent_id.eq(parent_id))
                    .order_by(trip_records::created_at.asc());
                match day {
                    Some(day) => query.filter(trip_records::service_date.eq(day)),
                    None => query,
                }
            }
        };

        let rows: Vec<(TripRecordRow, StudentColumns)> = query
            .load(&mut conn)
            .await
            .map_err(|error| repository_error(map_diesel_error(error)))?;
        rows.into_iter().map(row_to_entry).collect()
    }
}

enum EntryFilter {
    Trip(Uuid),
    Driver(Uuid),
    Parent(Uuid, Option<NaiveDate>),
}

#[async_trait]
impl TripRecordRepository for DieselTripRecordRepository {
    async fn active_binding(
        &self,
        driver_id: &DriverId,
        student_id: &StudentId,
    ) -> Result<Option<RouteBinding>, TripRecordRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| repository_error(map_pool_error(error)))?;
        let binding: Option<(Uuid, Uuid)> = route_assignments::table
            .inner_join(routes::table)
            .filter(route_assignments::driver_id.eq(driver_id.as_uuid()))
            .filter(route_assignments::student_id.eq(student_id.as_uuid()))
            .filter(route_assignments::deleted_at.is_null())
            .filter(routes::deleted_at.is_null())
            .select((route_assignments::route_id, route_assignments::school_id))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|error| repository_error(map_diesel_error(error)))?;
        Ok(binding.map(|(route_id, school_id)| RouteBinding {
            route_id: RouteId::from_uuid(route_id),
            school_id: SchoolId::from_uuid(school_id),
        }))
    }

    async fn insert(&self, record: &TripRecord) -> Result<(), TripRecordRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| repository_error(map_pool_error(error)))?;
        let row = NewTripRecordRow {
            id: *record.id.as_uuid(),
            school_id: *record.school_id.as_uuid(),
            route_id: *record.route_id.as_uuid(),
            driver_id: *record.driver_id.as_uuid(),
            student_id: *record.student_id.as_uuid(),
            service_date: record.service_date,
            status: record.status.as_str(),
            created_at: record.created.at,
            created_by: record.created.by.as_str(),
        };
        diesel::insert_into(trip_records::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(|error| match violated_exclusivity_index(&error) {
                Some(ExclusivityIndex::StudentTripDay) => {
                    TripRecordRepositoryError::duplicate_record(record.student_id)
                }
                _ => repository_error(map_diesel_error(error)),
            })?;
        debug!(trip_id = %record.id, "trip record inserted");
        Ok(())
    }

    async fn find(
        &self,
        trip_id: &TripRecordId,
    ) -> Result<Option<TripEntry>, TripRecordRepositoryError> {
        let entries = self.load_entries(EntryFilter::Trip(*trip_id.as_uuid())).await?;
        Ok(entries.into_iter().next())
    }

    async fn update_status(
        &self,
        trip_id: &TripRecordId,
        driver_id: &DriverId,
        status: TripStatus,
        updated: &AuditStamp,
    ) -> Result<bool, TripRecordRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| repository_error(map_pool_error(error)))?;
        let changed = diesel::update(
            trip_records::table
                .filter(trip_records::id.eq(trip_id.as_uuid()))
                .filter(trip_records::driver_id.eq(driver_id.as_uuid())),
        )
        .set(&TripStatusUpdate {
            status: status.as_str(),
            updated_at: updated.at,
            updated_by: updated.by.as_str(),
        })
        .execute(&mut conn)
        .await
        .map_err(|error| repository_error(map_diesel_error(error)))?;
        Ok(changed > 0)
    }

    async fn for_driver(
        &self,
        driver_id: &DriverId,
    ) -> Result<Vec<TripEntry>, TripRecordRepositoryError> {
        self.load_entries(EntryFilter::Driver(*driver_id.as_uuid()))
            .await
    }

    async fn for_parent(
        &self,
        parent_id: &UserId,
        service_date: Option<NaiveDate>,
    ) -> Result<Vec<TripEntry>, TripRecordRepositoryError> {
        self.load_entries(EntryFilter::Parent(*parent_id.as_uuid(), service_date))
            .await
    }
}

/// Narrow a shared store error onto this port's error.
fn repository_error(error: AssignmentStoreError) -> TripRecordRepositoryError {
    match error {
        AssignmentStoreError::Connection { message } => {
            TripRecordRepositoryError::connection(message)
        }
        other => TripRecordRepositoryError::query(other.to_string()),
    }
}

fn corrupt(field: &str, error: impl std::fmt::Display) -> TripRecordRepositoryError {
    TripRecordRepositoryError::query(format!("invalid {field} in database: {error}"))
}

fn username(field: &str, raw: String) -> Result<Username, TripRecordRepositoryError> {
    Username::new(raw).map_err(|error| corrupt(field, error))
}

fn row_to_entry(
    (row, (first_name, last_name, pickup_point, parent_id)): (TripRecordRow, StudentColumns),
) -> Result<TripEntry, TripRecordRepositoryError> {
    let updated = match (row.updated_at, row.updated_by) {
        (Some(at), Some(by)) => Some(AuditStamp::new(at, username("updated_by", by)?)),
        _ => None,
    };
    let record = TripRecord {
        id: TripRecordId::from_uuid(row.id),
        school_id: SchoolId::from_uuid(row.school_id),
        route_id: RouteId::from_uuid(row.route_id),
        driver_id: DriverId::from_uuid(row.driver_id),
        student_id: StudentId::from_uuid(row.student_id),
        service_date: row.service_date,
        status: row
            .status
            .parse()
            .map_err(|error| corrupt("trip status", error))?,
        created: AuditStamp::new(row.created_at, username("created_by", row.created_by)?),
        updated,
    };
    Ok(TripEntry {
        student: StudentProfile {
            id: record.student_id,
            first_name,
            last_name,
            pickup_point,
        },
        parent_id: parent_id.map(UserId::from_uuid),
        record,
    })
}
