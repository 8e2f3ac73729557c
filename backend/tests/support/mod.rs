//! Shared helpers for backend integration tests.
//!
//! Integration tests compile as separate crates, so helpers they share live
//! here and each suite pulls them in with `mod support;`.

pub mod cluster_skip;
pub mod pg_embed;

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::MigrationHarness;
use pg_embedded_setup_unpriv::TestCluster;
use postgres::{Client, NoTls};
use shuttle_backend::domain::ids::{DriverId, SchoolId, StudentId};
use shuttle_backend::outbound::persistence::MIGRATIONS;
use uuid::Uuid;

pub use cluster_skip::handle_cluster_setup_failure;

/// Render a `postgres` error with its SQLSTATE, detail, and hint.
///
/// `Display` on `postgres::Error` often collapses to a bare `db error`.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };
    let mut summary = format!(
        "postgres error {:?}: {}",
        db_error.code(),
        db_error.message()
    );
    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }
    if let Some(hint) = db_error.hint() {
        summary.push_str("; hint: ");
        summary.push_str(hint);
    }
    summary
}

/// Drop and recreate `db_name` on the cluster.
///
/// Runs on a plain `postgres` client because `DROP DATABASE` cannot run inside
/// a transaction.
pub fn reset_database(cluster: &TestCluster, db_name: &str) -> Result<(), String> {
    let admin_url = cluster.connection().database_url("postgres");
    let mut client = Client::connect(&admin_url, NoTls).map_err(|err| format_postgres_error(&err))?;
    client
        .batch_execute(&format!(
            "DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE); CREATE DATABASE \"{db_name}\";"
        ))
        .map_err(|err| format_postgres_error(&err))
}

/// Apply the embedded migrations to the database at `url`.
pub fn migrate_schema(url: &str) -> Result<(), String> {
    let mut conn = PgConnection::establish(url).map_err(|err| format!("connect: {err}"))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| format!("migration: {err}"))?;
    Ok(())
}

/// Directory rows seeded for one school.
#[derive(Debug, Clone)]
pub struct SchoolDirectory {
    pub school_id: SchoolId,
    pub drivers: Vec<DriverId>,
    pub students: Vec<StudentId>,
}

/// Insert a school with `drivers` drivers (each with a vehicle) and
/// `students` students.
pub fn seed_school(url: &str, drivers: usize, students: usize) -> Result<SchoolDirectory, String> {
    let mut client = Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))?;
    let school = Uuid::new_v4();
    client
        .execute(
            "INSERT INTO schools (id, name) VALUES ($1, $2)",
            &[&school, &"Hillside Primary"],
        )
        .map_err(|err| format_postgres_error(&err))?;

    let mut driver_ids = Vec::with_capacity(drivers);
    for index in 0..drivers {
        let vehicle = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let plate = format!("B {index} SHT");
        let username = format!("driver.{index}");
        client
            .execute(
                "INSERT INTO vehicles (id, school_id, vehicle_name, vehicle_number) \
                 VALUES ($1, $2, $3, $4)",
                &[&vehicle, &school, &"Shuttle Van", &plate],
            )
            .map_err(|err| format_postgres_error(&err))?;
        client
            .execute(
                "INSERT INTO drivers (id, school_id, vehicle_id, username, first_name, last_name) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
                &[&driver, &school, &vehicle, &username, &"Dana", &"Driver"],
            )
            .map_err(|err| format_postgres_error(&err))?;
        driver_ids.push(DriverId::from_uuid(driver));
    }

    let mut student_ids = Vec::with_capacity(students);
    for index in 0..students {
        let student = Uuid::new_v4();
        let first_name = format!("Student{index}");
        client
            .execute(
                "INSERT INTO students (id, school_id, first_name, last_name, pickup_point) \
                 VALUES ($1, $2, $3, $4, $5)",
                &[&student, &school, &first_name, &"Pupil", &"North gate"],
            )
            .map_err(|err| format_postgres_error(&err))?;
        student_ids.push(StudentId::from_uuid(student));
    }

    Ok(SchoolDirectory {
        school_id: SchoolId::from_uuid(school),
        drivers: driver_ids,
        students: student_ids,
    })
}

/// Count assignment rows for `route_id`, split into (active, retired).
pub fn assignment_counts(url: &str, route_id: Uuid) -> Result<(i64, i64), String> {
    let mut client = Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))?;
    let row = client
        .query_one(
            "SELECT COUNT(*) FILTER (WHERE deleted_at IS NULL), \
                    COUNT(*) FILTER (WHERE deleted_at IS NOT NULL) \
             FROM route_assignments WHERE route_id = $1",
            &[&route_id],
        )
        .map_err(|err| format_postgres_error(&err))?;
    Ok((row.get(0), row.get(1)))
}

/// Record `parent` as the guardian of `student`.
pub fn link_parent(url: &str, student: StudentId, parent: Uuid) -> Result<(), String> {
    let mut client = Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))?;
    client
        .execute(
            "UPDATE students SET parent_id = $1 WHERE id = $2",
            &[&parent, student.as_uuid()],
        )
        .map_err(|err| format_postgres_error(&err))?;
    Ok(())
}
