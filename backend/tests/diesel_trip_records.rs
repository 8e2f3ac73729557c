//! Integration tests for `DieselTripRecordRepository` against embedded
//! PostgreSQL.
//!
//! Routes are built through the assignment engine so trip records are
//! checked against real bindings, and the one-record-per-day rule is held by
//! the unique index rather than an in-memory double.

use std::sync::Arc;

use chrono::NaiveDate;
use pg_embedded_setup_unpriv::TestCluster;
use rstest::{fixture, rstest};
use shuttle_backend::domain::ports::{
    AddRouteRequest, DeleteRouteRequest, RecordTripRequest, TripRecordRepository, TripViewer,
    UpdateTripStatusRequest,
};
use shuttle_backend::domain::{
    AssignmentBlock, DriverId, RouteAssignmentService, RouteId, RouteName, StudentId,
    StudentPlacement, TripStatus, TripStatusError, TripStatusService, UserId, Username,
};
use shuttle_backend::outbound::persistence::{
    DbPool, DieselAssignmentStore, DieselTripRecordRepository, PoolConfig,
};
use shuttle_backend::test_support::SchoolDayClock;
use tokio::runtime::Runtime;
use uuid::Uuid;

mod support;

use support::pg_embed::test_cluster;
use support::{
    SchoolDirectory, handle_cluster_setup_failure, link_parent, migrate_schema, reset_database,
    seed_school,
};

const TEST_DB: &str = "diesel_trip_records_test";

struct TestContext {
    runtime: Runtime,
    _cluster: TestCluster,
    database_url: String,
    routes: RouteAssignmentService<DieselAssignmentStore>,
    repository: Arc<DieselTripRecordRepository>,
    trips: TripStatusService<DieselTripRecordRepository>,
    clock: Arc<SchoolDayClock>,
    school: SchoolDirectory,
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = test_cluster()?;
    reset_database(&cluster, TEST_DB)?;
    let database_url = cluster.connection().database_url(TEST_DB);
    migrate_schema(&database_url)?;
    let school = seed_school(&database_url, 2, 3)?;

    let config = PoolConfig::new(&database_url)
        .with_max_size(4)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(async { DbPool::new(config).await })
        .map_err(|err| err.to_string())?;
    let clock = Arc::new(SchoolDayClock::morning());
    let routes = RouteAssignmentService::new(
        Arc::new(DieselAssignmentStore::new(pool.clone())),
        clock.clone(),
    );
    let repository = Arc::new(DieselTripRecordRepository::new(pool));
    let trips = TripStatusService::new(repository.clone(), clock.clone());

    Ok(TestContext {
        runtime,
        _cluster: cluster,
        database_url,
        routes,
        repository,
        trips,
        clock,
        school,
    })
}

#[fixture]
fn store_context() -> Option<TestContext> {
    match setup_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

fn actor(name: &str) -> Username {
    Username::new(name).expect("valid username")
}

fn driver(ctx: &TestContext, index: usize) -> DriverId {
    *ctx.school.drivers.get(index).expect("seeded driver")
}

fn student(ctx: &TestContext, index: usize) -> StudentId {
    *ctx.school.students.get(index).expect("seeded student")
}

/// Route "Morning loop": driver 0 carries students 0 and 1, driver 1
/// carries student 2.
fn add_route(ctx: &TestContext) -> RouteId {
    let placement = |index: usize| {
        StudentPlacement::parse(student(ctx, index), "1").expect("order")
    };
    ctx.runtime
        .block_on(ctx.routes.add(&AddRouteRequest {
            school_id: ctx.school.school_id,
            name: RouteName::new("Morning loop").expect("route name"),
            description: String::new(),
            assignments: vec![
                AssignmentBlock {
                    driver_id: driver(ctx, 0),
                    students: vec![placement(0), placement(1)],
                },
                AssignmentBlock {
                    driver_id: driver(ctx, 1),
                    students: vec![placement(2)],
                },
            ],
            actor: actor("office.admin"),
        }))
        .expect("route created")
}

fn record_request(
    ctx: &TestContext,
    driver_index: usize,
    student_index: usize,
) -> RecordTripRequest {
    RecordTripRequest {
        driver_id: driver(ctx, driver_index),
        school_id: ctx.school.school_id,
        student_id: student(ctx, student_index),
        status: None,
        actor: actor("driver.0"),
    }
}

#[rstest]
fn records_bind_to_the_active_route(store_context: Option<TestContext>) {
    let Some(ctx) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: records_bind_to_the_active_route skipped");
        return;
    };
    let route_id = add_route(&ctx);

    let trip_id = ctx
        .runtime
        .block_on(ctx.trips.record(&record_request(&ctx, 0, 0)))
        .expect("recorded");
    let entry = ctx
        .runtime
        .block_on(ctx.repository.find(&trip_id))
        .expect("query")
        .expect("stored record");

    assert_eq!(entry.record.route_id, route_id);
    assert_eq!(entry.record.status, TripStatus::WaitingToBeTakenToSchool);
    assert_eq!(
        entry.record.service_date,
        NaiveDate::from_ymd_opt(2026, 3, 2).expect("date")
    );
    assert_eq!(entry.student.first_name, "Student0");
    assert!(entry.parent_id.is_none());
}

#[rstest]
fn the_day_index_rejects_a_second_record(store_context: Option<TestContext>) {
    let Some(ctx) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: the_day_index_rejects_a_second_record skipped");
        return;
    };
    add_route(&ctx);
    let request = record_request(&ctx, 0, 1);
    ctx.runtime
        .block_on(ctx.trips.record(&request))
        .expect("first record");

    let err = ctx
        .runtime
        .block_on(ctx.trips.record(&request))
        .expect_err("second record");

    assert_eq!(
        err,
        TripStatusError::AlreadyRecorded {
            student_id: student(&ctx, 1),
            service_date: NaiveDate::from_ymd_opt(2026, 3, 2).expect("date"),
        }
    );
    ctx.clock.advance_minutes(24 * 60);
    ctx.runtime
        .block_on(ctx.trips.record(&request))
        .expect("next day is a fresh record");
}

#[rstest]
fn other_drivers_students_and_deleted_routes_are_refused(store_context: Option<TestContext>) {
    let Some(ctx) = store_context else {
        eprintln!(
            "SKIP-TEST-CLUSTER: other_drivers_students_and_deleted_routes_are_refused skipped"
        );
        return;
    };
    let route_id = add_route(&ctx);

    let err = ctx
        .runtime
        .block_on(ctx.trips.record(&record_request(&ctx, 0, 2)))
        .expect_err("student rides with driver 1");
    assert_eq!(
        err,
        TripStatusError::StudentNotOnRoute {
            student_id: student(&ctx, 2)
        }
    );

    ctx.runtime
        .block_on(ctx.routes.delete(&DeleteRouteRequest {
            route_id,
            school_id: ctx.school.school_id,
            actor: actor("office.admin"),
        }))
        .expect("route deleted");
    let err = ctx
        .runtime
        .block_on(ctx.trips.record(&record_request(&ctx, 0, 0)))
        .expect_err("route gone");
    assert_eq!(err.code(), "student_not_on_route");
}

#[rstest]
fn only_the_owning_driver_moves_a_record(store_context: Option<TestContext>) {
    let Some(ctx) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: only_the_owning_driver_moves_a_record skipped");
        return;
    };
    add_route(&ctx);
    let trip_id = ctx
        .runtime
        .block_on(ctx.trips.record(&record_request(&ctx, 0, 0)))
        .expect("recorded");
    let update = |driver_id: DriverId, status: TripStatus| UpdateTripStatusRequest {
        trip_id,
        driver_id,
        status,
        actor: actor("driver.0"),
    };

    let err = ctx
        .runtime
        .block_on(ctx.trips.update_status(&update(driver(&ctx, 1), TripStatus::AtHome)))
        .expect_err("not the owner");
    assert_eq!(err, TripStatusError::TripNotFound { trip_id });

    ctx.clock.advance_minutes(20);
    ctx.runtime
        .block_on(ctx.trips.update_status(&update(driver(&ctx, 0), TripStatus::AtSchool)))
        .expect("owner updates");
    let entry = ctx
        .runtime
        .block_on(ctx.trips.trip(trip_id, TripViewer::Driver(driver(&ctx, 0))))
        .expect("visible to owner");
    assert_eq!(entry.record.status, TripStatus::AtSchool);
    let updated = entry.record.updated.expect("update stamp");
    assert_eq!(
        updated.at - entry.record.created.at,
        chrono::TimeDelta::minutes(20)
    );
}

#[rstest]
fn guardians_read_their_childrens_records(store_context: Option<TestContext>) {
    let Some(ctx) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: guardians_read_their_childrens_records skipped");
        return;
    };
    add_route(&ctx);
    let parent = Uuid::new_v4();
    link_parent(&ctx.database_url, student(&ctx, 0), parent).expect("parent linked");
    let parent_id = UserId::from_uuid(parent);
    let request = record_request(&ctx, 0, 0);
    ctx.runtime
        .block_on(ctx.trips.record(&request))
        .expect("yesterday");
    ctx.clock.advance_minutes(24 * 60);
    let today_id = ctx
        .runtime
        .block_on(ctx.trips.record(&request))
        .expect("today");
    ctx.runtime
        .block_on(ctx.trips.record(&record_request(&ctx, 0, 1)))
        .expect("another family's child");

    let today = ctx
        .runtime
        .block_on(ctx.trips.parent_today(&parent_id))
        .expect("today");
    let history = ctx
        .runtime
        .block_on(ctx.trips.parent_history(&parent_id))
        .expect("history");

    assert_eq!(
        today.iter().map(|entry| entry.record.id).collect::<Vec<_>>(),
        vec![today_id]
    );
    assert_eq!(history.len(), 2);
    assert!(history[0].record.service_date < history[1].record.service_date);
    assert!(
        ctx.runtime
            .block_on(ctx.trips.trip(today_id, TripViewer::Parent(UserId::random())))
            .is_err(),
        "strangers cannot read the record"
    );
}
