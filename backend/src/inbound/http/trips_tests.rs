//! Tests for the trip status handlers.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::{Value, json};

use super::*;
use crate::domain::ports::{
    MockRouteAssignmentCommand, MockRouteAssignmentQuery, MockTripStatusCommand,
    MockTripStatusQuery,
};
use crate::domain::routes::{AuditStamp, StudentProfile};
use crate::domain::{
    DriverId, RouteId, SchoolId, StudentId, TripRecord, TripStatus, TripStatusError, Username,
};
use crate::inbound::http::identity::{
    SCHOOL_ID_HEADER, USER_ID_HEADER, USER_ROLE_HEADER, USERNAME_HEADER,
};
use crate::inbound::http::state::HttpStatePorts;

const SCHOOL: &str = "6f1c2f7e-8b0a-4d3c-9a55-1f2e3d4c5b6a";
const DRIVER: &str = "11111111-1111-4111-8111-111111111111";
const STUDENT: &str = "22222222-2222-4222-8222-222222222222";
const PARENT: &str = "33333333-3333-4333-8333-333333333333";
const ROUTE: &str = "44444444-4444-4444-8444-444444444444";
const TRIP: &str = "55555555-5555-4555-8555-555555555555";

fn driver_id() -> DriverId {
    DriverId::new(DRIVER).expect("driver id")
}

fn trip_id() -> TripRecordId {
    TripRecordId::new(TRIP).expect("trip id")
}

fn test_app(
    command: MockTripStatusCommand,
    query: MockTripStatusQuery,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let state = HttpState::new(HttpStatePorts {
        routes: Arc::new(MockRouteAssignmentCommand::new()),
        routes_query: Arc::new(MockRouteAssignmentQuery::new()),
        trips: Arc::new(command),
        trips_query: Arc::new(query),
    });
    App::new()
        .app_data(web::Data::new(state))
        .service(web::scope("/api/v1").configure(crate::inbound::http::configure_api))
}

fn as_role(
    req: actix_test::TestRequest,
    user: &'static str,
    role: &'static str,
) -> actix_test::TestRequest {
    req.insert_header((USER_ID_HEADER, user))
        .insert_header((USER_ROLE_HEADER, role))
        .insert_header((SCHOOL_ID_HEADER, SCHOOL))
        .insert_header((USERNAME_HEADER, "dina"))
}

fn as_driver(req: actix_test::TestRequest) -> actix_test::TestRequest {
    as_role(req, DRIVER, "D")
}

fn as_parent(req: actix_test::TestRequest) -> actix_test::TestRequest {
    as_role(req, PARENT, "P")
}

fn entry() -> TripEntry {
    let at = Utc
        .with_ymd_and_hms(2026, 3, 2, 7, 0, 0)
        .single()
        .expect("timestamp");
    TripEntry {
        record: TripRecord {
            id: trip_id(),
            school_id: SchoolId::new(SCHOOL).expect("school id"),
            route_id: RouteId::new(ROUTE).expect("route id"),
            driver_id: driver_id(),
            student_id: StudentId::new(STUDENT).expect("student id"),
            service_date: NaiveDate::from_ymd_opt(2026, 3, 2).expect("date"),
            status: TripStatus::GoingToSchool,
            created: AuditStamp::new(at, Username::new("dina").expect("username")),
            updated: None,
        },
        student: StudentProfile {
            id: StudentId::new(STUDENT).expect("student id"),
            first_name: "Sam".to_owned(),
            last_name: "Pupil".to_owned(),
            pickup_point: Some("Gate 2".to_owned()),
        },
        parent_id: Some(UserId::new(PARENT).expect("parent id")),
    }
}

#[actix_web::test]
async fn drivers_record_trips_for_their_students() {
    let mut command = MockTripStatusCommand::new();
    command
        .expect_record_trip()
        .withf(|request| {
            request.driver_id == driver_id()
                && request.student_id.to_string() == STUDENT
                && request.status.is_none()
                && request.actor.as_str() == "dina"
        })
        .times(1)
        .returning(|_| Ok(trip_id()));
    let app = actix_test::init_service(test_app(command, MockTripStatusQuery::new())).await;

    let req = as_driver(actix_test::TestRequest::post().uri("/api/v1/driver/trips"))
        .set_json(json!({ "studentId": STUDENT }))
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body.get("tripId").and_then(Value::as_str), Some(TRIP));
}

#[actix_web::test]
async fn a_second_record_today_is_a_conflict() {
    let mut command = MockTripStatusCommand::new();
    command.expect_record_trip().returning(|request| {
        Err(TripStatusError::AlreadyRecorded {
            student_id: request.student_id,
            service_date: NaiveDate::from_ymd_opt(2026, 3, 2).expect("date"),
        }
        .into())
    });
    let app = actix_test::init_service(test_app(command, MockTripStatusQuery::new())).await;

    let req = as_driver(actix_test::TestRequest::post().uri("/api/v1/driver/trips"))
        .set_json(json!({ "studentId": STUDENT, "status": "going_to_school" }))
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(
        body.pointer("/details/code").and_then(Value::as_str),
        Some("trip_already_recorded")
    );
}

#[actix_web::test]
async fn unknown_statuses_never_reach_the_service() {
    let mut command = MockTripStatusCommand::new();
    command.expect_update_trip_status().never();
    let app = actix_test::init_service(test_app(command, MockTripStatusQuery::new())).await;

    let req = as_driver(actix_test::TestRequest::put().uri(&format!("/api/v1/driver/trips/{TRIP}")))
        .set_json(json!({ "status": "teleported" }))
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(
        body.pointer("/details/field").and_then(Value::as_str),
        Some("status")
    );
}

#[actix_web::test]
async fn status_updates_return_no_content() {
    let mut command = MockTripStatusCommand::new();
    command
        .expect_update_trip_status()
        .withf(|request| {
            request.trip_id == trip_id()
                && request.driver_id == driver_id()
                && request.status == TripStatus::AtSchool
        })
        .times(1)
        .returning(|_| Ok(()));
    let app = actix_test::init_service(test_app(command, MockTripStatusQuery::new())).await;

    let req = as_driver(actix_test::TestRequest::put().uri(&format!("/api/v1/driver/trips/{TRIP}")))
        .set_json(json!({ "status": "at_school" }))
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn drivers_read_their_trip_list() {
    let mut query = MockTripStatusQuery::new();
    query
        .expect_driver_trips()
        .withf(|id| *id == driver_id())
        .returning(|_| Ok(vec![entry()]));
    let app = actix_test::init_service(test_app(MockTripStatusCommand::new(), query)).await;

    let req = as_driver(actix_test::TestRequest::get().uri("/api/v1/driver/trips")).to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body.pointer("/0/status").and_then(Value::as_str), Some("going_to_school"));
    assert_eq!(body.pointer("/0/serviceDate").and_then(Value::as_str), Some("2026-03-02"));
    assert_eq!(body.pointer("/0/firstName").and_then(Value::as_str), Some("Sam"));
    assert!(body.pointer("/0/updatedAt").is_none());
}

#[actix_web::test]
async fn parents_read_one_trip_as_themselves() {
    let mut query = MockTripStatusQuery::new();
    query
        .expect_get_trip()
        .withf(|id, viewer| {
            *id == trip_id()
                && *viewer == TripViewer::Parent(UserId::new(PARENT).expect("parent id"))
        })
        .returning(|_, _| Ok(entry()));
    let app = actix_test::init_service(test_app(MockTripStatusCommand::new(), query)).await;

    let req = as_parent(actix_test::TestRequest::get().uri(&format!("/api/v1/parent/trips/{TRIP}")))
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body.get("tripId").and_then(Value::as_str), Some(TRIP));
}

#[actix_web::test]
async fn parents_today_is_not_mistaken_for_a_trip_id() {
    let mut query = MockTripStatusQuery::new();
    query.expect_get_trip().never();
    query
        .expect_parent_trips_today()
        .times(1)
        .returning(|_| Ok(Vec::new()));
    let app = actix_test::init_service(test_app(MockTripStatusCommand::new(), query)).await;

    let req = as_parent(actix_test::TestRequest::get().uri("/api/v1/parent/trips/today"))
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body, json!([]));
}

#[actix_web::test]
async fn hidden_trips_read_as_not_found() {
    let mut query = MockTripStatusQuery::new();
    query.expect_get_trip().returning(|trip_id, _| {
        Err(TripStatusError::TripNotFound { trip_id }.into())
    });
    let app = actix_test::init_service(test_app(MockTripStatusCommand::new(), query)).await;

    let req = as_driver(actix_test::TestRequest::get().uri(&format!("/api/v1/driver/trips/{TRIP}")))
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn parents_cannot_write_trips() {
    let mut command = MockTripStatusCommand::new();
    command.expect_record_trip().never();
    let app = actix_test::init_service(test_app(command, MockTripStatusQuery::new())).await;

    let req = as_parent(actix_test::TestRequest::post().uri("/api/v1/driver/trips"))
        .set_json(json!({ "studentId": STUDENT }))
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn drivers_cannot_read_the_parent_feed() {
    let mut query = MockTripStatusQuery::new();
    query.expect_parent_trip_history().never();
    let app = actix_test::init_service(test_app(MockTripStatusCommand::new(), query)).await;

    let req = as_driver(actix_test::TestRequest::get().uri("/api/v1/parent/trips")).to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}
