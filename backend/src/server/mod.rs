//! Server construction and middleware wiring.

mod config;

pub use config::ServerConfig;

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use mockable::{Clock, DefaultClock};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use shuttle_backend::Trace;
use shuttle_backend::doc::ApiDoc;
use shuttle_backend::domain::ports::{
    AssignmentStore, RouteAssignmentCommand, RouteAssignmentQuery, TripRecordRepository,
    TripStatusCommand, TripStatusQuery,
};
use shuttle_backend::domain::{LocationRelay, RouteAssignmentService, TripStatusService};
use shuttle_backend::inbound::http::configure_api;
use shuttle_backend::inbound::http::health::{HealthState, live, ready};
use shuttle_backend::inbound::http::state::{HttpState, HttpStatePorts};
use shuttle_backend::inbound::ws;
use shuttle_backend::inbound::ws::state::{Heartbeat, WsState};
use shuttle_backend::outbound::persistence::{DieselAssignmentStore, DieselTripRecordRepository};

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    ws_state: web::Data<WsState>,
    swagger: bool,
}

impl AppDependencies {
    /// Wire one engine instance behind both the HTTP and WebSocket adapters.
    fn from_store<S, T>(
        health_state: web::Data<HealthState>,
        store: Arc<S>,
        trip_records: Arc<T>,
        clock: Arc<dyn Clock>,
        heartbeat: Heartbeat,
        swagger: bool,
    ) -> Self
    where
        S: AssignmentStore + 'static,
        T: TripRecordRepository + 'static,
    {
        let service = Arc::new(RouteAssignmentService::new(store, clock.clone()));
        let command: Arc<dyn RouteAssignmentCommand> = service.clone();
        let query: Arc<dyn RouteAssignmentQuery> = service;
        let trips = Arc::new(TripStatusService::new(trip_records, clock.clone()));
        let trips_command: Arc<dyn TripStatusCommand> = trips.clone();
        let trips_query: Arc<dyn TripStatusQuery> = trips;
        let relay = Arc::new(LocationRelay::default());
        let ports = HttpStatePorts {
            routes: command,
            routes_query: query.clone(),
            trips: trips_command,
            trips_query,
        };
        Self {
            health_state,
            http_state: web::Data::new(HttpState::new(ports)),
            ws_state: web::Data::new(WsState::new(relay, query, clock).with_heartbeat(heartbeat)),
            swagger,
        }
    }
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        ws_state,
        swagger,
    } = deps;

    let api = web::scope("/api/v1").configure(configure_api);

    let mut app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(ws_state)
        .wrap(Trace)
        .service(api)
        .service(ws::trip_socket)
        .service(ready)
        .service(live);

    if swagger {
        app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    app
}

/// Construct an Actix HTTP server over the Diesel adapters.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let ServerConfig {
        bind_addr,
        db_pool,
        heartbeat,
        swagger,
    } = config;
    let deps = AppDependencies::from_store(
        health_state.clone(),
        Arc::new(DieselAssignmentStore::new(db_pool.clone())),
        Arc::new(DieselTripRecordRepository::new(db_pool)),
        Arc::new(DefaultClock),
        heartbeat,
        swagger,
    );

    let server = HttpServer::new(move || build_app(deps.clone()))
        .bind(bind_addr)?
        .run();

    health_state.mark_ready();
    Ok(server)
}

#[cfg(test)]
mod tests {
    //! Wiring checks over the in-memory store.

    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::{Value, json};
    use shuttle_backend::domain::TRACE_ID_HEADER;
    use shuttle_backend::domain::ids::{DriverId, SchoolId, StudentId};
    use shuttle_backend::inbound::http::identity::{
        SCHOOL_ID_HEADER, USER_ID_HEADER, USER_ROLE_HEADER, USERNAME_HEADER,
    };
    use shuttle_backend::test_support::{
        InMemoryAssignmentStore, InMemoryTripRecordRepository, SchoolDayClock, driver_profile,
        student_profile,
    };
    use uuid::Uuid;

    const ADMIN: &str = "99999999-9999-4999-8999-999999999999";

    fn deps(store: Arc<InMemoryAssignmentStore>, swagger: bool) -> AppDependencies {
        let health = web::Data::new(HealthState::new());
        health.mark_ready();
        let trips = Arc::new(InMemoryTripRecordRepository::new((*store).clone()));
        AppDependencies::from_store(
            health,
            store,
            trips,
            Arc::new(SchoolDayClock::morning()),
            Heartbeat::default(),
            swagger,
        )
    }

    #[rstest]
    #[actix_web::test]
    async fn routes_flow_through_the_engine() {
        let school = SchoolId::from_uuid(Uuid::new_v4());
        let driver = DriverId::from_uuid(Uuid::new_v4());
        let student = StudentId::from_uuid(Uuid::new_v4());
        let store = Arc::new(InMemoryAssignmentStore::new());
        store.register_driver(school, driver_profile(driver, "dana"));
        store.register_student(school, student_profile(student, "Sam"));
        let app = actix_test::init_service(build_app(deps(store, false))).await;

        let create = actix_test::TestRequest::post()
            .uri("/api/v1/school/routes")
            .insert_header((USER_ID_HEADER, ADMIN))
            .insert_header((USER_ROLE_HEADER, "AS"))
            .insert_header((SCHOOL_ID_HEADER, school.to_string()))
            .insert_header((USERNAME_HEADER, "office"))
            .set_json(json!({
                "routeName": "Morning loop",
                "assignments": [{
                    "driverId": driver.to_string(),
                    "students": [{ "studentId": student.to_string(), "studentOrder": "1" }]
                }]
            }))
            .to_request();
        let response = actix_test::call_service(&app, create).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().contains_key(TRACE_ID_HEADER));
        let body: Value = actix_test::read_body_json(response).await;
        let route_id = body
            .get("routeId")
            .and_then(Value::as_str)
            .expect("route id");

        let read = actix_test::TestRequest::get()
            .uri(&format!("/api/v1/school/routes/{route_id}"))
            .insert_header((USER_ID_HEADER, ADMIN))
            .insert_header((USER_ROLE_HEADER, "AS"))
            .insert_header((SCHOOL_ID_HEADER, school.to_string()))
            .insert_header((USERNAME_HEADER, "office"))
            .to_request();
        let view: Value = actix_test::call_and_read_body_json(&app, read).await;

        assert_eq!(view.get("routeName"), Some(&json!("Morning loop")));
        assert_eq!(
            view.pointer("/drivers/0/students/0/studentOrder"),
            Some(&json!("1"))
        );
    }

    #[rstest]
    #[actix_web::test]
    async fn drivers_record_trips_on_routes_built_over_http() {
        let school = SchoolId::from_uuid(Uuid::new_v4());
        let driver = DriverId::from_uuid(Uuid::new_v4());
        let student = StudentId::from_uuid(Uuid::new_v4());
        let store = Arc::new(InMemoryAssignmentStore::new());
        store.register_driver(school, driver_profile(driver, "dana"));
        store.register_student(school, student_profile(student, "Sam"));
        let app = actix_test::init_service(build_app(deps(store, false))).await;

        let create = actix_test::TestRequest::post()
            .uri("/api/v1/school/routes")
            .insert_header((USER_ID_HEADER, ADMIN))
            .insert_header((USER_ROLE_HEADER, "AS"))
            .insert_header((SCHOOL_ID_HEADER, school.to_string()))
            .insert_header((USERNAME_HEADER, "office"))
            .set_json(json!({
                "routeName": "Morning loop",
                "assignments": [{
                    "driverId": driver.to_string(),
                    "students": [{ "studentId": student.to_string(), "studentOrder": "1" }]
                }]
            }))
            .to_request();
        assert_eq!(
            actix_test::call_service(&app, create).await.status(),
            StatusCode::CREATED
        );

        let as_driver = |req: actix_test::TestRequest| {
            req.insert_header((USER_ID_HEADER, driver.to_string()))
                .insert_header((USER_ROLE_HEADER, "D"))
                .insert_header((SCHOOL_ID_HEADER, school.to_string()))
                .insert_header((USERNAME_HEADER, "dana"))
        };
        let record = as_driver(actix_test::TestRequest::post().uri("/api/v1/driver/trips"))
            .set_json(json!({ "studentId": student.to_string() }))
            .to_request();
        let response = actix_test::call_service(&app, record).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let again = as_driver(actix_test::TestRequest::post().uri("/api/v1/driver/trips"))
            .set_json(json!({ "studentId": student.to_string() }))
            .to_request();
        assert_eq!(
            actix_test::call_service(&app, again).await.status(),
            StatusCode::CONFLICT
        );

        let list = as_driver(actix_test::TestRequest::get().uri("/api/v1/driver/trips")).to_request();
        let trips: Value = actix_test::call_and_read_body_json(&app, list).await;
        assert_eq!(
            trips.pointer("/0/status"),
            Some(&json!("waiting_to_be_taken_to_school"))
        );
    }

    #[rstest]
    #[case(true, StatusCode::OK)]
    #[case(false, StatusCode::NOT_FOUND)]
    #[actix_web::test]
    async fn swagger_document_follows_settings(#[case] swagger: bool, #[case] expected: StatusCode) {
        let store = Arc::new(InMemoryAssignmentStore::new());
        let app = actix_test::init_service(build_app(deps(store, swagger))).await;

        let request = actix_test::TestRequest::get()
            .uri("/api-docs/openapi.json")
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), expected);
    }

    #[rstest]
    #[actix_web::test]
    async fn readiness_probe_is_mounted() {
        let store = Arc::new(InMemoryAssignmentStore::new());
        let app = actix_test::init_service(build_app(deps(store, false))).await;

        let request = actix_test::TestRequest::get().uri("/health/ready").to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::OK);
    }
}
