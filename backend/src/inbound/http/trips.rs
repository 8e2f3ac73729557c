//! Trip status HTTP handlers.
//!
//! ```text
//! POST /api/v1/driver/trips
//! PUT  /api/v1/driver/trips/{tripId}
//! GET  /api/v1/driver/trips
//! GET  /api/v1/driver/trips/{tripId}
//! GET  /api/v1/parent/trips/today
//! GET  /api/v1/parent/trips
//! GET  /api/v1/parent/trips/{tripId}
//! ```
//!
//! Drivers write and read the records they opened. Guardians read the
//! records of students linked to their account.

use actix_web::{HttpResponse, get, post, put, web};
use tracing::info;

use crate::domain::ports::{RecordTripRequest, TripViewer, UpdateTripStatusRequest};
use crate::domain::{CallerIdentity, Error, Role, TripEntry, TripRecordId, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::identity::{require_driver, require_role};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::trips_dto::{
    ParsedRecordTrip, RecordTripBody, TripBody, TripCreatedBody, TripStatusBody, parse_status,
};
use crate::inbound::http::validation::{FieldName, parse_id};

fn trip_id_from_path(path: web::Path<String>) -> Result<TripRecordId, Error> {
    parse_id(&path.into_inner(), FieldName::new("tripId"))
}

fn require_parent(caller: &CallerIdentity) -> Result<UserId, Error> {
    require_role(caller, &[Role::Parent])?;
    Ok(caller.user_id)
}

fn bodies(entries: Vec<TripEntry>) -> web::Json<Vec<TripBody>> {
    web::Json(entries.into_iter().map(TripBody::from).collect())
}

/// Open today's record for a student on the caller's route.
#[utoipa::path(
    post,
    path = "/api/v1/driver/trips",
    request_body = RecordTripBody,
    responses(
        (status = 201, description = "Trip recorded", body = TripCreatedBody),
        (status = 400, description = "Invalid request or student not on the route", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 409, description = "Already recorded today", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["trips"],
    operation_id = "recordTrip",
    security(("IdentityHeaders" = []))
)]
#[post("/driver/trips")]
pub async fn record_trip(
    state: web::Data<HttpState>,
    caller: CallerIdentity,
    payload: web::Json<RecordTripBody>,
) -> ApiResult<HttpResponse> {
    let driver_id = require_driver(&caller)?;
    let parsed = ParsedRecordTrip::try_from(payload.into_inner())?;

    let trip_id = state
        .trips
        .record_trip(RecordTripRequest {
            driver_id,
            school_id: caller.school_id,
            student_id: parsed.student_id,
            status: parsed.status,
            actor: caller.username,
        })
        .await?;

    info!(%trip_id, %driver_id, "trip recorded over http");
    Ok(HttpResponse::Created().json(TripCreatedBody::from(trip_id)))
}

/// Move one of the caller's records to a new status.
#[utoipa::path(
    put,
    path = "/api/v1/driver/trips/{tripId}",
    params(("tripId" = String, Path, description = "Trip record identifier")),
    request_body = TripStatusBody,
    responses(
        (status = 204, description = "Status updated"),
        (status = 400, description = "Invalid trip id or status", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Trip not found", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["trips"],
    operation_id = "updateTripStatus",
    security(("IdentityHeaders" = []))
)]
#[put("/driver/trips/{trip_id}")]
pub async fn update_trip_status(
    state: web::Data<HttpState>,
    caller: CallerIdentity,
    path: web::Path<String>,
    payload: web::Json<TripStatusBody>,
) -> ApiResult<HttpResponse> {
    let driver_id = require_driver(&caller)?;
    let trip_id = trip_id_from_path(path)?;
    let status = parse_status(&payload.status)?;

    state
        .trips
        .update_trip_status(UpdateTripStatusRequest {
            trip_id,
            driver_id,
            status,
            actor: caller.username,
        })
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// List the records the caller opened, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/driver/trips",
    responses(
        (status = 200, description = "Trip records", body = [TripBody]),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["trips"],
    operation_id = "listDriverTrips",
    security(("IdentityHeaders" = []))
)]
#[get("/driver/trips")]
pub async fn list_driver_trips(
    state: web::Data<HttpState>,
    caller: CallerIdentity,
) -> ApiResult<web::Json<Vec<TripBody>>> {
    let driver_id = require_driver(&caller)?;
    let entries = state.trips_query.driver_trips(driver_id).await?;
    Ok(bodies(entries))
}

/// Fetch one record the caller opened.
#[utoipa::path(
    get,
    path = "/api/v1/driver/trips/{tripId}",
    params(("tripId" = String, Path, description = "Trip record identifier")),
    responses(
        (status = 200, description = "Trip record", body = TripBody),
        (status = 400, description = "Invalid trip id", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Trip not found", body = ErrorSchema)
    ),
    tags = ["trips"],
    operation_id = "getDriverTrip",
    security(("IdentityHeaders" = []))
)]
#[get("/driver/trips/{trip_id}")]
pub async fn get_driver_trip(
    state: web::Data<HttpState>,
    caller: CallerIdentity,
    path: web::Path<String>,
) -> ApiResult<web::Json<TripBody>> {
    let driver_id = require_driver(&caller)?;
    let trip_id = trip_id_from_path(path)?;
    let entry = state
        .trips_query
        .get_trip(trip_id, TripViewer::Driver(driver_id))
        .await?;
    Ok(web::Json(TripBody::from(entry)))
}

/// Today's records for the caller's children.
#[utoipa::path(
    get,
    path = "/api/v1/parent/trips/today",
    responses(
        (status = 200, description = "Today's trip records", body = [TripBody]),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["trips"],
    operation_id = "listParentTripsToday",
    security(("IdentityHeaders" = []))
)]
#[get("/parent/trips/today")]
pub async fn list_parent_trips_today(
    state: web::Data<HttpState>,
    caller: CallerIdentity,
) -> ApiResult<web::Json<Vec<TripBody>>> {
    let parent_id = require_parent(&caller)?;
    let entries = state.trips_query.parent_trips_today(parent_id).await?;
    Ok(bodies(entries))
}

/// Every record for the caller's children, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/parent/trips",
    responses(
        (status = 200, description = "Trip history", body = [TripBody]),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["trips"],
    operation_id = "listParentTrips",
    security(("IdentityHeaders" = []))
)]
#[get("/parent/trips")]
pub async fn list_parent_trips(
    state: web::Data<HttpState>,
    caller: CallerIdentity,
) -> ApiResult<web::Json<Vec<TripBody>>> {
    let parent_id = require_parent(&caller)?;
    let entries = state.trips_query.parent_trip_history(parent_id).await?;
    Ok(bodies(entries))
}

/// Fetch one of the caller's children's records.
#[utoipa::path(
    get,
    path = "/api/v1/parent/trips/{tripId}",
    params(("tripId" = String, Path, description = "Trip record identifier")),
    responses(
        (status = 200, description = "Trip record", body = TripBody),
        (status = 400, description = "Invalid trip id", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Trip not found", body = ErrorSchema)
    ),
    tags = ["trips"],
    operation_id = "getParentTrip",
    security(("IdentityHeaders" = []))
)]
#[get("/parent/trips/{trip_id}")]
pub async fn get_parent_trip(
    state: web::Data<HttpState>,
    caller: CallerIdentity,
    path: web::Path<String>,
) -> ApiResult<web::Json<TripBody>> {
    let parent_id = require_parent(&caller)?;
    let trip_id = trip_id_from_path(path)?;
    let entry = state
        .trips_query
        .get_trip(trip_id, TripViewer::Parent(parent_id))
        .await?;
    Ok(web::Json(TripBody::from(entry)))
}

#[cfg(test)]
#[path = "trips_tests.rs"]
mod tests;
