//! Route management HTTP handlers.
//!
//! ```text
//! POST   /api/v1/school/routes
//! GET    /api/v1/school/routes
//! GET    /api/v1/school/routes/{routeId}
//! PUT    /api/v1/school/routes/{routeId}
//! DELETE /api/v1/school/routes/{routeId}
//! GET    /api/v1/driver/routes
//! GET    /api/v1/driver/routes/{routeId}
//! ```
//!
//! School endpoints act within the caller's school. Driver endpoints only
//! ever show the caller's own run.

use actix_web::{HttpResponse, delete, get, post, put, web};
use tracing::info;

use crate::domain::ports::{AddRouteRequest, DeleteRouteRequest, GetRouteRequest, UpdateRouteRequest};
use crate::domain::{CallerIdentity, Error, RouteId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::identity::{ROUTE_MANAGERS, require_driver, require_role};
use crate::inbound::http::routes_dto::{
    ParsedRouteBody, RouteCreatedBody, RouteRequestBody, RouteSummaryBody, RouteViewBody,
};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

fn route_id_from_path(path: web::Path<String>) -> Result<RouteId, Error> {
    parse_id(&path.into_inner(), FieldName::new("routeId"))
}

/// Create a route and bind its drivers and students.
#[utoipa::path(
    post,
    path = "/api/v1/school/routes",
    request_body = RouteRequestBody,
    responses(
        (status = 201, description = "Route created", body = RouteCreatedBody),
        (status = 400, description = "Invalid request or unknown driver or student", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 409, description = "Driver or student already assigned", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["routes"],
    operation_id = "addRoute",
    security(("IdentityHeaders" = []))
)]
#[post("/school/routes")]
pub async fn add_route(
    state: web::Data<HttpState>,
    caller: CallerIdentity,
    payload: web::Json<RouteRequestBody>,
) -> ApiResult<HttpResponse> {
    require_role(&caller, ROUTE_MANAGERS)?;
    let parsed = ParsedRouteBody::try_from(payload.into_inner())?;

    let route_id = state
        .routes
        .add_route(AddRouteRequest {
            school_id: caller.school_id,
            name: parsed.name,
            description: parsed.description,
            assignments: parsed.assignments,
            actor: caller.username,
        })
        .await?;

    info!(%route_id, school_id = %caller.school_id, "route created over http");
    Ok(HttpResponse::Created().json(RouteCreatedBody::from(route_id)))
}

/// List the caller's school routes, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/school/routes",
    responses(
        (status = 200, description = "Routes", body = [RouteSummaryBody]),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["routes"],
    operation_id = "listRoutes",
    security(("IdentityHeaders" = []))
)]
#[get("/school/routes")]
pub async fn list_routes(
    state: web::Data<HttpState>,
    caller: CallerIdentity,
) -> ApiResult<web::Json<Vec<RouteSummaryBody>>> {
    require_role(&caller, ROUTE_MANAGERS)?;
    let routes = state.routes_query.list_routes(caller.school_id).await?;
    Ok(web::Json(
        routes.into_iter().map(RouteSummaryBody::from).collect(),
    ))
}

/// Fetch one route with every driver's run.
#[utoipa::path(
    get,
    path = "/api/v1/school/routes/{routeId}",
    params(("routeId" = String, Path, description = "Route identifier")),
    responses(
        (status = 200, description = "Assembled route", body = RouteViewBody),
        (status = 400, description = "Invalid route id", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Route not found", body = ErrorSchema)
    ),
    tags = ["routes"],
    operation_id = "getRoute",
    security(("IdentityHeaders" = []))
)]
#[get("/school/routes/{route_id}")]
pub async fn get_route(
    state: web::Data<HttpState>,
    caller: CallerIdentity,
    path: web::Path<String>,
) -> ApiResult<web::Json<RouteViewBody>> {
    require_role(&caller, ROUTE_MANAGERS)?;
    let route_id = route_id_from_path(path)?;
    let view = state
        .routes_query
        .get_route(GetRouteRequest {
            route_id,
            school_id: caller.school_id,
            caller_driver_id: None,
        })
        .await?;
    Ok(web::Json(RouteViewBody::from(view)))
}

/// Replace a route's fields and bindings.
#[utoipa::path(
    put,
    path = "/api/v1/school/routes/{routeId}",
    params(("routeId" = String, Path, description = "Route identifier")),
    request_body = RouteRequestBody,
    responses(
        (status = 204, description = "Route updated"),
        (status = 400, description = "Invalid request or unknown driver or student", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Route not found", body = ErrorSchema),
        (status = 409, description = "Driver or student already assigned", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["routes"],
    operation_id = "updateRoute",
    security(("IdentityHeaders" = []))
)]
#[put("/school/routes/{route_id}")]
pub async fn update_route(
    state: web::Data<HttpState>,
    caller: CallerIdentity,
    path: web::Path<String>,
    payload: web::Json<RouteRequestBody>,
) -> ApiResult<HttpResponse> {
    require_role(&caller, ROUTE_MANAGERS)?;
    let route_id = route_id_from_path(path)?;
    let parsed = ParsedRouteBody::try_from(payload.into_inner())?;

    state
        .routes
        .update_route(UpdateRouteRequest {
            route_id,
            school_id: caller.school_id,
            name: parsed.name,
            description: parsed.description,
            assignments: parsed.assignments,
            actor: caller.username,
        })
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Delete a route and release its drivers and students.
#[utoipa::path(
    delete,
    path = "/api/v1/school/routes/{routeId}",
    params(("routeId" = String, Path, description = "Route identifier")),
    responses(
        (status = 204, description = "Route deleted"),
        (status = 400, description = "Invalid route id", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Route not found", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["routes"],
    operation_id = "deleteRoute",
    security(("IdentityHeaders" = []))
)]
#[delete("/school/routes/{route_id}")]
pub async fn delete_route(
    state: web::Data<HttpState>,
    caller: CallerIdentity,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    require_role(&caller, ROUTE_MANAGERS)?;
    let route_id = route_id_from_path(path)?;
    state
        .routes
        .delete_route(DeleteRouteRequest {
            route_id,
            school_id: caller.school_id,
            actor: caller.username,
        })
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// List the routes the calling driver is bound to.
#[utoipa::path(
    get,
    path = "/api/v1/driver/routes",
    responses(
        (status = 200, description = "Routes", body = [RouteSummaryBody]),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["driver"],
    operation_id = "listDriverRoutes",
    security(("IdentityHeaders" = []))
)]
#[get("/driver/routes")]
pub async fn list_driver_routes(
    state: web::Data<HttpState>,
    caller: CallerIdentity,
) -> ApiResult<web::Json<Vec<RouteSummaryBody>>> {
    let driver_id = require_driver(&caller)?;
    let routes = state.routes_query.list_routes_for_driver(driver_id).await?;
    Ok(web::Json(
        routes.into_iter().map(RouteSummaryBody::from).collect(),
    ))
}

/// Fetch the calling driver's run on one route.
#[utoipa::path(
    get,
    path = "/api/v1/driver/routes/{routeId}",
    params(("routeId" = String, Path, description = "Route identifier")),
    responses(
        (status = 200, description = "The driver's run", body = RouteViewBody),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Route not found", body = ErrorSchema)
    ),
    tags = ["driver"],
    operation_id = "getDriverRoute",
    security(("IdentityHeaders" = []))
)]
#[get("/driver/routes/{route_id}")]
pub async fn get_driver_route(
    state: web::Data<HttpState>,
    caller: CallerIdentity,
    path: web::Path<String>,
) -> ApiResult<web::Json<RouteViewBody>> {
    let driver_id = require_driver(&caller)?;
    let route_id = route_id_from_path(path)?;
    let view = state
        .routes_query
        .get_route(GetRouteRequest {
            route_id,
            school_id: caller.school_id,
            caller_driver_id: Some(driver_id),
        })
        .await?;
    Ok(web::Json(RouteViewBody::from(view)))
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
