//! HTTP inbound adapter exposing the route management and trip status APIs.

pub mod error;
pub mod health;
pub mod identity;
pub mod routes;
pub mod routes_dto;
pub mod schemas;
pub mod state;
pub mod trips;
pub mod trips_dto;
pub mod validation;

use actix_web::web;

pub use error::ApiResult;

/// Register the versioned API handlers on a scope (mounted at `/api/v1`).
///
/// Body extraction errors are rendered as `invalid_request` envelopes.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(validation::json_error_handler))
        .service(routes::add_route)
        .service(routes::list_routes)
        .service(routes::get_route)
        .service(routes::update_route)
        .service(routes::delete_route)
        .service(routes::list_driver_routes)
        .service(routes::get_driver_route)
        .service(trips::record_trip)
        .service(trips::list_driver_trips)
        .service(trips::get_driver_trip)
        .service(trips::update_trip_status)
        .service(trips::list_parent_trips_today)
        .service(trips::list_parent_trips)
        .service(trips::get_parent_trip);
}
