//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers the school and driver route endpoints, the trip
//! status endpoints, the health probes, the wire DTOs, and the error envelope wrappers from
//! [`crate::inbound::http::schemas`]. Callers identify themselves through
//! headers set by the upstream gateway; the document describes them as the
//! `IdentityHeaders` API key scheme.
//!
//! The document backs Swagger UI and is exported by
//! `cargo run --bin openapi-dump`.

use crate::inbound::http::routes_dto::{
    AssignmentBody, DriverRunBody, RouteCreatedBody, RouteRequestBody, RouteSummaryBody,
    RouteViewBody, StudentPlacementBody, StudentStopBody,
};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use crate::inbound::http::trips_dto::{RecordTripBody, TripBody, TripCreatedBody, TripStatusBody};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the identity header scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "IdentityHeaders",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "x-user-id",
                "Caller identity forwarded by the gateway. Requests also carry \
                 x-user-role, x-school-id, and x-username.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Shuttle backend API",
        description = "Route assignment management for school shuttles, driver run views, daily trip status, and health probes.",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0.html"
        )
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("IdentityHeaders" = [])),
    paths(
        crate::inbound::http::routes::add_route,
        crate::inbound::http::routes::list_routes,
        crate::inbound::http::routes::get_route,
        crate::inbound::http::routes::update_route,
        crate::inbound::http::routes::delete_route,
        crate::inbound::http::routes::list_driver_routes,
        crate::inbound::http::routes::get_driver_route,
        crate::inbound::http::trips::record_trip,
        crate::inbound::http::trips::update_trip_status,
        crate::inbound::http::trips::list_driver_trips,
        crate::inbound::http::trips::get_driver_trip,
        crate::inbound::http::trips::list_parent_trips_today,
        crate::inbound::http::trips::list_parent_trips,
        crate::inbound::http::trips::get_parent_trip,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        RouteRequestBody,
        AssignmentBody,
        StudentPlacementBody,
        RouteCreatedBody,
        RouteSummaryBody,
        RouteViewBody,
        DriverRunBody,
        StudentStopBody,
        RecordTripBody,
        TripStatusBody,
        TripCreatedBody,
        TripBody,
        ErrorSchema,
        ErrorCodeSchema
    )),
    tags(
        (name = "routes", description = "School route and assignment management"),
        (name = "driver", description = "Driver views of assigned routes"),
        (name = "trips", description = "Daily trip status kept by drivers and read by guardians"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
