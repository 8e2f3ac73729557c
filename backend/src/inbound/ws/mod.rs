//! WebSocket inbound adapter relaying live driver positions.
//!
//! `GET /ws/trips/{trip_id}` upgrades an identified caller into the trip
//! group of one route. The route must exist in the caller's school. Only a
//! driver bound to the route may publish; everyone else listens.

use actix_web::web::{self, Payload};
use actix_web::{HttpRequest, HttpResponse, get};
use tracing::{error, info};

use crate::domain::ports::GetRouteRequest;
use crate::domain::{AssembledRouteView, CallerIdentity, Error, RouteId};
use crate::inbound::http::validation::{FieldName, parse_id};

mod session;

pub mod messages;
pub mod state;

pub use session::{BROADCAST_MESSAGE, WELCOME_MESSAGE};

/// Upgrade to a trip WebSocket.
#[get("/ws/trips/{trip_id}")]
pub async fn trip_socket(
    state: web::Data<state::WsState>,
    caller: CallerIdentity,
    path: web::Path<String>,
    req: HttpRequest,
    stream: Payload,
) -> actix_web::Result<HttpResponse> {
    let trip_id: RouteId = parse_id(&path.into_inner(), FieldName::new("tripId"))?;

    // A driver scoped read yields an assigned view only when the caller is
    // bound to the route.
    let view = state
        .routes_query
        .get_route(GetRouteRequest {
            route_id: trip_id,
            school_id: caller.school_id,
            caller_driver_id: caller.driver_id(),
        })
        .await?;
    let can_publish =
        caller.driver_id().is_some() && matches!(view, AssembledRouteView::Assigned { .. });

    let (response, ws_session, ws_stream) = actix_ws::handle(&req, stream).map_err(|err| {
        error!(error = %err, "trip websocket upgrade failed");
        Error::internal("WebSocket upgrade failed")
    })?;

    info!(%trip_id, user_id = %caller.user_id, can_publish, "trip websocket opened");
    let member = session::TripMember {
        trip_id,
        user_id: caller.user_id,
        can_publish,
    };
    let trip = session::TripSession::new(
        member,
        state.relay.clone(),
        state.clock.clone(),
        state.heartbeat,
    );
    actix_web::rt::spawn(trip.run(ws_session, ws_stream));
    Ok(response)
}
