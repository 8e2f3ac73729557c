//! Per-connection trip session.
//!
//! Joins the trip group on connect, acknowledges every client frame, and
//! forwards other members' positions. The server pings every
//! [`Heartbeat::interval`] and closes a connection that has been silent for
//! longer than [`Heartbeat::client_timeout`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_ws::{CloseCode, CloseReason, Closed, Message, MessageStream, ProtocolError, Session};
use mockable::Clock;
use tokio::time;
use tracing::{debug, warn};

use crate::domain::{LocationRelay, LocationReport, LocationUpdate, RouteId, UserId};
use crate::inbound::ws::messages::{Ack, LocationBroadcast, LocationRequest};
use crate::inbound::ws::state::Heartbeat;

/// Acknowledgement sent once the connection has joined its trip group.
pub const WELCOME_MESSAGE: &str = "Connected to trip group";
/// Acknowledgement for a published position.
pub const BROADCAST_MESSAGE: &str = "Location broadcast";
pub(crate) const MALFORMED_MESSAGE: &str = "Malformed location payload";
pub(crate) const NOT_PUBLISHER_MESSAGE: &str = "Only the driver assigned to this trip may publish";
const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(100);

/// Who is connected and what they may do.
#[derive(Debug, Clone, Copy)]
pub(super) struct TripMember {
    pub trip_id: RouteId,
    pub user_id: UserId,
    pub can_publish: bool,
}

enum SessionError {
    ClientClosed(Option<CloseReason>),
    StreamClosed,
    GroupClosed,
    HeartbeatTimeout,
    Protocol(ProtocolError),
    Network(Closed),
}

enum CloseAction {
    None,
    Close(Option<CloseReason>),
}

pub(super) struct TripSession {
    member: TripMember,
    relay: Arc<LocationRelay>,
    clock: Arc<dyn Clock>,
    heartbeat: Heartbeat,
}

impl TripSession {
    pub(super) fn new(
        member: TripMember,
        relay: Arc<LocationRelay>,
        clock: Arc<dyn Clock>,
        heartbeat: Heartbeat,
    ) -> Self {
        Self {
            member,
            relay,
            clock,
            heartbeat,
        }
    }

    pub(super) async fn run(self, mut session: Session, mut stream: MessageStream) {
        let mut subscription = self.relay.subscribe(self.member.trip_id);
        debug!(
            trip_id = %self.member.trip_id,
            user_id = %self.member.user_id,
            publisher = self.member.can_publish,
            "joined trip group"
        );
        if let Err(error) = send_json(&mut session, &Ack::success(WELCOME_MESSAGE)).await {
            warn!(%error, "failed to greet trip member");
            return;
        }

        let mut last_heartbeat = Instant::now();
        // `time::interval` panics on a zero period.
        let mut heartbeat = time::interval(self.heartbeat.interval.max(MIN_HEARTBEAT_INTERVAL));

        loop {
            let result = tokio::select! {
                _ = heartbeat.tick() => {
                    self.handle_heartbeat_tick(&mut session, &last_heartbeat).await
                }
                message = stream.recv() => {
                    self.handle_stream_message(&mut session, &mut last_heartbeat, message)
                        .await
                }
                update = subscription.recv() => {
                    self.forward_update(&mut session, update).await
                }
            };

            if let Err(error) = result {
                self.log_shutdown_reason(&error);
                close_session_if_needed(session, close_action_for(error)).await;
                return;
            }
        }
    }

    async fn handle_heartbeat_tick(
        &self,
        session: &mut Session,
        last_heartbeat: &Instant,
    ) -> Result<(), SessionError> {
        if Instant::now().duration_since(*last_heartbeat) > self.heartbeat.client_timeout {
            return Err(SessionError::HeartbeatTimeout);
        }
        session.ping(b"").await.map_err(SessionError::Network)
    }

    async fn handle_stream_message(
        &self,
        session: &mut Session,
        last_heartbeat: &mut Instant,
        message: Option<Result<Message, ProtocolError>>,
    ) -> Result<(), SessionError> {
        let Some(message) = message else {
            return Err(SessionError::StreamClosed);
        };
        match message {
            Ok(message) => self.handle_message(session, last_heartbeat, message).await,
            Err(error) => Err(SessionError::Protocol(error)),
        }
    }

    async fn handle_message(
        &self,
        session: &mut Session,
        last_heartbeat: &mut Instant,
        message: Message,
    ) -> Result<(), SessionError> {
        match message {
            Message::Ping(payload) => {
                *last_heartbeat = Instant::now();
                session.pong(&payload).await.map_err(SessionError::Network)
            }
            Message::Text(text) => {
                *last_heartbeat = Instant::now();
                let ack = self.handle_text(text.as_ref());
                send_json(session, &ack).await.map_err(SessionError::Network)
            }
            Message::Pong(_) | Message::Binary(_) | Message::Continuation(_) | Message::Nop => {
                *last_heartbeat = Instant::now();
                Ok(())
            }
            Message::Close(reason) => Err(SessionError::ClientClosed(reason)),
        }
    }

    fn handle_text(&self, text: &str) -> Ack {
        let request = match serde_json::from_str::<LocationRequest>(text) {
            Ok(request) => request,
            Err(error) => {
                debug!(%error, "rejected malformed location payload");
                return Ack::error(MALFORMED_MESSAGE);
            }
        };
        if !self.member.can_publish {
            debug!(user_id = %self.member.user_id, "subscriber attempted to publish");
            return Ack::error(NOT_PUBLISHER_MESSAGE);
        }
        let report = match LocationReport::new(request.latitude, request.longitude) {
            Ok(report) => report,
            Err(error) => return Ack::error(error.to_string()),
        };

        let delivered = self.relay.publish(LocationUpdate {
            trip_id: self.member.trip_id,
            report,
            sender_id: self.member.user_id,
            recorded_at: self.clock.utc(),
        });
        debug!(trip_id = %self.member.trip_id, delivered, "location published");
        Ack::success(BROADCAST_MESSAGE)
    }

    async fn forward_update(
        &self,
        session: &mut Session,
        update: Option<LocationUpdate>,
    ) -> Result<(), SessionError> {
        let Some(update) = update else {
            return Err(SessionError::GroupClosed);
        };
        if update.sender_id == self.member.user_id {
            return Ok(());
        }
        send_json(session, &LocationBroadcast::from(&update))
            .await
            .map_err(SessionError::Network)
    }

    fn log_shutdown_reason(&self, error: &SessionError) {
        let trip_id = self.member.trip_id;
        match error {
            SessionError::HeartbeatTimeout => {
                warn!(%trip_id, "trip heartbeat timeout; closing connection");
            }
            SessionError::Protocol(error) => {
                warn!(%trip_id, %error, "trip websocket protocol error");
            }
            SessionError::Network(error) => {
                warn!(%trip_id, %error, "trip websocket send failed; closing connection");
            }
            SessionError::GroupClosed => warn!(%trip_id, "trip group closed under a member"),
            SessionError::ClientClosed(_) | SessionError::StreamClosed => {
                debug!(%trip_id, "trip member left");
            }
        }
    }
}

fn close_action_for(error: SessionError) -> CloseAction {
    match error {
        SessionError::HeartbeatTimeout => CloseAction::Close(Some(CloseReason {
            code: CloseCode::Normal,
            description: Some("heartbeat timeout".to_owned()),
        })),
        SessionError::Protocol(_) => CloseAction::Close(Some(CloseReason {
            code: CloseCode::Protocol,
            description: Some("protocol error".to_owned()),
        })),
        SessionError::GroupClosed => CloseAction::Close(Some(CloseReason {
            code: CloseCode::Away,
            description: Some("trip closed".to_owned()),
        })),
        SessionError::ClientClosed(reason) => CloseAction::Close(reason),
        SessionError::StreamClosed | SessionError::Network(_) => CloseAction::None,
    }
}

async fn close_session_if_needed(session: Session, close_action: CloseAction) {
    if let CloseAction::Close(reason) = close_action
        && let Err(error) = session.close(reason).await
    {
        warn!(%error, "failed to close trip websocket");
    }
}

async fn send_json<T: serde::Serialize>(session: &mut Session, payload: &T) -> Result<(), Closed> {
    match serde_json::to_string(payload) {
        Ok(body) => session.text(body).await,
        Err(error) => {
            warn!(%error, "failed to serialise trip payload");
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
