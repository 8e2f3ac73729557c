//! Trip WebSocket tests against a live server.

use std::net::TcpListener;
use std::time::Duration;

use actix_web::dev::ServerHandle;
use actix_web::{App, HttpServer, web};
use awc::error::WsClientError;
use awc::{BoxedSocket, ws::Codec, ws::Frame, ws::Message as ClientMessage};
use futures_util::{SinkExt, StreamExt};
use rstest::rstest;
use serde_json::{Value, json};

use super::*;
use crate::domain::ports::MockRouteAssignmentQuery;
use crate::domain::{AssembledRouteView, Error, RouteHeader, RouteName};
use crate::inbound::http::identity::{
    SCHOOL_ID_HEADER, USER_ID_HEADER, USER_ROLE_HEADER, USERNAME_HEADER,
};
use crate::inbound::ws::state::WsState;
use crate::inbound::ws::trip_socket;
use crate::test_support::SchoolDayClock;

type Socket = actix_codec::Framed<BoxedSocket, Codec>;

const SCHOOL: &str = "6f1c2f7e-8b0a-4d3c-9a55-1f2e3d4c5b6a";
const DRIVER: &str = "11111111-1111-4111-8111-111111111111";
const GUARDIAN: &str = "55555555-5555-4555-8555-555555555555";
const TRIP: &str = "44444444-4444-4444-8444-444444444444";

const RELAXED: Heartbeat = Heartbeat {
    interval: Duration::from_secs(5),
    client_timeout: Duration::from_secs(10),
};

fn assigned_query() -> MockRouteAssignmentQuery {
    let mut query = MockRouteAssignmentQuery::new();
    query.expect_get_route().returning(|request| {
        Ok(AssembledRouteView::Assigned {
            route: RouteHeader {
                id: request.route_id,
                name: RouteName::new("Route A").expect("name"),
                description: String::new(),
            },
            drivers: Vec::new(),
        })
    });
    query
}

struct TestServer {
    url: String,
    _handle: ServerHandle,
}

fn start_server(query: MockRouteAssignmentQuery, heartbeat: Heartbeat) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let state = WsState::new(
        Arc::new(LocationRelay::default()),
        Arc::new(query),
        Arc::new(SchoolDayClock::morning()),
    )
    .with_heartbeat(heartbeat);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .service(trip_socket)
    })
    .listen(listener)
    .expect("bind test server")
    .disable_signals()
    .run();
    let handle = server.handle();
    actix_web::rt::spawn(server);
    TestServer {
        url: format!("http://{addr}"),
        _handle: handle,
    }
}

async fn connect(server: &TestServer, user: &str, role: &str) -> Result<Socket, WsClientError> {
    awc::Client::default()
        .ws(format!("{}/ws/trips/{TRIP}", server.url))
        .set_header(USER_ID_HEADER, user)
        .set_header(USER_ROLE_HEADER, role)
        .set_header(SCHOOL_ID_HEADER, SCHOOL)
        .set_header(USERNAME_HEADER, "member")
        .connect()
        .await
        .map(|(_response, socket)| socket)
}

async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("frame within timeout")
            .expect("response frame")
            .expect("frame");
        match frame {
            Frame::Text(bytes) => return serde_json::from_slice(&bytes).expect("json"),
            Frame::Ping(_) | Frame::Pong(_) => continue,
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

async fn join(server: &TestServer, user: &str, role: &str) -> Socket {
    let mut socket = connect(server, user, role).await.expect("websocket connect");
    let welcome = next_json(&mut socket).await;
    assert_eq!(welcome.get("message").and_then(Value::as_str), Some(WELCOME_MESSAGE));
    socket
}

async fn send(socket: &mut Socket, payload: Value) {
    socket
        .send(ClientMessage::Text(payload.to_string().into()))
        .await
        .expect("send text");
}

#[rstest]
#[actix_rt::test]
async fn driver_positions_reach_other_members_only() {
    let server = start_server(assigned_query(), RELAXED);
    let mut guardian = join(&server, GUARDIAN, "P").await;
    let mut driver = join(&server, DRIVER, "D").await;

    send(&mut driver, json!({ "latitude": -6.2, "longitude": 106.8 })).await;

    let ack = next_json(&mut driver).await;
    assert_eq!(
        ack,
        json!({ "code": 200, "status": "success", "message": BROADCAST_MESSAGE })
    );
    let broadcast = next_json(&mut guardian).await;
    assert_eq!(broadcast.get("tripId").and_then(Value::as_str), Some(TRIP));
    assert_eq!(broadcast.get("senderId").and_then(Value::as_str), Some(DRIVER));
    assert_eq!(broadcast.get("longitude"), Some(&json!(106.8)));
    assert_eq!(
        broadcast.get("recordedAt").and_then(Value::as_str),
        Some("2026-03-02T07:00:00+00:00")
    );

    let echoed = tokio::time::timeout(Duration::from_millis(200), async {
        while let Some(frame) = driver.next().await {
            if let Ok(Frame::Text(bytes)) = frame {
                return Some(bytes);
            }
        }
        None
    })
    .await;
    assert!(
        !matches!(echoed, Ok(Some(_))),
        "sender must not receive its own position"
    );
}

#[rstest]
#[actix_rt::test]
async fn subscribers_cannot_publish() {
    let server = start_server(assigned_query(), RELAXED);
    let mut guardian = join(&server, GUARDIAN, "P").await;

    send(&mut guardian, json!({ "latitude": -6.2, "longitude": 106.8 })).await;

    let ack = next_json(&mut guardian).await;
    assert_eq!(ack.get("code"), Some(&json!(400)));
    assert_eq!(ack.get("status").and_then(Value::as_str), Some("error"));
}

#[rstest]
#[case(json!({ "latitude": 0.0, "longitude": 106.8 }), "non-zero")]
#[case(json!({ "latitude": 91.0, "longitude": 106.8 }), "latitude 91")]
#[case(json!({ "lat": "north" }), "Malformed")]
#[actix_rt::test]
async fn invalid_frames_are_acknowledged_with_errors(
    #[case] payload: Value,
    #[case] fragment: &str,
) {
    let server = start_server(assigned_query(), RELAXED);
    let mut driver = join(&server, DRIVER, "D").await;

    send(&mut driver, payload).await;
    let ack = next_json(&mut driver).await;

    assert_eq!(ack.get("code"), Some(&json!(400)));
    let message = ack.get("message").and_then(Value::as_str).expect("message");
    assert!(message.contains(fragment), "unexpected message {message}");

    send(&mut driver, json!({ "latitude": -6.2, "longitude": 106.8 })).await;
    let follow_up = next_json(&mut driver).await;
    assert_eq!(follow_up.get("code"), Some(&json!(200)));
}

#[rstest]
#[actix_rt::test]
async fn unknown_trips_refuse_the_upgrade() {
    let mut query = MockRouteAssignmentQuery::new();
    query
        .expect_get_route()
        .returning(|_| Err(Error::not_found("route not found")));
    let server = start_server(query, RELAXED);

    let result = connect(&server, GUARDIAN, "P").await;

    match result {
        Err(WsClientError::InvalidResponseStatus(status)) => {
            assert_eq!(status.as_u16(), 404);
        }
        Err(other) => panic!("unexpected client error: {other:?}"),
        Ok(_) => panic!("upgrade should be refused"),
    }
}

#[rstest]
#[actix_rt::test]
async fn closes_idle_connections() {
    let heartbeat = Heartbeat {
        interval: Duration::from_millis(50),
        client_timeout: Duration::from_millis(100),
    };
    let server = start_server(assigned_query(), heartbeat);
    let mut socket = join(&server, GUARDIAN, "P").await;

    let reason = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(frame) = socket.next().await {
            match frame.expect("frame") {
                Frame::Ping(_) | Frame::Pong(_) => continue,
                Frame::Close(reason) => return reason,
                other => panic!("unexpected frame before close: {other:?}"),
            }
        }
        None
    })
    .await
    .expect("close frame within timeout")
    .expect("close reason");

    assert_eq!(reason.code, CloseCode::Normal);
    assert_eq!(reason.description.as_deref(), Some("heartbeat timeout"));
}
