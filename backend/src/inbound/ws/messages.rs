//! Wire-level message definitions for the trip WebSocket.

use serde::{Deserialize, Serialize};

use crate::domain::LocationUpdate;

/// Position published by a driver's device.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRequest {
    pub latitude: f64,
    pub longitude: f64,
}

/// Outcome of a client frame, sent back to the same client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub code: u16,
    pub status: String,
    pub message: String,
}

impl Ack {
    /// Acknowledge a successful action.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            code: 200,
            status: "success".to_owned(),
            message: message.into(),
        }
    }

    /// Reject a frame with `reason`.
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            code: 400,
            status: "error".to_owned(),
            message: reason.into(),
        }
    }
}

/// Position fanned out to the other members of a trip group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationBroadcast {
    pub trip_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub sender_id: String,
    pub recorded_at: String,
}

impl From<&LocationUpdate> for LocationBroadcast {
    fn from(update: &LocationUpdate) -> Self {
        Self {
            trip_id: update.trip_id.to_string(),
            latitude: update.report.latitude(),
            longitude: update.report.longitude(),
            sender_id: update.sender_id.to_string(),
            recorded_at: update.recorded_at.to_rfc3339(),
        }
    }
}
