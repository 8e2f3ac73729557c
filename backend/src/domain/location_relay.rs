//! In-process fan-out of live driver positions.
//!
//! A trip is one run of a route, so trips are keyed by [`RouteId`]. Each trip
//! group owns a broadcast channel; the group is created by its first
//! subscriber and removed when the last [`TripSubscription`] is dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::ids::{RouteId, UserId};

/// Buffered updates per trip before slow members start lagging.
pub const DEFAULT_GROUP_CAPACITY: usize = 64;

/// Reasons a reported position is refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationValidationError {
    #[error("latitude and longitude must be finite numbers")]
    NotFinite,
    #[error("latitude and longitude must be non-zero")]
    ZeroCoordinate,
    #[error("latitude {value} is outside -90..=90")]
    LatitudeOutOfRange { value: f64 },
    #[error("longitude {value} is outside -180..=180")]
    LongitudeOutOfRange { value: f64 },
}

/// A validated position fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocationReport {
    latitude: f64,
    longitude: f64,
}

impl LocationReport {
    /// Validate a latitude/longitude pair.
    ///
    /// # Examples
    /// ```
    /// use shuttle_backend::domain::LocationReport;
    ///
    /// assert!(LocationReport::new(-6.2, 106.8).is_ok());
    /// assert!(LocationReport::new(0.0, 106.8).is_err());
    /// ```
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationValidationError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(LocationValidationError::NotFinite);
        }
        if latitude == 0.0 || longitude == 0.0 {
            return Err(LocationValidationError::ZeroCoordinate);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(LocationValidationError::LatitudeOutOfRange { value: latitude });
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationValidationError::LongitudeOutOfRange { value: longitude });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Position broadcast to every member of a trip group.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationUpdate {
    pub trip_id: RouteId,
    pub report: LocationReport,
    pub sender_id: UserId,
    pub recorded_at: DateTime<Utc>,
}

type Groups = HashMap<RouteId, broadcast::Sender<LocationUpdate>>;

/// Registry of trip groups.
#[derive(Debug)]
pub struct LocationRelay {
    groups: Mutex<Groups>,
    capacity: usize,
}

impl Default for LocationRelay {
    fn default() -> Self {
        Self::new(DEFAULT_GROUP_CAPACITY)
    }
}

impl LocationRelay {
    /// Create a relay whose groups buffer `capacity` updates.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            groups: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn groups(&self) -> MutexGuard<'_, Groups> {
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Join a trip group, creating it when absent.
    #[must_use]
    pub fn subscribe(self: &Arc<Self>, trip_id: RouteId) -> TripSubscription {
        let receiver = {
            let mut groups = self.groups();
            groups
                .entry(trip_id)
                .or_insert_with(|| {
                    debug!(%trip_id, "trip group created");
                    broadcast::channel(self.capacity).0
                })
                .subscribe()
        };
        TripSubscription {
            relay: Arc::clone(self),
            trip_id,
            receiver: Some(receiver),
        }
    }

    /// Deliver `update` to its trip group, returning how many members
    /// received it.
    pub fn publish(&self, update: LocationUpdate) -> usize {
        let trip_id = update.trip_id;
        let groups = self.groups();
        match groups.get(&trip_id) {
            Some(sender) => sender.send(update).unwrap_or(0),
            None => 0,
        }
    }

    /// Number of live trip groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups().len()
    }

    /// Members currently subscribed to `trip_id`.
    #[must_use]
    pub fn member_count(&self, trip_id: &RouteId) -> usize {
        self.groups()
            .get(trip_id)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    fn leave(&self, trip_id: RouteId) {
        let mut groups = self.groups();
        let empty = groups
            .get(&trip_id)
            .is_some_and(|sender| sender.receiver_count() == 0);
        if empty {
            groups.remove(&trip_id);
            debug!(%trip_id, "trip group removed");
        }
    }
}

/// Membership of one connection in a trip group.
#[derive(Debug)]
pub struct TripSubscription {
    relay: Arc<LocationRelay>,
    trip_id: RouteId,
    receiver: Option<broadcast::Receiver<LocationUpdate>>,
}

impl TripSubscription {
    #[must_use]
    pub const fn trip_id(&self) -> RouteId {
        self.trip_id
    }

    /// Wait for the next update. Returns `None` once the group is gone.
    ///
    /// Updates dropped because this member lagged are skipped.
    pub async fn recv(&mut self) -> Option<LocationUpdate> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(update) => return Some(update),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(trip_id = %self.trip_id, skipped, "trip member lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for TripSubscription {
    fn drop(&mut self) {
        drop(self.receiver.take());
        self.relay.leave(self.trip_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;

    fn update(trip_id: RouteId) -> LocationUpdate {
        LocationUpdate {
            trip_id,
            report: LocationReport::new(-6.2, 106.8).expect("valid report"),
            sender_id: UserId::random(),
            recorded_at: Utc::now(),
        }
    }

    #[rstest]
    #[case(0.0, 106.8, LocationValidationError::ZeroCoordinate)]
    #[case(-6.2, 0.0, LocationValidationError::ZeroCoordinate)]
    #[case(91.0, 10.0, LocationValidationError::LatitudeOutOfRange { value: 91.0 })]
    #[case(10.0, -180.5, LocationValidationError::LongitudeOutOfRange { value: -180.5 })]
    #[case(f64::NAN, 10.0, LocationValidationError::NotFinite)]
    fn rejects_unusable_positions(
        #[case] latitude: f64,
        #[case] longitude: f64,
        #[case] expected: LocationValidationError,
    ) {
        assert_eq!(LocationReport::new(latitude, longitude), Err(expected));
    }

    #[rstest]
    #[tokio::test]
    async fn members_of_a_trip_receive_published_updates() {
        let relay = Arc::new(LocationRelay::default());
        let trip_id = RouteId::random();
        let mut first = relay.subscribe(trip_id);
        let mut second = relay.subscribe(trip_id);

        let sent = update(trip_id);
        assert_eq!(relay.publish(sent.clone()), 2);

        assert_eq!(first.recv().await, Some(sent.clone()));
        assert_eq!(second.recv().await, Some(sent));
    }

    #[rstest]
    fn updates_do_not_cross_trips() {
        let relay = Arc::new(LocationRelay::default());
        let trip_a = RouteId::random();
        let _member = relay.subscribe(trip_a);

        assert_eq!(relay.publish(update(RouteId::random())), 0);
        assert_eq!(relay.member_count(&trip_a), 1);
    }

    #[rstest]
    fn group_is_removed_with_its_last_member() {
        let relay = Arc::new(LocationRelay::default());
        let trip_id = RouteId::random();
        let first = relay.subscribe(trip_id);
        let second = relay.subscribe(trip_id);
        assert_eq!(relay.group_count(), 1);

        drop(first);
        assert_eq!(relay.member_count(&trip_id), 1);
        drop(second);
        assert_eq!(relay.group_count(), 0);
    }
}
