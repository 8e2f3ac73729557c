//! In-memory [`TripRecordRepository`] layered over an
//! [`InMemoryAssignmentStore`].
//!
//! Bindings and student profiles come from the assignment store so a test
//! can build routes through the route service and then record trips on
//! them. Guardians are linked to students explicitly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::ids::{DriverId, StudentId, TripRecordId, UserId};
use crate::domain::ports::{TripRecordRepository, TripRecordRepositoryError};
use crate::domain::routes::AuditStamp;
use crate::domain::trips::{RouteBinding, TripEntry, TripRecord, TripStatus};

use super::InMemoryAssignmentStore;

#[derive(Default)]
struct TripState {
    records: Vec<TripRecord>,
    parents: HashMap<StudentId, UserId>,
}

/// Thread-safe in-memory trip record repository for tests.
#[derive(Clone)]
pub struct InMemoryTripRecordRepository {
    store: InMemoryAssignmentStore,
    state: Arc<Mutex<TripState>>,
}

impl InMemoryTripRecordRepository {
    /// Create an empty repository reading bindings from `store`.
    #[must_use]
    pub fn new(store: InMemoryAssignmentStore) -> Self {
        Self {
            store,
            state: Arc::default(),
        }
    }

    /// Record `parent_id` as the guardian of `student_id`.
    pub fn link_parent(&self, student_id: StudentId, parent_id: UserId) {
        self.state().parents.insert(student_id, parent_id);
    }

    /// Every stored record, in insertion order.
    #[must_use]
    pub fn records(&self) -> Vec<TripRecord> {
        self.state().records.clone()
    }

    fn state(&self) -> MutexGuard<'_, TripState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_available(&self) -> Result<(), TripRecordRepositoryError> {
        if self.store.is_unavailable() {
            return Err(TripRecordRepositoryError::connection(
                "store marked unavailable",
            ));
        }
        Ok(())
    }

    fn entry(&self, state: &TripState, record: &TripRecord) -> Option<TripEntry> {
        let student = self.store.student(&record.student_id)?;
        Some(TripEntry {
            record: record.clone(),
            student,
            parent_id: state.parents.get(&record.student_id).copied(),
        })
    }
}

#[async_trait]
impl TripRecordRepository for InMemoryTripRecordRepository {
    async fn active_binding(
        &self,
        driver_id: &DriverId,
        student_id: &StudentId,
    ) -> Result<Option<RouteBinding>, TripRecordRepositoryError> {
        self.ensure_available()?;
        Ok(self.store.binding_for(driver_id, student_id))
    }

    async fn insert(&self, record: &TripRecord) -> Result<(), TripRecordRepositoryError> {
        self.ensure_available()?;
        let mut state = self.state();
        let taken = state.records.iter().any(|existing| {
            existing.student_id == record.student_id
                && existing.service_date == record.service_date
        });
        if taken {
            return Err(TripRecordRepositoryError::duplicate_record(
                record.student_id,
            ));
        }
        state.records.push(record.clone());
        Ok(())
    }

    async fn find(
        &self,
        trip_id: &TripRecordId,
    ) -> Result<Option<TripEntry>, TripRecordRepositoryError> {
        self.ensure_available()?;
        let state = self.state();
        Ok(state
            .records
            .iter()
            .find(|record| record.id == *trip_id)
            .and_then(|record| self.entry(&state, record)))
    }

    async fn update_status(
        &self,
        trip_id: &TripRecordId,
        driver_id: &DriverId,
        status: TripStatus,
        stamp: &AuditStamp,
    ) -> Result<bool, TripRecordRepositoryError> {
        self.ensure_available()?;
        let mut state = self.state();
        let Some(record) = state
            .records
            .iter_mut()
            .find(|record| record.id == *trip_id && record.driver_id == *driver_id)
        else {
            return Ok(false);
        };
        record.status = status;
        record.updated = Some(stamp.clone());
        Ok(true)
    }

    async fn for_driver(
        &self,
        driver_id: &DriverId,
    ) -> Result<Vec<TripEntry>, TripRecordRepositoryError> {
        self.ensure_available()?;
        let state = self.state();
        let mut entries: Vec<TripEntry> = state
            .records
            .iter()
            .filter(|record| record.driver_id == *driver_id)
            .filter_map(|record| self.entry(&state, record))
            .collect();
        entries.sort_by(|a, b| b.record.created.at.cmp(&a.record.created.at));
        Ok(entries)
    }

    async fn for_parent(
        &self,
        parent_id: &UserId,
        service_date: Option<NaiveDate>,
    ) -> Result<Vec<TripEntry>, TripRecordRepositoryError> {
        self.ensure_available()?;
        let state = self.state();
        let mut entries: Vec<TripEntry> = state
            .records
            .iter()
            .filter(|record| state.parents.get(&record.student_id) == Some(parent_id))
            .filter(|record| service_date.is_none_or(|day| record.service_date == day))
            .filter_map(|record| self.entry(&state, record))
            .collect();
        entries.sort_by(|a, b| a.record.created.at.cmp(&b.record.created.at));
        Ok(entries)
    }
}
