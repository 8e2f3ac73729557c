//! In-memory [`AssignmentStore`] with snapshot units of work.
//!
//! A unit of work copies the committed state when it opens and records every
//! write it makes. Point checks read the copy, so they see the unit's own
//! writes but nothing committed by others since. Commit replays the recorded
//! writes on top of the latest committed state and re-checks exclusivity, the
//! way a database's unique indexes would, before publishing the result.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::ids::{AssignmentId, DriverId, RouteId, SchoolId, StudentId};
use crate::domain::ports::{
    AssignmentStore, AssignmentStoreError, AssignmentUnitOfWork, DirectoryKind,
};
use crate::domain::routes::{
    AssignmentViewRow, AuditStamp, DriverProfile, Route, RouteAssignment, RouteChanges,
    RouteSummary, StudentProfile,
};
use crate::domain::trips::RouteBinding;

#[derive(Debug, Clone)]
struct StoredRoute {
    route: Route,
    deleted: Option<AuditStamp>,
}

#[derive(Debug, Clone)]
struct StoredAssignment {
    assignment: RouteAssignment,
    deleted: Option<AuditStamp>,
}

#[derive(Debug, Clone)]
enum WriteOp {
    InsertRoute(Route),
    InsertAssignment(RouteAssignment),
    UpdateRoute(RouteChanges),
    UpdateAssignment(RouteAssignment),
    Retire(AssignmentId, AuditStamp),
    DeleteCascade(RouteId, SchoolId, AuditStamp),
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    routes: HashMap<RouteId, StoredRoute>,
    assignments: Vec<StoredAssignment>,
    drivers: HashMap<DriverId, (SchoolId, DriverProfile)>,
    students: HashMap<StudentId, (SchoolId, StudentProfile)>,
}

impl StoreState {
    fn active_route(&self, route_id: &RouteId, school_id: &SchoolId) -> Option<&Route> {
        self.routes
            .get(route_id)
            .filter(|stored| stored.deleted.is_none() && stored.route.school_id == *school_id)
            .map(|stored| &stored.route)
    }

    fn active_assignments(&self) -> impl Iterator<Item = &RouteAssignment> {
        self.assignments
            .iter()
            .filter(|stored| stored.deleted.is_none())
            .map(|stored| &stored.assignment)
    }

    fn active_assignment_mut(&mut self, id: &AssignmentId) -> Option<&mut StoredAssignment> {
        self.assignments
            .iter_mut()
            .find(|stored| stored.deleted.is_none() && stored.assignment.id == *id)
    }

    fn apply(&mut self, op: &WriteOp) -> Result<(), AssignmentStoreError> {
        match op {
            WriteOp::InsertRoute(route) => {
                self.routes.insert(
                    route.id,
                    StoredRoute {
                        route: route.clone(),
                        deleted: None,
                    },
                );
            }
            WriteOp::InsertAssignment(assignment) => {
                self.check_references(assignment)?;
                if self
                    .active_route(&assignment.route_id, &assignment.school_id)
                    .is_none()
                {
                    return Err(AssignmentStoreError::not_found(format!(
                        "route {}",
                        assignment.route_id
                    )));
                }
                self.assignments.push(StoredAssignment {
                    assignment: assignment.clone(),
                    deleted: None,
                });
            }
            WriteOp::UpdateRoute(changes) => {
                let stored = self
                    .routes
                    .get_mut(&changes.id)
                    .filter(|stored| {
                        stored.deleted.is_none() && stored.route.school_id == changes.school_id
                    })
                    .ok_or_else(|| {
                        AssignmentStoreError::not_found(format!("route {}", changes.id))
                    })?;
                stored.route.name = changes.name.clone();
                stored.route.description = changes.description.clone();
                stored.route.updated = Some(changes.updated.clone());
            }
            WriteOp::UpdateAssignment(assignment) => {
                let stored = self.active_assignment_mut(&assignment.id).ok_or_else(|| {
                    AssignmentStoreError::not_found(format!("assignment {}", assignment.id))
                })?;
                stored.assignment.student_order = assignment.student_order.clone();
                stored.assignment.updated = assignment.updated.clone();
            }
            WriteOp::Retire(id, stamp) => {
                let stored = self.active_assignment_mut(id).ok_or_else(|| {
                    AssignmentStoreError::not_found(format!("assignment {id}"))
                })?;
                stored.deleted = Some(stamp.clone());
            }
            WriteOp::DeleteCascade(route_id, school_id, stamp) => {
                let stored = self
                    .routes
                    .get_mut(route_id)
                    .filter(|stored| {
                        stored.deleted.is_none() && stored.route.school_id == *school_id
                    })
                    .ok_or_else(|| AssignmentStoreError::not_found(format!("route {route_id}")))?;
                stored.deleted = Some(stamp.clone());
                for assignment in self
                    .assignments
                    .iter_mut()
                    .filter(|stored| {
                        stored.deleted.is_none()
                            && stored.assignment.route_id == *route_id
                            && stored.assignment.school_id == *school_id
                    })
                {
                    assignment.deleted = Some(stamp.clone());
                }
            }
        }
        Ok(())
    }

    fn check_references(&self, assignment: &RouteAssignment) -> Result<(), AssignmentStoreError> {
        let driver_known = self
            .drivers
            .get(&assignment.driver_id)
            .is_some_and(|(school_id, _)| *school_id == assignment.school_id);
        if !driver_known {
            return Err(AssignmentStoreError::reference_not_found(
                DirectoryKind::Driver,
                *assignment.driver_id.as_uuid(),
            ));
        }
        let student_known = self
            .students
            .get(&assignment.student_id)
            .is_some_and(|(school_id, _)| *school_id == assignment.school_id);
        if !student_known {
            return Err(AssignmentStoreError::reference_not_found(
                DirectoryKind::Student,
                *assignment.student_id.as_uuid(),
            ));
        }
        Ok(())
    }

    /// Exclusivity backstop applied at commit.
    fn check_exclusivity(&self) -> Result<(), AssignmentStoreError> {
        let mut students = HashSet::new();
        let mut drivers: HashMap<DriverId, RouteId> = HashMap::new();
        for assignment in self.active_assignments() {
            if !students.insert(assignment.student_id) {
                return Err(AssignmentStoreError::student_conflict(assignment.student_id));
            }
            let bound = drivers
                .entry(assignment.driver_id)
                .or_insert(assignment.route_id);
            if *bound != assignment.route_id {
                return Err(AssignmentStoreError::driver_conflict(assignment.driver_id));
            }
        }
        Ok(())
    }

    fn summary(&self, route_id: &RouteId) -> Option<RouteSummary> {
        self.routes
            .get(route_id)
            .filter(|stored| stored.deleted.is_none())
            .map(|stored| RouteSummary::from(&stored.route))
    }
}

#[derive(Default)]
struct Controls {
    unavailable: bool,
    fail_next_commit: bool,
    rival: Option<InMemoryUnitOfWork>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<StoreState>,
    controls: Mutex<Controls>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn controls(&self) -> MutexGuard<'_, Controls> {
        self.controls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_available(&self) -> Result<(), AssignmentStoreError> {
        if self.controls().unavailable {
            return Err(AssignmentStoreError::connection("store marked unavailable"));
        }
        Ok(())
    }
}

/// Thread-safe in-memory assignment store for tests.
#[derive(Clone, Default)]
pub struct InMemoryAssignmentStore {
    shared: Arc<Shared>,
}

impl InMemoryAssignmentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a driver to a school's directory.
    pub fn register_driver(&self, school_id: SchoolId, profile: DriverProfile) {
        self.shared
            .state()
            .drivers
            .insert(profile.id, (school_id, profile));
    }

    /// Add a student to a school's directory.
    pub fn register_student(&self, school_id: SchoolId, profile: StudentProfile) {
        self.shared
            .state()
            .students
            .insert(profile.id, (school_id, profile));
    }

    /// Make every subsequent call fail with a connection error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.controls().unavailable = unavailable;
    }

    /// Make the next commit fail without publishing anything.
    pub fn fail_next_commit(&self) {
        self.shared.controls().fail_next_commit = true;
    }

    /// Commit `rival` immediately before the next unit of work commits.
    ///
    /// Simulates a concurrent writer that passed its point checks at the
    /// same time as the next operation.
    pub fn commit_first_on_next_commit(&self, rival: InMemoryUnitOfWork) {
        self.shared.controls().rival = Some(rival);
    }

    /// Committed active assignments, in insertion order.
    #[must_use]
    pub fn active_assignments(&self) -> Vec<RouteAssignment> {
        self.shared.state().active_assignments().cloned().collect()
    }

    /// Committed soft-deleted assignments with their deletion stamp.
    #[must_use]
    pub fn retired_assignments(&self) -> Vec<(RouteAssignment, AuditStamp)> {
        self.shared
            .state()
            .assignments
            .iter()
            .filter_map(|stored| {
                stored
                    .deleted
                    .clone()
                    .map(|stamp| (stored.assignment.clone(), stamp))
            })
            .collect()
    }

    /// Committed route by identifier, including soft-deleted ones.
    #[must_use]
    pub fn stored_route(&self, route_id: &RouteId) -> Option<(Route, Option<AuditStamp>)> {
        self.shared
            .state()
            .routes
            .get(route_id)
            .map(|stored| (stored.route.clone(), stored.deleted.clone()))
    }

    /// Number of committed routes that are not soft-deleted.
    #[must_use]
    pub fn active_route_count(&self) -> usize {
        self.shared
            .state()
            .routes
            .values()
            .filter(|stored| stored.deleted.is_none())
            .count()
    }

    /// Route and school of the active assignment binding `driver_id` to
    /// `student_id`, if any.
    #[must_use]
    pub fn binding_for(
        &self,
        driver_id: &DriverId,
        student_id: &StudentId,
    ) -> Option<RouteBinding> {
        let state = self.shared.state();
        state
            .active_assignments()
            .find(|assignment| {
                assignment.driver_id == *driver_id && assignment.student_id == *student_id
            })
            .filter(|assignment| {
                state
                    .active_route(&assignment.route_id, &assignment.school_id)
                    .is_some()
            })
            .map(|assignment| RouteBinding {
                route_id: assignment.route_id,
                school_id: assignment.school_id,
            })
    }

    /// Registered profile of a student.
    #[must_use]
    pub fn student(&self, student_id: &StudentId) -> Option<StudentProfile> {
        self.shared
            .state()
            .students
            .get(student_id)
            .map(|(_, profile)| profile.clone())
    }

    /// Whether [`Self::set_unavailable`] is in force.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        self.shared.controls().unavailable
    }
}

/// Unit of work over an [`InMemoryAssignmentStore`].
pub struct InMemoryUnitOfWork {
    shared: Arc<Shared>,
    working: StoreState,
    ops: Vec<WriteOp>,
}

impl InMemoryUnitOfWork {
    fn record(&mut self, op: WriteOp) -> Result<(), AssignmentStoreError> {
        self.shared.ensure_available()?;
        self.working.apply(&op)?;
        self.ops.push(op);
        Ok(())
    }

    fn publish(self) -> Result<(), AssignmentStoreError> {
        let mut committed = self.shared.state();
        let mut next = committed.clone();
        for op in &self.ops {
            next.apply(op)?;
        }
        next.check_exclusivity()?;
        *committed = next;
        Ok(())
    }
}

#[async_trait]
impl AssignmentUnitOfWork for InMemoryUnitOfWork {
    async fn insert_route(&mut self, route: &Route) -> Result<RouteId, AssignmentStoreError> {
        self.record(WriteOp::InsertRoute(route.clone()))?;
        Ok(route.id)
    }

    async fn insert_assignment(
        &mut self,
        assignment: &RouteAssignment,
    ) -> Result<(), AssignmentStoreError> {
        self.record(WriteOp::InsertAssignment(assignment.clone()))
    }

    async fn active_route_for_driver(
        &mut self,
        driver_id: &DriverId,
    ) -> Result<Option<RouteId>, AssignmentStoreError> {
        self.shared.ensure_available()?;
        Ok(self
            .working
            .active_assignments()
            .find(|assignment| assignment.driver_id == *driver_id)
            .map(|assignment| assignment.route_id))
    }

    async fn active_route_for_student(
        &mut self,
        student_id: &StudentId,
    ) -> Result<Option<RouteId>, AssignmentStoreError> {
        self.shared.ensure_available()?;
        Ok(self
            .working
            .active_assignments()
            .find(|assignment| assignment.student_id == *student_id)
            .map(|assignment| assignment.route_id))
    }

    async fn route_exists(
        &mut self,
        route_id: &RouteId,
        school_id: &SchoolId,
    ) -> Result<bool, AssignmentStoreError> {
        self.shared.ensure_available()?;
        Ok(self.working.active_route(route_id, school_id).is_some())
    }

    async fn route_assignments(
        &mut self,
        route_id: &RouteId,
    ) -> Result<Vec<RouteAssignment>, AssignmentStoreError> {
        self.shared.ensure_available()?;
        Ok(self
            .working
            .active_assignments()
            .filter(|assignment| assignment.route_id == *route_id)
            .cloned()
            .collect())
    }

    async fn update_route(&mut self, changes: &RouteChanges) -> Result<(), AssignmentStoreError> {
        self.record(WriteOp::UpdateRoute(changes.clone()))
    }

    async fn update_assignment(
        &mut self,
        assignment: &RouteAssignment,
    ) -> Result<(), AssignmentStoreError> {
        self.record(WriteOp::UpdateAssignment(assignment.clone()))
    }

    async fn retire_assignment(
        &mut self,
        assignment_id: &AssignmentId,
        deletion: &AuditStamp,
    ) -> Result<(), AssignmentStoreError> {
        self.record(WriteOp::Retire(*assignment_id, deletion.clone()))
    }

    async fn delete_route_cascade(
        &mut self,
        route_id: &RouteId,
        school_id: &SchoolId,
        deletion: &AuditStamp,
    ) -> Result<(), AssignmentStoreError> {
        self.record(WriteOp::DeleteCascade(
            *route_id,
            *school_id,
            deletion.clone(),
        ))
    }

    async fn commit(self) -> Result<(), AssignmentStoreError> {
        let (fail, rival) = {
            let mut controls = self.shared.controls();
            let fail = std::mem::take(&mut controls.fail_next_commit);
            (fail, controls.rival.take())
        };
        if let Some(rival) = rival {
            rival.publish()?;
        }
        if fail {
            return Err(AssignmentStoreError::query("commit rejected by test store"));
        }
        self.publish()
    }

    async fn rollback(self) -> Result<(), AssignmentStoreError> {
        Ok(())
    }
}

#[async_trait]
impl AssignmentStore for InMemoryAssignmentStore {
    type UnitOfWork = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<Self::UnitOfWork, AssignmentStoreError> {
        self.shared.ensure_available()?;
        let working = self.shared.state().clone();
        Ok(InMemoryUnitOfWork {
            shared: Arc::clone(&self.shared),
            working,
            ops: Vec::new(),
        })
    }

    async fn find_route(
        &self,
        route_id: &RouteId,
        school_id: &SchoolId,
    ) -> Result<Option<Route>, AssignmentStoreError> {
        self.shared.ensure_available()?;
        Ok(self.shared.state().active_route(route_id, school_id).cloned())
    }

    async fn route_rows(
        &self,
        route_id: &RouteId,
        driver: Option<&DriverId>,
    ) -> Result<Vec<AssignmentViewRow>, AssignmentStoreError> {
        self.shared.ensure_available()?;
        let state = self.shared.state();
        let mut matched: Vec<&RouteAssignment> = state
            .active_assignments()
            .filter(|assignment| assignment.route_id == *route_id)
            .filter(|assignment| driver.is_none_or(|id| assignment.driver_id == *id))
            .collect();
        matched.sort_by(|left, right| {
            right
                .student_order
                .as_str()
                .cmp(left.student_order.as_str())
                .then(left.created.at.cmp(&right.created.at))
        });
        Ok(matched
            .into_iter()
            .filter_map(|assignment| {
                let (_, driver) = state.drivers.get(&assignment.driver_id)?;
                let (_, student) = state.students.get(&assignment.student_id)?;
                Some(AssignmentViewRow {
                    route_id: assignment.route_id,
                    driver: driver.clone(),
                    student: student.clone(),
                    student_order: assignment.student_order.clone(),
                })
            })
            .collect())
    }

    async fn list_routes(
        &self,
        school_id: &SchoolId,
    ) -> Result<Vec<RouteSummary>, AssignmentStoreError> {
        self.shared.ensure_available()?;
        let state = self.shared.state();
        let mut summaries: Vec<RouteSummary> = state
            .routes
            .values()
            .filter(|stored| stored.deleted.is_none() && stored.route.school_id == *school_id)
            .map(|stored| RouteSummary::from(&stored.route))
            .collect();
        summaries.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(summaries)
    }

    async fn routes_for_driver(
        &self,
        driver_id: &DriverId,
    ) -> Result<Vec<RouteSummary>, AssignmentStoreError> {
        self.shared.ensure_available()?;
        let state = self.shared.state();
        let mut seen = HashSet::new();
        Ok(state
            .active_assignments()
            .filter(|assignment| assignment.driver_id == *driver_id)
            .filter(|assignment| seen.insert(assignment.route_id))
            .filter_map(|assignment| state.summary(&assignment.route_id))
            .collect())
    }
}
