//! Route assignment service: the consistency engine behind route writes.
//!
//! Every write runs inside one unit of work obtained from the store. The
//! unit is committed only when every step succeeded; on the first failure it
//! is rolled back and the failure is returned, so partial routes or partial
//! assignment sets never become visible. Exclusivity is checked through the
//! unit of work before each write, and the store re-checks it at commit.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, info, warn};

use crate::domain::Error;
use crate::domain::ids::{AssignmentId, DriverId, RouteId, SchoolId, StudentId};
use crate::domain::ports::{
    AddRouteRequest, AssignmentStore, AssignmentStoreError, AssignmentUnitOfWork,
    DeleteRouteRequest, GetRouteRequest, RouteAssignmentCommand, RouteAssignmentQuery,
    UpdateRouteRequest,
};

use super::error::RouteAssignmentError;
use super::model::{
    AssignmentBlock, AuditStamp, Route, RouteAssignment, RouteChanges, RouteSummary,
    StudentPlacement,
};
use super::view::AssembledRouteView;

/// Domain service implementing the route command and query ports.
#[derive(Clone)]
pub struct RouteAssignmentService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> RouteAssignmentService<S> {
    /// Create a service over `store`, stamping audit fields from `clock`.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

impl<S> RouteAssignmentService<S>
where
    S: AssignmentStore,
{
    /// Create a route and bind every driver block to it.
    ///
    /// # Errors
    /// Returns the first failure encountered; nothing is persisted in that
    /// case.
    pub async fn add(&self, request: &AddRouteRequest) -> Result<RouteId, RouteAssignmentError> {
        validate_blocks(&request.assignments)?;

        let mut uow = self.begin().await?;
        let outcome = self.add_steps(&mut uow, request).await;
        let route_id = settle(uow, outcome).await?;

        info!(
            %route_id,
            school_id = %request.school_id,
            actor = %request.actor,
            drivers = request.assignments.len(),
            "route added"
        );
        Ok(route_id)
    }

    /// Replace a route's fields and its set of bindings.
    ///
    /// Bindings present before and after keep their row and receive the new
    /// order. Bindings absent from the request are retired. New bindings are
    /// checked for exclusivity exactly like an add.
    ///
    /// # Errors
    /// Returns the first failure encountered; nothing is persisted in that
    /// case.
    pub async fn update(&self, request: &UpdateRouteRequest) -> Result<(), RouteAssignmentError> {
        validate_blocks(&request.assignments)?;

        let mut uow = self.begin().await?;
        let outcome = self.update_steps(&mut uow, request).await;
        settle(uow, outcome).await?;

        info!(
            route_id = %request.route_id,
            school_id = %request.school_id,
            actor = %request.actor,
            "route updated"
        );
        Ok(())
    }

    /// Soft-delete a route together with all of its bindings.
    ///
    /// # Errors
    /// [`RouteAssignmentError::RouteNotFound`] when the route is absent from
    /// the school; store failures otherwise.
    pub async fn delete(&self, request: &DeleteRouteRequest) -> Result<(), RouteAssignmentError> {
        let mut uow = self.begin().await?;
        let outcome = self.delete_steps(&mut uow, request).await;
        settle(uow, outcome).await?;

        info!(
            route_id = %request.route_id,
            school_id = %request.school_id,
            actor = %request.actor,
            "route deleted"
        );
        Ok(())
    }

    /// Assemble the nested view of one route.
    ///
    /// # Errors
    /// [`RouteAssignmentError::RouteNotFound`] when the route is absent from
    /// the school.
    pub async fn view(
        &self,
        request: GetRouteRequest,
    ) -> Result<AssembledRouteView, RouteAssignmentError> {
        let route = self
            .store
            .find_route(&request.route_id, &request.school_id)
            .await
            .map_err(store_failure)?
            .ok_or(RouteAssignmentError::RouteNotFound {
                route_id: request.route_id,
            })?;
        let rows = self
            .store
            .route_rows(&route.id, request.caller_driver_id.as_ref())
            .await
            .map_err(store_failure)?;
        debug!(route_id = %route.id, rows = rows.len(), "assembling route view");
        Ok(AssembledRouteView::assemble(&route, rows))
    }

    /// Active routes of a school.
    ///
    /// # Errors
    /// Store failures only.
    pub async fn routes_in_school(
        &self,
        school_id: &SchoolId,
    ) -> Result<Vec<RouteSummary>, RouteAssignmentError> {
        self.store
            .list_routes(school_id)
            .await
            .map_err(store_failure)
    }

    /// Active routes a driver is bound to.
    ///
    /// # Errors
    /// Store failures only.
    pub async fn routes_for_driver(
        &self,
        driver_id: &DriverId,
    ) -> Result<Vec<RouteSummary>, RouteAssignmentError> {
        self.store
            .routes_for_driver(driver_id)
            .await
            .map_err(store_failure)
    }

    async fn begin(&self) -> Result<S::UnitOfWork, RouteAssignmentError> {
        self.store.begin().await.map_err(|error| {
            warn!(%error, "failed to open unit of work");
            RouteAssignmentError::TransactionStartFailed {
                message: error.to_string(),
            }
        })
    }

    async fn add_steps(
        &self,
        uow: &mut S::UnitOfWork,
        request: &AddRouteRequest,
    ) -> Result<RouteId, RouteAssignmentError> {
        let created = AuditStamp::new(self.clock.utc(), request.actor.clone());
        let route = Route {
            id: RouteId::random(),
            school_id: request.school_id,
            name: request.name.clone(),
            description: request.description.clone(),
            created: created.clone(),
            updated: None,
        };
        let route_id = uow.insert_route(&route).await.map_err(|error| {
            RouteAssignmentError::RouteCreateFailed {
                message: error.to_string(),
            }
        })?;
        debug!(%route_id, "route row inserted");

        for block in &request.assignments {
            if uow
                .is_driver_assigned(&block.driver_id)
                .await
                .map_err(store_failure)?
            {
                return Err(RouteAssignmentError::DriverAlreadyAssigned {
                    driver_id: block.driver_id,
                });
            }
            let target = BindingTarget {
                route_id,
                school_id: request.school_id,
                driver_id: block.driver_id,
            };
            for placement in &block.students {
                insert_binding(uow, target, placement, &created).await?;
            }
        }
        Ok(route_id)
    }

    async fn update_steps(
        &self,
        uow: &mut S::UnitOfWork,
        request: &UpdateRouteRequest,
    ) -> Result<(), RouteAssignmentError> {
        let stamp = AuditStamp::new(self.clock.utc(), request.actor.clone());
        let changes = RouteChanges {
            id: request.route_id,
            school_id: request.school_id,
            name: request.name.clone(),
            description: request.description.clone(),
            updated: stamp.clone(),
        };
        uow.update_route(&changes).await.map_err(|error| match error {
            AssignmentStoreError::NotFound { .. } => RouteAssignmentError::RouteNotFound {
                route_id: request.route_id,
            },
            other => store_failure(other),
        })?;

        let requested: HashSet<(DriverId, StudentId)> = request
            .assignments
            .iter()
            .flat_map(|block| {
                block
                    .students
                    .iter()
                    .map(move |placement| (block.driver_id, placement.student_id))
            })
            .collect();

        let mut retained: HashMap<(DriverId, StudentId), RouteAssignment> = HashMap::new();
        for assignment in uow
            .route_assignments(&request.route_id)
            .await
            .map_err(store_failure)?
        {
            let binding = assignment.binding();
            if requested.contains(&binding) {
                retained.insert(binding, assignment);
            } else {
                uow.retire_assignment(&assignment.id, &stamp)
                    .await
                    .map_err(store_failure)?;
                debug!(
                    route_id = %request.route_id,
                    driver_id = %binding.0,
                    student_id = %binding.1,
                    "binding superseded"
                );
            }
        }

        for block in &request.assignments {
            let bound = uow
                .active_route_for_driver(&block.driver_id)
                .await
                .map_err(store_failure)?;
            if bound.is_some_and(|route_id| route_id != request.route_id) {
                return Err(RouteAssignmentError::DriverAlreadyAssigned {
                    driver_id: block.driver_id,
                });
            }

            let target = BindingTarget {
                route_id: request.route_id,
                school_id: request.school_id,
                driver_id: block.driver_id,
            };
            for placement in &block.students {
                match retained.remove(&(block.driver_id, placement.student_id)) {
                    Some(existing) => {
                        reorder_binding(uow, existing, placement, &stamp).await?;
                    }
                    None => insert_binding(uow, target, placement, &stamp).await?,
                }
            }
        }
        Ok(())
    }

    async fn delete_steps(
        &self,
        uow: &mut S::UnitOfWork,
        request: &DeleteRouteRequest,
    ) -> Result<(), RouteAssignmentError> {
        let not_found = RouteAssignmentError::RouteNotFound {
            route_id: request.route_id,
        };
        if !uow
            .route_exists(&request.route_id, &request.school_id)
            .await
            .map_err(store_failure)?
        {
            return Err(not_found);
        }

        let stamp = AuditStamp::new(self.clock.utc(), request.actor.clone());
        uow.delete_route_cascade(&request.route_id, &request.school_id, &stamp)
            .await
            .map_err(|error| match error {
                AssignmentStoreError::NotFound { .. } => not_found.clone(),
                other => store_failure(other),
            })
    }
}

#[derive(Debug, Clone, Copy)]
struct BindingTarget {
    route_id: RouteId,
    school_id: SchoolId,
    driver_id: DriverId,
}

/// Each driver appears in at most one block and every block lists students.
fn validate_blocks(blocks: &[AssignmentBlock]) -> Result<(), RouteAssignmentError> {
    let mut seen = HashSet::with_capacity(blocks.len());
    for block in blocks {
        if block.students.is_empty() {
            return Err(RouteAssignmentError::EmptyStudentList {
                driver_id: block.driver_id,
            });
        }
        if !seen.insert(block.driver_id) {
            return Err(RouteAssignmentError::DuplicateDriverBlock {
                driver_id: block.driver_id,
            });
        }
    }
    Ok(())
}

async fn insert_binding<U>(
    uow: &mut U,
    target: BindingTarget,
    placement: &StudentPlacement,
    stamp: &AuditStamp,
) -> Result<(), RouteAssignmentError>
where
    U: AssignmentUnitOfWork,
{
    if uow
        .is_student_assigned(&placement.student_id)
        .await
        .map_err(store_failure)?
    {
        return Err(RouteAssignmentError::StudentAlreadyAssigned {
            student_id: placement.student_id,
        });
    }

    let assignment = RouteAssignment {
        id: AssignmentId::random(),
        route_id: target.route_id,
        school_id: target.school_id,
        driver_id: target.driver_id,
        student_id: placement.student_id,
        student_order: placement.order.clone(),
        created: stamp.clone(),
        updated: None,
    };
    uow.insert_assignment(&assignment)
        .await
        .map_err(store_failure)?;
    debug!(
        route_id = %target.route_id,
        driver_id = %target.driver_id,
        student_id = %placement.student_id,
        order = %placement.order,
        "binding inserted"
    );
    Ok(())
}

async fn reorder_binding<U>(
    uow: &mut U,
    mut existing: RouteAssignment,
    placement: &StudentPlacement,
    stamp: &AuditStamp,
) -> Result<(), RouteAssignmentError>
where
    U: AssignmentUnitOfWork,
{
    let (driver_id, student_id) = existing.binding();
    existing.student_order = placement.order.clone();
    existing.updated = Some(stamp.clone());
    uow.update_assignment(&existing)
        .await
        .map_err(|error| match error {
            AssignmentStoreError::NotFound { .. } => RouteAssignmentError::AssignmentNotFound {
                driver_id,
                student_id,
            },
            other => store_failure(other),
        })
}

/// Commit on success; roll back and hand the failure back otherwise.
async fn settle<U, T>(
    uow: U,
    outcome: Result<T, RouteAssignmentError>,
) -> Result<T, RouteAssignmentError>
where
    U: AssignmentUnitOfWork,
{
    match outcome {
        Ok(value) => {
            uow.commit().await.map_err(commit_failure)?;
            Ok(value)
        }
        Err(error) => {
            debug!(code = error.code(), %error, "rolling back unit of work");
            if let Err(rollback_error) = uow.rollback().await {
                warn!(error = %rollback_error, "rollback failed; transaction discarded");
            }
            Err(error)
        }
    }
}

fn commit_failure(error: AssignmentStoreError) -> RouteAssignmentError {
    match error {
        AssignmentStoreError::DriverConflict { driver_id } => {
            RouteAssignmentError::DriverAlreadyAssigned { driver_id }
        }
        AssignmentStoreError::StudentConflict { student_id } => {
            RouteAssignmentError::StudentAlreadyAssigned { student_id }
        }
        other => {
            warn!(error = %other, "commit failed");
            RouteAssignmentError::CommitFailed {
                message: other.to_string(),
            }
        }
    }
}

fn store_failure(error: AssignmentStoreError) -> RouteAssignmentError {
    match error {
        AssignmentStoreError::Connection { message } => {
            RouteAssignmentError::StoreUnavailable { message }
        }
        AssignmentStoreError::Query { message }
        | AssignmentStoreError::ConstraintViolation { message }
        | AssignmentStoreError::NotFound { message } => {
            RouteAssignmentError::StoreFailure { message }
        }
        AssignmentStoreError::ReferenceNotFound { kind, id } => {
            RouteAssignmentError::ReferenceNotFound { kind, id }
        }
        AssignmentStoreError::DriverConflict { driver_id } => {
            RouteAssignmentError::DriverAlreadyAssigned { driver_id }
        }
        AssignmentStoreError::StudentConflict { student_id } => {
            RouteAssignmentError::StudentAlreadyAssigned { student_id }
        }
    }
}

#[async_trait]
impl<S> RouteAssignmentCommand for RouteAssignmentService<S>
where
    S: AssignmentStore,
{
    async fn add_route(&self, request: AddRouteRequest) -> Result<RouteId, Error> {
        self.add(&request).await.map_err(Error::from)
    }

    async fn update_route(&self, request: UpdateRouteRequest) -> Result<(), Error> {
        self.update(&request).await.map_err(Error::from)
    }

    async fn delete_route(&self, request: DeleteRouteRequest) -> Result<(), Error> {
        self.delete(&request).await.map_err(Error::from)
    }
}

#[async_trait]
impl<S> RouteAssignmentQuery for RouteAssignmentService<S>
where
    S: AssignmentStore,
{
    async fn get_route(&self, request: GetRouteRequest) -> Result<AssembledRouteView, Error> {
        self.view(request).await.map_err(Error::from)
    }

    async fn list_routes(&self, school_id: SchoolId) -> Result<Vec<RouteSummary>, Error> {
        self.routes_in_school(&school_id).await.map_err(Error::from)
    }

    async fn list_routes_for_driver(
        &self,
        driver_id: DriverId,
    ) -> Result<Vec<RouteSummary>, Error> {
        self.routes_for_driver(&driver_id).await.map_err(Error::from)
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
