//! Presentation mapper: folds flat joined rows into the nested
//! route → driver → students view.
//!
//! Pure transformation. Row order is preserved, so whatever order the store
//! returned (descending `student_order`) is the order students appear in.

use super::model::{AssignmentViewRow, DriverProfile, Route, RouteName, StudentOrder, StudentProfile};
use crate::domain::ids::RouteId;

/// Message carried by the soft-empty view of a route with no assignments.
pub const UNASSIGNED_MESSAGE: &str = "Route not assigned";

/// Route fields shown at the top of an assembled view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteHeader {
    pub id: RouteId,
    pub name: RouteName,
    pub description: String,
}

impl From<&Route> for RouteHeader {
    fn from(route: &Route) -> Self {
        Self {
            id: route.id,
            name: route.name.clone(),
            description: route.description.clone(),
        }
    }
}

/// A student's stop on a driver's run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentStop {
    pub student: StudentProfile,
    pub order: StudentOrder,
}

/// One driver and their ordered stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverRun {
    pub driver: DriverProfile,
    pub students: Vec<StudentStop>,
}

/// Nested response shape for a single route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssembledRouteView {
    /// At least one assignment exists.
    Assigned {
        route: RouteHeader,
        drivers: Vec<DriverRun>,
    },
    /// No assignment rows exist; this is a normal state, not a failure.
    Unassigned { route: RouteHeader },
}

impl AssembledRouteView {
    /// Fold `rows` under `route`.
    ///
    /// Drivers appear in the order they are first seen; a route with one
    /// driver yields a single run.
    #[must_use]
    pub fn assemble(route: &Route, rows: Vec<AssignmentViewRow>) -> Self {
        let header = RouteHeader::from(route);
        if rows.is_empty() {
            return Self::Unassigned { route: header };
        }

        let mut drivers: Vec<DriverRun> = Vec::new();
        for row in rows {
            let stop = StudentStop {
                student: row.student,
                order: row.student_order,
            };
            match drivers
                .iter_mut()
                .find(|run| run.driver.id == row.driver.id)
            {
                Some(run) => run.students.push(stop),
                None => drivers.push(DriverRun {
                    driver: row.driver,
                    students: vec![stop],
                }),
            }
        }

        Self::Assigned {
            route: header,
            drivers,
        }
    }

    /// Route header regardless of assignment state.
    #[must_use]
    pub const fn route(&self) -> &RouteHeader {
        match self {
            Self::Assigned { route, .. } | Self::Unassigned { route } => route,
        }
    }

    /// Placeholder message for the unassigned state.
    #[must_use]
    pub const fn message(&self) -> Option<&'static str> {
        match self {
            Self::Assigned { .. } => None,
            Self::Unassigned { .. } => Some(UNASSIGNED_MESSAGE),
        }
    }
}
