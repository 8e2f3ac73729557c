//! Request and response bodies for the route endpoints.
//!
//! Bodies carry raw strings; parsing into domain types happens here so a
//! malformed identifier is reported against the field the client sent.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    AssembledRouteView, AssignmentBlock, DriverId, DriverRun, Error, RouteId, RouteName,
    RouteSummary, StudentId, StudentPlacement, StudentStop,
};
use crate::inbound::http::validation::{FieldName, invalid_value_error, parse_id};

/// Route create/update payload.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequestBody {
    #[schema(example = "Route A")]
    pub route_name: String,
    #[serde(default)]
    pub route_description: String,
    #[serde(default)]
    #[schema(max_items = 200)]
    pub assignments: Vec<AssignmentBody>,
}

/// One driver and the students on their run.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentBody {
    #[schema(format = "uuid")]
    pub driver_id: String,
    #[serde(default)]
    #[schema(max_items = 500)]
    pub students: Vec<StudentPlacementBody>,
}

/// A student and their pickup order.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentPlacementBody {
    #[schema(format = "uuid")]
    pub student_id: String,
    /// Non-zero pickup-sequence token.
    #[schema(example = "1")]
    pub student_order: String,
}

/// Parsed route payload ready for the command port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedRouteBody {
    pub name: RouteName,
    pub description: String,
    pub assignments: Vec<AssignmentBlock>,
}

impl TryFrom<RouteRequestBody> for ParsedRouteBody {
    type Error = Error;

    fn try_from(body: RouteRequestBody) -> Result<Self, Self::Error> {
        let name = RouteName::new(body.route_name)
            .map_err(|err| invalid_value_error(FieldName::new("routeName"), err.to_string()))?;
        let assignments = body
            .assignments
            .into_iter()
            .map(parse_block)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name,
            description: body.route_description.trim().to_owned(),
            assignments,
        })
    }
}

fn parse_block(body: AssignmentBody) -> Result<AssignmentBlock, Error> {
    let driver_id: DriverId = parse_id(&body.driver_id, FieldName::new("driverId"))?;
    let students = body
        .students
        .into_iter()
        .map(|student| {
            let student_id: StudentId = parse_id(&student.student_id, FieldName::new("studentId"))?;
            StudentPlacement::parse(student_id, student.student_order).map_err(Error::from)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(AssignmentBlock {
        driver_id,
        students,
    })
}

/// Identifier of a freshly created route.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteCreatedBody {
    #[schema(format = "uuid")]
    pub route_id: String,
}

impl From<RouteId> for RouteCreatedBody {
    fn from(route_id: RouteId) -> Self {
        Self {
            route_id: route_id.to_string(),
        }
    }
}

/// Listing entry for a route.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummaryBody {
    #[schema(format = "uuid")]
    pub route_id: String,
    pub route_name: String,
    pub route_description: String,
    #[schema(format = "date-time")]
    pub created_at: String,
}

impl From<RouteSummary> for RouteSummaryBody {
    fn from(summary: RouteSummary) -> Self {
        Self {
            route_id: summary.id.to_string(),
            route_name: summary.name.into(),
            route_description: summary.description,
            created_at: summary.created_at.to_rfc3339(),
        }
    }
}

/// A student's stop on a driver's run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentStopBody {
    #[schema(format = "uuid")]
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub pickup_point: Option<String>,
    pub student_order: String,
}

impl From<StudentStop> for StudentStopBody {
    fn from(stop: StudentStop) -> Self {
        Self {
            student_id: stop.student.id.to_string(),
            first_name: stop.student.first_name,
            last_name: stop.student.last_name,
            pickup_point: stop.student.pickup_point,
            student_order: stop.order.into(),
        }
    }
}

/// One driver, their vehicle, and their ordered stops.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DriverRunBody {
    #[schema(format = "uuid")]
    pub driver_id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub vehicle_name: Option<String>,
    pub vehicle_number: Option<String>,
    pub students: Vec<StudentStopBody>,
}

impl From<DriverRun> for DriverRunBody {
    fn from(run: DriverRun) -> Self {
        Self {
            driver_id: run.driver.id.to_string(),
            username: run.driver.username,
            first_name: run.driver.first_name,
            last_name: run.driver.last_name,
            vehicle_name: run.driver.vehicle_name,
            vehicle_number: run.driver.vehicle_number,
            students: run.students.into_iter().map(StudentStopBody::from).collect(),
        }
    }
}

/// Assembled route view.
///
/// A route without assignments has no drivers and carries `message`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteViewBody {
    #[schema(format = "uuid")]
    pub route_id: String,
    pub route_name: String,
    pub route_description: String,
    pub drivers: Vec<DriverRunBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Route not assigned")]
    pub message: Option<String>,
}

impl From<AssembledRouteView> for RouteViewBody {
    fn from(view: AssembledRouteView) -> Self {
        let message = view.message().map(str::to_owned);
        let (route, drivers) = match view {
            AssembledRouteView::Assigned { route, drivers } => (route, drivers),
            AssembledRouteView::Unassigned { route } => (route, Vec::new()),
        };
        Self {
            route_id: route.id.to_string(),
            route_name: route.name.into(),
            route_description: route.description,
            drivers: drivers.into_iter().map(DriverRunBody::from).collect(),
            message,
        }
    }
}
