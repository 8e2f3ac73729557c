//! Caller identity extraction from identity-gateway headers.
//!
//! The gateway authenticates the caller and forwards who they are in four
//! headers. Handlers take [`CallerIdentity`] as an argument and then narrow
//! it with [`require_role`].

use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::{Ready, ready};
use tracing::debug;

use crate::domain::{CallerIdentity, DriverId, Error, Role, SchoolId, UserId, Username};

/// Account identifier header.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Role code header (`SA`, `AS`, `D`, `P`).
pub const USER_ROLE_HEADER: &str = "x-user-role";
/// School affiliation header.
pub const SCHOOL_ID_HEADER: &str = "x-school-id";
/// Account name header, recorded in audit columns.
pub const USERNAME_HEADER: &str = "x-username";

fn header<'a>(req: &'a HttpRequest, name: &'static str) -> Result<&'a str, Error> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            debug!(header = name, "identity header missing");
            Error::unauthorized("caller identity is missing")
        })
}

fn malformed(name: &'static str) -> Error {
    debug!(header = name, "identity header malformed");
    Error::unauthorized("caller identity is malformed")
}

fn caller_from_headers(req: &HttpRequest) -> Result<CallerIdentity, Error> {
    let user_id = UserId::new(header(req, USER_ID_HEADER)?).map_err(|_| malformed(USER_ID_HEADER))?;
    let role = header(req, USER_ROLE_HEADER)?
        .parse::<Role>()
        .map_err(|_| malformed(USER_ROLE_HEADER))?;
    let school_id =
        SchoolId::new(header(req, SCHOOL_ID_HEADER)?).map_err(|_| malformed(SCHOOL_ID_HEADER))?;
    let username =
        Username::new(header(req, USERNAME_HEADER)?).map_err(|_| malformed(USERNAME_HEADER))?;
    Ok(CallerIdentity {
        user_id,
        role,
        school_id,
        username,
    })
}

impl FromRequest for CallerIdentity {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(caller_from_headers(req))
    }
}

/// Roles allowed to manage a school's routes.
pub const ROUTE_MANAGERS: &[Role] = &[Role::SchoolAdmin, Role::SuperAdmin];

/// Fail with `403 Forbidden` unless the caller holds one of `allowed`.
pub fn require_role(caller: &CallerIdentity, allowed: &[Role]) -> Result<(), Error> {
    if allowed.contains(&caller.role) {
        Ok(())
    } else {
        Err(Error::forbidden(format!(
            "role {} may not perform this action",
            caller.role
        )))
    }
}

/// Narrow the caller to a driver and return their driver id.
pub fn require_driver(caller: &CallerIdentity) -> Result<DriverId, Error> {
    require_role(caller, &[Role::Driver])?;
    caller
        .driver_id()
        .ok_or_else(|| Error::forbidden("caller is not a driver"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use actix_web::test::TestRequest;
    use rstest::rstest;

    const USER: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
    const SCHOOL: &str = "6f1c2f7e-8b0a-4d3c-9a55-1f2e3d4c5b6a";

    fn request(headers: &[(&'static str, &'static str)]) -> HttpRequest {
        headers
            .iter()
            .fold(TestRequest::default(), |req, header| {
                req.insert_header(*header)
            })
            .to_http_request()
    }

    #[rstest]
    fn extracts_a_complete_identity() {
        let req = request(&[
            (USER_ID_HEADER, USER),
            (USER_ROLE_HEADER, "AS"),
            (SCHOOL_ID_HEADER, SCHOOL),
            (USERNAME_HEADER, "admin.one"),
        ]);

        let caller = caller_from_headers(&req).expect("identity");

        assert_eq!(caller.role, Role::SchoolAdmin);
        assert_eq!(caller.user_id.to_string(), USER);
        assert_eq!(caller.school_id.to_string(), SCHOOL);
        assert_eq!(caller.username.as_str(), "admin.one");
    }

    #[rstest]
    #[case(&[(USER_ROLE_HEADER, "AS"), (SCHOOL_ID_HEADER, SCHOOL), (USERNAME_HEADER, "a")])]
    #[case(&[(USER_ID_HEADER, "nope"), (USER_ROLE_HEADER, "AS"), (SCHOOL_ID_HEADER, SCHOOL), (USERNAME_HEADER, "a")])]
    #[case(&[(USER_ID_HEADER, USER), (USER_ROLE_HEADER, "janitor"), (SCHOOL_ID_HEADER, SCHOOL), (USERNAME_HEADER, "a")])]
    #[case(&[(USER_ID_HEADER, USER), (USER_ROLE_HEADER, "D"), (SCHOOL_ID_HEADER, SCHOOL), (USERNAME_HEADER, " ")])]
    fn missing_or_malformed_headers_are_unauthorised(
        #[case] headers: &[(&'static str, &'static str)],
    ) {
        let err = caller_from_headers(&request(headers)).expect_err("rejected");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[rstest]
    fn wrong_roles_are_forbidden() {
        let req = request(&[
            (USER_ID_HEADER, USER),
            (USER_ROLE_HEADER, "P"),
            (SCHOOL_ID_HEADER, SCHOOL),
            (USERNAME_HEADER, "guardian"),
        ]);
        let caller = caller_from_headers(&req).expect("identity");

        let err = require_role(&caller, ROUTE_MANAGERS).expect_err("parent rejected");
        assert_eq!(err.code(), ErrorCode::Forbidden);
        assert!(require_role(&caller, &[Role::Parent]).is_ok());
    }
}
