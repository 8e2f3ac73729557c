//! School shuttle backend library.
//!
//! Hexagonal layout: [`domain`] holds the route assignment consistency engine,
//! the trip status service and their ports, [`inbound`] adapts HTTP and
//! WebSocket traffic onto those ports, and [`outbound`] implements storage
//! with Diesel.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
