//! Inbound adapters: route management and trip status over HTTP in [`http`]
//! and the live location relay over WebSocket in [`ws`].
//!
//! Both resolve the caller from gateway headers and reach the domain through
//! the driving ports only.

pub mod http;
pub mod ws;
