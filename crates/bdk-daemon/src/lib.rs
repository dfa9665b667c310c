//! HTTP daemon for the backdesk order service.
//!
//! Library surface so scenario tests can compose the router in-process;
//! `main.rs` is the thin binary wrapper.

pub mod api_types;
pub mod routes;
pub mod state;
