//! switchboard-server
//!
//! The HTTP front door over `switchboard-pool`: configuration loading and
//! the axum routes. `main` wires the two together.
#![deny(unsafe_code)]

pub mod config;
pub mod routes;
