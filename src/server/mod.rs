//! HTTP server exposing the profile operations.
//!
//! The composed update operation (load → merge → drift-check → save →
//! re-render) lives in the route handlers; everything under
//! [`crate::profile`] stays pure.

pub mod routes;

pub use routes::{app_router, AppState};
