//! HTTP surface of the attendance engine.
//!
//! Everything is mounted under `/api`; handlers translate JSON bodies into
//! service calls and wrap results in [`response::ApiResponse`].

pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;
