//! HTTP surface of the rig server.

pub mod routes;

pub use routes::{build_router, run_http_server, AppState};
