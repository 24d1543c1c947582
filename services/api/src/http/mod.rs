//! HTTP API of the session record store
//!
//! - POST /api/session-chat - Create a consultation record
//! - GET /api/session-chat?sessionId=<id|all> - Fetch one record or list the caller's records
//! - POST /api/medical-report - Generate and store the report of a call
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
