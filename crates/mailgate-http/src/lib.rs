//! MailGate HTTP - the auth protocol endpoint
//!
//! This crate provides the HTTP surface a mail proxy queries: the
//! `/auth` protocol endpoint and health checks.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
