//! HTTP API for opsdesk.
//!
//! ## Endpoints
//!
//! - `POST /command` - Interpret a free-text command and queue the task
//! - `GET /insights` - Process metrics plus recent conversation memory
//! - `GET /ping` - Health check
//! - `GET /` - Landing page
//!
//! With `OPSDESK_API_TOKEN` set, `/command` and `/insights` require
//! `Authorization: Bearer <token>`.

mod auth;
mod routes;
pub mod types;

pub use routes::{router, serve, AppState};
