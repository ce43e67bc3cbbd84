//! Orchestration layer
//!
//! ## Layering
//!
//! ```text
//! orchestrator::App (one CLI command)
//!     ↓
//! workflow (login → actions → logout) | etl (folder → files)
//!     ↓
//! actions / auth (one remote operation)
//!     ↓
//! infrastructure (Session: cookie jar + HTTP clients)
//! ```
//!
//! Only this layer reads configuration and credentials; everything below
//! receives plain values.

pub mod app;

pub use app::{password_from_env_or_prompt, App, PASSWORD_ENV};
