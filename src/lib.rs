//! # mn-immunization
//!
//! Moves immunization records between Minnesota's AISR portal and Infinite
//! Campus.
//!
//! ## Architecture
//!
//! ### ① Infrastructure
//! - `infrastructure/` - `Session`: one cookie jar, a redirect-following and a
//!   no-redirect client, a fixed request timeout
//!
//! ### ② Capabilities
//! - `auth/` - identity provider login, code exchange, logout
//! - `actions/` - bulk query upload and vaccination download, one school each
//! - `etl/` - AISR export → Infinite Campus CSV, manifests, incremental diff
//!
//! ### ③ Workflow
//! - `workflow/` - login once, run every action in order, always log out
//!
//! ### ④ Orchestration
//! - `orchestrator/` - one handler per CLI command

pub mod actions;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod etl;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod utils;
pub mod workflow;

// Commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::Session;
pub use models::{AuthResult, Credentials, SchoolQueryInformation};
pub use orchestrator::App;
pub use workflow::{AisrWorkflow, WorkflowExecutor, WorkflowReport};
