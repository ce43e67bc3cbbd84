//! Workflow layer
//!
//! - `executor` - login → ordered actions → logout, with per-action isolation
//! - `factory` - binds configuration into actions and a ready AISR workflow

pub mod executor;
pub mod factory;

pub use executor::{
    ActionOutcome, ActionRecord, Authenticator, WorkflowAction, WorkflowExecutor, WorkflowReport,
};
pub use factory::{bulk_query_actions, download_actions, AisrAuthenticator, AisrWorkflow};
