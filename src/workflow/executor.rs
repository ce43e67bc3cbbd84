//! Workflow executor - flow layer
//!
//! Core responsibility: run one login → ordered actions → logout cycle
//!
//! Flow:
//! 1. Create the session
//! 2. Log in exactly once
//! 3. Run every action in list order; a failing action is recorded and the
//!    next one still runs
//! 4. Log out, whatever happened above
//! 5. Drop the session

use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::{error, info, warn};

use crate::error::{ActionError, AppError, AppResult, AuthError};
use crate::infrastructure::session::{Session, DEFAULT_REQUEST_TIMEOUT};
use crate::models::AuthResult;

/// Login / logout capability the executor drives
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Rejected credentials are `Ok` with `is_successful == false`
    async fn login(&self, session: &Session) -> Result<AuthResult, AuthError>;

    async fn logout(&self, session: &Session) -> Result<(), AuthError>;
}

/// One step of a workflow, bound to a single target
#[async_trait]
pub trait WorkflowAction: Send + Sync {
    /// Short human readable kind, used in logs
    fn name(&self) -> &'static str;

    /// Identifier of the target this action runs for (a school id)
    fn target(&self) -> String;

    async fn execute(
        &self,
        session: &Session,
        access_token: &SecretString,
    ) -> Result<(), ActionError>;
}

/// Outcome of one action
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    Succeeded,
    Failed(ActionError),
}

/// What ran, in which order, and how it ended
#[derive(Debug, Clone)]
pub struct ActionRecord {
    pub position: usize,
    pub name: &'static str,
    pub target: String,
    pub outcome: ActionOutcome,
}

impl ActionRecord {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ActionOutcome::Succeeded)
    }
}

/// Result of a workflow run that got past login
#[derive(Debug, Clone, Default)]
pub struct WorkflowReport {
    pub records: Vec<ActionRecord>,
}

impl WorkflowReport {
    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| r.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ActionRecord, &ActionError)> {
        self.records.iter().filter_map(|record| match &record.outcome {
            ActionOutcome::Failed(err) => Some((record, err)),
            ActionOutcome::Succeeded => None,
        })
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }
}

/// Workflow executor
///
/// - Owns the session for the duration of `run`
/// - Never spawns; one request in flight at a time
/// - Holds no state between runs
#[derive(Debug, Clone)]
pub struct WorkflowExecutor {
    request_timeout: Duration,
}

impl Default for WorkflowExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl WorkflowExecutor {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }

    /// Run one workflow
    ///
    /// # Returns
    /// - `Ok(WorkflowReport)` once every action has been attempted
    /// - `Err(AppError::Auth)` if login failed or was rejected; no action ran
    ///   but logout was still attempted
    pub async fn run(
        &self,
        authenticator: &dyn Authenticator,
        actions: &[Box<dyn WorkflowAction>],
    ) -> AppResult<WorkflowReport> {
        let session = Session::new(self.request_timeout)?;

        let login = authenticator.login(&session).await;
        let access_token = match login {
            Ok(AuthResult {
                is_successful: true,
                access_token: Some(token),
                ..
            }) => token,
            Ok(result) => {
                error!("❌ Authentication failed: {}", result.message);
                Self::logout(authenticator, &session).await;
                return Err(AuthError::AuthenticationFailed(result.message).into());
            }
            Err(e) => {
                error!("❌ Login aborted: {}", e);
                Self::logout(authenticator, &session).await;
                return Err(AppError::Auth(e));
            }
        };

        let mut report = WorkflowReport::default();
        for (position, action) in actions.iter().enumerate() {
            let target = action.target();
            info!(
                "▶ [{}/{}] {} for {}",
                position + 1,
                actions.len(),
                action.name(),
                target
            );

            let outcome = match action.execute(&session, &access_token).await {
                Ok(()) => ActionOutcome::Succeeded,
                Err(e) => {
                    error!("⚠️ {} for {} failed: {}", action.name(), e.target, e.message);
                    ActionOutcome::Failed(e)
                }
            };

            report.records.push(ActionRecord {
                position,
                name: action.name(),
                target,
                outcome,
            });
        }

        Self::logout(authenticator, &session).await;
        Ok(report)
    }

    /// Best-effort cleanup; failure is logged only
    async fn logout(authenticator: &dyn Authenticator, session: &Session) {
        if let Err(e) = authenticator.logout(session).await {
            warn!("⚠️ Logout failed: {}", e);
        }
    }
}
