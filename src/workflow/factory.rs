//! Workflow factory
//!
//! Binds configuration into ready-to-run pieces: one action value per school,
//! and an AISR workflow that knows its provider URL and credentials.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::actions::{BulkQueryAction, DownloadAction};
use crate::auth::AuthClient;
use crate::error::{AppResult, AuthError, ConfigError};
use crate::infrastructure::session::{Session, DEFAULT_REQUEST_TIMEOUT};
use crate::models::{AuthResult, Credentials, SchoolQueryInformation};
use crate::workflow::executor::{Authenticator, WorkflowAction, WorkflowExecutor, WorkflowReport};

/// One upload action per school, in school order
pub fn bulk_query_actions(
    api_base_url: &str,
    schools: &[SchoolQueryInformation],
) -> Vec<Box<dyn WorkflowAction>> {
    schools
        .iter()
        .map(|school| {
            Box::new(BulkQueryAction::new(api_base_url, school.clone())) as Box<dyn WorkflowAction>
        })
        .collect()
}

/// One download action per school, in school order
pub fn download_actions(
    api_base_url: &str,
    schools: &[SchoolQueryInformation],
    output_folder: &Path,
) -> Vec<Box<dyn WorkflowAction>> {
    schools
        .iter()
        .map(|school| {
            Box::new(DownloadAction::new(
                api_base_url,
                school.clone(),
                output_folder,
            )) as Box<dyn WorkflowAction>
        })
        .collect()
}

/// `Authenticator` backed by the real identity provider
pub struct AisrAuthenticator {
    client: AuthClient,
    credentials: Credentials,
}

impl AisrAuthenticator {
    pub fn new(client: AuthClient, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

#[async_trait]
impl Authenticator for AisrAuthenticator {
    async fn login(&self, session: &Session) -> Result<AuthResult, AuthError> {
        self.client.login(session, &self.credentials).await
    }

    async fn logout(&self, session: &Session) -> Result<(), AuthError> {
        self.client.logout(session).await
    }
}

/// AISR workflow with provider and credentials already bound
///
/// Each `run` is a fresh session with its own login and logout.
pub struct AisrWorkflow {
    authenticator: AisrAuthenticator,
    executor: WorkflowExecutor,
}

impl AisrWorkflow {
    pub fn new(auth_base_url: &str, credentials: Credentials) -> Result<Self, ConfigError> {
        Ok(Self {
            authenticator: AisrAuthenticator::new(AuthClient::new(auth_base_url)?, credentials),
            executor: WorkflowExecutor::new(DEFAULT_REQUEST_TIMEOUT),
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.executor = WorkflowExecutor::new(timeout);
        self
    }

    pub async fn run(&self, actions: &[Box<dyn WorkflowAction>]) -> AppResult<WorkflowReport> {
        self.executor.run(&self.authenticator, actions).await
    }
}
