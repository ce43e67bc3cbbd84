//! Command handlers - orchestration layer
//!
//! ## Responsibilities
//!
//! 1. **Validate**: turn the loaded configuration into the inputs a command needs
//! 2. **Credentials**: read the password from `AISR_PASSWORD` or a hidden prompt
//! 3. **Dispatch**: run the ETL or build and run an AISR workflow
//! 4. **Report**: print the final statistics
//!
//! Per-action failures only show up in the report and the log. Authentication
//! failures and configuration errors end the command with an error.

use std::future::Future;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Local;
use secrecy::SecretString;
use tracing::info;

use crate::cli::Command;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::etl::{self, EtlSummary};
use crate::models::Credentials;
use crate::utils::logging::log_workflow_summary;
use crate::workflow::{
    bulk_query_actions, download_actions, AisrWorkflow, WorkflowAction, WorkflowReport,
};

/// Environment variable holding the AISR password
pub const PASSWORD_ENV: &str = "AISR_PASSWORD";

/// Application entry point for one command
pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a parsed command
    pub async fn run(&self, command: &Command) -> Result<()> {
        self.run_with_password(command, password_from_env_or_prompt).await
    }

    /// Run a parsed command, asking `read_password` for the AISR password
    ///
    /// The password is only requested once the command's configuration has
    /// been validated.
    pub async fn run_with_password<F, Fut>(&self, command: &Command, read_password: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SecretString>>,
    {
        match command {
            Command::Transform { incremental } => {
                let summary = self.handle_transform(*incremental)?;
                if summary.processed.is_empty() && !summary.failed.is_empty() {
                    bail!("no input file could be transformed");
                }
                Ok(())
            }
            Command::BulkQuery { username } => {
                let plan = self.bulk_query_plan()?;
                let credentials = credentials(username, read_password().await?);
                let report = self
                    .run_plan(plan, credentials)
                    .await
                    .map_err(authentication_message)?;
                log_workflow_summary("Bulk query", &report);
                info!("✓ Bulk query completed");
                Ok(())
            }
            Command::GetVaccinations { username } => {
                let plan = self.download_plan().await?;
                let credentials = credentials(username, read_password().await?);
                let report = self
                    .run_plan(plan, credentials)
                    .await
                    .map_err(authentication_message)?;
                log_workflow_summary("Vaccination download", &report);
                info!("✓ Vaccination download completed");
                Ok(())
            }
        }
    }

    /// Transform every AISR export in `input_folder` into `output_folder`
    pub fn handle_transform(&self, incremental: bool) -> AppResult<EtlSummary> {
        info!("Transform command started");
        let (input_folder, output_folder) = self.config.transform_folders()?;

        let summary = etl::run_etl_on_folder(&input_folder, &output_folder)?;

        if incremental {
            let result =
                etl::process_incremental_vaccinations(&output_folder, Local::now().date_naive())?;
            info!(
                "📊 Incremental: {} new of {} current records → {}",
                result.new_records,
                result.current_records,
                result.diff_file.display()
            );
        }

        info!("Transform command finished");
        Ok(summary)
    }

    /// Upload each school's bulk query file
    pub async fn handle_bulk_query(&self, credentials: Credentials) -> AppResult<WorkflowReport> {
        let plan = self.bulk_query_plan()?;
        self.run_plan(plan, credentials).await
    }

    /// Download each school's latest vaccination file
    pub async fn handle_get_vaccinations(
        &self,
        credentials: Credentials,
    ) -> AppResult<WorkflowReport> {
        let plan = self.download_plan().await?;
        self.run_plan(plan, credentials).await
    }

    fn bulk_query_plan(&self) -> AppResult<WorkflowPlan<'_>> {
        info!("Bulk query command started");
        let (auth_url, api_url) = self.config.api_urls()?;
        let schools = self.config.bulk_query_schools()?;

        Ok(WorkflowPlan {
            auth_url,
            actions: bulk_query_actions(api_url, &schools),
        })
    }

    async fn download_plan(&self) -> AppResult<WorkflowPlan<'_>> {
        info!("Starting download of vaccination records");
        let (auth_url, api_url) = self.config.api_urls()?;
        let downloads_folder: PathBuf = self.config.downloads_folder()?;
        let schools = self.config.download_schools()?;
        tokio::fs::create_dir_all(&downloads_folder).await?;

        Ok(WorkflowPlan {
            auth_url,
            actions: download_actions(api_url, &schools, &downloads_folder),
        })
    }

    async fn run_plan(
        &self,
        plan: WorkflowPlan<'_>,
        credentials: Credentials,
    ) -> AppResult<WorkflowReport> {
        AisrWorkflow::new(plan.auth_url, credentials)?
            .with_request_timeout(self.config.request_timeout())
            .run(&plan.actions)
            .await
    }
}

/// Validated inputs of one AISR command, waiting for credentials
struct WorkflowPlan<'a> {
    auth_url: &'a str,
    actions: Vec<Box<dyn WorkflowAction>>,
}

fn credentials(username: &str, password: SecretString) -> Credentials {
    Credentials {
        username: username.to_string(),
        password,
    }
}

/// `AISR_PASSWORD`, or a hidden prompt on the terminal
pub async fn password_from_env_or_prompt() -> Result<SecretString> {
    if let Some(password) = std::env::var(PASSWORD_ENV).ok().filter(|p| !p.is_empty()) {
        return Ok(SecretString::from(password));
    }

    let password = tokio::task::spawn_blocking(|| {
        rpassword::prompt_password("Enter your AISR password: ")
    })
    .await
    .context("password prompt task failed")?
    .context("failed to read password")?;

    Ok(SecretString::from(password))
}

fn authentication_message(err: AppError) -> anyhow::Error {
    if err.is_authentication_failure() {
        anyhow::anyhow!("authentication failed: {}", err)
    } else {
        anyhow::Error::new(err)
    }
}
