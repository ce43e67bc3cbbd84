//! Logging utilities
//!
//! Subscriber set-up plus the banner and summary lines printed around a run

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use crate::workflow::WorkflowReport;

/// Log file name inside the configured logs folder
pub const LOG_FILE_NAME: &str = "app.log";

/// Initialize the tracing subscriber
///
/// # Arguments
/// - `level`: default filter when `RUST_LOG` is not set
/// - `logs_folder`: when given, every line is also appended to `app.log` there
///
/// # Returns
/// Path of the log file, if one is in use
pub fn init_logging(level: &str, logs_folder: Option<&Path>) -> Result<Option<PathBuf>> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let Some(folder) = logs_folder else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;
        return Ok(None);
    };

    std::fs::create_dir_all(folder)
        .with_context(|| format!("failed to create logs folder {}", folder.display()))?;
    let log_path = folder.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_ansi(false)
        .with_writer(std::io::stderr.and(Arc::new(file)))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    Ok(Some(log_path))
}

/// Startup banner for one command
pub fn log_startup(command: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 Minnesota immunization pipeline - {}", command);
    info!(
        "Started at: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
}

/// Print the final statistics of a workflow run
///
/// # Arguments
/// - `workflow`: name shown in the banner
/// - `report`: what the executor recorded
pub fn log_workflow_summary(workflow: &str, report: &WorkflowReport) {
    info!("\n{}", "=".repeat(60));
    info!("📊 {} finished", workflow);
    info!("{}", "=".repeat(60));
    info!("✅ Succeeded: {}/{}", report.succeeded(), report.total());
    info!("❌ Failed: {}", report.failed());
    for (record, err) in report.failures() {
        warn!("   - #{} {} for {}: {}", record.position + 1, record.name, record.target, err.message);
    }
    info!("{}", "=".repeat(60));
}

/// Truncate long text for log display
///
/// # Arguments
/// - `text`: original text
/// - `max_len`: maximum number of characters
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdefghij", 4), "abcd...");
        assert_eq!(truncate_text("✓✓✓✓", 2), "✓✓...");
    }
}
