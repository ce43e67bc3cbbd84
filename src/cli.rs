//! Command-line surface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "mn-immunization",
    version,
    about = "Minnesota Immunization Data Pipeline for school districts"
)]
pub struct Cli {
    /// Path to the configuration file (JSON, or TOML by extension)
    #[arg(long)]
    pub config: PathBuf,

    /// Default log filter when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Transform immunization data from AISR format to Infinite Campus format
    Transform {
        /// Also write the records not seen in earlier runs to changes/
        #[arg(long)]
        incremental: bool,
    },
    /// Submit a bulk query to AISR for immunization records
    BulkQuery {
        /// AISR username; the password comes from AISR_PASSWORD or a prompt
        #[arg(long)]
        username: String,
    },
    /// Download vaccination records from AISR
    GetVaccinations {
        /// AISR username; the password comes from AISR_PASSWORD or a prompt
        #[arg(long)]
        username: String,
    },
}

impl Command {
    pub fn label(&self) -> &'static str {
        match self {
            Command::Transform { .. } => "transform",
            Command::BulkQuery { .. } => "bulk-query",
            Command::GetVaccinations { .. } => "get-vaccinations",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bulk_query() {
        let cli = Cli::try_parse_from([
            "mn-immunization",
            "--config",
            "config.json",
            "bulk-query",
            "--username",
            "test_user",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("config.json"));
        assert_eq!(cli.log_level, "info");
        assert_eq!(
            cli.command,
            Command::BulkQuery {
                username: "test_user".into()
            }
        );
    }

    #[test]
    fn transform_incremental_flag() {
        let cli = Cli::try_parse_from([
            "mn-immunization",
            "--config",
            "c.toml",
            "--log-level",
            "debug",
            "transform",
            "--incremental",
        ])
        .unwrap();
        assert_eq!(cli.command, Command::Transform { incremental: true });
        assert_eq!(cli.command.label(), "transform");
    }

    #[test]
    fn config_and_username_are_required() {
        assert!(Cli::try_parse_from(["mn-immunization", "transform"]).is_err());
        assert!(
            Cli::try_parse_from(["mn-immunization", "--config", "c.json", "get-vaccinations"])
                .is_err()
        );
    }
}
