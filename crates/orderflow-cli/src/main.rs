// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use orderflow_cli::commands;
use orderflow_config::OrgSettings;
use orderflow_persistence_mock::{MockDropzone, MockPersistence};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "orderflow", version, about = "OrderFlow admin CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a settings TOML file without applying it.
    ValidateConfig {
        /// Path to the settings TOML file.
        file: PathBuf,
    },

    /// Run the retention sweep for one org immediately, bypassing the
    /// daemon's daily schedule.
    RunRetention {
        /// Tenant to run retention for.
        #[arg(long)]
        org: Uuid,

        /// Path to a settings TOML file; spec defaults are used if omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Poll the ack dropzone for one org.
    AckPoll {
        /// Tenant to poll for.
        #[arg(long)]
        org: Uuid,

        /// Run a single sweep and exit (the only supported mode; this CLI
        /// never runs the daemon's continuous poll loop).
        #[arg(long)]
        once: bool,

        /// Ack directory to poll, relative to the dropzone root.
        #[arg(long, default_value = "ack")]
        ack_dir: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("orderflow=debug")
    } else {
        EnvFilter::try_from_env("ORDERFLOW_LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("orderflow=info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::ValidateConfig { file } => {
            let warnings = commands::validate_config_file(&file)?;
            if warnings.is_empty() {
                println!("config is valid, no warnings");
            } else {
                for warning in &warnings {
                    println!("warning: {warning}");
                }
            }
        }
        Commands::RunRetention { org, config } => {
            let settings = match config {
                Some(path) => {
                    let content = std::fs::read_to_string(&path)?;
                    orderflow_config::parse_toml(&content)?
                }
                None => OrgSettings::default(),
            };
            // Stands in for a real persistence adapter, which this crate
            // lay-down does not build (see `orderflow-ports`); a real
            // deployment wires its own `PersistencePort` here.
            let persistence = MockPersistence::default();
            let summary = commands::run_retention(&persistence, org, &settings, Utc::now()).await?;
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                "documents_soft_deleted": summary.documents_soft_deleted,
                "ai_call_logs_hard_deleted": summary.ai_call_logs_hard_deleted,
            }))?);
        }
        Commands::AckPoll { org, once, ack_dir } => {
            if !once {
                anyhow::bail!("continuous ack-poll runs in orderflow-daemon; pass --once here");
            }
            let persistence = MockPersistence::default();
            let dropzone = MockDropzone::default();
            let summary = commands::ack_poll(&persistence, &dropzone, org, &ack_dir).await?;
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                "acked": summary.acked,
                "failed": summary.failed,
                "malformed": summary.malformed,
                "ignored_duplicate": summary.ignored_duplicate,
                "unmatched": summary.unmatched,
            }))?);
        }
    }

    Ok(())
}
