//! Mongo Provisioner
//!
//! Makes sure a MongoDB database exists and that an application user holds a
//! read/write role on it. Safe to run on every deploy: an existing user is
//! updated in place, never duplicated.

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_provisioning::{ProvisionError, inspect, provision};
use eyre::Result;
use tracing::{info, warn};

mod config;
mod output;

use config::{Config, Overrides};

#[derive(Parser)]
#[command(name = "mongo-provisioner")]
#[command(about = "Ensure a MongoDB database exists and provision a read/write user for it")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    overrides: Overrides,

    /// Print the result as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and create or update the user (default)
    Provision,

    /// Show whether the database and user are provisioned, without changing anything
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let cli = Cli::parse();
    let config = Config::load(&cli.overrides)?;
    init_tracing(&config.environment);

    info!(
        url = %config.mongodb.redacted_url(),
        database = %config.target.database,
        username = %config.target.username,
        "Loaded configuration"
    );

    let succeeded = match cli.command.unwrap_or(Commands::Provision) {
        Commands::Provision => {
            let report = provision(&config.mongodb, config.target).await;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", output::render_report(&report));
            }

            if report.is_success() {
                info!(duration_ms = report.duration_ms, "Provisioning complete");
            } else {
                warn!(
                    failures = report.failures.len(),
                    "Provisioning finished with failures"
                );
            }
            report.is_success()
        }

        Commands::Status => {
            let status = inspect(&config.mongodb, config.target)
                .await
                .map_err(with_hint)?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("{}", output::render_status(&status));
            }
            status.is_provisioned()
        }
    };

    if !succeeded {
        std::process::exit(1);
    }

    Ok(())
}

/// Put the operator hint on top of a provisioning error
fn with_hint(error: ProvisionError) -> eyre::Report {
    let hint = error.hint();
    eyre::Report::new(error).wrap_err(hint)
}
