use clap::{Parser, Subcommand};
use tracing::info;

use crate::config;
use crate::error::SetupError;
use crate::runtime;

#[derive(Parser)]
#[command(about = "Watches a ticketing calendar and sends WhatsApp alerts when dates open up")]
pub struct Cli {
    /// dotenv-style file with settings (defaults to CONFIG_FILE or ./.env)
    #[arg(long)]
    config: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the calendar until interrupted (default)
    Watch {
        /// Overrides CHECK_INTERVAL_MINUTES
        #[arg(long)]
        interval_minutes: Option<u64>,
    },
    /// Check the calendar once and print its status as JSON
    Check {
        /// Also send the notification if dates are available
        #[arg(long)]
        notify: bool,
    },
}

pub async fn cli(cli: Cli) -> Result<(), SetupError> {
    let mut config = runtime::load_config(cli.config.as_deref())?;
    match cli.command.unwrap_or(Commands::Watch {
        interval_minutes: None,
    }) {
        Commands::Watch { interval_minutes } => {
            if let Some(minutes) = interval_minutes {
                config.interval = config::minutes_to_duration("--interval-minutes", minutes)?;
            }
            let summary = runtime::run_watch(config).await?;
            info!(cycles = summary.cycles, backoffs = summary.backoffs, "monitor exited");
        }
        Commands::Check { notify } => {
            let (status, outcome) = runtime::run_check(config, notify).await?;
            match serde_json::to_string_pretty(&status) {
                Ok(json) => println!("{}", json),
                Err(e) => println!("Failed to render status: {}", e),
            }
            if notify {
                println!("Delivered to {} recipient(s)", outcome.delivered_count());
            }
        }
    }
    Ok(())
}
