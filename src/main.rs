#![allow(non_snake_case)]

use std::process::ExitCode;

use bookingMonitor::cli::{self, Cli};
use bookingMonitor::runtime;
use clap::Parser;
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    runtime::init_tracing();
    let args = Cli::parse();
    match cli::cli(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal error");
            ExitCode::FAILURE
        }
    }
}
