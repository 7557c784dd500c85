use anyhow::{Context, anyhow};
use clap::Parser;
use std::process;
use telemetry_harvester::cli::{args::Args, commands};

fn main() {
    let args = Args::parse();

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result: anyhow::Result<()> = runtime.block_on(async {
        tokio::select! {
            result = commands::run(args) => result.context("Harvest aborted"),
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => Err(anyhow!("Interrupted by user")),
                Err(e) => Err(anyhow!("Failed to listen for CTRL+C: {}", e)),
            },
        }
    });

    if let Err(error) = result {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}
