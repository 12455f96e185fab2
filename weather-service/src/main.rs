//! Binary crate for the `weather-service` executable.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Loading configuration
//! - Binding and serving the gateway or resolver router

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cmd.run().await
}
