//! idlemove: ServerQuery AFK mover binary.
//! Polls a voice server on a fixed interval and relocates idle clients
//! into the configured AFK channel.

use clap::Parser;

mod cli;
mod config;
mod poll_loop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let filter = std::env::var("IDLEMOVE_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    match args.command {
        cli::Command::Run(opts) => {
            tracing::info!("idlemove starting");
            poll_loop::run(opts).await?;
        }
        cli::Command::Plan(opts) => {
            poll_loop::plan(opts).await?;
        }
    }

    Ok(())
}
