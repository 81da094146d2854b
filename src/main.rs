#![recursion_limit = "256"]

mod cli;
mod application;
mod domain;
mod data;
mod ml;
mod infra;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Console always; append-only log file only when the command asks for one.
fn init_tracing(log_file: Option<&str>) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("style_align=info".parse()?);

    let logfile = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file '{path}'"))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let console = tracing_subscriber::fmt::layer().with_target(false);
    Registry::default().with(filter).with(console).with(logfile).init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file())?;
    cli.run()
}
