//! spool - package repository builder CLI

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use spool_cli::{Cli, ConsoleReporter};
use spool_core::{Reporter, build_repository};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let reporter = Arc::new(ConsoleReporter);

    println!("spool {}", env!("CARGO_PKG_VERSION"));
    let config = cli.load_config(reporter.as_ref());

    let summary = build_repository(&cli.run_options(), &config, reporter.clone())
        .await
        .context("repository build failed")?;

    reporter.info(&format!(
        "wrote {} ({} packages)",
        summary.index_path.display(),
        summary.published
    ));
    Ok(())
}
