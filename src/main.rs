mod cli;
mod config;
mod offline;
mod store;

use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  // Keep log output off stdout; command output stays pipeable.
  let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_env("MEALPAL_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(writer)
    .init();

  let args = cli::Args::parse();
  cli::run(args).await
}
