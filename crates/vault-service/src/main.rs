use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vault_config::ConfigLoader;

mod cli;
mod service;

use cli::{Cli, Command, LogFormat};
use service::{config_summary, validate_implementations, VaultService};

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	setup_tracing(&cli.log_level, cli.log_format)?;

	info!("Loading configuration from: {:?}", cli.config);
	let config = ConfigLoader::new()
		.with_file(&cli.config)
		.load()
		.await
		.context("Failed to load configuration")?;

	let output = match &cli.command {
		Command::Validate => {
			validate_implementations(&config)?;
			info!("Configuration is valid");
			config_summary(&config)
		}
		command => VaultService::new(config).await?.run(command).await?,
	};

	println!("{}", serde_json::to_string_pretty(&output)?);
	Ok(())
}

fn setup_tracing(log_level: &str, format: LogFormat) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	// Logs go to stderr so stdout stays machine-readable JSON.
	let registry = tracing_subscriber::registry().with(env_filter);
	match format {
		LogFormat::Text => registry
			.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
			.try_init(),
		LogFormat::Json => registry
			.with(
				tracing_subscriber::fmt::layer()
					.json()
					.with_writer(std::io::stderr),
			)
			.try_init(),
	}
	.context("Failed to install tracing subscriber")?;

	Ok(())
}
