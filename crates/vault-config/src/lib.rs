//! Configuration loading for the vault router.
//!
//! The file is TOML. `${VAR}` and `${VAR:-default}` references are replaced
//! from the environment before parsing, so keys and endpoints can stay out
//! of the file.

use regex::Regex;
use std::env;
use std::path::Path;
use thiserror::Error;
use vault_types::SolverKind;

pub mod types;

pub use types::{Config, ImplementationConfig, RouterConfig, VaultEntry};

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Configuration loader with environment variable substitution
#[derive(Default)]
pub struct ConfigLoader {
	file_path: Option<String>,
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub async fn load(&self) -> Result<Config, ConfigError> {
		let file_path = self.file_path.as_ref().ok_or_else(|| {
			ConfigError::FileNotFound("No configuration file specified".to_string())
		})?;
		if !Path::new(file_path).exists() {
			return Err(ConfigError::FileNotFound(file_path.clone()));
		}

		tracing::info!(path = %file_path, "Loading configuration");
		let content = tokio::fs::read_to_string(file_path).await?;
		Self::parse(&content)
	}

	/// Parses and validates configuration text.
	pub fn parse(content: &str) -> Result<Config, ConfigError> {
		let substituted = substitute_env_vars(content)?;
		let config: Config =
			toml::from_str(&substituted).map_err(|e| ConfigError::ParseError(e.to_string()))?;
		validate_config(&config)?;
		Ok(config)
	}
}

/// Replaces `${VAR}` and `${VAR:-default}`. A variable that is unset and
/// has no default is an error.
pub fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
		.map_err(|e| ConfigError::ParseError(e.to_string()))?;

	let mut result = String::with_capacity(content.len());
	let mut last = 0;
	for cap in re.captures_iter(content) {
		let Some(full_match) = cap.get(0) else {
			continue;
		};
		let var_name = &cap[1];
		let value = match (env::var(var_name), cap.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => return Err(ConfigError::EnvVarNotFound(var_name.to_string())),
		};
		result.push_str(&content[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&content[last..]);
	Ok(result)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
	let chain_id = config.router.chain_id;
	if chain_id == 0 {
		return Err(ConfigError::ValidationError(
			"router.chain_id must be non-zero".to_string(),
		));
	}
	if config.router.poll_interval_ms == 0 {
		return Err(ConfigError::ValidationError(
			"router.poll_interval_ms must be non-zero".to_string(),
		));
	}

	if config.vaults.is_empty() {
		return Err(ConfigError::ValidationError(format!(
			"No vaults configured for chain {chain_id}"
		)));
	}

	for vault in &config.vaults {
		for (role, address) in [("address", &vault.address), ("asset", &vault.asset)] {
			if config.token(chain_id, address).is_none() {
				return Err(ConfigError::ValidationError(format!(
					"Vault {} {role} {address} is missing from [[tokens]]",
					vault.address
				)));
			}
		}
	}

	for name in config.solvers.keys() {
		if SolverKind::from_name(name).is_none() {
			return Err(ConfigError::ValidationError(format!(
				"Unknown solver '{name}'"
			)));
		}
	}

	Ok(())
}
