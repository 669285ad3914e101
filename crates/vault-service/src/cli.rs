//! Command-line interface definitions.

use alloy_primitives::{Address, U256};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use vault_core::{SolverPreference, TransferSpec};
use vault_types::{is_zero_address, normalize_address};

#[derive(Parser, Debug)]
#[command(name = "vault-router")]
#[command(about = "Vault deposit and withdrawal router", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
	#[command(subcommand)]
	pub command: Command,

	/// Path to configuration file
	#[arg(short, long, value_name = "FILE", env = "VAULT_CONFIG", default_value = "config/local.toml")]
	pub config: PathBuf,

	/// Log level used when RUST_LOG is unset (trace, debug, info, warn, error)
	#[arg(long, env = "VAULT_LOG_LEVEL", default_value = "info")]
	pub log_level: String,

	#[arg(long, value_enum, default_value_t = LogFormat::Text)]
	pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
	Text,
	Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Validate the configuration file and every implementation table in it
	Validate,

	/// Show the route and solver a transfer would use, without any chain access
	Route {
		#[command(flatten)]
		transfer: TransferArgs,
		/// Treat the transfer as a withdrawal
		#[arg(long)]
		withdraw: bool,
	},

	/// Quote a transfer
	Quote {
		#[command(flatten)]
		transfer: TransferArgs,
		#[arg(long)]
		withdraw: bool,
	},

	/// Read the allowance the selected solver needs
	Allowance {
		#[command(flatten)]
		transfer: TransferArgs,
		#[arg(long)]
		withdraw: bool,
		/// Bypass the allowance cache
		#[arg(long)]
		refresh: bool,
	},

	/// Approve the selected solver's spender for the transfer amount
	Approve {
		#[command(flatten)]
		transfer: TransferArgs,
		#[arg(long)]
		withdraw: bool,
	},

	/// Deposit into a vault
	Deposit {
		#[command(flatten)]
		transfer: TransferArgs,
		/// Approve first when the allowance is short
		#[arg(long)]
		approve: bool,
	},

	/// Withdraw from a vault
	Withdraw {
		#[command(flatten)]
		transfer: TransferArgs,
		#[arg(long)]
		approve: bool,
	},
}

#[derive(Args, Debug, Clone)]
pub struct TransferArgs {
	/// Vault address
	#[arg(long, value_parser = parse_address)]
	pub vault: Address,

	/// Token spent on deposit or received on withdrawal
	#[arg(long, value_parser = parse_address)]
	pub token: Address,

	/// Amount in the input token's base units
	#[arg(long, value_parser = parse_amount)]
	pub amount: U256,

	/// Use the vault's staking position
	#[arg(long)]
	pub staked: bool,

	/// Route through the gasless orderbook
	#[arg(long)]
	pub cowswap: bool,
}

impl TransferArgs {
	pub fn spec(&self, owner: Address, is_depositing: bool) -> TransferSpec {
		TransferSpec {
			owner,
			vault: self.vault,
			token: self.token,
			amount: self.amount,
			is_depositing,
			staked: self.staked,
		}
	}

	pub fn preference(&self) -> SolverPreference {
		if self.cowswap {
			SolverPreference::Cowswap
		} else {
			SolverPreference::Auto
		}
	}
}

fn parse_address(raw: &str) -> Result<Address, String> {
	let address = normalize_address(raw);
	if is_zero_address(&address) {
		return Err(format!("'{raw}' is not a valid address"));
	}
	Ok(address)
}

fn parse_amount(raw: &str) -> Result<U256, String> {
	U256::from_str_radix(raw.trim(), 10).map_err(|e| format!("invalid amount '{raw}': {e}"))
}
