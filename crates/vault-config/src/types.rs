//! Configuration file model.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use vault_types::{StaticTokenList, TokenInfo, VaultInfo};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	pub router: RouterConfig,
	pub account: ImplementationConfig,
	pub delivery: ImplementationConfig,
	/// Solver tables keyed by solver name (`partner_contract`, `cowswap`, ...).
	#[serde(default)]
	pub solvers: HashMap<String, toml::Value>,
	#[serde(default)]
	pub tokens: Vec<TokenInfo>,
	#[serde(default)]
	pub vaults: Vec<VaultEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
	pub chain_id: u64,
	#[serde(default = "default_receipt_timeout_seconds")]
	pub receipt_timeout_seconds: u64,
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	#[serde(default = "default_repoll_interval_seconds")]
	pub repoll_interval_seconds: u64,
	#[serde(default = "default_max_repolls")]
	pub max_repolls: u32,
	/// Route plain deposits into staking when the vault has a staking contract.
	#[serde(default)]
	pub stake_on_deposit: bool,
}

impl RouterConfig {
	pub fn receipt_timeout(&self) -> Duration {
		Duration::from_secs(self.receipt_timeout_seconds)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}

	pub fn repoll_interval(&self) -> Duration {
		Duration::from_secs(self.repoll_interval_seconds)
	}
}

fn default_receipt_timeout_seconds() -> u64 {
	5
}

fn default_poll_interval_ms() -> u64 {
	500
}

fn default_repoll_interval_seconds() -> u64 {
	60
}

fn default_max_repolls() -> u32 {
	10
}

/// An implementation name plus its own configuration table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImplementationConfig {
	pub implementation: String,
	#[serde(default = "empty_table")]
	pub config: toml::Value,
}

fn empty_table() -> toml::Value {
	toml::Value::Table(Default::default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEntry {
	pub address: Address,
	pub asset: Address,
	#[serde(default)]
	pub staking: Option<Address>,
}

impl Config {
	pub fn token_list(&self) -> StaticTokenList {
		StaticTokenList::new(self.tokens.iter().cloned())
	}

	pub fn token(&self, chain_id: u64, address: &Address) -> Option<&TokenInfo> {
		self.tokens
			.iter()
			.find(|token| token.chain_id == chain_id && token.address == *address)
	}

	/// Vault metadata on the router chain, with decimals taken from the
	/// vault's token entry.
	pub fn vault(&self, address: &Address) -> Option<VaultInfo> {
		let chain_id = self.router.chain_id;
		let entry = self.vaults.iter().find(|vault| vault.address == *address)?;
		let token = self.token(chain_id, &entry.address)?;
		Some(VaultInfo {
			address: entry.address,
			asset: entry.asset,
			staking: entry.staking.filter(|staking| !staking.is_zero()),
			decimals: token.decimals,
		})
	}

	/// Solver table by name, if the solver is configured.
	pub fn solver_table(&self, name: &str) -> Option<&toml::Value> {
		self.solvers.get(name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
		[router]
		chain_id = 10

		[account]
		implementation = "local"

		[delivery]
		implementation = "alloy"
	"#;

	#[test]
	fn test_router_defaults() {
		let config: Config = toml::from_str(MINIMAL).unwrap();
		assert_eq!(config.router.receipt_timeout(), Duration::from_secs(5));
		assert_eq!(config.router.poll_interval(), Duration::from_millis(500));
		assert_eq!(config.router.repoll_interval(), Duration::from_secs(60));
		assert_eq!(config.router.max_repolls, 10);
		assert!(!config.router.stake_on_deposit);
		assert!(config.account.config.as_table().unwrap().is_empty());
		assert!(config.solvers.is_empty());
	}

	#[test]
	fn test_vault_takes_decimals_from_token_list() {
		let source = format!(
			r#"{MINIMAL}
			[[tokens]]
			chain_id = 10
			address = "0x1111111111111111111111111111111111111111"
			symbol = "yvUSDC"
			decimals = 6

			[[vaults]]
			address = "0x1111111111111111111111111111111111111111"
			asset = "0x2222222222222222222222222222222222222222"
			staking = "0x0000000000000000000000000000000000000000"
			"#
		);
		let config: Config = toml::from_str(&source).unwrap();
		let vault = config.vault(&Address::repeat_byte(0x11)).unwrap();
		assert_eq!(vault.decimals, 6);
		assert_eq!(vault.asset, Address::repeat_byte(0x22));
		assert_eq!(vault.staking, None);
		assert!(config.vault(&Address::repeat_byte(0x33)).is_none());
	}
}
