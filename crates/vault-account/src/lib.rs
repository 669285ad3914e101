//! Signer capability used by order signing and by the CLI.
//!
//! Order signing only ever needs two operations from a wallet: an EIP-191
//! `personal_sign` over raw bytes and, when available, an EIP-712 typed-data
//! signature. [`AccountInterface`] exposes exactly that, plus a capability
//! flag so callers can report a missing typed-data method as an error
//! instead of failing inside the wallet.

use alloy_primitives::Address;
use async_trait::async_trait;
use thiserror::Error;
use vault_types::{ConfigSchema, RawSignature, TypedDataPayload};

pub mod implementations;

pub use implementations::local::LocalWallet;
pub use implementations::message_only::MessageOnlyWallet;

#[derive(Debug, Error)]
pub enum AccountError {
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	#[error("Unsupported operation: {0}")]
	Unsupported(String),
	#[error("Unknown account implementation: {0}")]
	UnknownImplementation(String),
	#[error("Invalid account config: {0}")]
	InvalidConfig(String),
}

#[async_trait]
pub trait AccountInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	async fn address(&self) -> Result<Address, AccountError>;

	/// EIP-191 `personal_sign` over the given bytes.
	async fn sign_message(&self, message: &[u8]) -> Result<RawSignature, AccountError>;

	/// Whether [`AccountInterface::sign_typed_data`] is available.
	fn supports_typed_data(&self) -> bool;

	async fn sign_typed_data(
		&self,
		payload: &TypedDataPayload,
	) -> Result<RawSignature, AccountError>;

	/// The raw private key, when the implementation holds one locally.
	/// Used to configure transaction signing on the chain provider.
	fn private_key_hex(&self) -> Option<String> {
		None
	}
}

pub struct AccountService {
	provider: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(provider: Box<dyn AccountInterface>) -> Self {
		Self { provider }
	}

	pub async fn get_address(&self) -> Result<Address, AccountError> {
		self.provider.address().await
	}

	pub fn signer(&self) -> &dyn AccountInterface {
		self.provider.as_ref()
	}
}

/// Builds a signer from its implementation name and configuration table.
pub fn create_account(
	implementation: &str,
	config: &toml::Value,
) -> Result<Box<dyn AccountInterface>, AccountError> {
	match implementation {
		"local" => {
			implementations::local::LocalWalletSchema
				.validate(config)
				.map_err(|e| AccountError::InvalidConfig(e.to_string()))?;
			Ok(Box::new(implementations::local::create_account(config)?))
		}
		"message_only" => {
			implementations::local::LocalWalletSchema
				.validate(config)
				.map_err(|e| AccountError::InvalidConfig(e.to_string()))?;
			Ok(Box::new(implementations::message_only::create_account(
				config,
			)?))
		}
		other => Err(AccountError::UnknownImplementation(other.to_string())),
	}
}

/// Schema for the named implementation, if it exists.
pub fn account_schema(implementation: &str) -> Option<Box<dyn ConfigSchema>> {
	match implementation {
		"local" | "message_only" => Some(Box::new(implementations::local::LocalWalletSchema)),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	// Anvil's first development account.
	const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	#[tokio::test]
	async fn test_create_local_account() {
		let config: toml::Value = toml::from_str(&format!("private_key = \"{KEY}\"")).unwrap();
		let account = create_account("local", &config).unwrap();
		let service = AccountService::new(account);
		assert_eq!(
			service.get_address().await.unwrap().to_string(),
			"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
		);
		assert!(service.signer().supports_typed_data());
	}

	#[test]
	fn test_unknown_implementation() {
		let config: toml::Value = toml::from_str(&format!("private_key = \"{KEY}\"")).unwrap();
		assert!(matches!(
			create_account("ledger", &config),
			Err(AccountError::UnknownImplementation(_))
		));
	}

	#[test]
	fn test_rejects_malformed_key() {
		let config: toml::Value = toml::from_str("private_key = \"0xdeadbeef\"").unwrap();
		assert!(matches!(
			create_account("local", &config),
			Err(AccountError::InvalidConfig(_))
		));
	}
}
