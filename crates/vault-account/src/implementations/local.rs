//! Local private-key wallet backed by Alloy's signer.

use crate::{AccountError, AccountInterface};
use alloy_primitives::Address;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use vault_types::{
	validate_private_key, ConfigSchema, Field, FieldType, RawSignature, Schema, TypedDataPayload,
	ValidationError,
};

/// Wallet holding a private key in memory.
///
/// Supports both `personal_sign` and typed-data signing. Signatures carry
/// `v` in Electrum notation (27/28).
pub struct LocalWallet {
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Parses a hex private key, with or without the `0x` prefix.
	pub fn new(private_key_hex: &str) -> Result<Self, AccountError> {
		let signer = private_key_hex
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(format!("Invalid private key: {e}")))?;
		Ok(Self { signer })
	}

	pub(crate) fn inner(&self) -> &PrivateKeySigner {
		&self.signer
	}
}

/// Configuration schema for key-based wallets.
pub struct LocalWalletSchema;

impl ConfigSchema for LocalWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("private_key", FieldType::String).with_validator(validate_private_key)],
			vec![],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalWalletSchema)
	}

	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_message(&self, message: &[u8]) -> Result<RawSignature, AccountError> {
		let signature = self
			.signer
			.sign_message(message)
			.await
			.map_err(|e| AccountError::SigningFailed(format!("Failed to sign message: {e}")))?;
		Ok(signature.into())
	}

	fn supports_typed_data(&self) -> bool {
		true
	}

	async fn sign_typed_data(
		&self,
		payload: &TypedDataPayload,
	) -> Result<RawSignature, AccountError> {
		tracing::debug!(primary_type = %payload.primary_type, "Signing typed data");
		let signature = self
			.signer
			.sign_hash(&payload.signing_hash())
			.await
			.map_err(|e| AccountError::SigningFailed(format!("Failed to sign typed data: {e}")))?;
		Ok(signature.into())
	}

	fn private_key_hex(&self) -> Option<String> {
		Some(format!("0x{}", alloy_primitives::hex::encode(self.signer.to_bytes())))
	}
}

/// Builds a [`LocalWallet`] from a `private_key` entry.
pub fn create_account(config: &toml::Value) -> Result<LocalWallet, AccountError> {
	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::InvalidConfig("private_key is required".to_string()))?;
	LocalWallet::new(private_key)
}
