//! Wallet that only offers `personal_sign`.
//!
//! Mirrors hardware and smart-wallet bridges that cannot sign typed data
//! and return the bare recovery id (`0`/`1`) without the `+27` offset.

use super::local::{LocalWallet, LocalWalletSchema};
use crate::{AccountError, AccountInterface};
use alloy_primitives::Address;
use alloy_signer::Signer;
use async_trait::async_trait;
use vault_types::{ConfigSchema, RawSignature, TypedDataPayload};

pub struct MessageOnlyWallet {
	inner: LocalWallet,
}

impl MessageOnlyWallet {
	pub fn new(private_key_hex: &str) -> Result<Self, AccountError> {
		Ok(Self {
			inner: LocalWallet::new(private_key_hex)?,
		})
	}
}

#[async_trait]
impl AccountInterface for MessageOnlyWallet {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalWalletSchema)
	}

	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.inner.inner().address())
	}

	async fn sign_message(&self, message: &[u8]) -> Result<RawSignature, AccountError> {
		let signature = self
			.inner
			.inner()
			.sign_message(message)
			.await
			.map_err(|e| AccountError::SigningFailed(format!("Failed to sign message: {e}")))?;
		Ok(RawSignature::from_parts(
			signature.r(),
			signature.s(),
			u8::from(signature.v()),
		))
	}

	fn supports_typed_data(&self) -> bool {
		false
	}

	async fn sign_typed_data(
		&self,
		_payload: &TypedDataPayload,
	) -> Result<RawSignature, AccountError> {
		Err(AccountError::Unsupported(
			"wallet cannot sign typed data".to_string(),
		))
	}

	fn private_key_hex(&self) -> Option<String> {
		self.inner.private_key_hex()
	}
}

pub fn create_account(config: &toml::Value) -> Result<MessageOnlyWallet, AccountError> {
	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::InvalidConfig("private_key is required".to_string()))?;
	MessageOnlyWallet::new(private_key)
}

#[cfg(test)]
mod tests {
	use super::*;

	const KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

	#[tokio::test]
	async fn test_returns_unoffset_recovery_id() {
		let wallet = MessageOnlyWallet::new(KEY).unwrap();
		let raw = wallet.sign_message(b"hello").await.unwrap();
		assert!(matches!(raw.v(), Some(0) | Some(1)));
	}

	#[tokio::test]
	async fn test_typed_data_unsupported() {
		let wallet = MessageOnlyWallet::new(KEY).unwrap();
		assert!(!wallet.supports_typed_data());
		let payload = TypedDataPayload {
			domain_separator: Default::default(),
			primary_type: "Order".into(),
			encoded_type: String::new(),
			struct_hash: Default::default(),
		};
		assert!(matches!(
			wallet.sign_typed_data(&payload).await,
			Err(AccountError::Unsupported(_))
		));
	}
}
