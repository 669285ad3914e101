//! Alloy-based provider over HTTP JSON-RPC.
//!
//! Reads go through `eth_call`. Writes are signed by an `EthereumWallet`
//! filler built from the account key, with nonce, gas and chain id filled
//! by the provider.

use crate::{DeliveryError, DeliveryInterface};
use alloy_network::{EthereumWallet, ReceiptResponse};
use alloy_primitives::{Bytes, TxKind};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::{TransactionInput, TransactionRequest};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use vault_types::{
	validate_http_url, ConfigSchema, Field, FieldType, Schema, Transaction, TransactionHash,
	TransactionReceipt, ValidationError,
};

pub struct AlloyDelivery {
	provider: DynProvider,
	chain_id: u64,
	can_sign: bool,
}

impl AlloyDelivery {
	pub fn new(
		rpc_url: &str,
		chain_id: u64,
		signer: Option<PrivateKeySigner>,
	) -> Result<Self, DeliveryError> {
		let url = rpc_url
			.parse()
			.map_err(|e| DeliveryError::InvalidConfig(format!("Invalid RPC URL: {e}")))?;

		let can_sign = signer.is_some();
		let provider = match signer {
			Some(signer) => {
				let wallet = EthereumWallet::from(signer.with_chain_id(Some(chain_id)));
				ProviderBuilder::new()
					.wallet(wallet)
					.connect_http(url)
					.erased()
			}
			None => ProviderBuilder::new().connect_http(url).erased(),
		};

		Ok(Self {
			provider,
			chain_id,
			can_sign,
		})
	}

	fn check_chain(&self, chain_id: u64) -> Result<(), DeliveryError> {
		if chain_id == self.chain_id {
			Ok(())
		} else {
			Err(DeliveryError::NoImplementationAvailable(chain_id))
		}
	}
}

fn to_request(tx: &Transaction) -> TransactionRequest {
	TransactionRequest {
		chain_id: Some(tx.chain_id),
		to: Some(TxKind::Call(tx.to)),
		value: Some(tx.value),
		gas: tx.gas_limit,
		input: TransactionInput::new(tx.data.clone()),
		..Default::default()
	}
}

/// Maps a send error to rejected or transport failure.
fn classify_send_error(message: String) -> DeliveryError {
	let lowered = message.to_lowercase();
	if lowered.contains("rejected")
		|| lowered.contains("denied")
		|| lowered.contains("insufficient funds")
		|| lowered.contains("execution reverted")
	{
		DeliveryError::TransactionRejected(message)
	} else {
		DeliveryError::Network(message)
	}
}

pub struct AlloyDeliverySchema;

impl ConfigSchema for AlloyDeliverySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("rpc_url", FieldType::String).with_validator(validate_http_url),
				Field::new(
					"chain_id",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
			],
			vec![],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyDeliverySchema)
	}

	async fn call(&self, tx: &Transaction) -> Result<Bytes, DeliveryError> {
		self.check_chain(tx.chain_id)?;
		self.provider
			.call(to_request(tx))
			.await
			.map_err(|e| DeliveryError::Network(format!("eth_call to {} failed: {e}", tx.to)))
	}

	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		self.check_chain(tx.chain_id)?;
		if !self.can_sign {
			return Err(DeliveryError::NoSigner(tx.chain_id));
		}

		tracing::debug!(
			chain_id = tx.chain_id,
			to = %tx.to,
			value = %tx.value,
			data_len = tx.data.len(),
			"Sending transaction"
		);

		let pending = self
			.provider
			.send_transaction(to_request(&tx))
			.await
			.map_err(|e| classify_send_error(format!("Failed to send transaction: {e}")))?;

		let hash = TransactionHash(*pending.tx_hash());
		tracing::info!(tx_hash = %hash.truncated(), chain_id = tx.chain_id, "Submitted transaction");
		Ok(hash)
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		self.check_chain(chain_id)?;
		let receipt = self
			.provider
			.get_transaction_receipt(hash.0)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get receipt: {e}")))?;

		Ok(receipt.map(|receipt| TransactionReceipt {
			hash: TransactionHash(receipt.transaction_hash),
			block_number: receipt.block_number.unwrap_or(0),
			success: receipt.status(),
		}))
	}
}

/// Builds an [`AlloyDelivery`] from `rpc_url` and `chain_id`.
pub fn create_http_delivery(
	config: &toml::Value,
	private_key: Option<&str>,
) -> Result<AlloyDelivery, DeliveryError> {
	AlloyDeliverySchema
		.validate(config)
		.map_err(|e| DeliveryError::InvalidConfig(e.to_string()))?;

	let rpc_url = config
		.get("rpc_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| DeliveryError::InvalidConfig("rpc_url is required".to_string()))?;
	let chain_id = config
		.get("chain_id")
		.and_then(|v| v.as_integer())
		.ok_or_else(|| DeliveryError::InvalidConfig("chain_id is required".to_string()))?
		as u64;

	let signer = private_key
		.map(|key| {
			key.parse::<PrivateKeySigner>()
				.map_err(|e| DeliveryError::InvalidConfig(format!("Invalid private key: {e}")))
		})
		.transpose()?;

	AlloyDelivery::new(rpc_url, chain_id, signer)
}
