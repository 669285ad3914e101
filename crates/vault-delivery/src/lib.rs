//! Chain read/write access for the vault router.
//!
//! Solvers never talk to a node directly. They build [`Transaction`] values
//! and hand them to a [`DeliveryInterface`], either as a read (`eth_call`)
//! or as a write that gets signed and broadcast. Writes are driven through a
//! [`TransactionLifecycle`], which owns the pending/success/error status of
//! one user action.

use alloy_primitives::Bytes;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use vault_types::{ConfigSchema, Transaction, TransactionHash, TransactionReceipt};

pub mod lifecycle;

pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use lifecycle::{
	callback, LifecycleConfig, LifecycleError, SuccessCallback, TransactionLifecycle,
	TransactionOutcome,
};

#[derive(Debug, Error)]
pub enum DeliveryError {
	#[error("Network error: {0}")]
	Network(String),
	/// The signer or node refused the transaction before it was mined.
	#[error("Transaction rejected: {0}")]
	TransactionRejected(String),
	/// The transaction was mined with a failing status.
	#[error("Transaction reverted: {0}")]
	TransactionReverted(TransactionHash),
	#[error("No signer configured for chain {0}")]
	NoSigner(u64),
	#[error("No implementation available for chain {0}")]
	NoImplementationAvailable(u64),
	#[error("Invalid delivery config: {0}")]
	InvalidConfig(String),
}

#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Executes a read-only contract call and returns the raw return data.
	async fn call(&self, tx: &Transaction) -> Result<Bytes, DeliveryError>;

	/// Signs and broadcasts a write.
	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError>;

	/// Returns the receipt once mined, `None` while still pending.
	async fn get_receipt(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<Option<TransactionReceipt>, DeliveryError>;
}

/// Routes requests to the provider configured for each chain.
#[derive(Clone, Default)]
pub struct DeliveryService {
	implementations: HashMap<u64, Arc<dyn DeliveryInterface>>,
}

impl DeliveryService {
	pub fn new(implementations: HashMap<u64, Arc<dyn DeliveryInterface>>) -> Self {
		Self { implementations }
	}

	pub fn single(chain_id: u64, implementation: Arc<dyn DeliveryInterface>) -> Self {
		Self::new(HashMap::from([(chain_id, implementation)]))
	}

	/// Provider for `chain_id`.
	pub fn for_chain(&self, chain_id: u64) -> Result<Arc<dyn DeliveryInterface>, DeliveryError> {
		self.implementations
			.get(&chain_id)
			.cloned()
			.ok_or(DeliveryError::NoImplementationAvailable(chain_id))
	}

	pub async fn call(&self, tx: &Transaction) -> Result<Bytes, DeliveryError> {
		self.for_chain(tx.chain_id)?.call(tx).await
	}

	pub async fn deliver(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		self.for_chain(tx.chain_id)?.submit(tx).await
	}

	pub async fn get_receipt(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		self.for_chain(chain_id)?.get_receipt(hash, chain_id).await
	}
}

/// Builds a provider from its implementation name and configuration table.
///
/// `private_key` is the account key used to sign writes; a provider built
/// without one can only serve reads.
pub fn create_delivery(
	implementation: &str,
	config: &toml::Value,
	private_key: Option<&str>,
) -> Result<Arc<dyn DeliveryInterface>, DeliveryError> {
	match implementation {
		"alloy" => {
			let delivery = implementations::evm::alloy::create_http_delivery(config, private_key)?;
			Ok(Arc::new(delivery))
		}
		other => Err(DeliveryError::InvalidConfig(format!(
			"unknown delivery implementation '{other}'"
		))),
	}
}

/// Schema for the named implementation, if it exists.
pub fn delivery_schema(implementation: &str) -> Option<Box<dyn ConfigSchema>> {
	match implementation {
		"alloy" => Some(Box::new(implementations::evm::alloy::AlloyDeliverySchema)),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::FakeChain;
	use alloy_primitives::Address;

	#[tokio::test]
	async fn test_service_routes_by_chain() {
		let chain = Arc::new(FakeChain::new());
		let contract = Address::repeat_byte(0x42);
		chain.set_call(contract, [1, 2, 3, 4], Bytes::from(vec![9u8]));

		let service = DeliveryService::single(10, chain.clone());
		let tx = Transaction::call(10, contract, vec![1, 2, 3, 4]);
		assert_eq!(service.call(&tx).await.unwrap(), Bytes::from(vec![9u8]));

		let other_chain = Transaction::call(1, contract, vec![1, 2, 3, 4]);
		assert!(matches!(
			service.call(&other_chain).await,
			Err(DeliveryError::NoImplementationAvailable(1))
		));
	}

	#[test]
	fn test_unknown_implementation() {
		let config = toml::Value::Table(Default::default());
		assert!(matches!(
			create_delivery("ethers", &config, None),
			Err(DeliveryError::InvalidConfig(_))
		));
	}
}
