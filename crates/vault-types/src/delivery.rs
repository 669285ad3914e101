//! Transaction types for on-chain reads and writes.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A contract call, used both for `eth_call` reads and for submitted writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
	pub to: Address,
	pub data: Bytes,
	pub value: U256,
	pub chain_id: u64,
	/// Gas limit, filled by the provider when absent.
	pub gas_limit: Option<u64>,
}

impl Transaction {
	pub fn call(chain_id: u64, to: Address, data: impl Into<Bytes>) -> Self {
		Self {
			to,
			data: data.into(),
			value: U256::ZERO,
			chain_id,
			gas_limit: None,
		}
	}

	pub fn with_value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}

	/// First four bytes of calldata.
	pub fn selector(&self) -> Option<[u8; 4]> {
		self.data.get(..4).and_then(|s| s.try_into().ok())
	}
}

/// Hash of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHash(pub B256);

impl TransactionHash {
	/// First eight hex characters, for log lines.
	pub fn truncated(&self) -> String {
		let hex = alloy_primitives::hex::encode(self.0);
		format!("{}..", &hex[..8])
	}
}

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	pub hash: TransactionHash,
	pub block_number: u64,
	pub success: bool,
}

/// Status of one user-initiated write.
///
/// Moves `Idle -> Pending -> Success | Error` and back to `Idle` on reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransactionStatus {
	#[default]
	Idle,
	/// Submitted or being submitted. The hash is absent until the provider
	/// accepts the write.
	Pending { hash: Option<TransactionHash> },
	Success { hash: Option<TransactionHash> },
	Error { reason: String },
}

impl TransactionStatus {
	pub fn is_pending(&self) -> bool {
		matches!(self, TransactionStatus::Pending { .. })
	}

	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			TransactionStatus::Success { .. } | TransactionStatus::Error { .. }
		)
	}
}
