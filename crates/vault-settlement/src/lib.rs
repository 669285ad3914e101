//! Off-chain settlement endpoint for gasless orders.
//!
//! The router's responsibility for a gasless order ends when the orderbook
//! acknowledges it. Settlement itself happens later, on the solver network.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use vault_order::{SignedOrder, SigningScheme};
use vault_types::{serde_helpers::u256_decimal, ConfigSchema};

pub mod implementations {
	pub mod cow_api;
}

#[cfg(any(test, feature = "testing"))]
pub mod testing;

#[derive(Debug, Error)]
pub enum SettlementError {
	#[error("Network error: {0}")]
	Network(String),
	#[error("Orderbook rejected request ({status}): {body}")]
	Rejected { status: u16, body: String },
	#[error("Invalid orderbook response: {0}")]
	InvalidResponse(String),
	#[error("Invalid settlement config: {0}")]
	InvalidConfig(String),
}

/// Sell-side quote request. The fee is taken from the sell amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
	pub from: Address,
	pub sell_token: Address,
	pub buy_token: Address,
	#[serde(with = "u256_decimal")]
	pub sell_amount_before_fee: U256,
	pub valid_for: u32,
	pub signing_scheme: SigningScheme,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotedAmounts {
	#[serde(with = "u256_decimal")]
	pub sell_amount: U256,
	#[serde(with = "u256_decimal")]
	pub buy_amount: U256,
	#[serde(with = "u256_decimal")]
	pub fee_amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuoteResponse {
	pub quote: QuotedAmounts,
	#[serde(default)]
	pub id: Option<i64>,
}

#[async_trait]
pub trait SettlementInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Prices a sell order on the orderbook.
	async fn quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, SettlementError>;

	/// Submits a signed order and returns the uid the orderbook assigned.
	async fn submit_order(&self, order: &SignedOrder) -> Result<String, SettlementError>;
}

/// Builds a settlement endpoint from its implementation name and configuration table.
pub fn create_settlement(
	implementation: &str,
	config: &toml::Value,
) -> Result<Arc<dyn SettlementInterface>, SettlementError> {
	match implementation {
		"cow_api" => Ok(Arc::new(implementations::cow_api::create_cow_api(config)?)),
		other => Err(SettlementError::InvalidConfig(format!(
			"unknown settlement implementation '{other}'"
		))),
	}
}
