//! In-memory orderbook for tests.

use alloy_primitives::U256;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use vault_order::SignedOrder;
use vault_types::{ConfigSchema, Schema, ValidationError};

use crate::{QuoteRequest, QuoteResponse, QuotedAmounts, SettlementError, SettlementInterface};

#[derive(Default)]
pub struct FakeOrderbook {
	buy_amount: Mutex<Option<U256>>,
	reject_orders: Mutex<Option<String>>,
	quotes: AtomicUsize,
	orders: Mutex<Vec<SignedOrder>>,
}

impl FakeOrderbook {
	pub fn new() -> Self {
		Self::default()
	}

	/// Quotes every request at `buy_amount`. Unset means the quote endpoint fails.
	pub fn set_buy_amount(&self, buy_amount: U256) {
		if let Ok(mut slot) = self.buy_amount.lock() {
			*slot = Some(buy_amount);
		}
	}

	pub fn reject_orders(&self, reason: &str) {
		if let Ok(mut slot) = self.reject_orders.lock() {
			*slot = Some(reason.to_string());
		}
	}

	pub fn quote_count(&self) -> usize {
		self.quotes.load(Ordering::SeqCst)
	}

	pub fn orders(&self) -> Vec<SignedOrder> {
		self.orders
			.lock()
			.map(|orders| orders.clone())
			.unwrap_or_default()
	}
}

struct EmptySchema;

impl ConfigSchema for EmptySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

#[async_trait]
impl SettlementInterface for FakeOrderbook {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(EmptySchema)
	}

	async fn quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, SettlementError> {
		self.quotes.fetch_add(1, Ordering::SeqCst);
		let buy_amount = self
			.buy_amount
			.lock()
			.ok()
			.and_then(|slot| *slot)
			.ok_or_else(|| SettlementError::Network("no quote scripted".to_string()))?;

		Ok(QuoteResponse {
			quote: QuotedAmounts {
				sell_amount: request.sell_amount_before_fee,
				buy_amount,
				fee_amount: U256::ZERO,
			},
			id: Some(self.quote_count() as i64),
		})
	}

	async fn submit_order(&self, order: &SignedOrder) -> Result<String, SettlementError> {
		if let Some(reason) = self.reject_orders.lock().ok().and_then(|slot| slot.clone()) {
			return Err(SettlementError::Rejected {
				status: 400,
				body: reason,
			});
		}

		if let Ok(mut orders) = self.orders.lock() {
			orders.push(order.clone());
		}
		Ok(order.uid.to_string())
	}
}
