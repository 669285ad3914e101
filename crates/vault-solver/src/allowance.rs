//! Session cache of ERC-20 allowances.

use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use dashmap::DashMap;
use std::sync::Arc;
use vault_delivery::DeliveryInterface;
use vault_types::{AllowanceRecord, Transaction};

use crate::contracts::IERC20;
use crate::SolverError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllowanceKey {
	pub chain_id: u64,
	pub token: Address,
	pub spender: Address,
	pub owner: Address,
}

/// Allowances keyed by `(chain, token, spender, owner)`, shared by every
/// solver of a session. Entries are filled on first read and only replaced
/// by a forced refresh.
pub struct AllowanceTracker {
	delivery: Arc<dyn DeliveryInterface>,
	cache: DashMap<AllowanceKey, AllowanceRecord>,
}

impl AllowanceTracker {
	pub fn new(delivery: Arc<dyn DeliveryInterface>) -> Self {
		Self {
			delivery,
			cache: DashMap::new(),
		}
	}

	/// Returns the allowance for `key`, reading it from chain when not cached
	/// or when `force_refresh` is set. Read failures are returned, never cached.
	pub async fn get(
		&self,
		key: &AllowanceKey,
		decimals: u8,
		force_refresh: bool,
	) -> Result<AllowanceRecord, SolverError> {
		if !force_refresh {
			if let Some(record) = self.cache.get(key) {
				return Ok(record.clone());
			}
		}

		let call = IERC20::allowanceCall {
			owner: key.owner,
			spender: key.spender,
		};
		let data = self
			.delivery
			.call(&Transaction::call(key.chain_id, key.token, call.abi_encode()))
			.await
			.map_err(|e| SolverError::QuoteUnavailable(format!("allowance read failed: {e}")))?;
		let raw = IERC20::allowanceCall::abi_decode_returns(&data)
			.map_err(|e| SolverError::QuoteUnavailable(format!("invalid allowance data: {e}")))?;

		let record = AllowanceRecord::new(raw, decimals);
		tracing::debug!(
			chain_id = key.chain_id,
			token = %key.token,
			spender = %key.spender,
			allowance = %record.normalized,
			"Fetched allowance"
		);
		self.cache.insert(*key, record.clone());
		Ok(record)
	}

	pub fn cached(&self, key: &AllowanceKey) -> Option<AllowanceRecord> {
		self.cache.get(key).map(|r| r.clone())
	}

	/// Drops one entry. Other keys are left untouched.
	pub fn invalidate(&self, key: &AllowanceKey) {
		self.cache.remove(key);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::U256;
	use vault_delivery::testing::FakeChain;

	const SELECTOR: [u8; 4] = IERC20::allowanceCall::SELECTOR;

	fn key(spender: u8) -> AllowanceKey {
		AllowanceKey {
			chain_id: 10,
			token: Address::repeat_byte(0xaa),
			spender: Address::repeat_byte(spender),
			owner: Address::repeat_byte(0x01),
		}
	}

	fn encoded(value: u64) -> Vec<u8> {
		U256::from(value).to_be_bytes::<32>().to_vec()
	}

	#[tokio::test]
	async fn test_cached_until_forced() {
		let chain = Arc::new(FakeChain::new());
		let token = key(0xbb).token;
		chain.set_call(token, SELECTOR, encoded(5));
		let tracker = AllowanceTracker::new(chain.clone());

		assert_eq!(tracker.get(&key(0xbb), 0, false).await.unwrap().raw, U256::from(5));
		assert_eq!(tracker.get(&key(0xbb), 0, false).await.unwrap().raw, U256::from(5));
		assert_eq!(chain.calls_to(token), 1);

		chain.set_call(token, SELECTOR, encoded(9));
		assert_eq!(tracker.get(&key(0xbb), 0, true).await.unwrap().raw, U256::from(9));
		assert_eq!(chain.calls_to(token), 2);
		assert_eq!(tracker.cached(&key(0xbb)).unwrap().raw, U256::from(9));
	}

	#[tokio::test]
	async fn test_keys_are_independent() {
		let chain = Arc::new(FakeChain::new());
		let token = key(0xbb).token;
		chain.set_call(token, SELECTOR, encoded(1));
		let tracker = AllowanceTracker::new(chain.clone());

		tracker.get(&key(0xbb), 0, false).await.unwrap();
		tracker.get(&key(0xcc), 0, false).await.unwrap();
		assert_eq!(chain.calls_to(token), 2);

		tracker.invalidate(&key(0xbb));
		assert!(tracker.cached(&key(0xbb)).is_none());
		assert!(tracker.cached(&key(0xcc)).is_some());
	}

	#[tokio::test]
	async fn test_read_failure_propagates() {
		let chain = Arc::new(FakeChain::new());
		chain.fail_call(key(0xbb).token, SELECTOR, "connection reset");
		let tracker = AllowanceTracker::new(chain);

		let result = tracker.get(&key(0xbb), 18, false).await;
		assert!(matches!(result, Err(SolverError::QuoteUnavailable(_))));
		assert!(tracker.cached(&key(0xbb)).is_none());
	}

	#[tokio::test]
	async fn test_normalizes_with_token_decimals() {
		let chain = Arc::new(FakeChain::new());
		chain.set_call(key(0xbb).token, SELECTOR, encoded(1_500_000));
		let tracker = AllowanceTracker::new(chain);

		let record = tracker.get(&key(0xbb), 6, false).await.unwrap();
		assert_eq!(record.normalized.to_string(), "1.5");
	}
}
