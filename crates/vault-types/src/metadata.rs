//! Read-only token metadata lookups.

use alloy_primitives::Address;
use async_trait::async_trait;
use std::collections::HashMap;

use crate::TokenInfo;

/// Source of decimals and symbols for tokens, keyed by chain and address.
#[async_trait]
pub trait TokenMetadataSource: Send + Sync {
	async fn token(&self, chain_id: u64, address: Address) -> Option<TokenInfo>;
}

/// Metadata source backed by a fixed list, typically from configuration.
#[derive(Debug, Default, Clone)]
pub struct StaticTokenList {
	tokens: HashMap<(u64, Address), TokenInfo>,
}

impl StaticTokenList {
	pub fn new(tokens: impl IntoIterator<Item = TokenInfo>) -> Self {
		Self {
			tokens: tokens
				.into_iter()
				.map(|token| ((token.chain_id, token.address), token))
				.collect(),
		}
	}

	pub fn get(&self, chain_id: u64, address: &Address) -> Option<&TokenInfo> {
		self.tokens.get(&(chain_id, *address))
	}

	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}
}

#[async_trait]
impl TokenMetadataSource for StaticTokenList {
	async fn token(&self, chain_id: u64, address: Address) -> Option<TokenInfo> {
		self.get(chain_id, &address).cloned()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_lookup_is_chain_scoped() {
		let usdc = TokenInfo {
			chain_id: 10,
			address: Address::repeat_byte(0x11),
			symbol: "USDC".into(),
			decimals: 6,
		};
		let list = StaticTokenList::new([usdc.clone()]);

		assert_eq!(list.token(10, usdc.address).await, Some(usdc.clone()));
		assert_eq!(list.token(1, usdc.address).await, None);
		assert_eq!(list.len(), 1);
	}
}
