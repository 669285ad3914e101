//! Route classification.

use alloy_primitives::Address;
use vault_types::{is_zero_address, RouteType};

/// Maps a transfer's five addresses to the route that executes it.
///
/// First match wins:
/// 1. deposit token is the vault asset and destination is the vault
/// 2. deposit token is the vault and destination is its staking contract
/// 3. anything else goes through the aggregator
///
/// A zero `staking` address counts as absent.
pub fn classify(
	deposit_token: Address,
	asset: Address,
	destination_token: Address,
	vault: Address,
	staking: Option<Address>,
) -> RouteType {
	if deposit_token == asset && destination_token == vault {
		return RouteType::DirectDeposit;
	}

	let staking = staking.filter(|s| !is_zero_address(s));
	if let Some(staking) = staking {
		if deposit_token == vault && destination_token == staking {
			return RouteType::DirectStake;
		}
	}

	RouteType::Aggregator
}

#[cfg(test)]
mod tests {
	use super::*;
	use vault_types::normalize_address;

	fn addr(byte: u8) -> Address {
		Address::repeat_byte(byte)
	}

	const AAA: u8 = 0xaa;
	const BBB: u8 = 0xbb;
	const CCC: u8 = 0xcc;
	const DDD: u8 = 0xdd;

	#[test]
	fn test_direct_deposit() {
		assert_eq!(
			classify(addr(AAA), addr(AAA), addr(BBB), addr(BBB), Some(addr(CCC))),
			RouteType::DirectDeposit
		);
	}

	#[test]
	fn test_staking_route() {
		assert_eq!(
			classify(addr(BBB), addr(AAA), addr(CCC), addr(BBB), Some(addr(CCC))),
			RouteType::DirectStake
		);
	}

	#[test]
	fn test_zap_fallback() {
		assert_eq!(
			classify(addr(DDD), addr(AAA), addr(BBB), addr(BBB), Some(addr(CCC))),
			RouteType::Aggregator
		);
	}

	#[test]
	fn test_stake_requires_staking_contract() {
		assert_eq!(
			classify(addr(BBB), addr(AAA), addr(CCC), addr(BBB), None),
			RouteType::Aggregator
		);
		assert_eq!(
			classify(addr(BBB), addr(AAA), Address::ZERO, addr(BBB), Some(Address::ZERO)),
			RouteType::Aggregator
		);
	}

	#[test]
	fn test_case_differences_do_not_matter() {
		let lower = normalize_address("0xabcdefabcdefabcdefabcdefabcdefabcdefabcd");
		let upper = normalize_address("0xABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD");
		assert_eq!(
			classify(lower, upper, addr(BBB), addr(BBB), None),
			RouteType::DirectDeposit
		);
	}

	#[test]
	fn test_every_other_shape_is_aggregator() {
		let candidates = [addr(AAA), addr(BBB), addr(CCC), addr(DDD)];
		for deposit in candidates {
			for destination in candidates {
				let route = classify(deposit, addr(AAA), destination, addr(BBB), Some(addr(CCC)));
				let expected = match (deposit, destination) {
					(d, t) if d == addr(AAA) && t == addr(BBB) => RouteType::DirectDeposit,
					(d, t) if d == addr(BBB) && t == addr(CCC) => RouteType::DirectStake,
					_ => RouteType::Aggregator,
				};
				assert_eq!(route, expected);
			}
		}
	}
}
