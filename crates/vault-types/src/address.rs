//! Address canonicalization shared by every routing component.
//!
//! Token and contract addresses arrive as user- or API-supplied strings with
//! arbitrary casing. Every comparison in the router goes through
//! [`normalize_address`] so that `0xabc..` and `0xABC..` are treated as the
//! same contract. Empty or malformed input collapses to [`Address::ZERO`],
//! which callers treat as "no address".

use alloy_primitives::{address, Address};
use std::str::FromStr;

/// Sentinel used by vault APIs and zaps for the chain's native coin.
pub const NATIVE_COIN_ADDRESS: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Parses an address-like string into its canonical 20-byte form.
///
/// Accepts input with or without the `0x` prefix and in any letter case.
/// Returns the zero address for empty or invalid input.
pub fn normalize_address(input: &str) -> Address {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Address::ZERO;
	}
	let hex = trimmed
		.strip_prefix("0x")
		.or_else(|| trimmed.strip_prefix("0X"))
		.unwrap_or(trimmed);
	Address::from_str(hex).unwrap_or(Address::ZERO)
}

/// Renders an address in EIP-55 checksum form.
pub fn to_canonical(address: Address) -> String {
	address.to_checksum(None)
}

/// Compares two address strings after normalization.
pub fn same_address(a: &str, b: &str) -> bool {
	normalize_address(a) == normalize_address(b)
}

/// Returns true for the zero-address sentinel.
pub fn is_zero_address(address: &Address) -> bool {
	*address == Address::ZERO
}

/// Returns true when the address is the native coin sentinel.
pub fn is_native_coin(address: &Address) -> bool {
	*address == NATIVE_COIN_ADDRESS
}
