//! Token amounts carried in both wei scale and display scale.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Largest mantissa a `Decimal` can hold (2^96 - 1).
const MAX_DECIMAL_MANTISSA: u128 = 79_228_162_514_264_337_593_543_950_335;
/// Largest scale a `Decimal` supports.
const MAX_DECIMAL_SCALE: u32 = 28;

/// An amount of some token.
///
/// `raw` is the authoritative integer amount in the token's base units.
/// `normalized` is `raw / 10^decimals` for display and may have lost
/// trailing digits when the raw value does not fit a `Decimal` mantissa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
	#[serde(with = "crate::serde_helpers::u256_decimal")]
	pub raw: U256,
	pub normalized: Decimal,
}

/// Expected output of a transfer. Advisory only.
pub type Quote = TokenAmount;

/// Allowance granted by an owner to a spender.
pub type AllowanceRecord = TokenAmount;

impl TokenAmount {
	pub fn zero() -> Self {
		Self {
			raw: U256::ZERO,
			normalized: Decimal::ZERO,
		}
	}

	pub fn new(raw: U256, decimals: u8) -> Self {
		Self {
			raw,
			normalized: to_normalized(raw, decimals),
		}
	}

	/// The unlimited allowance reported for native coin spends.
	pub fn unlimited(decimals: u8) -> Self {
		Self::new(U256::MAX, decimals)
	}

	pub fn is_zero(&self) -> bool {
		self.raw.is_zero()
	}
}

impl Default for TokenAmount {
	fn default() -> Self {
		Self::zero()
	}
}

/// Converts a base-unit amount into a display decimal.
///
/// Least significant digits are dropped until the value fits. Amounts too
/// large for any representation saturate at `Decimal::MAX`.
pub fn to_normalized(raw: U256, decimals: u8) -> Decimal {
	let mantissa_limit = U256::from(MAX_DECIMAL_MANTISSA);
	let ten = U256::from(10u8);
	let mut value = raw;
	let mut scale = u32::from(decimals);

	while value > mantissa_limit || scale > MAX_DECIMAL_SCALE {
		if scale == 0 {
			return Decimal::MAX;
		}
		value /= ten;
		scale -= 1;
	}

	let mantissa: u128 = value.to();
	match Decimal::try_from_i128_with_scale(mantissa as i128, scale) {
		Ok(decimal) => decimal.normalize(),
		Err(_) => Decimal::MAX,
	}
}
