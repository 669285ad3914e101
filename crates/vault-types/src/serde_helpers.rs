//! Serde adapters for on-chain integer types.

/// Serializes a `U256` as a base-10 string, the format used by orderbook
/// APIs and by the CLI's JSON output.
pub mod u256_decimal {
	use alloy_primitives::U256;
	use serde::{de, Deserializer, Serializer};
	use std::fmt;

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&value.to_string())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		struct Visitor;

		impl de::Visitor<'_> for Visitor {
			type Value = U256;

			fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
				write!(formatter, "a u256 encoded as a decimal string")
			}

			fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
			where
				E: de::Error,
			{
				U256::from_str_radix(s, 10).map_err(|err| {
					de::Error::custom(format!("failed to decode {s:?} as decimal u256: {err}"))
				})
			}

			fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
			where
				E: de::Error,
			{
				Ok(U256::from(v))
			}

			fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
			where
				E: de::Error,
			{
				u64::try_from(v)
					.map(U256::from)
					.map_err(|_| de::Error::custom(format!("negative amount {v}")))
			}
		}

		deserializer.deserialize_any(Visitor)
	}
}
