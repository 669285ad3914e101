//! Scheme-tagged signature encoding for the orderbook API.

use alloy_primitives::hex;
use serde::{Deserialize, Serialize};

use crate::{OrderError, SigningScheme};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedSignature {
	#[serde(rename = "signingScheme")]
	pub scheme: SigningScheme,
	/// Lowercase `0x`-prefixed hex.
	#[serde(rename = "signature")]
	pub data: String,
}

/// Tags `signature` with its scheme. Only checks that the payload is hex.
pub fn encode(scheme: SigningScheme, signature: &str) -> Result<EncodedSignature, OrderError> {
	let bytes = hex::decode(signature.trim())
		.map_err(|e| OrderError::InvalidSignature(format!("not hex: {e}")))?;
	Ok(EncodedSignature {
		scheme,
		data: format!("0x{}", hex::encode(bytes)),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_encode_lowercases_and_prefixes() {
		let encoded = encode(SigningScheme::EthSign, "ABCD1B").unwrap();
		assert_eq!(encoded.data, "0xabcd1b");

		let json = serde_json::to_value(&encoded).unwrap();
		assert_eq!(json["signingScheme"], "ethsign");
		assert_eq!(json["signature"], "0xabcd1b");
	}

	#[test]
	fn test_encode_rejects_non_hex() {
		assert!(matches!(
			encode(SigningScheme::Eip712, "0xnothex"),
			Err(OrderError::InvalidSignature(_))
		));
	}

	#[test]
	fn test_presign_carries_empty_payload() {
		let encoded = encode(SigningScheme::PreSign, "0x").unwrap();
		assert_eq!(encoded.data, "0x");
	}
}
