//! Pre-hashed EIP-712 payloads handed to signers.

use alloy_primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};

/// Typed data reduced to its two hashes.
///
/// Signers that support typed data sign [`TypedDataPayload::signing_hash`]
/// directly; `primary_type` and `encoded_type` are carried for wallets that
/// display what is being signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataPayload {
	pub domain_separator: B256,
	pub primary_type: String,
	pub encoded_type: String,
	pub struct_hash: B256,
}

impl TypedDataPayload {
	/// `keccak256(0x1901 || domainSeparator || hashStruct(message))`.
	pub fn signing_hash(&self) -> B256 {
		hashed_eip712_message(&self.domain_separator, &self.struct_hash)
	}
}

pub fn hashed_eip712_message(domain_separator: &B256, struct_hash: &B256) -> B256 {
	let mut message = [0u8; 66];
	message[0..2].copy_from_slice(&[0x19, 0x01]);
	message[2..34].copy_from_slice(domain_separator.as_slice());
	message[34..66].copy_from_slice(struct_hash.as_slice());
	keccak256(message)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_signing_hash_prefix() {
		let payload = TypedDataPayload {
			domain_separator: B256::repeat_byte(1),
			primary_type: "Order".into(),
			encoded_type: String::new(),
			struct_hash: B256::repeat_byte(2),
		};

		let mut expected = vec![0x19, 0x01];
		expected.extend_from_slice(&[1u8; 32]);
		expected.extend_from_slice(&[2u8; 32]);
		assert_eq!(payload.signing_hash(), keccak256(expected));
	}
}
