//! Signature types returned by signer capabilities.

use alloy_primitives::{Signature, U256};
use serde::{Deserialize, Serialize};

/// Raw 65-byte ECDSA signature laid out as `r || s || v`.
///
/// The recovery byte is kept exactly as the signer produced it. Some wallets
/// return `v` as `0`/`1`, others as `27`/`28` or an EIP-155 encoded value;
/// order signing canonicalizes it before encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSignature(pub Vec<u8>);

impl RawSignature {
	pub const LENGTH: usize = 65;

	/// Builds a signature from its components with an explicit recovery byte.
	pub fn from_parts(r: U256, s: U256, v: u8) -> Self {
		let mut bytes = Vec::with_capacity(Self::LENGTH);
		bytes.extend_from_slice(&r.to_be_bytes::<32>());
		bytes.extend_from_slice(&s.to_be_bytes::<32>());
		bytes.push(v);
		Self(bytes)
	}

	/// The recovery byte, if the signature has the expected length.
	pub fn v(&self) -> Option<u8> {
		if self.0.len() == Self::LENGTH {
			self.0.last().copied()
		} else {
			None
		}
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	pub fn to_hex(&self) -> String {
		format!("0x{}", alloy_primitives::hex::encode(&self.0))
	}
}

impl From<Signature> for RawSignature {
	fn from(sig: Signature) -> Self {
		// Electrum notation, which is what wallets produce for personal_sign.
		let v = if sig.v() { 28 } else { 27 };
		Self::from_parts(sig.r(), sig.s(), v)
	}
}
