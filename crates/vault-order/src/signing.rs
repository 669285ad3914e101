//! Order signing with the ECDSA schemes accepted by the settlement contract.

use alloy_primitives::{hex, Address};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use vault_account::AccountInterface;
use vault_types::{RawSignature, TypedDataPayload};

use crate::{encode, DomainSeparator, EncodedSignature, NormalizedOrder, Order, OrderError, OrderUid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningScheme {
	Eip712 = 0,
	EthSign = 1,
	Eip1271 = 2,
	PreSign = 3,
}

impl SigningScheme {
	pub fn as_str(&self) -> &'static str {
		match self {
			SigningScheme::Eip712 => "eip712",
			SigningScheme::EthSign => "ethsign",
			SigningScheme::Eip1271 => "eip1271",
			SigningScheme::PreSign => "presign",
		}
	}
}

impl TryFrom<u8> for SigningScheme {
	type Error = OrderError;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		match value {
			0 => Ok(SigningScheme::Eip712),
			1 => Ok(SigningScheme::EthSign),
			2 => Ok(SigningScheme::Eip1271),
			3 => Ok(SigningScheme::PreSign),
			other => Err(OrderError::InvalidSigningScheme(other.to_string())),
		}
	}
}

impl FromStr for SigningScheme {
	type Err = OrderError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"eip712" => Ok(SigningScheme::Eip712),
			"ethsign" => Ok(SigningScheme::EthSign),
			"eip1271" => Ok(SigningScheme::Eip1271),
			"presign" => Ok(SigningScheme::PreSign),
			_ => Err(OrderError::InvalidSigningScheme(s.to_string())),
		}
	}
}

/// Canonical recovery byte: `27` or `28`.
///
/// Accepts bare recovery ids (`0`/`1`), Electrum values and EIP-155
/// encoded values (`35 + 2 * chain_id + parity`).
pub fn normalize_recovery_byte(v: u8) -> Result<u8, OrderError> {
	match v {
		0 | 1 => Ok(v + 27),
		27 | 28 => Ok(v),
		v if v >= 35 => Ok(27 + (v - 35) % 2),
		other => Err(OrderError::InvalidSignature(format!(
			"invalid recovery byte {other}"
		))),
	}
}

/// Rewrites the trailing recovery byte of a 65-byte signature.
pub fn normalize_signature(signature: &RawSignature) -> Result<RawSignature, OrderError> {
	let v = signature.v().ok_or_else(|| {
		OrderError::InvalidSignature(format!(
			"expected {} bytes, got {}",
			RawSignature::LENGTH,
			signature.as_bytes().len()
		))
	})?;

	let mut bytes = signature.as_bytes().to_vec();
	bytes[RawSignature::LENGTH - 1] = normalize_recovery_byte(v)?;
	Ok(RawSignature(bytes))
}

/// Signs typed data with `scheme` and returns the normalized `0x` hex
/// signature. Only the ECDSA schemes are signable here.
pub async fn sign(
	scheme: SigningScheme,
	signer: &dyn AccountInterface,
	payload: &TypedDataPayload,
) -> Result<String, OrderError> {
	let raw = match scheme {
		SigningScheme::Eip712 => {
			if !signer.supports_typed_data() {
				return Err(OrderError::UnsupportedSigner);
			}
			signer.sign_typed_data(payload).await?
		}
		SigningScheme::EthSign => {
			signer
				.sign_message(payload.signing_hash().as_slice())
				.await?
		}
		other => {
			return Err(OrderError::InvalidSigningScheme(format!(
				"{} is not an ECDSA scheme",
				other.as_str()
			)))
		}
	};

	let normalized = normalize_signature(&raw)?;
	Ok(format!("0x{}", hex::encode(normalized.as_bytes())))
}

/// An order ready for submission to the orderbook.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOrder {
	#[serde(flatten)]
	pub order: NormalizedOrder,
	#[serde(flatten)]
	pub signature: EncodedSignature,
	#[serde(rename = "from")]
	pub owner: Address,
	#[serde(skip)]
	pub uid: OrderUid,
}

/// Normalizes, hashes and signs `order` for `domain`.
pub async fn sign_order(
	order: &Order,
	domain: &DomainSeparator,
	scheme: SigningScheme,
	signer: &dyn AccountInterface,
) -> Result<SignedOrder, OrderError> {
	let normalized = order.normalize()?;
	let owner = signer.address().await?;
	let payload = normalized.typed_data(domain);
	let signature = sign(scheme, signer, &payload).await?;

	let uid = normalized.uid(domain, &owner);
	tracing::debug!(%uid, scheme = scheme.as_str(), "Signed order");

	Ok(SignedOrder {
		signature: encode(scheme, &signature)?,
		order: normalized,
		owner,
		uid,
	})
}
