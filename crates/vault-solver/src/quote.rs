//! Price-per-share quoting.
//!
//! Quotes are advisory. A failed price read degrades to a zero quote and a
//! warning instead of an error, unlike allowance reads which propagate.

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use std::sync::Arc;
use vault_delivery::{DeliveryError, DeliveryInterface};
use vault_types::{is_zero_address, Quote, Transaction, TransferRequest};

use crate::contracts::IVault;

/// Converts between vault shares and underlying asset.
///
/// `price_per_share` is the asset value of one whole share, scaled by the
/// vault's `decimals`. Multiplication happens before division. Returns zero
/// for a zero price or on overflow.
pub fn share_quote(
	input_amount: U256,
	price_per_share: U256,
	decimals: u8,
	is_depositing: bool,
) -> U256 {
	if price_per_share.is_zero() {
		return U256::ZERO;
	}
	let unit = U256::from(10u8).pow(U256::from(decimals));

	let (numerator, denominator) = if is_depositing {
		(input_amount.checked_mul(unit), price_per_share)
	} else {
		(input_amount.checked_mul(price_per_share), unit)
	};
	match numerator {
		Some(numerator) => numerator / denominator,
		None => {
			tracing::warn!(%input_amount, %price_per_share, "Share quote overflowed");
			U256::ZERO
		}
	}
}

/// True when a quote for `request` is zero without asking the chain.
pub fn is_trivially_zero(request: &TransferRequest) -> bool {
	request.input_amount.is_zero()
		|| is_zero_address(&request.input_token.address)
		|| is_zero_address(&request.output_token.address)
}

pub struct QuoteEngine {
	delivery: Arc<dyn DeliveryInterface>,
}

impl QuoteEngine {
	pub fn new(delivery: Arc<dyn DeliveryInterface>) -> Self {
		Self { delivery }
	}

	pub async fn price_per_share(&self, chain_id: u64, vault: Address) -> Result<U256, DeliveryError> {
		let data = self
			.delivery
			.call(&Transaction::call(
				chain_id,
				vault,
				IVault::pricePerShareCall {}.abi_encode(),
			))
			.await?;
		IVault::pricePerShareCall::abi_decode_returns(&data)
			.map_err(|e| DeliveryError::Network(format!("invalid pricePerShare data: {e}")))
	}

	/// Expected output of converting between the vault's asset and its
	/// shares, in the direction of `request`.
	pub async fn quote_shares(&self, request: &TransferRequest) -> Quote {
		if is_trivially_zero(request) {
			return Quote::zero();
		}

		// Degrades to zero: a missing quote must not block the caller.
		let price_per_share = match self
			.price_per_share(request.chain_id, request.vault.address)
			.await
		{
			Ok(pps) => pps,
			Err(e) => {
				tracing::warn!(
					chain_id = request.chain_id,
					vault = %request.vault.address,
					error = %e,
					"Price per share unavailable, quoting zero"
				);
				return Quote::zero();
			}
		};

		let raw = share_quote(
			request.input_amount,
			price_per_share,
			request.vault.decimals,
			request.is_depositing,
		);
		Quote::new(raw, request.output_token.decimals)
	}

	/// One-to-one conversion, used between vault shares and staked shares.
	pub fn quote_identity(&self, request: &TransferRequest) -> Quote {
		if is_trivially_zero(request) {
			return Quote::zero();
		}
		Quote::new(request.input_amount, request.output_token.decimals)
	}
}
