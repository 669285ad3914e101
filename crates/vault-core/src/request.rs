//! Building transfer requests from configured metadata.

use alloy_primitives::{Address, U256};
use vault_config::Config;
use vault_types::{is_native_coin, TokenInfo, TokenMetadataSource, TransferRequest};

use crate::RouterError;

const NATIVE_COIN_SYMBOL: &str = "ETH";
const NATIVE_COIN_DECIMALS: u8 = 18;

/// A transfer as a user describes it: which vault, which token on the
/// other side, and how much.
#[derive(Debug, Clone)]
pub struct TransferSpec {
	pub owner: Address,
	pub vault: Address,
	/// Token spent on deposit or received on withdrawal.
	pub token: Address,
	pub amount: U256,
	pub is_depositing: bool,
	/// Use the vault's staking position instead of plain shares.
	pub staked: bool,
}

/// Resolves `spec` against the vault list in `config`, looking token
/// metadata up in `tokens`. The native coin needs no metadata entry.
pub async fn build_request(
	config: &Config,
	tokens: &dyn TokenMetadataSource,
	spec: &TransferSpec,
) -> Result<TransferRequest, RouterError> {
	let chain_id = config.router.chain_id;
	let vault = config
		.vault(&spec.vault)
		.ok_or(RouterError::UnknownVault(spec.vault))?;

	let token = match tokens.token(chain_id, spec.token).await {
		Some(token) => token,
		None if is_native_coin(&spec.token) => TokenInfo {
			chain_id,
			address: spec.token,
			symbol: NATIVE_COIN_SYMBOL.to_string(),
			decimals: NATIVE_COIN_DECIMALS,
		},
		None => return Err(RouterError::UnknownToken(spec.token)),
	};

	let shares = if spec.staked {
		let staking = vault.staking.ok_or_else(|| {
			RouterError::Config(format!("vault {} has no staking contract", vault.address))
		})?;
		tokens
			.token(chain_id, staking)
			.await
			.unwrap_or_else(|| TokenInfo {
				chain_id,
				address: staking,
				symbol: "staked".to_string(),
				decimals: vault.decimals,
			})
	} else {
		tokens
			.token(chain_id, vault.address)
			.await
			.ok_or(RouterError::UnknownToken(vault.address))?
	};

	let (input_token, output_token) = if spec.is_depositing {
		(token, shares)
	} else {
		(shares, token)
	};

	Ok(TransferRequest {
		chain_id,
		owner: spec.owner,
		input_token,
		output_token,
		vault,
		input_amount: spec.amount,
		is_depositing: spec.is_depositing,
	})
}
