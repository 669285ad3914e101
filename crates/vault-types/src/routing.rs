//! Routing model: what the user asked for and how it gets executed.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a transfer between a token and a vault is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteType {
	/// Underlying asset straight into its vault.
	DirectDeposit,
	/// Vault shares into the vault's staking contract.
	DirectStake,
	/// Anything else, through a zap or swap.
	Aggregator,
}

impl fmt::Display for RouteType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RouteType::DirectDeposit => write!(f, "DIRECT_DEPOSIT"),
			RouteType::DirectStake => write!(f, "DIRECT_STAKE"),
			RouteType::Aggregator => write!(f, "AGGREGATOR"),
		}
	}
}

/// Execution strategy family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
	Vanilla,
	PartnerContract,
	ChainCoin,
	OptimismBooster,
	Cowswap,
}

impl SolverKind {
	pub const ALL: [SolverKind; 5] = [
		SolverKind::Vanilla,
		SolverKind::PartnerContract,
		SolverKind::ChainCoin,
		SolverKind::OptimismBooster,
		SolverKind::Cowswap,
	];

	/// Name used for the solver's configuration table.
	pub fn as_str(&self) -> &'static str {
		match self {
			SolverKind::Vanilla => "vanilla",
			SolverKind::PartnerContract => "partner_contract",
			SolverKind::ChainCoin => "chain_coin",
			SolverKind::OptimismBooster => "optimism_booster",
			SolverKind::Cowswap => "cowswap",
		}
	}

	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL
			.into_iter()
			.find(|kind| kind.as_str().eq_ignore_ascii_case(name))
	}
}

impl fmt::Display for SolverKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Metadata for a token as returned by the metadata source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
	pub chain_id: u64,
	pub address: Address,
	pub symbol: String,
	pub decimals: u8,
}

/// A vault together with its underlying asset and optional staking contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultInfo {
	pub address: Address,
	pub asset: Address,
	pub staking: Option<Address>,
	pub decimals: u8,
}

/// A single deposit or withdrawal intent.
///
/// For deposits `input_token` is what the user spends and `output_token` is
/// what they receive (vault or staking shares). Withdrawals are the mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
	pub chain_id: u64,
	pub owner: Address,
	pub input_token: TokenInfo,
	pub output_token: TokenInfo,
	pub vault: VaultInfo,
	#[serde(with = "crate::serde_helpers::u256_decimal")]
	pub input_amount: U256,
	pub is_depositing: bool,
}

impl TransferRequest {
	/// Token whose allowance gates this request.
	pub fn spent_token(&self) -> &TokenInfo {
		&self.input_token
	}

	/// Tokens whose balances change once the request executes.
	pub fn touched_tokens(&self) -> Vec<Address> {
		vec![self.input_token.address, self.output_token.address]
	}

	/// Returns a copy with a different input amount.
	pub fn with_amount(&self, input_amount: U256) -> Self {
		Self {
			input_amount,
			..self.clone()
		}
	}
}
