//! Staked vault positions on Optimism.
//!
//! Handles the four transfers around a vault with a staking contract:
//! asset into staked shares in one zap call, vault shares into staking,
//! staked shares back out, and plain vault withdrawals.

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use vault_delivery::{SuccessCallback, TransactionLifecycle, TransactionOutcome};
use vault_types::{
	AllowanceRecord, ConfigSchema, Field, FieldType, Quote, Schema, SolverKind, Transaction,
	TransferRequest, ValidationError,
};

use crate::contracts::{IStakingRewards, IStakingRewardsZap, IVault};
use crate::{config_address, SolverContext, SolverDeps, SolverError, SolverInterface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoosterPath {
	/// Asset into staked shares through the zap.
	ZapIn { staking: Address },
	/// Vault shares into the staking contract.
	Stake { staking: Address },
	/// Staked shares back into vault shares.
	Unstake { staking: Address },
	/// Vault shares back into the asset.
	Withdraw,
}

pub struct OptimismBoosterSolver {
	context: SolverContext,
	staking_zap: Address,
}

impl OptimismBoosterSolver {
	pub fn new(deps: SolverDeps, staking_zap: Address) -> Self {
		Self {
			context: SolverContext::new(deps),
			staking_zap,
		}
	}

	fn path(request: &TransferRequest) -> Result<BoosterPath, SolverError> {
		let vault = &request.vault;
		let input = request.input_token.address;
		let output = request.output_token.address;

		if !request.is_depositing && input == vault.address && output == vault.asset {
			return Ok(BoosterPath::Withdraw);
		}

		let staking = vault.staking.ok_or_else(|| {
			SolverError::UnsupportedRoute(format!("vault {} has no staking contract", vault.address))
		})?;
		match (request.is_depositing, input, output) {
			// Depositing into the vault itself also stakes the new shares.
			(true, i, o) if i == vault.asset && (o == staking || o == vault.address) => {
				Ok(BoosterPath::ZapIn { staking })
			}
			(true, i, o) if i == vault.address && o == staking => Ok(BoosterPath::Stake { staking }),
			(false, i, o) if i == staking && o == vault.address => Ok(BoosterPath::Unstake { staking }),
			_ => Err(SolverError::UnsupportedRoute(format!(
				"no staking path from {input} to {output}"
			))),
		}
	}

	/// Contract allowed to pull the spent token, if any.
	fn spender(&self, path: BoosterPath) -> Option<Address> {
		match path {
			BoosterPath::ZapIn { .. } => Some(self.staking_zap),
			BoosterPath::Stake { staking } => Some(staking),
			BoosterPath::Unstake { .. } | BoosterPath::Withdraw => None,
		}
	}
}

pub struct OptimismBoosterSchema;

impl ConfigSchema for OptimismBoosterSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![Field::new("staking_zap", FieldType::Address)], vec![]).validate(config)
	}
}

#[async_trait]
impl SolverInterface for OptimismBoosterSolver {
	fn kind(&self) -> SolverKind {
		SolverKind::OptimismBooster
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(OptimismBoosterSchema)
	}

	fn context(&self) -> &SolverContext {
		&self.context
	}

	async fn quote(&self, request: &TransferRequest) -> Result<Quote, SolverError> {
		let quotes = &self.context.deps().quotes;
		match Self::path(request)? {
			// Staked shares mirror vault shares one to one.
			BoosterPath::Stake { .. } | BoosterPath::Unstake { .. } => Ok(quotes.quote_identity(request)),
			BoosterPath::ZapIn { .. } | BoosterPath::Withdraw => Ok(quotes.quote_shares(request).await),
		}
	}

	async fn get_allowance(&self, force_refresh: bool) -> Result<AllowanceRecord, SolverError> {
		let request = self.context.request()?;
		match self.spender(Self::path(&request)?) {
			Some(spender) => self.context.allowance(&request, spender, force_refresh).await,
			None => Ok(AllowanceRecord::unlimited(request.input_token.decimals)),
		}
	}

	async fn approve(
		&self,
		amount: U256,
		lifecycle: &TransactionLifecycle,
		on_success: Option<SuccessCallback>,
	) -> Result<TransactionOutcome, SolverError> {
		let request = self.context.request()?;
		let spender = self
			.spender(Self::path(&request)?)
			.ok_or(SolverError::ApprovalNotRequired)?;
		Ok(self
			.context
			.approve(&request, spender, amount, lifecycle, on_success)
			.await)
	}

	async fn execute_deposit(
		&self,
		lifecycle: &TransactionLifecycle,
		on_success: Option<SuccessCallback>,
	) -> Result<TransactionOutcome, SolverError> {
		let request = self.context.request_for(true)?;
		let tx = match Self::path(&request)? {
			BoosterPath::ZapIn { .. } => Transaction::call(
				request.chain_id,
				self.staking_zap,
				IStakingRewardsZap::zapInCall {
					vault: request.vault.address,
					amount: request.input_amount,
				}
				.abi_encode(),
			),
			BoosterPath::Stake { staking } => Transaction::call(
				request.chain_id,
				staking,
				IStakingRewards::stakeCall {
					amount: request.input_amount,
				}
				.abi_encode(),
			),
			other => {
				return Err(SolverError::UnsupportedRoute(format!(
					"{other:?} is not a deposit"
				)))
			}
		};
		Ok(self.context.send(tx, lifecycle, on_success).await)
	}

	async fn execute_withdraw(
		&self,
		lifecycle: &TransactionLifecycle,
		on_success: Option<SuccessCallback>,
	) -> Result<TransactionOutcome, SolverError> {
		let request = self.context.request_for(false)?;
		let tx = match Self::path(&request)? {
			BoosterPath::Unstake { staking } => Transaction::call(
				request.chain_id,
				staking,
				IStakingRewards::withdrawCall {
					amount: request.input_amount,
				}
				.abi_encode(),
			),
			BoosterPath::Withdraw => Transaction::call(
				request.chain_id,
				request.vault.address,
				IVault::withdrawCall {
					maxShares: request.input_amount,
				}
				.abi_encode(),
			),
			other => {
				return Err(SolverError::UnsupportedRoute(format!(
					"{other:?} is not a withdrawal"
				)))
			}
		};
		Ok(self.context.send(tx, lifecycle, on_success).await)
	}
}

pub fn create_solver(
	config: &toml::Value,
	deps: SolverDeps,
) -> Result<OptimismBoosterSolver, SolverError> {
	let staking_zap = config_address(config, "staking_zap")?
		.ok_or_else(|| SolverError::InvalidConfig("staking_zap is required".to_string()))?;
	Ok(OptimismBoosterSolver::new(deps, staking_zap))
}
