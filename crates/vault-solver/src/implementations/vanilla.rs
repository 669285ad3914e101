//! Direct vault deposits and withdrawals.
//!
//! The vault is its own spender. Withdrawals burn the owner's shares and
//! need no allowance.

use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use vault_delivery::{SuccessCallback, TransactionLifecycle, TransactionOutcome};
use vault_types::{
	AllowanceRecord, ConfigSchema, Quote, Schema, SolverKind, Transaction, TransferRequest,
	ValidationError,
};

use crate::contracts::IVault;
use crate::{SolverContext, SolverDeps, SolverError, SolverInterface};

pub struct VanillaSolver {
	context: SolverContext,
}

impl VanillaSolver {
	pub fn new(deps: SolverDeps) -> Self {
		Self {
			context: SolverContext::new(deps),
		}
	}
}

pub struct VanillaSchema;

impl ConfigSchema for VanillaSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

#[async_trait]
impl SolverInterface for VanillaSolver {
	fn kind(&self) -> SolverKind {
		SolverKind::Vanilla
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(VanillaSchema)
	}

	fn context(&self) -> &SolverContext {
		&self.context
	}

	async fn quote(&self, request: &TransferRequest) -> Result<Quote, SolverError> {
		Ok(self.context.deps().quotes.quote_shares(request).await)
	}

	async fn get_allowance(&self, force_refresh: bool) -> Result<AllowanceRecord, SolverError> {
		let request = self.context.request()?;
		if !request.is_depositing {
			return Ok(AllowanceRecord::unlimited(request.input_token.decimals));
		}
		self.context
			.allowance(&request, request.vault.address, force_refresh)
			.await
	}

	async fn approve(
		&self,
		amount: U256,
		lifecycle: &TransactionLifecycle,
		on_success: Option<SuccessCallback>,
	) -> Result<TransactionOutcome, SolverError> {
		let request = self.context.request()?;
		if !request.is_depositing {
			return Err(SolverError::ApprovalNotRequired);
		}
		Ok(self
			.context
			.approve(&request, request.vault.address, amount, lifecycle, on_success)
			.await)
	}

	async fn execute_deposit(
		&self,
		lifecycle: &TransactionLifecycle,
		on_success: Option<SuccessCallback>,
	) -> Result<TransactionOutcome, SolverError> {
		let request = self.context.request_for(true)?;
		let data = IVault::depositCall {
			amount: request.input_amount,
		}
		.abi_encode();
		let tx = Transaction::call(request.chain_id, request.vault.address, data);
		Ok(self.context.send(tx, lifecycle, on_success).await)
	}

	async fn execute_withdraw(
		&self,
		lifecycle: &TransactionLifecycle,
		on_success: Option<SuccessCallback>,
	) -> Result<TransactionOutcome, SolverError> {
		let request = self.context.request_for(false)?;
		let data = IVault::withdrawCall {
			maxShares: request.input_amount,
		}
		.abi_encode();
		let tx = Transaction::call(request.chain_id, request.vault.address, data);
		Ok(self.context.send(tx, lifecycle, on_success).await)
	}
}

pub fn create_solver(_config: &toml::Value, deps: SolverDeps) -> Result<VanillaSolver, SolverError> {
	Ok(VanillaSolver::new(deps))
}
