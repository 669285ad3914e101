//! Deposits routed through a partner tracker contract.
//!
//! The tracker pulls the asset, deposits into the vault for the owner and
//! credits `partner_id` for attribution. Withdrawals go to the vault
//! directly.

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use vault_delivery::{SuccessCallback, TransactionLifecycle, TransactionOutcome};
use vault_types::{
	AllowanceRecord, ConfigSchema, Field, FieldType, Quote, Schema, SolverKind, Transaction,
	TransferRequest, ValidationError,
};

use crate::contracts::{IPartnerTracker, IVault};
use crate::{config_address, SolverContext, SolverDeps, SolverError, SolverInterface};

pub struct PartnerContractSolver {
	context: SolverContext,
	partner_contract: Address,
	partner_id: Address,
}

impl PartnerContractSolver {
	pub fn new(deps: SolverDeps, partner_contract: Address, partner_id: Address) -> Self {
		Self {
			context: SolverContext::new(deps),
			partner_contract,
			partner_id,
		}
	}
}

pub struct PartnerContractSchema;

impl ConfigSchema for PartnerContractSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("partner_contract", FieldType::Address),
				Field::new("partner_id", FieldType::Address),
			],
			vec![],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl SolverInterface for PartnerContractSolver {
	fn kind(&self) -> SolverKind {
		SolverKind::PartnerContract
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(PartnerContractSchema)
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
			.allowance(&request, self.partner_contract, force_refresh)
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
			.approve(&request, self.partner_contract, amount, lifecycle, on_success)
			.await)
	}

	async fn execute_deposit(
		&self,
		lifecycle: &TransactionLifecycle,
		on_success: Option<SuccessCallback>,
	) -> Result<TransactionOutcome, SolverError> {
		let request = self.context.request_for(true)?;
		let data = IPartnerTracker::depositCall {
			vault: request.vault.address,
			partnerId: self.partner_id,
			amount: request.input_amount,
		}
		.abi_encode();
		tracing::debug!(partner = %self.partner_id, vault = %request.vault.address, "Depositing through partner tracker");
		let tx = Transaction::call(request.chain_id, self.partner_contract, data);
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

pub fn create_solver(
	config: &toml::Value,
	deps: SolverDeps,
) -> Result<PartnerContractSolver, SolverError> {
	let partner_contract = config_address(config, "partner_contract")?
		.ok_or_else(|| SolverError::InvalidConfig("partner_contract is required".to_string()))?;
	let partner_id = config_address(config, "partner_id")?
		.ok_or_else(|| SolverError::InvalidConfig("partner_id is required".to_string()))?;
	Ok(PartnerContractSolver::new(deps, partner_contract, partner_id))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::contracts::IERC20;
	use crate::test_support::*;
	use std::sync::Arc;
	use vault_delivery::testing::FakeChain;

	const ONE: u128 = 1_000_000_000_000_000_000;
	const TRACKER: Address = Address::repeat_byte(0x8e);
	const PARTNER: Address = Address::repeat_byte(0x9f);

	fn solver(chain: &Arc<FakeChain>) -> PartnerContractSolver {
		chain.set_call(VAULT, IVault::pricePerShareCall::SELECTOR, pps_bytes(ONE));
		let config: toml::Value = toml::from_str(&format!(
			"partner_contract = \"{TRACKER}\"\npartner_id = \"{PARTNER}\""
		))
		.unwrap();
		create_solver(&config, deps(chain.clone())).unwrap()
	}

	#[tokio::test]
	async fn test_deposit_goes_through_tracker() {
		let chain = Arc::new(FakeChain::new());
		let solver = solver(&chain);
		solver.init(deposit_request(3 * ONE)).await.unwrap();

		let outcome = solver.execute_deposit(&lifecycle(), None).await.unwrap();
		assert!(outcome.is_success());

		let sent = &chain.submitted()[0];
		assert_eq!(sent.to, TRACKER);
		let call = IPartnerTracker::depositCall::abi_decode(&sent.data).unwrap();
		assert_eq!(call.vault, VAULT);
		assert_eq!(call.partnerId, PARTNER);
		assert_eq!(call.amount, U256::from(3 * ONE));
	}

	#[tokio::test]
	async fn test_spender_is_tracker() {
		let chain = Arc::new(FakeChain::new());
		let solver = solver(&chain);
		chain.set_call(ASSET, IERC20::allowanceCall::SELECTOR, pps_bytes(7));
		solver.init(deposit_request(ONE)).await.unwrap();

		assert_eq!(solver.get_allowance(false).await.unwrap().raw, U256::from(7u8));
		let key = solver.context().allowance_key(&deposit_request(ONE), TRACKER);
		assert!(solver.context().deps().allowances.cached(&key).is_some());
	}

	#[tokio::test]
	async fn test_withdraw_goes_to_vault() {
		let chain = Arc::new(FakeChain::new());
		let solver = solver(&chain);
		solver.init(withdraw_request(ONE)).await.unwrap();

		solver.execute_withdraw(&lifecycle(), None).await.unwrap();
		assert_eq!(chain.submitted()[0].to, VAULT);
	}

	#[test]
	fn test_rejects_zero_partner() {
		let chain = Arc::new(FakeChain::new());
		let config: toml::Value = toml::from_str(&format!(
			"partner_contract = \"{TRACKER}\"\npartner_id = \"0x0000000000000000000000000000000000000000\""
		))
		.unwrap();
		assert!(create_solver(&config, deps(chain)).is_err());
	}
}
