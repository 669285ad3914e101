//! Native coin deposits through a wrapping zap.
//!
//! Deposits send the coin as value, so no allowance exists or is needed.
//! Withdrawals hand the shares to the zap, which redeems and unwraps them,
//! and therefore need a share allowance for the zap.
//!
//! With `wrapped_native` set, only vaults whose asset is that token (or the
//! native coin itself) are accepted.

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use vault_delivery::{SuccessCallback, TransactionLifecycle, TransactionOutcome};
use vault_types::{
	is_native_coin, AllowanceRecord, ConfigSchema, Field, FieldType, Quote, Schema, SolverKind,
	Transaction, TransferRequest, ValidationError,
};

use crate::contracts::INativeZap;
use crate::{config_address, SolverContext, SolverDeps, SolverError, SolverInterface};

pub struct ChainCoinSolver {
	context: SolverContext,
	zap_contract: Address,
	wrapped_native: Option<Address>,
}

impl ChainCoinSolver {
	pub fn new(deps: SolverDeps, zap_contract: Address) -> Self {
		Self {
			context: SolverContext::new(deps),
			zap_contract,
			wrapped_native: None,
		}
	}

	pub fn with_wrapped_native(mut self, wrapped_native: Address) -> Self {
		self.wrapped_native = Some(wrapped_native);
		self
	}

	fn check_native(&self, request: &TransferRequest) -> Result<(), SolverError> {
		let coin = if request.is_depositing {
			&request.input_token
		} else {
			&request.output_token
		};
		if !is_native_coin(&coin.address) {
			return Err(SolverError::UnsupportedRoute(format!(
				"{} is not the native coin",
				coin.symbol
			)));
		}

		let asset = request.vault.asset;
		match self.wrapped_native {
			Some(wrapped) if asset != wrapped && !is_native_coin(&asset) => {
				Err(SolverError::UnsupportedRoute(format!(
					"vault {} does not hold the wrapped native coin",
					request.vault.address
				)))
			}
			_ => Ok(()),
		}
	}
}

/// The `wrapped_native` address of a chain coin table, if set.
pub fn wrapped_native(config: &toml::Value) -> Result<Option<Address>, SolverError> {
	config_address(config, "wrapped_native")
}

pub struct ChainCoinSchema;

impl ConfigSchema for ChainCoinSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![Field::new("zap_contract", FieldType::Address)],
			vec![Field::new("wrapped_native", FieldType::Address)],
		)
		.validate(config)
	}
}

#[async_trait]
impl SolverInterface for ChainCoinSolver {
	fn kind(&self) -> SolverKind {
		SolverKind::ChainCoin
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(ChainCoinSchema)
	}

	fn context(&self) -> &SolverContext {
		&self.context
	}

	async fn quote(&self, request: &TransferRequest) -> Result<Quote, SolverError> {
		Ok(self.context.deps().quotes.quote_shares(request).await)
	}

	async fn get_allowance(&self, force_refresh: bool) -> Result<AllowanceRecord, SolverError> {
		let request = self.context.request()?;
		self.context
			.allowance(&request, self.zap_contract, force_refresh)
			.await
	}

	async fn approve(
		&self,
		amount: U256,
		lifecycle: &TransactionLifecycle,
		on_success: Option<SuccessCallback>,
	) -> Result<TransactionOutcome, SolverError> {
		let request = self.context.request()?;
		if is_native_coin(&request.spent_token().address) {
			return Err(SolverError::ApprovalNotRequired);
		}
		Ok(self
			.context
			.approve(&request, self.zap_contract, amount, lifecycle, on_success)
			.await)
	}

	async fn execute_deposit(
		&self,
		lifecycle: &TransactionLifecycle,
		on_success: Option<SuccessCallback>,
	) -> Result<TransactionOutcome, SolverError> {
		let request = self.context.request_for(true)?;
		self.check_native(&request)?;
		let tx = Transaction::call(
			request.chain_id,
			self.zap_contract,
			INativeZap::depositCall {}.abi_encode(),
		)
		.with_value(request.input_amount);
		Ok(self.context.send(tx, lifecycle, on_success).await)
	}

	async fn execute_withdraw(
		&self,
		lifecycle: &TransactionLifecycle,
		on_success: Option<SuccessCallback>,
	) -> Result<TransactionOutcome, SolverError> {
		let request = self.context.request_for(false)?;
		self.check_native(&request)?;
		let data = INativeZap::withdrawCall {
			amount: request.input_amount,
		}
		.abi_encode();
		let tx = Transaction::call(request.chain_id, self.zap_contract, data);
		Ok(self.context.send(tx, lifecycle, on_success).await)
	}
}

pub fn create_solver(config: &toml::Value, deps: SolverDeps) -> Result<ChainCoinSolver, SolverError> {
	let zap_contract = config_address(config, "zap_contract")?
		.ok_or_else(|| SolverError::InvalidConfig("zap_contract is required".to_string()))?;
	let solver = ChainCoinSolver::new(deps, zap_contract);
	Ok(match wrapped_native(config)? {
		Some(wrapped) => solver.with_wrapped_native(wrapped),
		None => solver,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::contracts::{IERC20, IVault};
	use crate::test_support::*;
	use std::sync::Arc;
	use vault_delivery::testing::FakeChain;
	use vault_types::NATIVE_COIN_ADDRESS;

	const ONE: u128 = 1_000_000_000_000_000_000;
	const ZAP: Address = Address::repeat_byte(0x2a);

	fn solver(chain: &Arc<FakeChain>) -> ChainCoinSolver {
		chain.set_call(VAULT, IVault::pricePerShareCall::SELECTOR, pps_bytes(2 * ONE));
		ChainCoinSolver::new(deps(chain.clone()), ZAP)
	}

	fn native_deposit(amount: u128) -> TransferRequest {
		let mut request = deposit_request(amount);
		request.input_token = token(NATIVE_COIN_ADDRESS, "ETH", 18);
		request
	}

	fn native_withdraw(amount: u128) -> TransferRequest {
		let mut request = withdraw_request(amount);
		request.output_token = token(NATIVE_COIN_ADDRESS, "ETH", 18);
		request
	}

	#[tokio::test]
	async fn test_native_deposit_sends_value() {
		let chain = Arc::new(FakeChain::new());
		let solver = solver(&chain);

		let quote = solver.init(native_deposit(4 * ONE)).await.unwrap();
		assert_eq!(quote.raw, U256::from(2 * ONE));

		assert_eq!(solver.get_allowance(false).await.unwrap().raw, U256::MAX);
		assert!(matches!(
			solver.approve(U256::from(ONE), &lifecycle(), None).await,
			Err(SolverError::ApprovalNotRequired)
		));

		solver.execute_deposit(&lifecycle(), None).await.unwrap();
		let sent = &chain.submitted()[0];
		assert_eq!(sent.to, ZAP);
		assert_eq!(sent.value, U256::from(4 * ONE));
		assert_eq!(sent.selector(), Some(INativeZap::depositCall::SELECTOR));
	}

	#[tokio::test]
	async fn test_withdraw_needs_share_allowance_for_zap() {
		let chain = Arc::new(FakeChain::new());
		let solver = solver(&chain);
		chain.set_call(VAULT, IERC20::allowanceCall::SELECTOR, pps_bytes(0));

		let quote = solver.init(native_withdraw(ONE)).await.unwrap();
		assert_eq!(quote.raw, U256::from(2 * ONE));
		assert!(solver.get_allowance(false).await.unwrap().is_zero());

		solver
			.approve(U256::from(ONE), &lifecycle(), None)
			.await
			.unwrap();
		let approval = IERC20::approveCall::abi_decode(&chain.submitted()[0].data).unwrap();
		assert_eq!(approval.spender, ZAP);

		solver.execute_withdraw(&lifecycle(), None).await.unwrap();
		let sent = &chain.submitted()[1];
		assert_eq!(sent.to, ZAP);
		assert_eq!(sent.value, U256::ZERO);
	}

	#[tokio::test]
	async fn test_deposit_into_wrapped_native_vault() {
		let chain = Arc::new(FakeChain::new());
		let weth_zap = solver(&chain).with_wrapped_native(ASSET);
		weth_zap.init(native_deposit(ONE)).await.unwrap();
		weth_zap.execute_deposit(&lifecycle(), None).await.unwrap();
		assert_eq!(chain.submitted()[0].value, U256::from(ONE));

		let other = solver(&chain).with_wrapped_native(Address::repeat_byte(0x77));
		other.init(native_deposit(ONE)).await.unwrap();
		assert!(matches!(
			other.execute_deposit(&lifecycle(), None).await,
			Err(SolverError::UnsupportedRoute(_))
		));
	}

	#[test]
	fn test_wrapped_native_from_config() {
		let table: toml::Value = toml::from_str(
			r#"
zap_contract = "0x2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a"
wrapped_native = "0x4200000000000000000000000000000000000006"
"#,
		)
		.unwrap();
		assert!(ChainCoinSchema.validate(&table).is_ok());
		assert_eq!(
			wrapped_native(&table).unwrap(),
			Some(alloy_primitives::address!("4200000000000000000000000000000000000006"))
		);
		assert_eq!(wrapped_native(&toml::Value::Table(Default::default())).unwrap(), None);
	}

	#[tokio::test]
	async fn test_rejects_erc20_deposit() {
		let chain = Arc::new(FakeChain::new());
		let solver = solver(&chain);
		solver.init(deposit_request(ONE)).await.unwrap();
		assert!(matches!(
			solver.execute_deposit(&lifecycle(), None).await,
			Err(SolverError::UnsupportedRoute(_))
		));
	}
}
