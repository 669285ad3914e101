//! Deposit and withdrawal strategies.
//!
//! A solver owns one routing path end to end: quoting, the allowance check,
//! the approve transaction and the final write. Every solver keeps its
//! session in a [`SolverContext`] and shares the chain provider, allowance
//! cache and quote engine handed to it through [`SolverDeps`].

use alloy_primitives::U256;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use vault_account::AccountInterface;
use vault_delivery::{DeliveryInterface, SuccessCallback, TransactionLifecycle, TransactionOutcome};
use vault_order::OrderError;
use vault_settlement::{SettlementError, SettlementInterface};
use vault_types::{AllowanceRecord, ConfigSchema, Quote, SolverKind, TransferRequest};

pub mod allowance;
pub mod context;
pub mod contracts;
pub mod quote;
pub mod route;

pub mod implementations {
	pub mod chain_coin;
	pub mod cowswap;
	pub mod optimism_booster;
	pub mod partner_contract;
	pub mod vanilla;
}

pub use allowance::{AllowanceKey, AllowanceTracker};
pub use context::SolverContext;
pub use implementations::chain_coin::wrapped_native;
pub use quote::{share_quote, QuoteEngine};
pub use route::classify;

#[derive(Debug, Error)]
pub enum SolverError {
	/// An allowance could not be read. Callers disable the dependent action.
	#[error("Quote unavailable: {0}")]
	QuoteUnavailable(String),
	#[error("No transfer request has been set")]
	MissingRequest,
	#[error("No quote for the current request")]
	MissingQuote,
	#[error("Request {0} was superseded by a newer one")]
	Superseded(u64),
	#[error("No approval is required for this transfer")]
	ApprovalNotRequired,
	#[error("Unsupported route: {0}")]
	UnsupportedRoute(String),
	#[error("Order error: {0}")]
	Order(#[from] OrderError),
	#[error("Settlement error: {0}")]
	Settlement(#[from] SettlementError),
	#[error("Invalid solver config: {0}")]
	InvalidConfig(String),
}

/// Services shared by every solver of a session.
#[derive(Clone)]
pub struct SolverDeps {
	pub delivery: Arc<dyn DeliveryInterface>,
	pub allowances: Arc<AllowanceTracker>,
	pub quotes: Arc<QuoteEngine>,
	/// Order signer, required by the gasless solver only.
	pub signer: Option<Arc<dyn AccountInterface>>,
	/// Orderbook override. Without one the gasless solver builds its own
	/// from its `api_url`.
	pub settlement: Option<Arc<dyn SettlementInterface>>,
}

impl SolverDeps {
	pub fn new(delivery: Arc<dyn DeliveryInterface>) -> Self {
		Self {
			allowances: Arc::new(AllowanceTracker::new(delivery.clone())),
			quotes: Arc::new(QuoteEngine::new(delivery.clone())),
			delivery,
			signer: None,
			settlement: None,
		}
	}

	pub fn with_signer(mut self, signer: Arc<dyn AccountInterface>) -> Self {
		self.signer = Some(signer);
		self
	}

	pub fn with_settlement(mut self, settlement: Arc<dyn SettlementInterface>) -> Self {
		self.settlement = Some(settlement);
		self
	}
}

#[async_trait]
pub trait SolverInterface: Send + Sync {
	fn kind(&self) -> SolverKind;

	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	fn context(&self) -> &SolverContext;

	/// Computes the quote for `request` without touching session state.
	async fn quote(&self, request: &TransferRequest) -> Result<Quote, SolverError>;

	/// Allowance of the spent token for this solver's spender.
	async fn get_allowance(&self, force_refresh: bool) -> Result<AllowanceRecord, SolverError>;

	/// Approves this solver's spender. Returns `ApprovalNotRequired` when
	/// the current request needs no allowance.
	async fn approve(
		&self,
		amount: U256,
		lifecycle: &TransactionLifecycle,
		on_success: Option<SuccessCallback>,
	) -> Result<TransactionOutcome, SolverError>;

	async fn execute_deposit(
		&self,
		lifecycle: &TransactionLifecycle,
		on_success: Option<SuccessCallback>,
	) -> Result<TransactionOutcome, SolverError>;

	async fn execute_withdraw(
		&self,
		lifecycle: &TransactionLifecycle,
		on_success: Option<SuccessCallback>,
	) -> Result<TransactionOutcome, SolverError>;

	/// Sets a new request, superseding any quote still in flight, and
	/// returns its quote.
	async fn init(&self, request: TransferRequest) -> Result<Quote, SolverError> {
		let ticket = self.context().begin(request.clone());
		tracing::debug!(solver = self.kind().as_str(), request_id = ticket, amount = %request.input_amount, "Quoting new request");
		let quote = self.quote(&request).await?;
		self.context().commit(ticket, quote)
	}

	/// Re-quotes the current request.
	async fn refresh_quote(&self) -> Result<Quote, SolverError> {
		let (ticket, request) = self.context().renew()?;
		let quote = self.quote(&request).await?;
		self.context().commit(ticket, quote)
	}

	fn current_quote(&self) -> Option<Quote> {
		self.context().current_quote()
	}
}

/// Builds a solver from its kind and configuration table.
pub fn create_solver(
	kind: SolverKind,
	config: &toml::Value,
	deps: SolverDeps,
) -> Result<Arc<dyn SolverInterface>, SolverError> {
	let schema = solver_schema(kind);
	schema
		.validate(config)
		.map_err(|e| SolverError::InvalidConfig(format!("{}: {e}", kind.as_str())))?;

	let solver: Arc<dyn SolverInterface> = match kind {
		SolverKind::Vanilla => Arc::new(implementations::vanilla::create_solver(config, deps)?),
		SolverKind::PartnerContract => {
			Arc::new(implementations::partner_contract::create_solver(config, deps)?)
		}
		SolverKind::ChainCoin => Arc::new(implementations::chain_coin::create_solver(config, deps)?),
		SolverKind::OptimismBooster => {
			Arc::new(implementations::optimism_booster::create_solver(config, deps)?)
		}
		SolverKind::Cowswap => Arc::new(implementations::cowswap::create_solver(config, deps)?),
	};
	tracing::debug!(solver = kind.as_str(), "Created solver");
	Ok(solver)
}

pub fn solver_schema(kind: SolverKind) -> Box<dyn ConfigSchema> {
	match kind {
		SolverKind::Vanilla => Box::new(implementations::vanilla::VanillaSchema),
		SolverKind::PartnerContract => Box::new(implementations::partner_contract::PartnerContractSchema),
		SolverKind::ChainCoin => Box::new(implementations::chain_coin::ChainCoinSchema),
		SolverKind::OptimismBooster => Box::new(implementations::optimism_booster::OptimismBoosterSchema),
		SolverKind::Cowswap => Box::new(implementations::cowswap::CowswapSchema),
	}
}

/// Reads an address field from a solver table.
pub(crate) fn config_address(
	config: &toml::Value,
	field: &str,
) -> Result<Option<alloy_primitives::Address>, SolverError> {
	match config.get(field).and_then(|v| v.as_str()) {
		None => Ok(None),
		Some(raw) => {
			let address = vault_types::normalize_address(raw);
			if vault_types::is_zero_address(&address) {
				return Err(SolverError::InvalidConfig(format!("{field} is not a valid address")));
			}
			Ok(Some(address))
		}
	}
}


#[cfg(test)]
mod tests {
	use super::test_support::*;
	use super::*;
	use crate::contracts::IVault;
	use alloy_primitives::Address;
	use alloy_sol_types::SolCall;
	use vault_delivery::testing::FakeChain;

	const ONE: u128 = 1_000_000_000_000_000_000;

	#[tokio::test]
	async fn test_refresh_without_request_is_an_error() {
		let chain = Arc::new(FakeChain::new());
		let solver = create_solver(SolverKind::Vanilla, &empty_config(), deps(chain.clone())).unwrap();

		assert!(matches!(solver.refresh_quote().await, Err(SolverError::MissingRequest)));
		assert_eq!(chain.call_count(), 0);
	}

	#[tokio::test]
	async fn test_zero_amount_init_makes_no_call() {
		let chain = Arc::new(FakeChain::new());

		let vanilla = create_solver(SolverKind::Vanilla, &empty_config(), deps(chain.clone())).unwrap();
		assert!(vanilla.init(deposit_request(0)).await.unwrap().is_zero());

		let config = toml::from_str(r#"staking_zap = "0x4444444444444444444444444444444444444444""#).unwrap();
		let booster = create_solver(SolverKind::OptimismBooster, &config, deps(chain.clone())).unwrap();
		let mut into_staking = deposit_request(0);
		into_staking.output_token.address = STAKING;
		assert!(booster.init(into_staking).await.unwrap().is_zero());

		assert_eq!(chain.call_count(), 0);
	}

	#[tokio::test]
	async fn test_stale_request_does_not_overwrite_newer_quote() {
		let chain = Arc::new(FakeChain::new());
		let slow_vault = Address::repeat_byte(0x51);
		let selector = IVault::pricePerShareCall::SELECTOR;
		chain.set_call(slow_vault, selector, pps_bytes(2 * ONE));
		chain.set_call(VAULT, selector, pps_bytes(ONE));
		chain.gate(slow_vault);

		let solver = create_solver(SolverKind::Vanilla, &empty_config(), deps(chain.clone())).unwrap();

		let mut request_a = deposit_request(10 * ONE);
		request_a.vault.address = slow_vault;
		request_a.output_token.address = slow_vault;
		let request_b = deposit_request(10 * ONE);

		let pending_a = {
			let solver = solver.clone();
			tokio::spawn(async move { solver.init(request_a).await })
		};
		chain.wait_for_calls(slow_vault, 1).await;

		let quote_b = solver.init(request_b).await.unwrap();
		assert_eq!(quote_b.raw, U256::from(10 * ONE));

		chain.release(slow_vault);
		let result_a = pending_a.await.unwrap();
		assert!(matches!(result_a, Err(SolverError::Superseded(_))));
		assert_eq!(solver.current_quote(), Some(quote_b));
	}

	#[test]
	fn test_factory_validates_config() {
		let chain = Arc::new(FakeChain::new());
		let result = create_solver(SolverKind::PartnerContract, &empty_config(), deps(chain));
		assert!(matches!(result, Err(SolverError::InvalidConfig(_))));
	}

	#[test]
	fn test_cowswap_requires_signer() {
		let chain = Arc::new(FakeChain::new());
		let config = toml::from_str(r#"api_url = "https://api.cow.fi/optimism""#).unwrap();
		let result = create_solver(SolverKind::Cowswap, &config, deps(chain));
		assert!(matches!(result, Err(SolverError::InvalidConfig(_))));
	}
}
