//! The router itself.

use alloy_primitives::{Address, U256};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use vault_delivery::{
	DeliveryInterface, LifecycleConfig, SuccessCallback, TransactionLifecycle, TransactionOutcome,
};
use vault_solver::{classify, SolverInterface};
use vault_types::{
	is_native_coin, AllowanceRecord, EventBus, Quote, RouteType, RouterEvent, SolverKind,
	TransactionEvent, TransactionHash, TransactionType, TransferRequest,
};

use crate::RouterError;

/// Which solver family the caller wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverPreference {
	/// Follow the route classification.
	#[default]
	Auto,
	/// Always use the gasless orderbook.
	Cowswap,
}

#[derive(Debug, Clone)]
pub struct RouterSettings {
	pub chain_id: u64,
	pub stake_on_deposit: bool,
	/// Token the native-coin zap wraps into. Native transfers into a vault
	/// holding this asset classify as direct deposits.
	pub wrapped_native: Option<Address>,
	pub lifecycle: LifecycleConfig,
}

impl From<&vault_config::RouterConfig> for RouterSettings {
	fn from(config: &vault_config::RouterConfig) -> Self {
		Self {
			chain_id: config.chain_id,
			stake_on_deposit: config.stake_on_deposit,
			wrapped_native: None,
			lifecycle: LifecycleConfig {
				receipt_timeout: config.receipt_timeout(),
				poll_interval: config.poll_interval(),
				repoll_interval: config.repoll_interval(),
				max_repolls: config.max_repolls,
			},
		}
	}
}

/// Result of [`VaultRouter::prepare`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedRoute {
	pub route: RouteType,
	pub solver: SolverKind,
	pub quote: Quote,
}

pub struct VaultRouter {
	settings: RouterSettings,
	delivery: Arc<dyn DeliveryInterface>,
	solvers: HashMap<SolverKind, Arc<dyn SolverInterface>>,
	active: Mutex<Option<Arc<dyn SolverInterface>>>,
	approve_lifecycle: TransactionLifecycle,
	execute_lifecycle: TransactionLifecycle,
	// Held for the duration of a write so two callers cannot both pass the
	// pending check.
	approve_gate: tokio::sync::Mutex<()>,
	execute_gate: tokio::sync::Mutex<()>,
	events: EventBus,
}

impl VaultRouter {
	pub fn new(
		settings: RouterSettings,
		delivery: Arc<dyn DeliveryInterface>,
		solvers: HashMap<SolverKind, Arc<dyn SolverInterface>>,
		events: EventBus,
	) -> Self {
		Self {
			approve_lifecycle: TransactionLifecycle::new(settings.lifecycle.clone()),
			execute_lifecycle: TransactionLifecycle::new(settings.lifecycle.clone()),
			settings,
			delivery,
			solvers,
			active: Mutex::new(None),
			approve_gate: tokio::sync::Mutex::new(()),
			execute_gate: tokio::sync::Mutex::new(()),
			events,
		}
	}

	pub fn settings(&self) -> &RouterSettings {
		&self.settings
	}

	pub fn events(&self) -> &EventBus {
		&self.events
	}

	pub fn approve_lifecycle(&self) -> &TransactionLifecycle {
		&self.approve_lifecycle
	}

	pub fn execute_lifecycle(&self) -> &TransactionLifecycle {
		&self.execute_lifecycle
	}

	pub fn configured_solvers(&self) -> Vec<SolverKind> {
		SolverKind::ALL
			.into_iter()
			.filter(|kind| self.solvers.contains_key(kind))
			.collect()
	}

	/// Route of `request`. Withdrawals are classified as the deposit that
	/// would reverse them. The native coin stands in for the vault asset
	/// when that asset is the wrapped native token.
	pub fn classify(&self, request: &TransferRequest) -> RouteType {
		let vault = &request.vault;
		let (deposit_token, destination) = if request.is_depositing {
			(request.input_token.address, request.output_token.address)
		} else {
			(request.output_token.address, request.input_token.address)
		};
		let deposit_token = if self.wraps_into(deposit_token, vault.asset) {
			vault.asset
		} else {
			deposit_token
		};
		classify(deposit_token, vault.asset, destination, vault.address, vault.staking)
	}

	fn wraps_into(&self, token: Address, asset: Address) -> bool {
		is_native_coin(&token) && self.settings.wrapped_native == Some(asset)
	}

	pub fn select_solver(
		&self,
		request: &TransferRequest,
		preference: SolverPreference,
	) -> Result<SolverKind, RouterError> {
		let kind = match (preference, self.classify(request)) {
			(SolverPreference::Cowswap, _) | (_, RouteType::Aggregator) => SolverKind::Cowswap,
			(_, RouteType::DirectStake) => SolverKind::OptimismBooster,
			(_, RouteType::DirectDeposit) => self.select_direct_deposit(request),
		};
		if !self.solvers.contains_key(&kind) {
			return Err(RouterError::SolverNotConfigured(kind));
		}
		Ok(kind)
	}

	fn select_direct_deposit(&self, request: &TransferRequest) -> SolverKind {
		let touches_native =
			is_native_coin(&request.input_token.address) || is_native_coin(&request.output_token.address);
		if touches_native {
			SolverKind::ChainCoin
		} else if self.solvers.contains_key(&SolverKind::PartnerContract) {
			SolverKind::PartnerContract
		} else if self.settings.stake_on_deposit
			&& request.vault.staking.is_some()
			&& self.solvers.contains_key(&SolverKind::OptimismBooster)
		{
			SolverKind::OptimismBooster
		} else {
			SolverKind::Vanilla
		}
	}

	/// Selects a solver for `request`, makes it active and quotes.
	pub async fn prepare(
		&self,
		request: TransferRequest,
		preference: SolverPreference,
	) -> Result<PreparedRoute, RouterError> {
		if request.chain_id != self.settings.chain_id {
			return Err(RouterError::WrongChain {
				expected: self.settings.chain_id,
				actual: request.chain_id,
			});
		}

		let route = self.classify(&request);
		let kind = self.select_solver(&request, preference)?;
		let solver = self.solver(kind)?;
		self.set_active(solver.clone());
		for lifecycle in [&self.approve_lifecycle, &self.execute_lifecycle] {
			if !lifecycle.is_pending() {
				lifecycle.reset();
			}
		}

		tracing::info!(
			chain_id = request.chain_id,
			route = %route,
			solver = kind.as_str(),
			amount = %request.input_amount,
			"Route selected"
		);
		self.events.publish(RouterEvent::RouteSelected {
			chain_id: request.chain_id,
			route,
			solver: kind,
		});

		let quote = solver.init(request).await?;
		self.publish_quote(solver.as_ref(), &quote);
		Ok(PreparedRoute {
			route,
			solver: kind,
			quote,
		})
	}

	pub async fn refresh_quote(&self) -> Result<Quote, RouterError> {
		let solver = self.active()?;
		let quote = solver.refresh_quote().await?;
		self.publish_quote(solver.as_ref(), &quote);
		Ok(quote)
	}

	pub async fn allowance(&self, force_refresh: bool) -> Result<AllowanceRecord, RouterError> {
		Ok(self.active()?.get_allowance(force_refresh).await?)
	}

	pub async fn approve(
		&self,
		amount: U256,
		on_success: Option<SuccessCallback>,
	) -> Result<TransactionOutcome, RouterError> {
		let solver = self.active()?;
		let _gate = self
			.approve_gate
			.try_lock()
			.map_err(|_| RouterError::TransactionInFlight(TransactionType::Approve))?;
		if self.approve_lifecycle.is_pending() {
			return Err(RouterError::TransactionInFlight(TransactionType::Approve));
		}

		let outcome = solver
			.approve(amount, &self.approve_lifecycle, on_success)
			.await?;
		self.publish_outcome(&outcome, TransactionType::Approve);
		Ok(outcome)
	}

	/// Deposits or withdraws, following the direction of the prepared
	/// request. Balances of the touched tokens are invalidated once the write
	/// confirms or the order is accepted.
	pub async fn execute(
		&self,
		on_success: Option<SuccessCallback>,
	) -> Result<TransactionOutcome, RouterError> {
		let solver = self.active()?;
		let request = solver.context().request()?;
		let tx_type = if request.is_depositing {
			TransactionType::Deposit
		} else {
			TransactionType::Withdraw
		};

		let _gate = self
			.execute_gate
			.try_lock()
			.map_err(|_| RouterError::TransactionInFlight(tx_type))?;
		if self.execute_lifecycle.is_pending() {
			return Err(RouterError::TransactionInFlight(tx_type));
		}

		let on_success = self.invalidate_balances(&request, on_success);
		let outcome = if request.is_depositing {
			solver
				.execute_deposit(&self.execute_lifecycle, Some(on_success))
				.await?
		} else {
			solver
				.execute_withdraw(&self.execute_lifecycle, Some(on_success))
				.await?
		};
		self.publish_outcome(&outcome, tx_type);
		Ok(outcome)
	}

	/// Keeps polling an approval that was still pending after `approve`.
	pub async fn track_approval(&self, hash: TransactionHash) -> TransactionOutcome {
		let outcome = self
			.approve_lifecycle
			.track(self.delivery.as_ref(), hash, self.settings.chain_id)
			.await;
		self.publish_outcome(&outcome, TransactionType::Approve);
		outcome
	}

	/// Keeps polling a deposit or withdrawal that was still pending after
	/// `execute`.
	pub async fn track_execution(&self, hash: TransactionHash) -> Result<TransactionOutcome, RouterError> {
		let request = self.active()?.context().request()?;
		let tx_type = if request.is_depositing {
			TransactionType::Deposit
		} else {
			TransactionType::Withdraw
		};
		let outcome = self
			.execute_lifecycle
			.track(self.delivery.as_ref(), hash, self.settings.chain_id)
			.await;
		self.publish_outcome(&outcome, tx_type);
		Ok(outcome)
	}

	pub fn active_solver(&self) -> Option<SolverKind> {
		self.active
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.as_ref()
			.map(|solver| solver.kind())
	}

	fn solver(&self, kind: SolverKind) -> Result<Arc<dyn SolverInterface>, RouterError> {
		self.solvers
			.get(&kind)
			.cloned()
			.ok_or(RouterError::SolverNotConfigured(kind))
	}

	fn active(&self) -> Result<Arc<dyn SolverInterface>, RouterError> {
		self.active
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.clone()
			.ok_or(RouterError::NoActiveRoute)
	}

	fn set_active(&self, solver: Arc<dyn SolverInterface>) {
		*self.active.lock().unwrap_or_else(|e| e.into_inner()) = Some(solver);
	}

	fn invalidate_balances(
		&self,
		request: &TransferRequest,
		on_success: Option<SuccessCallback>,
	) -> SuccessCallback {
		let events = self.events.clone();
		let chain_id = request.chain_id;
		let tokens = request.touched_tokens();
		Box::new(move |receipt| {
			async move {
				tracing::debug!(chain_id, tokens = tokens.len(), "Invalidating balances");
				events.publish(RouterEvent::BalancesInvalidated { chain_id, tokens });
				if let Some(on_success) = on_success {
					on_success(receipt).await;
				}
			}
			.boxed()
		})
	}

	fn publish_quote(&self, solver: &dyn SolverInterface, quote: &Quote) {
		self.events.publish(RouterEvent::QuoteUpdated {
			solver: solver.kind(),
			request_id: solver.context().ticket(),
			quote: quote.clone(),
		});
	}

	fn publish_outcome(&self, outcome: &TransactionOutcome, tx_type: TransactionType) {
		let event = match outcome {
			TransactionOutcome::Confirmed { receipt } => RouterEvent::Transaction(TransactionEvent::Confirmed {
				receipt: receipt.clone(),
				tx_type,
			}),
			TransactionOutcome::Pending { hash } => RouterEvent::Transaction(TransactionEvent::Pending {
				tx_hash: *hash,
				tx_type,
			}),
			TransactionOutcome::Failed { reason } => {
				tracing::warn!(?tx_type, %reason, "Transaction failed");
				RouterEvent::Transaction(TransactionEvent::Failed {
					tx_type,
					reason: reason.clone(),
				})
			}
			TransactionOutcome::Accepted { reference } => RouterEvent::OrderSubmitted {
				chain_id: self.settings.chain_id,
				order_uid: reference.clone(),
			},
		};
		self.events.publish(event);
	}
}
