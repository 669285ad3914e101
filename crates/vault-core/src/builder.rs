//! Wires a [`VaultRouter`] from configuration.

use std::collections::HashMap;
use std::sync::Arc;
use vault_account::AccountInterface;
use vault_config::Config;
use vault_delivery::DeliveryInterface;
use vault_settlement::SettlementInterface;
use vault_solver::{create_solver, wrapped_native, SolverDeps, SolverInterface};
use vault_types::{EventBus, SolverKind};

use crate::{RouterError, RouterSettings, VaultRouter};

const EVENT_CAPACITY: usize = 256;

pub struct RouterBuilder {
	config: Config,
	delivery: Option<Arc<dyn DeliveryInterface>>,
	signer: Option<Arc<dyn AccountInterface>>,
	settlement: Option<Arc<dyn SettlementInterface>>,
	event_bus: Option<EventBus>,
}

impl RouterBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			delivery: None,
			signer: None,
			settlement: None,
			event_bus: None,
		}
	}

	pub fn with_delivery(mut self, delivery: Arc<dyn DeliveryInterface>) -> Self {
		self.delivery = Some(delivery);
		self
	}

	pub fn with_signer(mut self, signer: Arc<dyn AccountInterface>) -> Self {
		self.signer = Some(signer);
		self
	}

	/// Overrides the orderbook the gasless solver would build from its
	/// `api_url`.
	pub fn with_settlement(mut self, settlement: Arc<dyn SettlementInterface>) -> Self {
		self.settlement = Some(settlement);
		self
	}

	pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
		self.event_bus = Some(event_bus);
		self
	}

	/// Builds every configured solver plus the vanilla one, which needs no
	/// configuration. All solvers share one allowance cache.
	pub fn build(self) -> Result<VaultRouter, RouterError> {
		let delivery = self
			.delivery
			.ok_or_else(|| RouterError::Config("Delivery provider not provided".into()))?;

		let mut deps = SolverDeps::new(delivery.clone());
		if let Some(signer) = self.signer {
			deps = deps.with_signer(signer);
		}
		if let Some(settlement) = self.settlement {
			deps = deps.with_settlement(settlement);
		}

		let empty = toml::Value::Table(Default::default());
		let mut solvers: HashMap<SolverKind, Arc<dyn SolverInterface>> = HashMap::new();
		solvers.insert(
			SolverKind::Vanilla,
			create_solver(
				SolverKind::Vanilla,
				self.config.solver_table(SolverKind::Vanilla.as_str()).unwrap_or(&empty),
				deps.clone(),
			)?,
		);
		for (name, table) in &self.config.solvers {
			let kind = SolverKind::from_name(name)
				.ok_or_else(|| RouterError::Config(format!("Unknown solver '{name}'")))?;
			solvers.insert(kind, create_solver(kind, table, deps.clone())?);
		}

		let mut settings = RouterSettings::from(&self.config.router);
		if let Some(table) = self.config.solver_table(SolverKind::ChainCoin.as_str()) {
			settings.wrapped_native = wrapped_native(table)?;
		}

		tracing::info!(
			chain_id = self.config.router.chain_id,
			solvers = solvers.len(),
			"Router ready"
		);
		Ok(VaultRouter::new(
			settings,
			delivery,
			solvers,
			self.event_bus.unwrap_or_else(|| EventBus::new(EVENT_CAPACITY)),
		))
	}
}
