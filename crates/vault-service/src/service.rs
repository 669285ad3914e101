//! Builds the router from configuration and runs one command against it.

use alloy_primitives::{Address, U256};
use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use std::sync::Arc;
use vault_account::{account_schema, create_account, AccountInterface};
use vault_config::Config;
use vault_core::{build_request, RouterBuilder, VaultRouter};
use vault_delivery::{create_delivery, delivery_schema, TransactionOutcome};
use vault_solver::solver_schema;
use vault_types::{SolverKind, TokenMetadataSource, TransferRequest};

use crate::cli::{Command, TransferArgs};

pub struct VaultService {
	config: Config,
	tokens: Arc<dyn TokenMetadataSource>,
	router: VaultRouter,
	owner: Address,
}

/// Checks every implementation table against its schema.
pub fn validate_implementations(config: &Config) -> Result<()> {
	let account = &config.account;
	account_schema(&account.implementation)
		.ok_or_else(|| anyhow!("Unknown account implementation '{}'", account.implementation))?
		.validate(&account.config)
		.context("Invalid [account.config]")?;

	let delivery = &config.delivery;
	delivery_schema(&delivery.implementation)
		.ok_or_else(|| anyhow!("Unknown delivery implementation '{}'", delivery.implementation))?
		.validate(&delivery.config)
		.context("Invalid [delivery.config]")?;

	for (name, table) in &config.solvers {
		let kind = SolverKind::from_name(name).ok_or_else(|| anyhow!("Unknown solver '{name}'"))?;
		solver_schema(kind)
			.validate(table)
			.with_context(|| format!("Invalid [solvers.{name}]"))?;
	}
	Ok(())
}

pub fn config_summary(config: &Config) -> serde_json::Value {
	serde_json::json!({
		"chain_id": config.router.chain_id,
		"vaults": config.vaults.len(),
		"tokens": config.tokens.len(),
		"solvers": config.solvers.keys().collect::<Vec<_>>(),
	})
}

impl VaultService {
	pub async fn new(config: Config) -> Result<Self> {
		validate_implementations(&config)?;

		let signer: Arc<dyn AccountInterface> = Arc::from(
			create_account(&config.account.implementation, &config.account.config)
				.context("Failed to create account")?,
		);
		let owner = signer.address().await.context("Failed to read account address")?;

		let private_key = signer.private_key_hex();
		let delivery = create_delivery(
			&config.delivery.implementation,
			&config.delivery.config,
			private_key.as_deref(),
		)
		.context("Failed to create delivery provider")?;

		let router = RouterBuilder::new(config.clone())
			.with_delivery(delivery)
			.with_signer(signer)
			.build()
			.context("Failed to build router")?;

		tracing::info!(%owner, chain_id = config.router.chain_id, "Vault service ready");
		Ok(Self {
			tokens: Arc::new(config.token_list()),
			config,
			router,
			owner,
		})
	}

	pub async fn run(&self, command: &Command) -> Result<serde_json::Value> {
		match command {
			Command::Validate => Ok(config_summary(&self.config)),
			Command::Route { transfer, withdraw } => self.route(transfer, !withdraw).await,
			Command::Quote { transfer, withdraw } => self.quote(transfer, !withdraw).await,
			Command::Allowance {
				transfer,
				withdraw,
				refresh,
			} => self.allowance(transfer, !withdraw, *refresh).await,
			Command::Approve { transfer, withdraw } => self.approve(transfer, !withdraw).await,
			Command::Deposit { transfer, approve } => self.execute(transfer, true, *approve).await,
			Command::Withdraw { transfer, approve } => self.execute(transfer, false, *approve).await,
		}
	}

	pub async fn route(&self, transfer: &TransferArgs, is_depositing: bool) -> Result<serde_json::Value> {
		let request = self.request(transfer, is_depositing).await?;
		let route = self.router.classify(&request);
		let solver = self.router.select_solver(&request, transfer.preference())?;
		Ok(serde_json::json!({
			"route": route,
			"solver": solver,
			"input_token": request.input_token,
			"output_token": request.output_token,
		}))
	}

	pub async fn quote(&self, transfer: &TransferArgs, is_depositing: bool) -> Result<serde_json::Value> {
		let prepared = self.prepare(transfer, is_depositing).await?;
		to_json(&prepared)
	}

	pub async fn allowance(
		&self,
		transfer: &TransferArgs,
		is_depositing: bool,
		refresh: bool,
	) -> Result<serde_json::Value> {
		self.prepare(transfer, is_depositing).await?;
		let allowance = self.router.allowance(refresh).await?;
		Ok(serde_json::json!({
			"allowance": allowance,
			"sufficient": allowance.raw >= transfer.amount,
		}))
	}

	pub async fn approve(&self, transfer: &TransferArgs, is_depositing: bool) -> Result<serde_json::Value> {
		self.prepare(transfer, is_depositing).await?;
		let outcome = self.approve_and_wait(transfer.amount).await?;
		to_json(&outcome)
	}

	/// Deposits or withdraws. With `approve`, a short allowance is topped up
	/// first and execution only proceeds once the approval confirms.
	pub async fn execute(
		&self,
		transfer: &TransferArgs,
		is_depositing: bool,
		approve: bool,
	) -> Result<serde_json::Value> {
		let prepared = self.prepare(transfer, is_depositing).await?;
		if prepared.quote.is_zero() {
			bail!("No quote available for this transfer");
		}

		let allowance = self.router.allowance(false).await?;
		if allowance.raw < transfer.amount {
			if !approve {
				bail!(
					"Allowance {} is below {}; rerun with --approve",
					allowance.raw,
					transfer.amount
				);
			}
			let approval = self.approve_and_wait(transfer.amount).await?;
			if !approval.is_success() {
				return to_json(&approval);
			}
		}

		let outcome = match self.router.execute(None).await? {
			TransactionOutcome::Pending { hash } => self.router.track_execution(hash).await?,
			outcome => outcome,
		};
		to_json(&outcome)
	}

	async fn prepare(
		&self,
		transfer: &TransferArgs,
		is_depositing: bool,
	) -> Result<vault_core::PreparedRoute> {
		let request = self.request(transfer, is_depositing).await?;
		Ok(self.router.prepare(request, transfer.preference()).await?)
	}

	async fn request(
		&self,
		transfer: &TransferArgs,
		is_depositing: bool,
	) -> Result<TransferRequest> {
		let spec = transfer.spec(self.owner, is_depositing);
		Ok(build_request(&self.config, self.tokens.as_ref(), &spec).await?)
	}

	async fn approve_and_wait(&self, amount: U256) -> Result<TransactionOutcome> {
		Ok(match self.router.approve(amount, None).await? {
			TransactionOutcome::Pending { hash } => self.router.track_approval(hash).await,
			outcome => outcome,
		})
	}
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value> {
	serde_json::to_value(value).context("Failed to serialize result")
}
