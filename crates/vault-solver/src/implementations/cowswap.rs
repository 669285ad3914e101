//! Gasless swaps through the CoW Protocol orderbook.
//!
//! Nothing is sent on chain here apart from the relayer approval. Executing
//! signs a sell order and hands it to the orderbook. Success means the
//! orderbook accepted the order; settlement happens later.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use vault_account::AccountInterface;
use vault_delivery::{SuccessCallback, TransactionLifecycle, TransactionOutcome};
use vault_order::{
	settlement_domain, sign_order, AppData, Order, OrderKind, SigningScheme, ValidTo,
	SETTLEMENT_CONTRACT, VAULT_RELAYER,
};
use vault_settlement::{create_settlement, QuoteRequest, SettlementInterface};
use vault_types::{
	is_native_coin, validate_http_url, AllowanceRecord, ConfigSchema, Field, FieldType, Quote,
	Schema, SolverKind, TransferRequest, ValidationError,
};

use crate::quote::is_trivially_zero;
use crate::{config_address, SolverContext, SolverDeps, SolverError, SolverInterface};

const BPS: u64 = 10_000;
const DEFAULT_SLIPPAGE_BPS: u64 = 50;
const DEFAULT_VALIDITY_SECONDS: u32 = 1800;

pub struct CowswapSolver {
	context: SolverContext,
	signer: Arc<dyn AccountInterface>,
	settlement: Arc<dyn SettlementInterface>,
	slippage_bps: u64,
	validity_seconds: u32,
	signing_scheme: SigningScheme,
	app_data: AppData,
	vault_relayer: Address,
	settlement_contract: Address,
}

/// Buy amount after `slippage_bps` is taken off the quoted amount.
pub fn min_buy_amount(quoted: U256, slippage_bps: u64) -> U256 {
	let keep = U256::from(BPS.saturating_sub(slippage_bps));
	quoted.saturating_mul(keep) / U256::from(BPS)
}

impl CowswapSolver {
	/// Orders sell ERC-20 balances only; the settlement contract cannot pull
	/// the native coin.
	fn check_sell_token(request: &TransferRequest) -> Result<(), SolverError> {
		if is_native_coin(&request.input_token.address) {
			return Err(SolverError::UnsupportedRoute(format!(
				"cannot sell native {} through the orderbook",
				request.input_token.symbol
			)));
		}
		Ok(())
	}

	fn quote_request(&self, request: &TransferRequest) -> QuoteRequest {
		QuoteRequest {
			from: request.owner,
			sell_token: request.input_token.address,
			buy_token: request.output_token.address,
			sell_amount_before_fee: request.input_amount,
			valid_for: self.validity_seconds,
			signing_scheme: self.signing_scheme,
		}
	}

	fn order(&self, request: &TransferRequest, quote: &Quote) -> Order {
		let valid_to = Utc::now().timestamp() + i64::from(self.validity_seconds);
		Order {
			sell_token: request.input_token.address.to_string(),
			buy_token: request.output_token.address.to_string(),
			receiver: Some(request.owner.to_string()),
			sell_amount: request.input_amount,
			buy_amount: min_buy_amount(quote.raw, self.slippage_bps),
			valid_to: ValidTo::Timestamp(u32::try_from(valid_to).unwrap_or(u32::MAX)),
			app_data: self.app_data.clone(),
			fee_amount: U256::ZERO,
			kind: OrderKind::Sell,
			partially_fillable: false,
			sell_token_balance: None,
			buy_token_balance: None,
		}
	}

	async fn submit(
		&self,
		is_depositing: bool,
		lifecycle: &TransactionLifecycle,
		on_success: Option<SuccessCallback>,
	) -> Result<TransactionOutcome, SolverError> {
		let request = self.context.request_for(is_depositing)?;
		Self::check_sell_token(&request)?;
		let quote = self
			.context
			.current_quote()
			.filter(|quote| !quote.is_zero())
			.ok_or(SolverError::MissingQuote)?;

		let order = self.order(&request, &quote);
		let domain = settlement_domain(request.chain_id, self.settlement_contract);
		let work = async {
			let signed = sign_order(&order, &domain, self.signing_scheme, self.signer.as_ref())
				.await
				.map_err(SolverError::from)?;
			self.settlement
				.submit_order(&signed)
				.await
				.map_err(SolverError::from)
		};

		match lifecycle.run(work, on_success).await {
			Ok(uid) => Ok(TransactionOutcome::Accepted { reference: uid }),
			Err(e) => {
				tracing::warn!(owner = %request.owner, error = %e, "Order submission failed");
				Ok(TransactionOutcome::Failed {
					reason: e.to_string(),
				})
			}
		}
	}
}

pub struct CowswapSchema;

impl ConfigSchema for CowswapSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("api_url", FieldType::String).with_validator(validate_http_url),
				Field::new(
					"slippage_bps",
					FieldType::Integer {
						min: Some(0),
						max: Some(BPS as i64 - 1),
					},
				),
				Field::new(
					"validity_seconds",
					FieldType::Integer {
						min: Some(60),
						max: Some(86_400),
					},
				),
				Field::new("signing_scheme", FieldType::String).with_validator(|value| {
					match value.as_str().unwrap_or_default().parse::<SigningScheme>() {
						Ok(SigningScheme::Eip712 | SigningScheme::EthSign) => Ok(()),
						_ => Err("signing_scheme must be eip712 or ethsign".to_string()),
					}
				}),
				Field::new("app_data", FieldType::String),
				Field::new("vault_relayer", FieldType::Address),
				Field::new("settlement_contract", FieldType::Address),
			],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl SolverInterface for CowswapSolver {
	fn kind(&self) -> SolverKind {
		SolverKind::Cowswap
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(CowswapSchema)
	}

	fn context(&self) -> &SolverContext {
		&self.context
	}

	async fn quote(&self, request: &TransferRequest) -> Result<Quote, SolverError> {
		Self::check_sell_token(request)?;
		let decimals = request.output_token.decimals;
		if is_trivially_zero(request) {
			return Ok(Quote::new(U256::ZERO, decimals));
		}

		match self.settlement.quote(&self.quote_request(request)).await {
			Ok(response) => Ok(Quote::new(response.quote.buy_amount, decimals)),
			Err(e) => {
				tracing::warn!(
					sell_token = %request.input_token.address,
					buy_token = %request.output_token.address,
					error = %e,
					"Orderbook quote failed"
				);
				Ok(Quote::new(U256::ZERO, decimals))
			}
		}
	}

	async fn get_allowance(&self, force_refresh: bool) -> Result<AllowanceRecord, SolverError> {
		let request = self.context.request()?;
		self.context
			.allowance(&request, self.vault_relayer, force_refresh)
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
			.approve(&request, self.vault_relayer, amount, lifecycle, on_success)
			.await)
	}

	async fn execute_deposit(
		&self,
		lifecycle: &TransactionLifecycle,
		on_success: Option<SuccessCallback>,
	) -> Result<TransactionOutcome, SolverError> {
		self.submit(true, lifecycle, on_success).await
	}

	async fn execute_withdraw(
		&self,
		lifecycle: &TransactionLifecycle,
		on_success: Option<SuccessCallback>,
	) -> Result<TransactionOutcome, SolverError> {
		self.submit(false, lifecycle, on_success).await
	}
}

fn parse_app_data(raw: &str) -> Result<AppData, SolverError> {
	let bytes = hex::decode(raw.trim_start_matches("0x"))
		.map_err(|e| SolverError::InvalidConfig(format!("app_data is not hex: {e}")))?;
	if bytes.len() > 32 {
		return Err(SolverError::InvalidConfig(format!(
			"app_data is {} bytes, at most 32 allowed",
			bytes.len()
		)));
	}
	Ok(AppData::Bytes(bytes))
}

pub fn create_solver(config: &toml::Value, deps: SolverDeps) -> Result<CowswapSolver, SolverError> {
	let signer = deps
		.signer
		.clone()
		.ok_or_else(|| SolverError::InvalidConfig("cowswap needs an order signer".to_string()))?;

	let settlement = match deps.settlement.clone() {
		Some(settlement) => settlement,
		None if config.get("api_url").is_some() => create_settlement("cow_api", config)?,
		None => {
			return Err(SolverError::InvalidConfig(
				"api_url is required without a settlement endpoint".to_string(),
			))
		}
	};

	let int = |field: &str| config.get(field).and_then(|v| v.as_integer());
	let signing_scheme = match config.get("signing_scheme").and_then(|v| v.as_str()) {
		Some(raw) => raw.parse()?,
		None => SigningScheme::Eip712,
	};
	let app_data = match config.get("app_data").and_then(|v| v.as_str()) {
		Some(raw) => parse_app_data(raw)?,
		None => AppData::default(),
	};

	Ok(CowswapSolver {
		context: SolverContext::new(deps),
		signer,
		settlement,
		slippage_bps: int("slippage_bps").map_or(DEFAULT_SLIPPAGE_BPS, |v| v as u64),
		validity_seconds: int("validity_seconds").map_or(DEFAULT_VALIDITY_SECONDS, |v| v as u32),
		signing_scheme,
		app_data,
		vault_relayer: config_address(config, "vault_relayer")?.unwrap_or(VAULT_RELAYER),
		settlement_contract: config_address(config, "settlement_contract")?
			.unwrap_or(SETTLEMENT_CONTRACT),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::contracts::IERC20;
	use crate::test_support::*;
	use alloy_sol_types::SolCall;
	use std::sync::atomic::{AtomicBool, Ordering};
	use vault_account::LocalWallet;
	use vault_delivery::callback;
	use vault_delivery::testing::FakeChain;
	use vault_settlement::testing::FakeOrderbook;
	use vault_types::TransactionStatus;

	// Hardhat's first development account, which is `OWNER`.
	const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const ONE: u128 = 1_000_000_000_000_000_000;

	fn solver(chain: &Arc<FakeChain>, orderbook: &Arc<FakeOrderbook>, config: &str) -> CowswapSolver {
		let signer = Arc::new(LocalWallet::new(KEY).unwrap());
		let deps = deps(chain.clone())
			.with_signer(signer)
			.with_settlement(orderbook.clone());
		create_solver(&toml::from_str(config).unwrap(), deps).unwrap()
	}

	#[test]
	fn test_min_buy_amount() {
		assert_eq!(min_buy_amount(U256::from(10_000u64), 50), U256::from(9_950u64));
		assert_eq!(min_buy_amount(U256::from(10_000u64), 0), U256::from(10_000u64));
		assert_eq!(min_buy_amount(U256::from(199u64), 50), U256::from(198u64));
	}

	#[tokio::test]
	async fn test_quote_degrades_to_zero() {
		let chain = Arc::new(FakeChain::new());
		let orderbook = Arc::new(FakeOrderbook::new());
		let solver = solver(&chain, &orderbook, "");

		let quote = solver.init(withdraw_request(ONE)).await.unwrap();
		assert!(quote.is_zero());
		assert_eq!(orderbook.quote_count(), 1);
		assert!(matches!(
			solver.execute_withdraw(&lifecycle(), None).await,
			Err(SolverError::MissingQuote)
		));
	}

	#[tokio::test]
	async fn test_zero_amount_skips_orderbook() {
		let chain = Arc::new(FakeChain::new());
		let orderbook = Arc::new(FakeOrderbook::new());
		let solver = solver(&chain, &orderbook, "");

		assert!(solver.init(withdraw_request(0)).await.unwrap().is_zero());
		assert_eq!(orderbook.quote_count(), 0);
	}

	#[tokio::test]
	async fn test_signs_and_submits_order() {
		let chain = Arc::new(FakeChain::new());
		let orderbook = Arc::new(FakeOrderbook::new());
		orderbook.set_buy_amount(U256::from(2_000_000u64));
		let solver = solver(&chain, &orderbook, "slippage_bps = 100");

		let quote = solver.init(withdraw_request(ONE)).await.unwrap();
		assert_eq!(quote.raw, U256::from(2_000_000u64));

		let fired = Arc::new(AtomicBool::new(false));
		let flag = fired.clone();
		let lifecycle = lifecycle();
		let outcome = solver
			.execute_withdraw(
				&lifecycle,
				Some(callback(move |_| flag.store(true, Ordering::SeqCst))),
			)
			.await
			.unwrap();

		let orders = orderbook.orders();
		assert_eq!(orders.len(), 1);
		let signed = &orders[0];
		assert_eq!(signed.owner, OWNER);
		assert_eq!(signed.order.receiver, OWNER);
		assert_eq!(signed.order.sell_token, VAULT);
		assert_eq!(signed.order.buy_token, ASSET);
		assert_eq!(signed.order.sell_amount, U256::from(ONE));
		assert_eq!(signed.order.buy_amount, U256::from(1_980_000u64));
		assert_eq!(signed.order.kind, OrderKind::Sell);
		assert!(i64::from(signed.order.valid_to) > Utc::now().timestamp());
		assert_eq!(signed.signature.scheme, SigningScheme::Eip712);

		match outcome {
			TransactionOutcome::Accepted { reference } => assert_eq!(reference, signed.uid.to_string()),
			other => panic!("unexpected outcome {other:?}"),
		}
		assert!(fired.load(Ordering::SeqCst));
		assert!(matches!(lifecycle.status(), TransactionStatus::Success { .. }));
		assert!(chain.submitted().is_empty());
	}

	#[tokio::test]
	async fn test_rejected_order_fails_without_callback() {
		let chain = Arc::new(FakeChain::new());
		let orderbook = Arc::new(FakeOrderbook::new());
		orderbook.set_buy_amount(U256::from(5u8));
		orderbook.reject_orders("InsufficientBalance");
		let solver = solver(&chain, &orderbook, "");
		solver.init(withdraw_request(ONE)).await.unwrap();

		let fired = Arc::new(AtomicBool::new(false));
		let flag = fired.clone();
		let lifecycle = lifecycle();
		let outcome = solver
			.execute_withdraw(
				&lifecycle,
				Some(callback(move |_| flag.store(true, Ordering::SeqCst))),
			)
			.await
			.unwrap();

		match outcome {
			TransactionOutcome::Failed { reason } => assert!(reason.contains("InsufficientBalance")),
			other => panic!("unexpected outcome {other:?}"),
		}
		assert!(matches!(lifecycle.status(), TransactionStatus::Error { .. }));
		assert!(!fired.load(Ordering::SeqCst));
	}

	#[tokio::test]
	async fn test_spender_is_vault_relayer() {
		let chain = Arc::new(FakeChain::new());
		let orderbook = Arc::new(FakeOrderbook::new());
		orderbook.set_buy_amount(U256::from(5u8));
		chain.set_call(VAULT, IERC20::allowanceCall::SELECTOR, pps_bytes(0));
		let solver = solver(&chain, &orderbook, "");
		solver.init(withdraw_request(ONE)).await.unwrap();

		assert!(solver.get_allowance(false).await.unwrap().is_zero());
		solver.approve(U256::from(ONE), &lifecycle(), None).await.unwrap();
		let approval = IERC20::approveCall::abi_decode(&chain.submitted()[0].data).unwrap();
		assert_eq!(approval.spender, VAULT_RELAYER);
	}

	#[tokio::test]
	async fn test_native_sell_token_rejected() {
		let chain = Arc::new(FakeChain::new());
		let orderbook = Arc::new(FakeOrderbook::new());
		orderbook.set_buy_amount(U256::from(5u8));
		let solver = solver(&chain, &orderbook, "");

		let mut native = deposit_request(ONE);
		native.input_token = token(vault_types::NATIVE_COIN_ADDRESS, "ETH", 18);
		assert!(matches!(
			solver.init(native).await,
			Err(SolverError::UnsupportedRoute(_))
		));
		assert_eq!(orderbook.quote_count(), 0);
		assert!(orderbook.orders().is_empty());
	}

	#[test]
	fn test_schema_rejects_contract_schemes() {
		assert!(CowswapSchema
			.validate(&toml::from_str(r#"signing_scheme = "presign""#).unwrap())
			.is_err());
		assert!(CowswapSchema
			.validate(&toml::from_str(r#"signing_scheme = "ethsign""#).unwrap())
			.is_ok());
	}

	#[test]
	fn test_app_data_is_checked() {
		assert!(matches!(
			parse_app_data("0xzz"),
			Err(SolverError::InvalidConfig(_))
		));
		assert_eq!(
			parse_app_data("0x0102").unwrap(),
			AppData::Bytes(vec![1, 2])
		);
	}
}
