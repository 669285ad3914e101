//! Per-solver session state and the steps every solver shares.

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use futures::FutureExt;
use std::sync::{Mutex, MutexGuard};
use vault_delivery::{SuccessCallback, TransactionLifecycle, TransactionOutcome};
use vault_types::{is_native_coin, AllowanceRecord, Quote, Transaction, TransferRequest};

use crate::allowance::AllowanceKey;
use crate::contracts::IERC20;
use crate::{SolverDeps, SolverError};

#[derive(Default)]
struct Session {
	/// Ticket of the most recent `init` or refresh.
	ticket: u64,
	request: Option<TransferRequest>,
	quote: Option<Quote>,
}

/// Holds the current request and quote of one solver.
///
/// Every quote computation is tied to the ticket it started with. Only the
/// newest ticket may commit, so a slow quote for an older request is
/// discarded on arrival instead of overwriting a newer one.
pub struct SolverContext {
	deps: SolverDeps,
	session: Mutex<Session>,
}

impl SolverContext {
	pub fn new(deps: SolverDeps) -> Self {
		Self {
			deps,
			session: Mutex::new(Session::default()),
		}
	}

	pub fn deps(&self) -> &SolverDeps {
		&self.deps
	}

	fn session(&self) -> MutexGuard<'_, Session> {
		self.session.lock().unwrap_or_else(|e| e.into_inner())
	}

	/// Replaces the current request and returns its ticket.
	pub fn begin(&self, request: TransferRequest) -> u64 {
		let mut session = self.session();
		session.ticket += 1;
		session.request = Some(request);
		session.quote = None;
		session.ticket
	}

	/// New ticket for the current request.
	pub fn renew(&self) -> Result<(u64, TransferRequest), SolverError> {
		let mut session = self.session();
		let request = session.request.clone().ok_or(SolverError::MissingRequest)?;
		session.ticket += 1;
		Ok((session.ticket, request))
	}

	/// Stores `quote` if `ticket` is still the newest.
	pub fn commit(&self, ticket: u64, quote: Quote) -> Result<Quote, SolverError> {
		let mut session = self.session();
		if session.ticket != ticket {
			tracing::debug!(
				request_id = ticket,
				current = session.ticket,
				"Discarding quote for superseded request"
			);
			return Err(SolverError::Superseded(ticket));
		}
		session.quote = Some(quote.clone());
		Ok(quote)
	}

	/// Ticket of the newest request.
	pub fn ticket(&self) -> u64 {
		self.session().ticket
	}

	pub fn request(&self) -> Result<TransferRequest, SolverError> {
		self.session().request.clone().ok_or(SolverError::MissingRequest)
	}

	pub fn current_quote(&self) -> Option<Quote> {
		self.session().quote.clone()
	}

	/// Current request, checked against the expected direction.
	pub fn request_for(&self, is_depositing: bool) -> Result<TransferRequest, SolverError> {
		let request = self.request()?;
		if request.is_depositing != is_depositing {
			let direction = if request.is_depositing { "deposit" } else { "withdrawal" };
			return Err(SolverError::UnsupportedRoute(format!(
				"current request is a {direction}"
			)));
		}
		Ok(request)
	}

	pub fn allowance_key(&self, request: &TransferRequest, spender: Address) -> AllowanceKey {
		AllowanceKey {
			chain_id: request.chain_id,
			token: request.spent_token().address,
			spender,
			owner: request.owner,
		}
	}

	/// Allowance of the spent token for `spender`. Native coin needs none
	/// and reports unlimited.
	pub async fn allowance(
		&self,
		request: &TransferRequest,
		spender: Address,
		force_refresh: bool,
	) -> Result<AllowanceRecord, SolverError> {
		let token = request.spent_token();
		if is_native_coin(&token.address) {
			return Ok(AllowanceRecord::unlimited(token.decimals));
		}
		self.deps
			.allowances
			.get(&self.allowance_key(request, spender), token.decimals, force_refresh)
			.await
	}

	/// Approves `spender` for `amount` of the spent token. Once confirmed, the
	/// allowance entry for this spender is refreshed before `on_success` runs.
	pub async fn approve(
		&self,
		request: &TransferRequest,
		spender: Address,
		amount: U256,
		lifecycle: &TransactionLifecycle,
		on_success: Option<SuccessCallback>,
	) -> TransactionOutcome {
		let key = self.allowance_key(request, spender);
		let decimals = request.spent_token().decimals;
		let tracker = self.deps.allowances.clone();

		let refresh: SuccessCallback = Box::new(move |receipt| {
			async move {
				tracker.invalidate(&key);
				if let Err(e) = tracker.get(&key, decimals, true).await {
					tracing::warn!(token = %key.token, spender = %key.spender, error = %e, "Allowance refresh failed");
				}
				if let Some(on_success) = on_success {
					on_success(receipt).await;
				}
			}
			.boxed()
		});

		let data = IERC20::approveCall { spender, amount }.abi_encode();
		let tx = Transaction::call(request.chain_id, key.token, data);
		self.send(tx, lifecycle, Some(refresh)).await
	}

	pub async fn send(
		&self,
		tx: Transaction,
		lifecycle: &TransactionLifecycle,
		on_success: Option<SuccessCallback>,
	) -> TransactionOutcome {
		lifecycle
			.perform(self.deps.delivery.as_ref(), tx, on_success)
			.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{deposit_request, deps};
	use std::sync::Arc;
	use vault_delivery::testing::FakeChain;

	#[test]
	fn test_only_newest_ticket_commits() {
		let context = SolverContext::new(deps(Arc::new(FakeChain::new())));
		let first = context.begin(deposit_request(1));
		let second = context.begin(deposit_request(2));

		let quote = Quote::new(U256::from(2u8), 0);
		assert!(matches!(
			context.commit(first, Quote::new(U256::from(1u8), 0)),
			Err(SolverError::Superseded(t)) if t == first
		));
		assert_eq!(context.commit(second, quote.clone()).unwrap(), quote);
		assert_eq!(context.current_quote(), Some(quote));
	}

	#[test]
	fn test_renew_requires_request() {
		let context = SolverContext::new(deps(Arc::new(FakeChain::new())));
		assert!(matches!(context.renew(), Err(SolverError::MissingRequest)));

		let ticket = context.begin(deposit_request(1));
		let (renewed, request) = context.renew().unwrap();
		assert!(renewed > ticket);
		assert_eq!(request.input_amount, U256::from(1u8));
	}

	#[test]
	fn test_request_for_checks_direction() {
		let context = SolverContext::new(deps(Arc::new(FakeChain::new())));
		context.begin(deposit_request(1));
		assert!(context.request_for(true).is_ok());
		assert!(matches!(
			context.request_for(false),
			Err(SolverError::UnsupportedRoute(_))
		));
	}
}
