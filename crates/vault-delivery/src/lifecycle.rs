//! Status tracking for one user-initiated write.
//!
//! A [`TransactionLifecycle`] moves `Idle -> Pending -> Success | Error`.
//! Observers follow it through a `watch` channel, so tests and the CLI can
//! assert intermediate states without racing timers.
//!
//! Waiting for a receipt is bounded by `receipt_timeout`. Hitting the bound
//! is not a failure: the status stays pending and [`TransactionLifecycle::track`]
//! keeps re-polling on a slower interval. The success callback registered
//! with the write fires exactly once, from whichever path sees the receipt.
//!
//! The lifecycle does not serialize concurrent `perform` calls; callers
//! check [`TransactionLifecycle::is_pending`] first.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use vault_types::{Transaction, TransactionHash, TransactionReceipt, TransactionStatus};

use crate::{DeliveryError, DeliveryInterface};

/// Invoked once after the write is confirmed. Receives the receipt for
/// on-chain writes and `None` for off-chain submissions.
pub type SuccessCallback =
	Box<dyn FnOnce(Option<TransactionReceipt>) -> BoxFuture<'static, ()> + Send>;

/// Wraps a synchronous closure as a [`SuccessCallback`].
pub fn callback<F>(f: F) -> SuccessCallback
where
	F: FnOnce(Option<TransactionReceipt>) + Send + 'static,
{
	Box::new(move |receipt| {
		f(receipt);
		async {}.boxed()
	})
}

#[derive(Debug, Error)]
pub enum LifecycleError {
	#[error("Operation failed: {0}")]
	Failed(String),
}

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
	/// Upper bound on the initial receipt wait.
	pub receipt_timeout: Duration,
	pub poll_interval: Duration,
	/// Interval of the long-tail re-poll after the initial wait timed out.
	pub repoll_interval: Duration,
	pub max_repolls: u32,
}

impl Default for LifecycleConfig {
	fn default() -> Self {
		Self {
			receipt_timeout: Duration::from_secs(5),
			poll_interval: Duration::from_millis(500),
			repoll_interval: Duration::from_secs(60),
			max_repolls: 10,
		}
	}
}

/// Result of driving a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransactionOutcome {
	/// Mined with a success status.
	Confirmed { receipt: TransactionReceipt },
	/// Acknowledged by an off-chain endpoint.
	Accepted { reference: String },
	/// Submitted but no receipt yet. Status stays pending.
	Pending { hash: TransactionHash },
	Failed { reason: String },
}

impl TransactionOutcome {
	pub fn is_success(&self) -> bool {
		matches!(
			self,
			TransactionOutcome::Confirmed { .. } | TransactionOutcome::Accepted { .. }
		)
	}
}

pub struct TransactionLifecycle {
	config: LifecycleConfig,
	status: watch::Sender<TransactionStatus>,
	on_success: Mutex<Option<SuccessCallback>>,
}

impl TransactionLifecycle {
	pub fn new(config: LifecycleConfig) -> Self {
		let (status, _) = watch::channel(TransactionStatus::Idle);
		Self {
			config,
			status,
			on_success: Mutex::new(None),
		}
	}

	pub fn subscribe(&self) -> watch::Receiver<TransactionStatus> {
		self.status.subscribe()
	}

	pub fn status(&self) -> TransactionStatus {
		self.status.borrow().clone()
	}

	pub fn is_pending(&self) -> bool {
		self.status.borrow().is_pending()
	}

	/// Returns to idle and drops any unfired callback.
	pub fn reset(&self) {
		self.take_callback();
		self.set_status(TransactionStatus::Idle);
	}

	/// Submits `tx` and waits a bounded time for its receipt.
	pub async fn perform(
		&self,
		delivery: &dyn DeliveryInterface,
		tx: Transaction,
		on_success: Option<SuccessCallback>,
	) -> TransactionOutcome {
		let chain_id = tx.chain_id;
		self.store_callback(on_success);
		self.set_status(TransactionStatus::Pending { hash: None });

		let hash = match delivery.submit(tx).await {
			Ok(hash) => hash,
			Err(e) => return self.fail(e.to_string()),
		};
		self.set_status(TransactionStatus::Pending { hash: Some(hash) });

		let deadline = Instant::now() + self.config.receipt_timeout;
		loop {
			match delivery.get_receipt(&hash, chain_id).await {
				Ok(Some(receipt)) => return self.finish(receipt).await,
				Ok(None) => {}
				Err(e) => {
					tracing::debug!(tx_hash = %hash.truncated(), error = %e, "Receipt poll failed");
				}
			}
			if Instant::now() >= deadline {
				break;
			}
			tokio::time::sleep(self.config.poll_interval).await;
		}

		tracing::info!(
			tx_hash = %hash.truncated(),
			timeout_secs = self.config.receipt_timeout.as_secs(),
			"Receipt not available yet, leaving transaction pending"
		);
		TransactionOutcome::Pending { hash }
	}

	/// Long-tail confirmation tracking for a write left pending by
	/// [`TransactionLifecycle::perform`].
	pub async fn track(
		&self,
		delivery: &dyn DeliveryInterface,
		hash: TransactionHash,
		chain_id: u64,
	) -> TransactionOutcome {
		for attempt in 1..=self.config.max_repolls {
			if !self.is_tracking(&hash) {
				break;
			}
			tokio::time::sleep(self.config.repoll_interval).await;
			match delivery.get_receipt(&hash, chain_id).await {
				Ok(Some(receipt)) => return self.finish(receipt).await,
				Ok(None) => {
					tracing::debug!(tx_hash = %hash.truncated(), attempt, "Still pending");
				}
				Err(e) => {
					tracing::warn!(tx_hash = %hash.truncated(), attempt, error = %e, "Re-poll failed");
				}
			}
		}

		match self.status() {
			TransactionStatus::Success { .. } => TransactionOutcome::Failed {
				reason: "transaction already finalized".to_string(),
			},
			TransactionStatus::Error { reason } => TransactionOutcome::Failed { reason },
			_ => TransactionOutcome::Pending { hash },
		}
	}

	/// Drives an off-chain submission through the same state machine.
	pub async fn run<F, T, E>(
		&self,
		work: F,
		on_success: Option<SuccessCallback>,
	) -> Result<T, LifecycleError>
	where
		F: Future<Output = Result<T, E>>,
		E: Display,
	{
		self.store_callback(on_success);
		self.set_status(TransactionStatus::Pending { hash: None });

		match work.await {
			Ok(value) => {
				self.set_status(TransactionStatus::Success { hash: None });
				if let Some(callback) = self.take_callback() {
					callback(None).await;
				}
				Ok(value)
			}
			Err(e) => {
				let reason = e.to_string();
				self.fail(reason.clone());
				Err(LifecycleError::Failed(reason))
			}
		}
	}

	async fn finish(&self, receipt: TransactionReceipt) -> TransactionOutcome {
		if !receipt.success {
			return self.fail(DeliveryError::TransactionReverted(receipt.hash).to_string());
		}

		tracing::info!(
			tx_hash = %receipt.hash.truncated(),
			block = receipt.block_number,
			"Transaction confirmed"
		);
		self.set_status(TransactionStatus::Success {
			hash: Some(receipt.hash),
		});
		if let Some(callback) = self.take_callback() {
			callback(Some(receipt.clone())).await;
		}
		TransactionOutcome::Confirmed { receipt }
	}

	fn fail(&self, reason: String) -> TransactionOutcome {
		tracing::warn!(reason = %reason, "Transaction failed");
		self.take_callback();
		self.set_status(TransactionStatus::Error {
			reason: reason.clone(),
		});
		TransactionOutcome::Failed { reason }
	}

	fn is_tracking(&self, hash: &TransactionHash) -> bool {
		matches!(
			&*self.status.borrow(),
			TransactionStatus::Pending { hash: Some(current) } if current == hash
		)
	}

	fn set_status(&self, status: TransactionStatus) {
		self.status.send_replace(status);
	}

	fn store_callback(&self, callback: Option<SuccessCallback>) {
		if let Ok(mut slot) = self.on_success.lock() {
			*slot = callback;
		}
	}

	fn take_callback(&self) -> Option<SuccessCallback> {
		self.on_success.lock().ok().and_then(|mut slot| slot.take())
	}
}

impl Default for TransactionLifecycle {
	fn default() -> Self {
		Self::new(LifecycleConfig::default())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{FakeChain, ReceiptBehavior};
	use alloy_primitives::Address;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;

	fn fast_config() -> LifecycleConfig {
		LifecycleConfig {
			receipt_timeout: Duration::from_millis(50),
			poll_interval: Duration::from_millis(5),
			repoll_interval: Duration::from_millis(5),
			max_repolls: 3,
		}
	}

	fn counter_callback(counter: &Arc<AtomicUsize>) -> SuccessCallback {
		let counter = counter.clone();
		callback(move |_| {
			counter.fetch_add(1, Ordering::SeqCst);
		})
	}

	fn write() -> Transaction {
		Transaction::call(10, Address::repeat_byte(0xbb), vec![0xb6, 0xb5, 0x5f, 0x25])
	}

	#[tokio::test]
	async fn test_confirmed_write_fires_callback_once() {
		let chain = FakeChain::new();
		let lifecycle = TransactionLifecycle::new(fast_config());
		let fired = Arc::new(AtomicUsize::new(0));
		let mut status = lifecycle.subscribe();

		let outcome = lifecycle
			.perform(&chain, write(), Some(counter_callback(&fired)))
			.await;

		assert!(matches!(outcome, TransactionOutcome::Confirmed { .. }));
		assert!(matches!(
			*status.borrow_and_update(),
			TransactionStatus::Success { hash: Some(_) }
		));
		assert_eq!(fired.load(Ordering::SeqCst), 1);
		assert_eq!(chain.submitted().len(), 1);
	}

	#[tokio::test]
	async fn test_rejected_submission_sets_error_without_callback() {
		let chain = FakeChain::new();
		chain.fail_next_submit("user rejected the request");
		let lifecycle = TransactionLifecycle::new(fast_config());
		let fired = Arc::new(AtomicUsize::new(0));

		let outcome = lifecycle
			.perform(&chain, write(), Some(counter_callback(&fired)))
			.await;

		assert!(matches!(outcome, TransactionOutcome::Failed { .. }));
		assert!(matches!(lifecycle.status(), TransactionStatus::Error { .. }));
		assert_eq!(fired.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_reverted_write_is_error() {
		let chain = FakeChain::new();
		chain.set_receipt_behavior(ReceiptBehavior::Revert);
		let lifecycle = TransactionLifecycle::new(fast_config());
		let fired = Arc::new(AtomicUsize::new(0));

		let outcome = lifecycle
			.perform(&chain, write(), Some(counter_callback(&fired)))
			.await;

		match outcome {
			TransactionOutcome::Failed { reason } => assert!(reason.contains("reverted")),
			other => panic!("unexpected outcome {other:?}"),
		}
		assert_eq!(fired.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_timeout_stays_pending_then_track_confirms() {
		let chain = FakeChain::new();
		chain.set_receipt_behavior(ReceiptBehavior::Never);
		let lifecycle = TransactionLifecycle::new(fast_config());
		let fired = Arc::new(AtomicUsize::new(0));

		let outcome = lifecycle
			.perform(&chain, write(), Some(counter_callback(&fired)))
			.await;
		let hash = match outcome {
			TransactionOutcome::Pending { hash } => hash,
			other => panic!("unexpected outcome {other:?}"),
		};
		assert!(lifecycle.is_pending());
		assert_eq!(fired.load(Ordering::SeqCst), 0);

		chain.mine(&hash, true);
		let tracked = lifecycle.track(&chain, hash, 10).await;
		assert!(matches!(tracked, TransactionOutcome::Confirmed { .. }));
		assert_eq!(fired.load(Ordering::SeqCst), 1);

		// A second track sees a finalized write and fires nothing.
		let again = lifecycle.track(&chain, hash, 10).await;
		assert!(!again.is_success());
		assert_eq!(fired.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_track_gives_up_after_max_repolls() {
		let chain = FakeChain::new();
		chain.set_receipt_behavior(ReceiptBehavior::Never);
		let lifecycle = TransactionLifecycle::new(fast_config());

		let hash = match lifecycle.perform(&chain, write(), None).await {
			TransactionOutcome::Pending { hash } => hash,
			other => panic!("unexpected outcome {other:?}"),
		};
		let before = chain.receipt_polls();
		let outcome = lifecycle.track(&chain, hash, 10).await;

		assert_eq!(outcome, TransactionOutcome::Pending { hash });
		assert_eq!(chain.receipt_polls() - before, 3);
		assert!(lifecycle.is_pending());
	}

	#[tokio::test]
	async fn test_run_off_chain_success_and_failure() {
		let lifecycle = TransactionLifecycle::new(fast_config());
		let fired = Arc::new(AtomicUsize::new(0));

		let uid = lifecycle
			.run(
				async { Ok::<_, String>("0xabc".to_string()) },
				Some(counter_callback(&fired)),
			)
			.await
			.unwrap();
		assert_eq!(uid, "0xabc");
		assert_eq!(lifecycle.status(), TransactionStatus::Success { hash: None });
		assert_eq!(fired.load(Ordering::SeqCst), 1);

		let err = lifecycle
			.run(
				async { Err::<String, _>("order rejected") },
				Some(counter_callback(&fired)),
			)
			.await
			.unwrap_err();
		assert!(err.to_string().contains("order rejected"));
		assert!(matches!(lifecycle.status(), TransactionStatus::Error { .. }));
		assert_eq!(fired.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_reset_returns_to_idle() {
		let chain = FakeChain::new();
		let lifecycle = TransactionLifecycle::new(fast_config());
		lifecycle.perform(&chain, write(), None).await;
		lifecycle.reset();
		assert_eq!(lifecycle.status(), TransactionStatus::Idle);
	}
}
