//! In-memory chain for tests.
//!
//! `eth_call` responses are scripted per `(contract, selector)`. Reads to a
//! gated contract block until the gate is released, which lets tests hold
//! one request open while another completes. Every read is counted.
//! Writes get sequential hashes and a receipt according to the configured
//! [`ReceiptBehavior`].

use alloy_primitives::{keccak256, Address, Bytes, B256};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use vault_types::{
	ConfigSchema, Schema, Transaction, TransactionHash, TransactionReceipt, ValidationError,
};

use crate::{DeliveryError, DeliveryInterface};

/// What receipt a submitted transaction gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptBehavior {
	Success,
	Revert,
	/// Never mined unless [`FakeChain::mine`] is called.
	Never,
}

pub struct FakeChain {
	responses: DashMap<(Address, [u8; 4]), Result<Bytes, String>>,
	gates: DashMap<Address, Arc<Semaphore>>,
	calls: DashMap<Address, usize>,
	total_calls: AtomicUsize,
	receipts: DashMap<B256, TransactionReceipt>,
	receipt_behavior: Mutex<ReceiptBehavior>,
	submit_failure: Mutex<Option<String>>,
	submitted: Mutex<Vec<Transaction>>,
	receipt_polls: AtomicUsize,
	next_block: AtomicU64,
}

impl Default for FakeChain {
	fn default() -> Self {
		Self::new()
	}
}

impl FakeChain {
	pub fn new() -> Self {
		Self {
			responses: DashMap::new(),
			gates: DashMap::new(),
			calls: DashMap::new(),
			total_calls: AtomicUsize::new(0),
			receipts: DashMap::new(),
			receipt_behavior: Mutex::new(ReceiptBehavior::Success),
			submit_failure: Mutex::new(None),
			submitted: Mutex::new(Vec::new()),
			receipt_polls: AtomicUsize::new(0),
			next_block: AtomicU64::new(100),
		}
	}

	/// Scripts the return data of `selector` on `contract`.
	pub fn set_call(&self, contract: Address, selector: [u8; 4], data: impl Into<Bytes>) {
		self.responses.insert((contract, selector), Ok(data.into()));
	}

	/// Scripts `selector` on `contract` to fail with a network error.
	pub fn fail_call(&self, contract: Address, selector: [u8; 4], message: &str) {
		self.responses
			.insert((contract, selector), Err(message.to_string()));
	}

	/// Holds every read to `contract` open until [`FakeChain::release`].
	pub fn gate(&self, contract: Address) {
		self.gates.insert(contract, Arc::new(Semaphore::new(0)));
	}

	pub fn release(&self, contract: Address) {
		if let Some((_, gate)) = self.gates.remove(&contract) {
			gate.close();
		}
	}

	pub fn call_count(&self) -> usize {
		self.total_calls.load(Ordering::SeqCst)
	}

	pub fn calls_to(&self, contract: Address) -> usize {
		self.calls.get(&contract).map(|c| *c).unwrap_or(0)
	}

	/// Waits until `contract` has received at least `count` reads.
	pub async fn wait_for_calls(&self, contract: Address, count: usize) {
		while self.calls_to(contract) < count {
			tokio::time::sleep(Duration::from_millis(1)).await;
		}
	}

	pub fn set_receipt_behavior(&self, behavior: ReceiptBehavior) {
		if let Ok(mut slot) = self.receipt_behavior.lock() {
			*slot = behavior;
		}
	}

	/// Makes the next submission fail as rejected by the wallet.
	pub fn fail_next_submit(&self, message: &str) {
		if let Ok(mut slot) = self.submit_failure.lock() {
			*slot = Some(message.to_string());
		}
	}

	/// Mines a previously submitted transaction.
	pub fn mine(&self, hash: &TransactionHash, success: bool) {
		let block_number = self.next_block.fetch_add(1, Ordering::SeqCst);
		self.receipts.insert(
			hash.0,
			TransactionReceipt {
				hash: *hash,
				block_number,
				success,
			},
		);
	}

	pub fn submitted(&self) -> Vec<Transaction> {
		self.submitted
			.lock()
			.map(|txs| txs.clone())
			.unwrap_or_default()
	}

	pub fn receipt_polls(&self) -> usize {
		self.receipt_polls.load(Ordering::SeqCst)
	}
}

struct EmptySchema;

impl ConfigSchema for EmptySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

#[async_trait]
impl DeliveryInterface for FakeChain {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(EmptySchema)
	}

	async fn call(&self, tx: &Transaction) -> Result<Bytes, DeliveryError> {
		self.total_calls.fetch_add(1, Ordering::SeqCst);
		*self.calls.entry(tx.to).or_insert(0) += 1;

		let gate = self.gates.get(&tx.to).map(|g| g.clone());
		if let Some(gate) = gate {
			// Closed on release, which fails the acquire and lets the read through.
			let _ = gate.acquire().await;
		}

		let selector = tx
			.selector()
			.ok_or_else(|| DeliveryError::Network("calldata shorter than a selector".into()))?;
		match self.responses.get(&(tx.to, selector)).map(|r| r.clone()) {
			Some(Ok(data)) => Ok(data),
			Some(Err(message)) => Err(DeliveryError::Network(message)),
			None => Err(DeliveryError::Network(format!(
				"no response scripted for {} selector 0x{}",
				tx.to,
				alloy_primitives::hex::encode(selector)
			))),
		}
	}

	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		if let Some(message) = self.submit_failure.lock().ok().and_then(|mut s| s.take()) {
			return Err(DeliveryError::TransactionRejected(message));
		}

		let hash = {
			let mut submitted = self
				.submitted
				.lock()
				.map_err(|_| DeliveryError::Network("fake chain poisoned".into()))?;
			submitted.push(tx);
			TransactionHash(keccak256((submitted.len() as u64).to_be_bytes()))
		};

		let behavior = self
			.receipt_behavior
			.lock()
			.map(|b| *b)
			.unwrap_or(ReceiptBehavior::Success);
		match behavior {
			ReceiptBehavior::Success => self.mine(&hash, true),
			ReceiptBehavior::Revert => self.mine(&hash, false),
			ReceiptBehavior::Never => {}
		}
		Ok(hash)
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
		_chain_id: u64,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		self.receipt_polls.fetch_add(1, Ordering::SeqCst);
		Ok(self.receipts.get(&hash.0).map(|r| r.clone()))
	}
}
