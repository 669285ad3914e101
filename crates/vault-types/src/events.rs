use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{Quote, RouteType, SolverKind, TransactionHash, TransactionReceipt};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RouterEvent {
	RouteSelected {
		chain_id: u64,
		route: RouteType,
		solver: SolverKind,
	},
	QuoteUpdated {
		solver: SolverKind,
		request_id: u64,
		quote: Quote,
	},
	Transaction(TransactionEvent),
	OrderSubmitted {
		chain_id: u64,
		order_uid: String,
	},
	/// Balances for these tokens changed on chain and must be re-read.
	BalancesInvalidated {
		chain_id: u64,
		tokens: Vec<Address>,
	},
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TransactionEvent {
	Pending {
		tx_hash: TransactionHash,
		tx_type: TransactionType,
	},
	Confirmed {
		receipt: TransactionReceipt,
		tx_type: TransactionType,
	},
	Failed {
		tx_type: TransactionType,
		reason: String,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
	Approve,
	Deposit,
	Withdraw,
}

pub struct EventBus {
	sender: broadcast::Sender<RouterEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
		self.sender.subscribe()
	}

	/// Publishes to current subscribers. Having none is not an error.
	pub fn publish(&self, event: RouterEvent) {
		let _ = self.sender.send(event);
	}
}

impl Clone for EventBus {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_subscribers_receive_events() {
		let bus = EventBus::new(8);
		let mut rx = bus.subscribe();

		bus.publish(RouterEvent::BalancesInvalidated {
			chain_id: 10,
			tokens: vec![Address::repeat_byte(1)],
		});

		match rx.recv().await.unwrap() {
			RouterEvent::BalancesInvalidated { chain_id, tokens } => {
				assert_eq!(chain_id, 10);
				assert_eq!(tokens, vec![Address::repeat_byte(1)]);
			}
			other => panic!("unexpected event {other:?}"),
		}
	}

	#[test]
	fn test_publish_without_subscribers() {
		let bus = EventBus::new(1);
		bus.publish(RouterEvent::OrderSubmitted {
			chain_id: 1,
			order_uid: "0x00".into(),
		});
	}
}
