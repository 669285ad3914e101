//! EIP-712 domain of the GPv2 settlement contract.

use alloy_primitives::{address, Address, B256, U256};
use alloy_sol_types::Eip712Domain;
use std::fmt;

/// Settlement contract, deployed at the same address on every supported chain.
pub const SETTLEMENT_CONTRACT: Address = address!("9008D19f58AAbD9eD0D60971565AA8510560ab41");

/// Vault relayer, the spender that pulls sell tokens for settled orders.
pub const VAULT_RELAYER: Address = address!("C92E8bdf79f0507f65a392b0ab4667716BFE0110");

#[derive(Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct DomainSeparator(pub B256);

impl DomainSeparator {
	pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
		let domain = Eip712Domain::new(
			Some("Gnosis Protocol".into()),
			Some("v2".into()),
			Some(U256::from(chain_id)),
			Some(verifying_contract),
			None,
		);
		Self(domain.separator())
	}
}

impl fmt::Debug for DomainSeparator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&hex::encode(self.0))
	}
}

/// Domain for the settlement contract on `chain_id`.
pub fn settlement_domain(chain_id: u64, verifying_contract: Address) -> DomainSeparator {
	DomainSeparator::new(chain_id, verifying_contract)
}
