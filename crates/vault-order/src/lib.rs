//! Gasless order construction and signing.
//!
//! A raw [`Order`] is normalized into a [`NormalizedOrder`], hashed under the
//! GPv2 EIP-712 domain, signed with one of the ECDSA schemes and encoded as
//! a scheme-tagged signature ready for the orderbook.

use thiserror::Error;
use vault_account::AccountError;

pub mod codec;
pub mod domain;
pub mod order;
pub mod signing;

pub use codec::{encode, EncodedSignature};
pub use domain::{settlement_domain, DomainSeparator, SETTLEMENT_CONTRACT, VAULT_RELAYER};
pub use order::{
	AppData, BuyTokenBalance, NormalizedOrder, Order, OrderKind, OrderUid, SellTokenBalance,
	ValidTo,
};
pub use signing::{normalize_recovery_byte, normalize_signature, sign, sign_order, SignedOrder, SigningScheme};

#[derive(Debug, Error)]
pub enum OrderError {
	#[error("Receiver normalizes to the zero address")]
	InvalidReceiver,
	#[error("Invalid token balance configuration: {0}")]
	InvalidBalanceConfig(String),
	#[error("Invalid signing scheme: {0}")]
	InvalidSigningScheme(String),
	#[error("This wallet cannot sign this order type")]
	UnsupportedSigner,
	#[error("App data is {0} bytes, at most 32 allowed")]
	InvalidAppData(usize),
	#[error("Valid-to timestamp {0} is outside the u32 range")]
	InvalidValidTo(i64),
	#[error("Invalid signature: {0}")]
	InvalidSignature(String),
	#[error("Signer error: {0}")]
	Signer(#[from] AccountError),
}
