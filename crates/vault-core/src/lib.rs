//! Router engine for vault deposits and withdrawals.
//!
//! [`VaultRouter`] classifies a transfer, picks the solver that executes it
//! and drives that solver through quote, approval and execution. It keeps
//! one lifecycle for approvals and one for the main write, and refuses a
//! second write of the same kind while the first is still pending.

use alloy_primitives::Address;
use thiserror::Error;
use vault_solver::SolverError;
use vault_types::{SolverKind, TransactionType};

pub mod builder;
pub mod engine;
pub mod request;

pub use builder::RouterBuilder;
pub use engine::{PreparedRoute, RouterSettings, SolverPreference, VaultRouter};
pub use request::{build_request, TransferSpec};

#[derive(Debug, Error)]
pub enum RouterError {
	#[error("No route has been prepared")]
	NoActiveRoute,
	#[error("Request is for chain {actual}, router serves chain {expected}")]
	WrongChain { expected: u64, actual: u64 },
	#[error("Solver {0} is not configured")]
	SolverNotConfigured(SolverKind),
	#[error("A {0:?} transaction is already in flight")]
	TransactionInFlight(TransactionType),
	#[error("Unknown vault {0}")]
	UnknownVault(Address),
	#[error("Unknown token {0}")]
	UnknownToken(Address),
	#[error("Configuration error: {0}")]
	Config(String),
	#[error(transparent)]
	Solver(#[from] SolverError),
}
