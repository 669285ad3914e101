//! Signer implementations.
//!
//! - `local`: private key held in memory, signs messages and typed data.
//! - `message_only`: private key held in memory but exposed like a wallet
//!   that only supports `personal_sign` and reports raw `0`/`1` recovery ids.

pub mod local;
pub mod message_only;
