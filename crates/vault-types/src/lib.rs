//! Shared types for the vault router workspace.
//!
//! Every other crate depends on this one for addresses, token amounts,
//! routing requests, transaction models, events and configuration schemas.

pub mod account;
pub mod address;
pub mod amount;
pub mod delivery;
pub mod eip712;
pub mod events;
pub mod metadata;
pub mod routing;
pub mod serde_helpers;
pub mod validation;

pub use account::*;
pub use address::*;
pub use amount::*;
pub use delivery::*;
pub use eip712::*;
pub use events::*;
pub use metadata::*;
pub use routing::*;
pub use validation::*;
