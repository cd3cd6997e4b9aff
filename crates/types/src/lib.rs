//! Shared primitives for the namechain registration core.
//!
//! Every component crate (registry, registrar, limiter, fees, controller)
//! builds on the types defined here: 20-byte account addresses, the
//! namehash/labelhash scheme for the ownership tree, micro-unit amounts,
//! the injected clock, and the single error taxonomy all public operations
//! report through.

pub mod address;
pub mod clock;
pub mod errors;
pub mod hashes;
pub mod label;

pub use address::Address;
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use errors::{NameServiceError, Result};
pub use hashes::{CommitmentHash, LabelHash, NodeHash};
pub use label::{Label, MAX_LABEL_LENGTH, MIN_LABEL_LENGTH};

/// Monetary amount in micro-units of the chain's native token.
pub type Amount = u128;
