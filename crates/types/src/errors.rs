//! Error taxonomy shared by every component.
//!
//! Each public operation fails fast with exactly one of these variants and
//! leaves state untouched. External tooling surfaces the variant verbatim,
//! so each one is attributable to a single precondition: an `Unauthorized`
//! names the component whose capability edge was broken, a window violation
//! says which side of the window was missed, and so on.

use crate::address::Address;
use crate::clock::Timestamp;
use crate::Amount;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameServiceError {
    #[error("unauthorized: {caller} lacks the required capability on {component}")]
    Unauthorized {
        component: &'static str,
        caller: Address,
    },

    #[error("name not available: {label}")]
    NameNotAvailable { label: String },

    #[error("invalid label: {label}")]
    InvalidLabel { label: String },

    #[error("commitment too new: revealable in {remaining}s")]
    CommitmentTooNew { remaining: u64 },

    #[error("commitment too old or unknown")]
    CommitmentTooOld,

    #[error("an unexpired commitment with this hash already exists")]
    UnexpiredCommitmentExists,

    #[error("insufficient value: required {required}, provided {provided}")]
    InsufficientValue { required: Amount, provided: Amount },

    #[error("rate limit exceeded for {address}: {count} registrations recorded")]
    RateLimitExceeded { address: Address, count: u32 },

    #[error("registration controller is paused")]
    Paused,

    #[error("invalid duration: {duration}s is outside the accepted range (floor {floor}s)")]
    InvalidDuration { duration: u64, floor: u64 },
}

impl NameServiceError {
    /// Shorthand for the capability-edge failure of a given component.
    pub fn unauthorized(component: &'static str, caller: Address) -> Self {
        Self::Unauthorized { component, caller }
    }

    /// How long until a too-new commitment becomes revealable.
    pub fn too_new(submitted_at: Timestamp, min_age: u64, now: Timestamp) -> Self {
        Self::CommitmentTooNew {
            remaining: (submitted_at + min_age).saturating_sub(now),
        }
    }
}

pub type Result<T> = std::result::Result<T, NameServiceError>;
