//! Commit-reveal registration controller.
//!
//! The one component end users talk to. A client first commits a blinded
//! hash of its registration intent, waits out the minimum commitment age,
//! then reveals the full parameters. The controller recomputes the hash,
//! checks the reveal window, the rate limit and the price, and then drives
//! the atomic apply chain: registrar mint, limiter record, fee deposit,
//! optional reverse-record claim, commitment deletion. Any failure along
//! the chain unwinds every completed step, so a registration either fully
//! happens or leaves no trace.

pub mod controller;
pub mod types;

pub use controller::{ControllerConfig, RegistrationController};
pub use types::{RegistrationReceipt, RegistrationRequest, RenewalReceipt};
