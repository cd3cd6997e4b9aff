//! Canonical ownership tree for the namechain registration core.
//!
//! The registry maps hierarchical node identifiers (namehashes) to
//! `{owner, resolver, ttl}` records. Every mutation is gated on the caller
//! being the node's current owner or an operator approved by that owner;
//! the registrar's standing operator approval is the capability edge that
//! lets it project leaseholds into the tree. The reverse registrar lives
//! here too: an independently authorized address → preferred-name mapping.

pub mod registry;
pub mod reverse;
pub mod types;

pub use registry::NameRegistry;
pub use reverse::ReverseRegistrar;
pub use types::NodeRecord;
