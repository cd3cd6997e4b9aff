//! Leasehold registrar for the namechain registration core.
//!
//! Tokenizes leaf names under one parent node as time-bounded leaseholds.
//! A leasehold is live until its expiry, then sits in a grace window during
//! which the name is neither available to others nor usable by the previous
//! holder; once the grace window lapses the name can be leased again.
//! Only addresses granted the controller capability may mint or extend
//! leases; the registrar itself never initiates a registration.

pub mod registrar;
pub mod types;

pub use registrar::{NameRegistrar, MAX_LEASE_DURATION};
pub use types::Leasehold;
