//! Fee custody and registration pricing.
//!
//! The fee manager custodies registration and renewal payments routed by
//! authorized controllers and lets its owner withdraw them. Pricing itself
//! is an injected pure function behind the [`PriceOracle`] trait; the
//! shipped [`TieredPriceOracle`] keys a per-year price on label length and
//! pro-rates it linearly by duration.

pub mod manager;
pub mod pricing;

pub use manager::{FeeManager, FeeStatistics};
pub use pricing::{PriceOracle, TieredPriceOracle, SECONDS_PER_YEAR};
