//! Registration pricing contract.

use namechain_types::{Amount, Label, MIN_LABEL_LENGTH};

/// Seconds in the 365-day pricing year.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Pure pricing function consumed by the registration controller.
///
/// Implementations must be pure: the price of `(label, duration)` may not
/// depend on anything but its arguments. Oracle internals (currency
/// conversion, premium auctions) are outside the core.
pub trait PriceOracle: Send + Sync {
    /// Price in micro-units for holding `label` for `duration` seconds.
    fn price(&self, label: &Label, duration: u64) -> Amount;
}

/// Length-tiered annual pricing, pro-rated linearly by duration.
///
/// Tier `i` holds the per-year price for labels of `MIN_LABEL_LENGTH + i`
/// characters; labels longer than the last tier pay the floor (last) tier.
/// Tiers are monotone non-increasing, so shorter names never cost less.
#[derive(Debug, Clone)]
pub struct TieredPriceOracle {
    annual_tiers: Vec<Amount>,
}

impl TieredPriceOracle {
    /// Build an oracle from per-year tier prices.
    ///
    /// Returns `None` for an empty table or one that ever increases with
    /// length.
    pub fn new(annual_tiers: Vec<Amount>) -> Option<Self> {
        if annual_tiers.is_empty() || annual_tiers.windows(2).any(|w| w[1] > w[0]) {
            return None;
        }
        Some(Self { annual_tiers })
    }

    fn annual_price(&self, label: &Label) -> Amount {
        let tier = label
            .len()
            .saturating_sub(MIN_LABEL_LENGTH)
            .min(self.annual_tiers.len() - 1);
        self.annual_tiers[tier]
    }
}

impl Default for TieredPriceOracle {
    /// Three-character names at 640, four at 160, five and longer at 5
    /// units per year (micro-unit scale left to the deployment).
    fn default() -> Self {
        Self {
            annual_tiers: vec![640_000_000, 160_000_000, 5_000_000],
        }
    }
}

impl PriceOracle for TieredPriceOracle {
    fn price(&self, label: &Label, duration: u64) -> Amount {
        self.annual_price(label)
            .saturating_mul(duration as Amount)
            / SECONDS_PER_YEAR as Amount
    }
}
