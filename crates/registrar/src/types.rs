use namechain_types::{Address, Timestamp};
use serde::{Deserialize, Serialize};

/// A time-bounded ownership grant over a single label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leasehold {
    /// Current leaseholder.
    pub owner: Address,
    /// Second at which the lease stops being live.
    pub expiry: Timestamp,
}

impl Leasehold {
    /// Whether the lease is live at `now`.
    pub fn is_live(&self, now: Timestamp) -> bool {
        now < self.expiry
    }

    /// Whether the lease sits in its post-expiry grace window at `now`.
    pub fn is_in_grace(&self, now: Timestamp, grace_period: u64) -> bool {
        now >= self.expiry && now < self.expiry + grace_period
    }

    /// Whether the grace window has lapsed and the name is releasable.
    pub fn is_released(&self, now: Timestamp, grace_period: u64) -> bool {
        now >= self.expiry + grace_period
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn lease_phases_partition_the_timeline() {
        let lease = Leasehold {
            owner: Address::new([1u8; 20]),
            expiry: 1_000,
        };
        let grace = 100;

        assert!(lease.is_live(999));
        assert!(!lease.is_live(1_000));

        assert!(!lease.is_in_grace(999, grace));
        assert!(lease.is_in_grace(1_000, grace));
        assert!(lease.is_in_grace(1_099, grace));
        assert!(!lease.is_in_grace(1_100, grace));

        assert!(!lease.is_released(1_099, grace));
        assert!(lease.is_released(1_100, grace));
    }

    proptest! {
        /// At any instant a lease is in exactly one phase.
        #[test]
        fn exactly_one_phase_at_a_time(
            expiry in 1u64..1_000_000,
            grace in 0u64..100_000,
            now in 0u64..2_000_000,
        ) {
            let lease = Leasehold {
                owner: Address::new([1u8; 20]),
                expiry,
            };
            let phases = [
                lease.is_live(now),
                lease.is_in_grace(now, grace),
                lease.is_released(now, grace),
            ];
            prop_assert_eq!(phases.iter().filter(|p| **p).count(), 1);
        }
    }
}
