//! Per-address registration rate policy.
//!
//! Tracks how many registrations each address has accumulated and answers
//! whether another one is allowed. Exactly one controller at a time may
//! record registrations: the slot is a single address, so repointing it
//! fully revokes the previous controller's ability to record. Counts are a
//! fixed lifetime cap with no decay; softening that is a policy change,
//! not a configuration knob.

use namechain_types::{Address, NameServiceError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info};

const COMPONENT: &str = "limiter";

/// Default lifetime registration cap per address.
pub const MAX_REGISTRATIONS_PER_ADDRESS: u32 = 10;

/// Registration counter with a single trusted recorder.
#[derive(Debug)]
pub struct RegistrationLimiter {
    owner: Address,
    /// The one address currently allowed to record registrations.
    controller: RwLock<Option<Address>>,
    /// Address → lifetime registration count.
    counts: RwLock<HashMap<Address, u32>>,
    max_per_address: u32,
}

impl RegistrationLimiter {
    /// Create a limiter administered by `owner` with the default cap.
    pub fn new(owner: Address) -> Self {
        Self::with_cap(owner, MAX_REGISTRATIONS_PER_ADDRESS)
    }

    /// Create a limiter with an explicit per-address cap.
    pub fn with_cap(owner: Address, max_per_address: u32) -> Self {
        Self {
            owner,
            controller: RwLock::new(None),
            counts: RwLock::new(HashMap::new()),
            max_per_address,
        }
    }

    /// The per-address cap this limiter enforces.
    pub fn max_per_address(&self) -> u32 {
        self.max_per_address
    }

    /// The currently trusted recorder, if one is set.
    pub fn controller(&self) -> Option<Address> {
        *self.controller.read()
    }

    /// Lifetime registrations recorded for `addr`.
    pub fn registrations(&self, addr: Address) -> u32 {
        self.counts.read().get(&addr).copied().unwrap_or(0)
    }

    /// Whether `addr` is still under the cap.
    pub fn can_register(&self, addr: Address) -> bool {
        self.registrations(addr) < self.max_per_address
    }

    /// Point the recorder slot at `controller`, revoking the previous one.
    /// Owner only.
    pub fn set_controller(&self, caller: Address, controller: Address) -> Result<()> {
        if caller != self.owner {
            return Err(NameServiceError::unauthorized(COMPONENT, caller));
        }
        *self.controller.write() = Some(controller);
        info!(target: "limiter", "controller set to {}", controller);
        Ok(())
    }

    /// Count one registration against `addr`. Current controller only; the
    /// caller is expected to have consulted `can_register` first.
    pub fn record_registration(&self, caller: Address, addr: Address) -> Result<()> {
        self.ensure_controller(caller)?;
        let mut counts = self.counts.write();
        let count = counts.entry(addr).or_insert(0);
        *count = count.saturating_add(1);
        debug!(target: "limiter", "{} now at {} registrations", addr, count);
        Ok(())
    }

    /// Undo one recorded registration for `addr`. Current controller only;
    /// unwind hook for a registration that failed after recording.
    pub fn rollback_registration(&self, caller: Address, addr: Address) -> Result<()> {
        self.ensure_controller(caller)?;
        let mut counts = self.counts.write();
        if let Some(count) = counts.get_mut(&addr) {
            *count = count.saturating_sub(1);
        }
        debug!(target: "limiter", "rolled back one registration for {}", addr);
        Ok(())
    }

    fn ensure_controller(&self, caller: Address) -> Result<()> {
        if self.controller() == Some(caller) {
            Ok(())
        } else {
            Err(NameServiceError::unauthorized(COMPONENT, caller))
        }
    }
}
