//! Reverse records: account address → preferred display name.
//!
//! Authorized independently of the forward tree. A user can always claim a
//! reverse record for their own address; the registration controller claims
//! on behalf of a new registrant when asked to, which requires its own
//! capability grant here.

use namechain_types::{Address, NameServiceError, Result};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::debug;

const COMPONENT: &str = "reverse_registrar";

/// Address → preferred name mapping with an owner-managed controller set.
#[derive(Debug)]
pub struct ReverseRegistrar {
    owner: Address,
    controllers: RwLock<HashSet<Address>>,
    names: RwLock<HashMap<Address, String>>,
}

impl ReverseRegistrar {
    /// Create a reverse registrar administered by `owner`.
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            controllers: RwLock::new(HashSet::new()),
            names: RwLock::new(HashMap::new()),
        }
    }

    /// Whether `addr` may claim reverse records on behalf of others.
    pub fn is_controller(&self, addr: Address) -> bool {
        self.controllers.read().contains(&addr)
    }

    /// Grant the controller capability. Owner only.
    pub fn add_controller(&self, caller: Address, addr: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        self.controllers.write().insert(addr);
        debug!(target: "reverse_registrar", "controller {} added", addr);
        Ok(())
    }

    /// Revoke the controller capability. Owner only.
    pub fn remove_controller(&self, caller: Address, addr: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        self.controllers.write().remove(&addr);
        debug!(target: "reverse_registrar", "controller {} removed", addr);
        Ok(())
    }

    /// Claim the caller's own reverse record.
    pub fn claim(&self, caller: Address, name: impl Into<String>) {
        self.names.write().insert(caller, name.into());
    }

    /// Claim a reverse record on behalf of `addr`. Controller only.
    pub fn claim_for(&self, caller: Address, addr: Address, name: impl Into<String>) -> Result<()> {
        self.ensure_controller(caller)?;
        self.names.write().insert(addr, name.into());
        debug!(target: "reverse_registrar", "reverse record claimed for {}", addr);
        Ok(())
    }

    /// Remove the reverse record of `addr`. Controller only; used to unwind
    /// a failed registration.
    pub fn clear_for(&self, caller: Address, addr: Address) -> Result<()> {
        self.ensure_controller(caller)?;
        self.names.write().remove(&addr);
        Ok(())
    }

    /// Preferred name of an address, if one was claimed.
    pub fn name_of(&self, addr: Address) -> Option<String> {
        self.names.read().get(&addr).cloned()
    }

    fn ensure_owner(&self, caller: Address) -> Result<()> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(NameServiceError::unauthorized(COMPONENT, caller))
        }
    }

    fn ensure_controller(&self, caller: Address) -> Result<()> {
        if self.is_controller(caller) {
            Ok(())
        } else {
            Err(NameServiceError::unauthorized(COMPONENT, caller))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    #[test]
    fn self_claim_needs_no_capability() {
        let reverse = ReverseRegistrar::new(addr(1));
        reverse.claim(addr(2), "alice.nc");
        assert_eq!(reverse.name_of(addr(2)).as_deref(), Some("alice.nc"));
        assert_eq!(reverse.name_of(addr(3)), None);
    }

    #[test]
    fn claim_for_requires_controller_grant() {
        let reverse = ReverseRegistrar::new(addr(1));
        let err = reverse.claim_for(addr(9), addr(2), "alice.nc").unwrap_err();
        assert!(matches!(err, NameServiceError::Unauthorized { .. }));
        assert_eq!(reverse.name_of(addr(2)), None);

        reverse.add_controller(addr(1), addr(9)).unwrap();
        reverse.claim_for(addr(9), addr(2), "alice.nc").unwrap();
        assert_eq!(reverse.name_of(addr(2)).as_deref(), Some("alice.nc"));
    }

    #[test]
    fn only_owner_manages_controllers() {
        let reverse = ReverseRegistrar::new(addr(1));
        let err = reverse.add_controller(addr(9), addr(9)).unwrap_err();
        assert!(matches!(err, NameServiceError::Unauthorized { .. }));

        reverse.add_controller(addr(1), addr(9)).unwrap();
        assert!(reverse.is_controller(addr(9)));
        reverse.remove_controller(addr(1), addr(9)).unwrap();
        assert!(!reverse.is_controller(addr(9)));
    }

    #[test]
    fn clear_for_unwinds_claim() {
        let reverse = ReverseRegistrar::new(addr(1));
        reverse.add_controller(addr(1), addr(9)).unwrap();
        reverse.claim_for(addr(9), addr(2), "alice.nc").unwrap();
        reverse.clear_for(addr(9), addr(2)).unwrap();
        assert_eq!(reverse.name_of(addr(2)), None);
    }
}
