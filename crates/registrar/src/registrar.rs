//! Leasehold minting, renewal and the registry projection.

use crate::types::Leasehold;
use namechain_registry::NameRegistry;
use namechain_types::{
    Address, Clock, Label, LabelHash, NameServiceError, NodeHash, Result, Timestamp,
};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

const COMPONENT: &str = "registrar";

/// Longest single lease or extension accepted, 100 years of 365 days.
/// Keeps expiry arithmetic clear of the timestamp ceiling.
pub const MAX_LEASE_DURATION: u64 = 100 * 365 * 24 * 60 * 60;

/// Tokenized leasehold registrar for leaf names under `base_node`.
///
/// The registrar acts in the registry under its own address; installing a
/// lease into the tree relies on a standing operator approval from the base
/// node's owner. That approval is provisioned once at deployment, not
/// re-checked per call by anyone but the registry itself.
pub struct NameRegistrar {
    /// Identity this registrar presents when calling the registry.
    address: Address,
    /// Administrative owner of the controller set.
    owner: Address,
    /// Parent node all leased names live under.
    base_node: NodeHash,
    /// Seconds after expiry during which a name is not yet releasable.
    grace_period: u64,
    registry: Arc<NameRegistry>,
    clock: Arc<dyn Clock>,
    /// Token (labelhash) → leasehold mapping.
    leases: RwLock<HashMap<LabelHash, Leasehold>>,
    /// Addresses allowed to mint and extend leases.
    controllers: RwLock<HashSet<Address>>,
}

impl NameRegistrar {
    pub fn new(
        address: Address,
        owner: Address,
        base_node: NodeHash,
        grace_period: u64,
        registry: Arc<NameRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            address,
            owner,
            base_node,
            grace_period,
            registry,
            clock,
            leases: RwLock::new(HashMap::new()),
            controllers: RwLock::new(HashSet::new()),
        }
    }

    /// Address this registrar acts under in the registry.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Parent node of every leased name.
    pub fn base_node(&self) -> NodeHash {
        self.base_node
    }

    /// Post-expiry grace window in seconds.
    pub fn grace_period(&self) -> u64 {
        self.grace_period
    }

    /// Whether `addr` holds the controller capability.
    pub fn is_controller(&self, addr: Address) -> bool {
        self.controllers.read().contains(&addr)
    }

    /// Grant the controller capability. Owner only.
    pub fn add_controller(&self, caller: Address, addr: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        self.controllers.write().insert(addr);
        info!(target: "registrar", "controller {} added", addr);
        Ok(())
    }

    /// Revoke the controller capability. Owner only.
    pub fn remove_controller(&self, caller: Address, addr: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        self.controllers.write().remove(&addr);
        info!(target: "registrar", "controller {} removed", addr);
        Ok(())
    }

    /// Whether `label` can be leased right now: no leasehold exists, or the
    /// existing one has lapsed past its grace window.
    pub fn available(&self, label: &Label) -> bool {
        let now = self.clock.now();
        match self.leases.read().get(&label.hash()) {
            None => true,
            Some(lease) => lease.is_released(now, self.grace_period),
        }
    }

    /// Current leasehold for `label`, live or not.
    pub fn lease(&self, label: &Label) -> Option<Leasehold> {
        self.leases.read().get(&label.hash()).cloned()
    }

    /// Expiry of the current leasehold, if any.
    pub fn name_expires(&self, label: &Label) -> Option<Timestamp> {
        self.lease(label).map(|l| l.expiry)
    }

    /// Holder of a live lease. An expired lease, grace window included, no
    /// longer resolves as owned.
    pub fn owner_of(&self, label: &Label) -> Option<Address> {
        let now = self.clock.now();
        self.lease(label).filter(|l| l.is_live(now)).map(|l| l.owner)
    }

    /// Pre-flight check used by the controller before it starts mutating:
    /// verifies the caller's controller capability, the name's availability
    /// and the registrar's own standing approval on the registry, without
    /// touching any state.
    pub fn ensure_registrable(&self, caller: Address, label: &Label) -> Result<()> {
        self.ensure_controller(caller)?;
        if !label.is_valid() {
            return Err(NameServiceError::InvalidLabel {
                label: label.as_str().to_string(),
            });
        }
        if !self.available(label) {
            return Err(NameServiceError::NameNotAvailable {
                label: label.as_str().to_string(),
            });
        }
        self.ensure_registry_edge()
    }

    /// Mint or overwrite the leasehold for `label` and project it into the
    /// registry. Controller only.
    ///
    /// When a resolver is supplied the node passes through the registrar's
    /// own address first so the resolver can be installed before ownership
    /// is handed to the registrant; only the first registry write can fail,
    /// so a failure leaves the lease table untouched.
    pub fn register(
        &self,
        caller: Address,
        label: &Label,
        owner: Address,
        duration: u64,
        resolver: Address,
    ) -> Result<LabelHash> {
        self.ensure_controller(caller)?;
        if !label.is_valid() {
            return Err(NameServiceError::InvalidLabel {
                label: label.as_str().to_string(),
            });
        }
        self.ensure_duration(duration)?;
        if !self.available(label) {
            return Err(NameServiceError::NameNotAvailable {
                label: label.as_str().to_string(),
            });
        }

        // Expiry is fixed before any registry write so an out-of-range
        // duration can never leave a partial projection behind.
        let now = self.clock.now();
        let expiry = now
            .checked_add(duration)
            .ok_or(NameServiceError::InvalidDuration { duration, floor: 1 })?;

        let token = label.hash();
        if resolver.is_zero() {
            self.registry
                .set_subnode_owner(self.address, self.base_node, token, owner)?;
        } else {
            let node = self
                .registry
                .set_subnode_owner(self.address, self.base_node, token, self.address)?;
            self.registry.set_resolver(self.address, node, resolver)?;
            self.registry.set_owner(self.address, node, owner)?;
        }

        self.leases.write().insert(token, Leasehold { owner, expiry });

        info!(
            target: "registrar",
            "leased {} to {} until {}", label, owner, expiry
        );
        Ok(token)
    }

    /// Extend a live lease by `duration` seconds. Controller only.
    ///
    /// Renewal requires the lease to still be live: a name in its grace
    /// window is not renewable and must go through registration again once
    /// released.
    pub fn renew(&self, caller: Address, label: &Label, duration: u64) -> Result<Timestamp> {
        self.ensure_controller(caller)?;
        self.ensure_duration(duration)?;

        let now = self.clock.now();
        let mut leases = self.leases.write();
        let lease = leases
            .get_mut(&label.hash())
            .filter(|l| l.is_live(now))
            .ok_or_else(|| NameServiceError::NameNotAvailable {
                label: label.as_str().to_string(),
            })?;

        let expiry = lease
            .expiry
            .checked_add(duration)
            .ok_or(NameServiceError::InvalidDuration { duration, floor: 1 })?;
        lease.expiry = expiry;
        info!(target: "registrar", "renewed {} until {}", label, expiry);
        Ok(expiry)
    }

    /// Transfer a live leasehold to `to` and hand over the registry node.
    /// Grace-window leases are not transferable.
    pub fn transfer(&self, caller: Address, label: &Label, to: Address) -> Result<()> {
        let now = self.clock.now();
        let token = label.hash();
        {
            let leases = self.leases.read();
            let lease = leases.get(&token).filter(|l| l.is_live(now)).ok_or_else(|| {
                NameServiceError::NameNotAvailable {
                    label: label.as_str().to_string(),
                }
            })?;
            if lease.owner != caller {
                return Err(NameServiceError::unauthorized(COMPONENT, caller));
            }
        }

        self.registry
            .set_subnode_owner(self.address, self.base_node, token, to)?;
        if let Some(lease) = self.leases.write().get_mut(&token) {
            lease.owner = to;
        }
        debug!(target: "registrar", "lease {} transferred to {}", label, to);
        Ok(())
    }

    /// Put the lease table and registry projection for `label` back to a
    /// prior observation. Controller only; this is the unwind hook for the
    /// controller's all-or-nothing registration.
    pub fn restore_lease(
        &self,
        caller: Address,
        label: &Label,
        prior: Option<Leasehold>,
    ) -> Result<()> {
        self.ensure_controller(caller)?;
        let token = label.hash();
        let prior_owner = prior.as_ref().map(|l| l.owner).unwrap_or(Address::ZERO);
        self.registry
            .set_subnode_owner(self.address, self.base_node, token, prior_owner)?;

        let mut leases = self.leases.write();
        match prior {
            Some(lease) => leases.insert(token, lease),
            None => leases.remove(&token),
        };
        debug!(target: "registrar", "lease {} restored", label);
        Ok(())
    }

    fn ensure_owner(&self, caller: Address) -> Result<()> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(NameServiceError::unauthorized(COMPONENT, caller))
        }
    }

    fn ensure_duration(&self, duration: u64) -> Result<()> {
        if duration == 0 || duration > MAX_LEASE_DURATION {
            return Err(NameServiceError::InvalidDuration { duration, floor: 1 });
        }
        Ok(())
    }

    fn ensure_controller(&self, caller: Address) -> Result<()> {
        if self.is_controller(caller) {
            Ok(())
        } else {
            Err(NameServiceError::unauthorized(COMPONENT, caller))
        }
    }

    fn ensure_registry_edge(&self) -> Result<()> {
        let base_owner = self.registry.owner(self.base_node);
        if base_owner == self.address
            || self.registry.is_approved_for_all(base_owner, self.address)
        {
            Ok(())
        } else {
            Err(NameServiceError::unauthorized("registry", self.address))
        }
    }
}

impl std::fmt::Debug for NameRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameRegistrar")
            .field("address", &self.address)
            .field("base_node", &self.base_node)
            .field("grace_period", &self.grace_period)
            .finish_non_exhaustive()
    }
}
