//! The commit-reveal state machine and the atomic registration apply chain.

use crate::types::{RegistrationReceipt, RegistrationRequest, RenewalReceipt};
use anyhow::{bail, Context};
use namechain_fees::{FeeManager, PriceOracle};
use namechain_limiter::RegistrationLimiter;
use namechain_registrar::{Leasehold, NameRegistrar, MAX_LEASE_DURATION};
use namechain_registry::ReverseRegistrar;
use namechain_types::{
    Address, Amount, Clock, CommitmentHash, Label, NameServiceError, Result, Timestamp,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

const COMPONENT: &str = "controller";

/// Protocol windows and floors, validated at construction.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Seconds a commitment must age before it becomes revealable.
    pub min_commitment_age: u64,
    /// Seconds after which a commitment is treated as absent.
    pub max_commitment_age: u64,
    /// Shortest lease the controller will sell.
    pub min_registration_duration: u64,
    /// Parent name appended to labels for reverse records, e.g. `nc`.
    pub parent_name: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            min_commitment_age: 60,
            max_commitment_age: 86_400,
            min_registration_duration: 2_592_000, // 30 days
            parent_name: "nc".to_string(),
        }
    }
}

impl ControllerConfig {
    fn validate(&self) -> anyhow::Result<()> {
        if self.min_commitment_age == 0 {
            bail!("min_commitment_age must be nonzero");
        }
        if self.min_commitment_age >= self.max_commitment_age {
            bail!("min_commitment_age must be below max_commitment_age");
        }
        if self.min_registration_duration == 0 {
            bail!("min_registration_duration must be nonzero");
        }
        Ok(())
    }
}

/// Completed apply-chain steps, unwound in reverse if a later step fails.
enum UndoStep {
    Lease {
        label: Label,
        prior: Option<Leasehold>,
    },
    RateRecord {
        owner: Address,
    },
    FeeDeposit {
        amount: Amount,
    },
    ReverseRecord {
        owner: Address,
    },
}

/// Orchestrator of the commit-reveal registration protocol.
///
/// Holds the commitment table and the pause switch; everything else lives
/// in the collaborating components, reached through the five capability
/// edges (registrar controller, registry operator via the registrar,
/// limiter controller slot, fee-manager controller, reverse-registrar
/// controller). All write operations are serialized by one mutex, the
/// in-process analogue of the ledger's total ordering.
pub struct RegistrationController {
    /// Identity this controller presents to the other components.
    address: Address,
    owner: Address,
    config: ControllerConfig,
    registrar: Arc<NameRegistrar>,
    limiter: Arc<RegistrationLimiter>,
    fees: Arc<FeeManager>,
    reverse: Arc<ReverseRegistrar>,
    oracle: Arc<dyn PriceOracle>,
    clock: Arc<dyn Clock>,
    /// Commitment hash → submission time. Expiry is computed, not stored.
    commitments: RwLock<HashMap<CommitmentHash, Timestamp>>,
    paused: RwLock<bool>,
    op_lock: Mutex<()>,
    /// Test-only switch that fails the next reverse-record apply step,
    /// standing in for a capability edge cut between validation and apply.
    #[cfg(test)]
    fail_reverse_claim: std::sync::atomic::AtomicBool,
}

impl RegistrationController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        address: Address,
        owner: Address,
        config: ControllerConfig,
        registrar: Arc<NameRegistrar>,
        limiter: Arc<RegistrationLimiter>,
        fees: Arc<FeeManager>,
        reverse: Arc<ReverseRegistrar>,
        oracle: Arc<dyn PriceOracle>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        config
            .validate()
            .context("invalid registration controller configuration")?;
        Ok(Self {
            address,
            owner,
            config,
            registrar,
            limiter,
            fees,
            reverse,
            oracle,
            clock,
            commitments: RwLock::new(HashMap::new()),
            paused: RwLock::new(false),
            op_lock: Mutex::new(()),
            #[cfg(test)]
            fail_reverse_claim: std::sync::atomic::AtomicBool::new(false),
        })
    }

    /// Address this controller acts under.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Whether commit and register are currently refused.
    pub fn paused(&self) -> bool {
        *self.paused.read()
    }

    /// Stop accepting commits, registrations and renewals. Owner only.
    pub fn pause(&self, caller: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        *self.paused.write() = true;
        info!(target: "controller", "paused");
        Ok(())
    }

    /// Resume normal operation. Owner only.
    pub fn unpause(&self, caller: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        *self.paused.write() = false;
        info!(target: "controller", "unpaused");
        Ok(())
    }

    /// Price quote for leasing `label` for `duration` seconds.
    pub fn rent_price(&self, label: &Label, duration: u64) -> Amount {
        self.oracle.price(label, duration)
    }

    /// Submission time of a pending commitment, if any is stored.
    pub fn commitment(&self, hash: CommitmentHash) -> Option<Timestamp> {
        self.commitments.read().get(&hash).copied()
    }

    /// Store a blinded registration intent.
    ///
    /// A stored commitment whose reveal window has not yet closed blocks
    /// resubmission of the same hash; once the window closes the stale
    /// entry is silently overwritten.
    pub fn commit(&self, hash: CommitmentHash) -> Result<()> {
        let _guard = self.op_lock.lock();
        self.ensure_not_paused()?;
        let now = self.clock.now();
        let mut commitments = self.commitments.write();
        if let Some(&submitted_at) = commitments.get(&hash) {
            if now < submitted_at + self.config.max_commitment_age {
                return Err(NameServiceError::UnexpiredCommitmentExists);
            }
        }
        commitments.insert(hash, now);
        Ok(())
    }

    /// Reveal a registration and drive it to completion.
    ///
    /// `value` is the payment supplied by `caller`; any excess over the
    /// quoted price is returned in the receipt. Preconditions are checked
    /// in full before any state moves; the apply chain is journaled so a
    /// late failure unwinds every completed step.
    pub fn register(
        &self,
        caller: Address,
        request: &RegistrationRequest,
        value: Amount,
    ) -> Result<RegistrationReceipt> {
        let _guard = self.op_lock.lock();
        self.ensure_not_paused()?;

        let now = self.clock.now();
        let hash = request.commitment();
        let submitted_at = self
            .commitments
            .read()
            .get(&hash)
            .copied()
            .ok_or(NameServiceError::CommitmentTooOld)?;
        if now < submitted_at + self.config.min_commitment_age {
            return Err(NameServiceError::too_new(
                submitted_at,
                self.config.min_commitment_age,
                now,
            ));
        }
        if now >= submitted_at + self.config.max_commitment_age {
            return Err(NameServiceError::CommitmentTooOld);
        }
        if request.duration < self.config.min_registration_duration
            || request.duration > MAX_LEASE_DURATION
        {
            return Err(NameServiceError::InvalidDuration {
                duration: request.duration,
                floor: self.config.min_registration_duration,
            });
        }
        if !self.limiter.can_register(request.owner) {
            return Err(NameServiceError::RateLimitExceeded {
                address: request.owner,
                count: self.limiter.registrations(request.owner),
            });
        }
        let price = self.oracle.price(&request.label, request.duration);
        if value < price {
            return Err(NameServiceError::InsufficientValue {
                required: price,
                provided: value,
            });
        }
        self.validate_capability_edges(request)?;

        // Apply chain. Each completed step is journaled; a failure in any
        // later step unwinds the journal before the error propagates.
        let mut journal: Vec<UndoStep> = Vec::with_capacity(4);
        let prior_lease = self.registrar.lease(&request.label);

        let token = self.registrar.register(
            self.address,
            &request.label,
            request.owner,
            request.duration,
            request.resolver,
        )?;
        journal.push(UndoStep::Lease {
            label: request.label.clone(),
            prior: prior_lease,
        });

        if let Err(err) = self
            .limiter
            .record_registration(self.address, request.owner)
        {
            self.unwind(journal);
            return Err(err);
        }
        journal.push(UndoStep::RateRecord {
            owner: request.owner,
        });

        if let Err(err) = self.fees.deposit(self.address, price) {
            self.unwind(journal);
            return Err(err);
        }
        journal.push(UndoStep::FeeDeposit { amount: price });

        if request.reverse_record {
            let name = format!("{}.{}", request.label, self.config.parent_name);
            if let Err(err) = self.reverse_claim_step(request.owner, name) {
                self.unwind(journal);
                return Err(err);
            }
            journal.push(UndoStep::ReverseRecord {
                owner: request.owner,
            });
        }

        // Single use: a consumed commitment can never be replayed.
        self.commitments.write().remove(&hash);

        let expiry = now + request.duration;
        info!(
            target: "controller",
            "registered {} for {} until {}, price {}", request.label, request.owner, expiry, price
        );
        Ok(RegistrationReceipt {
            token,
            expiry,
            price,
            refund: value - price,
        })
    }

    /// Extend an existing lease. No commitment or rate-limit consultation;
    /// renewals extend a name someone already holds.
    pub fn renew(
        &self,
        _caller: Address,
        label: &Label,
        duration: u64,
        value: Amount,
    ) -> Result<RenewalReceipt> {
        let _guard = self.op_lock.lock();
        self.ensure_not_paused()?;

        if duration < self.config.min_registration_duration || duration > MAX_LEASE_DURATION {
            return Err(NameServiceError::InvalidDuration {
                duration,
                floor: self.config.min_registration_duration,
            });
        }
        let price = self.oracle.price(label, duration);
        if value < price {
            return Err(NameServiceError::InsufficientValue {
                required: price,
                provided: value,
            });
        }
        if !self.fees.is_authorized_controller(self.address) {
            return Err(NameServiceError::unauthorized("fee_manager", self.address));
        }

        let prior_lease = self.registrar.lease(label);
        let expiry = self.registrar.renew(self.address, label, duration)?;
        if let Err(err) = self.fees.deposit(self.address, price) {
            self.unwind(vec![UndoStep::Lease {
                label: label.clone(),
                prior: prior_lease,
            }]);
            return Err(err);
        }

        info!(
            target: "controller",
            "renewed {} until {}, price {}", label, expiry, price
        );
        Ok(RenewalReceipt {
            expiry,
            price,
            refund: value - price,
        })
    }

    /// Verify every capability edge a registration will traverse before
    /// mutating anything. Keeps broken operator wiring attributable to the
    /// component whose grant is missing.
    fn validate_capability_edges(&self, request: &RegistrationRequest) -> Result<()> {
        self.registrar
            .ensure_registrable(self.address, &request.label)?;
        if self.limiter.controller() != Some(self.address) {
            return Err(NameServiceError::unauthorized("limiter", self.address));
        }
        if !self.fees.is_authorized_controller(self.address) {
            return Err(NameServiceError::unauthorized("fee_manager", self.address));
        }
        if request.reverse_record && !self.reverse.is_controller(self.address) {
            return Err(NameServiceError::unauthorized(
                "reverse_registrar",
                self.address,
            ));
        }
        Ok(())
    }

    /// Forward reverse-record claim, last step of the apply chain.
    fn reverse_claim_step(&self, owner: Address, name: String) -> Result<()> {
        #[cfg(test)]
        if self
            .fail_reverse_claim
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(NameServiceError::unauthorized(
                "reverse_registrar",
                self.address,
            ));
        }
        self.reverse.claim_for(self.address, owner, name)
    }

    #[cfg(test)]
    fn inject_reverse_claim_failure(&self) {
        self.fail_reverse_claim
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Undo completed apply-chain steps in reverse order. Undo calls go
    /// through the same capability edges as the forward steps; a failure
    /// here means an edge was cut mid-operation and is logged rather than
    /// propagated, since the original error is the one the caller needs.
    fn unwind(&self, journal: Vec<UndoStep>) {
        for step in journal.into_iter().rev() {
            let outcome = match step {
                UndoStep::Lease { label, prior } => {
                    self.registrar.restore_lease(self.address, &label, prior)
                }
                UndoStep::RateRecord { owner } => {
                    self.limiter.rollback_registration(self.address, owner)
                }
                UndoStep::FeeDeposit { amount } => {
                    self.fees.refund_deposit(self.address, amount)
                }
                UndoStep::ReverseRecord { owner } => {
                    self.reverse.clear_for(self.address, owner)
                }
            };
            if let Err(err) = outcome {
                warn!(target: "controller", "rollback step failed: {}", err);
            }
        }
    }

    fn ensure_owner(&self, caller: Address) -> Result<()> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(NameServiceError::unauthorized(COMPONENT, caller))
        }
    }

    fn ensure_not_paused(&self) -> Result<()> {
        if self.paused() {
            Err(NameServiceError::Paused)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for RegistrationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationController")
            .field("address", &self.address)
            .field("config", &self.config)
            .field("paused", &self.paused())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use namechain_fees::TieredPriceOracle;
    use namechain_registry::NameRegistry;
    use namechain_types::{LabelHash, ManualClock, NodeHash};

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    /// Full component graph with every capability edge wired, clock at 0.
    fn wired() -> (
        RegistrationController,
        Arc<NameRegistry>,
        Arc<NameRegistrar>,
        Arc<RegistrationLimiter>,
        Arc<FeeManager>,
        Arc<ReverseRegistrar>,
        Arc<ManualClock>,
    ) {
        let deployer = addr(1);
        let registrar_addr = addr(2);
        let controller_addr = addr(3);

        let registry = Arc::new(NameRegistry::new(deployer));
        let base_node = registry
            .set_subnode_owner(deployer, NodeHash::ROOT, LabelHash::of("nc"), deployer)
            .unwrap();
        registry.set_approval_for_all(deployer, registrar_addr, true);

        let clock = Arc::new(ManualClock::new(0));
        let registrar = Arc::new(NameRegistrar::new(
            registrar_addr,
            deployer,
            base_node,
            7_776_000,
            registry.clone(),
            clock.clone(),
        ));
        registrar.add_controller(deployer, controller_addr).unwrap();

        let limiter = Arc::new(RegistrationLimiter::new(deployer));
        limiter.set_controller(deployer, controller_addr).unwrap();

        let fees = Arc::new(FeeManager::new(deployer, addr(4)));
        fees.authorize_controller(deployer, controller_addr).unwrap();

        let reverse = Arc::new(ReverseRegistrar::new(deployer));
        reverse.add_controller(deployer, controller_addr).unwrap();

        let controller = RegistrationController::new(
            controller_addr,
            deployer,
            ControllerConfig::default(),
            registrar.clone(),
            limiter.clone(),
            fees.clone(),
            reverse.clone(),
            Arc::new(TieredPriceOracle::default()),
            clock.clone(),
        )
        .unwrap();

        (controller, registry, registrar, limiter, fees, reverse, clock)
    }

    /// A failure in the last apply step must roll back every completed
    /// step, leave the commitment unconsumed, and surface the step's own
    /// error. The rollback runs in reverse order of the forward chain.
    #[test]
    fn apply_failure_unwinds_every_completed_step() {
        let (controller, registry, registrar, limiter, fees, reverse, clock) = wired();
        let owner = addr(10);
        let mut req = RegistrationRequest::simple(
            Label::new("alice"),
            owner,
            31_536_000,
            [5u8; 32],
        );
        req.reverse_record = true;

        let hash = req.commitment();
        controller.commit(hash).unwrap();
        clock.advance(61);
        let price = controller.rent_price(&req.label, req.duration);

        controller.inject_reverse_claim_failure();
        let err = controller.register(owner, &req, price).unwrap_err();
        assert!(matches!(
            err,
            NameServiceError::Unauthorized { component: "reverse_registrar", .. }
        ));

        // Lease, registry projection, rate record and custodied fee are
        // all back where they started; the refund is accounted for.
        assert!(registrar.lease(&req.label).is_none());
        assert!(registrar.available(&req.label));
        let node = registrar.base_node().subnode(req.label.hash());
        assert_eq!(registry.owner(node), Address::ZERO);
        assert_eq!(limiter.registrations(owner), 0);
        assert_eq!(fees.balance(), 0);
        assert_eq!(fees.statistics().total_refunded, price);
        assert_eq!(reverse.name_of(owner), None);

        // The commitment was not consumed: the same reveal goes through
        // once the apply chain is healthy again.
        assert_eq!(controller.commitment(hash), Some(0));
        let receipt = controller.register(owner, &req, price).unwrap();
        assert_eq!(receipt.price, price);
        assert_eq!(registrar.owner_of(&req.label), Some(owner));
        assert_eq!(reverse.name_of(owner).as_deref(), Some("alice.nc"));
        assert_eq!(fees.balance(), price);
    }

    #[test]
    fn config_windows_are_validated() {
        let mut config = ControllerConfig::default();
        assert!(config.validate().is_ok());

        config.min_commitment_age = config.max_commitment_age;
        assert!(config.validate().is_err());

        let mut config = ControllerConfig::default();
        config.min_commitment_age = 0;
        assert!(config.validate().is_err());

        let mut config = ControllerConfig::default();
        config.min_registration_duration = 0;
        assert!(config.validate().is_err());
    }
}
