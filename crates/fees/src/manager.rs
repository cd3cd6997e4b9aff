//! Custody of registration and renewal payments.

use namechain_types::{Address, Amount, NameServiceError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

const COMPONENT: &str = "fee_manager";

/// Running custody counters.
///
/// Invariant: `balance == total_received - total_refunded - total_withdrawn`.
/// No value is created or destroyed inside the manager.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeeStatistics {
    pub balance: Amount,
    pub total_received: Amount,
    pub total_refunded: Amount,
    pub total_withdrawn: Amount,
}

/// Fee custodian with authorized-spender semantics.
#[derive(Debug)]
pub struct FeeManager {
    owner: Address,
    beneficiary: RwLock<Address>,
    /// Addresses allowed to route payments in (and back out on rollback).
    controllers: RwLock<HashSet<Address>>,
    vault: RwLock<FeeStatistics>,
}

impl FeeManager {
    /// Create a fee manager administered by `owner`, paying out to
    /// `beneficiary`.
    pub fn new(owner: Address, beneficiary: Address) -> Self {
        Self {
            owner,
            beneficiary: RwLock::new(beneficiary),
            controllers: RwLock::new(HashSet::new()),
            vault: RwLock::new(FeeStatistics::default()),
        }
    }

    /// Current custodied balance.
    pub fn balance(&self) -> Amount {
        self.vault.read().balance
    }

    /// Withdrawal destination configured by the owner.
    pub fn beneficiary(&self) -> Address {
        *self.beneficiary.read()
    }

    /// Repoint the withdrawal destination. Owner only.
    pub fn set_beneficiary(&self, caller: Address, beneficiary: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        *self.beneficiary.write() = beneficiary;
        Ok(())
    }

    /// Whether `addr` may route payments into this manager.
    pub fn is_authorized_controller(&self, addr: Address) -> bool {
        self.controllers.read().contains(&addr)
    }

    /// Grant the spender capability. Owner only.
    pub fn authorize_controller(&self, caller: Address, addr: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        self.controllers.write().insert(addr);
        info!(target: "fee_manager", "controller {} authorized", addr);
        Ok(())
    }

    /// Revoke the spender capability. Owner only.
    pub fn revoke_controller(&self, caller: Address, addr: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        self.controllers.write().remove(&addr);
        info!(target: "fee_manager", "controller {} revoked", addr);
        Ok(())
    }

    /// Take custody of a payment. Authorized controller only.
    pub fn deposit(&self, caller: Address, amount: Amount) -> Result<()> {
        self.ensure_controller(caller)?;
        let mut vault = self.vault.write();
        vault.balance = vault.balance.saturating_add(amount);
        vault.total_received = vault.total_received.saturating_add(amount);
        debug!(target: "fee_manager", "deposited {}, balance {}", amount, vault.balance);
        Ok(())
    }

    /// Return a deposit that belongs to a registration being unwound.
    /// Authorized controller only.
    pub fn refund_deposit(&self, caller: Address, amount: Amount) -> Result<()> {
        self.ensure_controller(caller)?;
        let mut vault = self.vault.write();
        if amount > vault.balance {
            return Err(NameServiceError::InsufficientValue {
                required: amount,
                provided: vault.balance,
            });
        }
        vault.balance -= amount;
        vault.total_refunded = vault.total_refunded.saturating_add(amount);
        debug!(target: "fee_manager", "refunded {}, balance {}", amount, vault.balance);
        Ok(())
    }

    /// Pay out custodied fees to `to`. Owner only.
    pub fn withdraw(&self, caller: Address, to: Address, amount: Amount) -> Result<()> {
        self.ensure_owner(caller)?;
        let mut vault = self.vault.write();
        if amount > vault.balance {
            return Err(NameServiceError::InsufficientValue {
                required: amount,
                provided: vault.balance,
            });
        }
        vault.balance -= amount;
        vault.total_withdrawn = vault.total_withdrawn.saturating_add(amount);
        info!(target: "fee_manager", "withdrew {} to {}", amount, to);
        Ok(())
    }

    /// Snapshot of the custody counters.
    pub fn statistics(&self) -> FeeStatistics {
        self.vault.read().clone()
    }

    fn ensure_owner(&self, caller: Address) -> Result<()> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(NameServiceError::unauthorized(COMPONENT, caller))
        }
    }

    fn ensure_controller(&self, caller: Address) -> Result<()> {
        if self.is_authorized_controller(caller) {
            Ok(())
        } else {
            Err(NameServiceError::unauthorized(COMPONENT, caller))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    fn conserved(stats: &FeeStatistics) -> bool {
        stats.balance == stats.total_received - stats.total_refunded - stats.total_withdrawn
    }

    #[test]
    fn deposits_require_authorization() {
        let fees = FeeManager::new(addr(1), addr(2));
        let err = fees.deposit(addr(3), 100).unwrap_err();
        assert!(matches!(err, NameServiceError::Unauthorized { .. }));
        assert_eq!(fees.balance(), 0);

        fees.authorize_controller(addr(1), addr(3)).unwrap();
        fees.deposit(addr(3), 100).unwrap();
        assert_eq!(fees.balance(), 100);

        fees.revoke_controller(addr(1), addr(3)).unwrap();
        assert!(fees.deposit(addr(3), 100).is_err());
        assert_eq!(fees.balance(), 100);
    }

    #[test]
    fn withdraw_is_owner_only_and_bounded() {
        let fees = FeeManager::new(addr(1), addr(2));
        fees.authorize_controller(addr(1), addr(3)).unwrap();
        fees.deposit(addr(3), 500).unwrap();

        let err = fees.withdraw(addr(3), addr(2), 100).unwrap_err();
        assert!(matches!(err, NameServiceError::Unauthorized { .. }));

        let err = fees.withdraw(addr(1), addr(2), 600).unwrap_err();
        assert!(matches!(err, NameServiceError::InsufficientValue { .. }));
        assert_eq!(fees.balance(), 500);

        fees.withdraw(addr(1), addr(2), 200).unwrap();
        assert_eq!(fees.balance(), 300);
        assert!(conserved(&fees.statistics()));
    }

    #[test]
    fn refund_returns_custodied_value() {
        let fees = FeeManager::new(addr(1), addr(2));
        fees.authorize_controller(addr(1), addr(3)).unwrap();
        fees.deposit(addr(3), 500).unwrap();
        fees.refund_deposit(addr(3), 500).unwrap();
        assert_eq!(fees.balance(), 0);
        assert!(conserved(&fees.statistics()));

        let err = fees.refund_deposit(addr(3), 1).unwrap_err();
        assert!(matches!(err, NameServiceError::InsufficientValue { .. }));
    }

    #[test]
    fn beneficiary_is_owner_configurable() {
        let fees = FeeManager::new(addr(1), addr(2));
        assert_eq!(fees.beneficiary(), addr(2));
        assert!(fees.set_beneficiary(addr(9), addr(9)).is_err());
        fees.set_beneficiary(addr(1), addr(4)).unwrap();
        assert_eq!(fees.beneficiary(), addr(4));
    }

    proptest! {
        /// Conservation holds across any interleaving of deposits, refunds
        /// and withdrawals.
        #[test]
        fn custody_conserves_value(ops in proptest::collection::vec((0u8..3, 1u128..10_000), 1..64)) {
            let fees = FeeManager::new(addr(1), addr(2));
            fees.authorize_controller(addr(1), addr(3)).unwrap();

            for (kind, amount) in ops {
                let _ = match kind {
                    0 => fees.deposit(addr(3), amount),
                    1 => fees.refund_deposit(addr(3), amount),
                    _ => fees.withdraw(addr(1), addr(2), amount),
                };
                prop_assert!(conserved(&fees.statistics()));
            }
        }
    }
}
