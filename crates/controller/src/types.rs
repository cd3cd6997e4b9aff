//! Request and receipt types for the registration protocol.

use namechain_types::{Address, Amount, CommitmentHash, Label, LabelHash, Timestamp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Domain separator for commitment hashes; keeps them disjoint from node
/// and label identifiers.
const COMMITMENT_PREFIX: &[u8] = b"NAMECHAIN_COMMITMENT_V1";

/// Full parameter set a client blinds during commit and reveals during
/// registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Label to lease under the base node.
    pub label: Label,
    /// Address the leasehold and registry entry are assigned to.
    pub owner: Address,
    /// Lease duration in seconds.
    pub duration: u64,
    /// Client-chosen blinding secret; what makes the commitment unlinkable.
    pub secret: [u8; 32],
    /// Resolver installed on the node, or the null address for none.
    pub resolver: Address,
    /// Opaque resolver record payloads; bound into the commitment, applied
    /// by the resolver (an external collaborator) after registration.
    pub data: Vec<Vec<u8>>,
    /// Whether the controller should claim a reverse record for `owner`.
    pub reverse_record: bool,
    /// Opaque fuse bits bound into the commitment for downstream wrappers.
    pub fuses: u32,
}

impl RegistrationRequest {
    /// A minimal request with no resolver, records or reverse claim.
    pub fn simple(label: Label, owner: Address, duration: u64, secret: [u8; 32]) -> Self {
        Self {
            label,
            owner,
            duration,
            secret,
            resolver: Address::ZERO,
            data: Vec::new(),
            reverse_record: false,
            fuses: 0,
        }
    }

    /// Recompute the commitment hash for this request.
    ///
    /// Every field participates, with variable-length parts length-framed
    /// so distinct requests can never collide.
    pub fn commitment(&self) -> CommitmentHash {
        let mut hasher = Sha256::new();
        hasher.update(COMMITMENT_PREFIX);
        hasher.update(self.label.hash().as_bytes());
        hasher.update(self.owner.as_bytes());
        hasher.update(self.duration.to_le_bytes());
        hasher.update(self.secret);
        hasher.update(self.resolver.as_bytes());
        hasher.update((self.data.len() as u64).to_le_bytes());
        for record in &self.data {
            hasher.update((record.len() as u64).to_le_bytes());
            hasher.update(record);
        }
        hasher.update([self.reverse_record as u8]);
        hasher.update(self.fuses.to_le_bytes());
        CommitmentHash(hasher.finalize().into())
    }

    /// Token identifier the request resolves to.
    pub fn token(&self) -> LabelHash {
        self.label.hash()
    }
}

/// Outcome of a successful registration reveal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    /// Leasehold token identifier.
    pub token: LabelHash,
    /// Second at which the lease stops being live.
    pub expiry: Timestamp,
    /// Price charged and routed to the fee manager.
    pub price: Amount,
    /// Overpayment returned to the caller.
    pub refund: Amount,
}

/// Outcome of a successful renewal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalReceipt {
    /// New lease expiry.
    pub expiry: Timestamp,
    /// Price charged and routed to the fee manager.
    pub price: Amount,
    /// Overpayment returned to the caller.
    pub refund: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegistrationRequest {
        RegistrationRequest::simple(Label::new("alice"), Address::new([7u8; 20]), 3600, [9u8; 32])
    }

    #[test]
    fn commitment_is_deterministic() {
        assert_eq!(request().commitment(), request().commitment());
    }

    #[test]
    fn every_field_binds_the_commitment() {
        let base = request().commitment();

        let mut r = request();
        r.label = Label::new("alicf");
        assert_ne!(r.commitment(), base);

        let mut r = request();
        r.secret = [10u8; 32];
        assert_ne!(r.commitment(), base);

        let mut r = request();
        r.duration += 1;
        assert_ne!(r.commitment(), base);

        let mut r = request();
        r.reverse_record = true;
        assert_ne!(r.commitment(), base);

        let mut r = request();
        r.fuses = 1;
        assert_ne!(r.commitment(), base);

        let mut r = request();
        r.data = vec![vec![1, 2, 3]];
        assert_ne!(r.commitment(), base);
    }

    #[test]
    fn data_framing_resists_concatenation_collisions() {
        let mut a = request();
        a.data = vec![vec![1, 2], vec![3]];
        let mut b = request();
        b.data = vec![vec![1], vec![2, 3]];
        assert_ne!(a.commitment(), b.commitment());
    }

    #[test]
    fn receipts_serialize_for_tooling() {
        let receipt = RegistrationReceipt {
            token: request().token(),
            expiry: 4600,
            price: 100,
            refund: 20,
        };
        let json = serde_json::to_string(&receipt).unwrap();
        let back: RegistrationReceipt = serde_json::from_str(&json).unwrap();
        assert_eq!(back.expiry, receipt.expiry);
        assert_eq!(back.token, receipt.token);
    }
}
