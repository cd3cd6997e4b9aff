//! Hash identifiers for the ownership tree and the commit-reveal protocol.
//!
//! Nodes are identified by a namehash: the root is all zeroes, and a child
//! node is `sha256(parent ‖ labelhash)`. Leaseholds are keyed by the plain
//! labelhash of their label. Commitment hashes are domain separated so a
//! commitment can never collide with a node or label identifier.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

macro_rules! hash32 {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// Get the raw bytes.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                let stripped = s
                    .strip_prefix("0x")
                    .ok_or_else(|| serde::de::Error::custom("missing 0x prefix"))?;
                let decoded = hex::decode(stripped).map_err(serde::de::Error::custom)?;
                let bytes: [u8; 32] = decoded
                    .try_into()
                    .map_err(|_| serde::de::Error::custom("expected 32 bytes"))?;
                Ok(Self(bytes))
            }
        }
    };
}

hash32! {
    /// Identifier of a node in the hierarchical ownership tree.
    NodeHash
}

hash32! {
    /// Hash of a single label; doubles as the leasehold token identifier.
    LabelHash
}

hash32! {
    /// Blinded registration intent submitted during the commit phase.
    CommitmentHash
}

impl NodeHash {
    /// The root of the ownership tree.
    pub const ROOT: NodeHash = NodeHash([0u8; 32]);

    /// Derive the child node identifier for `label` under this node.
    pub fn subnode(&self, label: LabelHash) -> NodeHash {
        let mut hasher = Sha256::new();
        hasher.update(self.0);
        hasher.update(label.0);
        NodeHash(hasher.finalize().into())
    }
}

impl LabelHash {
    /// Hash a raw label string.
    pub fn of(label: &str) -> LabelHash {
        LabelHash(Sha256::digest(label.as_bytes()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subnode_derivation_is_deterministic() {
        let label = LabelHash::of("alice");
        let a = NodeHash::ROOT.subnode(label);
        let b = NodeHash::ROOT.subnode(label);
        assert_eq!(a, b);
        assert_ne!(a, NodeHash::ROOT);
    }

    #[test]
    fn sibling_labels_get_distinct_nodes() {
        let a = NodeHash::ROOT.subnode(LabelHash::of("alice"));
        let b = NodeHash::ROOT.subnode(LabelHash::of("bob"));
        assert_ne!(a, b);
    }

    #[test]
    fn same_label_under_different_parents_differs() {
        let parent = NodeHash::ROOT.subnode(LabelHash::of("nc"));
        let a = parent.subnode(LabelHash::of("alice"));
        let b = NodeHash::ROOT.subnode(LabelHash::of("alice"));
        assert_ne!(a, b);
    }
}
