use namechain_types::Address;
use serde::{Deserialize, Serialize};

/// Registry entry for one node of the ownership tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Current owner; authoritative for all mutations of this node.
    pub owner: Address,
    /// Resolver responsible for answering queries about this node.
    pub resolver: Address,
    /// Caching time-to-live advertised to resolvers, in seconds.
    pub ttl: u64,
}

impl NodeRecord {
    /// A record owned by `owner` with no resolver and zero ttl.
    pub fn owned_by(owner: Address) -> Self {
        Self {
            owner,
            resolver: Address::ZERO,
            ttl: 0,
        }
    }
}
