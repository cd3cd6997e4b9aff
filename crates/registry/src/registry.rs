//! Ownership tree storage and authorization.

use crate::types::NodeRecord;
use namechain_types::{Address, LabelHash, NameServiceError, NodeHash, Result};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::debug;

const COMPONENT: &str = "registry";

/// Canonical name ownership tree.
///
/// Node identifiers are namehashes; the child of `parent` for a label is
/// derived deterministically as `sha256(parent ‖ labelhash)`. The root node
/// exists from construction and seeds all authority in the tree.
#[derive(Debug)]
pub struct NameRegistry {
    /// Node → record mapping.
    records: RwLock<HashMap<NodeHash, NodeRecord>>,
    /// Standing `(owner, operator)` approvals.
    operators: RwLock<HashSet<(Address, Address)>>,
}

impl NameRegistry {
    /// Create a registry whose root node is owned by `root_owner`.
    pub fn new(root_owner: Address) -> Self {
        let mut records = HashMap::new();
        records.insert(NodeHash::ROOT, NodeRecord::owned_by(root_owner));
        Self {
            records: RwLock::new(records),
            operators: RwLock::new(HashSet::new()),
        }
    }

    /// Owner of a node, or the null address if no record exists.
    pub fn owner(&self, node: NodeHash) -> Address {
        self.records
            .read()
            .get(&node)
            .map(|r| r.owner)
            .unwrap_or(Address::ZERO)
    }

    /// Resolver of a node, or the null address if no record exists.
    pub fn resolver(&self, node: NodeHash) -> Address {
        self.records
            .read()
            .get(&node)
            .map(|r| r.resolver)
            .unwrap_or(Address::ZERO)
    }

    /// Advertised ttl of a node, zero if no record exists.
    pub fn ttl(&self, node: NodeHash) -> u64 {
        self.records.read().get(&node).map(|r| r.ttl).unwrap_or(0)
    }

    /// Full record of a node, if one exists.
    pub fn record(&self, node: NodeHash) -> Option<NodeRecord> {
        self.records.read().get(&node).cloned()
    }

    /// Whether any record exists for the node.
    pub fn record_exists(&self, node: NodeHash) -> bool {
        self.records.read().contains_key(&node)
    }

    /// Whether `operator` holds a standing approval from `owner`.
    pub fn is_approved_for_all(&self, owner: Address, operator: Address) -> bool {
        self.operators.read().contains(&(owner, operator))
    }

    /// Grant or revoke a standing operator approval for the caller's nodes.
    pub fn set_approval_for_all(&self, caller: Address, operator: Address, approved: bool) {
        let mut operators = self.operators.write();
        if approved {
            operators.insert((caller, operator));
        } else {
            operators.remove(&(caller, operator));
        }
        debug!(
            target: "registry",
            "operator approval {} -> {} set to {}", caller, operator, approved
        );
    }

    /// Transfer ownership of a node.
    pub fn set_owner(&self, caller: Address, node: NodeHash, new_owner: Address) -> Result<()> {
        self.ensure_authorized(caller, node)?;
        let mut records = self.records.write();
        if let Some(record) = records.get_mut(&node) {
            record.owner = new_owner;
        }
        debug!(target: "registry", "node {} owner set to {}", node, new_owner);
        Ok(())
    }

    /// Point a node at a resolver.
    pub fn set_resolver(&self, caller: Address, node: NodeHash, resolver: Address) -> Result<()> {
        self.ensure_authorized(caller, node)?;
        let mut records = self.records.write();
        if let Some(record) = records.get_mut(&node) {
            record.resolver = resolver;
        }
        Ok(())
    }

    /// Set the advertised caching ttl of a node.
    pub fn set_ttl(&self, caller: Address, node: NodeHash, ttl: u64) -> Result<()> {
        self.ensure_authorized(caller, node)?;
        let mut records = self.records.write();
        if let Some(record) = records.get_mut(&node) {
            record.ttl = ttl;
        }
        Ok(())
    }

    /// Replace owner, resolver and ttl of a node in one write.
    pub fn set_record(&self, caller: Address, node: NodeHash, record: NodeRecord) -> Result<()> {
        self.ensure_authorized(caller, node)?;
        self.records.write().insert(node, record);
        Ok(())
    }

    /// Create or reassign the child of `parent` for `label`.
    ///
    /// The caller must be authorized for `parent`, not for the child: parent
    /// authority is what seeds every subtree. Returns the derived child node.
    pub fn set_subnode_owner(
        &self,
        caller: Address,
        parent: NodeHash,
        label: LabelHash,
        new_owner: Address,
    ) -> Result<NodeHash> {
        self.ensure_authorized(caller, parent)?;
        let node = parent.subnode(label);
        let mut records = self.records.write();
        records
            .entry(node)
            .and_modify(|r| r.owner = new_owner)
            .or_insert_with(|| NodeRecord::owned_by(new_owner));
        debug!(
            target: "registry",
            "subnode {} of {} assigned to {}", node, parent, new_owner
        );
        Ok(node)
    }

    /// Create or replace the child of `parent` for `label` with a full
    /// record in one write. Parent authority, as with `set_subnode_owner`.
    pub fn set_subnode_record(
        &self,
        caller: Address,
        parent: NodeHash,
        label: LabelHash,
        record: NodeRecord,
    ) -> Result<NodeHash> {
        self.ensure_authorized(caller, parent)?;
        let node = parent.subnode(label);
        self.records.write().insert(node, record);
        Ok(node)
    }

    fn ensure_authorized(&self, caller: Address, node: NodeHash) -> Result<()> {
        let owner = self.owner(node);
        if caller == owner && !caller.is_zero() {
            return Ok(());
        }
        if self.is_approved_for_all(owner, caller) {
            return Ok(());
        }
        Err(NameServiceError::unauthorized(COMPONENT, caller))
    }
}
