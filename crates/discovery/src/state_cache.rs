//! The deduplication layer closest to callers: canonical identifier →
//! fully-built `StateNode`.
//!
//! Nodes are build-once, read-many. Publication is an atomic
//! insert-if-absent; when two workers race, the first wins and the loser's
//! build is discarded. The only in-place change is the monotonic aspect
//! merge used to upgrade a cached node with IAM/policy data.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sw_domain::config::DiscoveryMode;
use sw_domain::identifier::ResourceId;
use sw_domain::node::{IamAspect, PolicyAspect, StateNode};

#[derive(Default)]
pub struct StateCache {
    nodes: DashMap<String, Arc<StateNode>>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ResourceId) -> Option<Arc<StateNode>> {
        self.nodes.get(&id.key()).map(|e| e.value().clone())
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.nodes.contains_key(&id.key())
    }

    /// Atomic insert-if-absent. Returns the node that ended up published:
    /// the argument on success, the racing winner on conflict.
    pub fn try_publish(&self, node: StateNode) -> Arc<StateNode> {
        match self.nodes.entry(node.id.key()) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => {
                let published = Arc::new(node);
                slot.insert(published.clone());
                published
            }
        }
    }

    /// Upgrade a cached node with additional aspect data under the entry
    /// lock, so concurrent upgraders merge rather than overwrite. If the
    /// entry vanished (cache reset), the merged `base` is re-published.
    pub fn merge_aspects(
        &self,
        base: &Arc<StateNode>,
        iam: Option<IamAspect>,
        policy: Option<PolicyAspect>,
        added: DiscoveryMode,
    ) -> Arc<StateNode> {
        match self.nodes.entry(base.id.key()) {
            Entry::Occupied(mut existing) => {
                let merged =
                    Arc::new(existing.get().with_merged_aspects(iam, policy, added));
                existing.insert(merged.clone());
                merged
            }
            Entry::Vacant(slot) => {
                let merged = Arc::new(base.with_merged_aspects(iam, policy, added));
                slot.insert(merged.clone());
                merged
            }
        }
    }

    /// Every cached node, in no particular order.
    pub fn snapshot(&self) -> Vec<Arc<StateNode>> {
        self.nodes.iter().map(|e| e.value().clone()).collect()
    }

    /// Canonical keys of every cached node.
    pub fn ids(&self) -> Vec<String> {
        self.nodes.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&self) {
        self.nodes.clear();
    }
}
