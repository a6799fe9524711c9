//! Opportunistic `child → parent` edges harvested while listing
//! management-group descendants.
//!
//! Subscription parentage is otherwise only discoverable by scanning the
//! whole management-group hierarchy; a hint recorded during any descendants
//! listing turns that scan into an O(1) lookup.

use dashmap::DashMap;
use sw_domain::identifier::ResourceId;

#[derive(Default)]
pub struct ParentHintMap {
    /// Canonical child key → parent identifier.
    edges: DashMap<String, ResourceId>,
}

impl ParentHintMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, child: &ResourceId, parent: ResourceId) {
        self.edges.insert(child.key(), parent);
    }

    pub fn lookup(&self, child: &ResourceId) -> Option<ResourceId> {
        self.edges.get(&child.key()).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn clear(&self) {
        self.edges.clear();
    }
}
