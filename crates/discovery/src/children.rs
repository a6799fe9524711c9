//! Children listing, dispatched by resource type.
//!
//! Management groups return their full transitive subtree in one
//! `/descendants` call; the listing is partitioned into direct children and
//! linked resources, and every `child → parent` edge it mentions is recorded
//! in the parent hint map on the way past.

use serde_json::Value;
use sw_domain::config::CacheMode;
use sw_domain::error::Result;
use sw_domain::identifier::{ResourceId, ResourceType};
use sw_domain::node::ResourceRef;

use crate::engine::DiscoveryEngine;
use crate::policy::{policy_for, ChildrenStrategy};

#[derive(Debug, Default)]
pub(crate) struct ChildListing {
    pub children: Vec<ResourceRef>,
    pub linked: Vec<ResourceRef>,
}

/// Build a typed reference from a listing item. The type derived from the
/// id is authoritative; the payload `type` is only a fallback for ids the
/// derivation rules don't cover.
pub(crate) fn resource_ref_from(item: &Value) -> Option<ResourceRef> {
    let id = item.get("id").and_then(Value::as_str)?;
    let resource_type = ResourceType::derive(id).ok().or_else(|| {
        item.get("type")
            .and_then(Value::as_str)
            .map(ResourceType::from)
    })?;
    Some(ResourceRef::new(id, resource_type))
}

impl DiscoveryEngine {
    pub(crate) async fn list_children(
        &self,
        id: &ResourceId,
        resource_type: &ResourceType,
    ) -> Result<ChildListing> {
        match policy_for(resource_type).children {
            ChildrenStrategy::Descendants => self.list_descendants(id).await,
            ChildrenStrategy::ResourceGroups => self.list_collection(id, "/resourceGroups").await,
            ChildrenStrategy::Resources => self.list_collection(id, "/resources").await,
            ChildrenStrategy::NoListing => Ok(ChildListing::default()),
        }
    }

    async fn list_descendants(&self, id: &ResourceId) -> Result<ChildListing> {
        let path = format!("{}/descendants", id.path());
        let payload = self.router.get(&path, CacheMode::UseCache).await?;

        let mut listing = ChildListing::default();
        for item in payload.into_items() {
            let Some(child) = resource_ref_from(&item) else {
                continue;
            };
            let parent_id = item
                .pointer("/properties/parent/id")
                .and_then(Value::as_str);
            if let Some(pid) = parent_id {
                self.hints.record(&child.id, ResourceId::from(pid));
            }
            let direct = parent_id
                .map(|pid| pid.eq_ignore_ascii_case(id.as_str()))
                .unwrap_or(false);
            if direct {
                listing.children.push(child);
            } else {
                listing.linked.push(child);
            }
        }
        Ok(listing)
    }

    async fn list_collection(&self, id: &ResourceId, suffix: &str) -> Result<ChildListing> {
        let path = format!("{}{suffix}", id.path());
        let payload = self.router.get(&path, CacheMode::UseCache).await?;
        let children = payload
            .into_items()
            .iter()
            .filter_map(resource_ref_from)
            .collect();
        Ok(ChildListing {
            children,
            linked: Vec::new(),
        })
    }
}
