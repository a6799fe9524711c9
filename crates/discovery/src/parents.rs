//! Type-specific parent resolution and the ancestor chain walk.
//!
//! Different resource classes locate their parent through different
//! sources: management groups carry it in their own payload, subscriptions
//! need the hint map (or, failing that, a scan of the management-group
//! hierarchy), resource groups and provider resources derive it from their
//! identifier alone.

use serde_json::Value;
use sw_domain::config::CacheMode;
use sw_domain::diagnostics::Diagnostic;
use sw_domain::error::{Error, Result};
use sw_domain::identifier::{
    subscription_prefix, trim_provider_suffix, ResourceId, ResourceType, MANAGEMENT_GROUP_SCOPE,
    MANAGEMENT_GROUP_TYPE, SUBSCRIPTION_TYPE,
};
use sw_domain::node::ResourceRef;

use crate::engine::DiscoveryEngine;
use crate::policy::{policy_for, ParentStrategy};
use crate::response_cache::Payload;

/// A parent chain deeper than this is assumed cyclic.
pub(crate) const MAX_PARENT_DEPTH: usize = 32;

/// Classify a failed parent lookup: permission failures become
/// `ParentLookupDenied`, everything else passes through.
pub(crate) fn classify_parent_failure(id: &ResourceId, error: Error) -> Error {
    match error {
        Error::ApiCallFailed {
            status: 401 | 403, ..
        } => Error::ParentLookupDenied(id.to_string()),
        other => other,
    }
}

impl DiscoveryEngine {
    /// Locate the immediate parent of `id`. `raw` is the node's own
    /// payload; only the payload-details strategy reads it.
    pub(crate) async fn resolve_parent(
        &self,
        id: &ResourceId,
        resource_type: &ResourceType,
        raw: &Value,
    ) -> Result<Option<ResourceRef>> {
        match policy_for(resource_type).parent {
            ParentStrategy::PayloadDetails => Ok(raw
                .pointer("/properties/details/parent/id")
                .and_then(Value::as_str)
                .map(|pid| ResourceRef::new(pid, MANAGEMENT_GROUP_TYPE))),
            ParentStrategy::HintOrScan => self.subscription_parent(id).await,
            ParentStrategy::SubscriptionPrefix => Ok(subscription_prefix(id.as_str())
                .map(|prefix| ResourceRef::new(prefix, SUBSCRIPTION_TYPE))),
            ParentStrategy::TrimProviderSuffix => match trim_provider_suffix(id.as_str()) {
                Some(scope) => Ok(Some(ResourceRef::from_id(scope)?)),
                None => Ok(None),
            },
        }
    }

    /// Hint-map lookup with the expensive fallback: walk every management
    /// group's descendants, recording hints as they stream past, until the
    /// map can answer. One scan normally answers all later lookups.
    async fn subscription_parent(&self, id: &ResourceId) -> Result<Option<ResourceRef>> {
        if let Some(parent) = self.hints.lookup(id) {
            return Ok(Some(ResourceRef::new(parent, MANAGEMENT_GROUP_TYPE)));
        }

        tracing::debug!(id = %id, "no parent hint recorded; scanning management groups");
        let groups = self
            .router
            .get(MANAGEMENT_GROUP_SCOPE, CacheMode::UseCache)
            .await?;
        for group in groups.into_items() {
            let Some(gid) = group.get("id").and_then(Value::as_str) else {
                continue;
            };
            let path = format!("{gid}/descendants");
            let payload = match self.router.get(&path, CacheMode::UseCache).await {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(group = gid, error = %e, "descendants listing failed during parent scan");
                    continue;
                }
            };
            for item in payload.into_items() {
                let Some(cid) = item.get("id").and_then(Value::as_str) else {
                    continue;
                };
                if let Some(pid) = item.pointer("/properties/parent/id").and_then(Value::as_str) {
                    self.hints.record(&ResourceId::from(cid), ResourceId::from(pid));
                }
            }
            if let Some(parent) = self.hints.lookup(id) {
                return Ok(Some(ResourceRef::new(parent, MANAGEMENT_GROUP_TYPE)));
            }
        }
        Ok(None)
    }

    /// Walk resolved parents upward from `immediate` until a root. Returns
    /// the chain root-first plus diagnostics for lookups that had to be
    /// abandoned; exceeding [`MAX_PARENT_DEPTH`] is fatal for the node.
    pub(crate) async fn resolve_ancestor_chain(
        &self,
        id: &ResourceId,
        immediate: Option<ResourceRef>,
    ) -> Result<(Vec<ResourceRef>, Vec<Diagnostic>)> {
        let mut chain: Vec<ResourceRef> = Vec::new();
        let mut diagnostics = Vec::new();
        let mut current = immediate;

        while let Some(parent) = current {
            chain.push(parent.clone());
            if chain.len() > MAX_PARENT_DEPTH {
                return Err(Error::CycleDetected {
                    id: id.to_string(),
                    depth: chain.len(),
                });
            }
            current = match self.parent_of_ancestor(&parent).await {
                Ok(next) => next,
                Err(e) => {
                    // Insufficient permission on an ancestor is survivable;
                    // the chain just stops where visibility ends.
                    let e = classify_parent_failure(&parent.id, e);
                    tracing::warn!(id = %parent.id, error = %e, "ancestor lookup failed; treating as root");
                    diagnostics.push(Diagnostic::new(
                        parent.id.to_string(),
                        "parent",
                        e.to_string(),
                    ));
                    None
                }
            };
        }

        chain.reverse();
        Ok((chain, diagnostics))
    }

    /// Parent of an ancestor link. Fetches the ancestor's body only when
    /// its type stores parentage in the payload.
    async fn parent_of_ancestor(&self, ancestor: &ResourceRef) -> Result<Option<ResourceRef>> {
        match policy_for(&ancestor.resource_type).parent {
            ParentStrategy::PayloadDetails => {
                let payload = self
                    .router
                    .get(ancestor.id.as_str(), CacheMode::UseCache)
                    .await?;
                match payload {
                    Payload::One(raw) => {
                        self.resolve_parent(&ancestor.id, &ancestor.resource_type, &raw)
                            .await
                    }
                    Payload::Many(_) => {
                        Err(Error::AmbiguousIdentifier(ancestor.id.to_string()))
                    }
                }
            }
            _ => {
                self.resolve_parent(&ancestor.id, &ancestor.resource_type, &Value::Null)
                    .await
            }
        }
    }
}
