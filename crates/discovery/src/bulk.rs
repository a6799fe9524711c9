//! Fan a list of identifiers across a bounded worker pool.
//!
//! Worker failures never abort siblings; the result is a best-effort union
//! with every recovered failure reported as a diagnostic. Ordering of the
//! result set is unspecified — callers needing determinism sort by id.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use sw_domain::config::{CacheMode, DiscoveryMode};
use sw_domain::diagnostics::Diagnostic;
use sw_domain::error::{Error, Result};
use sw_domain::identifier::ResourceId;
use sw_domain::node::StateNode;
use tokio::sync::Semaphore;

use crate::engine::DiscoveryEngine;
use crate::response_cache::Payload;

/// The union of nodes a bulk operation produced, plus every per-identifier
/// failure it recovered from along the way.
#[derive(Default)]
pub struct BulkResult {
    pub nodes: Vec<Arc<StateNode>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl BulkResult {
    /// Canonical keys of the produced nodes, sorted — the deterministic
    /// view for callers comparing runs.
    pub fn sorted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.nodes.iter().map(|n| n.id.key()).collect();
        ids.sort();
        ids
    }

    fn record_failure(&mut self, id: &ResourceId, error: &Error) {
        tracing::warn!(id = %id, error = %error, "bulk build failed");
        self.diagnostics
            .push(Diagnostic::new(id.to_string(), "build", error.to_string()));
    }
}

impl DiscoveryEngine {
    /// Build nodes for every distinct identifier in `ids`.
    ///
    /// `throttle_limit` selects the mode: `0` materializes directly from
    /// previously obtained payloads (no per-id re-fetch), `1` runs serially,
    /// `>1` runs that many concurrent workers. A call that collapses to a
    /// single id after dedup demotes to serial.
    pub async fn from_ids(
        &self,
        ids: Vec<ResourceId>,
        throttle_limit: usize,
        cache_mode: CacheMode,
        discovery_mode: DiscoveryMode,
    ) -> BulkResult {
        let mut seen = HashSet::new();
        let unique: Vec<ResourceId> = ids
            .into_iter()
            .filter(|id| !id.is_empty())
            .filter(|id| seen.insert(id.key()))
            .collect();

        let mut result = BulkResult::default();
        if unique.is_empty() {
            return result;
        }

        let effective = if unique.len() == 1 {
            throttle_limit.min(1)
        } else {
            throttle_limit
        };

        match effective {
            0 => {
                for id in unique {
                    if self.cancel.is_cancelled() {
                        result.record_failure(&id, &Error::Cancelled);
                        continue;
                    }
                    match self.materialize_direct(id.clone(), discovery_mode).await {
                        Ok((node, diagnostics)) => {
                            result.nodes.push(node);
                            result.diagnostics.extend(diagnostics);
                        }
                        Err(e) => result.record_failure(&id, &e),
                    }
                }
            }
            1 => {
                for id in unique {
                    if self.cancel.is_cancelled() {
                        result.record_failure(&id, &Error::Cancelled);
                        continue;
                    }
                    match self
                        .build_traced(id.clone(), cache_mode, discovery_mode)
                        .await
                    {
                        Ok((node, diagnostics)) => {
                            result.nodes.push(node);
                            result.diagnostics.extend(diagnostics);
                        }
                        Err(e) => result.record_failure(&id, &e),
                    }
                }
            }
            limit => {
                let semaphore = Arc::new(Semaphore::new(limit));
                let mut handles = Vec::with_capacity(unique.len());
                for id in unique {
                    if self.cancel.is_cancelled() {
                        result.record_failure(&id, &Error::Cancelled);
                        continue;
                    }
                    let engine = self.clone();
                    let semaphore = semaphore.clone();
                    handles.push(tokio::spawn(async move {
                        let _permit = match semaphore.acquire().await {
                            Ok(permit) => permit,
                            Err(_) => return (id, Err(Error::Cancelled)),
                        };
                        if engine.cancel.is_cancelled() {
                            return (id, Err(Error::Cancelled));
                        }
                        let outcome = engine
                            .build_traced(id.clone(), cache_mode, discovery_mode)
                            .await;
                        (id, outcome)
                    }));
                }
                for handle in handles {
                    match handle.await {
                        Ok((_, Ok((node, diagnostics)))) => {
                            result.nodes.push(node);
                            result.diagnostics.extend(diagnostics);
                        }
                        Ok((id, Err(e))) => result.record_failure(&id, &e),
                        Err(join_error) => {
                            result.diagnostics.push(Diagnostic::new(
                                String::new(),
                                "worker",
                                join_error.to_string(),
                            ));
                        }
                    }
                }
            }
        }
        result
    }

    /// List a collection scope and materialize a node from each returned
    /// body directly — no per-item singleton fetch.
    pub async fn from_scope(
        &self,
        scope: impl Into<ResourceId>,
        discovery_mode: DiscoveryMode,
    ) -> Result<BulkResult> {
        let scope = scope.into();
        let payload = self.router.get(scope.as_str(), self.config.cache_mode).await?;

        let mut result = BulkResult::default();
        for item in payload.into_items() {
            let Some(item_id) = item.get("id").and_then(Value::as_str) else {
                continue;
            };
            let id = ResourceId::from(item_id);
            match self
                .build_from_raw(id.clone(), item, CacheMode::UseCache, discovery_mode)
                .await
            {
                Ok((node, diagnostics)) => {
                    result.nodes.push(node);
                    result.diagnostics.extend(diagnostics);
                }
                Err(e) => result.record_failure(&id, &e),
            }
        }
        Ok(result)
    }

    /// Direct materialization for one id: the state cache first, then a
    /// body some earlier listing left in the response cache, then (last
    /// resort) a cached build.
    async fn materialize_direct(
        &self,
        id: ResourceId,
        discovery_mode: DiscoveryMode,
    ) -> Result<(Arc<StateNode>, Vec<Diagnostic>)> {
        if self.nodes.contains(&id) {
            return self
                .build_traced(id, CacheMode::UseCache, discovery_mode)
                .await;
        }
        if let Ok(uri) = self.router.compose(id.as_str()).await {
            if let Some(hit) = self.responses.get(&uri.to_ascii_lowercase()) {
                if let Payload::One(raw) = hit.payload {
                    return self
                        .build_from_raw(id, raw, CacheMode::UseCache, discovery_mode)
                        .await;
                }
            }
        }
        self.build_traced(id, CacheMode::UseCache, discovery_mode)
            .await
    }
}
