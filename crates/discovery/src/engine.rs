//! The shared context every discovery operation runs against.
//!
//! `DiscoveryEngine` is cheap to clone: all shared state (the API-version
//! registry, both caches, the parent hint map) sits behind `Arc`s, so bulk
//! workers clone the engine into their tasks and observe the same caches.

use std::sync::Arc;

use sw_domain::config::DiscoveryConfig;
use sw_domain::node::StateNode;

use crate::api_versions::ApiVersionRegistry;
use crate::cancel::CancelToken;
use crate::hints::ParentHintMap;
use crate::response_cache::RawResponseCache;
use crate::router::RequestRouter;
use crate::state_cache::StateCache;
use crate::transport::ResourceTransport;

#[derive(Clone)]
pub struct DiscoveryEngine {
    pub(crate) router: RequestRouter,
    pub(crate) versions: Arc<ApiVersionRegistry>,
    pub(crate) responses: Arc<RawResponseCache>,
    pub(crate) nodes: Arc<StateCache>,
    pub(crate) hints: Arc<ParentHintMap>,
    pub(crate) config: Arc<DiscoveryConfig>,
    pub(crate) cancel: CancelToken,
}

impl DiscoveryEngine {
    pub fn new(transport: Arc<dyn ResourceTransport>, config: DiscoveryConfig) -> Self {
        let versions = Arc::new(ApiVersionRegistry::new(transport.clone()));
        let responses = Arc::new(RawResponseCache::new());
        let router = RequestRouter::new(
            transport,
            versions.clone(),
            responses.clone(),
            config.release,
        );
        Self {
            router,
            versions,
            responses,
            nodes: Arc::new(StateCache::new()),
            hints: Arc::new(ParentHintMap::new()),
            config: Arc::new(config),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_defaults(transport: Arc<dyn ResourceTransport>) -> Self {
        Self::new(transport, DiscoveryConfig::default())
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn state_cache(&self) -> &StateCache {
        &self.nodes
    }

    pub fn response_cache(&self) -> &RawResponseCache {
        &self.responses
    }

    pub fn version_registry(&self) -> &ApiVersionRegistry {
        &self.versions
    }

    pub fn parent_hints(&self) -> &ParentHintMap {
        &self.hints
    }

    /// Token shared with every worker this engine dispatches.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Every node currently cached, in no particular order.
    pub fn cached_nodes(&self) -> Vec<Arc<StateNode>> {
        self.nodes.snapshot()
    }

    /// Start a fresh cache generation: state, responses, hints, and the
    /// version registry all clear. Nodes handed out earlier stay valid for
    /// whoever holds them.
    pub fn reset_caches(&self) {
        self.nodes.clear();
        self.responses.clear();
        self.hints.clear();
        self.versions.reset();
    }
}
