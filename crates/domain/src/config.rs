use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Release channel, cache and discovery modes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// API-version release channel used when composing request URIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Release {
    /// Newest GA version (`YYYY-MM-DD`, no suffix). Falls back to `latest`
    /// for types publishing only preview versions.
    #[default]
    Stable,
    /// Newest published version, preview or not.
    Latest,
}

/// Whether a request may be served from the caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Serve cache hits; fetch and install on miss.
    #[default]
    UseCache,
    /// Bypass cache reads for this request. The fresh result is still
    /// written back, so later `UseCache` calls benefit.
    SkipCache,
}

/// Which optional aspects to discover alongside a node's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    #[default]
    ExcludeBoth,
    IncludeIam,
    IncludePolicy,
    IncludeBoth,
}

impl DiscoveryMode {
    pub fn from_parts(iam: bool, policy: bool) -> Self {
        match (iam, policy) {
            (false, false) => Self::ExcludeBoth,
            (true, false) => Self::IncludeIam,
            (false, true) => Self::IncludePolicy,
            (true, true) => Self::IncludeBoth,
        }
    }

    pub fn includes_iam(self) -> bool {
        matches!(self, Self::IncludeIam | Self::IncludeBoth)
    }

    pub fn includes_policy(self) -> bool {
        matches!(self, Self::IncludePolicy | Self::IncludeBoth)
    }

    pub fn is_exclude_both(self) -> bool {
        self == Self::ExcludeBoth
    }

    /// The aspect union of two modes.
    pub fn union(self, other: Self) -> Self {
        Self::from_parts(
            self.includes_iam() || other.includes_iam(),
            self.includes_policy() || other.includes_policy(),
        )
    }

    /// Aspects requested by `self` that `have` does not already carry.
    pub fn missing_from(self, have: Self) -> Self {
        Self::from_parts(
            self.includes_iam() && !have.includes_iam(),
            self.includes_policy() && !have.includes_policy(),
        )
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Engine configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Tunables for the discovery engine itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Bulk fan-out: `0` = direct materialization from list payloads,
    /// `1` = serial, `>1` = that many concurrent workers.
    #[serde(default = "d_throttle_limit")]
    pub throttle_limit: usize,
    #[serde(default)]
    pub release: Release,
    #[serde(default)]
    pub cache_mode: CacheMode,
    #[serde(default)]
    pub discovery_mode: DiscoveryMode,
    /// Identifiers pruned from traversal (exact match, case-insensitive).
    #[serde(default)]
    pub exclude_path_ids: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            throttle_limit: d_throttle_limit(),
            release: Release::default(),
            cache_mode: CacheMode::default(),
            discovery_mode: DiscoveryMode::default(),
            exclude_path_ids: Vec::new(),
        }
    }
}

fn d_throttle_limit() -> usize {
    4
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Traversal plan
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The driver's inclusion plan: which resource classes a recursive
/// traversal descends into, and which aspects it fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalConfig {
    /// When false, only the root node is built.
    #[serde(default = "d_true")]
    pub recurse: bool,
    #[serde(default = "d_true")]
    pub include_management_groups: bool,
    #[serde(default = "d_true")]
    pub include_subscriptions: bool,
    #[serde(default)]
    pub include_resource_groups: bool,
    /// Provider resources under resource groups. Unknown provider types
    /// count as resources for inclusion purposes.
    #[serde(default)]
    pub include_resources: bool,
    #[serde(default)]
    pub include_iam: bool,
    #[serde(default)]
    pub include_policy: bool,
    /// Identifiers pruned from traversal (exact match, case-insensitive).
    #[serde(default)]
    pub exclude_path_ids: Vec<String>,
}

impl TraversalConfig {
    /// The aspect mode this plan implies.
    pub fn discovery_mode(&self) -> DiscoveryMode {
        DiscoveryMode::from_parts(self.include_iam, self.include_policy)
    }
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            recurse: true,
            include_management_groups: true,
            include_subscriptions: true,
            include_resource_groups: false,
            include_resources: false,
            include_iam: false,
            include_policy: false,
            exclude_path_ids: Vec::new(),
        }
    }
}

fn d_true() -> bool {
    true
}
