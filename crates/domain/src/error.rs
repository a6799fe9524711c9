/// Shared error type used across all ScopeWalker crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// The provider listing used to bootstrap API-version resolution came
    /// back empty. Fatal at first use; nothing downstream can compose a
    /// request URI without it.
    #[error("provider discovery returned no providers")]
    ProviderDiscoveryFailed,

    /// The identifier matched none of the type-derivation rules.
    #[error("cannot derive a resource type from '{0}'")]
    UnknownResourceType(String),

    /// The provider listing published no API version for this type.
    #[error("no API version published for '{0}'")]
    UnknownApiVersion(String),

    /// Non-200 response from the resource-management API.
    #[error("API call failed ({status}) {code}: {message}")]
    ApiCallFailed {
        status: u16,
        code: String,
        message: String,
    },

    /// A collection came back where a single record was expected; the
    /// caller must narrow the identifier.
    #[error("'{0}' names a collection, not a single resource")]
    AmbiguousIdentifier(String),

    /// Parent fetch failed with insufficient permissions. Recovered
    /// locally: the node keeps a null parent.
    #[error("parent lookup denied for '{0}'")]
    ParentLookupDenied(String),

    #[error("parent chain for '{id}' exceeded depth {depth}")]
    CycleDetected { id: String, depth: usize },

    #[error("cancelled")]
    Cancelled,

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
