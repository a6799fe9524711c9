//! Discovery and caching engine for a cloud tenant's resource tree.
//!
//! Given a root identifier, the engine walks its descendants, dynamically
//! resolving the right API version per resource type, deduplicating work
//! through two interlocking caches (resolved nodes by identifier, raw
//! responses by request URI), fanning per-identifier fetches across a
//! bounded worker pool, and reconstructing parent chains from whichever
//! relationship source each resource class provides.
//!
//! The entry point is [`DiscoveryEngine`]; the data model lives in
//! `sw-domain`.

pub mod api_versions;
pub mod cancel;
pub mod engine;
pub mod hints;
pub mod policy;
pub mod response_cache;
pub mod router;
pub mod state_cache;
pub mod transport;

mod builder;
mod bulk;
mod children;
mod driver;
mod parents;

// Re-exports for convenience.
pub use api_versions::ApiVersionRegistry;
pub use bulk::BulkResult;
pub use cancel::CancelToken;
pub use engine::DiscoveryEngine;
pub use response_cache::{Payload, RawResponseCache};
pub use router::RequestRouter;
pub use state_cache::StateCache;
pub use transport::{HttpMethod, HttpTransport, RawResponse, ResourceTransport};
