//! Data model for ScopeWalker: resource identifiers and type derivation,
//! the `StateNode` record, configuration, and the shared error type.
//!
//! This crate is pure data — no I/O, no async. The discovery engine lives
//! in `sw-discovery`.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod identifier;
pub mod node;

// Re-exports for convenience.
pub use config::{CacheMode, DiscoveryConfig, DiscoveryMode, Release, TraversalConfig};
pub use diagnostics::Diagnostic;
pub use error::{Error, Result};
pub use identifier::{ResourceId, ResourceType};
pub use node::{IamAspect, PolicyAspect, ResourceRef, StateNode};
