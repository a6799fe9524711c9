use chrono::{DateTime, Utc};
use serde::Serialize;

/// One recovered failure surfaced alongside discovery results.
///
/// Bulk operations never abort sibling work on a per-identifier error;
/// instead the error is recorded here and the result set stays a
/// best-effort union.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// The identifier the failure belongs to.
    pub id: String,
    /// What was being attempted (e.g. `build`, `roleAssignments`).
    pub operation: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Diagnostic {
    pub fn new(
        id: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            operation: operation.into(),
            message: message.into(),
            at: Utc::now(),
        }
    }
}
