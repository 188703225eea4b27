//! Error types for the migration engine.
//!
//! Only failures that abort a whole call live here. Per-item failures are
//! recorded as [`crate::ItemStatus::Error`] results instead.

use thiserror::Error;

use ferry_admin::AdminError;

/// Errors that terminate a migration call early.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// The request itself is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// `ask` mode with items that have no per-item decision.
    #[error("conflict mode 'ask' needs a resolution for every item; missing: {}", ids.join(", "))]
    UnresolvedConflicts { ids: Vec<String> },

    /// Reading the source store failed.
    #[error("source store error: {0}")]
    Source(#[from] AdminError),

    /// Reading the target store failed under a fail-fast fetch policy.
    #[error("target store error: {0}")]
    Target(AdminError),

    /// Engine configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}
