//! Audit log errors.

/// Errors from an audit log backend.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// The backend could not be reached or refused the write.
    #[error("audit backend unavailable: {0}")]
    Unavailable(String),
    /// A payload could not be serialized for storage.
    #[error("audit record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
