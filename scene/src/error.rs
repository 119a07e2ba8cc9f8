//! Error taxonomy for scene operations.
//!
//! Each variant maps to one user-facing behavior: validation and precondition
//! failures refuse the action before anything is mutated, persistence
//! failures become a transient notice with local state left as-is, and
//! stream delivery failures are logged and dropped.

/// Errors produced by the scene core and its adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// Required user input was empty or invalid (e.g. a blank scene name).
    #[error("{0}")]
    Validation(String),
    /// A store operation failed; surfaced as a notice, never rolled back.
    #[error("persistence failed: {0}")]
    Persistence(String),
    /// An event payload from a notification stream was malformed.
    #[error("malformed stream payload: {0}")]
    StreamDelivery(String),
    /// The action needs something that is not there, such as an active session.
    #[error("precondition failed: {0}")]
    Precondition(String),
}

impl SceneError {
    /// Stable machine-readable code for logs and notices.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "E_VALIDATION",
            Self::Persistence(_) => "E_PERSISTENCE",
            Self::StreamDelivery(_) => "E_STREAM",
            Self::Precondition(_) => "E_PRECONDITION",
        }
    }

    pub(crate) fn no_session() -> Self {
        Self::Precondition("no active session".into())
    }
}
