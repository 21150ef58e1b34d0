//! Error types for sidereal-fleet.

use crate::auth::Capability;
use crate::types::NodeId;

/// Result type alias using [`FleetError`].
pub type FleetResult<T> = Result<T, FleetError>;

/// Errors that can occur while managing node lifecycles.
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    /// A node record was built without a required field.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The caller lacks the capability required for the operation.
    #[error("permission denied: {principal} lacks {capability}")]
    PermissionDenied {
        /// Principal that attempted the operation.
        principal: String,
        /// Capability that was required.
        capability: Capability,
    },

    /// Closing the remote channel failed.
    #[error("failed to close channel of {node}: {source}")]
    Channel {
        /// Node whose channel could not be closed.
        node: NodeId,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Cloud provider error.
    #[error("provider error: {0}")]
    Provider(String),

    /// Fleet registry error.
    #[error("registry error: {0}")]
    Registry(String),

    /// Node not found in the registry.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// Deletion failed and the pending-delete flag was cleared again.
    #[error("deletion of {node} failed and was rolled back: {source}")]
    DeletionRolledBack {
        /// Node that could not be deleted.
        node: NodeId,
        /// Failure raised by the deletion attempt.
        #[source]
        source: Box<FleetError>,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FleetError {
    /// Create an invariant violation error.
    #[must_use]
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Create a provider error.
    #[must_use]
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a registry error.
    #[must_use]
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short label used for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvariantViolation(_) => "invariant_violation",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::Channel { .. } => "channel",
            Self::Provider(_) => "provider",
            Self::Registry(_) => "registry",
            Self::NodeNotFound(_) => "node_not_found",
            Self::DeletionRolledBack { .. } => "rolled_back",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}
