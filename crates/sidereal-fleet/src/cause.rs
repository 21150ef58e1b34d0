//! Reasons a node is not accepting work.
//!
//! An offline node always carries an [`OfflineCause`]. Two classifications
//! cut across the causes:
//!
//! - **Pending termination**: the node has been flagged for teardown. This is
//!   the only way a node is considered "pending delete".
//! - **Fatal**: the node hit a condition it will not recover from (disk space
//!   exhausted, channel permanently terminated) and should be recycled rather
//!   than left offline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a node is offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum OfflineCause {
    /// The node has been flagged for termination.
    PendingTermination,
    /// A disk space monitor found the node below its threshold.
    DiskSpaceExhausted {
        /// Path that ran out of space.
        path: String,
        /// Free bytes observed when the node was taken offline.
        free_bytes: u64,
    },
    /// The remote channel was terminated and cannot be reused.
    ChannelTerminated {
        /// Reason reported by the transport.
        reason: String,
    },
    /// Any other, recoverable reason.
    Transient {
        /// Free-form description.
        reason: String,
    },
}

impl OfflineCause {
    /// Returns true for the pending termination marker.
    #[must_use]
    pub const fn is_pending_termination(&self) -> bool {
        matches!(self, Self::PendingTermination)
    }

    /// Returns the cause itself when it is severe enough for the node to be
    /// discarded.
    #[must_use]
    pub const fn as_fatal(&self) -> Option<&Self> {
        match self {
            Self::DiskSpaceExhausted { .. } | Self::ChannelTerminated { .. } => Some(self),
            Self::PendingTermination | Self::Transient { .. } => None,
        }
    }

    /// Returns true if the cause is fatal.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        self.as_fatal().is_some()
    }
}

impl fmt::Display for OfflineCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PendingTermination => write!(f, "pending termination"),
            Self::DiskSpaceExhausted { path, free_bytes } => {
                write!(f, "disk space exhausted on {path} ({free_bytes} bytes free)")
            }
            Self::ChannelTerminated { reason } => write!(f, "channel terminated: {reason}"),
            Self::Transient { reason } => write!(f, "{reason}"),
        }
    }
}

/// Operational state of a node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "cause", rename_all = "snake_case")]
pub enum OperationalState {
    /// Accepting work.
    #[default]
    Online,
    /// Not accepting work for the given reason.
    Offline(OfflineCause),
    /// Removed from the fleet. Terminal.
    Removed,
}

impl OperationalState {
    /// Returns the offline cause, if any.
    #[must_use]
    pub const fn cause(&self) -> Option<&OfflineCause> {
        match self {
            Self::Offline(cause) => Some(cause),
            Self::Online | Self::Removed => None,
        }
    }

    /// Returns true if the node is accepting work.
    #[must_use]
    pub const fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }

    /// Returns true once the node has been removed.
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        matches!(self, Self::Removed)
    }

    /// Returns true if the node is offline pending termination.
    #[must_use]
    pub const fn is_pending_termination(&self) -> bool {
        matches!(self, Self::Offline(OfflineCause::PendingTermination))
    }

    /// Returns the state name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline(_) => "offline",
            Self::Removed => "removed",
        }
    }
}
