//! Node lifecycle controller.
//!
//! Flags and unflags nodes for deletion, exposes fatal offline causes to
//! sweepers, and runs the teardown protocol:
//!
//! ```text
//!                  mark_offline
//! Online ◀─────────────────────────────▶ Offline(cause)
//!   │  ▲           mark_online              │   ▲
//!   │  │ pending(false),                    │   │ pending(false),
//!   │  │ no superseded cause                │   │ superseded cause restored
//!   │  │                       pending(true)│   │
//!   │  └────────┐   ┌───────────────────────┘   │
//!   │           │   ▼                           │
//!   └──────▶ Offline(PendingTermination) ───────┘
//! pending(true)          │
//!                        │ delete ok (failure: unchanged, retryable)
//!                        ▼
//!                     Removed
//! ```
//!
//! Teardown closes the channel, terminates the backing instance and removes
//! the registry entry, in that order. A channel the transport already closed
//! is only detached. Any failure aborts the remaining steps and leaves the
//! node registered and pending delete.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, warn};

use crate::cause::{OfflineCause, OperationalState};
use crate::error::{FleetError, FleetResult};
use crate::node::{FleetNode, NodeBacking};
use crate::provider::CloudProvider;
use crate::registry::FleetRegistry;

/// Drives state transitions and teardown for fleet nodes.
pub struct LifecycleController {
    provider: Arc<dyn CloudProvider>,
    registry: Arc<dyn FleetRegistry>,
}

impl LifecycleController {
    /// Create a new controller.
    pub fn new(provider: Arc<dyn CloudProvider>, registry: Arc<dyn FleetRegistry>) -> Self {
        Self { provider, registry }
    }

    /// The registry this controller removes nodes from.
    #[must_use]
    pub fn registry(&self) -> &Arc<dyn FleetRegistry> {
        &self.registry
    }

    /// Flag or unflag a node for asynchronous deletion.
    ///
    /// Does nothing when the flag already has the requested value or the
    /// node is removed. Flagging keeps any previous offline cause as the
    /// superseded cause; unflagging restores it, or brings the node online if
    /// there was none. Returns true if the state changed.
    pub fn set_pending_delete(&self, node: &FleetNode, new_value: bool) -> bool {
        let changed = node.modify_state(|state| {
            if state.operational.is_removed()
                || state.operational.is_pending_termination() == new_value
            {
                return false;
            }

            if new_value {
                let previous = std::mem::replace(
                    &mut state.operational,
                    OperationalState::Offline(OfflineCause::PendingTermination),
                );
                state.superseded = match previous {
                    OperationalState::Offline(cause) => Some(cause),
                    OperationalState::Online | OperationalState::Removed => None,
                };
            } else {
                state.operational = state
                    .superseded
                    .take()
                    .map_or(OperationalState::Online, OperationalState::Offline);
            }

            true
        });

        if changed {
            info!(
                node = %node.id(),
                pending_delete = new_value,
                "setting pending delete status"
            );
        }

        changed
    }

    /// Is the node pending termination.
    #[must_use]
    pub fn is_pending_delete(&self, node: &FleetNode) -> bool {
        node.is_pending_delete()
    }

    /// Get the node's offline cause provided it is severe enough for the node
    /// to be discarded.
    #[must_use]
    pub fn fatal_cause(&self, node: &FleetNode) -> Option<OfflineCause> {
        node.fatal_cause()
    }

    /// Delete the node and terminate its instance.
    ///
    /// Succeeds without side effects if the node is already gone. Concurrent
    /// calls for the same node run one after another.
    pub async fn delete_node(&self, node: &FleetNode) -> FleetResult<()> {
        info!(node = %node.id(), "deleting node");

        let _deletion = node.lock_deletion().await;

        let Some(current) = node.current_node().await else {
            info!(node = %node.id(), "skipping, node is gone already");
            counter!("platform.fleet.deletions", "outcome" => "already_gone").increment(1);
            return Ok(());
        };

        if let Err(error) = self.teardown(node, current).await {
            warn!(node = %node.id(), error = %error, "node deletion failed");
            counter!(
                "platform.fleet.deletions",
                "outcome" => "failed",
                "error_type" => error.kind()
            )
            .increment(1);
            return Err(error);
        }

        node.clear_backing().await;
        node.mark_removed();

        counter!("platform.fleet.deletions", "outcome" => "deleted").increment(1);
        info!(node = %node.id(), "deleted node");
        Ok(())
    }

    // Runs without the backing lock held, so the transport may detach the
    // channel while it closes.
    async fn teardown(&self, node: &FleetNode, current: NodeBacking) -> FleetResult<()> {
        if let Some(channel) = current.channel {
            if channel.is_open() {
                debug!(node = %node.id(), "closing channel");
                channel.close().await.map_err(|source| FleetError::Channel {
                    node: node.id().clone(),
                    source,
                })?;
            } else {
                debug!(node = %node.id(), "channel already closed");
            }
            node.release_channel(&channel).await;
        }

        self.provider.terminate_instance(&current.instance_id).await?;
        self.registry.remove_node(node.id()).await?;
        Ok(())
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController").finish_non_exhaustive()
    }
}
