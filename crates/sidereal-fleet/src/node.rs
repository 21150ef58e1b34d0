//! Node records.
//!
//! A [`FleetNode`] is the fleet's view of one worker: its identity, the
//! provisioning request it came from, its operational state and the backing
//! instance and channel used during teardown.
//!
//! # State
//!
//! The operational state lives in a single [`watch`] value. Readers take a
//! snapshot and never wait on I/O; writers compare and modify inside one
//! `send_if_modified` call, so "only act on change" checks cannot race.
//! Observers can [`subscribe`](FleetNode::subscribe) to every change.
//!
//! # Backing
//!
//! The backing instance and channel sit behind a per-node async mutex that is
//! only held for short, I/O-free sections. Teardown is serialised by a
//! separate per-node deletion lock, so a transport may detach its channel
//! from inside `close()` while deletions of the same node still run one at a
//! time and other nodes stay independent.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::debug;

use crate::cause::{OfflineCause, OperationalState};
use crate::channel::RemoteChannel;
use crate::error::{FleetError, FleetResult};
use crate::types::{InstanceId, NodeId, ProvisioningId};

/// Snapshot of a node's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeState {
    /// Current operational state.
    pub operational: OperationalState,
    /// Offline cause replaced when the node was flagged pending delete.
    pub superseded: Option<OfflineCause>,
    /// Time of the last change.
    pub changed_at: DateTime<Utc>,
}

impl NodeState {
    fn online() -> Self {
        Self {
            operational: OperationalState::Online,
            superseded: None,
            changed_at: Utc::now(),
        }
    }
}

/// Resources behind a live node.
#[derive(Debug, Clone)]
pub struct NodeBacking {
    /// Cloud instance running the node.
    pub instance_id: InstanceId,
    /// Remote channel, if the transport has one attached.
    pub channel: Option<Arc<dyn RemoteChannel>>,
}

/// Everything needed to build a node record.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    /// Node identity.
    pub id: NodeId,
    /// Backing cloud instance.
    pub instance_id: InstanceId,
    /// Provisioning request this node came from.
    pub provisioning_id: Option<ProvisioningId>,
    /// Channel already attached by the transport.
    pub channel: Option<Arc<dyn RemoteChannel>>,
}

/// A worker node in the fleet.
#[derive(Debug)]
pub struct FleetNode {
    id: NodeId,
    provisioning_id: ProvisioningId,
    state: watch::Sender<NodeState>,
    backing: Mutex<Option<NodeBacking>>,
    deletion: Mutex<()>,
}

impl FleetNode {
    /// Build a node record.
    ///
    /// Fails with [`FleetError::InvariantViolation`] when the identity,
    /// instance or provisioning ID is missing.
    pub fn new(descriptor: NodeDescriptor) -> FleetResult<Self> {
        if descriptor.id.as_str().is_empty() {
            return Err(FleetError::invariant("node identity is empty"));
        }

        if descriptor.instance_id.as_str().is_empty() {
            return Err(FleetError::invariant(format!(
                "node {} has no backing instance",
                descriptor.id
            )));
        }

        let provisioning_id = descriptor
            .provisioning_id
            .filter(|id| !id.as_str().is_empty())
            .ok_or_else(|| {
                FleetError::invariant(format!("node {} has no provisioning id", descriptor.id))
            })?;

        let (state, _) = watch::channel(NodeState::online());

        Ok(Self {
            id: descriptor.id,
            provisioning_id,
            state,
            backing: Mutex::new(Some(NodeBacking {
                instance_id: descriptor.instance_id,
                channel: descriptor.channel,
            })),
            deletion: Mutex::new(()),
        })
    }

    /// Build a node record for a freshly provisioned instance.
    pub fn provision(id: NodeId, instance_id: InstanceId) -> FleetResult<Self> {
        Self::new(NodeDescriptor {
            id,
            instance_id,
            provisioning_id: Some(ProvisioningId::generate()),
            channel: None,
        })
    }

    /// Node identity.
    #[must_use]
    pub const fn id(&self) -> &NodeId {
        &self.id
    }

    /// Provisioning correlation ID.
    #[must_use]
    pub const fn provisioning_id(&self) -> &ProvisioningId {
        &self.provisioning_id
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> NodeState {
        self.state.borrow().clone()
    }

    /// Current operational state.
    #[must_use]
    pub fn operational_state(&self) -> OperationalState {
        self.state.borrow().operational.clone()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<NodeState> {
        self.state.subscribe()
    }

    /// Returns true if the node is flagged for termination.
    #[must_use]
    pub fn is_pending_delete(&self) -> bool {
        self.state.borrow().operational.is_pending_termination()
    }

    /// Returns the offline cause if it is fatal.
    #[must_use]
    pub fn fatal_cause(&self) -> Option<OfflineCause> {
        self.state
            .borrow()
            .operational
            .cause()
            .and_then(OfflineCause::as_fatal)
            .cloned()
    }

    /// Returns true once the node has been removed from the fleet.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.state.borrow().operational.is_removed()
    }

    /// Returns the backing resources, or `None` once the node is gone.
    pub async fn current_node(&self) -> Option<NodeBacking> {
        self.backing.lock().await.clone()
    }

    /// Attach a channel opened by the transport.
    ///
    /// Returns false if the node is already gone.
    pub async fn attach_channel(&self, channel: Arc<dyn RemoteChannel>) -> bool {
        let mut backing = self.backing.lock().await;
        match backing.as_mut() {
            Some(backing) => {
                backing.channel = Some(channel);
                true
            }
            None => {
                debug!(node = %self.id, "ignoring channel for removed node");
                false
            }
        }
    }

    /// Detach the channel, returning it.
    pub async fn detach_channel(&self) -> Option<Arc<dyn RemoteChannel>> {
        self.backing
            .lock()
            .await
            .as_mut()
            .and_then(|backing| backing.channel.take())
    }

    /// Take the node offline for the given cause.
    ///
    /// A node pending termination stays pending; the cause is kept as the
    /// superseded cause instead. Returns true if anything changed.
    pub fn mark_offline(&self, cause: OfflineCause) -> bool {
        if cause.is_pending_termination() {
            debug!(node = %self.id, "pending termination is only set by the lifecycle controller");
            return false;
        }

        self.modify_state(|state| {
            if state.operational.is_removed() {
                return false;
            }

            if state.operational.is_pending_termination() {
                if state.superseded.as_ref() == Some(&cause) {
                    return false;
                }
                state.superseded = Some(cause);
                return true;
            }

            if state.operational.cause() == Some(&cause) {
                return false;
            }

            state.operational = OperationalState::Offline(cause);
            true
        })
    }

    /// Bring an offline node back online.
    ///
    /// A node pending termination stays pending, but forgets its superseded
    /// cause so that clearing the flag lands on Online. Has no effect on a
    /// removed node. Returns true if anything changed.
    pub fn mark_online(&self) -> bool {
        self.modify_state(|state| {
            if state.operational.is_pending_termination() {
                return state.superseded.take().is_some();
            }

            if state.operational.cause().is_none() {
                return false;
            }

            state.operational = OperationalState::Online;
            true
        })
    }

    /// Apply a change to the state if `f` reports one.
    ///
    /// Subscribers are only notified when `f` returns true.
    pub(crate) fn modify_state(&self, f: impl FnOnce(&mut NodeState) -> bool) -> bool {
        self.state.send_if_modified(|state| {
            let changed = f(state);
            if changed {
                state.changed_at = Utc::now();
            }
            changed
        })
    }

    /// Serialise teardown of this node.
    pub(crate) async fn lock_deletion(&self) -> MutexGuard<'_, ()> {
        self.deletion.lock().await
    }

    /// Drop `channel` from the backing if it is still the attached one.
    pub(crate) async fn release_channel(&self, channel: &Arc<dyn RemoteChannel>) {
        let mut backing = self.backing.lock().await;
        if let Some(backing) = backing.as_mut() {
            if backing
                .channel
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, channel))
            {
                backing.channel = None;
            }
        }
    }

    /// Detach the backing; the node is gone afterwards.
    pub(crate) async fn clear_backing(&self) {
        self.backing.lock().await.take();
    }

    /// Move the node into the terminal removed state.
    pub(crate) fn mark_removed(&self) {
        self.modify_state(|state| {
            if state.operational.is_removed() {
                return false;
            }
            state.operational = OperationalState::Removed;
            state.superseded = None;
            true
        });
    }
}
