//! Operator-facing deletion entry points.
//!
//! [`DeleteTrigger::delete`] deletes a node right away and rolls the
//! pending-delete flag back if that fails, so a failed attempt never leaves a
//! node offline with nothing left to delete it. [`DeleteTrigger::schedule_termination`]
//! only flags the node; the sweeper collects it later.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::{Authorizer, Capability, Principal};
use crate::error::{FleetError, FleetResult};
use crate::lifecycle::LifecycleController;
use crate::node::FleetNode;
use crate::types::{NodeId, ProvisioningId};

/// Removes a node from the fleet.
#[async_trait]
pub trait ComputerRemover: Send + Sync {
    /// Remove the node, tearing down everything behind it.
    async fn remove_computer(&self, node: &FleetNode) -> FleetResult<()>;
}

#[async_trait]
impl ComputerRemover for LifecycleController {
    async fn remove_computer(&self, node: &FleetNode) -> FleetResult<()> {
        self.delete_node(node).await
    }
}

/// Acknowledgement returned when a termination has been scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminationAck {
    /// Node that was flagged.
    pub node: NodeId,
    /// Provisioning request the node came from.
    pub provisioning_id: ProvisioningId,
    /// False if the node was already pending delete.
    pub newly_scheduled: bool,
}

/// Entry point for operator and automation deletion requests.
pub struct DeleteTrigger {
    controller: Arc<LifecycleController>,
    remover: Arc<dyn ComputerRemover>,
    authorizer: Arc<dyn Authorizer>,
}

impl DeleteTrigger {
    /// Create a trigger that removes nodes through the controller's teardown.
    pub fn new(controller: Arc<LifecycleController>, authorizer: Arc<dyn Authorizer>) -> Self {
        let remover: Arc<dyn ComputerRemover> = controller.clone();
        Self {
            controller,
            remover,
            authorizer,
        }
    }

    /// Replace the remover.
    #[must_use]
    pub fn with_remover(mut self, remover: Arc<dyn ComputerRemover>) -> Self {
        self.remover = remover;
        self
    }

    /// Delete a node now.
    ///
    /// The node is flagged pending delete before removal starts. If removal
    /// fails the flag is cleared again and the failure is returned as
    /// [`FleetError::DeletionRolledBack`].
    pub async fn delete(&self, node: &FleetNode, principal: &Principal) -> FleetResult<()> {
        self.authorizer
            .check_permission(principal, Capability::Delete)?;

        info!(node = %node.id(), principal = %principal, "deletion requested");
        self.controller.set_pending_delete(node, true);

        match self.remover.remove_computer(node).await {
            Ok(()) => Ok(()),
            Err(error) => {
                warn!(node = %node.id(), error = %error, "deletion failed, rolling back");
                self.controller.set_pending_delete(node, false);
                counter!("platform.fleet.deletion_rollbacks").increment(1);
                Err(FleetError::DeletionRolledBack {
                    node: node.id().clone(),
                    source: Box::new(error),
                })
            }
        }
    }

    /// Flag a node for termination by the sweeper.
    pub fn schedule_termination(
        &self,
        node: &FleetNode,
        principal: &Principal,
    ) -> FleetResult<TerminationAck> {
        self.authorizer
            .check_permission(principal, Capability::Disconnect)?;

        if node.is_removed() {
            return Err(FleetError::NodeNotFound(node.id().to_string()));
        }

        let newly_scheduled = self.controller.set_pending_delete(node, true);
        info!(
            node = %node.id(),
            principal = %principal,
            newly_scheduled,
            "termination scheduled"
        );

        Ok(TerminationAck {
            node: node.id().clone(),
            provisioning_id: node.provisioning_id().clone(),
            newly_scheduled,
        })
    }
}

impl std::fmt::Debug for DeleteTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeleteTrigger")
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticAuthorizer;
    use crate::provider::MockProvider;
    use crate::registry::InMemoryFleetRegistry;
    use crate::types::InstanceId;

    struct FailingRemover;

    #[async_trait]
    impl ComputerRemover for FailingRemover {
        async fn remove_computer(&self, _node: &FleetNode) -> FleetResult<()> {
            Err(FleetError::provider("instance stuck in deleting"))
        }
    }

    fn setup() -> (DeleteTrigger, Arc<FleetNode>) {
        let registry = Arc::new(InMemoryFleetRegistry::new());
        let node =
            Arc::new(FleetNode::provision(NodeId::new("n1"), InstanceId::new("i-1")).unwrap());
        registry.register(Arc::clone(&node)).unwrap();

        let controller = Arc::new(LifecycleController::new(
            Arc::new(MockProvider::default()),
            registry,
        ));
        let authorizer = StaticAuthorizer::new()
            .grant("ops", Capability::Delete)
            .grant("ops", Capability::Disconnect)
            .grant("viewer", Capability::Disconnect);

        (DeleteTrigger::new(controller, Arc::new(authorizer)), node)
    }

    #[tokio::test]
    async fn delete_without_permission_changes_nothing() {
        let (trigger, node) = setup();

        let result = trigger.delete(&node, &Principal::new("viewer")).await;

        assert!(matches!(result, Err(FleetError::PermissionDenied { .. })));
        assert!(node.operational_state().is_online());
        assert!(node.current_node().await.is_some());
    }

    #[tokio::test]
    async fn delete_removes_node() {
        let (trigger, node) = setup();
        trigger.delete(&node, &Principal::new("ops")).await.unwrap();
        assert!(node.is_removed());
    }

    #[tokio::test]
    async fn failed_delete_rolls_back() {
        let (trigger, node) = setup();
        let trigger = trigger.with_remover(Arc::new(FailingRemover));

        let result = trigger.delete(&node, &Principal::new("ops")).await;

        assert!(matches!(result, Err(FleetError::DeletionRolledBack { .. })));
        assert!(!node.is_pending_delete());
        assert!(node.operational_state().is_online());
    }

    #[test]
    fn schedule_termination_flags_node() {
        let (trigger, node) = setup();

        let ack = trigger
            .schedule_termination(&node, &Principal::new("viewer"))
            .unwrap();
        assert!(ack.newly_scheduled);
        assert_eq!(&ack.provisioning_id, node.provisioning_id());
        assert!(node.is_pending_delete());

        let ack = trigger
            .schedule_termination(&node, &Principal::new("viewer"))
            .unwrap();
        assert!(!ack.newly_scheduled);
    }

    #[test]
    fn schedule_termination_requires_disconnect() {
        let (trigger, node) = setup();
        let result = trigger.schedule_termination(&node, &Principal::new("stranger"));
        assert!(matches!(
            result,
            Err(FleetError::PermissionDenied {
                capability: Capability::Disconnect,
                ..
            })
        ));
        assert!(!node.is_pending_delete());
    }
}
