//! Test fixtures for fleet integration tests.

use std::sync::Arc;

use sidereal_fleet::{
    FleetNode, InstanceId, NodeDescriptor, NodeId, OfflineCause, ProvisioningId, RemoteChannel,
};

/// Builder for creating test FleetNode instances.
pub struct NodeBuilder {
    id: String,
    instance_id: String,
    provisioning_id: Option<String>,
    channel: Option<Arc<dyn RemoteChannel>>,
    offline: Option<OfflineCause>,
}

impl NodeBuilder {
    /// Creates a new node builder with the given ID.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            instance_id: format!("instance-{id}"),
            provisioning_id: Some(format!("prov-{id}")),
            channel: None,
            offline: None,
        }
    }

    /// Sets the provisioning ID.
    pub fn with_provisioning_id(mut self, id: &str) -> Self {
        self.provisioning_id = Some(id.to_string());
        self
    }

    /// Sets the backing instance ID.
    pub fn with_instance(mut self, id: &str) -> Self {
        self.instance_id = id.to_string();
        self
    }

    /// Attaches a channel.
    pub fn with_channel(mut self, channel: Arc<dyn RemoteChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Takes the node offline once built.
    pub fn offline(mut self, cause: OfflineCause) -> Self {
        self.offline = Some(cause);
        self
    }

    /// Marks the node offline because its disk is full.
    pub fn disk_full(self) -> Self {
        self.offline(OfflineCause::DiskSpaceExhausted {
            path: "/var/lib/worker".to_string(),
            free_bytes: 0,
        })
    }

    /// Builds the FleetNode.
    pub fn build(self) -> FleetNode {
        let node = FleetNode::new(NodeDescriptor {
            id: NodeId::new(self.id),
            instance_id: InstanceId::new(self.instance_id),
            provisioning_id: self.provisioning_id.map(ProvisioningId::new),
            channel: self.channel,
        })
        .unwrap();

        if let Some(cause) = self.offline {
            node.mark_offline(cause);
        }

        node
    }
}
