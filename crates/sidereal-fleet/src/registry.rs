//! Fleet registry for tracking node records.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::error::{FleetError, FleetResult};
use crate::node::FleetNode;
use crate::types::NodeId;

/// Trait for fleet registry backends.
#[async_trait]
pub trait FleetRegistry: Send + Sync {
    /// Removes a node from the fleet.
    ///
    /// Removing a node that is not registered succeeds.
    async fn remove_node(&self, id: &NodeId) -> FleetResult<()>;

    /// Gets a node by ID.
    fn get(&self, id: &NodeId) -> Option<Arc<FleetNode>>;

    /// Lists all nodes.
    fn list(&self) -> Vec<Arc<FleetNode>>;
}

/// In-memory fleet registry.
///
/// Thread-safe registry keyed by node identity.
#[derive(Debug, Default)]
pub struct InMemoryFleetRegistry {
    nodes: DashMap<NodeId, Arc<FleetNode>>,
}

impl InMemoryFleetRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
        }
    }

    /// Registers a new node.
    pub fn register(&self, node: Arc<FleetNode>) -> FleetResult<()> {
        let id = node.id().clone();

        match self.nodes.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(entry) => Err(FleetError::registry(format!(
                "node already registered: {}",
                entry.key()
            ))),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(node);
                Ok(())
            }
        }
    }

    /// Returns true if the node is registered.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Returns the number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no nodes are registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[async_trait]
impl FleetRegistry for InMemoryFleetRegistry {
    async fn remove_node(&self, id: &NodeId) -> FleetResult<()> {
        if self.nodes.remove(id).is_none() {
            debug!(node = %id, "node already removed from registry");
        }
        Ok(())
    }

    fn get(&self, id: &NodeId) -> Option<Arc<FleetNode>> {
        self.nodes.get(id).map(|r| Arc::clone(r.value()))
    }

    fn list(&self) -> Vec<Arc<FleetNode>> {
        self.nodes.iter().map(|r| Arc::clone(r.value())).collect()
    }
}
