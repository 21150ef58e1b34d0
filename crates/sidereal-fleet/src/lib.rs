//! Sidereal fleet - worker node lifecycle and termination.
//!
//! This crate tracks whether each cloud-provisioned worker is in service,
//! flagged for deletion, or broken beyond repair, and tears nodes down in a
//! way that is safe to retry:
//!
//! - **Offline causes**: why a node is not accepting work, and which causes
//!   are fatal
//! - **Node records**: identity, provisioning correlation ID, operational
//!   state and the backing instance and channel
//! - **Lifecycle controller**: the pending-delete state machine and the
//!   ordered teardown (close channel, terminate instance, remove record)
//! - **Delete trigger**: operator-facing deletion with rollback on failure
//! - **Sweeper**: background loop that recycles fatal nodes and retries
//!   pending deletions
//!
//! # State Machine
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
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sidereal_fleet::{
//!     FleetNode, InMemoryFleetRegistry, InstanceId, LifecycleController, MockProvider, NodeId,
//! };
//!
//! let registry = Arc::new(InMemoryFleetRegistry::new());
//! let controller = LifecycleController::new(Arc::new(MockProvider::default()), registry.clone());
//!
//! let node = Arc::new(FleetNode::provision(NodeId::new("n1"), InstanceId::new("i-1"))?);
//! registry.register(node.clone())?;
//!
//! controller.set_pending_delete(&node, true);
//! controller.delete_node(&node).await?;
//! ```

#![forbid(unsafe_code)]

pub mod auth;
pub mod cause;
pub mod channel;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod node;
pub mod provider;
pub mod registry;
pub mod sweeper;
pub mod trigger;
pub mod types;

// Re-export commonly used types at the crate root
pub use auth::{Authorizer, Capability, Principal, StaticAuthorizer};
pub use cause::{OfflineCause, OperationalState};
pub use channel::RemoteChannel;
pub use config::{AuthorizationConfig, FleetConfig, ProviderConfig, ProviderType, SweeperConfig};
pub use error::{FleetError, FleetResult};
pub use lifecycle::LifecycleController;
pub use node::{FleetNode, NodeBacking, NodeDescriptor, NodeState};
pub use provider::{create_provider, CloudProvider, MockProvider};
pub use registry::{FleetRegistry, InMemoryFleetRegistry};
pub use sweeper::{FleetSweeper, SweepReport};
pub use trigger::{ComputerRemover, DeleteTrigger, TerminationAck};
pub use types::{InstanceId, NodeId, ProvisioningId};
