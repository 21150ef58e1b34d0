//! Background sweeper that recycles broken nodes and retries deletions.

use std::sync::Arc;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::SweeperConfig;
use crate::lifecycle::LifecycleController;
use crate::types::NodeId;

/// Outcome of a single sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Nodes newly flagged because of a fatal offline cause.
    pub flagged: Vec<NodeId>,
    /// Nodes deleted during this sweep.
    pub deleted: Vec<NodeId>,
    /// Nodes whose deletion failed and will be retried.
    pub failed: Vec<NodeId>,
}

impl SweepReport {
    /// Returns true if the sweep did nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flagged.is_empty() && self.deleted.is_empty() && self.failed.is_empty()
    }
}

/// Periodically collects nodes that are pending delete.
#[derive(Debug)]
pub struct FleetSweeper {
    config: SweeperConfig,
    controller: Arc<LifecycleController>,
}

impl FleetSweeper {
    /// Create a new sweeper.
    pub fn new(config: SweeperConfig, controller: Arc<LifecycleController>) -> Self {
        Self { config, controller }
    }

    /// Run one sweep over the fleet.
    ///
    /// Deletions run concurrently so a slow node does not hold up the rest.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let nodes = self.controller.registry().list();

        if self.config.recycle_fatal {
            for node in &nodes {
                let Some(cause) = self.controller.fatal_cause(node) else {
                    continue;
                };
                if self.controller.set_pending_delete(node, true) {
                    info!(node = %node.id(), cause = %cause, "recycling node with fatal offline cause");
                    report.flagged.push(node.id().clone());
                }
            }
        }

        let pending: Vec<_> = nodes
            .into_iter()
            .filter(|node| self.controller.is_pending_delete(node))
            .collect();

        let results = join_all(pending.iter().map(|node| async move {
            (node.id().clone(), self.controller.delete_node(node).await)
        }))
        .await;

        for (id, result) in results {
            match result {
                Ok(()) => report.deleted.push(id),
                Err(error) => {
                    warn!(node = %id, error = %error, "deletion failed, retrying next sweep");
                    report.failed.push(id);
                }
            }
        }

        report
    }

    /// Spawn the sweep loop.
    ///
    /// Runs until `cancel` is triggered.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval());
            info!(interval_secs = self.config.interval_secs, "fleet sweeper started");

            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let report = self.sweep().await;
                        if !report.is_empty() {
                            info!(
                                flagged = report.flagged.len(),
                                deleted = report.deleted.len(),
                                failed = report.failed.len(),
                                "sweep complete"
                            );
                        }
                    }
                }
            }

            info!("fleet sweeper stopped");
        })
    }
}
