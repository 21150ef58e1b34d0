//! Common test utilities for fleet integration tests.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sidereal_fleet::{
    CloudProvider, FleetError, FleetNode, FleetRegistry, FleetResult, InMemoryFleetRegistry,
    InstanceId, LifecycleController, NodeId, RemoteChannel,
};

/// A collaborator call observed during a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CloseChannel(String),
    TerminateInstance(String),
    RemoveNode(String),
}

/// Shared, ordered log of collaborator calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|c| pred(c)).count()
    }
}

/// Channel that records closes and can be told to fail.
#[derive(Debug)]
pub struct RecordingChannel {
    name: String,
    log: CallLog,
    open: AtomicBool,
    fail_close: AtomicBool,
}

impl RecordingChannel {
    pub fn new(name: &str, log: CallLog) -> Self {
        Self {
            name: name.to_owned(),
            log,
            open: AtomicBool::new(true),
            fail_close: AtomicBool::new(false),
        }
    }

    pub fn fail_close(&self, fail: bool) {
        self.fail_close.store(fail, Ordering::SeqCst);
    }

    /// Simulate the transport closing the channel on its own.
    pub fn close_externally(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteChannel for RecordingChannel {
    async fn close(&self) -> std::io::Result<()> {
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "agent did not acknowledge close",
            ));
        }
        self.log.push(Call::CloseChannel(self.name.clone()));
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Provider that records terminations and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingProvider {
    log: CallLog,
    failures_left: AtomicUsize,
    delay: Mutex<Option<Duration>>,
}

impl RecordingProvider {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    /// Fail the next `n` terminations.
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    /// Sleep this long inside every termination.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }
}

#[async_trait]
impl CloudProvider for RecordingProvider {
    async fn terminate_instance(&self, instance: &InstanceId) -> FleetResult<()> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(FleetError::provider("compute API unavailable"));
        }

        self.log
            .push(Call::TerminateInstance(instance.as_str().to_owned()));
        Ok(())
    }
}

/// Registry that records removals on top of the in-memory registry.
#[derive(Debug)]
pub struct RecordingRegistry {
    pub inner: InMemoryFleetRegistry,
    log: CallLog,
    fail_remove: AtomicBool,
}

impl RecordingRegistry {
    pub fn new(log: CallLog) -> Self {
        Self {
            inner: InMemoryFleetRegistry::new(),
            log,
            fail_remove: AtomicBool::new(false),
        }
    }

    pub fn fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl FleetRegistry for RecordingRegistry {
    async fn remove_node(&self, id: &NodeId) -> FleetResult<()> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(FleetError::registry("registry is read-only"));
        }
        self.log.push(Call::RemoveNode(id.as_str().to_owned()));
        self.inner.remove_node(id).await
    }

    fn get(&self, id: &NodeId) -> Option<Arc<FleetNode>> {
        self.inner.get(id)
    }

    fn list(&self) -> Vec<Arc<FleetNode>> {
        self.inner.list()
    }
}

/// Complete test fleet with all collaborators wired together.
pub struct TestFleet {
    pub log: CallLog,
    pub provider: Arc<RecordingProvider>,
    pub registry: Arc<RecordingRegistry>,
    pub controller: Arc<LifecycleController>,
}

impl TestFleet {
    /// Creates a new test fleet.
    pub fn new() -> Self {
        let log = CallLog::default();
        Self::with_provider(RecordingProvider::new(log.clone()), log)
    }

    /// Creates a test fleet around a specific provider.
    pub fn with_provider(provider: RecordingProvider, log: CallLog) -> Self {
        let provider = Arc::new(provider);
        let registry = Arc::new(RecordingRegistry::new(log.clone()));
        let controller = Arc::new(LifecycleController::new(
            provider.clone(),
            registry.clone(),
        ));

        Self {
            log,
            provider,
            registry,
            controller,
        }
    }

    /// Registers a node with the fleet.
    pub fn add(&self, node: FleetNode) -> Arc<FleetNode> {
        let node = Arc::new(node);
        self.registry.inner.register(Arc::clone(&node)).unwrap();
        node
    }

    /// Creates a channel that records into this fleet's log.
    pub fn channel(&self, name: &str) -> Arc<RecordingChannel> {
        Arc::new(RecordingChannel::new(name, self.log.clone()))
    }
}

impl Default for TestFleet {
    fn default() -> Self {
        Self::new()
    }
}
