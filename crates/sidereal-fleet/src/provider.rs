//! Cloud provider abstraction for releasing the instances behind nodes.
//!
//! Creating instances is the provisioner's job; the lifecycle code only ever
//! asks for an instance to be terminated.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::{ProviderConfig, ProviderType};
use crate::error::{FleetError, FleetResult};
use crate::types::InstanceId;

/// Trait for cloud provider clients.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Terminate an instance.
    ///
    /// An instance that no longer exists counts as terminated.
    async fn terminate_instance(&self, instance: &InstanceId) -> FleetResult<()>;
}

/// Create a provider from configuration.
pub fn create_provider(config: &ProviderConfig) -> FleetResult<Arc<dyn CloudProvider>> {
    match config.provider_type {
        ProviderType::Mock => Ok(Arc::new(MockProvider::from_config(config))),
    }
}

/// In-memory provider for testing and local runs.
#[derive(Debug, Default)]
pub struct MockProvider {
    instances: RwLock<HashSet<InstanceId>>,
}

impl MockProvider {
    /// Create a provider that already knows the given instances.
    pub fn with_instances(instances: impl IntoIterator<Item = InstanceId>) -> Self {
        Self {
            instances: RwLock::new(instances.into_iter().collect()),
        }
    }

    /// Create a provider seeded with the configured mock instances.
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::with_instances(config.mock_instances.iter().map(InstanceId::new))
    }

    /// Register a running instance.
    pub fn launch(&self, instance: InstanceId) -> FleetResult<()> {
        let mut instances = self
            .instances
            .write()
            .map_err(|_| FleetError::internal("lock poisoned"))?;
        instances.insert(instance);
        Ok(())
    }

    /// Number of running instances.
    pub fn len(&self) -> usize {
        self.instances.read().map(|i| i.len()).unwrap_or(0)
    }

    /// Returns true if no instances are running.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CloudProvider for MockProvider {
    async fn terminate_instance(&self, instance: &InstanceId) -> FleetResult<()> {
        let mut instances = self
            .instances
            .write()
            .map_err(|_| FleetError::internal("lock poisoned"))?;

        if instances.remove(instance) {
            info!(instance = %instance, "instance terminated");
        } else {
            debug!(instance = %instance, "instance already gone");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_provider_lifecycle() {
        let provider = MockProvider::default();
        let instance = InstanceId::new("i-123");

        provider.launch(instance.clone()).unwrap();
        provider.launch(InstanceId::new("i-456")).unwrap();
        assert_eq!(provider.len(), 2);

        provider.terminate_instance(&instance).await.unwrap();
        assert_eq!(provider.len(), 1);

        provider
            .terminate_instance(&InstanceId::new("i-456"))
            .await
            .unwrap();
        assert!(provider.is_empty());
    }

    #[tokio::test]
    async fn terminating_missing_instance_succeeds() {
        let provider = MockProvider::default();
        provider
            .terminate_instance(&InstanceId::new("i-gone"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_from_config_seeds_instances() {
        let config = ProviderConfig {
            provider_type: ProviderType::Mock,
            mock_instances: vec!["i-1".to_owned(), "i-2".to_owned()],
        };

        let mock = MockProvider::from_config(&config);
        assert_eq!(mock.len(), 2);

        let provider = create_provider(&config).unwrap();
        provider
            .terminate_instance(&InstanceId::new("i-1"))
            .await
            .unwrap();
    }
}
