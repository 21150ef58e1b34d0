//! Configuration for sidereal-fleet.

use std::collections::HashMap;
use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

use crate::auth::Capability;
use crate::error::{FleetError, FleetResult};

/// Top-level configuration for the fleet service.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FleetConfig {
    /// Background sweeper configuration.
    #[serde(default)]
    pub sweeper: SweeperConfig,

    /// Grants for operator actions.
    #[serde(default)]
    pub authorization: AuthorizationConfig,

    /// Cloud provider configuration.
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl FleetConfig {
    /// Load configuration from the default sources.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. `fleet.toml` in the current directory (if present)
    /// 3. Environment variables with `SIDEREAL_FLEET_` prefix
    pub fn load() -> FleetResult<Self> {
        Self::from_file("fleet.toml")
    }

    /// Load configuration from a specific TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> FleetResult<Self> {
        let config: Self = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("SIDEREAL_FLEET_").split("__"))
            .extract()
            .map_err(|e| FleetError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the fleet cannot run with.
    pub fn validate(&self) -> FleetResult<()> {
        if self.sweeper.interval_secs == 0 {
            return Err(FleetError::Config(
                "sweeper.interval_secs must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Sweeper configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    /// Whether the sweeper runs at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds between sweeps.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Flag nodes with a fatal offline cause for deletion.
    #[serde(default = "default_recycle_fatal")]
    pub recycle_fatal: bool,
}

const fn default_enabled() -> bool {
    true
}

const fn default_interval_secs() -> u64 {
    60
}

const fn default_recycle_fatal() -> bool {
    true
}

impl SweeperConfig {
    /// Interval between sweeps, never shorter than one second.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval_secs(),
            recycle_fatal: default_recycle_fatal(),
        }
    }
}

/// Authorization configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizationConfig {
    /// Capabilities granted to each principal. `*` matches every principal.
    #[serde(default)]
    pub grants: HashMap<String, Vec<Capability>>,
}

/// Cloud provider configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use.
    #[serde(default)]
    pub provider_type: ProviderType,

    /// Instances the mock provider starts with.
    #[serde(default)]
    pub mock_instances: Vec<String>,
}

/// Type of cloud provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// In-memory provider.
    #[default]
    Mock,
}
