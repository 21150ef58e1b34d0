//! Authorization for operator-facing lifecycle actions.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AuthorizationConfig;
use crate::error::{FleetError, FleetResult};

/// Principal name that matches every caller in a grant table.
pub const WILDCARD_PRINCIPAL: &str = "*";

/// Capabilities guarding lifecycle actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Take a node out of service and schedule its termination.
    Disconnect,
    /// Delete a node immediately.
    Delete,
}

impl Capability {
    /// Returns the capability name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnect => "disconnect",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller of a lifecycle action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Create a principal.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the principal name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trait for authorization backends.
pub trait Authorizer: Send + Sync {
    /// Succeeds if the principal holds the capability.
    fn check_permission(&self, principal: &Principal, capability: Capability) -> FleetResult<()>;
}

/// Authorizer backed by a fixed grant table.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthorizer {
    grants: HashMap<String, HashSet<Capability>>,
}

impl StaticAuthorizer {
    /// Create an authorizer with no grants.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an authorizer from configuration.
    #[must_use]
    pub fn from_config(config: &AuthorizationConfig) -> Self {
        let grants = config
            .grants
            .iter()
            .map(|(principal, caps)| (principal.clone(), caps.iter().copied().collect()))
            .collect();
        Self { grants }
    }

    /// Grant a capability to a principal.
    #[must_use]
    pub fn grant(mut self, principal: impl Into<String>, capability: Capability) -> Self {
        self.grants
            .entry(principal.into())
            .or_default()
            .insert(capability);
        self
    }

    fn holds(&self, principal: &str, capability: Capability) -> bool {
        self.grants
            .get(principal)
            .is_some_and(|caps| caps.contains(&capability))
    }
}

impl Authorizer for StaticAuthorizer {
    fn check_permission(&self, principal: &Principal, capability: Capability) -> FleetResult<()> {
        if self.holds(principal.as_str(), capability) || self.holds(WILDCARD_PRINCIPAL, capability)
        {
            return Ok(());
        }

        debug!(principal = %principal, capability = %capability, "permission denied");
        Err(FleetError::PermissionDenied {
            principal: principal.to_string(),
            capability,
        })
    }
}
