//! Closed component and connection kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ModelError;

/// The kind of architecture element a component represents.
///
/// Closed on purpose: the secondary index groups components by this tag, and
/// the palette only offers these kinds. Serialized as kebab-case strings
/// (`"load-balancer"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentType {
    Server,
    Database,
    Cache,
    LoadBalancer,
    Queue,
    Storage,
    Cdn,
    Client,
    Gateway,
    Frontend,
    Backend,
    Api,
    Service,
    Integration,
    External,
}

impl ComponentType {
    /// Every component type, in palette order.
    pub const ALL: [ComponentType; 15] = [
        ComponentType::Server,
        ComponentType::Database,
        ComponentType::Cache,
        ComponentType::LoadBalancer,
        ComponentType::Queue,
        ComponentType::Storage,
        ComponentType::Cdn,
        ComponentType::Client,
        ComponentType::Gateway,
        ComponentType::Frontend,
        ComponentType::Backend,
        ComponentType::Api,
        ComponentType::Service,
        ComponentType::Integration,
        ComponentType::External,
    ];

    /// Returns the wire name of this type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Server => "server",
            ComponentType::Database => "database",
            ComponentType::Cache => "cache",
            ComponentType::LoadBalancer => "load-balancer",
            ComponentType::Queue => "queue",
            ComponentType::Storage => "storage",
            ComponentType::Cdn => "cdn",
            ComponentType::Client => "client",
            ComponentType::Gateway => "gateway",
            ComponentType::Frontend => "frontend",
            ComponentType::Backend => "backend",
            ComponentType::Api => "api",
            ComponentType::Service => "service",
            ComponentType::Integration => "integration",
            ComponentType::External => "external",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ModelError::UnknownComponentType(s.to_string()))
    }
}

/// How two components communicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    /// Request/response call.
    Sync,
    /// Fire-and-forget or queued message.
    Async,
    /// Bulk data flow (replication, ETL).
    Data,
}

impl ConnectionType {
    /// Every connection type.
    pub const ALL: [ConnectionType; 3] = [
        ConnectionType::Sync,
        ConnectionType::Async,
        ConnectionType::Data,
    ];

    /// Returns the wire name of this type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Sync => "sync",
            ConnectionType::Async => "async",
            ConnectionType::Data => "data",
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConnectionType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ModelError::UnknownConnectionType(s.to_string()))
    }
}
