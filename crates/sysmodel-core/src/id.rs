//! Stable ID newtypes for model elements.
//!
//! All IDs are distinct newtype wrappers over `u32`, providing type safety
//! so that a `PortId` cannot be accidentally used where a `StateId` is
//! expected. [`ElementId`] is the closed union over the kinds that take part
//! in cascading deletion; contracts are deliberately not part of it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// System identity within the model tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SystemId(pub u32);

/// Port identity. A port is owned by exactly one system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortId(pub u32);

/// Identity of a port-to-port connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub u32);

/// Automaton state identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateId(pub u32);

/// Automaton edge identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

/// Automaton region identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionId(pub u32);

/// Contract identity. Contracts are owned by states and referenced by edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContractId(pub u32);

// Display implementations -- just print the inner value.

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A positionable model element, tagged by kind.
///
/// This is the unit of selection and of deletion requests. The derived
/// ordering groups elements by kind first, which keeps selection sets and
/// their debug output deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementId {
    System(SystemId),
    Port(PortId),
    Connection(ConnectionId),
    State(StateId),
    Edge(EdgeId),
    Region(RegionId),
}

impl ElementId {
    /// Short lowercase name of the element kind, used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            ElementId::System(_) => "system",
            ElementId::Port(_) => "port",
            ElementId::Connection(_) => "connection",
            ElementId::State(_) => "state",
            ElementId::Edge(_) => "edge",
            ElementId::Region(_) => "region",
        }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementId::System(id) => write!(f, "system:{}", id),
            ElementId::Port(id) => write!(f, "port:{}", id),
            ElementId::Connection(id) => write!(f, "connection:{}", id),
            ElementId::State(id) => write!(f, "state:{}", id),
            ElementId::Edge(id) => write!(f, "edge:{}", id),
            ElementId::Region(id) => write!(f, "region:{}", id),
        }
    }
}

impl From<SystemId> for ElementId {
    fn from(id: SystemId) -> Self {
        ElementId::System(id)
    }
}

impl From<PortId> for ElementId {
    fn from(id: PortId) -> Self {
        ElementId::Port(id)
    }
}

impl From<ConnectionId> for ElementId {
    fn from(id: ConnectionId) -> Self {
        ElementId::Connection(id)
    }
}

impl From<StateId> for ElementId {
    fn from(id: StateId) -> Self {
        ElementId::State(id)
    }
}

impl From<EdgeId> for ElementId {
    fn from(id: EdgeId) -> Self {
        ElementId::Edge(id)
    }
}

impl From<RegionId> for ElementId {
    fn from(id: RegionId) -> Self {
        ElementId::Region(id)
    }
}
