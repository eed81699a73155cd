//! Element definitions stored in the [`SystemModel`](crate::model::SystemModel)
//! arena.
//!
//! Every definition records its owner by ID, and every membership collection
//! lists its members by ID. The model keeps both directions in agreement;
//! definitions are only handed out by shared reference.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::{ConnectionId, ContractId, EdgeId, PortId, RegionId, StateId, SystemId};
use crate::types::{Condition, EdgeKind, Visibility};

/// A node in the system tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemDef {
    pub id: SystemId,
    pub name: String,
    /// Behaviour code attached to the system, kept verbatim.
    pub code: String,
    /// Parent system. `None` only for the root.
    pub parent: Option<SystemId>,
    /// Child systems, in display order.
    pub children: Vec<SystemId>,
    /// Ports owned by this system.
    pub ports: Vec<PortId>,
    /// Connections drawn inside this system.
    pub connections: Vec<ConnectionId>,
    /// The system's own automaton.
    pub automaton: Automaton,
}

impl SystemDef {
    pub fn new(id: SystemId, name: String, parent: Option<SystemId>) -> Self {
        SystemDef {
            id,
            name,
            code: String::new(),
            parent,
            children: Vec::new(),
            ports: Vec::new(),
            connections: Vec::new(),
            automaton: Automaton::default(),
        }
    }

    /// Returns `true` if the system owns nothing at all.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
            && self.ports.is_empty()
            && self.connections.is_empty()
            && self.automaton.is_empty()
    }
}

/// Membership collections of a system's automaton.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Automaton {
    pub states: Vec<StateId>,
    pub edges: Vec<EdgeId>,
    pub regions: Vec<RegionId>,
    pub start_state: Option<StateId>,
}

impl Automaton {
    pub fn is_empty(&self) -> bool {
        self.states.is_empty() && self.edges.is_empty() && self.regions.is_empty()
    }
}

/// A typed variable exposed by a system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDef {
    pub id: PortId,
    pub name: String,
    pub owner: SystemId,
    pub visibility: Visibility,
    #[serde(rename = "type")]
    pub ty: String,
    pub value: Option<String>,
    /// Connections that end at this port.
    pub incoming: SmallVec<[ConnectionId; 2]>,
    /// Connections that start at this port.
    pub outgoing: SmallVec<[ConnectionId; 2]>,
}

impl PortDef {
    pub fn has_connections(&self) -> bool {
        !self.incoming.is_empty() || !self.outgoing.is_empty()
    }
}

/// A directed wire between two ports, drawn inside its owning system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDef {
    pub id: ConnectionId,
    pub owner: SystemId,
    pub source: PortId,
    pub destination: PortId,
}

/// An automaton state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDef {
    pub id: StateId,
    pub name: String,
    /// System whose automaton holds this state.
    pub owner: SystemId,
    /// Contracts owned by this state, in display order.
    pub contracts: Vec<ContractId>,
    pub incoming: SmallVec<[EdgeId; 4]>,
    pub outgoing: SmallVec<[EdgeId; 4]>,
}

impl StateDef {
    pub fn has_edges(&self) -> bool {
        !self.incoming.is_empty() || !self.outgoing.is_empty()
    }
}

/// A transition between two states of the same automaton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDef {
    pub id: EdgeId,
    pub owner: SystemId,
    pub source: StateId,
    pub destination: StateId,
    /// One of the source state's contracts, if set.
    pub contract: Option<ContractId>,
    pub kind: EdgeKind,
    pub priority: i32,
}

impl EdgeDef {
    pub fn is_loop(&self) -> bool {
        self.source == self.destination
    }

    pub fn touches(&self, state: StateId) -> bool {
        self.source == state || self.destination == state
    }
}

/// A group of states sharing an invariant and a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionDef {
    pub id: RegionId,
    pub name: String,
    pub owner: SystemId,
    pub invariant: Condition,
    pub precondition: Condition,
    pub postcondition: Condition,
    /// Member states. Members never own the region back.
    pub states: Vec<StateId>,
}

/// A pre/postcondition pair attached to a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDef {
    pub id: ContractId,
    pub owner: StateId,
    pub name: String,
    pub precondition: Condition,
    pub postcondition: Condition,
}
