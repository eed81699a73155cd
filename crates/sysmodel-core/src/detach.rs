//! Detach and attach primitives for every element kind.
//!
//! Detaching removes an element from its owning collection and from every
//! collection that lists it as a cross-reference, returning a `Detached*`
//! record with the definition and the slot index of every list it was cut
//! out of. Attaching the record puts everything back at those slots.
//!
//! Detach/attach pairs are exact inverses as long as they are applied in
//! stack order: if a batch detaches `a` then `b`, attaching `b` then `a`
//! yields a model equal to the one before the batch.
//!
//! Both directions validate before mutating. [`SystemModel::check_detach`]
//! and [`SystemModel::check_attach`] expose the validation on its own so
//! callers can tell a declined precondition from a failure mid-mutation.

use serde::{Deserialize, Serialize};
use smallvec::{Array, SmallVec};

use crate::element::{
    ConnectionDef, ContractDef, EdgeDef, PortDef, RegionDef, StateDef, SystemDef,
};
use crate::error::CoreError;
use crate::id::{ContractId, EdgeId, ElementId, RegionId, SystemId};
use crate::model::SystemModel;

// ---------------------------------------------------------------------------
// Slot lists
// ---------------------------------------------------------------------------

/// An ordered ID list that an element can be cut out of and put back into.
pub(crate) trait SlotList<T: PartialEq> {
    /// Removes the first occurrence of `item`, returning its index.
    fn take_slot(&mut self, item: &T) -> Option<usize>;

    /// Inserts `item` at `slot`, clamped to the current length.
    fn put_slot(&mut self, slot: usize, item: T);
}

impl<T: PartialEq> SlotList<T> for Vec<T> {
    fn take_slot(&mut self, item: &T) -> Option<usize> {
        let slot = self.iter().position(|x| x == item)?;
        self.remove(slot);
        Some(slot)
    }

    fn put_slot(&mut self, slot: usize, item: T) {
        let slot = slot.min(self.len());
        self.insert(slot, item);
    }
}

impl<A> SlotList<A::Item> for SmallVec<A>
where
    A: Array,
    A::Item: PartialEq,
{
    fn take_slot(&mut self, item: &A::Item) -> Option<usize> {
        let slot = self.iter().position(|x| x == item)?;
        self.remove(slot);
        Some(slot)
    }

    fn put_slot(&mut self, slot: usize, item: A::Item) {
        let slot = slot.min(self.len());
        self.insert(slot, item);
    }
}

fn missing_slot(what: &str, element: ElementId) -> CoreError {
    CoreError::GraphInconsistency {
        reason: format!("{} is not listed in its {}", element, what),
    }
}

// ---------------------------------------------------------------------------
// Detached records
// ---------------------------------------------------------------------------

/// A removed system. Only empty systems can be detached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachedSystem {
    pub def: SystemDef,
    /// Index in the parent's `children`.
    pub slot: usize,
}

/// A removed port. Only unconnected ports can be detached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachedPort {
    pub def: PortDef,
    /// Index in the owner's `ports`.
    pub slot: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachedConnection {
    pub def: ConnectionDef,
    /// Index in the owner's `connections`.
    pub slot: usize,
    /// Index in the source port's `outgoing`.
    pub source_slot: usize,
    /// Index in the destination port's `incoming`.
    pub destination_slot: usize,
}

/// A removed state, together with the contracts it owned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachedState {
    pub def: StateDef,
    /// Index in the automaton's `states`.
    pub slot: usize,
    /// Whether the state was the automaton's start state.
    pub was_start: bool,
    /// Regions the state was a member of, with its index in each.
    pub regions: Vec<(RegionId, usize)>,
    /// Contract definitions, in the state's contract order.
    pub contracts: Vec<ContractDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachedEdge {
    pub def: EdgeDef,
    /// Index in the automaton's `edges`.
    pub slot: usize,
    pub source_slot: usize,
    pub destination_slot: usize,
}

/// A removed region. Its member list leaves with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachedRegion {
    pub def: RegionDef,
    /// Index in the automaton's `regions`.
    pub slot: usize,
}

/// A removed contract and the edges whose annotation was cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachedContract {
    pub def: ContractDef,
    /// Index in the owning state's `contracts`.
    pub slot: usize,
    pub edges: Vec<EdgeId>,
}

/// A detached element of any cascading kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Detached {
    System(DetachedSystem),
    Port(DetachedPort),
    Connection(DetachedConnection),
    State(DetachedState),
    Edge(DetachedEdge),
    Region(DetachedRegion),
}

impl Detached {
    /// The element this record restores.
    pub fn element(&self) -> ElementId {
        match self {
            Detached::System(d) => ElementId::System(d.def.id),
            Detached::Port(d) => ElementId::Port(d.def.id),
            Detached::Connection(d) => ElementId::Connection(d.def.id),
            Detached::State(d) => ElementId::State(d.def.id),
            Detached::Edge(d) => ElementId::Edge(d.def.id),
            Detached::Region(d) => ElementId::Region(d.def.id),
        }
    }
}

// ---------------------------------------------------------------------------
// Detach
// ---------------------------------------------------------------------------

impl SystemModel {
    /// Checks whether `element` could be detached right now.
    ///
    /// Fails when the element is missing, is the root, or is still
    /// referenced: a system that owns anything, a port with connections, or
    /// a state with edges.
    pub fn check_detach(&self, element: ElementId) -> Result<(), CoreError> {
        match element {
            ElementId::System(id) => {
                let def = self
                    .systems
                    .get(&id)
                    .ok_or(CoreError::SystemNotFound { id })?;
                if def.parent.is_none() {
                    return Err(CoreError::RootRemoval);
                }
                if !def.is_empty() {
                    let count = def.children.len()
                        + def.ports.len()
                        + def.connections.len()
                        + def.automaton.states.len()
                        + def.automaton.edges.len()
                        + def.automaton.regions.len();
                    return Err(CoreError::StillReferenced { element, count });
                }
            }
            ElementId::Port(id) => {
                let def = self.ports.get(&id).ok_or(CoreError::PortNotFound { id })?;
                if def.has_connections() {
                    return Err(CoreError::StillReferenced {
                        element,
                        count: def.incoming.len() + def.outgoing.len(),
                    });
                }
            }
            ElementId::Connection(id) => {
                if !self.connections.contains_key(&id) {
                    return Err(CoreError::ConnectionNotFound { id });
                }
            }
            ElementId::State(id) => {
                let def = self.states.get(&id).ok_or(CoreError::StateNotFound { id })?;
                if def.has_edges() {
                    let mut edges: Vec<EdgeId> =
                        def.incoming.iter().chain(def.outgoing.iter()).copied().collect();
                    edges.sort();
                    edges.dedup();
                    return Err(CoreError::StillReferenced {
                        element,
                        count: edges.len(),
                    });
                }
            }
            ElementId::Edge(id) => {
                if !self.edges.contains_key(&id) {
                    return Err(CoreError::EdgeNotFound { id });
                }
            }
            ElementId::Region(id) => {
                if !self.regions.contains_key(&id) {
                    return Err(CoreError::RegionNotFound { id });
                }
            }
        }
        Ok(())
    }

    /// Detaches any cascading element kind.
    pub fn detach(&mut self, element: ElementId) -> Result<Detached, CoreError> {
        self.check_detach(element)?;
        match element {
            ElementId::System(id) => {
                let def = self
                    .systems
                    .remove(&id)
                    .ok_or(CoreError::SystemNotFound { id })?;
                let parent = def.parent.ok_or(CoreError::RootRemoval)?;
                let slot = self
                    .systems
                    .get_mut(&parent)
                    .and_then(|p| p.children.take_slot(&id))
                    .ok_or_else(|| missing_slot("parent's children", element))?;
                Ok(Detached::System(DetachedSystem { def, slot }))
            }
            ElementId::Port(id) => {
                let def = self.ports.remove(&id).ok_or(CoreError::PortNotFound { id })?;
                let slot = self
                    .systems
                    .get_mut(&def.owner)
                    .and_then(|s| s.ports.take_slot(&id))
                    .ok_or_else(|| missing_slot("owner's ports", element))?;
                Ok(Detached::Port(DetachedPort { def, slot }))
            }
            ElementId::Connection(id) => {
                let def = self
                    .connections
                    .remove(&id)
                    .ok_or(CoreError::ConnectionNotFound { id })?;
                let slot = self
                    .systems
                    .get_mut(&def.owner)
                    .and_then(|s| s.connections.take_slot(&id))
                    .ok_or_else(|| missing_slot("owner's connections", element))?;
                let source_slot = self
                    .ports
                    .get_mut(&def.source)
                    .and_then(|p| p.outgoing.take_slot(&id))
                    .ok_or_else(|| missing_slot("source port", element))?;
                let destination_slot = self
                    .ports
                    .get_mut(&def.destination)
                    .and_then(|p| p.incoming.take_slot(&id))
                    .ok_or_else(|| missing_slot("destination port", element))?;
                Ok(Detached::Connection(DetachedConnection {
                    def,
                    slot,
                    source_slot,
                    destination_slot,
                }))
            }
            ElementId::State(id) => {
                let def = self.states.remove(&id).ok_or(CoreError::StateNotFound { id })?;
                let owner = self
                    .systems
                    .get_mut(&def.owner)
                    .ok_or(CoreError::SystemNotFound { id: def.owner })?;
                let slot = owner
                    .automaton
                    .states
                    .take_slot(&id)
                    .ok_or_else(|| missing_slot("automaton", element))?;
                let was_start = owner.automaton.start_state == Some(id);
                if was_start {
                    owner.automaton.start_state = None;
                }

                let region_ids = owner.automaton.regions.clone();
                let mut regions = Vec::new();
                for region_id in region_ids {
                    if let Some(region) = self.regions.get_mut(&region_id) {
                        if let Some(index) = region.states.take_slot(&id) {
                            regions.push((region_id, index));
                        }
                    }
                }

                let mut contracts = Vec::with_capacity(def.contracts.len());
                for contract_id in &def.contracts {
                    let contract = self
                        .contracts
                        .remove(contract_id)
                        .ok_or(CoreError::ContractNotFound { id: *contract_id })?;
                    contracts.push(contract);
                }

                Ok(Detached::State(DetachedState {
                    def,
                    slot,
                    was_start,
                    regions,
                    contracts,
                }))
            }
            ElementId::Edge(id) => {
                let def = self.edges.remove(&id).ok_or(CoreError::EdgeNotFound { id })?;
                let slot = self
                    .systems
                    .get_mut(&def.owner)
                    .and_then(|s| s.automaton.edges.take_slot(&id))
                    .ok_or_else(|| missing_slot("automaton", element))?;
                let source_slot = self
                    .states
                    .get_mut(&def.source)
                    .and_then(|s| s.outgoing.take_slot(&id))
                    .ok_or_else(|| missing_slot("source state", element))?;
                let destination_slot = self
                    .states
                    .get_mut(&def.destination)
                    .and_then(|s| s.incoming.take_slot(&id))
                    .ok_or_else(|| missing_slot("destination state", element))?;
                Ok(Detached::Edge(DetachedEdge {
                    def,
                    slot,
                    source_slot,
                    destination_slot,
                }))
            }
            ElementId::Region(id) => {
                let def = self
                    .regions
                    .remove(&id)
                    .ok_or(CoreError::RegionNotFound { id })?;
                let slot = self
                    .systems
                    .get_mut(&def.owner)
                    .and_then(|s| s.automaton.regions.take_slot(&id))
                    .ok_or_else(|| missing_slot("automaton", element))?;
                Ok(Detached::Region(DetachedRegion { def, slot }))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Attach
    // -----------------------------------------------------------------------

    /// Checks whether `record` could be attached right now: the element must
    /// be absent and everything it points at must be present.
    pub fn check_attach(&self, record: &Detached) -> Result<(), CoreError> {
        let element = record.element();
        if self.contains(element) {
            return Err(CoreError::AlreadyPresent { element });
        }
        match record {
            Detached::System(d) => {
                let parent = d.def.parent.ok_or(CoreError::RootRemoval)?;
                self.require_system(parent)?;
            }
            Detached::Port(d) => self.require_system(d.def.owner)?,
            Detached::Connection(d) => {
                self.require_system(d.def.owner)?;
                if !self.ports.contains_key(&d.def.source) {
                    return Err(CoreError::PortNotFound { id: d.def.source });
                }
                if !self.ports.contains_key(&d.def.destination) {
                    return Err(CoreError::PortNotFound {
                        id: d.def.destination,
                    });
                }
            }
            Detached::State(d) => {
                self.require_system(d.def.owner)?;
                for (region, _) in &d.regions {
                    if !self.regions.contains_key(region) {
                        return Err(CoreError::RegionNotFound { id: *region });
                    }
                }
                for contract in &d.contracts {
                    if self.contracts.contains_key(&contract.id) {
                        return Err(CoreError::GraphInconsistency {
                            reason: format!("contract {} is already present", contract.id),
                        });
                    }
                }
            }
            Detached::Edge(d) => {
                self.require_system(d.def.owner)?;
                for state in [d.def.source, d.def.destination] {
                    if !self.states.contains_key(&state) {
                        return Err(CoreError::StateNotFound { id: state });
                    }
                }
                if let Some(contract) = d.def.contract {
                    if !self.contracts.contains_key(&contract) {
                        return Err(CoreError::ContractNotFound { id: contract });
                    }
                }
            }
            Detached::Region(d) => {
                self.require_system(d.def.owner)?;
                for state in &d.def.states {
                    if !self.states.contains_key(state) {
                        return Err(CoreError::StateNotFound { id: *state });
                    }
                }
            }
        }
        Ok(())
    }

    fn require_system(&self, id: SystemId) -> Result<(), CoreError> {
        if self.systems.contains_key(&id) {
            Ok(())
        } else {
            Err(CoreError::SystemNotFound { id })
        }
    }

    /// Re-inserts a detached element at its recorded slots.
    pub fn attach(&mut self, record: Detached) -> Result<ElementId, CoreError> {
        self.check_attach(&record)?;
        let element = record.element();
        match record {
            Detached::System(DetachedSystem { def, slot }) => {
                let parent = def.parent.ok_or(CoreError::RootRemoval)?;
                let parent_def = self
                    .systems
                    .get_mut(&parent)
                    .ok_or(CoreError::SystemNotFound { id: parent })?;
                parent_def.children.put_slot(slot, def.id);
                self.systems.insert(def.id, def);
            }
            Detached::Port(DetachedPort { def, slot }) => {
                let owner = self
                    .systems
                    .get_mut(&def.owner)
                    .ok_or(CoreError::SystemNotFound { id: def.owner })?;
                owner.ports.put_slot(slot, def.id);
                self.ports.insert(def.id, def);
            }
            Detached::Connection(DetachedConnection {
                def,
                slot,
                source_slot,
                destination_slot,
            }) => {
                if let Some(owner) = self.systems.get_mut(&def.owner) {
                    owner.connections.put_slot(slot, def.id);
                }
                if let Some(port) = self.ports.get_mut(&def.source) {
                    port.outgoing.put_slot(source_slot, def.id);
                }
                if let Some(port) = self.ports.get_mut(&def.destination) {
                    port.incoming.put_slot(destination_slot, def.id);
                }
                self.connections.insert(def.id, def);
            }
            Detached::State(DetachedState {
                def,
                slot,
                was_start,
                regions,
                contracts,
            }) => {
                if let Some(owner) = self.systems.get_mut(&def.owner) {
                    owner.automaton.states.put_slot(slot, def.id);
                    if was_start {
                        owner.automaton.start_state = Some(def.id);
                    }
                }
                for (region, index) in regions {
                    if let Some(region) = self.regions.get_mut(&region) {
                        region.states.put_slot(index, def.id);
                    }
                }
                for contract in contracts {
                    self.contracts.insert(contract.id, contract);
                }
                self.states.insert(def.id, def);
            }
            Detached::Edge(DetachedEdge {
                def,
                slot,
                source_slot,
                destination_slot,
            }) => {
                if let Some(owner) = self.systems.get_mut(&def.owner) {
                    owner.automaton.edges.put_slot(slot, def.id);
                }
                if let Some(state) = self.states.get_mut(&def.source) {
                    state.outgoing.put_slot(source_slot, def.id);
                }
                if let Some(state) = self.states.get_mut(&def.destination) {
                    state.incoming.put_slot(destination_slot, def.id);
                }
                self.edges.insert(def.id, def);
            }
            Detached::Region(DetachedRegion { def, slot }) => {
                if let Some(owner) = self.systems.get_mut(&def.owner) {
                    owner.automaton.regions.put_slot(slot, def.id);
                }
                self.regions.insert(def.id, def);
            }
        }
        Ok(element)
    }

    // -----------------------------------------------------------------------
    // Contracts
    // -----------------------------------------------------------------------

    /// Removes a contract from its state and clears it from every edge of
    /// the automaton that was annotated with it.
    pub fn detach_contract(&mut self, id: ContractId) -> Result<DetachedContract, CoreError> {
        if !self.contracts.contains_key(&id) {
            return Err(CoreError::ContractNotFound { id });
        }
        let edges = self.edges_with_contract(id);
        let def = self
            .contracts
            .remove(&id)
            .ok_or(CoreError::ContractNotFound { id })?;
        let slot = self
            .states
            .get_mut(&def.owner)
            .and_then(|s| s.contracts.take_slot(&id))
            .ok_or_else(|| CoreError::GraphInconsistency {
                reason: format!("contract {} is not listed in its state", id),
            })?;
        for edge in &edges {
            if let Some(edge) = self.edges.get_mut(edge) {
                edge.contract = None;
            }
        }
        Ok(DetachedContract { def, slot, edges })
    }

    /// Checks whether a detached contract could be re-attached right now.
    pub fn check_attach_contract(&self, record: &DetachedContract) -> Result<(), CoreError> {
        if self.contracts.contains_key(&record.def.id) {
            return Err(CoreError::GraphInconsistency {
                reason: format!("contract {} is already present", record.def.id),
            });
        }
        if !self.states.contains_key(&record.def.owner) {
            return Err(CoreError::StateNotFound {
                id: record.def.owner,
            });
        }
        for edge in &record.edges {
            if !self.edges.contains_key(edge) {
                return Err(CoreError::EdgeNotFound { id: *edge });
            }
        }
        Ok(())
    }

    /// Re-inserts a contract and re-annotates the edges it was cleared from.
    pub fn attach_contract(&mut self, record: DetachedContract) -> Result<ContractId, CoreError> {
        self.check_attach_contract(&record)?;
        let DetachedContract { def, slot, edges } = record;
        let id = def.id;
        if let Some(state) = self.states.get_mut(&def.owner) {
            state.contracts.put_slot(slot, id);
        }
        for edge in edges {
            if let Some(edge) = self.edges.get_mut(&edge) {
                edge.contract = Some(id);
            }
        }
        self.contracts.insert(id, def);
        Ok(id)
    }
}
