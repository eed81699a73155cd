//! SystemModel: the id-indexed arena holding the whole system tree.
//!
//! [`SystemModel`] is the single entry point for constructing and querying a
//! model. Every element kind lives in its own ID-keyed map; ownership and
//! cross-references are stored as IDs on both sides and kept in agreement by
//! the mutation methods here and in [`crate::detach`].
//!
//! Lookups never fail hard: getters return `Option`, and the builder methods
//! validate every argument before touching any collection, so an `Err` from
//! an `add_*` method always means nothing changed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::element::{
    ConnectionDef, ContractDef, EdgeDef, PortDef, RegionDef, StateDef, SystemDef,
};
use crate::error::CoreError;
use crate::id::{ConnectionId, ContractId, EdgeId, ElementId, PortId, RegionId, StateId, SystemId};
use crate::types::{Condition, EdgeKind, Visibility};

/// Per-kind ID counters. IDs are never reused, so a restored element keeps
/// the identity it had before deletion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct IdCounters {
    system: u32,
    port: u32,
    connection: u32,
    state: u32,
    edge: u32,
    region: u32,
    contract: u32,
}

/// The system model arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemModel {
    pub(crate) root: SystemId,
    pub(crate) systems: HashMap<SystemId, SystemDef>,
    pub(crate) ports: HashMap<PortId, PortDef>,
    pub(crate) connections: HashMap<ConnectionId, ConnectionDef>,
    pub(crate) states: HashMap<StateId, StateDef>,
    pub(crate) edges: HashMap<EdgeId, EdgeDef>,
    pub(crate) regions: HashMap<RegionId, RegionDef>,
    pub(crate) contracts: HashMap<ContractId, ContractDef>,
    next: IdCounters,
}

/// Two models are equal when they hold the same elements. The ID counters
/// are not compared: an undone paste leaves them advanced.
impl PartialEq for SystemModel {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
            && self.systems == other.systems
            && self.ports == other.ports
            && self.connections == other.connections
            && self.states == other.states
            && self.edges == other.edges
            && self.regions == other.regions
            && self.contracts == other.contracts
    }
}

impl Eq for SystemModel {}

impl SystemModel {
    /// Creates a model containing only the root system, `SystemId(0)`.
    pub fn new(root_name: &str) -> Self {
        let root = SystemId(0);
        let mut systems = HashMap::new();
        systems.insert(root, SystemDef::new(root, root_name.to_string(), None));

        SystemModel {
            root,
            systems,
            ports: HashMap::new(),
            connections: HashMap::new(),
            states: HashMap::new(),
            edges: HashMap::new(),
            regions: HashMap::new(),
            contracts: HashMap::new(),
            next: IdCounters {
                system: 1,
                ..IdCounters::default()
            },
        }
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Returns the root system ID.
    pub fn root_id(&self) -> SystemId {
        self.root
    }

    pub fn get_system(&self, id: SystemId) -> Option<&SystemDef> {
        self.systems.get(&id)
    }

    pub fn get_port(&self, id: PortId) -> Option<&PortDef> {
        self.ports.get(&id)
    }

    pub fn get_connection(&self, id: ConnectionId) -> Option<&ConnectionDef> {
        self.connections.get(&id)
    }

    pub fn get_state(&self, id: StateId) -> Option<&StateDef> {
        self.states.get(&id)
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&EdgeDef> {
        self.edges.get(&id)
    }

    pub fn get_region(&self, id: RegionId) -> Option<&RegionDef> {
        self.regions.get(&id)
    }

    pub fn get_contract(&self, id: ContractId) -> Option<&ContractDef> {
        self.contracts.get(&id)
    }

    pub fn systems(&self) -> impl Iterator<Item = &SystemDef> {
        self.systems.values()
    }

    pub fn ports(&self) -> impl Iterator<Item = &PortDef> {
        self.ports.values()
    }

    pub fn connections(&self) -> impl Iterator<Item = &ConnectionDef> {
        self.connections.values()
    }

    pub fn states(&self) -> impl Iterator<Item = &StateDef> {
        self.states.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeDef> {
        self.edges.values()
    }

    pub fn regions(&self) -> impl Iterator<Item = &RegionDef> {
        self.regions.values()
    }

    pub fn contracts(&self) -> impl Iterator<Item = &ContractDef> {
        self.contracts.values()
    }

    /// Total number of live elements of every kind, contracts included.
    pub fn element_count(&self) -> usize {
        self.systems.len()
            + self.ports.len()
            + self.connections.len()
            + self.states.len()
            + self.edges.len()
            + self.regions.len()
            + self.contracts.len()
    }

    /// Returns `true` if the element is currently part of the model.
    pub fn contains(&self, element: ElementId) -> bool {
        match element {
            ElementId::System(id) => self.systems.contains_key(&id),
            ElementId::Port(id) => self.ports.contains_key(&id),
            ElementId::Connection(id) => self.connections.contains_key(&id),
            ElementId::State(id) => self.states.contains_key(&id),
            ElementId::Edge(id) => self.edges.contains_key(&id),
            ElementId::Region(id) => self.regions.contains_key(&id),
        }
    }

    /// Finds the system that owns `element`.
    ///
    /// For a system this is its parent; for everything else it is the system
    /// whose collections list the element. Returns `None` for the root and
    /// for elements that are not in the model.
    pub fn owner_of(&self, element: ElementId) -> Option<SystemId> {
        match element {
            ElementId::System(id) => self.systems.get(&id).and_then(|s| s.parent),
            ElementId::Port(id) => self.ports.get(&id).map(|p| p.owner),
            ElementId::Connection(id) => self.connections.get(&id).map(|c| c.owner),
            ElementId::State(id) => self.states.get(&id).map(|s| s.owner),
            ElementId::Edge(id) => self.edges.get(&id).map(|e| e.owner),
            ElementId::Region(id) => self.regions.get(&id).map(|r| r.owner),
        }
    }

    /// Human-readable name of an element, used for labels and logs.
    /// Connections and edges are unnamed and render as their endpoints.
    pub fn element_name(&self, element: ElementId) -> Option<String> {
        match element {
            ElementId::System(id) => self.systems.get(&id).map(|s| s.name.clone()),
            ElementId::Port(id) => self.ports.get(&id).map(|p| p.name.clone()),
            ElementId::Connection(id) => self.connections.get(&id).map(|c| {
                format!("{} -> {}", self.port_label(c.source), self.port_label(c.destination))
            }),
            ElementId::State(id) => self.states.get(&id).map(|s| s.name.clone()),
            ElementId::Edge(id) => self.edges.get(&id).map(|e| {
                format!("{} -> {}", self.state_label(e.source), self.state_label(e.destination))
            }),
            ElementId::Region(id) => self.regions.get(&id).map(|r| r.name.clone()),
        }
    }

    /// Whether any named element (system, port, state, region or contract)
    /// anywhere in the model is called `name`.
    pub fn is_name_used(&self, name: &str) -> bool {
        self.systems.values().any(|s| s.name == name)
            || self.ports.values().any(|p| p.name == name)
            || self.states.values().any(|s| s.name == name)
            || self.regions.values().any(|r| r.name == name)
            || self.contracts.values().any(|c| c.name == name)
    }

    /// `stem` if no element uses it yet, otherwise the first free
    /// `stem_N` with N counting from 1.
    pub fn unique_name(&self, stem: &str) -> String {
        if !self.is_name_used(stem) {
            return stem.to_string();
        }
        (1u32..)
            .map(|n| format!("{}_{}", stem, n))
            .find(|candidate| !self.is_name_used(candidate))
            .unwrap_or_else(|| stem.to_string())
    }

    fn port_label(&self, id: PortId) -> String {
        self.ports
            .get(&id)
            .map_or_else(|| format!("port:{}", id), |p| p.name.clone())
    }

    fn state_label(&self, id: StateId) -> String {
        self.states
            .get(&id)
            .map_or_else(|| format!("state:{}", id), |s| s.name.clone())
    }

    /// Edges of the owning automaton that start or end at `state`, in the
    /// automaton's edge order.
    pub fn edges_touching(&self, state: StateId) -> Vec<EdgeId> {
        let Some(owner) = self.states.get(&state).map(|s| s.owner) else {
            return Vec::new();
        };
        let Some(system) = self.systems.get(&owner) else {
            return Vec::new();
        };
        system
            .automaton
            .edges
            .iter()
            .copied()
            .filter(|e| self.edges.get(e).is_some_and(|edge| edge.touches(state)))
            .collect()
    }

    /// Connections drawn inside `system` that have `port` as an endpoint.
    pub fn connections_touching(&self, system: SystemId, port: PortId) -> Vec<ConnectionId> {
        let Some(def) = self.systems.get(&system) else {
            return Vec::new();
        };
        def.connections
            .iter()
            .copied()
            .filter(|c| {
                self.connections
                    .get(c)
                    .is_some_and(|conn| conn.source == port || conn.destination == port)
            })
            .collect()
    }

    /// Regions of the owning automaton that list `state` as a member.
    pub fn regions_with_state(&self, state: StateId) -> Vec<RegionId> {
        let Some(owner) = self.states.get(&state).map(|s| s.owner) else {
            return Vec::new();
        };
        let Some(system) = self.systems.get(&owner) else {
            return Vec::new();
        };
        system
            .automaton
            .regions
            .iter()
            .copied()
            .filter(|r| self.regions.get(r).is_some_and(|reg| reg.states.contains(&state)))
            .collect()
    }

    /// Edges of `state`'s automaton that are annotated with `contract`.
    pub fn edges_with_contract(&self, contract: ContractId) -> Vec<EdgeId> {
        let Some(state) = self.contracts.get(&contract).map(|c| c.owner) else {
            return Vec::new();
        };
        let Some(owner) = self.states.get(&state).map(|s| s.owner) else {
            return Vec::new();
        };
        let Some(system) = self.systems.get(&owner) else {
            return Vec::new();
        };
        system
            .automaton
            .edges
            .iter()
            .copied()
            .filter(|e| {
                self.edges
                    .get(e)
                    .is_some_and(|edge| edge.contract == Some(contract))
            })
            .collect()
    }

    /// Elements shown when `view` is the active system: its children, its
    /// own and its children's ports, its connections, and its automaton.
    pub fn viewable_elements(&self, view: SystemId) -> Vec<ElementId> {
        let Some(system) = self.systems.get(&view) else {
            return Vec::new();
        };
        let mut elements = Vec::new();
        elements.extend(system.children.iter().map(|&c| ElementId::System(c)));
        elements.extend(system.ports.iter().map(|&p| ElementId::Port(p)));
        for child in &system.children {
            if let Some(child_def) = self.systems.get(child) {
                elements.extend(child_def.ports.iter().map(|&p| ElementId::Port(p)));
            }
        }
        elements.extend(system.connections.iter().map(|&c| ElementId::Connection(c)));
        elements.extend(system.automaton.states.iter().map(|&s| ElementId::State(s)));
        elements.extend(system.automaton.edges.iter().map(|&e| ElementId::Edge(e)));
        elements.extend(system.automaton.regions.iter().map(|&r| ElementId::Region(r)));
        elements
    }

    /// Returns `true` if `ancestor` is `system` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: SystemId, system: SystemId) -> bool {
        let mut current = Some(system);
        let mut steps = 0usize;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            // A cyclic parent chain is reported by check_integrity; stop here.
            steps += 1;
            if steps > self.systems.len() {
                return false;
            }
            current = self.systems.get(&id).and_then(|s| s.parent);
        }
        false
    }

    // -----------------------------------------------------------------------
    // Builder methods
    // -----------------------------------------------------------------------

    /// Adds a child system under `parent`.
    pub fn add_system(&mut self, parent: SystemId, name: String) -> Result<SystemId, CoreError> {
        if !self.systems.contains_key(&parent) {
            return Err(CoreError::SystemNotFound { id: parent });
        }

        let id = SystemId(self.next.system);
        self.next.system += 1;

        self.systems.insert(id, SystemDef::new(id, name, Some(parent)));
        if let Some(parent_def) = self.systems.get_mut(&parent) {
            parent_def.children.push(id);
        }

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(id)
    }

    /// Adds a port to `system`.
    pub fn add_port(
        &mut self,
        system: SystemId,
        name: String,
        visibility: Visibility,
    ) -> Result<PortId, CoreError> {
        let Some(owner) = self.systems.get_mut(&system) else {
            return Err(CoreError::SystemNotFound { id: system });
        };

        let id = PortId(self.next.port);
        self.next.port += 1;
        owner.ports.push(id);

        self.ports.insert(
            id,
            PortDef {
                id,
                name,
                owner: system,
                visibility,
                ty: "int".to_string(),
                value: None,
                incoming: Default::default(),
                outgoing: Default::default(),
            },
        );

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(id)
    }

    /// Draws a connection inside `system` from `source` to `destination`.
    ///
    /// Validated with [`check_connection`](Self::check_connection) first.
    pub fn add_connection(
        &mut self,
        system: SystemId,
        source: PortId,
        destination: PortId,
    ) -> Result<ConnectionId, CoreError> {
        self.check_connection(system, source, destination)?;

        let id = ConnectionId(self.next.connection);
        self.next.connection += 1;

        self.connections.insert(
            id,
            ConnectionDef {
                id,
                owner: system,
                source,
                destination,
            },
        );
        if let Some(def) = self.systems.get_mut(&system) {
            def.connections.push(id);
        }
        if let Some(port) = self.ports.get_mut(&source) {
            port.outgoing.push(id);
        }
        if let Some(port) = self.ports.get_mut(&destination) {
            port.incoming.push(id);
        }

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(id)
    }

    /// Validates a connection drawn inside `system`.
    ///
    /// Both ports must belong to `system` or one of its direct children, to
    /// two different systems, the destination must be free, and the port
    /// directions must match: between two children it runs output to input;
    /// from the enclosing system's side no output port may take part; into
    /// the enclosing system no input port may take part.
    pub fn check_connection(
        &self,
        system: SystemId,
        source: PortId,
        destination: PortId,
    ) -> Result<(), CoreError> {
        if !self.systems.contains_key(&system) {
            return Err(CoreError::SystemNotFound { id: system });
        }
        let src = self
            .ports
            .get(&source)
            .ok_or(CoreError::PortNotFound { id: source })?;
        let dst = self
            .ports
            .get(&destination)
            .ok_or(CoreError::PortNotFound { id: destination })?;

        let reachable = |owner: SystemId| {
            owner == system
                || self
                    .systems
                    .get(&owner)
                    .is_some_and(|s| s.parent == Some(system))
        };
        if !reachable(src.owner) || !reachable(dst.owner) {
            return Err(CoreError::InvalidConnection {
                reason: format!(
                    "ports {} and {} are not both visible inside system {}",
                    source, destination, system
                ),
            });
        }
        if !dst.incoming.is_empty() {
            return Err(CoreError::InvalidConnection {
                reason: format!("port {} already has an incoming connection", destination),
            });
        }
        if src.owner == dst.owner {
            return Err(CoreError::InvalidConnection {
                reason: "source and destination belong to the same system".to_string(),
            });
        }

        let directions_match = if src.owner != system && dst.owner != system {
            src.visibility == Visibility::Output && dst.visibility == Visibility::Input
        } else if src.owner == system {
            src.visibility != Visibility::Output && dst.visibility != Visibility::Output
        } else {
            src.visibility != Visibility::Input && dst.visibility != Visibility::Input
        };
        if !directions_match {
            return Err(CoreError::InvalidConnection {
                reason: format!(
                    "cannot connect {} port to {} port here",
                    src.visibility, dst.visibility
                ),
            });
        }
        Ok(())
    }

    /// Adds a state to `system`'s automaton. The first state added to an
    /// automaton becomes its start state.
    pub fn add_state(&mut self, system: SystemId, name: String) -> Result<StateId, CoreError> {
        let Some(owner) = self.systems.get_mut(&system) else {
            return Err(CoreError::SystemNotFound { id: system });
        };

        let id = StateId(self.next.state);
        self.next.state += 1;
        owner.automaton.states.push(id);
        if owner.automaton.start_state.is_none() {
            owner.automaton.start_state = Some(id);
        }

        self.states.insert(
            id,
            StateDef {
                id,
                name,
                owner: system,
                contracts: Vec::new(),
                incoming: Default::default(),
                outgoing: Default::default(),
            },
        );

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(id)
    }

    /// Adds an edge between two states of the same automaton.
    pub fn add_edge(&mut self, source: StateId, destination: StateId) -> Result<EdgeId, CoreError> {
        let src_owner = self
            .states
            .get(&source)
            .ok_or(CoreError::StateNotFound { id: source })?
            .owner;
        let dst_owner = self
            .states
            .get(&destination)
            .ok_or(CoreError::StateNotFound { id: destination })?
            .owner;
        if src_owner != dst_owner {
            return Err(CoreError::InvalidEdge {
                reason: format!(
                    "states {} and {} belong to different automata",
                    source, destination
                ),
            });
        }

        let id = EdgeId(self.next.edge);
        self.next.edge += 1;

        self.edges.insert(
            id,
            EdgeDef {
                id,
                owner: src_owner,
                source,
                destination,
                contract: None,
                kind: EdgeKind::default(),
                priority: 0,
            },
        );
        if let Some(system) = self.systems.get_mut(&src_owner) {
            system.automaton.edges.push(id);
        }
        if let Some(state) = self.states.get_mut(&source) {
            state.outgoing.push(id);
        }
        if let Some(state) = self.states.get_mut(&destination) {
            state.incoming.push(id);
        }

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(id)
    }

    /// Adds a region to `system`'s automaton with the given member states.
    pub fn add_region(
        &mut self,
        system: SystemId,
        name: String,
        members: Vec<StateId>,
    ) -> Result<RegionId, CoreError> {
        if !self.systems.contains_key(&system) {
            return Err(CoreError::SystemNotFound { id: system });
        }
        for state in &members {
            match self.states.get(state) {
                Some(def) if def.owner == system => {}
                Some(_) => {
                    return Err(CoreError::GraphInconsistency {
                        reason: format!("state {} is not part of system {}", state, system),
                    })
                }
                None => return Err(CoreError::StateNotFound { id: *state }),
            }
        }

        let mut states = Vec::with_capacity(members.len());
        for state in members {
            if !states.contains(&state) {
                states.push(state);
            }
        }

        let id = RegionId(self.next.region);
        self.next.region += 1;

        self.regions.insert(
            id,
            RegionDef {
                id,
                name,
                owner: system,
                invariant: Condition::truth(),
                precondition: Condition::truth(),
                postcondition: Condition::truth(),
                states,
            },
        );
        if let Some(def) = self.systems.get_mut(&system) {
            def.automaton.regions.push(id);
        }

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(id)
    }

    /// Attaches a new contract to `state`.
    pub fn add_contract(
        &mut self,
        state: StateId,
        name: String,
        precondition: Condition,
        postcondition: Condition,
    ) -> Result<ContractId, CoreError> {
        let Some(owner) = self.states.get_mut(&state) else {
            return Err(CoreError::StateNotFound { id: state });
        };

        let id = ContractId(self.next.contract);
        self.next.contract += 1;
        owner.contracts.push(id);

        self.contracts.insert(
            id,
            ContractDef {
                id,
                owner: state,
                name,
                precondition,
                postcondition,
            },
        );

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Debug consistency assertion
    // -----------------------------------------------------------------------

    /// Panics with the first invariant violation found.
    ///
    /// Only called in debug builds (via `cfg(debug_assertions)`).
    #[cfg(debug_assertions)]
    pub(crate) fn assert_consistency(&self) {
        if let Err(err) = self.check_integrity() {
            panic!("model invariant violated: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (SystemModel, SystemId, SystemId) {
        let mut model = SystemModel::new("root");
        let root = model.root_id();
        let a = model.add_system(root, "a".into()).unwrap();
        let b = model.add_system(root, "b".into()).unwrap();
        (model, a, b)
    }

    #[test]
    fn new_model_has_only_root() {
        let model = SystemModel::new("root");
        assert_eq!(model.root_id(), SystemId(0));
        assert_eq!(model.element_count(), 1);
        assert_eq!(model.owner_of(ElementId::System(SystemId(0))), None);
    }

    #[test]
    fn add_system_links_parent_and_child() {
        let (model, a, b) = sample();
        let root = model.get_system(model.root_id()).unwrap();
        assert_eq!(root.children, vec![a, b]);
        assert_eq!(model.owner_of(ElementId::System(a)), Some(model.root_id()));
    }

    #[test]
    fn add_system_under_missing_parent_errors() {
        let mut model = SystemModel::new("root");
        let result = model.add_system(SystemId(99), "x".into());
        assert_eq!(result, Err(CoreError::SystemNotFound { id: SystemId(99) }));
        assert_eq!(model.element_count(), 1);
    }

    #[test]
    fn child_to_child_connection_requires_output_to_input() {
        let (mut model, a, b) = sample();
        let root = model.root_id();
        let out = model.add_port(a, "out".into(), Visibility::Output).unwrap();
        let inp = model.add_port(b, "in".into(), Visibility::Input).unwrap();

        assert!(matches!(
            model.add_connection(root, inp, out),
            Err(CoreError::InvalidConnection { .. })
        ));
        let conn = model.add_connection(root, out, inp).unwrap();

        assert_eq!(model.get_port(out).unwrap().outgoing.as_slice(), &[conn]);
        assert_eq!(model.get_port(inp).unwrap().incoming.as_slice(), &[conn]);
        assert_eq!(model.connections_touching(root, inp), vec![conn]);
    }

    #[test]
    fn destination_accepts_a_single_incoming_connection() {
        let (mut model, a, b) = sample();
        let root = model.root_id();
        let out1 = model.add_port(a, "o1".into(), Visibility::Output).unwrap();
        let inp = model.add_port(b, "in".into(), Visibility::Input).unwrap();
        let c = model.add_system(root, "c".into()).unwrap();
        let out2 = model.add_port(c, "o2".into(), Visibility::Output).unwrap();

        model.add_connection(root, out1, inp).unwrap();
        assert!(model.add_connection(root, out2, inp).is_err());
    }

    #[test]
    fn enclosing_port_feeds_child_input() {
        let (mut model, a, _) = sample();
        let root = model.root_id();
        let outer = model.add_port(root, "x".into(), Visibility::Input).unwrap();
        let inner = model.add_port(a, "y".into(), Visibility::Input).unwrap();
        assert!(model.add_connection(root, outer, inner).is_ok());
    }

    #[test]
    fn grandchild_ports_are_not_reachable() {
        let (mut model, a, b) = sample();
        let root = model.root_id();
        let deep = model.add_system(a, "deep".into()).unwrap();
        let out = model.add_port(deep, "o".into(), Visibility::Output).unwrap();
        let inp = model.add_port(b, "i".into(), Visibility::Input).unwrap();
        assert!(model.add_connection(root, out, inp).is_err());
    }

    #[test]
    fn edges_must_stay_inside_one_automaton() {
        let (mut model, a, b) = sample();
        let s1 = model.add_state(a, "s1".into()).unwrap();
        let s2 = model.add_state(b, "s2".into()).unwrap();
        assert!(matches!(
            model.add_edge(s1, s2),
            Err(CoreError::InvalidEdge { .. })
        ));
    }

    #[test]
    fn first_state_becomes_start_state() {
        let (mut model, a, _) = sample();
        let s1 = model.add_state(a, "s1".into()).unwrap();
        let _s2 = model.add_state(a, "s2".into()).unwrap();
        assert_eq!(model.get_system(a).unwrap().automaton.start_state, Some(s1));
    }

    #[test]
    fn edge_queries_follow_automaton_order() {
        let (mut model, a, _) = sample();
        let s1 = model.add_state(a, "s1".into()).unwrap();
        let s2 = model.add_state(a, "s2".into()).unwrap();
        let s3 = model.add_state(a, "s3".into()).unwrap();
        let e1 = model.add_edge(s1, s2).unwrap();
        let _e2 = model.add_edge(s2, s3).unwrap();
        let e3 = model.add_edge(s3, s1).unwrap();
        let looped = model.add_edge(s1, s1).unwrap();

        assert_eq!(model.edges_touching(s1), vec![e1, e3, looped]);
        assert!(model.get_edge(looped).unwrap().is_loop());
    }

    #[test]
    fn region_members_are_deduplicated() {
        let (mut model, a, _) = sample();
        let s1 = model.add_state(a, "s1".into()).unwrap();
        let r = model.add_region(a, "r".into(), vec![s1, s1]).unwrap();
        assert_eq!(model.get_region(r).unwrap().states, vec![s1]);
        assert_eq!(model.regions_with_state(s1), vec![r]);
    }

    #[test]
    fn viewable_elements_include_child_ports() {
        let (mut model, a, _) = sample();
        let root = model.root_id();
        let p = model.add_port(a, "p".into(), Visibility::Output).unwrap();
        let s = model.add_state(root, "s".into()).unwrap();
        let view = model.viewable_elements(root);
        assert!(view.contains(&ElementId::Port(p)));
        assert!(view.contains(&ElementId::State(s)));
        assert!(view.contains(&ElementId::System(a)));
        assert!(!model.viewable_elements(a).contains(&ElementId::State(s)));
    }

    #[test]
    fn serde_roundtrip_preserves_model() {
        let (mut model, a, _) = sample();
        let s = model.add_state(a, "s".into()).unwrap();
        model
            .add_contract(s, "c".into(), Condition::truth(), Condition::new("x"))
            .unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let back: SystemModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
    }
}
