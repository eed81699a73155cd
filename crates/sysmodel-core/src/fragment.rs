//! Copying and pasting parts of a model.
//!
//! [`SystemModel::copy_fragment`] snapshots the selected elements of one view
//! into a [`Fragment`]: selected child systems with their whole subtree,
//! selected ports, states (with their contracts) and regions, plus the edges
//! and connections whose two ends were both copied. The fragment is detached
//! from the model it came from and can be pasted any number of times.
//!
//! [`SystemModel::paste_fragment`] clones the fragment into a target system
//! through the regular builders. Every pasted element gets a fresh ID and a
//! name that is unique in the model.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::element::{
    ConnectionDef, ContractDef, EdgeDef, PortDef, RegionDef, StateDef, SystemDef,
};
use crate::error::CoreError;
use crate::id::{ConnectionId, ContractId, EdgeId, ElementId, PortId, RegionId, StateId, SystemId};
use crate::model::SystemModel;

/// A copied part of a model, keyed by the IDs the elements had when copied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fragment {
    // Top-level elements, in the order they appeared in the view.
    systems: Vec<SystemId>,
    ports: Vec<PortId>,
    states: Vec<StateId>,
    edges: Vec<EdgeId>,
    regions: Vec<RegionId>,
    connections: Vec<ConnectionId>,

    // Snapshots of every copied definition, nested ones included.
    system_defs: BTreeMap<SystemId, SystemDef>,
    port_defs: BTreeMap<PortId, PortDef>,
    connection_defs: BTreeMap<ConnectionId, ConnectionDef>,
    state_defs: BTreeMap<StateId, StateDef>,
    edge_defs: BTreeMap<EdgeId, EdgeDef>,
    region_defs: BTreeMap<RegionId, RegionDef>,
    contract_defs: BTreeMap<ContractId, ContractDef>,
}

impl Fragment {
    pub fn is_empty(&self) -> bool {
        self.roots().is_empty()
    }

    /// The top-level elements as they were identified when copied.
    pub fn roots(&self) -> Vec<ElementId> {
        let mut roots = Vec::new();
        roots.extend(self.systems.iter().map(|&s| ElementId::System(s)));
        roots.extend(self.ports.iter().map(|&p| ElementId::Port(p)));
        roots.extend(self.states.iter().map(|&s| ElementId::State(s)));
        roots.extend(self.edges.iter().map(|&e| ElementId::Edge(e)));
        roots.extend(self.regions.iter().map(|&r| ElementId::Region(r)));
        roots.extend(self.connections.iter().map(|&c| ElementId::Connection(c)));
        roots
    }

    /// Number of copied elements, nested ones and contracts included.
    pub fn element_count(&self) -> usize {
        self.system_defs.len()
            + self.port_defs.len()
            + self.connection_defs.len()
            + self.state_defs.len()
            + self.edge_defs.len()
            + self.region_defs.len()
            + self.contract_defs.len()
    }

    fn system(&self, id: SystemId) -> Result<&SystemDef, CoreError> {
        self.system_defs
            .get(&id)
            .ok_or(CoreError::SystemNotFound { id })
    }

    fn port(&self, id: PortId) -> Result<&PortDef, CoreError> {
        self.port_defs.get(&id).ok_or(CoreError::PortNotFound { id })
    }

    fn state(&self, id: StateId) -> Result<&StateDef, CoreError> {
        self.state_defs.get(&id).ok_or(CoreError::StateNotFound { id })
    }

    fn edge(&self, id: EdgeId) -> Result<&EdgeDef, CoreError> {
        self.edge_defs.get(&id).ok_or(CoreError::EdgeNotFound { id })
    }

    fn region(&self, id: RegionId) -> Result<&RegionDef, CoreError> {
        self.region_defs
            .get(&id)
            .ok_or(CoreError::RegionNotFound { id })
    }

    fn connection(&self, id: ConnectionId) -> Result<&ConnectionDef, CoreError> {
        self.connection_defs
            .get(&id)
            .ok_or(CoreError::ConnectionNotFound { id })
    }
}

/// Old-to-new ID maps built up while pasting.
#[derive(Default)]
struct Remap {
    ports: HashMap<PortId, PortId>,
    states: HashMap<StateId, StateId>,
    contracts: HashMap<ContractId, ContractId>,
}

impl Remap {
    fn port(&self, id: PortId) -> Result<PortId, CoreError> {
        self.ports
            .get(&id)
            .copied()
            .ok_or(CoreError::PortNotFound { id })
    }

    fn state(&self, id: StateId) -> Result<StateId, CoreError> {
        self.states
            .get(&id)
            .copied()
            .ok_or(CoreError::StateNotFound { id })
    }
}

impl SystemModel {
    // -----------------------------------------------------------------------
    // Copy
    // -----------------------------------------------------------------------

    /// Copies the elements of `selection` that `view` owns directly.
    ///
    /// Selected elements that belong to another system are ignored, and so
    /// are selected edges and connections: those are copied exactly when both
    /// of their ends are. Returns an empty fragment if `view` does not exist.
    pub fn copy_fragment(
        &self,
        view: SystemId,
        selection: impl IntoIterator<Item = ElementId>,
    ) -> Fragment {
        let mut fragment = Fragment::default();
        let Some(view_def) = self.systems.get(&view) else {
            return fragment;
        };
        let selected: BTreeSet<ElementId> = selection.into_iter().collect();

        for &child in &view_def.children {
            if selected.contains(&ElementId::System(child)) {
                fragment.systems.push(child);
                self.snapshot_system(child, &mut fragment);
            }
        }
        for &port in &view_def.ports {
            if let Some(def) = self.ports.get(&port) {
                if selected.contains(&ElementId::Port(port)) {
                    fragment.ports.push(port);
                    fragment.port_defs.insert(port, def.clone());
                }
            }
        }
        for &state in &view_def.automaton.states {
            if selected.contains(&ElementId::State(state)) && self.states.contains_key(&state) {
                fragment.states.push(state);
                self.snapshot_state(state, &mut fragment);
            }
        }
        for &edge in &view_def.automaton.edges {
            let Some(def) = self.edges.get(&edge) else {
                continue;
            };
            if fragment.states.contains(&def.source) && fragment.states.contains(&def.destination)
            {
                fragment.edges.push(edge);
                fragment.edge_defs.insert(edge, def.clone());
            }
        }
        for &region in &view_def.automaton.regions {
            if let Some(def) = self.regions.get(&region) {
                if selected.contains(&ElementId::Region(region)) {
                    fragment.regions.push(region);
                    fragment.region_defs.insert(region, def.clone());
                }
            }
        }
        for &conn in &view_def.connections {
            let Some(def) = self.connections.get(&conn) else {
                continue;
            };
            let copied = |port: PortId| {
                fragment.ports.contains(&port)
                    || self
                        .ports
                        .get(&port)
                        .is_some_and(|p| fragment.systems.contains(&p.owner))
            };
            if copied(def.source) && copied(def.destination) {
                fragment.connections.push(conn);
                fragment.connection_defs.insert(conn, def.clone());
            }
        }

        fragment
    }

    fn snapshot_system(&self, id: SystemId, fragment: &mut Fragment) {
        let Some(def) = self.systems.get(&id) else {
            return;
        };
        fragment.system_defs.insert(id, def.clone());
        for port in &def.ports {
            if let Some(port_def) = self.ports.get(port) {
                fragment.port_defs.insert(*port, port_def.clone());
            }
        }
        for &child in &def.children {
            self.snapshot_system(child, fragment);
        }
        for &state in &def.automaton.states {
            self.snapshot_state(state, fragment);
        }
        for edge in &def.automaton.edges {
            if let Some(edge_def) = self.edges.get(edge) {
                fragment.edge_defs.insert(*edge, edge_def.clone());
            }
        }
        for region in &def.automaton.regions {
            if let Some(region_def) = self.regions.get(region) {
                fragment.region_defs.insert(*region, region_def.clone());
            }
        }
        for conn in &def.connections {
            if let Some(conn_def) = self.connections.get(conn) {
                fragment.connection_defs.insert(*conn, conn_def.clone());
            }
        }
    }

    fn snapshot_state(&self, id: StateId, fragment: &mut Fragment) {
        let Some(def) = self.states.get(&id) else {
            return;
        };
        fragment.state_defs.insert(id, def.clone());
        for contract in &def.contracts {
            if let Some(contract_def) = self.contracts.get(contract) {
                fragment.contract_defs.insert(*contract, contract_def.clone());
            }
        }
    }

    // -----------------------------------------------------------------------
    // Paste
    // -----------------------------------------------------------------------

    /// Pastes a copy of `fragment` into `target` and returns the IDs of the
    /// new top-level elements.
    ///
    /// Region members that were not copied are dropped from the pasted
    /// region. The first pasted state becomes the start state of `target`'s
    /// automaton if it has none. An `Err` other than `SystemNotFound` for
    /// `target` can leave part of the fragment pasted.
    pub fn paste_fragment(
        &mut self,
        target: SystemId,
        fragment: &Fragment,
    ) -> Result<Vec<ElementId>, CoreError> {
        if !self.systems.contains_key(&target) {
            return Err(CoreError::SystemNotFound { id: target });
        }
        let mut remap = Remap::default();
        let mut pasted = Vec::new();

        for &system in &fragment.systems {
            let id = self.paste_system(target, system, fragment, &mut remap)?;
            pasted.push(ElementId::System(id));
        }
        for &port in &fragment.ports {
            let id = self.paste_port(target, port, fragment, &mut remap)?;
            pasted.push(ElementId::Port(id));
        }
        for &state in &fragment.states {
            let id = self.paste_state(target, state, fragment, &mut remap)?;
            pasted.push(ElementId::State(id));
        }
        for &edge in &fragment.edges {
            let id = self.paste_edge(edge, fragment, &remap)?;
            pasted.push(ElementId::Edge(id));
        }
        for &region in &fragment.regions {
            let id = self.paste_region(target, region, fragment, &remap)?;
            pasted.push(ElementId::Region(id));
        }
        for &conn in &fragment.connections {
            let id = self.paste_connection(target, conn, fragment, &remap)?;
            pasted.push(ElementId::Connection(id));
        }

        Ok(pasted)
    }

    fn paste_system(
        &mut self,
        parent: SystemId,
        source: SystemId,
        fragment: &Fragment,
        remap: &mut Remap,
    ) -> Result<SystemId, CoreError> {
        let def = fragment.system(source)?;
        let id = self.add_system(parent, self.unique_name(&def.name))?;
        if let Some(system) = self.systems.get_mut(&id) {
            system.code = def.code.clone();
        }

        for &port in &def.ports {
            self.paste_port(id, port, fragment, remap)?;
        }
        for &child in &def.children {
            self.paste_system(id, child, fragment, remap)?;
        }
        for &state in &def.automaton.states {
            self.paste_state(id, state, fragment, remap)?;
        }
        let start = match def.automaton.start_state {
            Some(state) => Some(remap.state(state)?),
            None => None,
        };
        if let Some(system) = self.systems.get_mut(&id) {
            system.automaton.start_state = start;
        }
        for &edge in &def.automaton.edges {
            self.paste_edge(edge, fragment, remap)?;
        }
        for &region in &def.automaton.regions {
            self.paste_region(id, region, fragment, remap)?;
        }
        for &conn in &def.connections {
            self.paste_connection(id, conn, fragment, remap)?;
        }
        Ok(id)
    }

    fn paste_port(
        &mut self,
        owner: SystemId,
        source: PortId,
        fragment: &Fragment,
        remap: &mut Remap,
    ) -> Result<PortId, CoreError> {
        let def = fragment.port(source)?;
        let id = self.add_port(owner, self.unique_name(&def.name), def.visibility)?;
        if let Some(port) = self.ports.get_mut(&id) {
            port.ty = def.ty.clone();
            port.value = def.value.clone();
        }
        remap.ports.insert(source, id);
        Ok(id)
    }

    fn paste_state(
        &mut self,
        owner: SystemId,
        source: StateId,
        fragment: &Fragment,
        remap: &mut Remap,
    ) -> Result<StateId, CoreError> {
        let def = fragment.state(source)?;
        let id = self.add_state(owner, self.unique_name(&def.name))?;
        remap.states.insert(source, id);

        for contract in &def.contracts {
            let contract_def = fragment
                .contract_defs
                .get(contract)
                .ok_or(CoreError::ContractNotFound { id: *contract })?;
            let new_contract = self.add_contract(
                id,
                self.unique_name(&contract_def.name),
                contract_def.precondition.clone(),
                contract_def.postcondition.clone(),
            )?;
            remap.contracts.insert(*contract, new_contract);
        }
        Ok(id)
    }

    fn paste_edge(
        &mut self,
        source: EdgeId,
        fragment: &Fragment,
        remap: &Remap,
    ) -> Result<EdgeId, CoreError> {
        let def = fragment.edge(source)?;
        let id = self.add_edge(remap.state(def.source)?, remap.state(def.destination)?)?;
        if let Some(edge) = self.edges.get_mut(&id) {
            edge.kind = def.kind;
            edge.priority = def.priority;
            edge.contract = def
                .contract
                .and_then(|contract| remap.contracts.get(&contract).copied());
        }
        Ok(id)
    }

    fn paste_region(
        &mut self,
        owner: SystemId,
        source: RegionId,
        fragment: &Fragment,
        remap: &Remap,
    ) -> Result<RegionId, CoreError> {
        let def = fragment.region(source)?;
        let members = def
            .states
            .iter()
            .filter_map(|state| remap.states.get(state).copied())
            .collect();
        let id = self.add_region(owner, self.unique_name(&def.name), members)?;
        if let Some(region) = self.regions.get_mut(&id) {
            region.invariant = def.invariant.clone();
            region.precondition = def.precondition.clone();
            region.postcondition = def.postcondition.clone();
        }
        Ok(id)
    }

    fn paste_connection(
        &mut self,
        owner: SystemId,
        source: ConnectionId,
        fragment: &Fragment,
        remap: &Remap,
    ) -> Result<ConnectionId, CoreError> {
        let def = fragment.connection(source)?;
        self.add_connection(owner, remap.port(def.source)?, remap.port(def.destination)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Condition, EdgeKind, Visibility};

    /// root
    /// ├── pump (out: output) with states on/off, edge on->off, region "running"
    /// ├── tank (in: input)
    /// └── connection pump.out -> tank.in
    /// plus root states idle/busy with edge idle->busy and a contract on idle.
    struct Sample {
        model: SystemModel,
        pump: SystemId,
        tank: SystemId,
        out: PortId,
        conn: ConnectionId,
        idle: StateId,
        busy: StateId,
        step: EdgeId,
    }

    fn sample() -> Sample {
        let mut model = SystemModel::new("plant");
        let root = model.root_id();
        let pump = model.add_system(root, "pump".into()).unwrap();
        let tank = model.add_system(root, "tank".into()).unwrap();
        let out = model.add_port(pump, "out".into(), Visibility::Output).unwrap();
        let inp = model.add_port(tank, "in".into(), Visibility::Input).unwrap();
        let conn = model.add_connection(root, out, inp).unwrap();

        let on = model.add_state(pump, "on".into()).unwrap();
        let off = model.add_state(pump, "off".into()).unwrap();
        let toggle = model.add_edge(on, off).unwrap();
        model.edges.get_mut(&toggle).unwrap().kind = EdgeKind::Miss;
        model.add_region(pump, "running".into(), vec![on]).unwrap();
        model.systems.get_mut(&pump).unwrap().automaton.start_state = Some(off);

        let idle = model.add_state(root, "idle".into()).unwrap();
        let busy = model.add_state(root, "busy".into()).unwrap();
        let guard = model
            .add_contract(idle, "guard".into(), Condition::truth(), Condition::new("x > 0"))
            .unwrap();
        let step = model.add_edge(idle, busy).unwrap();
        model.edges.get_mut(&step).unwrap().contract = Some(guard);

        Sample {
            model,
            pump,
            tank,
            out,
            conn,
            idle,
            busy,
            step,
        }
    }

    #[test]
    fn copy_takes_edges_and_connections_only_with_both_ends() {
        let s = sample();
        let root = s.model.root_id();

        let one_end = s.model.copy_fragment(
            root,
            [ElementId::System(s.pump), ElementId::State(s.idle)],
        );
        assert_eq!(
            one_end.roots(),
            vec![ElementId::System(s.pump), ElementId::State(s.idle)]
        );

        let both = s.model.copy_fragment(
            root,
            [
                ElementId::System(s.pump),
                ElementId::System(s.tank),
                ElementId::State(s.idle),
                ElementId::State(s.busy),
            ],
        );
        assert!(both.roots().contains(&ElementId::Edge(s.step)));
        assert!(both.roots().contains(&ElementId::Connection(s.conn)));
    }

    #[test]
    fn copy_ignores_elements_outside_the_view() {
        let s = sample();
        let fragment = s
            .model
            .copy_fragment(s.tank, [ElementId::Port(s.out), ElementId::System(s.pump)]);
        assert!(fragment.is_empty());
        assert!(s
            .model
            .copy_fragment(SystemId(99), [ElementId::System(s.pump)])
            .is_empty());
    }

    #[test]
    fn paste_clones_subtree_with_fresh_ids_and_names() {
        let mut s = sample();
        let root = s.model.root_id();
        let fragment = s.model.copy_fragment(root, [ElementId::System(s.pump)]);
        let before = s.model.element_count();

        let pasted = s.model.paste_fragment(root, &fragment).unwrap();
        assert_eq!(pasted.len(), 1);
        let ElementId::System(copy) = pasted[0] else {
            panic!("expected a system, got {:?}", pasted[0]);
        };
        assert_ne!(copy, s.pump);
        assert_eq!(s.model.element_count(), before + fragment.element_count());

        let def = s.model.get_system(copy).unwrap();
        assert_eq!(def.name, "pump_1");
        assert_eq!(def.parent, Some(root));
        assert_eq!(def.automaton.states.len(), 2);
        let names: Vec<_> = def
            .automaton
            .states
            .iter()
            .map(|st| s.model.get_state(*st).unwrap().name.clone())
            .collect();
        assert_eq!(names, vec!["on_1", "off_1"]);
        assert_eq!(def.automaton.start_state, Some(def.automaton.states[1]));

        let edge = s.model.get_edge(def.automaton.edges[0]).unwrap();
        assert_eq!(edge.kind, EdgeKind::Miss);
        assert_eq!(edge.source, def.automaton.states[0]);
        let region = s.model.get_region(def.automaton.regions[0]).unwrap();
        assert_eq!(region.states, vec![def.automaton.states[0]]);
        assert!(s.model.check_integrity().is_ok());
    }

    #[test]
    fn paste_remaps_edge_contracts_and_connections() {
        let mut s = sample();
        let root = s.model.root_id();
        let fragment = s.model.copy_fragment(
            root,
            [
                ElementId::System(s.pump),
                ElementId::System(s.tank),
                ElementId::State(s.idle),
                ElementId::State(s.busy),
            ],
        );

        let pasted = s.model.paste_fragment(root, &fragment).unwrap();
        let edge = pasted
            .iter()
            .find_map(|e| match e {
                ElementId::Edge(id) => s.model.get_edge(*id),
                _ => None,
            })
            .unwrap();
        let contract = s.model.get_contract(edge.contract.unwrap()).unwrap();
        assert_eq!(contract.owner, edge.source);
        assert_eq!(contract.name, "guard_1");

        let conn = pasted
            .iter()
            .find_map(|e| match e {
                ElementId::Connection(id) => s.model.get_connection(*id),
                _ => None,
            })
            .unwrap();
        assert_ne!(conn.id, s.conn);
        assert_eq!(s.model.get_port(conn.source).unwrap().name, "out_1");
        assert_eq!(s.model.get_port(conn.destination).unwrap().name, "in_1");
        assert!(s.model.check_integrity().is_ok());
    }

    #[test]
    fn partial_region_keeps_only_copied_members() {
        let mut s = sample();
        let root = s.model.root_id();
        let region = s
            .model
            .add_region(root, "work".into(), vec![s.idle, s.busy])
            .unwrap();
        let fragment = s
            .model
            .copy_fragment(root, [ElementId::State(s.busy), ElementId::Region(region)]);

        let pasted = s.model.paste_fragment(s.tank, &fragment).unwrap();
        let ElementId::Region(copy) = pasted[1] else {
            panic!("expected a region, got {:?}", pasted[1]);
        };
        let ElementId::State(busy_copy) = pasted[0] else {
            panic!("expected a state, got {:?}", pasted[0]);
        };
        assert_eq!(s.model.get_region(copy).unwrap().states, vec![busy_copy]);
        assert_eq!(
            s.model.get_system(s.tank).unwrap().automaton.start_state,
            Some(busy_copy)
        );
    }

    #[test]
    fn paste_into_missing_target_changes_nothing() {
        let mut s = sample();
        let fragment = s
            .model
            .copy_fragment(s.model.root_id(), [ElementId::System(s.pump)]);
        let before = s.model.clone();
        assert_eq!(
            s.model.paste_fragment(SystemId(42), &fragment),
            Err(CoreError::SystemNotFound { id: SystemId(42) })
        );
        assert_eq!(s.model, before);
    }
}
