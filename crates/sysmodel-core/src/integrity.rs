//! Whole-model integrity checking.
//!
//! [`SystemModel::check_integrity`] walks every map and every membership
//! collection and reports the first broken invariant: a containment cycle, an
//! owner that does not list its element, a listed element that does not name
//! its owner back, or a cross-reference to an element that is gone.

use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;

use crate::error::CoreError;
use crate::id::{ElementId, SystemId};
use crate::model::SystemModel;

fn broken(reason: String) -> CoreError {
    CoreError::GraphInconsistency { reason }
}

/// Returns an error unless `list` contains `item` exactly once.
fn listed_once<T: PartialEq>(list: &[T], item: &T, what: impl FnOnce() -> String) -> Result<(), CoreError> {
    match list.iter().filter(|x| *x == item).count() {
        1 => Ok(()),
        0 => Err(broken(format!("{} is missing", what()))),
        n => Err(broken(format!("{} is listed {} times", what(), n))),
    }
}

impl SystemModel {
    /// Verifies every structural invariant of the model.
    pub fn check_integrity(&self) -> Result<(), CoreError> {
        self.check_containment()?;
        self.check_ports_and_connections()?;
        self.check_automata()?;
        Ok(())
    }

    fn check_containment(&self) -> Result<(), CoreError> {
        let root = self
            .systems
            .get(&self.root)
            .ok_or(CoreError::SystemNotFound { id: self.root })?;
        if root.parent.is_some() {
            return Err(broken(format!("root system {} has a parent", self.root)));
        }

        let mut tree: DiGraphMap<SystemId, ()> = DiGraphMap::new();
        for (id, def) in &self.systems {
            tree.add_node(*id);
            if def.id != *id {
                return Err(broken(format!("system {} is stored under id {}", def.id, id)));
            }
            match def.parent {
                Some(parent) => {
                    let parent_def = self
                        .systems
                        .get(&parent)
                        .ok_or(CoreError::SystemNotFound { id: parent })?;
                    listed_once(&parent_def.children, id, || {
                        format!("system {} in children of {}", id, parent)
                    })?;
                    tree.add_edge(parent, *id, ());
                }
                None if *id != self.root => {
                    return Err(broken(format!("system {} has no parent", id)));
                }
                None => {}
            }
            for child in &def.children {
                let child_def = self
                    .systems
                    .get(child)
                    .ok_or(CoreError::SystemNotFound { id: *child })?;
                if child_def.parent != Some(*id) {
                    return Err(broken(format!(
                        "system {} lists child {} that names another parent",
                        id, child
                    )));
                }
            }
        }

        if is_cyclic_directed(&tree) {
            let id = tree
                .nodes()
                .find(|n| *n != self.root && !self.is_ancestor_or_self(self.root, *n))
                .unwrap_or(self.root);
            return Err(CoreError::ContainmentCycle { id });
        }
        Ok(())
    }

    fn check_ports_and_connections(&self) -> Result<(), CoreError> {
        for (id, port) in &self.ports {
            let owner = self
                .systems
                .get(&port.owner)
                .ok_or(CoreError::SystemNotFound { id: port.owner })?;
            listed_once(&owner.ports, id, || format!("port {} in system {}", id, port.owner))?;
            for conn in &port.incoming {
                let def = self
                    .connections
                    .get(conn)
                    .ok_or(CoreError::ConnectionNotFound { id: *conn })?;
                if def.destination != *id {
                    return Err(broken(format!(
                        "port {} lists incoming connection {} that ends elsewhere",
                        id, conn
                    )));
                }
            }
            for conn in &port.outgoing {
                let def = self
                    .connections
                    .get(conn)
                    .ok_or(CoreError::ConnectionNotFound { id: *conn })?;
                if def.source != *id {
                    return Err(broken(format!(
                        "port {} lists outgoing connection {} that starts elsewhere",
                        id, conn
                    )));
                }
            }
        }

        for (id, conn) in &self.connections {
            let owner = self
                .systems
                .get(&conn.owner)
                .ok_or(CoreError::SystemNotFound { id: conn.owner })?;
            listed_once(&owner.connections, id, || {
                format!("connection {} in system {}", id, conn.owner)
            })?;
            for (port_id, outgoing) in [(conn.source, true), (conn.destination, false)] {
                let port = self
                    .ports
                    .get(&port_id)
                    .ok_or(CoreError::PortNotFound { id: port_id })?;
                let list = if outgoing { &port.outgoing } else { &port.incoming };
                listed_once(list, id, || format!("connection {} at port {}", id, port_id))?;
                let reachable = port.owner == conn.owner
                    || self
                        .systems
                        .get(&port.owner)
                        .is_some_and(|s| s.parent == Some(conn.owner));
                if !reachable {
                    return Err(broken(format!(
                        "connection {} reaches port {} outside system {}",
                        id, port_id, conn.owner
                    )));
                }
            }
        }

        for (id, system) in &self.systems {
            for port in &system.ports {
                if self.ports.get(port).map(|p| p.owner) != Some(*id) {
                    return Err(broken(format!("system {} lists foreign port {}", id, port)));
                }
            }
            for conn in &system.connections {
                if self.connections.get(conn).map(|c| c.owner) != Some(*id) {
                    return Err(broken(format!(
                        "system {} lists foreign connection {}",
                        id, conn
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_automata(&self) -> Result<(), CoreError> {
        for (id, system) in &self.systems {
            let automaton = &system.automaton;
            for state in &automaton.states {
                if self.states.get(state).map(|s| s.owner) != Some(*id) {
                    return Err(broken(format!("system {} lists foreign state {}", id, state)));
                }
            }
            for edge in &automaton.edges {
                if self.edges.get(edge).map(|e| e.owner) != Some(*id) {
                    return Err(broken(format!("system {} lists foreign edge {}", id, edge)));
                }
            }
            for region in &automaton.regions {
                if self.regions.get(region).map(|r| r.owner) != Some(*id) {
                    return Err(broken(format!("system {} lists foreign region {}", id, region)));
                }
            }
            if let Some(start) = automaton.start_state {
                if !automaton.states.contains(&start) {
                    return Err(broken(format!(
                        "start state {} of system {} is not in its automaton",
                        start, id
                    )));
                }
            }
        }

        for (id, state) in &self.states {
            let owner = self
                .systems
                .get(&state.owner)
                .ok_or(CoreError::SystemNotFound { id: state.owner })?;
            listed_once(&owner.automaton.states, id, || {
                format!("state {} in system {}", id, state.owner)
            })?;
            for contract in &state.contracts {
                let def = self
                    .contracts
                    .get(contract)
                    .ok_or(CoreError::ContractNotFound { id: *contract })?;
                if def.owner != *id {
                    return Err(broken(format!(
                        "state {} lists contract {} owned by {}",
                        id, contract, def.owner
                    )));
                }
            }
            for edge in &state.incoming {
                if self.edges.get(edge).map(|e| e.destination) != Some(*id) {
                    return Err(broken(format!("state {} lists stray incoming edge {}", id, edge)));
                }
            }
            for edge in &state.outgoing {
                if self.edges.get(edge).map(|e| e.source) != Some(*id) {
                    return Err(broken(format!("state {} lists stray outgoing edge {}", id, edge)));
                }
            }
        }

        for (id, edge) in &self.edges {
            let owner = self
                .systems
                .get(&edge.owner)
                .ok_or(CoreError::SystemNotFound { id: edge.owner })?;
            listed_once(&owner.automaton.edges, id, || {
                format!("edge {} in system {}", id, edge.owner)
            })?;
            let source = self
                .states
                .get(&edge.source)
                .ok_or(CoreError::StateNotFound { id: edge.source })?;
            let destination = self
                .states
                .get(&edge.destination)
                .ok_or(CoreError::StateNotFound { id: edge.destination })?;
            if source.owner != edge.owner || destination.owner != edge.owner {
                return Err(broken(format!("edge {} leaves its automaton", id)));
            }
            listed_once(&source.outgoing, id, || format!("edge {} at its source", id))?;
            listed_once(&destination.incoming, id, || format!("edge {} at its destination", id))?;
            if let Some(contract) = edge.contract {
                if !source.contracts.contains(&contract) {
                    return Err(broken(format!(
                        "edge {} carries contract {} of another state",
                        id, contract
                    )));
                }
            }
        }

        for (id, region) in &self.regions {
            let owner = self
                .systems
                .get(&region.owner)
                .ok_or(CoreError::SystemNotFound { id: region.owner })?;
            listed_once(&owner.automaton.regions, id, || {
                format!("region {} in system {}", id, region.owner)
            })?;
            for state in &region.states {
                if self.states.get(state).map(|s| s.owner) != Some(region.owner) {
                    return Err(broken(format!(
                        "region {} lists state {} outside its automaton",
                        id, state
                    )));
                }
            }
        }

        for (id, contract) in &self.contracts {
            let state = self
                .states
                .get(&contract.owner)
                .ok_or(CoreError::StateNotFound { id: contract.owner })?;
            listed_once(&state.contracts, id, || {
                format!("contract {} in state {}", id, contract.owner)
            })?;
        }
        Ok(())
    }

    /// Elements that hold a reference to `element` and would dangle if it
    /// were removed on its own.
    pub fn references_to(&self, element: ElementId) -> Vec<ElementId> {
        let mut refs = Vec::new();
        match element {
            ElementId::System(id) => {
                if let Some(def) = self.systems.get(&id) {
                    refs.extend(def.children.iter().map(|&c| ElementId::System(c)));
                    refs.extend(def.ports.iter().map(|&p| ElementId::Port(p)));
                    refs.extend(def.connections.iter().map(|&c| ElementId::Connection(c)));
                    refs.extend(def.automaton.states.iter().map(|&s| ElementId::State(s)));
                    refs.extend(def.automaton.edges.iter().map(|&e| ElementId::Edge(e)));
                    refs.extend(def.automaton.regions.iter().map(|&r| ElementId::Region(r)));
                }
            }
            ElementId::Port(id) => {
                if let Some(def) = self.ports.get(&id) {
                    let mut conns: Vec<_> =
                        def.outgoing.iter().chain(def.incoming.iter()).copied().collect();
                    conns.sort();
                    conns.dedup();
                    refs.extend(conns.into_iter().map(ElementId::Connection));
                }
            }
            ElementId::State(id) => {
                refs.extend(self.edges_touching(id).into_iter().map(ElementId::Edge));
            }
            ElementId::Connection(_) | ElementId::Edge(_) | ElementId::Region(_) => {}
        }
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Visibility;

    #[test]
    fn fresh_and_populated_models_are_consistent() {
        let mut model = SystemModel::new("root");
        model.check_integrity().unwrap();

        let root = model.root_id();
        let a = model.add_system(root, "a".into()).unwrap();
        let b = model.add_system(root, "b".into()).unwrap();
        let out = model.add_port(a, "o".into(), Visibility::Output).unwrap();
        let inp = model.add_port(b, "i".into(), Visibility::Input).unwrap();
        model.add_connection(root, out, inp).unwrap();
        let s = model.add_state(a, "s".into()).unwrap();
        model.add_edge(s, s).unwrap();
        model.add_region(a, "r".into(), vec![s]).unwrap();
        model.check_integrity().unwrap();
    }

    #[test]
    fn containment_cycle_is_reported() {
        let mut model = SystemModel::new("root");
        let root = model.root_id();
        let a = model.add_system(root, "a".into()).unwrap();
        let b = model.add_system(a, "b".into()).unwrap();

        // Rewire a under b so a -> b -> a.
        model.systems.get_mut(&root).unwrap().children.clear();
        model.systems.get_mut(&a).unwrap().parent = Some(b);
        model.systems.get_mut(&b).unwrap().children.push(a);

        assert!(matches!(
            model.check_integrity(),
            Err(CoreError::ContainmentCycle { .. })
        ));
    }

    #[test]
    fn dangling_region_member_is_reported() {
        let mut model = SystemModel::new("root");
        let root = model.root_id();
        let s = model.add_state(root, "s".into()).unwrap();
        let r = model.add_region(root, "r".into(), vec![s]).unwrap();
        model.states.remove(&s);
        model.systems.get_mut(&root).unwrap().automaton.states.clear();
        model.systems.get_mut(&root).unwrap().automaton.start_state = None;

        let err = model.check_integrity().unwrap_err();
        assert!(err.to_string().contains(&format!("region {}", r)));
    }

    #[test]
    fn references_to_ports_and_states() {
        let mut model = SystemModel::new("root");
        let root = model.root_id();
        let a = model.add_system(root, "a".into()).unwrap();
        let b = model.add_system(root, "b".into()).unwrap();
        let out = model.add_port(a, "o".into(), Visibility::Output).unwrap();
        let inp = model.add_port(b, "i".into(), Visibility::Input).unwrap();
        let conn = model.add_connection(root, out, inp).unwrap();
        let s = model.add_state(root, "s".into()).unwrap();
        let e = model.add_edge(s, s).unwrap();

        assert_eq!(
            model.references_to(ElementId::Port(inp)),
            vec![ElementId::Connection(conn)]
        );
        assert_eq!(model.references_to(ElementId::State(s)), vec![ElementId::Edge(e)]);
        assert!(model.references_to(ElementId::Edge(e)).is_empty());
    }
}
