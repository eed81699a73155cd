//! Cascading-delete resolution.
//!
//! [`resolve_closure`] turns a deletion request into the full ordered set of
//! elements that must go with it so nothing is left dangling. The set is
//! ordered so that every element comes after everything that references it:
//! running one Delete per entry in order never trips a still-referenced
//! check, and running the inverses in reverse order restores owners before
//! their members.
//!
//! The walk threads the result set through each recursive call by value.
//! It doubles as the visited set.

use indexmap::IndexSet;
use sysmodel_core::{ElementId, PortId, StateId, SystemId, SystemModel};

use crate::command::{CompositeCommand, EditCommand};

pub type Closure = IndexSet<ElementId>;

/// Computes the deletion closure of `requested`, with `scope` as the system
/// the request is made in (the active view).
///
/// Elements that are not in the model, and the root system, are skipped.
pub fn resolve_closure(
    model: &SystemModel,
    scope: SystemId,
    requested: impl IntoIterator<Item = ElementId>,
) -> Closure {
    requested
        .into_iter()
        .fold(Closure::new(), |acc, element| visit(model, scope, element, acc))
}

/// Builds the composite of Delete commands for a closure, in closure order.
pub fn deletion_command(closure: &Closure) -> CompositeCommand {
    CompositeCommand::new(
        closure
            .iter()
            .map(|&element| EditCommand::Delete {
                element,
                detached: None,
            })
            .collect(),
    )
}

fn visit(model: &SystemModel, scope: SystemId, element: ElementId, acc: Closure) -> Closure {
    if acc.contains(&element) || !model.contains(element) {
        return acc;
    }
    match element {
        ElementId::System(id) => visit_system(model, id, acc),
        ElementId::Port(id) => visit_port(model, scope, id, acc),
        ElementId::State(id) => visit_state(model, id, acc),
        ElementId::Connection(_) | ElementId::Edge(_) | ElementId::Region(_) => {
            with(acc, element)
        }
    }
}

fn with(mut acc: Closure, element: ElementId) -> Closure {
    acc.insert(element);
    acc
}

fn visit_system(model: &SystemModel, id: SystemId, acc: Closure) -> Closure {
    let Some(def) = model.get_system(id) else {
        return acc;
    };
    if def.parent.is_none() {
        tracing::warn!("ignoring deletion request for the root system {}", id);
        return acc;
    }

    let acc = def
        .children
        .iter()
        .fold(acc, |acc, &child| visit(model, id, ElementId::System(child), acc));
    let acc = def
        .ports
        .iter()
        .fold(acc, |acc, &port| visit(model, id, ElementId::Port(port), acc));
    let acc = def
        .connections
        .iter()
        .fold(acc, |acc, &conn| with(acc, ElementId::Connection(conn)));
    let automaton = &def.automaton;
    let acc = automaton
        .states
        .iter()
        .fold(acc, |acc, &state| visit(model, id, ElementId::State(state), acc));
    let acc = automaton
        .edges
        .iter()
        .fold(acc, |acc, &edge| with(acc, ElementId::Edge(edge)));
    let acc = automaton
        .regions
        .iter()
        .fold(acc, |acc, &region| with(acc, ElementId::Region(region)));
    with(acc, ElementId::System(id))
}

fn visit_state(model: &SystemModel, id: StateId, acc: Closure) -> Closure {
    let acc = model
        .edges_touching(id)
        .into_iter()
        .fold(acc, |acc, edge| with(acc, ElementId::Edge(edge)));
    with(acc, ElementId::State(id))
}

fn visit_port(model: &SystemModel, scope: SystemId, id: PortId, acc: Closure) -> Closure {
    let Some(containing) = containing_system(model, scope, id) else {
        return with(acc, ElementId::Port(id));
    };
    let parent = model.get_system(containing).and_then(|s| s.parent);

    let acc = [Some(containing), parent]
        .into_iter()
        .flatten()
        .flat_map(|system| model.connections_touching(system, id))
        .fold(acc, |acc, conn| with(acc, ElementId::Connection(conn)));
    with(acc, ElementId::Port(id))
}

/// The system a port belongs to, looked up from `scope`: the scope itself if
/// the port is one of its own, else the child of the scope that owns it,
/// else whatever the model's owner query says.
fn containing_system(model: &SystemModel, scope: SystemId, port: PortId) -> Option<SystemId> {
    let scope_def = model.get_system(scope)?;
    if scope_def.ports.contains(&port) {
        return Some(scope);
    }
    scope_def
        .children
        .iter()
        .copied()
        .find(|child| {
            model
                .get_system(*child)
                .is_some_and(|c| c.ports.contains(&port))
        })
        .or_else(|| model.owner_of(ElementId::Port(port)))
}
