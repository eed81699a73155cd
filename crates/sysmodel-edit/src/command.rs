//! Edit commands and their inverses.
//!
//! [`EditCommand`] is the closed set of operations the editor can run. Each
//! variant carries what it needs to run and, once run, what it captured to
//! compute its own inverse: a Delete holds the detached record after it has
//! run, a Create holds the ID it allocated, a property change holds the
//! previous value.
//!
//! `run` returns `Ok(false)` when a precondition is not met. Nothing has
//! been mutated in that case. `Err` is a hard failure after a mutation may
//! already have happened; it is not rolled back.

use serde::{Deserialize, Serialize};
use sysmodel_core::{
    Condition, ConnectionId, ContractId, CoreError, Detached, DetachedContract, EdgeId, ElementId,
    PortId, PropertyChange, RegionId, StateId, SystemId, Visibility,
};

use crate::context::EditContext;
use crate::error::EditError;
use crate::resolver::{deletion_command, resolve_closure};
use crate::selection::Selection;

/// An ordered group of commands run as one edit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompositeCommand {
    pub commands: Vec<EditCommand>,
}

impl CompositeCommand {
    pub fn new(commands: Vec<EditCommand>) -> Self {
        CompositeCommand { commands }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Runs the commands in order, stopping at the first one that declines.
    /// Commands that already ran stay applied.
    pub fn run(&mut self, ctx: &mut EditContext<'_>) -> Result<bool, EditError> {
        for (index, command) in self.commands.iter_mut().enumerate() {
            if !command.run(ctx)? {
                tracing::debug!(
                    "composite stopped at command {} of {}",
                    index + 1,
                    self.commands.len()
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// The inverses of all commands, in reverse order. `None` if the
    /// composite is empty or any command has no inverse.
    pub fn inverse(&self) -> Option<CompositeCommand> {
        if self.commands.is_empty() {
            return None;
        }
        let inverses = self
            .commands
            .iter()
            .rev()
            .map(EditCommand::inverse)
            .collect::<Option<Vec<_>>>()?;
        Some(CompositeCommand::new(inverses))
    }
}

/// A single edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EditCommand {
    // -- removal and restoration --------------------------------------------
    /// Removes one element. The element must no longer be referenced.
    Delete {
        element: ElementId,
        #[serde(default)]
        detached: Option<Detached>,
    },
    /// Re-inserts a previously deleted element at its recorded slots.
    Restore { detached: Detached },
    /// Removes a contract and clears it from the edges that used it.
    DeleteContract {
        contract: ContractId,
        #[serde(default)]
        detached: Option<DetachedContract>,
    },
    RestoreContract { detached: DetachedContract },

    // -- creation -----------------------------------------------------------
    CreateSystem {
        parent: SystemId,
        name: String,
        #[serde(default)]
        created: Option<SystemId>,
    },
    CreatePort {
        system: SystemId,
        name: String,
        visibility: Visibility,
        #[serde(default)]
        created: Option<PortId>,
    },
    CreateConnection {
        system: SystemId,
        source: PortId,
        destination: PortId,
        #[serde(default)]
        created: Option<ConnectionId>,
    },
    CreateState {
        system: SystemId,
        name: String,
        #[serde(default)]
        created: Option<StateId>,
    },
    CreateEdge {
        source: StateId,
        destination: StateId,
        #[serde(default)]
        created: Option<EdgeId>,
    },
    CreateRegion {
        system: SystemId,
        name: String,
        states: Vec<StateId>,
        #[serde(default)]
        created: Option<RegionId>,
    },
    CreateContract {
        state: StateId,
        name: String,
        precondition: Condition,
        postcondition: Condition,
        #[serde(default)]
        created: Option<ContractId>,
    },

    // -- properties ---------------------------------------------------------
    ChangeProperty {
        change: PropertyChange,
        #[serde(default)]
        previous: Option<PropertyChange>,
    },

    // -- view actions (not undoable) ----------------------------------------
    /// Selects `elements`, replacing the selection or adding to it.
    Select {
        elements: Vec<ElementId>,
        new_selection: bool,
    },
    Deselect { elements: Vec<ElementId> },
    SelectionBack,
    SelectionForward,
    SwitchView { system: SystemId },

    // -- clipboard ----------------------------------------------------------
    /// Copies the selected elements of the active view to the clipboard.
    /// Not undoable.
    Copy,
    /// Pastes the clipboard into `scope` and selects what was pasted.
    Paste {
        /// System to paste into. Defaults to the active view.
        #[serde(default)]
        scope: Option<SystemId>,
        /// The new top-level elements.
        #[serde(default)]
        pasted: Vec<ElementId>,
    },

    // -- groups -------------------------------------------------------------
    Composite(CompositeCommand),
    /// Deletes the requested elements together with everything that
    /// depends on them, and prunes them from the selection history.
    DeleteSelection {
        requested: Vec<ElementId>,
        /// System the request is made in. Defaults to the active view.
        #[serde(default)]
        scope: Option<SystemId>,
        /// The Delete commands that ran.
        #[serde(default)]
        group: Option<CompositeCommand>,
        /// Every element that was removed, in deletion order.
        #[serde(default)]
        deleted: Vec<ElementId>,
    },
    /// Restores a deleted selection and reselects what is visible in the
    /// active view.
    RestoreSelection {
        group: CompositeCommand,
        scope: SystemId,
        restored: Vec<ElementId>,
    },
}

impl EditCommand {
    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            EditCommand::Delete { .. } => "delete",
            EditCommand::Restore { .. } => "restore",
            EditCommand::DeleteContract { .. } => "delete contract",
            EditCommand::RestoreContract { .. } => "restore contract",
            EditCommand::CreateSystem { .. } => "create system",
            EditCommand::CreatePort { .. } => "create port",
            EditCommand::CreateConnection { .. } => "create connection",
            EditCommand::CreateState { .. } => "create state",
            EditCommand::CreateEdge { .. } => "create edge",
            EditCommand::CreateRegion { .. } => "create region",
            EditCommand::CreateContract { .. } => "create contract",
            EditCommand::ChangeProperty { .. } => "change property",
            EditCommand::Select { .. } => "select",
            EditCommand::Deselect { .. } => "deselect",
            EditCommand::SelectionBack => "selection back",
            EditCommand::SelectionForward => "selection forward",
            EditCommand::SwitchView { .. } => "switch view",
            EditCommand::Copy => "copy",
            EditCommand::Paste { .. } => "paste",
            EditCommand::Composite(_) => "composite",
            EditCommand::DeleteSelection { .. } => "delete selection",
            EditCommand::RestoreSelection { .. } => "restore selection",
        }
    }

    /// Whether this command is meant to be undone. View actions are not.
    pub fn is_undoable(&self) -> bool {
        match self {
            EditCommand::Select { .. }
            | EditCommand::Deselect { .. }
            | EditCommand::SelectionBack
            | EditCommand::SelectionForward
            | EditCommand::SwitchView { .. }
            | EditCommand::Copy => false,
            EditCommand::Composite(group) => {
                !group.is_empty() && group.commands.iter().all(EditCommand::is_undoable)
            }
            _ => true,
        }
    }

    /// Applies the command to the model in `ctx`.
    pub fn run(&mut self, ctx: &mut EditContext<'_>) -> Result<bool, EditError> {
        match self {
            EditCommand::Delete { element, detached } => {
                let element = *element;
                if !ctx.model.contains(element) {
                    return Ok(declined(element, "element does not exist"));
                }
                if let Err(err) = ctx.model.check_detach(element) {
                    return Ok(declined(element, &err.to_string()));
                }
                *detached = Some(ctx.model.detach(element)?);
                Ok(true)
            }
            EditCommand::Restore { detached } => {
                let element = detached.element();
                if let Err(err) = ctx.model.check_attach(detached) {
                    return Ok(declined(element, &err.to_string()));
                }
                ctx.model.attach(detached.clone())?;
                Ok(true)
            }
            EditCommand::DeleteContract { contract, detached } => {
                if ctx.model.get_contract(*contract).is_none() {
                    tracing::warn!("contract {} does not exist", contract);
                    return Ok(false);
                }
                *detached = Some(ctx.model.detach_contract(*contract)?);
                Ok(true)
            }
            EditCommand::RestoreContract { detached } => {
                if let Err(err) = ctx.model.check_attach_contract(detached) {
                    tracing::warn!("cannot restore contract {}: {}", detached.def.id, err);
                    return Ok(false);
                }
                ctx.model.attach_contract(detached.clone())?;
                Ok(true)
            }
            EditCommand::CreateSystem {
                parent,
                name,
                created,
            } => created_with(created, ctx.model.add_system(*parent, name.clone())),
            EditCommand::CreatePort {
                system,
                name,
                visibility,
                created,
            } => created_with(
                created,
                ctx.model.add_port(*system, name.clone(), *visibility),
            ),
            EditCommand::CreateConnection {
                system,
                source,
                destination,
                created,
            } => created_with(
                created,
                ctx.model.add_connection(*system, *source, *destination),
            ),
            EditCommand::CreateState {
                system,
                name,
                created,
            } => created_with(created, ctx.model.add_state(*system, name.clone())),
            EditCommand::CreateEdge {
                source,
                destination,
                created,
            } => created_with(created, ctx.model.add_edge(*source, *destination)),
            EditCommand::CreateRegion {
                system,
                name,
                states,
                created,
            } => created_with(
                created,
                ctx.model.add_region(*system, name.clone(), states.clone()),
            ),
            EditCommand::CreateContract {
                state,
                name,
                precondition,
                postcondition,
                created,
            } => created_with(
                created,
                ctx.model.add_contract(
                    *state,
                    name.clone(),
                    precondition.clone(),
                    postcondition.clone(),
                ),
            ),
            EditCommand::ChangeProperty { change, previous } => {
                match ctx.model.apply_property(change) {
                    Ok(Some(old)) => {
                        *previous = Some(old);
                        Ok(true)
                    }
                    Ok(None) => {
                        tracing::warn!("property already has the requested value");
                        Ok(false)
                    }
                    Err(err) => {
                        tracing::warn!("property change declined: {}", err);
                        Ok(false)
                    }
                }
            }
            EditCommand::Select {
                elements,
                new_selection,
            } => {
                let mut chosen: Selection = elements
                    .iter()
                    .copied()
                    .filter(|e| ctx.model.contains(*e))
                    .collect();
                if !*new_selection {
                    chosen.extend(ctx.selection.current().iter().copied());
                }
                Ok(ctx.selection.select(chosen))
            }
            EditCommand::Deselect { elements } => {
                let chosen: Selection = elements.iter().copied().collect();
                Ok(ctx.selection.deselect(&chosen))
            }
            EditCommand::SelectionBack => Ok(ctx.selection.go_back()),
            EditCommand::SelectionForward => Ok(ctx.selection.go_forward()),
            EditCommand::SwitchView { system } => {
                if ctx.model.get_system(*system).is_none() || *ctx.view == *system {
                    return Ok(false);
                }
                *ctx.view = *system;
                Ok(true)
            }
            EditCommand::Copy => {
                let selected = ctx.selection.current().iter().copied();
                let fragment = ctx.model.copy_fragment(*ctx.view, selected);
                if fragment.is_empty() {
                    tracing::debug!("nothing copyable selected in view {}", ctx.view);
                    return Ok(false);
                }
                tracing::debug!("copied {} element(s)", fragment.element_count());
                *ctx.clipboard = Some(fragment);
                Ok(true)
            }
            EditCommand::Paste { scope, pasted } => {
                let target = scope.unwrap_or(*ctx.view);
                let fragment = match &*ctx.clipboard {
                    Some(fragment) if !fragment.is_empty() => fragment,
                    _ => {
                        tracing::warn!("clipboard is empty");
                        return Ok(false);
                    }
                };
                if ctx.model.get_system(target).is_none() {
                    tracing::warn!("cannot paste into missing system {}", target);
                    return Ok(false);
                }
                *pasted = ctx.model.paste_fragment(target, fragment)?;
                *scope = Some(target);
                ensure_integrity(ctx)?;

                ctx.selection.select(pasted.iter().copied().collect());
                Ok(true)
            }
            EditCommand::Composite(group) => group.run(ctx),
            EditCommand::DeleteSelection {
                requested,
                scope,
                group,
                deleted,
            } => {
                let resolved_scope = scope.unwrap_or(*ctx.view);
                let closure =
                    resolve_closure(&*ctx.model, resolved_scope, requested.iter().copied());
                if closure.is_empty() {
                    tracing::warn!("nothing to delete for {} requested element(s)", requested.len());
                    return Ok(false);
                }
                let mut deletion = deletion_command(&closure);
                tracing::debug!(
                    "deleting {} element(s) for {} requested",
                    deletion.len(),
                    requested.len()
                );
                if !deletion.run(ctx)? {
                    return Ok(false);
                }
                ensure_integrity(ctx)?;

                let removed: Selection = closure.iter().copied().collect();
                ctx.selection.update_selections(&removed);
                *deleted = closure.into_iter().collect();
                *group = Some(deletion);
                *scope = Some(resolved_scope);
                Ok(true)
            }
            EditCommand::RestoreSelection {
                group,
                restored,
                ..
            } => {
                if !group.run(ctx)? {
                    return Ok(false);
                }
                ensure_integrity(ctx)?;

                let visible: Selection = ctx
                    .model
                    .viewable_elements(*ctx.view)
                    .into_iter()
                    .filter(|e| restored.contains(e))
                    .collect();
                ctx.selection.select(visible);
                Ok(true)
            }
        }
    }

    /// The command that reverses this one, or `None` for view actions and
    /// for commands that have not captured what they need yet.
    pub fn inverse(&self) -> Option<EditCommand> {
        match self {
            EditCommand::Delete { detached, .. } => detached
                .clone()
                .map(|detached| EditCommand::Restore { detached }),
            EditCommand::Restore { detached } => Some(EditCommand::Delete {
                element: detached.element(),
                detached: None,
            }),
            EditCommand::DeleteContract { detached, .. } => detached
                .clone()
                .map(|detached| EditCommand::RestoreContract { detached }),
            EditCommand::RestoreContract { detached } => Some(EditCommand::DeleteContract {
                contract: detached.def.id,
                detached: None,
            }),
            EditCommand::CreateSystem { created, .. } => created.map(|id| delete(id.into())),
            EditCommand::CreatePort { created, .. } => created.map(|id| delete(id.into())),
            EditCommand::CreateConnection { created, .. } => created.map(|id| delete(id.into())),
            EditCommand::CreateState { created, .. } => created.map(|id| delete(id.into())),
            EditCommand::CreateEdge { created, .. } => created.map(|id| delete(id.into())),
            EditCommand::CreateRegion { created, .. } => created.map(|id| delete(id.into())),
            EditCommand::CreateContract { created, .. } => {
                created.map(|contract| EditCommand::DeleteContract {
                    contract,
                    detached: None,
                })
            }
            EditCommand::ChangeProperty { previous, .. } => {
                previous.clone().map(|change| EditCommand::ChangeProperty {
                    change,
                    previous: None,
                })
            }
            EditCommand::Select { .. }
            | EditCommand::Deselect { .. }
            | EditCommand::SelectionBack
            | EditCommand::SelectionForward
            | EditCommand::SwitchView { .. }
            | EditCommand::Copy => None,
            EditCommand::Paste { scope, pasted } => {
                if pasted.is_empty() {
                    return None;
                }
                Some(EditCommand::DeleteSelection {
                    requested: pasted.clone(),
                    scope: Some((*scope)?),
                    group: None,
                    deleted: Vec::new(),
                })
            }
            EditCommand::Composite(group) => group.inverse().map(EditCommand::Composite),
            EditCommand::DeleteSelection {
                scope,
                group,
                deleted,
                ..
            } => {
                let group = group.as_ref()?.inverse()?;
                Some(EditCommand::RestoreSelection {
                    group,
                    scope: (*scope)?,
                    restored: deleted.clone(),
                })
            }
            EditCommand::RestoreSelection {
                scope, restored, ..
            } => Some(EditCommand::DeleteSelection {
                requested: restored.clone(),
                scope: Some(*scope),
                group: None,
                deleted: Vec::new(),
            }),
        }
    }
}

fn delete(element: ElementId) -> EditCommand {
    EditCommand::Delete {
        element,
        detached: None,
    }
}

fn declined(element: ElementId, reason: &str) -> bool {
    tracing::warn!("{} declined: {}", element, reason);
    false
}

/// Records the ID a builder call produced. Builder errors happen before any
/// mutation, so they decline the command.
fn created_with<T: Copy>(
    slot: &mut Option<T>,
    result: Result<T, CoreError>,
) -> Result<bool, EditError> {
    match result {
        Ok(id) => {
            *slot = Some(id);
            Ok(true)
        }
        Err(err) => {
            tracing::warn!("creation declined: {}", err);
            Ok(false)
        }
    }
}

fn ensure_integrity(ctx: &EditContext<'_>) -> Result<(), EditError> {
    if cfg!(debug_assertions) {
        ctx.model
            .check_integrity()
            .map_err(|err| EditError::DomainViolation {
                reason: err.to_string(),
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SelectionManager;
    use sysmodel_core::{Fragment, NameTarget, SystemModel};

    struct Fixture {
        model: SystemModel,
        selection: SelectionManager,
        view: SystemId,
        clipboard: Option<Fragment>,
    }

    impl Fixture {
        fn new() -> Self {
            let model = SystemModel::new("root");
            let view = model.root_id();
            Fixture {
                model,
                selection: SelectionManager::default(),
                view,
                clipboard: None,
            }
        }

        fn run(&mut self, command: &mut EditCommand) -> Result<bool, EditError> {
            let mut ctx = EditContext {
                model: &mut self.model,
                selection: &mut self.selection,
                view: &mut self.view,
                clipboard: &mut self.clipboard,
            };
            command.run(&mut ctx)
        }
    }

    #[test]
    fn create_then_inverse_deletes() {
        let mut fx = Fixture::new();
        let root = fx.view;
        let mut create = EditCommand::CreateState {
            system: root,
            name: "idle".into(),
            created: None,
        };
        assert!(fx.run(&mut create).unwrap());
        let EditCommand::CreateState {
            created: Some(state),
            ..
        } = create
        else {
            panic!("state id not recorded");
        };

        let mut undo = create.inverse().unwrap();
        assert!(fx.run(&mut undo).unwrap());
        assert!(fx.model.get_state(state).is_none());

        // Redo re-inserts the same state.
        let mut redo = undo.inverse().unwrap();
        assert!(fx.run(&mut redo).unwrap());
        assert_eq!(fx.model.get_state(state).unwrap().name, "idle");
        assert_eq!(
            fx.model.get_system(root).unwrap().automaton.start_state,
            Some(state)
        );
    }

    #[test]
    fn delete_declines_softly() {
        let mut fx = Fixture::new();
        let root = fx.view;
        let s = fx.model.add_state(root, "s".into()).unwrap();
        fx.model.add_edge(s, s).unwrap();
        let before = fx.model.clone();

        let mut referenced = delete(ElementId::State(s));
        assert!(!fx.run(&mut referenced).unwrap());
        assert!(referenced.inverse().is_none());

        let mut missing = delete(ElementId::Port(PortId(40)));
        assert!(!fx.run(&mut missing).unwrap());

        let mut root_delete = delete(ElementId::System(root));
        assert!(!fx.run(&mut root_delete).unwrap());
        assert_eq!(fx.model, before);
    }

    #[test]
    fn invalid_connection_declines() {
        let mut fx = Fixture::new();
        let root = fx.view;
        let a = fx.model.add_system(root, "a".into()).unwrap();
        let b = fx.model.add_system(root, "b".into()).unwrap();
        let inp = fx.model.add_port(a, "i".into(), Visibility::Input).unwrap();
        let out = fx.model.add_port(b, "o".into(), Visibility::Output).unwrap();

        let mut wrong_way = EditCommand::CreateConnection {
            system: root,
            source: inp,
            destination: out,
            created: None,
        };
        assert!(!fx.run(&mut wrong_way).unwrap());
        assert!(wrong_way.inverse().is_none());
    }

    #[test]
    fn rename_round_trips_and_rejects_empty() {
        let mut fx = Fixture::new();
        let root = fx.view;
        let a = fx.model.add_system(root, "a".into()).unwrap();

        let mut empty = EditCommand::ChangeProperty {
            change: PropertyChange::Name {
                target: NameTarget::System(a),
                name: String::new(),
            },
            previous: None,
        };
        assert!(!fx.run(&mut empty).unwrap());

        let mut rename = EditCommand::ChangeProperty {
            change: PropertyChange::Name {
                target: NameTarget::System(a),
                name: "pump".into(),
            },
            previous: None,
        };
        assert!(fx.run(&mut rename).unwrap());
        let mut back = rename.inverse().unwrap();
        assert!(fx.run(&mut back).unwrap());
        assert_eq!(fx.model.get_system(a).unwrap().name, "a");
    }

    #[test]
    fn composite_inverse_reverses_order() {
        let a = delete(ElementId::State(StateId(1)));
        let b = EditCommand::ChangeProperty {
            change: PropertyChange::EdgePriority {
                edge: EdgeId(0),
                priority: 3,
            },
            previous: Some(PropertyChange::EdgePriority {
                edge: EdgeId(0),
                priority: 1,
            }),
        };
        // `a` has not run, so it has no inverse yet.
        let group = CompositeCommand::new(vec![a, b.clone()]);
        assert!(group.inverse().is_none());

        let c = EditCommand::CreateSystem {
            parent: SystemId(0),
            name: "x".into(),
            created: Some(SystemId(5)),
        };
        let group = CompositeCommand::new(vec![c.clone(), b.clone()]);
        let inverse = group.inverse().unwrap();
        assert_eq!(
            inverse.commands,
            vec![b.inverse().unwrap(), c.inverse().unwrap()]
        );
        assert!(CompositeCommand::default().inverse().is_none());
    }

    #[test]
    fn view_actions_have_no_inverse() {
        let mut fx = Fixture::new();
        let root = fx.view;
        let a = fx.model.add_system(root, "a".into()).unwrap();

        let mut select = EditCommand::Select {
            elements: vec![ElementId::System(a)],
            new_selection: true,
        };
        assert!(fx.run(&mut select).unwrap());
        assert!(select.inverse().is_none());
        assert!(!select.is_undoable());

        let mut switch = EditCommand::SwitchView { system: a };
        assert!(fx.run(&mut switch).unwrap());
        assert_eq!(fx.view, a);
        assert!(!fx.run(&mut switch).unwrap());
        assert!(switch.inverse().is_none());
    }

    #[test]
    fn contract_delete_and_restore() {
        let mut fx = Fixture::new();
        let root = fx.view;
        let s1 = fx.model.add_state(root, "s1".into()).unwrap();
        let s2 = fx.model.add_state(root, "s2".into()).unwrap();
        let e = fx.model.add_edge(s1, s2).unwrap();
        let c = fx
            .model
            .add_contract(s1, "c".into(), Condition::truth(), Condition::truth())
            .unwrap();
        let mut annotate = EditCommand::ChangeProperty {
            change: PropertyChange::EdgeContract {
                edge: e,
                contract: Some(c),
            },
            previous: None,
        };
        assert!(fx.run(&mut annotate).unwrap());
        let before = fx.model.clone();

        let mut remove = EditCommand::DeleteContract {
            contract: c,
            detached: None,
        };
        assert!(fx.run(&mut remove).unwrap());
        assert_eq!(fx.model.get_edge(e).unwrap().contract, None);
        assert!(fx.model.get_edge(e).is_some());

        let mut restore = remove.inverse().unwrap();
        assert!(fx.run(&mut restore).unwrap());
        assert_eq!(fx.model, before);
    }

    #[test]
    fn commands_serialize_with_type_tag() {
        let command = EditCommand::SwitchView {
            system: SystemId(2),
        };
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["type"], "SwitchView");
        let back: EditCommand = serde_json::from_value(json).unwrap();
        assert_eq!(back, command);
    }
}
