//! Editing session.
//!
//! [`Editor`] owns one model, one selection, one history, the active view
//! and the clipboard, and is the surface the UI talks to. After every operation it drops
//! vanished elements from the selection history.

use sysmodel_core::{ElementId, Fragment, SystemId, SystemModel};

use crate::command::EditCommand;
use crate::config::EditorConfig;
use crate::context::EditContext;
use crate::history::{HistoryManager, Outcome};
use crate::selection::{Selection, SelectionManager};

#[derive(Debug, Clone)]
pub struct Editor {
    model: SystemModel,
    selection: SelectionManager,
    history: HistoryManager,
    view: SystemId,
    clipboard: Option<Fragment>,
    last_deleted: Vec<ElementId>,
}

impl Editor {
    /// Opens a session on `model` with the root system as the active view.
    pub fn new(model: SystemModel, config: &EditorConfig) -> Self {
        let view = model.root_id();
        Editor {
            model,
            selection: SelectionManager::new(config.selection_history_capacity),
            history: HistoryManager::new(config.history_capacity),
            view,
            clipboard: None,
            last_deleted: Vec::new(),
        }
    }

    pub fn model(&self) -> &SystemModel {
        &self.model
    }

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn view(&self) -> SystemId {
        self.view
    }

    /// What the last successful copy put on the clipboard.
    pub fn clipboard(&self) -> Option<&Fragment> {
        self.clipboard.as_ref()
    }

    /// Everything the most recent successful `delete_selection` removed.
    pub fn last_deleted(&self) -> &[ElementId] {
        &self.last_deleted
    }

    pub fn take_alerts(&mut self) -> Vec<String> {
        self.history.take_alerts()
    }

    pub fn run(&mut self, command: EditCommand) -> Outcome {
        let mut ctx = EditContext {
            model: &mut self.model,
            selection: &mut self.selection,
            view: &mut self.view,
            clipboard: &mut self.clipboard,
        };
        let outcome = self.history.run(command, &mut ctx);
        self.settle();
        outcome
    }

    pub fn undo(&mut self) -> Outcome {
        let mut ctx = EditContext {
            model: &mut self.model,
            selection: &mut self.selection,
            view: &mut self.view,
            clipboard: &mut self.clipboard,
        };
        let outcome = self.history.undo(&mut ctx);
        self.settle();
        outcome
    }

    pub fn redo(&mut self) -> Outcome {
        let mut ctx = EditContext {
            model: &mut self.model,
            selection: &mut self.selection,
            view: &mut self.view,
            clipboard: &mut self.clipboard,
        };
        let outcome = self.history.redo(&mut ctx);
        self.settle();
        outcome
    }

    /// Deletes `elements` and everything depending on them, as seen from the
    /// active view, as one undoable edit.
    pub fn delete_selection(&mut self, elements: impl IntoIterator<Item = ElementId>) -> Outcome {
        let command = EditCommand::DeleteSelection {
            requested: elements.into_iter().collect(),
            scope: Some(self.view),
            group: None,
            deleted: Vec::new(),
        };
        let outcome = self.run(command);
        if outcome == Outcome::Applied {
            if let Some(EditCommand::RestoreSelection { restored, .. }) = self.history.peek_undo() {
                self.last_deleted = restored.clone();
            }
        }
        outcome
    }

    /// Deletes whatever is currently selected.
    pub fn delete_selected(&mut self) -> Outcome {
        let selected: Vec<ElementId> = self.selection.current().iter().copied().collect();
        self.delete_selection(selected)
    }

    pub fn select(&mut self, elements: impl IntoIterator<Item = ElementId>) -> Outcome {
        self.run(EditCommand::Select {
            elements: elements.into_iter().collect(),
            new_selection: true,
        })
    }

    pub fn switch_view(&mut self, system: SystemId) -> Outcome {
        self.run(EditCommand::SwitchView { system })
    }

    /// Copies the current selection of the active view.
    pub fn copy_selected(&mut self) -> Outcome {
        self.run(EditCommand::Copy)
    }

    /// Pastes the clipboard into the active view as one undoable edit.
    pub fn paste(&mut self) -> Outcome {
        self.run(EditCommand::Paste {
            scope: Some(self.view),
            pasted: Vec::new(),
        })
    }

    /// Drops elements that are no longer in the model from every selection
    /// snapshot, and falls back to the root view if the active view is gone.
    fn settle(&mut self) {
        let vanished: Selection = self
            .selection
            .all_elements()
            .into_iter()
            .filter(|e| !self.model.contains(*e))
            .collect();
        self.selection.update_selections(&vanished);

        if self.model.get_system(self.view).is_none() {
            tracing::info!("view {} was removed, returning to root", self.view);
            self.view = self.model.root_id();
        }
    }
}

impl Default for Editor {
    fn default() -> Self {
        Editor::new(SystemModel::new("root"), &EditorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysmodel_core::{StateId, Visibility};

    #[test]
    fn undo_of_create_clears_stale_selection() {
        let mut editor = Editor::default();
        let root = editor.view();
        editor.run(EditCommand::CreateState {
            system: root,
            name: "s".into(),
            created: None,
        });
        let state = ElementId::State(StateId(0));
        assert_eq!(editor.select([state]), Outcome::Applied);

        assert_eq!(editor.undo(), Outcome::Applied);
        assert!(editor.selection().current().is_empty());
        assert!(!editor.selection().all_elements().contains(&state));
    }

    #[test]
    fn deleting_the_active_view_returns_to_root() {
        let mut editor = Editor::default();
        let root = editor.view();
        editor.run(EditCommand::CreateSystem {
            parent: root,
            name: "inner".into(),
            created: None,
        });
        let inner = editor.model().get_system(root).unwrap().children[0];
        assert_eq!(editor.switch_view(inner), Outcome::Applied);

        editor.run(EditCommand::DeleteSelection {
            requested: vec![ElementId::System(inner)],
            scope: Some(root),
            group: None,
            deleted: Vec::new(),
        });
        assert_eq!(editor.view(), root);
    }

    #[test]
    fn delete_selected_uses_current_selection() {
        let mut editor = Editor::default();
        let root = editor.view();
        editor.run(EditCommand::CreatePort {
            system: root,
            name: "p".into(),
            visibility: Visibility::Input,
            created: None,
        });
        let port = editor.model().get_system(root).unwrap().ports[0];
        editor.select([ElementId::Port(port)]);

        assert_eq!(editor.delete_selected(), Outcome::Applied);
        assert_eq!(editor.last_deleted(), &[ElementId::Port(port)]);
        assert!(editor.selection().current().is_empty());
    }
}
