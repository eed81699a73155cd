//! Edit scripts.
//!
//! A script is a JSON document naming the root system and listing steps.
//! Element IDs are allocated per kind in creation order starting at 0 (the
//! root is `system` 0), so later steps can refer to what earlier steps
//! created.
//!
//! ```json
//! {
//!   "root": "plant",
//!   "steps": [
//!     { "op": "run", "command": { "type": "CreateSystem", "parent": 0, "name": "pump" } },
//!     { "op": "delete", "elements": [{ "system": 1 }] },
//!     { "op": "undo" }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sysmodel_core::{ElementId, SystemId, SystemModel};
use sysmodel_edit::{EditCommand, Editor, EditorConfig, Outcome};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid script: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default = "default_root")]
    pub root: String,
    pub steps: Vec<Step>,
}

fn default_root() -> String {
    "root".to_string()
}

/// One scripted editor interaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Runs an arbitrary command through the history.
    Run { command: EditCommand },
    /// Deletes elements and their dependents from the active view.
    Delete { elements: Vec<ElementId> },
    /// Deletes the current selection.
    DeleteSelected,
    Select { elements: Vec<ElementId> },
    View { system: SystemId },
    /// Copies the current selection to the clipboard.
    Copy,
    /// Pastes the clipboard into the active view.
    Paste,
    Undo,
    Redo,
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Run { command } => command.label(),
            Step::Delete { .. } => "delete",
            Step::DeleteSelected => "delete selected",
            Step::Select { .. } => "select",
            Step::View { .. } => "view",
            Step::Copy => "copy",
            Step::Paste => "paste",
            Step::Undo => "undo",
            Step::Redo => "redo",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub op: &'static str,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deleted: Vec<ElementId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ElementCounts {
    pub systems: usize,
    pub ports: usize,
    pub connections: usize,
    pub states: usize,
    pub edges: usize,
    pub regions: usize,
    pub contracts: usize,
}

impl ElementCounts {
    fn of(model: &SystemModel) -> Self {
        ElementCounts {
            systems: model.systems().count(),
            ports: model.ports().count(),
            connections: model.connections().count(),
            states: model.states().count(),
            edges: model.edges().count(),
            regions: model.regions().count(),
            contracts: model.contracts().count(),
        }
    }
}

/// What a replay produced, printed as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub steps: Vec<StepReport>,
    pub elements: ElementCounts,
    pub view: SystemId,
    pub selection: Vec<ElementId>,
    pub undo_depth: usize,
    pub redo_depth: usize,
    pub alerts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<SystemModel>,
}

impl Summary {
    /// Whether the replay hit a hard failure or left a broken model.
    pub fn has_failures(&self) -> bool {
        !self.alerts.is_empty() || self.integrity_error.is_some()
    }
}

pub fn load(path: &Path) -> Result<Script, ScriptError> {
    let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Replays `script` against a fresh model.
pub fn replay(script: Script, config: &EditorConfig, include_model: bool) -> Summary {
    let mut editor = Editor::new(SystemModel::new(&script.root), config);
    let mut steps = Vec::with_capacity(script.steps.len());
    let mut alerts = Vec::new();

    for (index, step) in script.steps.into_iter().enumerate() {
        let op = step.name();
        let (outcome, deleted) = match step {
            Step::Run { command } => (editor.run(command), Vec::new()),
            Step::Delete { elements } => deleted_by(&mut editor, |e| e.delete_selection(elements)),
            Step::DeleteSelected => deleted_by(&mut editor, Editor::delete_selected),
            Step::Select { elements } => (editor.select(elements), Vec::new()),
            Step::View { system } => (editor.switch_view(system), Vec::new()),
            Step::Copy => (editor.copy_selected(), Vec::new()),
            Step::Paste => (editor.paste(), Vec::new()),
            Step::Undo => (editor.undo(), Vec::new()),
            Step::Redo => (editor.redo(), Vec::new()),
        };
        tracing::debug!("step {} ({}): {:?}", index, op, outcome);
        alerts.extend(editor.take_alerts());
        steps.push(StepReport {
            index,
            op,
            outcome,
            deleted,
        });
    }

    let model = editor.model();
    Summary {
        steps,
        elements: ElementCounts::of(model),
        view: editor.view(),
        selection: editor.selection().current().iter().copied().collect(),
        undo_depth: editor.history().undo_depth(),
        redo_depth: editor.history().redo_depth(),
        alerts,
        integrity_error: model.check_integrity().err().map(|err| err.to_string()),
        model: include_model.then(|| model.clone()),
    }
}

fn deleted_by(
    editor: &mut Editor,
    delete: impl FnOnce(&mut Editor) -> Outcome,
) -> (Outcome, Vec<ElementId>) {
    let outcome = delete(editor);
    let deleted = if outcome == Outcome::Applied {
        editor.last_deleted().to_vec()
    } else {
        Vec::new()
    };
    (outcome, deleted)
}
