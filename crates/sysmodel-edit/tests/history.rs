//! History behaviour: capacity, redo invalidation, composites that stop
//! half-way, and hard failures.

use serde_json::json;
use sysmodel_core::{ElementId, NameTarget, PropertyChange, SystemId, SystemModel, Visibility};
use sysmodel_edit::{
    CompositeCommand, EditCommand, EditContext, Editor, EditorConfig, HistoryManager, Outcome,
    SelectionManager,
};

fn create_system(name: &str) -> EditCommand {
    EditCommand::CreateSystem {
        parent: SystemId(0),
        name: name.into(),
        created: None,
    }
}

fn child_names(editor: &Editor) -> Vec<String> {
    let root = editor.model().get_system(editor.model().root_id()).unwrap();
    root.children
        .iter()
        .map(|c| editor.model().get_system(*c).unwrap().name.clone())
        .collect()
}

#[test]
fn capacity_evicts_oldest_entry() {
    let config = EditorConfig {
        history_capacity: 3,
        ..EditorConfig::default()
    };
    let mut editor = Editor::new(SystemModel::new("root"), &config);
    for name in ["a", "b", "c", "d"] {
        assert_eq!(editor.run(create_system(name)), Outcome::Applied);
    }
    assert_eq!(editor.history().undo_depth(), 3);

    for _ in 0..3 {
        assert_eq!(editor.undo(), Outcome::Applied);
    }
    assert_eq!(editor.undo(), Outcome::Empty);
    // The creation of "a" fell off the stack and can no longer be undone.
    assert_eq!(child_names(&editor), vec!["a"]);
}

#[test]
fn new_edit_discards_redo_branch() {
    let mut editor = Editor::default();
    editor.run(create_system("a"));
    editor.undo();
    assert!(editor.history().can_redo());

    editor.run(create_system("b"));
    assert!(!editor.history().can_redo());
    assert_eq!(editor.redo(), Outcome::Empty);
    assert_eq!(child_names(&editor), vec!["b"]);
}

#[test]
fn declined_command_leaves_stacks_unchanged() {
    let mut editor = Editor::default();
    editor.run(create_system("a"));
    editor.undo();

    let rename_missing = EditCommand::ChangeProperty {
        change: PropertyChange::Name {
            target: NameTarget::System(SystemId(42)),
            name: "x".into(),
        },
        previous: None,
    };
    assert_eq!(editor.run(rename_missing), Outcome::Declined);
    assert_eq!(editor.history().undo_depth(), 0);
    assert_eq!(editor.history().redo_depth(), 1);
}

#[test]
fn composite_stops_at_first_decline_without_rollback() {
    let mut editor = Editor::default();
    let composite = EditCommand::Composite(CompositeCommand::new(vec![
        create_system("a"),
        EditCommand::ChangeProperty {
            change: PropertyChange::Name {
                target: NameTarget::System(SystemId(0)),
                name: String::new(),
            },
            previous: None,
        },
        create_system("never"),
    ]));

    assert_eq!(editor.run(composite), Outcome::Declined);
    assert_eq!(child_names(&editor), vec!["a"]);
    assert!(!editor.history().can_undo());
}

#[test]
fn composite_undo_runs_inverses_in_reverse() {
    let mut editor = Editor::default();
    let root = editor.model().root_id();
    let composite = EditCommand::Composite(CompositeCommand::new(vec![
        create_system("a"),
        EditCommand::CreatePort {
            system: root,
            name: "p".into(),
            visibility: Visibility::Input,
            created: None,
        },
    ]));
    assert_eq!(editor.run(composite), Outcome::Applied);
    assert_eq!(editor.model().element_count(), 3);

    assert_eq!(editor.undo(), Outcome::Applied);
    assert_eq!(editor.model().element_count(), 1);
    assert_eq!(editor.redo(), Outcome::Applied);
    assert_eq!(editor.model().element_count(), 3);
}

#[test]
fn declined_undo_entry_is_dropped() {
    let mut model = SystemModel::new("root");
    let mut selection = SelectionManager::default();
    let mut view = model.root_id();
    let mut clipboard = None;
    let mut history = HistoryManager::new(10);

    let a = {
        let mut ctx = EditContext {
            model: &mut model,
            selection: &mut selection,
            view: &mut view,
            clipboard: &mut clipboard,
        };
        assert_eq!(history.run(create_system("a"), &mut ctx), Outcome::Applied);
        ctx.model.get_system(SystemId(0)).unwrap().children[0]
    };

    // A port added outside the history keeps `a` from being deleted.
    model.add_port(a, "p".into(), Visibility::Input).unwrap();
    let mut ctx = EditContext {
        model: &mut model,
        selection: &mut selection,
        view: &mut view,
        clipboard: &mut clipboard,
    };
    assert_eq!(history.undo(&mut ctx), Outcome::Declined);
    assert_eq!((history.undo_depth(), history.redo_depth()), (0, 0));
    assert!(ctx.model.get_system(a).is_some());
    assert!(history.take_alerts().is_empty());
}

#[test]
fn hard_failure_raises_alert_and_keeps_partial_changes() {
    // The root does not list its own port, so removing the port passes the
    // precondition check but fails half-way.
    let mut model = SystemModel::new("root");
    let root = model.root_id();
    let port = model.add_port(root, "p".into(), Visibility::Input).unwrap();
    let mut value = serde_json::to_value(&model).unwrap();
    value["systems"]["0"]["ports"] = json!([]);
    let broken: SystemModel = serde_json::from_value(value).unwrap();
    let mut editor = Editor::new(broken, &EditorConfig::default());

    let composite = EditCommand::Composite(CompositeCommand::new(vec![
        EditCommand::ChangeProperty {
            change: PropertyChange::Name {
                target: NameTarget::System(root),
                name: "kept".into(),
            },
            previous: None,
        },
        EditCommand::Delete {
            element: ElementId::Port(port),
            detached: None,
        },
    ]));
    assert_eq!(editor.run(composite), Outcome::Failed);

    let alerts = editor.take_alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("graph inconsistency"));
    assert_eq!(editor.model().get_system(root).unwrap().name, "kept");
    assert!(!editor.history().can_undo());
    assert!(editor.take_alerts().is_empty());
}
