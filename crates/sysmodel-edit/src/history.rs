//! Bounded undo/redo history.
//!
//! [`HistoryManager`] is the only place top-level commands are executed. It
//! records the inverse of every successful undoable command, catches hard
//! failures and turns them into alerts for the UI to show.

use std::collections::VecDeque;

use serde::Serialize;

use crate::command::EditCommand;
use crate::config::DEFAULT_HISTORY_CAPACITY;
use crate::context::EditContext;
use crate::error::EditError;

/// What happened to a command handed to the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The command ran.
    Applied,
    /// A precondition was not met; nothing changed.
    Declined,
    /// The command failed hard; an alert was queued.
    Failed,
    /// Undo or redo was requested with an empty stack.
    Empty,
}

#[derive(Debug, Clone)]
pub struct HistoryManager {
    /// Most recent entry at the front.
    undo_stack: VecDeque<EditCommand>,
    /// Most recent entry at the front.
    redo_stack: VecDeque<EditCommand>,
    capacity: usize,
    alerts: Vec<String>,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryManager {
    pub fn new(capacity: usize) -> Self {
        HistoryManager {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            capacity: capacity.max(1),
            alerts: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// The command the next `undo` would run.
    pub fn peek_undo(&self) -> Option<&EditCommand> {
        self.undo_stack.front()
    }

    /// The command the next `redo` would run.
    pub fn peek_redo(&self) -> Option<&EditCommand> {
        self.redo_stack.front()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Drains the alerts queued by hard failures.
    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }

    /// Runs `command`. On success its inverse, if any, goes onto the undo
    /// stack and the redo stack is cleared.
    pub fn run(&mut self, mut command: EditCommand, ctx: &mut EditContext<'_>) -> Outcome {
        let outcome = self.execute(&mut command, ctx);
        if outcome != Outcome::Applied {
            return outcome;
        }
        match command.inverse() {
            Some(inverse) => {
                push_bounded(&mut self.undo_stack, inverse, self.capacity);
                self.redo_stack.clear();
            }
            None if command.is_undoable() => {
                self.alert(command.label(), &EditError::NotRun);
            }
            None => {}
        }
        outcome
    }

    /// Runs the most recent undo entry and makes it redoable.
    pub fn undo(&mut self, ctx: &mut EditContext<'_>) -> Outcome {
        let Some(mut command) = self.undo_stack.pop_front() else {
            return Outcome::Empty;
        };
        tracing::info!("undo: {}", command.label());
        let outcome = self.execute(&mut command, ctx);
        if outcome == Outcome::Applied {
            if let Some(inverse) = command.inverse() {
                push_bounded(&mut self.redo_stack, inverse, self.capacity);
            }
        }
        outcome
    }

    /// Runs the most recent redo entry and makes it undoable again.
    pub fn redo(&mut self, ctx: &mut EditContext<'_>) -> Outcome {
        let Some(mut command) = self.redo_stack.pop_front() else {
            return Outcome::Empty;
        };
        tracing::info!("redo: {}", command.label());
        let outcome = self.execute(&mut command, ctx);
        if outcome == Outcome::Applied {
            if let Some(inverse) = command.inverse() {
                push_bounded(&mut self.undo_stack, inverse, self.capacity);
            }
        }
        outcome
    }

    fn execute(&mut self, command: &mut EditCommand, ctx: &mut EditContext<'_>) -> Outcome {
        match command.run(ctx) {
            Ok(true) => {
                tracing::debug!("{} applied", command.label());
                Outcome::Applied
            }
            Ok(false) => {
                tracing::debug!("{} declined", command.label());
                Outcome::Declined
            }
            Err(err) => {
                self.alert(command.label(), &err);
                Outcome::Failed
            }
        }
    }

    fn alert(&mut self, label: &str, err: &EditError) {
        tracing::error!("{} failed: {}", label, err);
        self.alerts.push(format!("{} failed: {}", label, err));
    }
}

fn push_bounded(stack: &mut VecDeque<EditCommand>, command: EditCommand, capacity: usize) {
    stack.push_front(command);
    if stack.len() > capacity {
        stack.pop_back();
        tracing::info!("history full, dropped oldest entry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SelectionManager;
    use sysmodel_core::{SystemId, SystemModel};

    fn create(name: &str) -> EditCommand {
        EditCommand::CreateSystem {
            parent: SystemId(0),
            name: name.into(),
            created: None,
        }
    }

    #[test]
    fn undo_and_redo_move_entries_between_stacks() {
        let mut model = SystemModel::new("root");
        let mut selection = SelectionManager::default();
        let mut view = model.root_id();
        let mut clipboard = None;
        let mut ctx = EditContext {
            model: &mut model,
            selection: &mut selection,
            view: &mut view,
            clipboard: &mut clipboard,
        };
        let mut history = HistoryManager::new(10);

        assert_eq!(history.run(create("a"), &mut ctx), Outcome::Applied);
        assert_eq!(history.undo_depth(), 1);
        assert_eq!(history.undo(&mut ctx), Outcome::Applied);
        assert_eq!((history.undo_depth(), history.redo_depth()), (0, 1));
        assert_eq!(ctx.model.element_count(), 1);
        assert_eq!(history.redo(&mut ctx), Outcome::Applied);
        assert_eq!((history.undo_depth(), history.redo_depth()), (1, 0));
        assert_eq!(ctx.model.element_count(), 2);
    }

    #[test]
    fn empty_stacks_report_empty() {
        let mut model = SystemModel::new("root");
        let mut selection = SelectionManager::default();
        let mut view = model.root_id();
        let mut clipboard = None;
        let mut ctx = EditContext {
            model: &mut model,
            selection: &mut selection,
            view: &mut view,
            clipboard: &mut clipboard,
        };
        let mut history = HistoryManager::default();
        assert_eq!(history.undo(&mut ctx), Outcome::Empty);
        assert_eq!(history.redo(&mut ctx), Outcome::Empty);
        assert_eq!(history.capacity(), DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn view_actions_leave_stacks_alone() {
        let mut model = SystemModel::new("root");
        let mut selection = SelectionManager::default();
        let mut view = model.root_id();
        let mut clipboard = None;
        let mut ctx = EditContext {
            model: &mut model,
            selection: &mut selection,
            view: &mut view,
            clipboard: &mut clipboard,
        };
        let mut history = HistoryManager::default();
        history.run(create("a"), &mut ctx);
        history.undo(&mut ctx);

        let outcome = history.run(EditCommand::SelectionBack, &mut ctx);
        assert_eq!(outcome, Outcome::Declined);
        assert_eq!(history.redo_depth(), 1);
        assert!(history.take_alerts().is_empty());
    }
}
