//! Selection tracking with back/forward history.
//!
//! [`SelectionManager`] holds the current selection plus two bounded stacks
//! of earlier and later selection snapshots. Making a new selection pushes
//! the current one onto the back stack and clears the forward stack.

use std::collections::{BTreeSet, VecDeque};

use sysmodel_core::ElementId;

use crate::config::DEFAULT_SELECTION_HISTORY_CAPACITY;

pub type Selection = BTreeSet<ElementId>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionManager {
    current: Selection,
    /// Earlier selections, most recent at the front.
    back: VecDeque<Selection>,
    /// Selections left by going back, most recent at the front.
    forward: VecDeque<Selection>,
    capacity: usize,
}

impl Default for SelectionManager {
    fn default() -> Self {
        Self::new(DEFAULT_SELECTION_HISTORY_CAPACITY)
    }
}

impl SelectionManager {
    pub fn new(capacity: usize) -> Self {
        SelectionManager {
            current: Selection::new(),
            back: VecDeque::new(),
            forward: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn current(&self) -> &Selection {
        &self.current
    }

    pub fn is_selected(&self, element: ElementId) -> bool {
        self.current.contains(&element)
    }

    pub fn back_depth(&self) -> usize {
        self.back.len()
    }

    pub fn forward_depth(&self) -> usize {
        self.forward.len()
    }

    /// Replaces the current selection with `elements`.
    ///
    /// Returns `false` if `elements` is empty or equal to the current
    /// selection; nothing changes in that case.
    pub fn select(&mut self, elements: Selection) -> bool {
        if elements.is_empty() || elements == self.current {
            return false;
        }
        self.forward.clear();
        let previous = std::mem::replace(&mut self.current, elements);
        self.push_back(previous);
        true
    }

    /// Removes `elements` from the current selection.
    ///
    /// Returns `false` if none of them is selected.
    pub fn deselect(&mut self, elements: &Selection) -> bool {
        if !elements.iter().any(|e| self.current.contains(e)) {
            return false;
        }
        self.forward.clear();
        let remaining: Selection = self.current.difference(elements).copied().collect();
        let previous = std::mem::replace(&mut self.current, remaining);
        self.push_back(previous);
        true
    }

    pub fn deselect_all(&mut self) -> bool {
        let all = self.current.clone();
        self.deselect(&all)
    }

    /// Returns to the previous selection. `false` if there is none.
    pub fn go_back(&mut self) -> bool {
        let Some(previous) = self.back.pop_front() else {
            return false;
        };
        let current = std::mem::replace(&mut self.current, previous);
        self.forward.push_front(current);
        self.forward.truncate(self.capacity);
        true
    }

    /// Re-applies the selection left by [`go_back`](Self::go_back).
    pub fn go_forward(&mut self) -> bool {
        let Some(next) = self.forward.pop_front() else {
            return false;
        };
        let current = std::mem::replace(&mut self.current, next);
        self.push_back(current);
        true
    }

    /// Drops `removed` from the current selection and from every snapshot.
    ///
    /// Snapshots that become empty, or equal to the snapshot just above
    /// them, are discarded. The forward stack is cleared whenever a removal
    /// actually changed something.
    pub fn update_selections(&mut self, removed: &Selection) {
        if removed.is_empty() {
            return;
        }
        let mut changed = false;
        if self.current.iter().any(|e| removed.contains(e)) {
            self.current.retain(|e| !removed.contains(e));
            changed = true;
        }

        let mut kept = VecDeque::with_capacity(self.back.len());
        let mut last = self.current.clone();
        for mut snapshot in self.back.drain(..) {
            let before = snapshot.len();
            snapshot.retain(|e| !removed.contains(e));
            if snapshot.len() != before {
                changed = true;
            }
            if snapshot.is_empty() || snapshot == last {
                continue;
            }
            last = snapshot.clone();
            kept.push_back(snapshot);
        }
        self.back = kept;

        if self
            .forward
            .iter()
            .any(|snapshot| snapshot.iter().any(|e| removed.contains(e)))
        {
            changed = true;
        }
        if changed {
            self.forward.clear();
        }
    }

    /// Every element mentioned by the current selection or any snapshot.
    pub fn all_elements(&self) -> Selection {
        let mut all = self.current.clone();
        for snapshot in self.back.iter().chain(self.forward.iter()) {
            all.extend(snapshot.iter().copied());
        }
        all
    }

    fn push_back(&mut self, selection: Selection) {
        self.back.push_front(selection);
        self.back.truncate(self.capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysmodel_core::{PortId, StateId, SystemId};

    fn set(items: &[ElementId]) -> Selection {
        items.iter().copied().collect()
    }

    const A: ElementId = ElementId::System(SystemId(1));
    const B: ElementId = ElementId::Port(PortId(2));
    const C: ElementId = ElementId::State(StateId(3));

    #[test]
    fn select_ignores_empty_and_repeated_selection() {
        let mut sel = SelectionManager::default();
        assert!(!sel.select(Selection::new()));
        assert!(sel.select(set(&[A])));
        assert!(!sel.select(set(&[A])));
        assert_eq!(sel.back_depth(), 1);
    }

    #[test]
    fn back_and_forward_navigate_snapshots() {
        let mut sel = SelectionManager::default();
        sel.select(set(&[A]));
        sel.select(set(&[B]));

        assert!(sel.go_back());
        assert_eq!(sel.current(), &set(&[A]));
        assert!(sel.go_forward());
        assert_eq!(sel.current(), &set(&[B]));
        assert!(!sel.go_forward());
    }

    #[test]
    fn new_selection_clears_forward_stack() {
        let mut sel = SelectionManager::default();
        sel.select(set(&[A]));
        sel.select(set(&[B]));
        sel.go_back();
        sel.select(set(&[C]));
        assert_eq!(sel.forward_depth(), 0);
    }

    #[test]
    fn deselect_requires_an_overlap() {
        let mut sel = SelectionManager::default();
        sel.select(set(&[A, B]));
        assert!(!sel.deselect(&set(&[C])));
        assert!(sel.deselect(&set(&[A, C])));
        assert_eq!(sel.current(), &set(&[B]));
    }

    #[test]
    fn history_is_bounded() {
        let mut sel = SelectionManager::new(2);
        sel.select(set(&[A]));
        sel.select(set(&[B]));
        sel.select(set(&[C]));
        sel.select(set(&[A, B]));
        assert_eq!(sel.back_depth(), 2);
    }

    #[test]
    fn update_selections_prunes_removed_elements() {
        let mut sel = SelectionManager::default();
        sel.select(set(&[A]));
        sel.select(set(&[A, B]));
        sel.select(set(&[B, C]));

        sel.update_selections(&set(&[B]));

        assert_eq!(sel.current(), &set(&[C]));
        // [A, B] shrinks to [A], which makes the older [A] a duplicate.
        assert_eq!(sel.back_depth(), 1);
        assert!(!sel.all_elements().contains(&B));
        assert!(sel.go_back());
        assert_eq!(sel.current(), &set(&[A]));
    }
}
