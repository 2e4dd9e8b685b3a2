use std::collections::BTreeSet;

use super::snapshot::SelectionKey;

/// Order in which single points were selected.
///
/// The host calls [`SelectionHistory::update`] after every selection change.
/// Only one-point changes are tracked; anything else (box select, select all,
/// a rebuild that renumbers points) resets the history, since the stored
/// addresses would no longer mean anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionHistory {
    entries: Vec<SelectionKey>,
    previous: BTreeSet<SelectionKey>,
}

impl SelectionHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> &[SelectionKey] {
        &self.entries
    }

    #[must_use]
    pub fn last(&self) -> Option<SelectionKey> {
        self.entries.last().copied()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.previous.clear();
    }

    /// Feeds the current selection.
    pub fn update(&mut self, selection: &BTreeSet<SelectionKey>) {
        let changed: Vec<SelectionKey> = self
            .previous
            .symmetric_difference(selection)
            .copied()
            .collect();

        if let [key] = changed.as_slice() {
            if selection.contains(key) {
                self.entries.push(*key);
            } else if let Some(pos) = self.entries.iter().position(|e| e == key) {
                self.entries.remove(pos);
            } else {
                self.entries.clear();
            }
        } else if !changed.is_empty() {
            self.entries.clear();
        }

        if self.entries.is_empty() && selection.len() == 1 {
            self.entries.extend(selection.iter().copied());
        }

        self.previous.clone_from(selection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(keys: &[(usize, usize)]) -> BTreeSet<SelectionKey> {
        keys.iter().map(|&k| SelectionKey::from(k)).collect()
    }

    #[test]
    fn test_single_additions_are_recorded_in_order() {
        let mut history = SelectionHistory::new();
        history.update(&set(&[(0, 3)]));
        history.update(&set(&[(0, 3), (0, 1)]));
        history.update(&set(&[(0, 3), (0, 1), (1, 0)]));
        assert_eq!(
            history.entries(),
            &[SelectionKey::new(0, 3), SelectionKey::new(0, 1), SelectionKey::new(1, 0)]
        );
        assert_eq!(history.last(), Some(SelectionKey::new(1, 0)));
    }

    #[test]
    fn test_single_removal_drops_entry() {
        let mut history = SelectionHistory::new();
        history.update(&set(&[(0, 3)]));
        history.update(&set(&[(0, 3), (0, 1)]));
        history.update(&set(&[(0, 1)]));
        assert_eq!(history.entries(), &[SelectionKey::new(0, 1)]);
    }

    #[test]
    fn test_bulk_change_resets_history() {
        let mut history = SelectionHistory::new();
        history.update(&set(&[(0, 0)]));
        history.update(&set(&[(0, 0), (0, 1), (0, 2)]));
        assert!(history.entries().is_empty());
        history.update(&set(&[(0, 1), (0, 2)]));
        assert!(history.entries().is_empty());
    }

    #[test]
    fn test_history_seeds_from_single_selection() {
        let mut history = SelectionHistory::new();
        history.update(&set(&[(0, 0), (0, 1)]));
        history.update(&set(&[(2, 4)]));
        assert_eq!(history.entries(), &[SelectionKey::new(2, 4)]);
    }
}
