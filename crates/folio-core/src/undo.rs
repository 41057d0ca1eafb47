//! # Undo Stack
//!
//! Linear history of full document snapshots.
//!
//! Entry 0 is the base state saved after a document is opened; it cannot be
//! undone. `index` points at the snapshot matching the live state. A commit
//! after an undo discards every entry past `index` before pushing.
//!
//! Snapshots are plain `DocumentState` clones. Documents hold hundreds of
//! items, so keeping whole copies is cheaper than tracking diffs. Memory
//! grows with the history length; callers that need a bound should
//! [`UndoStack::clear`] and re-save the base state.
//!
//! A commit may name [`CacheTarget`]s. Render caches are not part of the
//! snapshots, so whenever history moves between two entries the targets of
//! both are flagged dirty again in the live state.

use crate::document::DocumentState;
use crate::mutations::pli_item::MarkPliItemsDirty;
use crate::mutations::{CsiMutations, DocumentMutations, Mutation, PliItemMutations};
use crate::store::Store;
use crate::types::{FolioError, ItemType, LookupKey};
use tracing::{debug, info};

/// Rendered output to invalidate when undo or redo crosses a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTarget {
    /// One CSI or PLI item. Keys of other types are ignored.
    Item(LookupKey),
    AllCsis,
    AllPliItems,
    /// Scene rendering settings: every CSI, PLI item and page.
    Renderer,
}

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    state: DocumentState,
    label: String,
    clear_cache_targets: Vec<CacheTarget>,
}

/// Snapshot history over a [`Store`].
#[derive(Debug, Clone, Default)]
pub struct UndoStack {
    entries: Vec<Snapshot>,
    index: Option<usize>,
}

impl UndoStack {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset history to the store's current state.
    pub fn save_base_state(&mut self, store: &Store) {
        self.entries = vec![Snapshot {
            state: store.state().clone(),
            label: String::new(),
            clear_cache_targets: Vec::new(),
        }];
        self.index = Some(0);
        info!("undo base state saved");
    }

    /// Apply `mutation` and record the resulting state under `label`.
    ///
    /// # Errors
    ///
    /// Whatever the mutation returns. The live state is then restored and
    /// nothing is recorded.
    pub fn commit(
        &mut self,
        store: &mut Store,
        mutation: &Mutation,
        label: &str,
    ) -> Result<Option<LookupKey>, FolioError> {
        self.commit_with(store, label, |store| mutation.apply(store))
    }

    /// [`UndoStack::commit`], flagging `targets` dirty now and whenever
    /// history later moves onto or off this entry.
    ///
    /// # Errors
    ///
    /// Whatever the mutation returns. The live state is then restored and
    /// nothing is recorded.
    pub fn commit_clearing(
        &mut self,
        store: &mut Store,
        mutation: &Mutation,
        label: &str,
        targets: &[CacheTarget],
    ) -> Result<Option<LookupKey>, FolioError> {
        self.commit_with_targets(store, label, targets, |store| mutation.apply(store))
    }

    /// Run several mutations as one undo step, e.g. a multi-item drag.
    ///
    /// # Errors
    ///
    /// Whatever `edit` returns. The live state is then restored and nothing
    /// is recorded.
    pub fn commit_with<T, F>(&mut self, store: &mut Store, label: &str, edit: F) -> Result<T, FolioError>
    where
        F: FnOnce(&mut Store) -> Result<T, FolioError>,
    {
        self.commit_with_targets(store, label, &[], edit)
    }

    /// [`UndoStack::commit_with`] carrying cache targets for the new entry.
    ///
    /// # Errors
    ///
    /// Whatever `edit` returns. The live state is then restored and nothing
    /// is recorded.
    pub fn commit_with_targets<T, F>(
        &mut self,
        store: &mut Store,
        label: &str,
        targets: &[CacheTarget],
        edit: F,
    ) -> Result<T, FolioError>
    where
        F: FnOnce(&mut Store) -> Result<T, FolioError>,
    {
        let before = store.state().clone();
        match edit(store) {
            Ok(value) => {
                self.push(store, label, targets);
                let index = self.index;
                self.clear_cache_targets(store, index.and_then(|i| i.checked_sub(1)), index);
                Ok(value)
            }
            Err(err) => {
                store.replace_state(before);
                Err(err)
            }
        }
    }

    fn push(&mut self, store: &Store, label: &str, targets: &[CacheTarget]) {
        let next = self.index.map_or(0, |i| i + 1);
        self.entries.truncate(next);
        self.entries.push(Snapshot {
            state: store.state().clone(),
            label: label.to_owned(),
            clear_cache_targets: targets.to_vec(),
        });
        self.index = Some(next);
        info!(label, index = next, "undo commit");
    }

    /// Step back one snapshot. Returns `false` at the base state.
    pub fn undo(&mut self, store: &mut Store) -> bool {
        match self.index {
            Some(i) if i > 0 => self.restore(store, i - 1, "undo"),
            _ => false,
        }
    }

    /// Step forward one snapshot. Returns `false` at the newest state.
    pub fn redo(&mut self, store: &mut Store) -> bool {
        match self.index {
            Some(i) if i + 1 < self.entries.len() => self.restore(store, i + 1, "redo"),
            _ => false,
        }
    }

    fn restore(&mut self, store: &mut Store, index: usize, action: &str) -> bool {
        let Some(snapshot) = self.entries.get(index) else {
            return false;
        };
        store.replace_state(snapshot.state.clone());
        self.clear_cache_targets(store, self.index, Some(index));
        self.index = Some(index);
        info!(action, index, "undo stack moved");
        true
    }

    /// Flag the cache targets of two entries dirty in the live state.
    fn clear_cache_targets(&self, store: &mut Store, prev: Option<usize>, next: Option<usize>) {
        let targets = [prev, next]
            .into_iter()
            .flatten()
            .filter_map(|i| self.entries.get(i))
            .flat_map(|entry| entry.clear_cache_targets.iter().copied());
        for target in targets {
            match target {
                CacheTarget::Renderer => DocumentMutations::refresh_all(store),
                CacheTarget::AllCsis => CsiMutations::mark_all_dirty(store),
                CacheTarget::AllPliItems => {
                    PliItemMutations::mark_all_dirty(store, &MarkPliItemsDirty::default());
                }
                CacheTarget::Item(key) if matches!(key.item_type, ItemType::Csi | ItemType::PliItem) => {
                    // Looked up afresh: the item may not exist in this state.
                    match store.state_mut().entity_mut(key) {
                        Some(item) => item.mark_dirty(),
                        None => debug!(item = %key, "cache target missing from restored state"),
                    }
                }
                CacheTarget::Item(_) => {}
            }
        }
    }

    #[must_use]
    pub fn is_undo_available(&self) -> bool {
        self.index.is_some_and(|i| i > 0)
    }

    #[must_use]
    pub fn is_redo_available(&self) -> bool {
        self.index.is_some_and(|i| i + 1 < self.entries.len())
    }

    /// Label of the edit [`UndoStack::undo`] would revert, or `""`.
    #[must_use]
    pub fn undo_text(&self) -> &str {
        match self.index {
            Some(i) if self.is_undo_available() => self.entries.get(i).map_or("", |s| s.label.as_str()),
            _ => "",
        }
    }

    /// Label of the edit [`UndoStack::redo`] would replay, or `""`.
    #[must_use]
    pub fn redo_text(&self) -> &str {
        match self.index {
            Some(i) if self.is_redo_available() => self.entries.get(i + 1).map_or("", |s| s.label.as_str()),
            _ => "",
        }
    }

    /// Drop all history.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = None;
    }

    /// Position of the live state, `None` before any snapshot.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutations::page::AddPage;
    use crate::mutations::step::{AddStep, DeleteStep};
    use crate::mutations::{PageMutations, StepMutations};
    use crate::types::{ItemId, ItemType};

    fn store_with_page() -> Store {
        let mut store = Store::new();
        PageMutations::add(&mut store, &AddPage::default()).expect("page");
        store
    }

    fn add_step() -> Mutation {
        Mutation::StepAdd(AddStep::new(LookupKey::new(ItemType::Page, ItemId(0))))
    }

    #[test]
    fn fresh_stack_has_nothing_to_move_to() {
        let mut store = Store::new();
        let mut stack = UndoStack::new();
        assert_eq!(stack.index(), None);
        assert!(!stack.undo(&mut store));
        assert!(!stack.redo(&mut store));
        assert_eq!(stack.undo_text(), "");
    }

    #[test]
    fn undo_then_redo_restores_committed_state() {
        let mut store = store_with_page();
        let mut stack = UndoStack::new();
        stack.save_base_state(&store);
        let base = store.state().clone();

        stack.commit(&mut store, &add_step(), "Add Step").expect("commit");
        let after = store.state().clone();
        assert_eq!(stack.undo_text(), "Add Step");

        assert!(stack.undo(&mut store));
        assert_eq!(store.state(), &base);
        assert!(!stack.undo(&mut store));
        assert_eq!(stack.redo_text(), "Add Step");

        assert!(stack.redo(&mut store));
        assert_eq!(store.state(), &after);
        assert!(!stack.is_redo_available());
    }

    #[test]
    fn commit_after_undo_discards_redo_history() {
        let mut store = store_with_page();
        let mut stack = UndoStack::new();
        stack.save_base_state(&store);
        stack.commit(&mut store, &add_step(), "first").expect("first");
        stack.commit(&mut store, &add_step(), "second").expect("second");
        assert!(stack.undo(&mut store));
        stack.commit(&mut store, &add_step(), "third").expect("third");

        assert_eq!(stack.len(), 3);
        assert_eq!(stack.index(), Some(2));
        assert!(!stack.is_redo_available());
        assert_eq!(stack.undo_text(), "third");
    }

    #[test]
    fn failed_commit_records_nothing() {
        let mut store = store_with_page();
        StepMutations::add(&mut store, &AddStep::new(LookupKey::new(ItemType::Page, ItemId(0)))).expect("step");
        if let Some(step) = store.state_mut().steps.get_mut(ItemId(0)) {
            step.parts = vec![3];
        }
        let mut stack = UndoStack::new();
        stack.save_base_state(&store);
        let before = store.state().clone();

        let result = stack.commit_with(&mut store, "batch", |store| {
            StepMutations::add(store, &AddStep::new(LookupKey::new(ItemType::Page, ItemId(0))))?;
            StepMutations::delete(
                store,
                &DeleteStep {
                    step: ItemId(0),
                    delete_parts: false,
                    do_not_renumber: false,
                },
            )
        });
        assert!(result.is_err());
        assert_eq!(store.state(), &before);
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn cache_targets_are_flagged_on_commit_undo_and_redo() {
        let mut store = store_with_page();
        StepMutations::add(&mut store, &AddStep::new(LookupKey::new(ItemType::Page, ItemId(0)))).expect("step");
        let csi = LookupKey::new(ItemType::Csi, ItemId(0));
        let is_dirty = |store: &Store| store.state().csis.get(ItemId(0)).is_some_and(|c| c.is_dirty);
        if let Some(c) = store.state_mut().csis.get_mut(ItemId(0)) {
            c.is_dirty = false;
        }
        let mut stack = UndoStack::new();
        stack.save_base_state(&store);

        stack
            .commit_clearing(
                &mut store,
                &Mutation::PageAdd(AddPage::default()),
                "Add Page",
                &[CacheTarget::Item(csi)],
            )
            .expect("commit");
        assert!(is_dirty(&store));

        // Snapshots hold the clean flag; moving either way flags it again.
        assert!(stack.undo(&mut store));
        assert!(is_dirty(&store));
        if let Some(c) = store.state_mut().csis.get_mut(ItemId(0)) {
            c.is_dirty = false;
        }
        assert!(stack.redo(&mut store));
        assert!(is_dirty(&store));
    }

    #[test]
    fn commits_without_targets_leave_caches_alone() {
        let mut store = store_with_page();
        StepMutations::add(&mut store, &AddStep::new(LookupKey::new(ItemType::Page, ItemId(0)))).expect("step");
        for c in store.state_mut().csis.iter_mut() {
            c.is_dirty = false;
        }
        let mut stack = UndoStack::new();
        stack.save_base_state(&store);
        stack
            .commit_clearing(
                &mut store,
                &Mutation::PageAdd(AddPage::default()),
                "Add Page",
                &[CacheTarget::Item(LookupKey::new(ItemType::Page, ItemId(0)))],
            )
            .expect("commit");
        stack.commit(&mut store, &add_step(), "Add Step").expect("commit");
        assert!(stack.undo(&mut store));
        assert!(store.state().csis.iter().all(|c| !c.is_dirty));
        stack
            .commit_with_targets(&mut store, "Refresh", &[CacheTarget::AllCsis], |_| Ok(()))
            .expect("commit");
        assert!(store.state().csis.iter().all(|c| c.is_dirty));
    }

    #[test]
    fn clear_forgets_everything() {
        let mut store = store_with_page();
        let mut stack = UndoStack::new();
        stack.save_base_state(&store);
        stack.commit(&mut store, &add_step(), "step").expect("commit");
        stack.clear();
        assert!(stack.is_empty());
        assert!(!stack.is_undo_available());
    }
}
