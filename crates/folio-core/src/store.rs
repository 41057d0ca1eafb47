//! # Store
//!
//! The session object that owns the document state and its external
//! collaborators. There is no process-wide instance: whoever needs the
//! document receives a `&Store` (reads) or `&mut Store` (mutations).
//!
//! ## Collaborators
//!
//! - [`PartCatalog`]: the parsed model library, consulted by part-aware
//!   mutations.
//! - [`BoundingBoxHook`]: optional per-type callbacks that refit an
//!   ancestor's box after a child moved. Registered by the layout engine.

use crate::catalog::{EmptyCatalog, PartCatalog};
use crate::document::DocumentState;
use crate::getters::Getters;
use crate::types::{ItemType, LookupKey};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Layout callback run on a parent after one of its children moved.
pub trait BoundingBoxHook: fmt::Debug + Send + Sync {
    fn adjust_bounding_box(&self, state: &mut DocumentState, item: LookupKey);
}

/// Owner of the live document state.
#[derive(Debug, Clone)]
pub struct Store {
    state: DocumentState,
    catalog: Arc<dyn PartCatalog>,
    bounding_box_hooks: BTreeMap<ItemType, Arc<dyn BoundingBoxHook>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Create a store with an empty document and no part library.
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(DocumentState::new())
    }

    /// Create a store around an existing document.
    #[must_use]
    pub fn with_state(state: DocumentState) -> Self {
        Self {
            state,
            catalog: Arc::new(EmptyCatalog),
            bounding_box_hooks: BTreeMap::new(),
        }
    }

    /// Attach the part library.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<dyn PartCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Read surface.
    #[must_use]
    pub fn get(&self) -> Getters<'_> {
        Getters::new(&self.state, self.catalog.as_ref())
    }

    #[must_use]
    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    /// Direct write access for mutation modules.
    pub fn state_mut(&mut self) -> &mut DocumentState {
        &mut self.state
    }

    #[must_use]
    pub fn into_state(self) -> DocumentState {
        self.state
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn PartCatalog {
        self.catalog.as_ref()
    }

    /// Swap the whole document, e.g. after loading a file or on undo.
    pub fn replace_state(&mut self, state: DocumentState) {
        self.state = state;
    }

    /// Drop the document, keeping collaborators.
    pub fn reset_state(&mut self) {
        self.state = DocumentState::new();
    }

    pub fn register_bounding_box_hook(&mut self, item_type: ItemType, hook: Arc<dyn BoundingBoxHook>) {
        self.bounding_box_hooks.insert(item_type, hook);
    }

    /// Run the hook registered for `item`'s type, if any.
    pub(crate) fn adjust_bounding_box(&mut self, item: LookupKey) {
        if let Some(hook) = self.bounding_box_hooks.get(&item.item_type).cloned() {
            hook.adjust_bounding_box(&mut self.state, item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{Callout, Page, Step};
    use crate::types::{ItemId, Point};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingHook(AtomicUsize);

    impl BoundingBoxHook for CountingHook {
        fn adjust_bounding_box(&self, state: &mut DocumentState, item: LookupKey) {
            self.0.fetch_add(1, Ordering::SeqCst);
            if let Some(callout) = state.callouts.get_mut(item.id) {
                callout.width = Some(99.0);
            }
        }
    }

    #[test]
    fn hook_runs_for_registered_type_only() {
        let hook = Arc::new(CountingHook::default());
        let mut store = Store::new();
        store.register_bounding_box_hook(ItemType::Callout, hook.clone());

        let state = store.state_mut();
        let page = state.add_item(Page::default(), None, None, None).expect("page");
        let step = state.add_item(Step::default(), Some(page), None, None).expect("step");
        let callout = state
            .add_item(Callout::default(), Some(step), None, None)
            .expect("callout");

        store.adjust_bounding_box(step);
        assert_eq!(hook.0.load(Ordering::SeqCst), 0);
        store.adjust_bounding_box(callout);
        assert_eq!(hook.0.load(Ordering::SeqCst), 1);
        assert_eq!(store.state().callouts.get(ItemId(0)).and_then(|c| c.width), Some(99.0));
        assert!(store.state_mut().translate_item(callout, Point::new(1.0, 0.0)));
    }

    #[test]
    fn reset_keeps_a_fresh_document() {
        let mut store = Store::new();
        store
            .state_mut()
            .add_item(Page::default(), None, None, None)
            .expect("page");
        store.reset_state();
        assert_eq!(store.state(), &DocumentState::new());
    }
}
