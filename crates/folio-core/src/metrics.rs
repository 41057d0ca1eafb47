//! # Document Metrics
//!
//! Size summary of a document, for `inspect`-style reporting.

use crate::document::DocumentState;
use crate::types::{ItemType, PageSubtype};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetrics {
    /// Registry size per item type, keyed by wire name.
    pub counts: BTreeMap<&'static str, usize>,
    pub total_items: usize,
    pub pages: usize,
    /// Pages of subtype `page`.
    pub basic_pages: usize,
    pub steps: usize,
    /// Steps placed directly on basic pages.
    pub top_level_steps: usize,
    pub books: usize,
    pub parts: usize,
    /// Longest parent chain, counting the root item as depth 1.
    pub max_depth: usize,
}

impl DocumentMetrics {
    #[must_use]
    pub fn from_state(state: &DocumentState) -> Self {
        let counts = ItemType::ALL
            .into_iter()
            .map(|t| (t.as_str(), state.count(t)))
            .collect();
        let basic_pages = state
            .pages
            .iter()
            .filter(|p| p.subtype == PageSubtype::Page)
            .count();
        let top_level_steps = state
            .steps
            .iter()
            .filter(|s| {
                s.parent
                    .filter(|p| p.item_type == ItemType::Page)
                    .and_then(|p| state.pages.get(p.id))
                    .is_some_and(|p| p.subtype == PageSubtype::Page)
            })
            .count();

        Self {
            counts,
            total_items: state.total_count(),
            pages: state.pages.len(),
            basic_pages,
            steps: state.steps.len(),
            top_level_steps,
            books: state.books.len(),
            parts: state.steps.iter().map(|s| s.parts.len()).sum(),
            max_depth: max_depth(state),
        }
    }
}

/// Parent walks stop after `total_count` hops, so a cyclic document still
/// terminates.
fn max_depth(state: &DocumentState) -> usize {
    let limit = state.total_count();
    ItemType::ALL
        .into_iter()
        .flat_map(|t| state.keys(t))
        .map(|key| {
            let mut depth = 1;
            let mut current = state.entity(key).and_then(|e| e.parent());
            while let Some(parent) = current {
                if depth > limit {
                    break;
                }
                depth += 1;
                current = state.entity(parent).and_then(|e| e.parent());
            }
            depth
        })
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutations::callout::AddCallout;
    use crate::mutations::page::AddPage;
    use crate::mutations::step::{AddStep, StepPart};
    use crate::mutations::{CalloutMutations, PageMutations, StepMutations};
    use crate::store::Store;
    use crate::types::{ItemId, LookupKey};

    #[test]
    fn empty_document() {
        let metrics = DocumentMetrics::from_state(&DocumentState::default());
        assert_eq!(metrics.total_items, 0);
        assert_eq!(metrics.max_depth, 0);
        assert_eq!(metrics.counts.len(), ItemType::ALL.len());
    }

    #[test]
    fn counts_and_depth() {
        let mut store = Store::new();
        let page = PageMutations::add(&mut store, &AddPage::default()).expect("page");
        let step = StepMutations::add(&mut store, &AddStep::new(page)).expect("step");
        StepMutations::add_part(&mut store, &StepPart { step: step.id, part_id: 0 }).expect("part");
        CalloutMutations::add(
            &mut store,
            &AddCallout {
                include_empty_step: true,
                ..AddCallout::new(step)
            },
        )
        .expect("callout");

        let metrics = DocumentMetrics::from_state(store.state());
        assert_eq!(metrics.pages, 1);
        assert_eq!(metrics.basic_pages, 1);
        assert_eq!(metrics.steps, 2);
        assert_eq!(metrics.top_level_steps, 1);
        assert_eq!(metrics.parts, 1);
        assert_eq!(metrics.counts["callout"], 1);
        // page > step > callout > calloutArrow > point
        assert_eq!(metrics.max_depth, 5);
    }

    #[test]
    fn cycles_terminate() {
        let mut store = Store::new();
        let page = PageMutations::add(&mut store, &AddPage::default()).expect("page");
        let step = StepMutations::add(&mut store, &AddStep::new(page)).expect("step");
        if let Some(p) = store.state_mut().pages.get_mut(ItemId(0)) {
            p.parent = Some(LookupKey::new(step.item_type, step.id));
        }
        let metrics = DocumentMetrics::from_state(store.state());
        assert!(metrics.max_depth > store.state().total_count());
    }
}
