//! # Property-Based Tests
//!
//! Invariants that must hold for any sequence of edits: link integrity,
//! id allocation, renumbering, coordinate conversion and undo/redo.

use folio_core::mutations::annotation::{AddAnnotation, AnnotationProps, AnnotationRef};
use folio_core::mutations::page::{AddPage, DeletePage, PageNumber};
use folio_core::mutations::step::{AddStep, DeleteStep, MoveToPage, StepPart, StepRef};
use folio_core::mutations::{AnnotationMutations, PageMutations, StepMutations};
use folio_core::{
    AnnotationKind, Callout, FolioError, ItemId, ItemType, LookupKey, Mutation, Page, Point, Step,
    Store, UndoStack, integrity, renumber,
};
use proptest::collection::vec;
use proptest::prelude::*;

// =============================================================================
// STRATEGIES
// =============================================================================

#[derive(Debug, Clone)]
enum Edit {
    AddStep { page: usize },
    AddPart { step: usize, part: u32 },
    AddAnnotation { page: usize },
    DeleteStep { step: usize },
    DeleteAnnotation { annotation: usize },
    MoveStep { step: usize, page: usize },
    AddCallout { step: usize },
    AddSubStep { step: usize },
    Reparent { item: usize, new_parent: usize },
    DeletePage { page: usize, cascade: bool },
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0usize..8).prop_map(|page| Edit::AddStep { page }),
        (0usize..16, 0u32..6).prop_map(|(step, part)| Edit::AddPart { step, part }),
        (0usize..8).prop_map(|page| Edit::AddAnnotation { page }),
        (0usize..16).prop_map(|step| Edit::DeleteStep { step }),
        (0usize..16).prop_map(|annotation| Edit::DeleteAnnotation { annotation }),
        (0usize..16, 0usize..8).prop_map(|(step, page)| Edit::MoveStep { step, page }),
        (0usize..16).prop_map(|step| Edit::AddCallout { step }),
        (0usize..16).prop_map(|step| Edit::AddSubStep { step }),
        (0usize..32, 0usize..32).prop_map(|(item, new_parent)| Edit::Reparent { item, new_parent }),
        (0usize..8, any::<bool>()).prop_map(|(page, cascade)| Edit::DeletePage { page, cascade }),
    ]
}

/// Steps, callouts and pages: the items that nest inside one another.
fn containers(store: &Store) -> Vec<LookupKey> {
    [ItemType::Step, ItemType::Callout, ItemType::Page]
        .into_iter()
        .flat_map(|item_type| store.state().keys(item_type))
        .collect()
}

fn pick(ids: &[ItemId], index: usize) -> Option<ItemId> {
    (!ids.is_empty()).then(|| ids[index % ids.len()])
}

fn document(pages: usize) -> Store {
    let mut store = Store::new();
    for _ in 0..pages {
        PageMutations::add(
            &mut store,
            &AddPage {
                page_number: Some(PageNumber::Id),
                ..AddPage::default()
            },
        )
        .expect("page");
    }
    store
}

fn apply(store: &mut Store, edit: &Edit) -> Result<(), FolioError> {
    let pages = store.state().pages.ids();
    let steps = store.state().steps.ids();
    let annotations = store.state().annotations.ids();
    match *edit {
        Edit::AddStep { page } => {
            if let Some(page) = pick(&pages, page) {
                let dest = LookupKey::new(ItemType::Page, page);
                StepMutations::add(
                    store,
                    &AddStep {
                        renumber: true,
                        ..AddStep::new(dest)
                    },
                )?;
            }
        }
        Edit::AddPart { step, part } => {
            if let Some(step) = pick(&steps, step) {
                StepMutations::add_part(store, &StepPart { step, part_id: part })?;
            }
        }
        Edit::AddAnnotation { page } => {
            if let Some(page) = pick(&pages, page) {
                AnnotationMutations::add(
                    store,
                    &AddAnnotation {
                        annotation_type: AnnotationKind::Label,
                        parent: LookupKey::new(ItemType::Page, page),
                        x: 5.0,
                        y: 5.0,
                        properties: AnnotationProps::default(),
                    },
                )?;
            }
        }
        Edit::DeleteStep { step } => {
            if let Some(step) = pick(&steps, step) {
                StepMutations::delete(
                    store,
                    &DeleteStep {
                        step,
                        delete_parts: true,
                        do_not_renumber: false,
                    },
                )?;
            }
        }
        Edit::DeleteAnnotation { annotation } => {
            if let Some(annotation) = pick(&annotations, annotation) {
                AnnotationMutations::delete(store, &AnnotationRef { annotation })?;
            }
        }
        Edit::MoveStep { step, page } => {
            let on_page = steps
                .iter()
                .copied()
                .filter(|id| {
                    store
                        .state()
                        .steps
                        .get(*id)
                        .and_then(|s| s.parent)
                        .is_some_and(|p| p.item_type == ItemType::Page)
                })
                .collect::<Vec<_>>();
            if let (Some(step), Some(dest_page)) = (pick(&on_page, step), pick(&pages, page)) {
                StepMutations::move_to_page(
                    store,
                    &MoveToPage {
                        step,
                        dest_page,
                        parent_insertion_index: None,
                    },
                )?;
            }
        }
        Edit::AddCallout { step } => {
            if let Some(step) = pick(&steps, step) {
                StepMutations::add_callout(store, &StepRef { step })?;
            }
        }
        Edit::AddSubStep { step } => {
            if let Some(step) = pick(&steps, step) {
                StepMutations::add_sub_step(store, &StepRef { step })?;
            }
        }
        Edit::Reparent { item, new_parent } => {
            let keys = containers(store);
            if let (Some(&item), Some(&new_parent)) = (
                keys.get(item % keys.len().max(1)),
                keys.get(new_parent % keys.len().max(1)),
            ) {
                store.state_mut().reparent_item(item, new_parent, None)?;
            }
        }
        Edit::DeletePage { page, cascade } => {
            if let Some(page) = pick(&pages, page) {
                PageMutations::delete(
                    store,
                    &DeletePage {
                        page,
                        delete_steps: cascade,
                        do_not_renumber: false,
                    },
                )?;
            }
        }
    }
    Ok(())
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Links stay two-way consistent and acyclic after any edit sequence,
    /// and a rejected edit leaves the document as it was.
    #[test]
    fn edits_preserve_link_integrity(edits in vec(edit(), 1..40)) {
        let mut store = document(4);
        for edit in &edits {
            let before = store.state().clone();
            if let Err(err) = apply(&mut store, edit) {
                prop_assert!(
                    matches!(err, FolioError::InvalidArgument(_) | FolioError::HasChildren { .. }),
                    "{:?} failed with {:?}", edit, err
                );
                prop_assert_eq!(store.state(), &before, "rejected {:?} wrote", edit);
            }
            let violations = integrity::check_structure(store.state());
            prop_assert!(violations.is_empty(), "after {:?}: {:?}", edit, violations);
        }
    }

    /// Every nested tree can be torn down from the top, whatever was moved.
    #[test]
    fn deleting_every_page_empties_the_document(edits in vec(edit(), 1..40)) {
        let mut store = document(4);
        for edit in &edits {
            let _ = apply(&mut store, edit);
        }
        for page in store.state().pages.ids() {
            PageMutations::delete(
                &mut store,
                &DeletePage {
                    page,
                    delete_steps: true,
                    do_not_renumber: false,
                },
            )
            .expect("delete page");
        }
        let state = store.state();
        prop_assert!(state.steps.is_empty() && state.callouts.is_empty() && state.csis.is_empty());
        prop_assert!(integrity::check_structure(state).is_empty());
    }

    /// A new item always takes max existing id + 1.
    #[test]
    fn ids_are_allocated_above_existing(edits in vec(edit(), 1..40)) {
        let mut store = document(3);
        for edit in &edits {
            let expected = store
                .state()
                .steps
                .ids()
                .into_iter()
                .max()
                .map_or(ItemId(0), |max| ItemId(max.0 + 1));
            prop_assert_eq!(store.state().next_item_id(ItemType::Step), expected);
            let _ = apply(&mut store, edit);
        }
    }

    /// Renumbering twice equals renumbering once, and leaves no gaps.
    #[test]
    fn renumber_is_idempotent(numbers in vec(-5i64..50, 1..30), start in 0i64..3) {
        let mut store = document(numbers.len());
        for (page, number) in store.state_mut().pages.iter_mut().zip(&numbers) {
            page.number = *number;
        }
        let keys = store.state().keys(ItemType::Page);

        renumber(store.state_mut(), &keys, start);
        let once = store.state().clone();
        renumber(store.state_mut(), &keys, start);
        prop_assert_eq!(store.state(), &once);

        let result: Vec<i64> = once.pages.iter().map(|p| p.number).collect();
        let expected: Vec<i64> = (start..).take(numbers.len()).collect();
        prop_assert_eq!(result, expected);
    }

    /// Converting an item's page position into its parent's frame gives
    /// back the item's own origin, whatever offsets the chain carries.
    #[test]
    fn coordinate_conversion_round_trips(
        step_at in (-500i32..500, -500i32..500),
        callout_at in (-500i32..500, -500i32..500),
        content_offset in (1i32..40, 1i32..40),
        inner_at in (-500i32..500, -500i32..500),
    ) {
        let f = |v: i32| f64::from(v);
        let mut store = Store::new();
        let state = store.state_mut();
        let page = state.add_item(Page::default(), None, None, None).expect("page");
        let step = state
            .add_item(
                Step { x: Some(f(step_at.0)), y: Some(f(step_at.1)), ..Step::default() },
                Some(page),
                None,
                None,
            )
            .expect("step");
        let callout = state
            .add_item(
                Callout {
                    x: Some(f(callout_at.0)),
                    y: Some(f(callout_at.1)),
                    inner_content_offset: Point::new(f(content_offset.0), f(content_offset.1)),
                    ..Callout::default()
                },
                Some(step),
                None,
                None,
            )
            .expect("callout");
        let inner = state
            .add_item(
                Step { x: Some(f(inner_at.0)), y: Some(f(inner_at.1)), ..Step::default() },
                Some(callout),
                None,
                None,
            )
            .expect("inner step");

        let get = store.get();
        let on_page = get.item_to_page(inner);
        let parent = get.parent(inner).map(|p| p.key()).expect("parent");
        prop_assert_eq!(parent, callout);
        prop_assert_eq!(get.page_to_item(on_page, parent), Point::new(f(inner_at.0), f(inner_at.1)));
        prop_assert_eq!(get.page_to_item(on_page, inner), Point::default());
        prop_assert_eq!(
            on_page,
            Point::new(
                f(step_at.0 + callout_at.0 + inner_at.0),
                f(step_at.1 + callout_at.1 + inner_at.1)
            )
        );
    }

    /// Undo after N commits restores the base state; redo replays all of them.
    #[test]
    fn undo_redo_are_inverse(pages in 1usize..6) {
        let mut store = document(1);
        let mut stack = UndoStack::new();
        stack.save_base_state(&store);
        let base = store.state().clone();

        for _ in 0..pages {
            stack
                .commit(&mut store, &Mutation::PageAdd(AddPage::default()), "Add Page")
                .expect("commit");
        }
        let last = store.state().clone();

        while stack.undo(&mut store) {}
        prop_assert_eq!(store.state(), &base);
        while stack.redo(&mut store) {}
        prop_assert_eq!(store.state(), &last);
        prop_assert_eq!(stack.len(), pages + 1);
    }
}
