//! # Integrity Checker
//!
//! Audits a [`DocumentState`] against the structural rules every committed
//! mutation must preserve:
//!
//! 1. parent keys resolve to existing items;
//! 2. each listed child exists, points back at its lister, and is listed by
//!    exactly one parent exactly once;
//! 3. ids are unique within their type;
//! 4. no item is its own ancestor;
//! 5. numbering is gapless within each numbering scope.
//!
//! The checker never mutates. Numbering findings are reported separately
//! from structural ones because a numbering gap is repaired by a renumber
//! pass while a broken link is not.

use crate::document::DocumentState;
use crate::items::Entity;
use crate::types::{ItemId, ItemType, LookupKey, PageSubtype};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One broken rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Violation {
    /// A non-root item has no parent.
    MissingParent { item: LookupKey },
    /// An item's parent key resolves to nothing.
    DanglingParent { item: LookupKey, parent: LookupKey },
    /// A parent lists a child id that is not in the registry.
    MissingChild { parent: LookupKey, child: LookupKey },
    /// A listed child names a different parent.
    ParentMismatch {
        parent: LookupKey,
        child: LookupKey,
        actual: Option<LookupKey>,
    },
    /// A child appears more than once across all parent links.
    DuplicateChild { child: LookupKey, occurrences: usize },
    /// An item names a parent that does not list it.
    UnlistedChild { item: LookupKey, parent: LookupKey },
    /// Following parents from an item leads back to it.
    Cycle { item: LookupKey },
    /// Two items of one type share an id.
    DuplicateId { key: LookupKey },
    /// A number does not follow its predecessor in scope.
    NumberingGap {
        item: LookupKey,
        expected: i64,
        found: i64,
    },
}

impl Violation {
    /// Whether a renumber pass would not fix this.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        !matches!(self, Violation::NumberingGap { .. })
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingParent { item } => write!(f, "{item} has no parent"),
            Violation::DanglingParent { item, parent } => {
                write!(f, "{item} names missing parent {parent}")
            }
            Violation::MissingChild { parent, child } => {
                write!(f, "{parent} lists missing child {child}")
            }
            Violation::ParentMismatch { parent, child, actual } => match actual {
                Some(actual) => write!(f, "{parent} lists {child}, whose parent is {actual}"),
                None => write!(f, "{parent} lists {child}, which has no parent"),
            },
            Violation::DuplicateChild { child, occurrences } => {
                write!(f, "{child} is linked {occurrences} times")
            }
            Violation::UnlistedChild { item, parent } => {
                write!(f, "{item} names parent {parent}, which does not list it")
            }
            Violation::Cycle { item } => write!(f, "{item} is its own ancestor"),
            Violation::DuplicateId { key } => write!(f, "id of {key} is used more than once"),
            Violation::NumberingGap { item, expected, found } => {
                write!(f, "{item} is numbered {found}, expected {expected}")
            }
        }
    }
}

/// Types that may sit at the top of the tree.
fn is_root_type(item_type: ItemType) -> bool {
    matches!(item_type, ItemType::Book | ItemType::Page)
}

/// Run every check.
#[must_use]
pub fn check(state: &DocumentState) -> Vec<Violation> {
    let mut violations = Vec::new();
    check_ids(state, &mut violations);
    check_parents(state, &mut violations);
    check_child_links(state, &mut violations);
    check_cycles(state, &mut violations);
    check_numbering(state, &mut violations);
    violations
}

/// Structural findings only.
#[must_use]
pub fn check_structure(state: &DocumentState) -> Vec<Violation> {
    check(state).into_iter().filter(Violation::is_structural).collect()
}

fn check_ids(state: &DocumentState, out: &mut Vec<Violation>) {
    for item_type in ItemType::ALL {
        let mut seen = BTreeSet::new();
        for entity in state.entities(item_type) {
            if !seen.insert(entity.id()) {
                out.push(Violation::DuplicateId { key: entity.key() });
            }
        }
    }
}

fn check_parents(state: &DocumentState, out: &mut Vec<Violation>) {
    for item_type in ItemType::ALL {
        for entity in state.entities(item_type) {
            match entity.parent() {
                None if is_root_type(item_type) => {}
                None => out.push(Violation::MissingParent { item: entity.key() }),
                Some(parent) => match state.entity(parent) {
                    None => out.push(Violation::DanglingParent {
                        item: entity.key(),
                        parent,
                    }),
                    Some(owner) => {
                        let listed = owner
                            .child_link(item_type)
                            .is_some_and(|link| link.occurrences(entity.id()) > 0);
                        if !listed {
                            out.push(Violation::UnlistedChild {
                                item: entity.key(),
                                parent,
                            });
                        }
                    }
                },
            }
        }
    }
}

fn check_child_links(state: &DocumentState, out: &mut Vec<Violation>) {
    let mut counts: BTreeMap<LookupKey, usize> = BTreeMap::new();
    for parent_type in ItemType::ALL {
        for owner in state.entities(parent_type) {
            let parent = owner.key();
            for child_type in owner.child_types() {
                let Some(link) = owner.child_link(*child_type) else {
                    continue;
                };
                for id in link.ids() {
                    let child = LookupKey::new(*child_type, id);
                    *counts.entry(child).or_default() += 1;
                    match state.entity(child) {
                        None => out.push(Violation::MissingChild { parent, child }),
                        Some(item) if item.parent() != Some(parent) => {
                            out.push(Violation::ParentMismatch {
                                parent,
                                child,
                                actual: item.parent(),
                            });
                        }
                        Some(_) => {}
                    }
                }
            }
        }
    }
    out.extend(
        counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(child, occurrences)| Violation::DuplicateChild { child, occurrences }),
    );
}

fn check_cycles(state: &DocumentState, out: &mut Vec<Violation>) {
    for item_type in ItemType::ALL {
        for entity in state.entities(item_type) {
            let item = entity.key();
            if entity.parent().is_some_and(|parent| state.lies_within(parent, item)) {
                out.push(Violation::Cycle { item });
            }
        }
    }
}

// =============================================================================
// NUMBERING SCOPES
// =============================================================================

fn check_numbering(state: &DocumentState, out: &mut Vec<Violation>) {
    for scope in numbering_scopes(state) {
        let mut prev: Option<i64> = None;
        for key in scope {
            let Some(number) = state.entity(key).and_then(|e: &dyn Entity| e.number()) else {
                continue;
            };
            if let Some(p) = prev {
                let expected = p.saturating_add(1);
                if number != expected {
                    out.push(Violation::NumberingGap {
                        item: key,
                        expected,
                        found: number,
                    });
                }
            }
            prev = Some(number);
        }
    }
}

/// Ordered item lists that each carry one gapless numbering.
///
/// - pages: the whole document, or each book;
/// - steps on basic pages, across the document;
/// - steps nested in one callout or step.
#[must_use]
pub fn numbering_scopes(state: &DocumentState) -> Vec<Vec<LookupKey>> {
    let mut scopes = Vec::new();
    if state.books.is_empty() {
        scopes.push(
            state
                .pages
                .iter()
                .filter(|p| p.subtype != PageSubtype::TemplatePage)
                .map(LookupKey::from)
                .collect(),
        );
    } else {
        scopes.extend(state.books.iter().map(|book| {
            book.pages
                .iter()
                .map(|id| LookupKey::new(ItemType::Page, *id))
                .collect()
        }));
    }

    scopes.push(
        state
            .steps
            .iter()
            .filter(|s| {
                s.parent
                    .filter(|p| p.item_type == ItemType::Page)
                    .and_then(|p| state.pages.get(p.id))
                    .is_some_and(crate::items::Page::is_basic)
            })
            .map(LookupKey::from)
            .collect(),
    );

    let nested = |steps: &[ItemId]| -> Vec<LookupKey> {
        steps.iter().map(|id| LookupKey::new(ItemType::Step, *id)).collect()
    };
    scopes.extend(state.callouts.iter().map(|c| nested(&c.steps)));
    scopes.extend(
        state
            .steps
            .iter()
            .filter(|s| !s.steps.is_empty())
            .map(|s| nested(&s.steps)),
    );
    scopes
}
