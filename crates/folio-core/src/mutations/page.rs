//! Page lifecycle and page numbering.

use super::{item::DeleteChildList, item::ItemMutations, renumber, step::DeleteStep, step::StepMutations};
use crate::document::FirstPageNumbering;
use crate::items::{NumberLabel, Page};
use crate::store::Store;
use crate::types::{Align, FolioError, ItemId, ItemType, LookupKey, Orientation, PageSubtype, VAlign};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How a new page gets its number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageNumber {
    /// Use the page's own id.
    Id,
    Number(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AddPage {
    pub page_number: Option<PageNumber>,
    pub subtype: PageSubtype,
    pub do_not_renumber: bool,
    pub parent: Option<LookupKey>,
    pub insertion_index: Option<usize>,
    pub parent_insertion_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePage {
    pub page: ItemId,
    #[serde(default)]
    pub delete_steps: bool,
    #[serde(default)]
    pub do_not_renumber: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetLocked {
    pub page: ItemId,
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetPageLayout {
    pub page: ItemId,
    pub layout: Orientation,
}

pub struct PageMutations;

impl PageMutations {
    /// Add a page. Numbered pages get a right/bottom number label.
    pub fn add(store: &mut Store, opts: &AddPage) -> Result<LookupKey, FolioError> {
        let size = store.state().template.page;
        let page = Page {
            subtype: opts.subtype,
            number: -1,
            needs_layout: true,
            layout: if size.width > size.height {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            },
            ..Page::default()
        };
        let key = ItemMutations::add(
            store,
            page,
            opts.parent,
            opts.insertion_index,
            opts.parent_insertion_index,
        )?;

        if let Some(page_number) = opts.page_number {
            let number = match page_number {
                PageNumber::Id => i64::from(key.id.value()),
                PageNumber::Number(n) => n,
            };
            if let Some(page) = store.state_mut().pages.get_mut(key.id) {
                page.number = number;
            }
            let label = NumberLabel {
                align: Align::Right,
                valign: VAlign::Bottom,
                ..NumberLabel::default()
            };
            ItemMutations::add(store, label, Some(key), None, None)?;
        }

        if !opts.do_not_renumber {
            Self::renumber(store);
        }
        Ok(key)
    }

    /// Delete a page and everything on it.
    ///
    /// # Errors
    ///
    /// `HasChildren` when the page holds steps and `delete_steps` is unset.
    pub fn delete(store: &mut Store, opts: &DeletePage) -> Result<(), FolioError> {
        let key = LookupKey::new(ItemType::Page, opts.page);
        let Some(page) = store.state().pages.get(opts.page) else {
            debug!(page = %key, "delete of missing page ignored");
            return Ok(());
        };
        if !page.steps.is_empty() && !opts.delete_steps {
            return Err(FolioError::HasChildren {
                item: key,
                child_type: ItemType::Step,
            });
        }

        let limit = store.state().steps.len();
        for _ in 0..=limit {
            let Some(step) = store.state().pages.get(opts.page).and_then(|p| p.steps.first().copied())
            else {
                break;
            };
            StepMutations::delete(
                store,
                &DeleteStep {
                    step,
                    delete_parts: true,
                    do_not_renumber: opts.do_not_renumber,
                },
            )?;
            // Dangling ids would stall the loop.
            store
                .state_mut()
                .unlink(key, LookupKey::new(ItemType::Step, step));
        }

        for list_type in [
            ItemType::NumberLabel,
            ItemType::Divider,
            ItemType::Annotation,
            ItemType::PliItem,
        ] {
            ItemMutations::delete_child_list(store, &DeleteChildList { item: key, list_type })?;
        }
        Self::release_stretched_step(store, opts.page);
        store.state_mut().remove_item(key)?;

        if !opts.do_not_renumber {
            Self::renumber(store);
        }
        Ok(())
    }

    /// A page that displayed part of a stretched step no longer does.
    fn release_stretched_step(store: &mut Store, page: ItemId) {
        let Some(stretched) = store.state().pages.get(page).and_then(|p| p.stretched_step) else {
            return;
        };
        if let Some(step) = store.state_mut().steps.get_mut(stretched.step_id) {
            step.stretched_pages.retain(|id| *id != page);
        }
    }

    /// Renumber pages.
    ///
    /// Without books every non-template page is numbered in registry order,
    /// from 1 when a template page takes slot 0 and from 0 otherwise. With
    /// books each book is numbered by the document's [`FirstPageNumbering`].
    pub fn renumber(store: &mut Store) {
        let state = store.state();
        if state.books.is_empty() {
            let has_template = state
                .pages
                .iter()
                .any(|p| p.subtype == PageSubtype::TemplatePage);
            let keys: Vec<LookupKey> = state
                .pages
                .iter()
                .filter(|p| p.subtype != PageSubtype::TemplatePage)
                .map(LookupKey::from)
                .collect();
            renumber(store.state_mut(), &keys, i64::from(has_template));
            return;
        }

        let policy = state.first_page_numbering;
        let books: Vec<Vec<LookupKey>> = state
            .books
            .iter()
            .map(|b| {
                b.pages
                    .iter()
                    .map(|id| LookupKey::new(ItemType::Page, *id))
                    .collect()
            })
            .collect();
        let mut prev_last: Option<i64> = None;
        for pages in books {
            let start = match policy {
                FirstPageNumbering::StartPage1 => 1,
                FirstPageNumbering::PreservePageCount => prev_last.map_or(1, |n| n + 1),
            };
            renumber(store.state_mut(), &pages, start);
            prev_last = pages
                .last()
                .and_then(|k| store.state().pages.get(k.id))
                .map(|p| p.number);
        }
    }

    pub fn set_locked(store: &mut Store, opts: &SetLocked) {
        if let Some(page) = store.state_mut().pages.get_mut(opts.page) {
            page.locked = opts.locked;
        }
    }

    pub fn set_layout(store: &mut Store, opts: &SetPageLayout) {
        if let Some(page) = store.state_mut().pages.get_mut(opts.page) {
            page.layout = opts.layout;
            page.needs_layout = true;
        }
    }

    /// Flag every page for the layout engine.
    pub fn mark_all_dirty(store: &mut Store) {
        for page in store.state_mut().pages.iter_mut() {
            page.needs_layout = true;
        }
    }
}
