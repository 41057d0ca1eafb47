//! Title pages: the cover of each book, naming the model and its size.

use super::annotation::{AddAnnotation, AnnotationMutations, AnnotationProps};
use super::item::{DeleteChildList, ItemMutations};
use super::page::{AddPage, DeletePage, PageMutations};
use super::step::{AddStep, StepMutations};
use crate::items::StepModel;
use crate::store::Store;
use crate::types::{AnnotationKind, FolioError, ItemId, ItemType, LookupKey, PageSubtype};
use serde::{Deserialize, Serialize};

/// Meta tag of the model name label.
pub const TITLE_LABEL_META: &str = "title-page-model-name";
/// Meta tag of the part and page count label.
pub const PAGE_COUNT_LABEL_META: &str = "title-page-page-count";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleLabel {
    pub page: ItemId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageCountLabel {
    pub page: ItemId,
    /// Book the title page opens, for the "Book N" prefix.
    #[serde(default)]
    pub book: Option<ItemId>,
}

fn label(store: &mut Store, page: ItemId, text: String, font: &str, meta: &str) -> Result<LookupKey, FolioError> {
    AnnotationMutations::add(
        store,
        &AddAnnotation {
            annotation_type: AnnotationKind::Label,
            parent: LookupKey::new(ItemType::Page, page),
            x: 0.0,
            y: 0.0,
            properties: AnnotationProps {
                text: Some(text),
                font: Some(font.to_owned()),
                meta: Some(meta.to_owned()),
                ..AnnotationProps::default()
            },
        },
    )
}

pub struct TitlePageMutations;

impl TitlePageMutations {
    /// Add a title page to each book, or a single one after the template
    /// page when the document has at most one book.
    pub fn add(store: &mut Store) -> Result<Vec<LookupKey>, FolioError> {
        let books: Vec<ItemId> = if store.state().books.len() > 1 {
            store.state().books.ids()
        } else {
            Vec::new()
        };
        if books.is_empty() {
            return Ok(vec![Self::add_one(store, None)?]);
        }
        books
            .into_iter()
            .map(|book| Self::add_one(store, Some(book)))
            .collect()
    }

    fn add_one(store: &mut Store, book: Option<ItemId>) -> Result<LookupKey, FolioError> {
        let state = store.state();
        let (parent, insertion_index) = match book.and_then(|id| state.books.get(id)) {
            Some(book) => (
                Some(LookupKey::from(book)),
                book.pages.first().and_then(|first| state.pages.position(*first)),
            ),
            None => (None, Some(1)),
        };
        let page = PageMutations::add(
            store,
            &AddPage {
                subtype: PageSubtype::TitlePage,
                parent,
                insertion_index,
                parent_insertion_index: Some(0),
                do_not_renumber: true,
                ..AddPage::default()
            },
        )?;
        let number = match parent {
            Some(book) => {
                let state = store.state();
                state
                    .child_ids(book, ItemType::Page)
                    .get(1)
                    .and_then(|id| state.pages.get(*id))
                    .map_or(1, |p| p.number)
            }
            None => 1,
        };
        if let Some(p) = store.state_mut().pages.get_mut(page.id) {
            p.number = number;
        }
        PageMutations::renumber(store);

        let model = store.catalog().main_model().map(str::to_owned).unwrap_or_default();
        StepMutations::add(
            store,
            &AddStep {
                model: Some(StepModel {
                    filename: model,
                    parent_step_id: None,
                }),
                ..AddStep::new(page)
            },
        )?;
        Self::add_title_label(store, &TitleLabel { page: page.id })?;
        Self::add_page_count_label(store, &PageCountLabel { page: page.id, book })?;
        Ok(page)
    }

    /// Remove every title page with its steps.
    pub fn delete(store: &mut Store) -> Result<(), FolioError> {
        let pages: Vec<ItemId> = store
            .state()
            .pages
            .iter()
            .filter(|p| p.subtype == PageSubtype::TitlePage)
            .map(|p| p.id)
            .collect();
        for page in pages {
            ItemMutations::delete_child_list(
                store,
                &DeleteChildList {
                    item: LookupKey::new(ItemType::Page, page),
                    list_type: ItemType::Step,
                },
            )?;
            PageMutations::delete(
                store,
                &DeletePage {
                    page,
                    delete_steps: false,
                    do_not_renumber: false,
                },
            )?;
        }
        Ok(())
    }

    pub fn add_title_label(store: &mut Store, opts: &TitleLabel) -> Result<LookupKey, FolioError> {
        let text = store.get().model_name(true);
        label(store, opts.page, text, "20pt Helvetica", TITLE_LABEL_META)
    }

    /// Label reading "N parts, M pages", prefixed with the book number when
    /// the page opens a book.
    pub fn add_page_count_label(store: &mut Store, opts: &PageCountLabel) -> Result<LookupKey, FolioError> {
        let get = store.get();
        let parts = get
            .state()
            .filename
            .as_deref()
            .or_else(|| store.catalog().main_model())
            .map_or(0, |model| store.catalog().part_count(model));
        let counts = format!("{parts} parts, {} pages", get.page_count());
        let text = match opts.book.and_then(|id| get.book(id)) {
            Some(book) => format!("Book {}: {counts}", book.number),
            None => counts,
        };
        label(store, opts.page, text, "16pt Helvetica", PAGE_COUNT_LABEL_META)
    }
}
