//! Books: splitting one set of instructions into several volumes.
//!
//! A book owns a run of pages. Pages outside every book stay parentless.
//! Page numbering across books follows the document's
//! [`FirstPageNumbering`] policy.

use super::item::ItemMutations;
use super::page::{DeletePage, PageMutations};
use super::renumber;
use super::title_page::TitlePageMutations;
use crate::document::{Collection, DocumentState, FirstPageNumbering};
use crate::items::Book;
use crate::store::Store;
use crate::types::{FolioError, ItemId, ItemType, LookupKey, PartId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Inclusive range of page or step numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpan {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBook {
    pub book_number: i64,
    pub pages: PageSpan,
}

/// One entry of a division plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDivision {
    pub book_number: i64,
    pub pages: PageSpan,
    #[serde(default)]
    pub steps: Option<PageSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRef {
    pub book: ItemId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBookPageNumbers {
    pub book: ItemId,
    pub first_page_numbering: FirstPageNumbering,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DivideInstructions {
    /// Explicit plan. When empty, `pages_per_book` builds one.
    pub book_divisions: Vec<BookDivision>,
    pub pages_per_book: Option<usize>,
    pub first_page_numbering: FirstPageNumbering,
    pub include_title_pages: bool,
}

/// Plan that cuts the basic pages into books of `pages_per_book` pages.
#[must_use]
pub fn divisions_every(state: &DocumentState, pages_per_book: usize) -> Vec<BookDivision> {
    let numbers: Vec<i64> = state
        .pages
        .iter()
        .filter(|p| p.is_basic())
        .map(|p| p.number)
        .collect();
    numbers
        .chunks(pages_per_book.max(1))
        .zip(1_i64..)
        .filter_map(|(chunk, book_number)| {
            let (first, last) = (chunk.first()?, chunk.last()?);
            Some(BookDivision {
                book_number,
                pages: PageSpan {
                    start: *first,
                    end: *last,
                },
                steps: None,
            })
        })
        .collect()
}

pub struct BookMutations;

impl BookMutations {
    /// Create a book and move every page numbered within `pages` into it.
    pub fn add(store: &mut Store, opts: &AddBook) -> Result<LookupKey, FolioError> {
        let mut by_number: BTreeMap<i64, ItemId> = BTreeMap::new();
        for page in store.state().pages.iter() {
            if (opts.pages.start..=opts.pages.end).contains(&page.number) {
                by_number.entry(page.number).or_insert(page.id);
            }
        }
        let book = Book {
            number: opts.book_number,
            ..Book::default()
        };
        let key = ItemMutations::add(store, book, None, None, None)?;
        for page in by_number.into_values() {
            store
                .state_mut()
                .reparent_item(LookupKey::new(ItemType::Page, page), key, None)?;
        }
        Ok(key)
    }

    /// Drop a book. Its pages stay, outside any book.
    pub fn delete(store: &mut Store, opts: &BookRef) -> Result<(), FolioError> {
        let key = LookupKey::new(ItemType::Book, opts.book);
        let Some(pages) = store.state().books.get(opts.book).map(|b| b.pages.clone()) else {
            debug!(book = %key, "delete of missing book ignored");
            return Ok(());
        };
        for page in pages {
            store
                .state_mut()
                .detach_item(LookupKey::new(ItemType::Page, page));
        }
        store.state_mut().remove_item(key)?;
        PageMutations::renumber(store);
        Ok(())
    }

    /// Number the book's pages from 1, or continue from the previous book.
    ///
    /// # Errors
    ///
    /// `NotFound` when the book does not exist.
    pub fn set_book_page_numbers(store: &mut Store, opts: &SetBookPageNumbers) -> Result<(), FolioError> {
        let key = LookupKey::new(ItemType::Book, opts.book);
        let Some(pages) = store.state().books.get(opts.book).map(|b| b.pages.clone()) else {
            return Err(FolioError::NotFound(key));
        };
        store.state_mut().first_page_numbering = opts.first_page_numbering;
        match opts.first_page_numbering {
            FirstPageNumbering::StartPage1 => {
                let keys: Vec<LookupKey> = pages
                    .into_iter()
                    .map(|id| LookupKey::new(ItemType::Page, id))
                    .collect();
                renumber(store.state_mut(), &keys, 1);
            }
            FirstPageNumbering::PreservePageCount => PageMutations::renumber(store),
        }
        Ok(())
    }

    /// Split the document into books, optionally giving each its own title
    /// page, then number every book's pages.
    pub fn divide_instructions(store: &mut Store, opts: &DivideInstructions) -> Result<Vec<LookupKey>, FolioError> {
        let divisions = match (opts.book_divisions.is_empty(), opts.pages_per_book) {
            (true, Some(n)) => divisions_every(store.state(), n),
            _ => opts.book_divisions.clone(),
        };
        let mut books = Vec::with_capacity(divisions.len());
        for division in &divisions {
            books.push(Self::add(
                store,
                &AddBook {
                    book_number: division.book_number,
                    pages: division.pages,
                },
            )?);
        }
        if opts.include_title_pages {
            TitlePageMutations::delete(store)?;
            TitlePageMutations::add(store)?;
        }
        for book in &books {
            Self::set_book_page_numbers(
                store,
                &SetBookPageNumbers {
                    book: book.id,
                    first_page_numbering: opts.first_page_numbering,
                },
            )?;
        }
        Ok(books)
    }

    /// Document holding only `book`'s pages.
    ///
    /// Works on a copy; `store` is untouched. Every book after the first
    /// records, on the first step of each model it shows, the parts built
    /// in earlier books so part lists still add up.
    ///
    /// # Errors
    ///
    /// `NotFound` when the book does not exist.
    pub fn state_for_book(store: &Store, book: ItemId) -> Result<DocumentState, FolioError> {
        let key = LookupKey::new(ItemType::Book, book);
        let Some(target) = store.state().books.get(book).cloned() else {
            return Err(FolioError::NotFound(key));
        };
        let mut copy = store.clone();

        let is_first = store.state().books.first().is_some_and(|b| b.id == book);
        if !is_first {
            let get = store.get();
            let mut seen = BTreeSet::new();
            let carried: Vec<(ItemId, Vec<PartId>)> = target
                .pages
                .iter()
                .filter_map(|id| get.page(*id))
                .flat_map(|page| page.steps.iter().copied())
                .filter_map(|id| get.step(id))
                .filter(|step| seen.insert(step.model.filename.clone()))
                .map(|step| (step.id, get.part_list(step.id)))
                .collect();
            for (step, parts) in carried {
                if let Some(step) = copy.state_mut().steps.get_mut(step) {
                    step.prev_book_parts = Some(parts);
                }
            }
        }

        let foreign: Vec<ItemId> = copy
            .state()
            .pages
            .iter()
            .filter(|p| p.parent.is_some_and(|parent| parent.id != book))
            .map(|p| p.id)
            .collect();
        for page in foreign {
            PageMutations::delete(
                &mut copy,
                &DeletePage {
                    page,
                    delete_steps: true,
                    do_not_renumber: true,
                },
            )?;
        }
        let kept = copy.state().books.get(book).cloned().unwrap_or(target);
        copy.state_mut().books = Collection::from_items(vec![kept]);
        Ok(copy.into_state())
    }
}
