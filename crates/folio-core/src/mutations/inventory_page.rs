//! Inventory pages: the full bill of materials at the end of the book.

use super::item::{DeleteChildList, ItemMutations};
use super::mark_page_for_layout;
use super::page::{AddPage, PageMutations, PageNumber};
use super::pli_item::{AddPliItem, DeletePliItem, PliItemMutations};
use crate::catalog::{PartCatalog, MAX_SUBMODEL_DEPTH};
use crate::store::Store;
use crate::types::{ColorCode, FolioError, ItemId, ItemType, LookupKey, PageSubtype, PartRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Items placed on each inventory page.
pub const DEFAULT_ITEMS_PER_PAGE: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AddInventoryPages {
    /// Items per page; [`DEFAULT_ITEMS_PER_PAGE`] when unset.
    pub items_per_page: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryPageRef {
    pub page: ItemId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryPart {
    pub part: PartRef,
}

/// Library parts of `model`, submodels expanded, counted per color and file.
fn tally(catalog: &dyn PartCatalog, model: &str, depth: usize, out: &mut BTreeMap<(ColorCode, String), u32>) {
    if depth > MAX_SUBMODEL_DEPTH {
        return;
    }
    for part in catalog.model_parts(model) {
        if catalog.is_submodel(&part.filename) {
            tally(catalog, &part.filename, depth + 1, out);
        } else {
            *out.entry((part.color_code, part.filename)).or_insert(0) += 1;
        }
    }
}

pub struct InventoryPageMutations;

impl InventoryPageMutations {
    /// Append inventory pages listing every part of the main model.
    /// Returns the new pages; none when no model is loaded.
    pub fn add(store: &mut Store, opts: &AddInventoryPages) -> Result<Vec<LookupKey>, FolioError> {
        let Some(main) = store.catalog().main_model().map(str::to_owned) else {
            return Ok(Vec::new());
        };
        let mut counts = BTreeMap::new();
        tally(store.catalog(), &main, 0, &mut counts);
        let entries: Vec<((ColorCode, String), u32)> = counts.into_iter().collect();
        let per_page = opts.items_per_page.unwrap_or(DEFAULT_ITEMS_PER_PAGE).max(1);

        let mut pages = Vec::new();
        let chunks: Vec<&[((ColorCode, String), u32)]> = if entries.is_empty() {
            vec![entries.as_slice()]
        } else {
            entries.chunks(per_page).collect()
        };
        for chunk in chunks {
            let number = store.get().last_page().map_or(0, |p| p.number + 1);
            let page = PageMutations::add(
                store,
                &AddPage {
                    page_number: Some(PageNumber::Number(number)),
                    subtype: PageSubtype::InventoryPage,
                    ..AddPage::default()
                },
            )?;
            for ((color_code, filename), quantity) in chunk {
                PliItemMutations::add(
                    store,
                    &AddPliItem {
                        parent: page,
                        filename: filename.clone(),
                        color_code: *color_code,
                        quantity: Some(*quantity),
                    },
                )?;
            }
            pages.push(page);
        }
        Ok(pages)
    }

    pub fn delete(store: &mut Store, opts: &InventoryPageRef) -> Result<(), FolioError> {
        let key = LookupKey::new(ItemType::Page, opts.page);
        if !store.state().contains(key) {
            debug!(page = %key, "delete of missing inventory page ignored");
            return Ok(());
        }
        for list_type in [ItemType::NumberLabel, ItemType::PliItem] {
            ItemMutations::delete_child_list(store, &DeleteChildList { item: key, list_type })?;
        }
        store.state_mut().remove_item(key)?;
        Ok(())
    }

    pub fn delete_all(store: &mut Store) -> Result<(), FolioError> {
        let pages: Vec<ItemId> = store.get().inventory_pages().iter().map(|p| p.id).collect();
        for page in pages {
            Self::delete(store, &InventoryPageRef { page })?;
        }
        PageMutations::renumber(store);
        Ok(())
    }

    /// Item for `part` on any inventory page.
    fn find_item(store: &Store, part: &PartRef) -> Option<(ItemId, u32)> {
        let get = store.get();
        get.inventory_pages()
            .into_iter()
            .find_map(|page| get.matching_pli_item(LookupKey::from(page), part))
            .map(|item| (item.id, item.quantity))
    }

    /// Count one more of `part`, listing it on the first inventory page when
    /// it is new.
    pub fn add_part(store: &mut Store, opts: &InventoryPart) -> Result<(), FolioError> {
        let Some(first) = store.get().inventory_pages().first().map(|p| LookupKey::from(*p)) else {
            return Ok(());
        };
        match Self::find_item(store, &opts.part) {
            Some((id, _)) => {
                if let Some(item) = store.state_mut().pli_items.get_mut(id) {
                    item.quantity += 1;
                }
            }
            None => {
                PliItemMutations::add(
                    store,
                    &AddPliItem {
                        parent: first,
                        filename: opts.part.filename.clone(),
                        color_code: opts.part.color_code,
                        quantity: Some(1),
                    },
                )?;
            }
        }
        mark_page_for_layout(store, first);
        Ok(())
    }

    /// Count one fewer of `part`, dropping its item at zero.
    pub fn remove_part(store: &mut Store, opts: &InventoryPart) -> Result<(), FolioError> {
        let Some(first) = store.get().inventory_pages().first().map(|p| LookupKey::from(*p)) else {
            return Ok(());
        };
        match Self::find_item(store, &opts.part) {
            Some((id, quantity)) if quantity <= 1 => {
                PliItemMutations::delete(store, &DeletePliItem { pli_item: id })?;
            }
            Some((id, _)) => {
                if let Some(item) = store.state_mut().pli_items.get_mut(id) {
                    item.quantity -= 1;
                }
            }
            None => return Ok(()),
        }
        mark_page_for_layout(store, first);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ModelCatalog, ModelDef};
    use std::sync::Arc;

    fn store() -> Store {
        let catalog = ModelCatalog::new("main.ldr")
            .with_model(
                "main.ldr",
                ModelDef {
                    parts: vec![
                        PartRef::new("3001.dat", 4),
                        PartRef::new("wheel.ldr", 0),
                        PartRef::new("wheel.ldr", 0),
                        PartRef::new("3001.dat", 4),
                    ],
                    steps: None,
                },
            )
            .with_model(
                "wheel.ldr",
                ModelDef {
                    parts: vec![PartRef::new("tyre.dat", 0)],
                    steps: None,
                },
            );
        Store::new().with_catalog(Arc::new(catalog))
    }

    #[test]
    fn add_counts_parts_through_submodels() {
        let mut store = store();
        PageMutations::add(&mut store, &AddPage { page_number: Some(PageNumber::Id), ..AddPage::default() })
            .expect("page");
        let pages = InventoryPageMutations::add(&mut store, &AddInventoryPages::default()).expect("inventory");
        assert_eq!(pages.len(), 1);
        let get = store.get();
        let page = get.page(pages[0].id).expect("page");
        assert_eq!(page.subtype, PageSubtype::InventoryPage);
        assert_eq!(page.number, 1);
        let items: Vec<(String, u32)> = page
            .pli_items
            .iter()
            .filter_map(|id| get.pli_item(*id))
            .map(|i| (i.filename.clone(), i.quantity))
            .collect();
        assert_eq!(items, vec![("tyre.dat".to_string(), 2), ("3001.dat".to_string(), 2)]);
    }

    #[test]
    fn chunks_into_several_pages() {
        let mut store = store();
        let pages = InventoryPageMutations::add(&mut store, &AddInventoryPages { items_per_page: Some(1) })
            .expect("inventory");
        assert_eq!(pages.len(), 2);
        InventoryPageMutations::delete_all(&mut store).expect("delete all");
        assert!(store.state().pages.is_empty());
        assert!(store.state().pli_items.is_empty());
        assert!(store.state().number_labels.is_empty());
    }

    #[test]
    fn part_counts_follow_edits() {
        let mut store = store();
        InventoryPageMutations::add(&mut store, &AddInventoryPages::default()).expect("inventory");
        let brick = PartRef::new("3001.dat", 4);
        let plate = PartRef::new("3020.dat", 1);
        InventoryPageMutations::add_part(&mut store, &InventoryPart { part: plate.clone() }).expect("add");
        InventoryPageMutations::add_part(&mut store, &InventoryPart { part: brick.clone() }).expect("add");
        let quantity = |store: &Store, part: &PartRef| InventoryPageMutations::find_item(store, part).map(|(_, q)| q);
        assert_eq!(quantity(&store, &brick), Some(3));
        assert_eq!(quantity(&store, &plate), Some(1));

        InventoryPageMutations::remove_part(&mut store, &InventoryPart { part: plate.clone() }).expect("remove");
        assert_eq!(quantity(&store, &plate), None);
        InventoryPageMutations::remove_part(&mut store, &InventoryPart { part: brick.clone() }).expect("remove");
        assert_eq!(quantity(&store, &brick), Some(2));
    }
}
