//! Part lists: one per top-level step, holding a counted item per part.

use super::item::{DeleteChildList, ItemMutations};
use super::pli_item::{AddPliItem, DeletePliItem, PliItemMutations};
use super::{mark_page_for_layout, page::PageMutations};
use crate::items::Pli;
use crate::store::Store;
use crate::types::{FolioError, ItemId, ItemType, LookupKey, PartRef};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddPli {
    pub step: ItemId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePli {
    pub pli: ItemId,
    #[serde(default)]
    pub delete_items: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PliRef {
    pub pli: ItemId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PliPart {
    pub pli: ItemId,
    pub part: PartRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetPliVisibility {
    pub visible: bool,
}

fn pli_key(id: ItemId) -> LookupKey {
    LookupKey::new(ItemType::Pli, id)
}

pub struct PliMutations;

impl PliMutations {
    pub fn add(store: &mut Store, opts: &AddPli) -> Result<LookupKey, FolioError> {
        let step = LookupKey::new(ItemType::Step, opts.step);
        ItemMutations::add(store, Pli::default(), Some(step), None, None)
    }

    /// # Errors
    ///
    /// `HasChildren` when items remain and `delete_items` is unset.
    pub fn delete(store: &mut Store, opts: &DeletePli) -> Result<(), FolioError> {
        let key = pli_key(opts.pli);
        let Some(pli) = store.state().plis.get(opts.pli) else {
            debug!(pli = %key, "delete of missing pli ignored");
            return Ok(());
        };
        if !pli.pli_items.is_empty() && !opts.delete_items {
            return Err(FolioError::HasChildren {
                item: key,
                child_type: ItemType::PliItem,
            });
        }
        Self::empty(store, &PliRef { pli: opts.pli })?;
        store.state_mut().remove_item(key)?;
        Ok(())
    }

    pub fn empty(store: &mut Store, opts: &PliRef) -> Result<(), FolioError> {
        ItemMutations::delete_child_list(
            store,
            &DeleteChildList {
                item: pli_key(opts.pli),
                list_type: ItemType::PliItem,
            },
        )
    }

    /// Count one more of `part`, adding an item for it when none matches.
    pub fn add_part(store: &mut Store, opts: &PliPart) -> Result<(), FolioError> {
        let key = pli_key(opts.pli);
        if !store.state().contains(key) {
            return Ok(());
        }
        let existing = store.get().matching_pli_item(key, &opts.part).map(|i| i.id);
        match existing.and_then(|id| store.state_mut().pli_items.get_mut(id)) {
            Some(item) => item.quantity += 1,
            None => {
                PliItemMutations::add(
                    store,
                    &AddPliItem {
                        parent: key,
                        filename: opts.part.filename.clone(),
                        color_code: opts.part.color_code,
                        quantity: None,
                    },
                )?;
            }
        }
        Ok(())
    }

    /// Count one fewer of `part`, dropping its item at zero.
    pub fn remove_part(store: &mut Store, opts: &PliPart) -> Result<(), FolioError> {
        let key = pli_key(opts.pli);
        let Some((id, quantity)) = store
            .get()
            .matching_pli_item(key, &opts.part)
            .map(|i| (i.id, i.quantity))
        else {
            return Ok(());
        };
        if quantity <= 1 {
            PliItemMutations::delete(store, &DeletePliItem { pli_item: id })?;
        } else if let Some(item) = store.state_mut().pli_items.get_mut(id) {
            item.quantity -= 1;
        }
        Ok(())
    }

    pub fn toggle_visibility(store: &mut Store, opts: &SetPliVisibility) {
        store.state_mut().plis_visible = opts.visible;
        PageMutations::mark_all_dirty(store);
    }

    /// Rebuild the list from the parts of the owning step.
    pub fn sync_content(store: &mut Store, opts: &PliRef) -> Result<(), FolioError> {
        let key = pli_key(opts.pli);
        let Some(step) = store
            .state()
            .plis
            .get(opts.pli)
            .and_then(|p| p.parent)
            .filter(|p| p.item_type == ItemType::Step)
        else {
            return Ok(());
        };
        let parts = store.get().parts_in_step(step.id);
        Self::empty(store, opts)?;
        for part in parts {
            Self::add_part(store, &PliPart { pli: opts.pli, part })?;
        }
        mark_page_for_layout(store, key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{Page, Step};

    fn store_with_pli() -> (Store, LookupKey) {
        let mut store = Store::new();
        let page = ItemMutations::add(&mut store, Page::default(), None, None, None).expect("page");
        let step = ItemMutations::add(&mut store, Step::default(), Some(page), None, None).expect("step");
        let pli = PliMutations::add(&mut store, &AddPli { step: step.id }).expect("pli");
        (store, pli)
    }

    #[test]
    fn quantities_count_up_and_down() {
        let (mut store, pli) = store_with_pli();
        let brick = PartRef::new("3001.dat", 4);
        for _ in 0..3 {
            PliMutations::add_part(&mut store, &PliPart { pli: pli.id, part: brick.clone() }).expect("add");
        }
        assert_eq!(store.state().pli_items.len(), 1);
        assert_eq!(store.state().pli_items.first().map(|i| i.quantity), Some(3));

        for _ in 0..2 {
            PliMutations::remove_part(&mut store, &PliPart { pli: pli.id, part: brick.clone() }).expect("remove");
        }
        assert_eq!(store.state().pli_items.first().map(|i| i.quantity), Some(1));
        PliMutations::remove_part(&mut store, &PliPart { pli: pli.id, part: brick }).expect("remove");
        assert!(store.state().pli_items.is_empty());
        assert!(store.state().quantity_labels.is_empty());
    }

    #[test]
    fn same_file_in_another_color_is_a_new_item() {
        let (mut store, pli) = store_with_pli();
        PliMutations::add_part(&mut store, &PliPart { pli: pli.id, part: PartRef::new("3001.dat", 4) })
            .expect("add");
        PliMutations::add_part(&mut store, &PliPart { pli: pli.id, part: PartRef::new("3001.dat", 1) })
            .expect("add");
        assert_eq!(store.state().pli_items.len(), 2);
    }

    #[test]
    fn delete_guards_items() {
        let (mut store, pli) = store_with_pli();
        PliMutations::add_part(&mut store, &PliPart { pli: pli.id, part: PartRef::new("3001.dat", 4) })
            .expect("add");
        let before = store.state().clone();
        let err = PliMutations::delete(&mut store, &DeletePli { pli: pli.id, delete_items: false })
            .expect_err("pli has items");
        assert!(matches!(err, FolioError::HasChildren { .. }));
        assert_eq!(store.state(), &before);
        PliMutations::delete(&mut store, &DeletePli { pli: pli.id, delete_items: true }).expect("delete");
        assert!(store.state().plis.is_empty());
        assert!(store.state().pli_items.is_empty());
    }

    #[test]
    fn visibility_marks_pages() {
        let (mut store, _) = store_with_pli();
        PliMutations::toggle_visibility(&mut store, &SetPliVisibility { visible: false });
        assert!(!store.state().plis_visible);
        assert!(store.state().pages.iter().all(|p| p.needs_layout));
    }
}
