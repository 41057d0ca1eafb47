//! Part list items and their quantity labels.

use super::item::ItemMutations;
use super::mark_page_for_layout;
use crate::items::{PliItem, QuantityLabel};
use crate::store::Store;
use crate::types::{Align, ColorCode, FolioError, ItemId, ItemType, LookupKey, VAlign};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPliItem {
    /// A pli, or an inventory page.
    pub parent: LookupKey,
    pub filename: String,
    pub color_code: ColorCode,
    #[serde(default)]
    pub quantity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePliItem {
    pub pli_item: ItemId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeQuantity {
    pub pli_item: ItemId,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MarkPliItemsDirty {
    /// Only items showing this file; every item when unset.
    pub filename: Option<String>,
}

pub struct PliItemMutations;

impl PliItemMutations {
    /// Add an item with its quantity label.
    pub fn add(store: &mut Store, opts: &AddPliItem) -> Result<LookupKey, FolioError> {
        let item = PliItem {
            filename: opts.filename.clone(),
            color_code: opts.color_code,
            quantity: opts.quantity.unwrap_or(1),
            ..PliItem::default()
        };
        let key = ItemMutations::add(store, item, Some(opts.parent), None, None)?;
        let label = QuantityLabel {
            align: Align::Left,
            valign: VAlign::Top,
            ..QuantityLabel::default()
        };
        ItemMutations::add(store, label, Some(key), None, None)?;
        Ok(key)
    }

    pub fn delete(store: &mut Store, opts: &DeletePliItem) -> Result<(), FolioError> {
        let key = LookupKey::new(ItemType::PliItem, opts.pli_item);
        let Some(item) = store.state().pli_items.get(opts.pli_item) else {
            return Ok(());
        };
        if let Some(label) = item.quantity_label_id {
            store
                .state_mut()
                .remove_item(LookupKey::new(ItemType::QuantityLabel, label))?;
        }
        store.state_mut().remove_item(key)?;
        Ok(())
    }

    /// Set the count. The label text changes, so its measured size is reset.
    pub fn change_quantity(store: &mut Store, opts: &ChangeQuantity) {
        let state = store.state_mut();
        let Some(item) = state.pli_items.get_mut(opts.pli_item) else {
            return;
        };
        item.quantity = opts.quantity;
        item.is_dirty = true;
        let label = item.quantity_label_id;
        if let Some(label) = label.and_then(|id| state.quantity_labels.get_mut(id)) {
            label.width = None;
            label.height = None;
        }
        mark_page_for_layout(store, LookupKey::new(ItemType::PliItem, opts.pli_item));
    }

    pub fn mark_all_dirty(store: &mut Store, opts: &MarkPliItemsDirty) {
        for item in store.state_mut().pli_items.iter_mut() {
            if opts.filename.as_ref().is_none_or(|f| *f == item.filename) {
                item.is_dirty = true;
            }
        }
    }
}
