//! Rotate icons: the "turn the model over" marker on a step.

use super::item::ItemMutations;
use super::mark_page_for_layout;
use crate::items::RotateIcon;
use crate::store::Store;
use crate::types::{FolioError, ItemId, ItemType, LookupKey};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddRotateIcon {
    pub step: ItemId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRotateIcon {
    pub rotate_icon: ItemId,
}

pub struct RotateIconMutations;

impl RotateIconMutations {
    pub fn add(store: &mut Store, opts: &AddRotateIcon) -> Result<LookupKey, FolioError> {
        let step = LookupKey::new(ItemType::Step, opts.step);
        let key = ItemMutations::add(store, RotateIcon::default(), Some(step), None, None)?;
        mark_page_for_layout(store, step);
        Ok(key)
    }

    pub fn delete(store: &mut Store, opts: &DeleteRotateIcon) -> Result<(), FolioError> {
        let key = LookupKey::new(ItemType::RotateIcon, opts.rotate_icon);
        mark_page_for_layout(store, key);
        store.state_mut().remove_item(key)?;
        Ok(())
    }
}
