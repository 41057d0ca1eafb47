//! Generic structural operations every per-type module builds on.

use super::delete_cascading;
use crate::items::{
    Annotation, Book, Callout, CalloutArrow, Csi, Divider, NumberLabel, Page, Pli, PliItem,
    PointItem, QuantityLabel, Registered, RotateIcon, Step, SubmodelImage,
};
use crate::store::Store;
use crate::types::{FolioError, ItemType, LookupKey, Point};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Add a blank item of any type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItem {
    pub item_type: ItemType,
    #[serde(default)]
    pub parent: Option<LookupKey>,
    #[serde(default)]
    pub insertion_index: Option<usize>,
    #[serde(default)]
    pub parent_insertion_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteItem {
    pub item: LookupKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteChildList {
    pub item: LookupKey,
    pub list_type: ItemType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reparent {
    pub item: LookupKey,
    pub new_parent: LookupKey,
    #[serde(default)]
    pub parent_insertion_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reposition {
    pub items: Vec<LookupKey>,
    pub dx: f64,
    pub dy: f64,
}

/// Add, delete, reparent and reposition for any item type.
pub struct ItemMutations;

impl ItemMutations {
    /// Register `item` under a fresh id and link it into `parent`.
    pub fn add<T: Registered>(
        store: &mut Store,
        item: T,
        parent: Option<LookupKey>,
        insertion_index: Option<usize>,
        parent_insertion_index: Option<usize>,
    ) -> Result<LookupKey, FolioError> {
        store
            .state_mut()
            .add_item(item, parent, insertion_index, parent_insertion_index)
    }

    /// Register a default-valued item of `opts.item_type`.
    pub fn add_blank(store: &mut Store, opts: &AddItem) -> Result<LookupKey, FolioError> {
        let (parent, idx, pidx) = (opts.parent, opts.insertion_index, opts.parent_insertion_index);
        match opts.item_type {
            ItemType::Annotation => Self::add(store, Annotation::default(), parent, idx, pidx),
            ItemType::Book => Self::add(store, Book::default(), parent, idx, pidx),
            ItemType::Callout => Self::add(store, Callout::default(), parent, idx, pidx),
            ItemType::CalloutArrow => Self::add(store, CalloutArrow::default(), parent, idx, pidx),
            ItemType::Csi => Self::add(store, Csi::default(), parent, idx, pidx),
            ItemType::Divider => Self::add(store, Divider::default(), parent, idx, pidx),
            ItemType::NumberLabel => Self::add(store, NumberLabel::default(), parent, idx, pidx),
            ItemType::Page => Self::add(store, Page::default(), parent, idx, pidx),
            ItemType::Pli => Self::add(store, Pli::default(), parent, idx, pidx),
            ItemType::PliItem => Self::add(store, PliItem::default(), parent, idx, pidx),
            ItemType::Point => Self::add(store, PointItem::default(), parent, idx, pidx),
            ItemType::QuantityLabel => Self::add(store, QuantityLabel::default(), parent, idx, pidx),
            ItemType::RotateIcon => Self::add(store, RotateIcon::default(), parent, idx, pidx),
            ItemType::Step => Self::add(store, Step::default(), parent, idx, pidx),
            ItemType::SubmodelImage => Self::add(store, SubmodelImage::default(), parent, idx, pidx),
        }
    }

    /// Structural delete. Missing items are ignored; items that still own
    /// children are rejected.
    pub fn delete(store: &mut Store, opts: &DeleteItem) -> Result<bool, FolioError> {
        store.state_mut().remove_item(opts.item)
    }

    /// Delete every child of one type through that type's own delete, so
    /// each child's cascade runs.
    pub fn delete_child_list(store: &mut Store, opts: &DeleteChildList) -> Result<(), FolioError> {
        let limit = store.state().total_count();
        for _ in 0..=limit {
            let Some(first) = store
                .state()
                .child_ids(opts.item, opts.list_type)
                .first()
                .copied()
            else {
                return Ok(());
            };
            let child = LookupKey::new(opts.list_type, first);
            if store.state().contains(child) {
                delete_cascading(store, child)?;
            } else {
                debug!(parent = %opts.item, child = %child, "dropping dangling child link");
            }
            // A delete that leaves the link in place would loop forever.
            store.state_mut().unlink(opts.item, child);
        }
        Ok(())
    }

    pub fn reparent(store: &mut Store, opts: &Reparent) -> Result<bool, FolioError> {
        store
            .state_mut()
            .reparent_item(opts.item, opts.new_parent, opts.parent_insertion_index)
    }

    /// Shift each item by `(dx, dy)`, then let the parent's layout hook
    /// refit its box. Missing items are skipped.
    pub fn reposition(store: &mut Store, opts: &Reposition) -> Result<(), FolioError> {
        let delta = Point::new(opts.dx, opts.dy);
        for key in &opts.items {
            if !store.state_mut().translate_item(*key, delta) {
                continue;
            }
            let parent = store.state().entity(*key).and_then(|e| e.parent());
            if let Some(parent) = parent {
                store.adjust_bounding_box(parent);
            }
        }
        Ok(())
    }
}
