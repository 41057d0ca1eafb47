//! Construction step images.

use super::item::{DeleteChildList, ItemMutations};
use super::mark_page_for_layout;
use super::step::{StepMutations, ToggleRotateIcon};
use crate::items::Csi;
use crate::store::Store;
use crate::types::{FolioError, ItemId, ItemType, LookupKey, Rotation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddCsi {
    /// A step or submodel image.
    pub parent: LookupKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsiRef {
    pub csi: ItemId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteCsi {
    pub csi: ItemId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateCsi {
    pub csi: ItemId,
    pub rotation: Option<Vec<Rotation>>,
    #[serde(default)]
    pub add_rotate_icon: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleCsi {
    pub csi: ItemId,
    pub scale: Option<f64>,
}

pub struct CsiMutations;

impl CsiMutations {
    /// Add an unplaced csi to a step or submodel image.
    pub fn add(store: &mut Store, parent: LookupKey) -> Result<LookupKey, FolioError> {
        ItemMutations::add(store, Csi::default(), Some(parent), None, None)
    }

    pub fn delete(store: &mut Store, opts: &DeleteCsi) -> Result<(), FolioError> {
        let key = LookupKey::new(ItemType::Csi, opts.csi);
        ItemMutations::delete_child_list(
            store,
            &DeleteChildList {
                item: key,
                list_type: ItemType::Annotation,
            },
        )?;
        store.state_mut().remove_item(key)?;
        Ok(())
    }

    /// Set the view rotation, and show or hide the owning step's rotate icon.
    pub fn rotate(store: &mut Store, opts: &RotateCsi) -> Result<(), FolioError> {
        let Some(csi) = store.state_mut().csis.get_mut(opts.csi) else {
            return Ok(());
        };
        csi.rotation.clone_from(&opts.rotation);
        csi.is_dirty = true;
        let parent = csi.parent;
        if let Some(step) = parent.filter(|p| p.item_type == ItemType::Step) {
            StepMutations::toggle_rotate_icon(
                store,
                &ToggleRotateIcon {
                    step: step.id,
                    display: opts.add_rotate_icon,
                },
            )?;
        }
        mark_page_for_layout(store, LookupKey::new(ItemType::Csi, opts.csi));
        Ok(())
    }

    pub fn scale(store: &mut Store, opts: &ScaleCsi) {
        if let Some(csi) = store.state_mut().csis.get_mut(opts.csi) {
            csi.scale = opts.scale;
            csi.is_dirty = true;
        }
        mark_page_for_layout(store, LookupKey::new(ItemType::Csi, opts.csi));
    }

    /// Forget the rendered size so the next render recomputes it.
    pub fn reset_size(store: &mut Store, csi: ItemId) {
        if let Some(csi) = store.state_mut().csis.get_mut(csi) {
            csi.width = None;
            csi.height = None;
            csi.is_dirty = true;
        }
    }

    pub fn mark_all_dirty(store: &mut Store) {
        for csi in store.state_mut().csis.iter_mut() {
            csi.is_dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{Page, Step};
    use crate::types::Axis;

    #[test]
    fn rotate_shows_icon_and_marks_dirty() {
        let mut store = Store::new();
        let page = ItemMutations::add(&mut store, Page::default(), None, None, None).expect("page");
        let step = ItemMutations::add(&mut store, Step::default(), Some(page), None, None).expect("step");
        let csi = CsiMutations::add(&mut store, step).expect("csi");

        CsiMutations::rotate(
            &mut store,
            &RotateCsi {
                csi: csi.id,
                rotation: Some(vec![Rotation::new(Axis::X, 90.0)]),
                add_rotate_icon: true,
            },
        )
        .expect("rotate");
        let get = store.get();
        assert!(get.csi(csi.id).is_some_and(|c| c.is_dirty));
        assert!(get.step(step.id).is_some_and(|s| s.rotate_icon_id.is_some()));
        assert!(get.page(page.id).is_some_and(|p| p.needs_layout));
    }

    #[test]
    fn reset_size_clears_dimensions() {
        let mut store = Store::new();
        let page = ItemMutations::add(&mut store, Page::default(), None, None, None).expect("page");
        let step = ItemMutations::add(&mut store, Step::default(), Some(page), None, None).expect("step");
        let csi = CsiMutations::add(&mut store, step).expect("csi");
        if let Some(c) = store.state_mut().csis.get_mut(csi.id) {
            c.width = Some(120.0);
            c.height = Some(80.0);
        }
        CsiMutations::reset_size(&mut store, csi.id);
        let c = store.get().csi(csi.id).expect("csi");
        assert_eq!((c.width, c.height), (None, None));
    }
}
