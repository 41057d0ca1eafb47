//! Submodel images: the "build this first" preview shown on a step.

use super::csi::{CsiMutations, DeleteCsi};
use super::item::ItemMutations;
use super::mark_page_for_layout;
use crate::items::{QuantityLabel, SubmodelImage};
use crate::store::Store;
use crate::types::{Align, FolioError, ItemId, ItemType, LookupKey, VAlign};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSubmodelImage {
    /// Owning step.
    pub parent: ItemId,
    pub model_filename: String,
    #[serde(default)]
    pub quantity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmodelImageRef {
    pub submodel_image: ItemId,
}

pub struct SubmodelImageMutations;

impl SubmodelImageMutations {
    /// Add the image with its csi. Only a quantity above one gets a label.
    pub fn add(store: &mut Store, opts: &AddSubmodelImage) -> Result<LookupKey, FolioError> {
        let quantity = opts.quantity.unwrap_or(1);
        let image = SubmodelImage {
            model_filename: opts.model_filename.clone(),
            quantity,
            x: Some(0.0),
            y: Some(0.0),
            width: Some(0.0),
            height: Some(0.0),
            ..SubmodelImage::default()
        };
        let step = LookupKey::new(ItemType::Step, opts.parent);
        let key = ItemMutations::add(store, image, Some(step), None, None)?;
        CsiMutations::add(store, key)?;
        if quantity > 1 {
            let label = QuantityLabel {
                align: Align::Right,
                valign: VAlign::Bottom,
                ..QuantityLabel::default()
            };
            ItemMutations::add(store, label, Some(key), None, None)?;
        }
        Ok(key)
    }

    pub fn delete(store: &mut Store, opts: &SubmodelImageRef) -> Result<(), FolioError> {
        let key = LookupKey::new(ItemType::SubmodelImage, opts.submodel_image);
        let Some(image) = store.state().submodel_images.get(opts.submodel_image) else {
            debug!(submodel_image = %key, "delete of missing submodel image ignored");
            return Ok(());
        };
        let (csi, label) = (image.csi_id, image.quantity_label_id);
        mark_page_for_layout(store, key);
        if let Some(csi) = csi {
            CsiMutations::delete(store, &DeleteCsi { csi })?;
        }
        if let Some(label) = label {
            store
                .state_mut()
                .remove_item(LookupKey::new(ItemType::QuantityLabel, label))?;
        }
        store.state_mut().remove_item(key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{Page, Step};

    fn step(store: &mut Store) -> LookupKey {
        let page = ItemMutations::add(store, Page::default(), None, None, None).expect("page");
        ItemMutations::add(store, Step::default(), Some(page), None, None).expect("step")
    }

    #[test]
    fn single_copy_has_no_label() {
        let mut store = Store::new();
        let step = step(&mut store);
        let image = SubmodelImageMutations::add(
            &mut store,
            &AddSubmodelImage { parent: step.id, model_filename: "wheel.ldr".into(), quantity: None },
        )
        .expect("image");
        let image = store.get().submodel_image(image.id).expect("image");
        assert!(image.csi_id.is_some());
        assert!(image.quantity_label_id.is_none());
    }

    #[test]
    fn delete_removes_csi_and_label() {
        let mut store = Store::new();
        let step = step(&mut store);
        let image = SubmodelImageMutations::add(
            &mut store,
            &AddSubmodelImage { parent: step.id, model_filename: "wheel.ldr".into(), quantity: Some(4) },
        )
        .expect("image");
        assert_eq!(store.state().quantity_labels.len(), 1);
        SubmodelImageMutations::delete(&mut store, &SubmodelImageRef { submodel_image: image.id }).expect("delete");
        let state = store.state();
        assert!(state.submodel_images.is_empty());
        assert!(state.csis.is_empty());
        assert!(state.quantity_labels.is_empty());
        assert!(state.steps.first().is_some_and(|s| s.submodel_images.is_empty()));
    }
}
