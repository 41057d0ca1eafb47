//! Whole-submodel restructuring.

use super::callout::{AddCallout, CalloutMutations};
use super::item::ItemMutations;
use super::mark_page_for_layout;
use super::page::{DeletePage, PageMutations};
use super::pli::{DeletePli, PliMutations};
use super::pli_item::{ChangeQuantity, DeletePliItem, PliItemMutations};
use super::step::StepMutations;
use super::submodel_image::{SubmodelImageMutations, SubmodelImageRef};
use crate::store::Store;
use crate::types::{FolioError, ItemId, ItemType, LookupKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertToCallout {
    pub model_filename: String,
    pub dest_step: ItemId,
}

pub struct SubmodelMutations;

impl SubmodelMutations {
    /// Move every step of a submodel into a new callout on `dest_step`.
    ///
    /// The submodel's part lists merge into the destination step's list,
    /// which stops showing the submodel itself. Pages left without steps are
    /// deleted. Returns the new callout.
    pub fn convert_to_callout(
        store: &mut Store,
        opts: &ConvertToCallout,
    ) -> Result<Option<LookupKey>, FolioError> {
        let dest = LookupKey::new(ItemType::Step, opts.dest_step);
        let Some(dest_pli) = store.state().steps.get(opts.dest_step).map(|s| s.pli_id) else {
            debug!(step = %dest, "convert into missing step ignored");
            return Ok(None);
        };
        let Some(quantity) = store
            .get()
            .submodels()
            .into_iter()
            .find(|s| s.filename == opts.model_filename)
            .map(|s| u32::try_from(s.quantity).unwrap_or(u32::MAX))
        else {
            debug!(model = %opts.model_filename, "convert of unknown submodel ignored");
            return Ok(None);
        };
        let steps: Vec<ItemId> = store
            .state()
            .steps
            .iter()
            .filter(|s| s.model.filename == opts.model_filename && s.id != opts.dest_step)
            .map(|s| s.id)
            .collect();

        let callout = CalloutMutations::add(store, &AddCallout::new(dest))?;

        if let Some(pli) = dest_pli {
            let shown = store
                .state()
                .child_ids(LookupKey::new(ItemType::Pli, pli), ItemType::PliItem)
                .into_iter()
                .find(|id| {
                    store
                        .state()
                        .pli_items
                        .get(*id)
                        .is_some_and(|i| i.filename == opts.model_filename)
                });
            if let Some(pli_item) = shown {
                PliItemMutations::delete(store, &DeletePliItem { pli_item })?;
            }
        }

        let mut emptied_pages = BTreeSet::new();
        for (idx, step_id) in steps.iter().enumerate() {
            let step_key = LookupKey::new(ItemType::Step, *step_id);
            let Some((old_pli, images, parent)) = store
                .state()
                .steps
                .get(*step_id)
                .map(|s| (s.pli_id, s.submodel_images.clone(), s.parent))
            else {
                continue;
            };
            if let Some(old_pli) = old_pli {
                let old_key = LookupKey::new(ItemType::Pli, old_pli);
                if let Some(dest_pli) = dest_pli {
                    let dest_key = LookupKey::new(ItemType::Pli, dest_pli);
                    for item in store.state().child_ids(old_key, ItemType::PliItem) {
                        store
                            .state_mut()
                            .reparent_item(LookupKey::new(ItemType::PliItem, item), dest_key, None)?;
                        if quantity > 1 {
                            PliItemMutations::change_quantity(store, &ChangeQuantity { pli_item: item, quantity });
                        }
                    }
                }
                PliMutations::delete(store, &DeletePli { pli: old_pli, delete_items: true })?;
            }
            for submodel_image in images {
                SubmodelImageMutations::delete(store, &SubmodelImageRef { submodel_image })?;
            }
            if let Some(page) = parent.filter(|p| p.item_type == ItemType::Page) {
                emptied_pages.insert(page.id);
            }
            ItemMutations::reparent(
                store,
                &super::item::Reparent {
                    item: step_key,
                    new_parent: callout,
                    parent_insertion_index: None,
                },
            )?;
            if let Some(step) = store.state_mut().steps.get_mut(*step_id) {
                step.number = i64::try_from(idx).map_or(i64::MAX, |n| n + 1);
            }
        }

        for page in emptied_pages {
            if store.state().pages.get(page).is_some_and(|p| p.steps.is_empty()) {
                PageMutations::delete(
                    store,
                    &DeletePage {
                        page,
                        delete_steps: false,
                        do_not_renumber: false,
                    },
                )?;
            }
        }
        StepMutations::renumber_all(store);
        mark_page_for_layout(store, dest);
        Ok(Some(callout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ModelCatalog, ModelDef};
    use crate::items::StepModel;
    use crate::mutations::page::{AddPage, PageNumber};
    use crate::mutations::step::{AddStep, StepPart};
    use crate::types::PartRef;
    use std::sync::Arc;

    fn model_step(store: &mut Store, model: &str, parts: &[u32]) -> LookupKey {
        let page = PageMutations::add(store, &AddPage { page_number: Some(PageNumber::Id), ..AddPage::default() })
            .expect("page");
        let step = StepMutations::add(
            store,
            &AddStep {
                model: Some(StepModel { filename: model.into(), parent_step_id: None }),
                step_number: Some(0),
                ..AddStep::new(page)
            },
        )
        .expect("step");
        for part_id in parts {
            StepMutations::add_part(store, &StepPart { step: step.id, part_id: *part_id }).expect("part");
        }
        step
    }

    #[test]
    fn submodel_steps_move_into_callout() {
        let catalog = ModelCatalog::new("main.ldr")
            .with_model(
                "main.ldr",
                ModelDef {
                    parts: vec![PartRef::new("wheel.ldr", 0), PartRef::new("wheel.ldr", 0)],
                    steps: None,
                },
            )
            .with_model(
                "wheel.ldr",
                ModelDef {
                    parts: vec![PartRef::new("tyre.dat", 0), PartRef::new("rim.dat", 15)],
                    steps: None,
                },
            );
        let mut store = Store::new().with_catalog(Arc::new(catalog));
        let w1 = model_step(&mut store, "wheel.ldr", &[0]);
        let w2 = model_step(&mut store, "wheel.ldr", &[1]);
        let main = model_step(&mut store, "main.ldr", &[0, 1]);

        let callout = SubmodelMutations::convert_to_callout(
            &mut store,
            &ConvertToCallout { model_filename: "wheel.ldr".into(), dest_step: main.id },
        )
        .expect("convert")
        .expect("callout");

        let get = store.get();
        assert_eq!(get.callout(callout.id).map(|c| c.steps.clone()), Some(vec![w1.id, w2.id]));
        assert_eq!(get.step(w1.id).map(|s| s.number), Some(1));
        assert_eq!(get.step(w2.id).map(|s| s.number), Some(2));
        assert!(get.step(w1.id).is_some_and(|s| s.pli_id.is_none()));
        assert_eq!(get.basic_pages().len(), 1);
        assert_eq!(get.step(main.id).map(|s| s.number), Some(0));

        let pli = get.step(main.id).and_then(|s| s.pli_id).expect("pli");
        let items: Vec<(String, u32)> = get
            .pli(pli)
            .expect("pli")
            .pli_items
            .iter()
            .filter_map(|id| get.pli_item(*id))
            .map(|i| (i.filename.clone(), i.quantity))
            .collect();
        assert_eq!(items, vec![("tyre.dat".to_string(), 2), ("rim.dat".to_string(), 2)]);
    }

    #[test]
    fn unknown_submodel_is_ignored() {
        let mut store = Store::new();
        let step = model_step(&mut store, "main.ldr", &[]);
        let before = store.state().clone();
        let result = SubmodelMutations::convert_to_callout(
            &mut store,
            &ConvertToCallout { model_filename: "wheel.ldr".into(), dest_step: step.id },
        )
        .expect("convert");
        assert!(result.is_none());
        assert_eq!(store.state(), &before);
    }
}
