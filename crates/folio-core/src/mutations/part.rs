//! Individual parts inside steps: displacement, moves and deletion.
//!
//! Parts are not registry items. A step lists the catalog ids of the parts
//! it adds, and these mutations keep that list, the step's part list and
//! the inventory in agreement.

use super::csi::CsiMutations;
use super::inventory_page::{InventoryPageMutations, InventoryPart};
use super::mark_page_for_layout;
use super::step::{AddStep, StepMutations, StepPart};
use crate::items::DisplacedPart;
use crate::store::Store;
use crate::types::{Direction, FolioError, ItemId, ItemType, LookupKey, PartId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default push distance and arrow length for a displaced part.
pub const DISPLACEMENT_DISTANCE: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplacePart {
    #[serde(rename = "partID")]
    pub part_id: PartId,
    pub step: ItemId,
    /// `None` removes the displacement.
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub part_distance: Option<f64>,
    #[serde(default)]
    pub arrow_offset: Option<f64>,
    #[serde(default)]
    pub arrow_length: Option<f64>,
    #[serde(default)]
    pub arrow_rotation: Option<f64>,
}

impl DisplacePart {
    #[must_use]
    pub fn new(part_id: PartId, step: ItemId, direction: Option<Direction>) -> Self {
        Self {
            part_id,
            step,
            direction,
            part_distance: None,
            arrow_offset: None,
            arrow_length: None,
            arrow_rotation: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveToStep {
    #[serde(rename = "partID")]
    pub part_id: PartId,
    pub src_step: ItemId,
    pub dest_step: ItemId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddToCallout {
    #[serde(rename = "partID")]
    pub part_id: PartId,
    pub step: ItemId,
    pub callout: ItemId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartInStep {
    #[serde(rename = "partID")]
    pub part_id: PartId,
    pub step: ItemId,
}

fn step_key(id: ItemId) -> LookupKey {
    LookupKey::new(ItemType::Step, id)
}

pub struct PartMutations;

impl PartMutations {
    /// Push a part away from its position, or pull it back when no
    /// direction is given.
    pub fn displace(store: &mut Store, opts: &DisplacePart) {
        let Some(csi) = store.state().steps.get(opts.step).and_then(|s| s.csi_id) else {
            debug!(step = %step_key(opts.step), "displace in step without csi ignored");
            return;
        };
        CsiMutations::reset_size(store, csi);
        let Some(step) = store.state_mut().steps.get_mut(opts.step) else {
            return;
        };
        let existing = step.displaced_parts.iter().position(|p| p.part_id == opts.part_id);
        match (opts.direction, existing) {
            (Some(direction), _) => {
                let entry = DisplacedPart {
                    part_id: opts.part_id,
                    direction,
                    part_distance: opts.part_distance.unwrap_or(DISPLACEMENT_DISTANCE),
                    arrow_offset: opts.arrow_offset.unwrap_or(0.0),
                    arrow_length: opts.arrow_length.unwrap_or(DISPLACEMENT_DISTANCE),
                    arrow_rotation: opts.arrow_rotation.unwrap_or(0.0),
                };
                match existing {
                    Some(idx) => step.displaced_parts[idx] = entry,
                    None => step.displaced_parts.push(entry),
                }
            }
            (None, Some(idx)) => {
                step.displaced_parts.remove(idx);
            }
            (None, None) => {}
        }
        mark_page_for_layout(store, step_key(opts.step));
    }

    /// Move one part from `src_step` to `dest_step`, updating both part lists.
    pub fn move_to_step(store: &mut Store, opts: &MoveToStep) -> Result<(), FolioError> {
        let csi_of = |store: &Store, id: ItemId| store.state().steps.get(id).and_then(|s| s.csi_id);
        let Some(src_csi) = csi_of(store, opts.src_step) else {
            return Ok(());
        };
        StepMutations::remove_part(
            store,
            &StepPart {
                step: opts.src_step,
                part_id: opts.part_id,
            },
        )?;
        CsiMutations::reset_size(store, src_csi);

        let Some(dest_csi) = csi_of(store, opts.dest_step) else {
            return Ok(());
        };
        StepMutations::add_part(
            store,
            &StepPart {
                step: opts.dest_step,
                part_id: opts.part_id,
            },
        )?;
        CsiMutations::reset_size(store, dest_csi);
        Ok(())
    }

    /// Show a part of `step` in the last step of `callout`, creating that
    /// step when the callout is empty.
    pub fn add_to_callout(store: &mut Store, opts: &AddToCallout) -> Result<(), FolioError> {
        let callout = LookupKey::new(ItemType::Callout, opts.callout);
        let Some(model) = store.state().steps.get(opts.step).map(|s| s.model.clone()) else {
            return Ok(());
        };
        let Some(last) = store.state().callouts.get(opts.callout).map(|c| c.steps.last().copied()) else {
            return Ok(());
        };
        let dest = match last {
            Some(id) => id,
            None => StepMutations::add(store, &AddStep::new(callout))?.id,
        };
        let Some(step) = store.state_mut().steps.get_mut(dest) else {
            return Ok(());
        };
        step.model = model;
        step.parts.push(opts.part_id);
        if let Some(csi) = step.csi_id {
            CsiMutations::reset_size(store, csi);
        }
        mark_page_for_layout(store, callout);
        Ok(())
    }

    /// Take a part out of a callout step without touching any part list.
    pub fn remove_from_callout(store: &mut Store, opts: &PartInStep) {
        let Some(step) = store.state_mut().steps.get_mut(opts.step) else {
            return;
        };
        if let Some(pos) = step.parts.iter().position(|p| *p == opts.part_id) {
            step.parts.remove(pos);
        }
        if let Some(csi) = step.csi_id {
            CsiMutations::reset_size(store, csi);
        }
        mark_page_for_layout(store, step_key(opts.step));
    }

    /// Remove a part from the model: drop it from its step and the
    /// inventory, then shift every higher part id of the same model down by
    /// one so ids keep matching the catalog.
    pub fn delete(store: &mut Store, opts: &PartInStep) -> Result<(), FolioError> {
        let Some(model) = store.state().steps.get(opts.step).map(|s| s.model.filename.clone()) else {
            debug!(step = %step_key(opts.step), "part delete in missing step ignored");
            return Ok(());
        };
        let part = store.catalog().part(&model, opts.part_id);
        StepMutations::remove_part(
            store,
            &StepPart {
                step: opts.step,
                part_id: opts.part_id,
            },
        )?;
        if let Some(part) = part {
            InventoryPageMutations::remove_part(store, &InventoryPart { part })?;
        }
        for step in store
            .state_mut()
            .steps
            .iter_mut()
            .filter(|s| s.model.filename == model)
        {
            for id in step.parts.iter_mut().filter(|id| **id > opts.part_id) {
                *id -= 1;
            }
        }
        mark_page_for_layout(store, step_key(opts.step));
        Ok(())
    }
}
