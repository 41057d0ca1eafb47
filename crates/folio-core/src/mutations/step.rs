//! Step lifecycle, numbering, moves between pages and nesting.

use super::callout::{AddCallout, CalloutMutations};
use super::csi::{CsiMutations, DeleteCsi};
use super::item::{DeleteChildList, ItemMutations};
use super::part::{MoveToStep, PartMutations};
use super::pli::{AddPli, PliMutations, PliPart};
use super::rotate_icon::{AddRotateIcon, DeleteRotateIcon, RotateIconMutations};
use super::{mark_page_for_layout, renumber};
use crate::items::{NumberLabel, Step, StepModel};
use crate::store::Store;
use crate::types::{
    Align, FolioError, ItemId, ItemType, LookupKey, Orientation, PartId, Rotation, Side, VAlign,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStep {
    pub dest: LookupKey,
    #[serde(default)]
    pub model: Option<StepModel>,
    #[serde(default)]
    pub step_number: Option<i64>,
    #[serde(default)]
    pub renumber: bool,
    #[serde(default)]
    pub insertion_index: Option<usize>,
    #[serde(default)]
    pub parent_insertion_index: Option<usize>,
}

impl AddStep {
    /// Unnumbered step appended to `dest`.
    #[must_use]
    pub fn new(dest: LookupKey) -> Self {
        Self {
            dest,
            model: None,
            step_number: None,
            renumber: false,
            insertion_index: None,
            parent_insertion_index: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteStep {
    pub step: ItemId,
    #[serde(default)]
    pub delete_parts: bool,
    #[serde(default)]
    pub do_not_renumber: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRef {
    pub step: ItemId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveToPage {
    pub step: ItemId,
    pub dest_page: ItemId,
    #[serde(default)]
    pub parent_insertion_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeWithStep {
    pub src_step: ItemId,
    pub dest_step: ItemId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StretchToPage {
    pub step: ItemId,
    pub page: ItemId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetSubStepLayout {
    pub step: ItemId,
    pub layout: Orientation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToggleRotateIcon {
    pub step: ItemId,
    pub display: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyRotation {
    pub step: ItemId,
    pub next_x_steps: usize,
    pub rotation: Option<Vec<Rotation>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepPart {
    pub step: ItemId,
    #[serde(rename = "partID")]
    pub part_id: PartId,
}

fn step_key(id: ItemId) -> LookupKey {
    LookupKey::new(ItemType::Step, id)
}

pub struct StepMutations;

impl StepMutations {
    // =========================================================================
    // ADD / DELETE
    // =========================================================================

    /// Add a step with its csi, plus a pli when the step sits on a page.
    pub fn add(store: &mut Store, opts: &AddStep) -> Result<LookupKey, FolioError> {
        let step = Step {
            number: -1,
            model: opts.model.clone().unwrap_or_default(),
            sub_step_layout: Orientation::Vertical,
            x: Some(0.0),
            y: Some(0.0),
            width: Some(0.0),
            height: Some(0.0),
            ..Step::default()
        };
        let key = ItemMutations::add(
            store,
            step,
            Some(opts.dest),
            opts.insertion_index,
            opts.parent_insertion_index,
        )?;

        CsiMutations::add(store, key)?;
        if opts.dest.item_type == ItemType::Page {
            PliMutations::add(store, &AddPli { step: key.id })?;
        }

        if let Some(number) = opts.step_number {
            if let Some(step) = store.state_mut().steps.get_mut(key.id) {
                step.number = number;
            }
            Self::add_number_label(store, key)?;
        }
        if opts.renumber {
            Self::renumber(store, &StepRef { step: key.id });
        }
        Ok(key)
    }

    fn add_number_label(store: &mut Store, step: LookupKey) -> Result<LookupKey, FolioError> {
        let label = NumberLabel {
            align: Align::Left,
            valign: VAlign::Top,
            ..NumberLabel::default()
        };
        ItemMutations::add(store, label, Some(step), None, None)
    }

    /// Delete a step and everything it owns, then renumber its scope.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the step still lists parts and `delete_parts`
    /// is unset.
    pub fn delete(store: &mut Store, opts: &DeleteStep) -> Result<(), FolioError> {
        let key = step_key(opts.step);
        let Some(step) = store.state().steps.get(opts.step) else {
            debug!(step = %key, "delete of missing step ignored");
            return Ok(());
        };
        if !step.parts.is_empty() && !opts.delete_parts {
            return Err(FolioError::InvalidArgument(format!(
                "cannot delete {key}: it still holds {} parts",
                step.parts.len()
            )));
        }
        let parent = step.parent;
        let parts = step.parts.clone();
        let stretched_pages = step.stretched_pages.clone();
        let child_types = crate::items::Entity::child_types(step);

        for part_id in parts {
            Self::remove_part(store, &StepPart { step: opts.step, part_id })?;
        }
        for list_type in child_types {
            ItemMutations::delete_child_list(store, &DeleteChildList { item: key, list_type: *list_type })?;
        }
        for page in stretched_pages {
            if let Some(page) = store.state_mut().pages.get_mut(page) {
                if page.stretched_step.is_some_and(|s| s.step_id == opts.step) {
                    page.stretched_step = None;
                    page.needs_layout = true;
                }
            }
        }
        store.state_mut().remove_item(key)?;

        if !opts.do_not_renumber {
            Self::renumber_scope(store, parent);
        }
        if let Some(callout) = parent.filter(|p| p.item_type == ItemType::Callout) {
            Self::drop_lone_callout_label(store, callout)?;
        }
        Ok(())
    }

    /// A callout left with a single step shows no step number.
    fn drop_lone_callout_label(store: &mut Store, callout: LookupKey) -> Result<(), FolioError> {
        let steps = store.state().child_ids(callout, ItemType::Step);
        let [only] = steps.as_slice() else {
            return Ok(());
        };
        let label = store.state().steps.get(*only).and_then(|s| s.number_label_id);
        if let Some(label) = label {
            store
                .state_mut()
                .remove_item(LookupKey::new(ItemType::NumberLabel, label))?;
        }
        Ok(())
    }

    // =========================================================================
    // NUMBERING
    // =========================================================================

    /// Renumber the steps sharing `step`'s numbering scope.
    pub fn renumber(store: &mut Store, opts: &StepRef) {
        match store.state().steps.get(opts.step) {
            Some(step) => {
                let parent = step.parent;
                Self::renumber_scope(store, parent);
            }
            None => debug!(step = %step_key(opts.step), "renumber of missing step ignored"),
        }
    }

    /// Steps nested in a callout or step count from 1 within their parent.
    /// Every other step is document-scoped.
    fn renumber_scope(store: &mut Store, parent: Option<LookupKey>) {
        match parent {
            Some(p) if matches!(p.item_type, ItemType::Callout | ItemType::Step) => {
                let keys: Vec<LookupKey> = store
                    .state()
                    .child_ids(p, ItemType::Step)
                    .into_iter()
                    .map(step_key)
                    .collect();
                renumber(store.state_mut(), &keys, 1);
            }
            _ => Self::renumber_all(store),
        }
    }

    /// Number every step on a basic page from 0, in registry order.
    pub fn renumber_all(store: &mut Store) {
        let state = store.state();
        let keys: Vec<LookupKey> = state
            .steps
            .iter()
            .filter(|s| {
                s.parent
                    .filter(|p| p.item_type == ItemType::Page)
                    .and_then(|p| state.pages.get(p.id))
                    .is_some_and(crate::items::Page::is_basic)
            })
            .map(LookupKey::from)
            .collect();
        renumber(store.state_mut(), &keys, 0);
    }

    // =========================================================================
    // MOVES
    // =========================================================================

    pub fn move_to_page(store: &mut Store, opts: &MoveToPage) -> Result<(), FolioError> {
        let key = step_key(opts.step);
        let current = store
            .state()
            .steps
            .get(opts.step)
            .and_then(|s| s.parent)
            .filter(|p| p.item_type == ItemType::Page);
        let dest = LookupKey::new(ItemType::Page, opts.dest_page);
        let Some(current) = current.filter(|_| store.state().contains(dest)) else {
            debug!(step = %key, page = %dest, "move to page with missing endpoint ignored");
            return Ok(());
        };
        store
            .state_mut()
            .reparent_item(key, dest, Some(opts.parent_insertion_index.unwrap_or(0)))?;
        mark_page_for_layout(store, current);
        mark_page_for_layout(store, dest);
        Ok(())
    }

    pub fn move_to_previous_page(store: &mut Store, opts: &StepRef) -> Result<(), FolioError> {
        let get = store.get();
        let dest = get
            .page_for_item(step_key(opts.step))
            .and_then(|page| get.prev_basic_page(page.id))
            .map(|page| (page.id, page.steps.len()));
        match dest {
            Some((dest_page, index)) => Self::move_to_page(
                store,
                &MoveToPage {
                    step: opts.step,
                    dest_page,
                    parent_insertion_index: Some(index),
                },
            ),
            None => Ok(()),
        }
    }

    pub fn move_to_next_page(store: &mut Store, opts: &StepRef) -> Result<(), FolioError> {
        let get = store.get();
        let dest = get
            .page_for_item(step_key(opts.step))
            .and_then(|page| get.next_basic_page(page.id))
            .map(|page| page.id);
        match dest {
            Some(dest_page) => Self::move_to_page(
                store,
                &MoveToPage {
                    step: opts.step,
                    dest_page,
                    parent_insertion_index: Some(0),
                },
            ),
            None => Ok(()),
        }
    }

    /// Move every part of `src_step` into `dest_step`, then drop `src_step`.
    pub fn merge_with_step(store: &mut Store, opts: &MergeWithStep) -> Result<(), FolioError> {
        let (src, dest) = (step_key(opts.src_step), step_key(opts.dest_step));
        let Some(parts) = store.state().steps.get(opts.src_step).map(|s| s.parts.clone()) else {
            return Ok(());
        };
        if !store.state().contains(dest) {
            debug!(step = %dest, "merge into missing step ignored");
            return Ok(());
        }
        let src_page = store.get().page_for_item(src).map(LookupKey::from);

        for part_id in parts {
            PartMutations::move_to_step(
                store,
                &MoveToStep {
                    part_id,
                    src_step: opts.src_step,
                    dest_step: opts.dest_step,
                },
            )?;
        }
        Self::delete(
            store,
            &DeleteStep {
                step: opts.src_step,
                delete_parts: false,
                do_not_renumber: false,
            },
        )?;
        if let Some(page) = src_page {
            mark_page_for_layout(store, page);
        }
        mark_page_for_layout(store, dest);
        Ok(())
    }

    /// Let `step` spill over onto `page`.
    pub fn stretch_to_page(store: &mut Store, opts: &StretchToPage) {
        let state = store.state_mut();
        if !state.steps.contains(opts.step) || !state.pages.contains(opts.page) {
            return;
        }
        if let Some(page) = state.pages.get_mut(opts.page) {
            page.stretched_step = Some(crate::items::StretchedStep {
                step_id: opts.step,
                left_offset: 0.0,
            });
            page.needs_layout = true;
        }
        if let Some(step) = state.steps.get_mut(opts.step) {
            if !step.stretched_pages.contains(&opts.page) {
                step.stretched_pages.push(opts.page);
            }
        }
    }

    // =========================================================================
    // NESTING
    // =========================================================================

    /// Add a callout on the first side no existing callout occupies.
    pub fn add_callout(store: &mut Store, opts: &StepRef) -> Result<Option<LookupKey>, FolioError> {
        let Some(step) = store.get().step(opts.step) else {
            return Ok(None);
        };
        let taken: Vec<Side> = step
            .callouts
            .iter()
            .filter_map(|id| store.get().callout(*id).map(|c| c.position))
            .collect();
        let position = Side::PREFERENCE
            .into_iter()
            .find(|side| !taken.contains(side))
            .unwrap_or(Side::Left);

        let key = step_key(opts.step);
        let callout = CalloutMutations::add(
            store,
            &AddCallout {
                position,
                include_empty_step: true,
                ..AddCallout::new(key)
            },
        )?;
        mark_page_for_layout(store, key);
        Ok(Some(callout))
    }

    /// Split a step into sub steps: the first sub step takes over the
    /// parent's csi, parts and model.
    pub fn add_sub_step(store: &mut Store, opts: &StepRef) -> Result<Option<LookupKey>, FolioError> {
        let key = step_key(opts.step);
        let Some((csi, parts, model)) = store
            .state()
            .steps
            .get(opts.step)
            .and_then(|s| s.csi_id.map(|csi| (csi, s.parts.clone(), s.model.clone())))
        else {
            return Ok(None);
        };

        let sub = Self::add(
            store,
            &AddStep {
                step_number: Some(1),
                ..AddStep::new(key)
            },
        )?;
        let own_csi = store.state().steps.get(sub.id).and_then(|s| s.csi_id);
        if let Some(own_csi) = own_csi {
            CsiMutations::delete(store, &DeleteCsi { csi: own_csi })?;
        }
        store
            .state_mut()
            .reparent_item(LookupKey::new(ItemType::Csi, csi), sub, None)?;
        if let Some(step) = store.state_mut().steps.get_mut(sub.id) {
            step.parts = parts;
            step.model = model;
        }
        mark_page_for_layout(store, key);
        Ok(Some(sub))
    }

    pub fn set_sub_step_layout(store: &mut Store, opts: &SetSubStepLayout) {
        if let Some(step) = store.state_mut().steps.get_mut(opts.step) {
            step.sub_step_layout = opts.layout;
        }
        mark_page_for_layout(store, step_key(opts.step));
    }

    // =========================================================================
    // ROTATION & PARTS
    // =========================================================================

    pub fn toggle_rotate_icon(store: &mut Store, opts: &ToggleRotateIcon) -> Result<(), FolioError> {
        let Some(current) = store.state().steps.get(opts.step).map(|s| s.rotate_icon_id) else {
            return Ok(());
        };
        match (opts.display, current) {
            (true, None) => {
                RotateIconMutations::add(store, &AddRotateIcon { step: opts.step })?;
            }
            (false, Some(icon)) => {
                RotateIconMutations::delete(store, &DeleteRotateIcon { rotate_icon: icon })?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Apply `rotation` to the csi of each of the next `next_x_steps` steps.
    pub fn copy_rotation(store: &mut Store, opts: &CopyRotation) {
        let mut current = opts.step;
        for _ in 0..opts.next_x_steps {
            let Some(next) = store.get().next_step(current, false).map(|s| (s.id, s.csi_id)) else {
                break;
            };
            current = next.0;
            if let Some(csi) = next.1.and_then(|id| store.state_mut().csis.get_mut(id)) {
                csi.rotation.clone_from(&opts.rotation);
                csi.is_dirty = true;
            }
        }
    }

    /// Add a part to the step, keeping parts sorted, and to its pli.
    pub fn add_part(store: &mut Store, opts: &StepPart) -> Result<(), FolioError> {
        let Some(step) = store.state_mut().steps.get_mut(opts.step) else {
            return Ok(());
        };
        step.parts.push(opts.part_id);
        step.parts.sort_unstable();
        let (pli, model) = (step.pli_id, step.model.filename.clone());
        if let (Some(pli), Some(part)) = (pli, store.catalog().part(&model, opts.part_id)) {
            PliMutations::add_part(store, &PliPart { pli, part })?;
        }
        Ok(())
    }

    /// Remove one occurrence of a part from the step and its pli.
    pub fn remove_part(store: &mut Store, opts: &StepPart) -> Result<(), FolioError> {
        let Some(step) = store.state_mut().steps.get_mut(opts.step) else {
            return Ok(());
        };
        if let Some(pos) = step.parts.iter().position(|p| *p == opts.part_id) {
            step.parts.remove(pos);
        }
        let (pli, model) = (step.pli_id, step.model.filename.clone());
        if let (Some(pli), Some(part)) = (pli, store.catalog().part(&model, opts.part_id)) {
            PliMutations::remove_part(store, &PliPart { pli, part })?;
        }
        Ok(())
    }
}
