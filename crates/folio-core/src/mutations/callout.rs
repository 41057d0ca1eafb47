//! Callouts: boxed sub-assemblies attached to a step.

use super::callout_arrow::{AddCalloutArrow, CalloutArrowMutations};
use super::item::{DeleteChildList, ItemMutations};
use super::mark_page_for_layout;
use super::step::{AddStep, StepMutations};
use crate::items::{Callout, NumberLabel};
use crate::store::Store;
use crate::types::{Align, FolioError, ItemId, ItemType, LookupKey, Orientation, Side, VAlign};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCallout {
    pub parent: LookupKey,
    #[serde(default)]
    pub position: Side,
    #[serde(default)]
    pub include_empty_step: bool,
}

impl AddCallout {
    #[must_use]
    pub fn new(parent: LookupKey) -> Self {
        Self {
            parent,
            position: Side::Left,
            include_empty_step: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalloutRef {
    pub callout: ItemId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCalloutStep {
    pub callout: ItemId,
    #[serde(default)]
    pub insertion_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetCalloutLayout {
    pub callout: ItemId,
    #[serde(default)]
    pub layout: Option<Orientation>,
    #[serde(default)]
    pub position: Option<Side>,
}

fn callout_key(id: ItemId) -> LookupKey {
    LookupKey::new(ItemType::Callout, id)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetCalloutPosition {
    pub callout: ItemId,
    pub position: Side,
}

pub struct CalloutMutations;

impl CalloutMutations {
    /// Add a callout with one arrow, and optionally an empty first step.
    pub fn add(store: &mut Store, opts: &AddCallout) -> Result<LookupKey, FolioError> {
        let size = store.state().template.page;
        let callout = Callout {
            layout: if size.width > size.height {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            },
            position: opts.position,
            ..Callout::default()
        };
        let key = ItemMutations::add(store, callout, Some(opts.parent), None, None)?;
        if opts.include_empty_step {
            Self::add_first_step(store, &CalloutRef { callout: key.id })?;
        }
        CalloutArrowMutations::add(store, &AddCalloutArrow { callout: key.id })?;
        Ok(key)
    }

    pub fn delete(store: &mut Store, opts: &CalloutRef) -> Result<(), FolioError> {
        let key = callout_key(opts.callout);
        if !store.state().contains(key) {
            debug!(callout = %key, "delete of missing callout ignored");
            return Ok(());
        }
        mark_page_for_layout(store, key);
        for list_type in [ItemType::CalloutArrow, ItemType::Step] {
            ItemMutations::delete_child_list(store, &DeleteChildList { item: key, list_type })?;
        }
        store.state_mut().remove_item(key)?;
        Ok(())
    }

    /// Add an unnumbered step drawing from the same model as the callout's
    /// owning step.
    pub fn add_first_step(store: &mut Store, opts: &CalloutRef) -> Result<Option<LookupKey>, FolioError> {
        let Some(callout) = store.state().callouts.get(opts.callout) else {
            return Ok(None);
        };
        let model = callout
            .parent
            .and_then(|p| store.state().steps.get(p.id).filter(|_| p.item_type == ItemType::Step))
            .map(|s| s.model.clone());
        let step = StepMutations::add(
            store,
            &AddStep {
                model,
                ..AddStep::new(callout_key(opts.callout))
            },
        )?;
        Ok(Some(step))
    }

    /// Insert a step at `insertion_index` (append when unset), then number
    /// every step of the callout from 1 and give each a label.
    pub fn add_step(store: &mut Store, opts: &AddCalloutStep) -> Result<Option<LookupKey>, FolioError> {
        let key = callout_key(opts.callout);
        let Some(callout) = store.state().callouts.get(opts.callout) else {
            return Ok(None);
        };
        let Some(first) = callout.steps.first() else {
            return Self::add_first_step(store, &CalloutRef { callout: opts.callout });
        };
        let steps = &store.state().steps;
        let model = steps.get(*first).map(|s| s.model.clone());
        let dest = opts
            .insertion_index
            .and_then(|i| callout.steps.get(i))
            .and_then(|id| steps.get(*id));
        let number = match dest {
            Some(dest) if dest.number != 0 => dest.number,
            Some(_) => 1,
            None => callout
                .steps
                .last()
                .and_then(|id| steps.get(*id))
                .map_or(1, |s| s.number + 1),
        };

        let step = StepMutations::add(
            store,
            &AddStep {
                model,
                step_number: Some(number),
                parent_insertion_index: opts.insertion_index,
                ..AddStep::new(key)
            },
        )?;

        let ids = store.state().child_ids(key, ItemType::Step);
        for (idx, id) in ids.into_iter().enumerate() {
            let Some(step) = store.state_mut().steps.get_mut(id) else {
                continue;
            };
            step.number = i64::try_from(idx).map_or(i64::MAX, |n| n + 1);
            if step.number_label_id.is_none() {
                let label = NumberLabel {
                    align: Align::Left,
                    valign: VAlign::Top,
                    ..NumberLabel::default()
                };
                ItemMutations::add(store, label, Some(LookupKey::new(ItemType::Step, id)), None, None)?;
            }
        }
        mark_page_for_layout(store, key);
        Ok(Some(step))
    }

    /// Change layout and/or position; unset fields keep their value.
    pub fn set_layout(store: &mut Store, opts: &SetCalloutLayout) {
        if let Some(callout) = store.state_mut().callouts.get_mut(opts.callout) {
            if let Some(layout) = opts.layout {
                callout.layout = layout;
            }
            if let Some(position) = opts.position {
                callout.position = position;
            }
        }
        mark_page_for_layout(store, callout_key(opts.callout));
    }

    pub fn set_position(store: &mut Store, opts: &SetCalloutPosition) {
        Self::set_layout(
            store,
            &SetCalloutLayout {
                callout: opts.callout,
                layout: None,
                position: Some(opts.position),
            },
        );
    }
}
