//! Callout arrows: polylines of owned points from a callout to its step.

use super::item::{DeleteChildList, ItemMutations};
use crate::items::{CalloutArrow, PointItem};
use crate::store::Store;
use crate::types::geometry::midpoint;
use crate::types::{Direction, FolioError, ItemId, ItemType, LookupKey};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddCalloutArrow {
    pub callout: ItemId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalloutArrowRef {
    pub arrow: ItemId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotateTip {
    pub arrow: ItemId,
    pub direction: Direction,
}

fn arrow_key(id: ItemId) -> LookupKey {
    LookupKey::new(ItemType::CalloutArrow, id)
}

pub struct CalloutArrowMutations;

impl CalloutArrowMutations {
    /// Add a right-pointing arrow with two points at the origin.
    pub fn add(store: &mut Store, opts: &AddCalloutArrow) -> Result<LookupKey, FolioError> {
        let arrow = CalloutArrow {
            direction: Direction::Right,
            ..CalloutArrow::default()
        };
        let parent = LookupKey::new(ItemType::Callout, opts.callout);
        let key = ItemMutations::add(store, arrow, Some(parent), None, None)?;
        for _ in 0..2 {
            ItemMutations::add(store, PointItem::default(), Some(key), None, None)?;
        }
        Ok(key)
    }

    pub fn delete(store: &mut Store, opts: &CalloutArrowRef) -> Result<(), FolioError> {
        let key = arrow_key(opts.arrow);
        ItemMutations::delete_child_list(
            store,
            &DeleteChildList {
                item: key,
                list_type: ItemType::Point,
            },
        )?;
        store.state_mut().remove_item(key)?;
        Ok(())
    }

    /// Split the middle segment by inserting a point at its midpoint.
    pub fn add_point(store: &mut Store, opts: &CalloutArrowRef) -> Result<Option<LookupKey>, FolioError> {
        let get = store.get();
        let Some(arrow) = get.callout_arrow(opts.arrow) else {
            return Ok(None);
        };
        let index = arrow.points.len().div_ceil(2);
        let (Some(a), Some(b)) = (
            index.checked_sub(1).and_then(|i| arrow.points.get(i)),
            arrow.points.get(index),
        ) else {
            return Ok(None);
        };
        let (Some(p1), Some(pa), Some(pb)) = (
            get.point(*a),
            get.point_item_to_page(*a),
            get.point_item_to_page(*b),
        ) else {
            return Ok(None);
        };

        let mid = midpoint(pa, pb);
        let relative_to = p1.relative_to;
        let local = match relative_to.or(arrow.parent) {
            Some(frame) => get.page_to_item(mid, frame),
            None => mid,
        };
        let point = PointItem {
            x: local.x,
            y: local.y,
            relative_to,
            ..PointItem::default()
        };
        let key = ItemMutations::add(store, point, Some(arrow_key(opts.arrow)), None, Some(index))?;
        Ok(Some(key))
    }

    pub fn rotate_tip(store: &mut Store, opts: &RotateTip) {
        if let Some(arrow) = store.state_mut().callout_arrows.get_mut(opts.arrow) {
            arrow.direction = opts.direction;
        }
    }
}
