//! Dividers: straight rules between steps on a page.

use super::item::ItemMutations;
use super::mark_page_for_layout;
use crate::items::Divider;
use crate::store::Store;
use crate::types::geometry::bbox;
use crate::types::{FolioError, ItemId, ItemType, LookupKey, Point};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddDivider {
    pub parent: LookupKey,
    pub p1: Point,
    pub p2: Point,
}

/// One end of a divider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DividerEnd {
    P1,
    P2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositionDivider {
    pub divider: ItemId,
    pub dx: f64,
    pub dy: f64,
    /// Move only this end; both when unset.
    #[serde(default)]
    pub end: Option<DividerEnd>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDividerLength {
    pub divider: ItemId,
    pub new_length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividerRef {
    pub divider: ItemId,
}

pub struct DividerMutations;

impl DividerMutations {
    pub fn add(store: &mut Store, opts: &AddDivider) -> Result<LookupKey, FolioError> {
        let divider = Divider {
            p1: opts.p1,
            p2: opts.p2,
            ..Divider::default()
        };
        let key = ItemMutations::add(store, divider, Some(opts.parent), None, None)?;
        mark_page_for_layout(store, key);
        Ok(key)
    }

    pub fn reposition(store: &mut Store, opts: &RepositionDivider) {
        let Some(divider) = store.state_mut().dividers.get_mut(opts.divider) else {
            debug!(divider = %opts.divider, "reposition of missing divider ignored");
            return;
        };
        let delta = Point::new(opts.dx, opts.dy);
        if opts.end != Some(DividerEnd::P2) {
            divider.p1 = divider.p1 + delta;
        }
        if opts.end != Some(DividerEnd::P1) {
            divider.p2 = divider.p2 + delta;
        }
    }

    /// Stretch from `p1` along the divider's axis. A divider with no height
    /// is horizontal; anything else is treated as vertical.
    pub fn set_length(store: &mut Store, opts: &SetDividerLength) {
        let Some(divider) = store.state_mut().dividers.get_mut(opts.divider) else {
            return;
        };
        let horizontal = bbox(&[divider.p1, divider.p2]).is_some_and(|b| b.height == 0.0);
        if horizontal {
            divider.p2.x = divider.p1.x + opts.new_length;
        } else {
            divider.p2.y = divider.p1.y + opts.new_length;
        }
    }

    pub fn delete(store: &mut Store, opts: &DividerRef) -> Result<(), FolioError> {
        let key = LookupKey::new(ItemType::Divider, opts.divider);
        mark_page_for_layout(store, key);
        store.state_mut().remove_item(key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::Page;

    fn divider(store: &mut Store, p2: Point) -> LookupKey {
        let page = ItemMutations::add(store, Page::default(), None, None, None).expect("page");
        DividerMutations::add(
            store,
            &AddDivider {
                parent: page,
                p1: Point::new(10.0, 10.0),
                p2,
            },
        )
        .expect("divider")
    }

    #[test]
    fn set_length_follows_orientation() {
        let mut store = Store::new();
        let flat = divider(&mut store, Point::new(50.0, 10.0));
        DividerMutations::set_length(&mut store, &SetDividerLength { divider: flat.id, new_length: 200.0 });
        assert_eq!(store.get().divider(flat.id).map(|d| d.p2), Some(Point::new(210.0, 10.0)));

        let upright = divider(&mut store, Point::new(10.0, 90.0));
        DividerMutations::set_length(&mut store, &SetDividerLength { divider: upright.id, new_length: 30.0 });
        assert_eq!(store.get().divider(upright.id).map(|d| d.p2), Some(Point::new(10.0, 40.0)));
    }

    #[test]
    fn reposition_moves_one_or_both_ends() {
        let mut store = Store::new();
        let key = divider(&mut store, Point::new(50.0, 10.0));
        DividerMutations::reposition(
            &mut store,
            &RepositionDivider { divider: key.id, dx: 5.0, dy: 0.0, end: Some(DividerEnd::P2) },
        );
        DividerMutations::reposition(&mut store, &RepositionDivider { divider: key.id, dx: 0.0, dy: 3.0, end: None });
        let d = store.get().divider(key.id).expect("divider");
        assert_eq!(d.p1, Point::new(10.0, 13.0));
        assert_eq!(d.p2, Point::new(55.0, 13.0));
    }

    #[test]
    fn delete_unlinks_from_page() {
        let mut store = Store::new();
        let key = divider(&mut store, Point::new(50.0, 10.0));
        DividerMutations::delete(&mut store, &DividerRef { divider: key.id }).expect("delete");
        assert!(store.state().dividers.is_empty());
        assert!(store.state().pages.first().is_some_and(|p| p.dividers.is_empty() && p.needs_layout));
    }
}
