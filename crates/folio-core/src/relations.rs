//! # Relationship Model
//!
//! Parent/child linkage layered over the registry. Every write here updates
//! both sides of a link (the child's `parent` key and the parent's list or
//! singular field) before returning, and validates its inputs before the
//! first write so a rejected call leaves the state untouched.
//!
//! References that no longer resolve are absorbed as no-ops: a deferred UI
//! callback may target an item an intervening undo already removed.

use crate::document::DocumentState;
use crate::items::Registered;
use crate::types::{FolioError, ItemId, ItemType, LookupKey, Point};
use tracing::debug;

impl DocumentState {
    // =========================================================================
    // LINKS
    // =========================================================================

    /// Whether `parent` declares a link for children of `child_type`.
    #[must_use]
    pub fn accepts_child(&self, parent: LookupKey, child_type: ItemType) -> bool {
        self.entity(parent)
            .and_then(|p| p.child_link(child_type))
            .is_some()
    }

    /// Link `child` into `parent`'s field for the child's type.
    pub(crate) fn link(&mut self, parent: LookupKey, child: LookupKey, index: Option<usize>) -> bool {
        match self
            .entity_mut(parent)
            .and_then(|p| p.child_link_mut(child.item_type))
        {
            Some(link) => {
                link.attach(child.id, index);
                true
            }
            None => false,
        }
    }

    /// Remove `child` from `parent`'s field for the child's type.
    pub(crate) fn unlink(&mut self, parent: LookupKey, child: LookupKey) -> bool {
        self.entity_mut(parent)
            .and_then(|p| p.child_link_mut(child.item_type))
            .is_some_and(|link| link.detach(child.id))
    }

    /// Keys of every child currently linked from `key`, in declaration order.
    #[must_use]
    pub fn owned_children(&self, key: LookupKey) -> Vec<LookupKey> {
        let Some(item) = self.entity(key) else {
            return Vec::new();
        };
        item.child_types()
            .iter()
            .flat_map(|ty| {
                item.child_link(*ty)
                    .map(|link| link.ids())
                    .unwrap_or_default()
                    .into_iter()
                    .map(move |id| LookupKey::new(*ty, id))
            })
            .collect()
    }

    /// Ids linked from `key` for one child type.
    #[must_use]
    pub fn child_ids(&self, key: LookupKey, child_type: ItemType) -> Vec<ItemId> {
        self.entity(key)
            .and_then(|item| item.child_link(child_type))
            .map(|link| link.ids())
            .unwrap_or_default()
    }

    // =========================================================================
    // ADD / REMOVE
    // =========================================================================

    /// Register `item` under a fresh id and link it into `parent`.
    ///
    /// The item is inserted into its registry at `insertion_index` and into
    /// the parent's link at `parent_insertion_index` (append when `None`).
    ///
    /// # Errors
    ///
    /// `MissingParent` when `parent` does not resolve, `InvalidArgument`
    /// when the parent type does not own children of this type.
    pub fn add_item<T: Registered>(
        &mut self,
        mut item: T,
        parent: Option<LookupKey>,
        insertion_index: Option<usize>,
        parent_insertion_index: Option<usize>,
    ) -> Result<LookupKey, FolioError> {
        if let Some(parent) = parent {
            if !self.contains(parent) {
                return Err(FolioError::MissingParent {
                    item_type: T::ITEM_TYPE,
                    parent,
                });
            }
            if !self.accepts_child(parent, T::ITEM_TYPE) {
                return Err(FolioError::InvalidArgument(format!(
                    "{} cannot own {} children",
                    parent.item_type,
                    T::ITEM_TYPE
                )));
            }
        }

        let id = T::collection(self).next_id();
        item.set_id(id);
        item.set_parent(parent);
        let key = self.insert_item(item, insertion_index);
        if let Some(parent) = parent {
            self.link(parent, key, parent_insertion_index);
        }
        Ok(key)
    }

    /// Remove `key` from its registry and from its parent's link.
    ///
    /// Returns `Ok(false)` when the item no longer exists.
    ///
    /// # Errors
    ///
    /// `HasChildren` while the item still owns any child; callers cascade
    /// through the per-type deletes first.
    pub fn remove_item(&mut self, key: LookupKey) -> Result<bool, FolioError> {
        let Some(item) = self.entity(key) else {
            debug!(item = %key, "delete of missing item ignored");
            return Ok(false);
        };
        if let Some(child_type) = item
            .child_types()
            .iter()
            .copied()
            .find(|ty| item.child_link(*ty).is_some_and(|l| !l.is_empty()))
        {
            return Err(FolioError::HasChildren {
                item: key,
                child_type,
            });
        }

        let parent = item.parent();
        self.remove_entity(key);
        if let Some(parent) = parent {
            self.unlink(parent, key);
        }
        Ok(true)
    }

    // =========================================================================
    // REPARENT / TRANSLATE
    // =========================================================================

    /// Move `key` under `new_parent`, at `parent_insertion_index` in its link.
    ///
    /// Returns `Ok(false)` without writing when either endpoint is missing.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `new_parent` cannot own this item's type, or
    /// when `new_parent` is `key` itself or sits inside its subtree.
    pub fn reparent_item(
        &mut self,
        key: LookupKey,
        new_parent: LookupKey,
        parent_insertion_index: Option<usize>,
    ) -> Result<bool, FolioError> {
        let old_parent = match self.entity(key) {
            Some(item) if self.contains(new_parent) => item.parent(),
            _ => {
                debug!(item = %key, parent = %new_parent, "reparent with missing endpoint ignored");
                return Ok(false);
            }
        };
        if !self.accepts_child(new_parent, key.item_type) {
            return Err(FolioError::InvalidArgument(format!(
                "{} cannot own {} children",
                new_parent.item_type, key.item_type
            )));
        }
        if self.lies_within(new_parent, key) {
            return Err(FolioError::InvalidArgument(format!(
                "{key} cannot move under {new_parent}, which it contains"
            )));
        }

        if let Some(old_parent) = old_parent {
            self.unlink(old_parent, key);
        }
        if let Some(item) = self.entity_mut(key) {
            item.set_parent(Some(new_parent));
        }
        self.link(new_parent, key, parent_insertion_index);
        Ok(true)
    }

    /// Whether `item` is `ancestor` or one of its descendants. The walk stops
    /// after as many hops as there are items, so a looped parent chain ends.
    #[must_use]
    pub fn lies_within(&self, item: LookupKey, ancestor: LookupKey) -> bool {
        let mut current = Some(item);
        for _ in 0..=self.total_count() {
            match current {
                Some(key) if key == ancestor => return true,
                Some(key) => current = self.entity(key).and_then(|e| e.parent()),
                None => return false,
            }
        }
        false
    }

    /// Detach `key` from its parent, leaving it parentless.
    pub(crate) fn detach_item(&mut self, key: LookupKey) -> bool {
        let Some(parent) = self.entity(key).and_then(|item| item.parent()) else {
            return false;
        };
        self.unlink(parent, key);
        if let Some(item) = self.entity_mut(key) {
            item.set_parent(None);
        }
        true
    }

    /// Shift an item by `delta`. Point-list items move their points; other
    /// items move their own origin. Returns whether anything moved.
    pub fn translate_item(&mut self, key: LookupKey, delta: Point) -> bool {
        let point_ids = match self.entity(key) {
            Some(item) => item.point_ids().map(<[ItemId]>::to_vec),
            None => {
                debug!(item = %key, "reposition of missing item ignored");
                return false;
            }
        };
        match point_ids {
            Some(ids) => {
                for id in ids {
                    if let Some(point) = self.points.get_mut(id) {
                        point.x += delta.x;
                        point.y += delta.y;
                    }
                }
                true
            }
            None => self.entity_mut(key).is_some_and(|item| item.translate(delta)),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
