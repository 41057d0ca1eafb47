//! # Item Registry
//!
//! One ordered [`Collection`] per item type plus the document-wide settings
//! that travel with them. [`DocumentState`] is the single aggregate the undo
//! stack snapshots: it is `Clone + PartialEq + serde`, and holds no
//! references between items, only [`LookupKey`]s.
//!
//! Id lookup goes through a `BTreeMap` index rebuilt on every structural
//! change. Registries hold hundreds of items, so an O(n) rebuild on insert
//! or delete is cheaper than keeping positions patched by hand.

use crate::items::{
    Annotation, Book, Callout, CalloutArrow, Csi, Divider, Entity, NumberLabel, Page, Pli,
    PliItem, PointItem, QuantityLabel, Registered, RotateIcon, Step, SubmodelImage,
};
use crate::types::{ItemId, ItemType, LookupKey, PliTransform, Rotation};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::trace;

// =============================================================================
// COLLECTION
// =============================================================================

/// Ordered registry of one item type.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    items: Vec<T>,
    /// id -> position in `items`
    index: BTreeMap<ItemId, usize>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: BTreeMap::new(),
        }
    }
}

impl<T: Entity> Collection<T> {
    /// Build a collection from items in registry order.
    #[must_use]
    pub fn from_items(items: Vec<T>) -> Self {
        let mut collection = Self {
            items,
            index: BTreeMap::new(),
        };
        collection.reindex();
        collection
    }

    fn reindex(&mut self) {
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(pos, item)| (item.id(), pos))
            .collect();
    }

    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&T> {
        self.index.get(&id).and_then(|pos| self.items.get(*pos))
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut T> {
        match self.index.get(&id) {
            Some(pos) => self.items.get_mut(*pos),
            None => None,
        }
    }

    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.index.contains_key(&id)
    }

    /// Position of `id` in registry order.
    #[must_use]
    pub fn position(&self, id: ItemId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Mutable iteration. Callers must not change ids.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    /// Ids in registry order.
    #[must_use]
    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(Entity::id).collect()
    }

    /// `max(id) + 1`, or `0` when empty.
    #[must_use]
    pub fn next_id(&self) -> ItemId {
        self.index
            .keys()
            .next_back()
            .map_or(ItemId(0), |max| ItemId(max.0.saturating_add(1)))
    }

    /// Insert at `index` (append when `None` or past the end).
    pub fn insert(&mut self, item: T, index: Option<usize>) {
        match index {
            Some(i) if i < self.items.len() => self.items.insert(i, item),
            _ => self.items.push(item),
        }
        self.reindex();
    }

    pub fn remove(&mut self, id: ItemId) -> Option<T> {
        let pos = self.index.get(&id).copied()?;
        let removed = self.items.remove(pos);
        self.reindex();
        Some(removed)
    }

    /// Reorder items; ids are unchanged.
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        self.items.sort_by(compare);
        self.reindex();
    }
}

impl<T: Serialize> Serialize for Collection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de> + Entity> Deserialize<'de> for Collection<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Collection::from_items)
    }
}

// =============================================================================
// TEMPLATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl Default for PageSize {
    fn default() -> Self {
        Self {
            width: 900.0,
            height: 700.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneRendering {
    pub zoom: f64,
    pub edge_width: f64,
    pub rotation: Vec<Rotation>,
}

impl Default for SceneRendering {
    fn default() -> Self {
        Self {
            zoom: 0.0,
            edge_width: 4.0,
            rotation: Vec::new(),
        }
    }
}

/// Document-wide look settings.
///
/// `page` and `scene_rendering` are read by the store itself. Everything
/// else (fonts, borders, per-type styles) is opaque to the store and kept in
/// `settings`, addressed by dotted paths such as `"step.numberLabel.font"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Template {
    pub page: PageSize,
    pub scene_rendering: SceneRendering,
    #[serde(with = "json_settings")]
    pub settings: serde_json::Value,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            page: PageSize::default(),
            scene_rendering: SceneRendering::default(),
            settings: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

impl Template {
    /// Settings subtree at a dotted path.
    #[must_use]
    pub fn setting(&self, path: &str) -> Option<&serde_json::Value> {
        path.split('.')
            .filter(|s| !s.is_empty())
            .try_fold(&self.settings, |node, segment| node.get(segment))
    }
}

/// Free-form settings travel as a JSON value in human-readable formats and
/// as a JSON string in compact binary ones.
mod json_settings {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &serde_json::Value,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            value.serialize(serializer)
        } else {
            serializer.serialize_str(&value.to_string())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<serde_json::Value, D::Error> {
        if deserializer.is_human_readable() {
            serde_json::Value::deserialize(deserializer)
        } else {
            let text = String::deserialize(deserializer)?;
            serde_json::from_str(&text).map_err(D::Error::custom)
        }
    }
}

/// How page numbers continue across books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FirstPageNumbering {
    /// Every book starts at page 1.
    #[default]
    #[serde(rename = "start_page_1")]
    StartPage1,
    /// Books continue from the previous book's last page.
    #[serde(rename = "preserve_page_count")]
    PreservePageCount,
}

// =============================================================================
// DOCUMENT STATE
// =============================================================================

/// The whole document: every registry plus document-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentState {
    pub annotations: Collection<Annotation>,
    pub books: Collection<Book>,
    pub callout_arrows: Collection<CalloutArrow>,
    pub callouts: Collection<Callout>,
    pub csis: Collection<Csi>,
    pub dividers: Collection<Divider>,
    pub number_labels: Collection<NumberLabel>,
    pub pages: Collection<Page>,
    pub pli_items: Collection<PliItem>,
    pub plis: Collection<Pli>,
    pub points: Collection<PointItem>,
    pub quantity_labels: Collection<QuantityLabel>,
    pub rotate_icons: Collection<RotateIcon>,
    pub steps: Collection<Step>,
    pub submodel_images: Collection<SubmodelImage>,
    /// Model file this document was built from.
    pub filename: Option<String>,
    pub pli_transforms: BTreeMap<String, PliTransform>,
    pub plis_visible: bool,
    pub first_page_numbering: FirstPageNumbering,
    pub template: Template,
}

impl Default for DocumentState {
    fn default() -> Self {
        Self {
            annotations: Collection::default(),
            books: Collection::default(),
            callout_arrows: Collection::default(),
            callouts: Collection::default(),
            csis: Collection::default(),
            dividers: Collection::default(),
            number_labels: Collection::default(),
            pages: Collection::default(),
            pli_items: Collection::default(),
            plis: Collection::default(),
            points: Collection::default(),
            quantity_labels: Collection::default(),
            rotate_icons: Collection::default(),
            steps: Collection::default(),
            submodel_images: Collection::default(),
            filename: None,
            pli_transforms: BTreeMap::new(),
            plis_visible: true,
            first_page_numbering: FirstPageNumbering::default(),
            template: Template::default(),
        }
    }
}

/// Run `$body` with `$coll` bound to the collection for `$ty`.
macro_rules! with_collection {
    ($state:expr, $ty:expr, $coll:ident => $body:expr) => {
        match $ty {
            ItemType::Annotation => { let $coll = &$state.annotations; $body }
            ItemType::Book => { let $coll = &$state.books; $body }
            ItemType::Callout => { let $coll = &$state.callouts; $body }
            ItemType::CalloutArrow => { let $coll = &$state.callout_arrows; $body }
            ItemType::Csi => { let $coll = &$state.csis; $body }
            ItemType::Divider => { let $coll = &$state.dividers; $body }
            ItemType::NumberLabel => { let $coll = &$state.number_labels; $body }
            ItemType::Page => { let $coll = &$state.pages; $body }
            ItemType::Pli => { let $coll = &$state.plis; $body }
            ItemType::PliItem => { let $coll = &$state.pli_items; $body }
            ItemType::Point => { let $coll = &$state.points; $body }
            ItemType::QuantityLabel => { let $coll = &$state.quantity_labels; $body }
            ItemType::RotateIcon => { let $coll = &$state.rotate_icons; $body }
            ItemType::Step => { let $coll = &$state.steps; $body }
            ItemType::SubmodelImage => { let $coll = &$state.submodel_images; $body }
        }
    };
}

macro_rules! with_collection_mut {
    ($state:expr, $ty:expr, $coll:ident => $body:expr) => {
        match $ty {
            ItemType::Annotation => { let $coll = &mut $state.annotations; $body }
            ItemType::Book => { let $coll = &mut $state.books; $body }
            ItemType::Callout => { let $coll = &mut $state.callouts; $body }
            ItemType::CalloutArrow => { let $coll = &mut $state.callout_arrows; $body }
            ItemType::Csi => { let $coll = &mut $state.csis; $body }
            ItemType::Divider => { let $coll = &mut $state.dividers; $body }
            ItemType::NumberLabel => { let $coll = &mut $state.number_labels; $body }
            ItemType::Page => { let $coll = &mut $state.pages; $body }
            ItemType::Pli => { let $coll = &mut $state.plis; $body }
            ItemType::PliItem => { let $coll = &mut $state.pli_items; $body }
            ItemType::Point => { let $coll = &mut $state.points; $body }
            ItemType::QuantityLabel => { let $coll = &mut $state.quantity_labels; $body }
            ItemType::RotateIcon => { let $coll = &mut $state.rotate_icons; $body }
            ItemType::Step => { let $coll = &mut $state.steps; $body }
            ItemType::SubmodelImage => { let $coll = &mut $state.submodel_images; $body }
        }
    };
}

impl DocumentState {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a key to an item of any type.
    #[must_use]
    pub fn entity(&self, key: LookupKey) -> Option<&dyn Entity> {
        with_collection!(self, key.item_type, c => c.get(key.id).map(|e| e as &dyn Entity))
    }

    pub fn entity_mut(&mut self, key: LookupKey) -> Option<&mut dyn Entity> {
        with_collection_mut!(self, key.item_type, c => c.get_mut(key.id).map(|e| e as &mut dyn Entity))
    }

    #[must_use]
    pub fn contains(&self, key: LookupKey) -> bool {
        with_collection!(self, key.item_type, c => c.contains(key.id))
    }

    /// Typed lookup.
    #[must_use]
    pub fn item<T: Registered>(&self, id: ItemId) -> Option<&T> {
        T::collection(self).get(id)
    }

    pub fn item_mut<T: Registered>(&mut self, id: ItemId) -> Option<&mut T> {
        T::collection_mut(self).get_mut(id)
    }

    /// Ids of one type, in registry order.
    #[must_use]
    pub fn ids(&self, item_type: ItemType) -> Vec<ItemId> {
        with_collection!(self, item_type, c => c.ids())
    }

    /// Keys of one type, in registry order.
    #[must_use]
    pub fn keys(&self, item_type: ItemType) -> Vec<LookupKey> {
        self.ids(item_type)
            .into_iter()
            .map(|id| LookupKey::new(item_type, id))
            .collect()
    }

    /// Items of one type, in registry order.
    #[must_use]
    pub fn entities(&self, item_type: ItemType) -> Vec<&dyn Entity> {
        with_collection!(self, item_type, c => c.iter().map(|e| e as &dyn Entity).collect())
    }

    #[must_use]
    pub fn count(&self, item_type: ItemType) -> usize {
        with_collection!(self, item_type, c => c.len())
    }

    /// Number of items across every registry.
    #[must_use]
    pub fn total_count(&self) -> usize {
        ItemType::ALL.iter().map(|t| self.count(*t)).sum()
    }

    /// `max(id) + 1` for the type, or `0` when it has no items.
    #[must_use]
    pub fn next_item_id(&self, item_type: ItemType) -> ItemId {
        with_collection!(self, item_type, c => c.next_id())
    }

    /// Insert a typed item as-is. Returns its key.
    pub(crate) fn insert_item<T: Registered>(&mut self, item: T, index: Option<usize>) -> LookupKey {
        let key = item.key();
        T::collection_mut(self).insert(item, index);
        trace!(item = %key, "registry insert");
        key
    }

    /// Drop an item from its registry without touching any link.
    pub(crate) fn remove_entity(&mut self, key: LookupKey) -> bool {
        let removed = with_collection_mut!(self, key.item_type, c => c.remove(key.id).is_some());
        if removed {
            trace!(item = %key, "registry remove");
        }
        removed
    }
}

// =============================================================================
// TESTS
// =============================================================================
