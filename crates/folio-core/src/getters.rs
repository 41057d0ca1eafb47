//! # Getter API
//!
//! Side-effect-free queries over the registry: typed and dynamic lookup,
//! single-hop traversal, numeric prev/next adjacency, page helpers, part
//! accounting and coordinate conversion.
//!
//! Nothing here reports "not found" as an error. Missing items produce
//! `None` or an empty list. Every upward walk is capped at the number of
//! items in the document so a malformed (cyclic) graph still terminates.

use crate::catalog::PartCatalog;
use crate::document::DocumentState;
use crate::items::{
    Annotation, Book, Callout, CalloutArrow, Csi, Divider, Entity, NumberLabel, Page, Pli,
    PliItem, PointItem, QuantityLabel, Registered, RotateIcon, Step, SubmodelImage,
};
use crate::types::geometry::{bbox, expand_box, union};
use crate::types::{
    Align, ItemId, ItemType, LookupKey, PageSubtype, PartId, PartRef, PliTransform, Point, Rect,
    VAlign,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Padding around a target box when drawing the selection highlight.
pub const HIGHLIGHT_PADDING: f64 = 2.0;

/// Minimum size of a box computed from a point list.
pub const MIN_POINT_BOX_SIZE: f64 = 8.0;

/// A submodel used by the document, with how many copies its parent holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmodelUsage {
    pub filename: String,
    pub parent: String,
    pub quantity: usize,
}

/// Read-only view over a document and its part library.
#[derive(Debug, Clone, Copy)]
pub struct Getters<'a> {
    state: &'a DocumentState,
    catalog: &'a dyn PartCatalog,
}

impl<'a> Getters<'a> {
    #[must_use]
    pub fn new(state: &'a DocumentState, catalog: &'a dyn PartCatalog) -> Self {
        Self { state, catalog }
    }

    #[must_use]
    pub fn state(&self) -> &'a DocumentState {
        self.state
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// Typed lookup by id.
    #[must_use]
    pub fn item<T: Registered>(&self, id: ItemId) -> Option<&'a T> {
        T::collection(self.state).get(id)
    }

    #[must_use]
    pub fn annotation(&self, id: ItemId) -> Option<&'a Annotation> {
        self.item(id)
    }

    #[must_use]
    pub fn book(&self, id: ItemId) -> Option<&'a Book> {
        self.item(id)
    }

    #[must_use]
    pub fn callout(&self, id: ItemId) -> Option<&'a Callout> {
        self.item(id)
    }

    #[must_use]
    pub fn callout_arrow(&self, id: ItemId) -> Option<&'a CalloutArrow> {
        self.item(id)
    }

    #[must_use]
    pub fn csi(&self, id: ItemId) -> Option<&'a Csi> {
        self.item(id)
    }

    #[must_use]
    pub fn divider(&self, id: ItemId) -> Option<&'a Divider> {
        self.item(id)
    }

    #[must_use]
    pub fn number_label(&self, id: ItemId) -> Option<&'a NumberLabel> {
        self.item(id)
    }

    #[must_use]
    pub fn page(&self, id: ItemId) -> Option<&'a Page> {
        self.item(id)
    }

    #[must_use]
    pub fn pli(&self, id: ItemId) -> Option<&'a Pli> {
        self.item(id)
    }

    #[must_use]
    pub fn pli_item(&self, id: ItemId) -> Option<&'a PliItem> {
        self.item(id)
    }

    #[must_use]
    pub fn point(&self, id: ItemId) -> Option<&'a PointItem> {
        self.item(id)
    }

    #[must_use]
    pub fn quantity_label(&self, id: ItemId) -> Option<&'a QuantityLabel> {
        self.item(id)
    }

    #[must_use]
    pub fn rotate_icon(&self, id: ItemId) -> Option<&'a RotateIcon> {
        self.item(id)
    }

    #[must_use]
    pub fn step(&self, id: ItemId) -> Option<&'a Step> {
        self.item(id)
    }

    #[must_use]
    pub fn submodel_image(&self, id: ItemId) -> Option<&'a SubmodelImage> {
        self.item(id)
    }

    /// Resolve a key, or pass an already-resolved item through.
    #[must_use]
    pub fn lookup_to_item(&self, item: impl Into<LookupKey>) -> Option<&'a dyn Entity> {
        self.state.entity(item.into())
    }

    /// First item of `item_type` carrying `number`.
    #[must_use]
    pub fn item_by_number(&self, item_type: ItemType, number: i64) -> Option<&'a dyn Entity> {
        self.state
            .entities(item_type)
            .into_iter()
            .find(|e| e.number() == Some(number))
    }

    #[must_use]
    pub fn next_item_id(&self, item_type: ItemType) -> ItemId {
        self.state.next_item_id(item_type)
    }

    // =========================================================================
    // TRAVERSAL
    // =========================================================================

    #[must_use]
    pub fn parent(&self, item: impl Into<LookupKey>) -> Option<&'a dyn Entity> {
        let key = self.state.entity(item.into())?.parent()?;
        self.state.entity(key)
    }

    /// Child types listed when `children` is called without a filter.
    #[must_use]
    pub fn display_child_types(&self) -> Vec<ItemType> {
        let mut types = ItemType::DISPLAY_ORDER.to_vec();
        if self.state.plis_visible {
            types.push(ItemType::Pli);
        }
        types
    }

    /// Direct children of `item`, grouped by type in `filter` order.
    #[must_use]
    pub fn children(
        &self,
        item: impl Into<LookupKey>,
        filter: Option<&[ItemType]>,
    ) -> Vec<&'a dyn Entity> {
        let key = item.into();
        let Some(parent) = self.state.entity(key) else {
            return Vec::new();
        };
        let types = match filter {
            Some(types) => types.to_vec(),
            None => self.display_child_types(),
        };
        types
            .into_iter()
            .filter_map(|ty| parent.child_link(ty).map(|link| (ty, link.ids())))
            .flat_map(|(ty, ids)| ids.into_iter().map(move |id| LookupKey::new(ty, id)))
            .filter_map(|k| self.state.entity(k))
            .collect()
    }

    #[must_use]
    pub fn has_children(&self, item: impl Into<LookupKey>, filter: Option<&[ItemType]>) -> bool {
        !self.children(item, filter).is_empty()
    }

    /// Every child of a step, including a hidden part list.
    #[must_use]
    pub fn step_children(&self, step: ItemId) -> Vec<&'a dyn Entity> {
        let key = LookupKey::new(ItemType::Step, step);
        self.state
            .owned_children(key)
            .into_iter()
            .filter_map(|k| self.state.entity(k))
            .collect()
    }

    /// Ancestor keys of `item`, nearest first.
    #[must_use]
    pub fn ancestors(&self, item: impl Into<LookupKey>) -> Vec<LookupKey> {
        let limit = self.state.total_count();
        let mut out = Vec::new();
        let mut current = self.state.entity(item.into()).and_then(|e| e.parent());
        while let Some(key) = current {
            if out.len() > limit {
                break;
            }
            let Some(entity) = self.state.entity(key) else {
                break;
            };
            out.push(key);
            current = entity.parent();
        }
        out
    }

    /// True when `item` is `ancestor` or lies beneath it.
    #[must_use]
    pub fn is_descendent(&self, item: impl Into<LookupKey>, ancestor: impl Into<LookupKey>) -> bool {
        let (item, ancestor) = (item.into(), ancestor.into());
        item == ancestor || self.ancestors(item).contains(&ancestor)
    }

    // =========================================================================
    // NUMERIC ADJACENCY
    // =========================================================================

    #[must_use]
    pub fn prev(&self, item: impl Into<LookupKey>, within: Option<&[LookupKey]>) -> Option<&'a dyn Entity> {
        self.adjacent(item.into(), -1, within)
    }

    #[must_use]
    pub fn next(&self, item: impl Into<LookupKey>, within: Option<&[LookupKey]>) -> Option<&'a dyn Entity> {
        self.adjacent(item.into(), 1, within)
    }

    fn page_subtype_of(&self, key: Option<LookupKey>) -> Option<PageSubtype> {
        key.filter(|k| k.item_type == ItemType::Page)
            .and_then(|k| self.page(k.id))
            .map(|p| p.subtype)
    }

    /// Item of the same type numbered `number + offset` whose parent is of
    /// the same kind. Steps nested in callouts or steps are numbered per
    /// parent, so they only match siblings.
    fn adjacent(&self, key: LookupKey, offset: i64, within: Option<&[LookupKey]>) -> Option<&'a dyn Entity> {
        let item = self.state.entity(key)?;
        let target = item.number()? + offset;
        let parent = item.parent();
        let nested = matches!(
            parent.map(|p| p.item_type),
            Some(ItemType::Callout | ItemType::Step)
        );
        let own_subtype = self.page_subtype_of(Some(key));
        let parent_subtype = self.page_subtype_of(parent);

        let candidates: Vec<&'a dyn Entity> = match within {
            Some(keys) => keys.iter().filter_map(|k| self.state.entity(*k)).collect(),
            None => self.state.entities(key.item_type),
        };
        candidates.into_iter().find(|c| {
            c.item_type() == key.item_type
                && c.number() == Some(target)
                && c.parent().map(|p| p.item_type) == parent.map(|p| p.item_type)
                && (!nested || c.parent() == parent)
                && self.page_subtype_of(Some(c.key())) == own_subtype
                && self.page_subtype_of(c.parent()) == parent_subtype
        })
    }

    /// Neighbouring step, crossing onto the adjacent basic page when the
    /// numeric neighbour is missing. With `limit_to_submodel`, steps from a
    /// different model file do not count.
    #[must_use]
    pub fn adjacent_step(&self, step: ItemId, forward: bool, limit_to_submodel: bool) -> Option<&'a Step> {
        let current = self.step(step)?;
        let key = current.key();
        let numeric = if forward {
            self.next(key, None)
        } else {
            self.prev(key, None)
        };
        let found = match numeric {
            Some(e) => self.step(e.id()),
            None => {
                let page = current
                    .parent
                    .filter(|p| p.item_type == ItemType::Page)
                    .and_then(|p| self.page(p.id))?;
                let neighbour = if forward {
                    self.next_basic_page(page.id)
                } else {
                    self.prev_basic_page(page.id)
                }?;
                let id = if forward {
                    neighbour.steps.first()
                } else {
                    neighbour.steps.last()
                };
                id.and_then(|id| self.step(*id))
            }
        }?;
        if limit_to_submodel && found.model.filename != current.model.filename {
            return None;
        }
        Some(found)
    }

    #[must_use]
    pub fn prev_step(&self, step: ItemId, limit_to_submodel: bool) -> Option<&'a Step> {
        self.adjacent_step(step, false, limit_to_submodel)
    }

    #[must_use]
    pub fn next_step(&self, step: ItemId, limit_to_submodel: bool) -> Option<&'a Step> {
        self.adjacent_step(step, true, limit_to_submodel)
    }

    // =========================================================================
    // PAGES
    // =========================================================================

    /// Nearest page at or above `item`.
    #[must_use]
    pub fn page_for_item(&self, item: impl Into<LookupKey>) -> Option<&'a Page> {
        let key = item.into();
        if key.item_type == ItemType::Page {
            return self.page(key.id);
        }
        self.ancestors(key)
            .into_iter()
            .find(|k| k.item_type == ItemType::Page)
            .and_then(|k| self.page(k.id))
    }

    fn pages_of(&self, subtype: PageSubtype) -> Vec<&'a Page> {
        self.state.pages.iter().filter(|p| p.subtype == subtype).collect()
    }

    #[must_use]
    pub fn template_page(&self) -> Option<&'a Page> {
        self.pages_of(PageSubtype::TemplatePage).into_iter().next()
    }

    #[must_use]
    pub fn title_page(&self) -> Option<&'a Page> {
        self.pages_of(PageSubtype::TitlePage).into_iter().next()
    }

    #[must_use]
    pub fn basic_pages(&self) -> Vec<&'a Page> {
        self.pages_of(PageSubtype::Page)
    }

    #[must_use]
    pub fn inventory_pages(&self) -> Vec<&'a Page> {
        self.pages_of(PageSubtype::InventoryPage)
    }

    /// Pages other than the template page, in document order.
    #[must_use]
    pub fn document_pages(&self) -> Vec<&'a Page> {
        self.state
            .pages
            .iter()
            .filter(|p| p.subtype != PageSubtype::TemplatePage)
            .collect()
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.document_pages().len()
    }

    /// Name of the main model: its file stem, or a title-cased form of it
    /// when `nice` is set. Empty without a model.
    #[must_use]
    pub fn model_name(&self, nice: bool) -> String {
        let Some(filename) = self.catalog.main_model() else {
            return String::new();
        };
        let base = filename
            .rsplit_once('.')
            .map_or(filename, |(stem, _)| stem);
        if !nice {
            return base.to_string();
        }
        base.split(|c: char| c == '/' || c == '_' || c == '-' || c.is_whitespace())
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars).collect()
                })
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[must_use]
    pub fn first_page(&self) -> Option<&'a Page> {
        self.document_pages().into_iter().next()
    }

    #[must_use]
    pub fn last_page(&self) -> Option<&'a Page> {
        self.document_pages().into_iter().next_back()
    }

    #[must_use]
    pub fn first_basic_page(&self) -> Option<&'a Page> {
        self.basic_pages().into_iter().next()
    }

    #[must_use]
    pub fn last_basic_page(&self) -> Option<&'a Page> {
        self.basic_pages().into_iter().next_back()
    }

    #[must_use]
    pub fn is_first_basic_page(&self, page: ItemId) -> bool {
        self.first_basic_page().is_some_and(|p| p.id == page)
    }

    #[must_use]
    pub fn is_last_basic_page(&self, page: ItemId) -> bool {
        self.last_basic_page().is_some_and(|p| p.id == page)
    }

    fn neighbour_in(pages: &[&'a Page], page: ItemId, forward: bool) -> Option<&'a Page> {
        let pos = pages.iter().position(|p| p.id == page)?;
        if forward {
            pages.get(pos + 1).copied()
        } else {
            pos.checked_sub(1).and_then(|i| pages.get(i).copied())
        }
    }

    #[must_use]
    pub fn prev_page(&self, page: ItemId) -> Option<&'a Page> {
        Self::neighbour_in(&self.document_pages(), page, false)
    }

    #[must_use]
    pub fn next_page(&self, page: ItemId) -> Option<&'a Page> {
        Self::neighbour_in(&self.document_pages(), page, true)
    }

    #[must_use]
    pub fn prev_basic_page(&self, page: ItemId) -> Option<&'a Page> {
        Self::neighbour_in(&self.basic_pages(), page, false)
    }

    #[must_use]
    pub fn next_basic_page(&self, page: ItemId) -> Option<&'a Page> {
        Self::neighbour_in(&self.basic_pages(), page, true)
    }

    #[must_use]
    pub fn first_book_page(&self, book: ItemId) -> Option<&'a Page> {
        self.book(book)?.pages.first().and_then(|id| self.page(*id))
    }

    /// Template settings that style `item`.
    #[must_use]
    pub fn template_for_item(&self, item: impl Into<LookupKey>) -> Option<&'a serde_json::Value> {
        let key = item.into();
        let entity = self.state.entity(key)?;
        let path = match key.item_type {
            ItemType::Page => match self.page(key.id)?.subtype {
                PageSubtype::TitlePage => "titlePage".to_string(),
                PageSubtype::InventoryPage => "inventoryPage".to_string(),
                _ => "page".to_string(),
            },
            other => match entity.parent().map(|p| p.item_type) {
                Some(ItemType::Callout) if other == ItemType::Step => "callout.step".to_string(),
                Some(parent) if parent != ItemType::Page && parent != ItemType::Book => {
                    format!("{}.{}", parent.as_str(), other.as_str())
                }
                _ => other.as_str().to_string(),
            },
        };
        self.state
            .template
            .setting(&path)
            .or_else(|| self.state.template.setting(key.item_type.as_str()))
    }

    // =========================================================================
    // PARTS
    // =========================================================================

    /// Parts present once `step` is built: its own parts plus every earlier
    /// step of the same model, stopping at a book boundary.
    #[must_use]
    pub fn part_list(&self, step: ItemId) -> Vec<PartId> {
        let Some(first) = self.step(step) else {
            return Vec::new();
        };
        let limit = self.state.steps.len();
        let mut parts: BTreeSet<PartId> = first.parts.iter().copied().collect();
        let mut current = first;
        for _ in 0..limit {
            if let Some(prev_book) = &current.prev_book_parts {
                parts.extend(prev_book.iter().copied());
                break;
            }
            match self.prev_step(current.id, true) {
                Some(prev) => {
                    parts.extend(prev.parts.iter().copied());
                    current = prev;
                }
                None => break,
            }
        }
        parts.into_iter().collect()
    }

    /// Catalog entries for the parts added in `step`.
    #[must_use]
    pub fn parts_in_step(&self, step: ItemId) -> Vec<PartRef> {
        let Some(step) = self.step(step) else {
            return Vec::new();
        };
        step.parts
            .iter()
            .filter_map(|id| self.catalog.part(&step.model.filename, *id))
            .collect()
    }

    #[must_use]
    pub fn step_has_submodel(&self, step: ItemId) -> bool {
        self.parts_in_step(step)
            .iter()
            .any(|p| self.catalog.is_submodel(&p.filename))
    }

    /// Item in `parent`'s part list showing the same file in the same color.
    /// `parent` is a pli or an inventory page.
    #[must_use]
    pub fn matching_pli_item(&self, parent: LookupKey, part: &PartRef) -> Option<&'a PliItem> {
        self.state
            .child_ids(parent, ItemType::PliItem)
            .into_iter()
            .filter_map(|id| self.pli_item(id))
            .find(|item| item.filename == part.filename && item.color_code == part.color_code)
    }

    #[must_use]
    pub fn pli_item_is_submodel(&self, pli_item: ItemId) -> bool {
        self.pli_item(pli_item)
            .is_some_and(|item| self.catalog.is_submodel(&item.filename))
    }

    #[must_use]
    pub fn pli_transform(&self, filename: &str) -> Option<&'a PliTransform> {
        self.state.pli_transforms.get(filename)
    }

    /// Whether a user may drag `item`.
    #[must_use]
    pub fn is_moveable(&self, item: impl Into<LookupKey>) -> bool {
        let key = item.into();
        if matches!(key.item_type, ItemType::Page | ItemType::Book) {
            return false;
        }
        match self.page_for_item(key) {
            Some(page) => !page.locked,
            None => self.state.contains(key),
        }
    }

    /// Submodels reachable from the main model, depth first, each listed
    /// once per containing model.
    #[must_use]
    pub fn submodels(&self) -> Vec<SubmodelUsage> {
        let Some(main) = self.catalog.main_model() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        self.collect_submodels(main, 0, &mut seen, &mut out);
        out
    }

    fn collect_submodels(
        &self,
        model: &str,
        depth: usize,
        seen: &mut BTreeSet<(String, String)>,
        out: &mut Vec<SubmodelUsage>,
    ) {
        if depth > crate::catalog::MAX_SUBMODEL_DEPTH {
            return;
        }
        for part in self.catalog.model_parts(model) {
            if !self.catalog.is_submodel(&part.filename) {
                continue;
            }
            if seen.insert((model.to_string(), part.filename.clone())) {
                out.push(SubmodelUsage {
                    filename: part.filename.clone(),
                    parent: model.to_string(),
                    quantity: self.catalog.submodel_count(model, &part.filename),
                });
                self.collect_submodels(&part.filename, depth + 1, seen, out);
            }
        }
    }

    // =========================================================================
    // COORDINATES
    // =========================================================================

    /// Sum of local origins of `item` and every ancestor.
    #[must_use]
    pub fn item_to_page(&self, item: impl Into<LookupKey>) -> Point {
        let key = item.into();
        std::iter::once(key)
            .chain(self.ancestors(key))
            .filter_map(|k| self.state.entity(k))
            .filter_map(|e| e.origin())
            .fold(Point::default(), |acc, p| acc + p)
    }

    /// Express a page-space point in `item`'s local frame.
    #[must_use]
    pub fn page_to_item(&self, point: Point, item: impl Into<LookupKey>) -> Point {
        point - self.item_to_page(item)
    }

    /// Convert a point stored relative to `relative_to` into page space.
    #[must_use]
    pub fn point_to_page(&self, x: f64, y: f64, relative_to: Option<LookupKey>) -> Point {
        let local = Point::new(x, y);
        match relative_to {
            Some(frame) => local + self.item_to_page(frame),
            None => local,
        }
    }

    /// Page-space position of an owned point. Points without an explicit
    /// frame are relative to the frame of the item that owns them.
    #[must_use]
    pub fn point_item_to_page(&self, point: ItemId) -> Option<Point> {
        let pt = self.point(point)?;
        let frame = pt.relative_to.or_else(|| {
            pt.parent
                .and_then(|owner| self.state.entity(owner))
                .and_then(|owner| owner.parent())
        });
        Some(self.point_to_page(pt.x, pt.y, frame))
    }

    /// Page-space box of `item`.
    #[must_use]
    pub fn target_box(&self, item: impl Into<LookupKey>) -> Option<Rect> {
        let key = item.into();
        let entity = self.state.entity(key)?;
        if key.item_type == ItemType::Page {
            let size = self.state.template.page;
            return Some(Rect::new(0.0, 0.0, size.width, size.height));
        }
        let point_ids = entity.point_ids();
        if point_ids.is_some_and(|ids| !ids.is_empty()) {
            return self.target_box_from_points(key);
        }

        // A point-list item with no points falls back to its own box, which
        // for arrows is an empty box at the frame origin.
        let mut rect = match entity.bounds() {
            Some(rect) => rect,
            None if point_ids.is_some() => Rect::default(),
            None => return None,
        };
        rect = rect.translated(entity.border_offset());
        let (align, valign) = entity.alignment();
        if align == Align::Right {
            rect.x -= rect.width;
        }
        if valign == VAlign::Bottom {
            rect.y -= rect.height;
        }

        let limit = self.state.total_count();
        let mut frame = entity.relative_to().or_else(|| entity.parent());
        let mut steps = 0;
        while let Some(k) = frame {
            let Some(ancestor) = self.state.entity(k) else {
                break;
            };
            steps += 1;
            if steps > limit {
                break;
            }
            rect = rect.translated(ancestor.inner_content_offset());
            if let Some(origin) = ancestor.origin() {
                rect = rect.translated(origin);
            }
            frame = ancestor.relative_to().or_else(|| ancestor.parent());
        }
        Some(rect)
    }

    /// Box around the page-space positions of a point-list item.
    #[must_use]
    pub fn target_box_from_points(&self, item: impl Into<LookupKey>) -> Option<Rect> {
        let entity = self.state.entity(item.into())?;
        let points: Vec<Point> = entity
            .point_ids()?
            .iter()
            .filter_map(|id| self.point_item_to_page(*id))
            .collect();
        bbox(&points).map(|b| expand_box(b, MIN_POINT_BOX_SIZE, MIN_POINT_BOX_SIZE))
    }

    /// Selection highlight around `item` as drawn on `current_page`.
    ///
    /// - a page gets an inset frame;
    /// - a divider's box grows to at least 8x8;
    /// - a PLI item's box includes its quantity label;
    /// - a point gets a 4x4 box centred on it.
    ///
    /// Items inside the step stretched onto `current_page` shift right by
    /// that page's left offset. The result is padded by 2 on each side, less
    /// one pixel in width and height.
    #[must_use]
    pub fn highlight_box(&self, item: impl Into<LookupKey>, current_page: Option<ItemId>) -> Option<Rect> {
        let key = item.into();
        let rect = match key.item_type {
            ItemType::Page => {
                if !self.state.contains(key) {
                    return None;
                }
                let size = self.state.template.page;
                Rect::new(5.0, 5.0, size.width - 9.0, size.height - 9.0)
            }
            ItemType::Divider => {
                let b = self.target_box(key)?;
                expand_box(b, MIN_POINT_BOX_SIZE, MIN_POINT_BOX_SIZE)
            }
            ItemType::PliItem => {
                let b = self.target_box(key)?;
                let label = self
                    .pli_item(key.id)
                    .and_then(|p| p.quantity_label_id)
                    .and_then(|id| self.target_box(LookupKey::new(ItemType::QuantityLabel, id)));
                match label {
                    Some(label) => union(&[b, label]).unwrap_or(b),
                    None => b,
                }
            }
            ItemType::Point => {
                let b = self.target_box(key)?;
                Rect::new(b.x - 2.0, b.y - 2.0, 4.0, 4.0)
            }
            _ => self.target_box(key)?,
        };

        let dx = current_page
            .and_then(|id| self.page(id))
            .and_then(|page| page.stretched_step)
            .filter(|stretched| {
                self.step(stretched.step_id).is_some()
                    && self.is_descendent(key, LookupKey::new(ItemType::Step, stretched.step_id))
            })
            .map_or(0.0, |stretched| stretched.left_offset);

        let pad = HIGHLIGHT_PADDING;
        Some(Rect::new(
            rect.x - pad + dx,
            rect.y - pad,
            pad + rect.width + pad - 1.0,
            pad + rect.height + pad - 1.0,
        ))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EmptyCatalog;
    use crate::items::StretchedStep;

    struct Fixture {
        state: DocumentState,
        page: LookupKey,
        step: LookupKey,
        callout: LookupKey,
        inner: LookupKey,
        arrow: LookupKey,
    }

    fn fixture() -> Fixture {
        let mut state = DocumentState::new();
        let page = state
            .add_item(Page::default(), None, None, None)
            .expect("page");
        let step = state
            .add_item(
                Step {
                    number: 1,
                    x: Some(10.0),
                    y: Some(20.0),
                    width: Some(300.0),
                    height: Some(200.0),
                    ..Step::default()
                },
                Some(page),
                None,
                None,
            )
            .expect("step");
        let callout = state
            .add_item(
                Callout {
                    x: Some(5.0),
                    y: Some(5.0),
                    width: Some(50.0),
                    height: Some(40.0),
                    border_offset: Point::new(1.0, 1.0),
                    ..Callout::default()
                },
                Some(step),
                None,
                None,
            )
            .expect("callout");
        let inner = state
            .add_item(
                Step {
                    number: 1,
                    x: Some(2.0),
                    y: Some(3.0),
                    ..Step::default()
                },
                Some(callout),
                None,
                None,
            )
            .expect("inner step");
        let arrow = state
            .add_item(CalloutArrow::default(), Some(callout), None, None)
            .expect("arrow");
        for (x, y) in [(0.0, 0.0), (30.0, 0.0)] {
            state
                .add_item(PointItem { x, y, ..PointItem::default() }, Some(arrow), None, None)
                .expect("point");
        }
        Fixture {
            state,
            page,
            step,
            callout,
            inner,
            arrow,
        }
    }

    #[test]
    fn lookup_passes_resolved_items_through() {
        let f = fixture();
        let get = Getters::new(&f.state, &EmptyCatalog);
        let step = get.step(f.step.id).expect("step");
        let via_item = get.lookup_to_item(step).expect("pass-through");
        let via_key = get.lookup_to_item(f.step).expect("resolve");
        assert_eq!(via_item.key(), via_key.key());
    }

    #[test]
    fn parent_children_and_descendents() {
        let f = fixture();
        let get = Getters::new(&f.state, &EmptyCatalog);
        assert_eq!(get.parent(f.inner).map(|e| e.key()), Some(f.callout));
        let kids: Vec<LookupKey> = get.children(f.callout, None).iter().map(|e| e.key()).collect();
        assert_eq!(kids, vec![f.inner, f.arrow]);
        assert!(get.is_descendent(f.inner, f.page));
        assert!(get.is_descendent(f.page, f.page));
        assert!(!get.is_descendent(f.page, f.inner));
    }

    #[test]
    fn is_descendent_terminates_on_cycles() {
        let mut f = fixture();
        if let Some(page) = f.state.pages.get_mut(f.page.id) {
            page.parent = Some(f.inner);
        }
        let get = Getters::new(&f.state, &EmptyCatalog);
        let ghost = LookupKey::new(ItemType::Book, ItemId(7));
        assert!(!get.is_descendent(f.inner, ghost));
    }

    #[test]
    fn nested_steps_only_match_siblings() {
        let f = fixture();
        let get = Getters::new(&f.state, &EmptyCatalog);
        // Both steps carry number 1 but live in different scopes.
        assert!(get.next(f.step, None).is_none());
        assert!(get.prev(f.inner, None).is_none());
    }

    #[test]
    fn coordinates_round_trip() {
        let f = fixture();
        let get = Getters::new(&f.state, &EmptyCatalog);
        let on_page = get.item_to_page(f.inner);
        assert_eq!(on_page, Point::new(17.0, 28.0));
        assert!(get.page_to_item(on_page, f.inner).approx_eq(&Point::default(), 1e-9));
        assert_eq!(get.page_to_item(on_page, f.callout), Point::new(2.0, 3.0));
    }

    #[test]
    fn target_box_walks_offsets() {
        let f = fixture();
        let get = Getters::new(&f.state, &EmptyCatalog);
        assert_eq!(get.target_box(f.callout), Some(Rect::new(16.0, 26.0, 50.0, 40.0)));
        assert_eq!(get.highlight_box(f.callout, None), Some(Rect::new(14.0, 24.0, 53.0, 43.0)));
    }

    #[test]
    fn highlight_box_special_cases() {
        let mut f = fixture();
        let pli = f
            .state
            .add_item(Pli::default(), Some(f.step), None, None)
            .expect("pli");
        let item = f
            .state
            .add_item(
                PliItem {
                    x: Some(10.0),
                    y: Some(10.0),
                    width: Some(20.0),
                    height: Some(20.0),
                    ..PliItem::default()
                },
                Some(pli),
                None,
                None,
            )
            .expect("pli item");
        f.state
            .add_item(
                QuantityLabel {
                    x: Some(5.0),
                    y: Some(25.0),
                    width: Some(10.0),
                    height: Some(10.0),
                    ..QuantityLabel::default()
                },
                Some(item),
                None,
                None,
            )
            .expect("quantity label");
        let point = LookupKey::new(ItemType::Point, ItemId(0));

        let get = Getters::new(&f.state, &EmptyCatalog);
        // Item (20, 30, 20, 20) merged with its label (25, 55, 10, 10).
        assert_eq!(get.target_box(item), Some(Rect::new(20.0, 30.0, 20.0, 20.0)));
        assert_eq!(get.highlight_box(item, None), Some(Rect::new(18.0, 28.0, 23.0, 38.0)));
        // First arrow point sits at (15, 25) on the page.
        assert_eq!(get.highlight_box(point, None), Some(Rect::new(11.0, 21.0, 7.0, 7.0)));
        assert_eq!(get.highlight_box(f.page, None), Some(Rect::new(3.0, 3.0, 894.0, 694.0)));
        let ghost = LookupKey::new(ItemType::Divider, ItemId(3));
        assert_eq!(get.highlight_box(ghost, None), None);
    }

    #[test]
    fn highlight_box_shifts_with_stretched_step() {
        let mut f = fixture();
        let other = f
            .state
            .add_item(
                Page {
                    stretched_step: Some(StretchedStep {
                        step_id: f.step.id,
                        left_offset: 100.0,
                    }),
                    ..Page::default()
                },
                None,
                None,
                None,
            )
            .expect("page");
        let get = Getters::new(&f.state, &EmptyCatalog);
        assert_eq!(
            get.highlight_box(f.callout, Some(other.id)),
            Some(Rect::new(114.0, 24.0, 53.0, 43.0))
        );
        assert_eq!(
            get.highlight_box(f.callout, Some(f.page.id)),
            Some(Rect::new(14.0, 24.0, 53.0, 43.0))
        );
    }

    #[test]
    fn arrow_box_comes_from_points() {
        let f = fixture();
        let get = Getters::new(&f.state, &EmptyCatalog);
        // Points sit in the callout's frame: origin (15, 25) on the page.
        assert_eq!(get.target_box(f.arrow), Some(Rect::new(15.0, 21.0, 30.0, 8.0)));
    }

    #[test]
    fn point_list_items_without_points_use_their_own_box() {
        let mut f = fixture();
        let points = f.state.child_ids(f.arrow, ItemType::Point);
        for id in points {
            f.state
                .remove_item(LookupKey::new(ItemType::Point, id))
                .expect("remove point");
        }
        let note = f
            .state
            .add_item(
                Annotation {
                    x: Some(4.0),
                    y: Some(6.0),
                    width: Some(10.0),
                    height: Some(12.0),
                    ..Annotation::default()
                },
                Some(f.page),
                None,
                None,
            )
            .expect("annotation");

        let get = Getters::new(&f.state, &EmptyCatalog);
        assert_eq!(get.target_box(f.arrow), Some(Rect::new(15.0, 25.0, 0.0, 0.0)));
        assert_eq!(get.target_box(note), Some(Rect::new(4.0, 6.0, 10.0, 12.0)));
    }

    #[test]
    fn page_box_is_page_size() {
        let f = fixture();
        let get = Getters::new(&f.state, &EmptyCatalog);
        assert_eq!(get.target_box(f.page), Some(Rect::new(0.0, 0.0, 900.0, 700.0)));
        assert_eq!(get.page_for_item(f.arrow).map(|p| p.id), Some(f.page.id));
        assert_eq!(get.page_count(), 1);
    }
}
