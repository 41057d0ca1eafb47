//! # Item Types
//!
//! The fifteen entity structs held by the registry and the [`Entity`] trait
//! that lets the store treat them uniformly.
//!
//! Each entity declares, at compile time, which child types it owns and
//! whether each link is list-valued ([`ChildLink::List`]) or singular
//! ([`ChildLink::Single`]). The relationship layer in [`crate::relations`]
//! only ever goes through these declarations.
//!
//! Geometry fields are `Option<f64>`: `None` until the layout collaborator
//! has placed the item. Getters treat unset coordinates as zero.

use crate::document::{Collection, DocumentState};
use crate::types::{
    Align, AnnotationKind, ColorCode, Direction, ItemId, ItemType, LookupKey, Orientation,
    PageSubtype, PartId, Point, Rect, Rotation, Side, VAlign,
};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// CHILD LINKS
// =============================================================================

/// Read view of one owned-child field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildLink<'a> {
    /// `xs: Vec<ItemId>`
    List(&'a [ItemId]),
    /// `x_id: Option<ItemId>`
    Single(Option<ItemId>),
}

impl ChildLink<'_> {
    /// Ids currently linked, in order.
    #[must_use]
    pub fn ids(&self) -> Vec<ItemId> {
        match self {
            ChildLink::List(ids) => ids.to_vec(),
            ChildLink::Single(id) => id.iter().copied().collect(),
        }
    }

    /// Number of times `id` appears in this link.
    #[must_use]
    pub fn occurrences(&self, id: ItemId) -> usize {
        match self {
            ChildLink::List(ids) => ids.iter().filter(|x| **x == id).count(),
            ChildLink::Single(x) => usize::from(*x == Some(id)),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            ChildLink::List(ids) => ids.is_empty(),
            ChildLink::Single(id) => id.is_none(),
        }
    }
}

/// Write view of one owned-child field.
#[derive(Debug)]
pub enum ChildLinkMut<'a> {
    List(&'a mut Vec<ItemId>),
    Single(&'a mut Option<ItemId>),
}

impl ChildLinkMut<'_> {
    /// Link `id`. Lists insert at `index` (append when `None` or past the end).
    pub fn attach(self, id: ItemId, index: Option<usize>) {
        match self {
            ChildLinkMut::List(ids) => match index {
                Some(i) if i < ids.len() => ids.insert(i, id),
                _ => ids.push(id),
            },
            ChildLinkMut::Single(slot) => *slot = Some(id),
        }
    }

    /// Unlink `id`. Lists drop the first occurrence; singular fields are
    /// cleared only if they hold `id`. Returns whether anything changed.
    pub fn detach(self, id: ItemId) -> bool {
        match self {
            ChildLinkMut::List(ids) => match ids.iter().position(|x| *x == id) {
                Some(pos) => {
                    ids.remove(pos);
                    true
                }
                None => false,
            },
            ChildLinkMut::Single(slot) => {
                if *slot == Some(id) {
                    *slot = None;
                    true
                } else {
                    false
                }
            }
        }
    }
}

// =============================================================================
// ENTITY TRAIT
// =============================================================================

/// Uniform view over every registry item.
///
/// The trait is object safe so the registry can hand out `&dyn Entity` for
/// a [`LookupKey`] of any type.
pub trait Entity: fmt::Debug {
    fn item_type(&self) -> ItemType;
    fn id(&self) -> ItemId;
    fn set_id(&mut self, id: ItemId);
    fn parent(&self) -> Option<LookupKey>;
    fn set_parent(&mut self, parent: Option<LookupKey>);

    fn key(&self) -> LookupKey {
        LookupKey::new(self.item_type(), self.id())
    }

    /// Owned child types, in declaration order.
    fn child_types(&self) -> &'static [ItemType] {
        &[]
    }

    fn child_link(&self, _child: ItemType) -> Option<ChildLink<'_>> {
        None
    }

    fn child_link_mut(&mut self, _child: ItemType) -> Option<ChildLinkMut<'_>> {
        None
    }

    fn number(&self) -> Option<i64> {
        None
    }

    fn set_number(&mut self, _number: i64) {}

    /// Local position relative to the parent, when the item has one.
    fn origin(&self) -> Option<Point> {
        None
    }

    /// Local box relative to the parent, when the item has geometry.
    fn bounds(&self) -> Option<Rect> {
        None
    }

    /// Shift the local position. Returns `false` for items without one.
    fn translate(&mut self, _delta: Point) -> bool {
        false
    }

    fn inner_content_offset(&self) -> Point {
        Point::default()
    }

    fn border_offset(&self) -> Point {
        Point::default()
    }

    fn alignment(&self) -> (Align, VAlign) {
        (Align::Left, VAlign::Top)
    }

    /// Owned points for arrow-like items whose shape is a point list.
    fn point_ids(&self) -> Option<&[ItemId]> {
        None
    }

    /// Frame a point is expressed in, when it differs from its parent.
    fn relative_to(&self) -> Option<LookupKey> {
        None
    }

    /// Flag the item for the layout or render collaborator.
    fn mark_dirty(&mut self) {}
}

/// Items that live in a typed registry collection.
pub trait Registered: Entity + Clone + Sized {
    const ITEM_TYPE: ItemType;

    fn collection(state: &DocumentState) -> &Collection<Self>;
    fn collection_mut(state: &mut DocumentState) -> &mut Collection<Self>;
}

impl From<&dyn Entity> for LookupKey {
    fn from(item: &dyn Entity) -> Self {
        item.key()
    }
}

// -----------------------------------------------------------------------------
// Boilerplate shared by every entity
// -----------------------------------------------------------------------------

macro_rules! identity {
    ($variant:ident) => {
        fn item_type(&self) -> ItemType {
            ItemType::$variant
        }
        fn id(&self) -> ItemId {
            self.id
        }
        fn set_id(&mut self, id: ItemId) {
            self.id = id;
        }
        fn parent(&self) -> Option<LookupKey> {
            self.parent
        }
        fn set_parent(&mut self, parent: Option<LookupKey>) {
            self.parent = parent;
        }
    };
}

macro_rules! boxed {
    () => {
        fn origin(&self) -> Option<Point> {
            Some(Point::new(self.x.unwrap_or(0.0), self.y.unwrap_or(0.0)))
        }
        fn bounds(&self) -> Option<Rect> {
            Some(Rect::new(
                self.x.unwrap_or(0.0),
                self.y.unwrap_or(0.0),
                self.width.unwrap_or(0.0),
                self.height.unwrap_or(0.0),
            ))
        }
        fn translate(&mut self, delta: Point) -> bool {
            self.x = Some(self.x.unwrap_or(0.0) + delta.x);
            self.y = Some(self.y.unwrap_or(0.0) + delta.y);
            true
        }
    };
}

macro_rules! registered {
    ($ty:ident, $variant:ident, $field:ident) => {
        impl Registered for $ty {
            const ITEM_TYPE: ItemType = ItemType::$variant;

            fn collection(state: &DocumentState) -> &Collection<Self> {
                &state.$field
            }

            fn collection_mut(state: &mut DocumentState) -> &mut Collection<Self> {
                &mut state.$field
            }
        }

        impl From<&$ty> for LookupKey {
            fn from(item: &$ty) -> Self {
                item.key()
            }
        }
    };
}

// =============================================================================
// BOOK
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Book {
    pub id: ItemId,
    pub parent: Option<LookupKey>,
    pub number: i64,
    pub pages: Vec<ItemId>,
}

impl Entity for Book {
    identity!(Book);

    fn child_types(&self) -> &'static [ItemType] {
        &[ItemType::Page]
    }

    fn child_link(&self, child: ItemType) -> Option<ChildLink<'_>> {
        match child {
            ItemType::Page => Some(ChildLink::List(&self.pages)),
            _ => None,
        }
    }

    fn child_link_mut(&mut self, child: ItemType) -> Option<ChildLinkMut<'_>> {
        match child {
            ItemType::Page => Some(ChildLinkMut::List(&mut self.pages)),
            _ => None,
        }
    }

    fn number(&self) -> Option<i64> {
        Some(self.number)
    }

    fn set_number(&mut self, number: i64) {
        self.number = number;
    }
}

registered!(Book, Book, books);

// =============================================================================
// PAGE
// =============================================================================

/// A step stretched across several pages, as recorded on each extra page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StretchedStep {
    #[serde(rename = "stepID")]
    pub step_id: ItemId,
    pub left_offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Page {
    pub id: ItemId,
    pub parent: Option<LookupKey>,
    pub subtype: PageSubtype,
    pub number: i64,
    pub steps: Vec<ItemId>,
    pub dividers: Vec<ItemId>,
    pub annotations: Vec<ItemId>,
    pub pli_items: Vec<ItemId>,
    #[serde(rename = "numberLabelID")]
    pub number_label_id: Option<ItemId>,
    pub inner_content_offset: Point,
    pub layout: Orientation,
    pub locked: bool,
    pub needs_layout: bool,
    pub stretched_step: Option<StretchedStep>,
}

impl Page {
    #[must_use]
    pub fn is_basic(&self) -> bool {
        self.subtype == PageSubtype::Page
    }
}

impl Entity for Page {
    identity!(Page);

    fn child_types(&self) -> &'static [ItemType] {
        &[
            ItemType::NumberLabel,
            ItemType::Step,
            ItemType::Divider,
            ItemType::Annotation,
            ItemType::PliItem,
        ]
    }

    fn child_link(&self, child: ItemType) -> Option<ChildLink<'_>> {
        match child {
            ItemType::NumberLabel => Some(ChildLink::Single(self.number_label_id)),
            ItemType::Step => Some(ChildLink::List(&self.steps)),
            ItemType::Divider => Some(ChildLink::List(&self.dividers)),
            ItemType::Annotation => Some(ChildLink::List(&self.annotations)),
            ItemType::PliItem => Some(ChildLink::List(&self.pli_items)),
            _ => None,
        }
    }

    fn child_link_mut(&mut self, child: ItemType) -> Option<ChildLinkMut<'_>> {
        match child {
            ItemType::NumberLabel => Some(ChildLinkMut::Single(&mut self.number_label_id)),
            ItemType::Step => Some(ChildLinkMut::List(&mut self.steps)),
            ItemType::Divider => Some(ChildLinkMut::List(&mut self.dividers)),
            ItemType::Annotation => Some(ChildLinkMut::List(&mut self.annotations)),
            ItemType::PliItem => Some(ChildLinkMut::List(&mut self.pli_items)),
            _ => None,
        }
    }

    fn number(&self) -> Option<i64> {
        Some(self.number)
    }

    fn set_number(&mut self, number: i64) {
        self.number = number;
    }

    fn inner_content_offset(&self) -> Point {
        self.inner_content_offset
    }

    fn mark_dirty(&mut self) {
        self.needs_layout = true;
    }
}

registered!(Page, Page, pages);

// =============================================================================
// STEP
// =============================================================================

/// Which model file a step draws its parts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct StepModel {
    pub filename: String,
    #[serde(rename = "parentStepID")]
    pub parent_step_id: Option<ItemId>,
}

/// A part drawn pushed away from its final position, with a guide arrow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplacedPart {
    #[serde(rename = "partID")]
    pub part_id: PartId,
    pub direction: Direction,
    pub part_distance: f64,
    pub arrow_offset: f64,
    pub arrow_length: f64,
    pub arrow_rotation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Step {
    pub id: ItemId,
    pub parent: Option<LookupKey>,
    pub number: i64,
    #[serde(rename = "numberLabelID")]
    pub number_label_id: Option<ItemId>,
    #[serde(rename = "csiID")]
    pub csi_id: Option<ItemId>,
    #[serde(rename = "pliID")]
    pub pli_id: Option<ItemId>,
    #[serde(rename = "rotateIconID")]
    pub rotate_icon_id: Option<ItemId>,
    pub callouts: Vec<ItemId>,
    pub steps: Vec<ItemId>,
    pub dividers: Vec<ItemId>,
    pub submodel_images: Vec<ItemId>,
    pub annotations: Vec<ItemId>,
    pub stretched_pages: Vec<ItemId>,
    pub parts: Vec<PartId>,
    pub prev_book_parts: Option<Vec<PartId>>,
    pub displaced_parts: Vec<DisplacedPart>,
    pub model: StepModel,
    pub sub_step_layout: Orientation,
    pub inner_content_offset: Point,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl Entity for Step {
    identity!(Step);
    boxed!();

    fn child_types(&self) -> &'static [ItemType] {
        &[
            ItemType::Csi,
            ItemType::Pli,
            ItemType::NumberLabel,
            ItemType::RotateIcon,
            ItemType::Callout,
            ItemType::Step,
            ItemType::Divider,
            ItemType::SubmodelImage,
            ItemType::Annotation,
        ]
    }

    fn child_link(&self, child: ItemType) -> Option<ChildLink<'_>> {
        match child {
            ItemType::Csi => Some(ChildLink::Single(self.csi_id)),
            ItemType::Pli => Some(ChildLink::Single(self.pli_id)),
            ItemType::NumberLabel => Some(ChildLink::Single(self.number_label_id)),
            ItemType::RotateIcon => Some(ChildLink::Single(self.rotate_icon_id)),
            ItemType::Callout => Some(ChildLink::List(&self.callouts)),
            ItemType::Step => Some(ChildLink::List(&self.steps)),
            ItemType::Divider => Some(ChildLink::List(&self.dividers)),
            ItemType::SubmodelImage => Some(ChildLink::List(&self.submodel_images)),
            ItemType::Annotation => Some(ChildLink::List(&self.annotations)),
            _ => None,
        }
    }

    fn child_link_mut(&mut self, child: ItemType) -> Option<ChildLinkMut<'_>> {
        match child {
            ItemType::Csi => Some(ChildLinkMut::Single(&mut self.csi_id)),
            ItemType::Pli => Some(ChildLinkMut::Single(&mut self.pli_id)),
            ItemType::NumberLabel => Some(ChildLinkMut::Single(&mut self.number_label_id)),
            ItemType::RotateIcon => Some(ChildLinkMut::Single(&mut self.rotate_icon_id)),
            ItemType::Callout => Some(ChildLinkMut::List(&mut self.callouts)),
            ItemType::Step => Some(ChildLinkMut::List(&mut self.steps)),
            ItemType::Divider => Some(ChildLinkMut::List(&mut self.dividers)),
            ItemType::SubmodelImage => Some(ChildLinkMut::List(&mut self.submodel_images)),
            ItemType::Annotation => Some(ChildLinkMut::List(&mut self.annotations)),
            _ => None,
        }
    }

    fn number(&self) -> Option<i64> {
        Some(self.number)
    }

    fn set_number(&mut self, number: i64) {
        self.number = number;
    }

    fn inner_content_offset(&self) -> Point {
        self.inner_content_offset
    }
}

registered!(Step, Step, steps);

// =============================================================================
// CSI (construction step image)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Csi {
    pub id: ItemId,
    pub parent: Option<LookupKey>,
    pub annotations: Vec<ItemId>,
    pub rotation: Option<Vec<Rotation>>,
    pub scale: Option<f64>,
    pub is_dirty: bool,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl Entity for Csi {
    identity!(Csi);
    boxed!();

    fn child_types(&self) -> &'static [ItemType] {
        &[ItemType::Annotation]
    }

    fn child_link(&self, child: ItemType) -> Option<ChildLink<'_>> {
        match child {
            ItemType::Annotation => Some(ChildLink::List(&self.annotations)),
            _ => None,
        }
    }

    fn child_link_mut(&mut self, child: ItemType) -> Option<ChildLinkMut<'_>> {
        match child {
            ItemType::Annotation => Some(ChildLinkMut::List(&mut self.annotations)),
            _ => None,
        }
    }

    fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }
}

registered!(Csi, Csi, csis);

// =============================================================================
// PLI (part list) and PLI ITEM
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Pli {
    pub id: ItemId,
    pub parent: Option<LookupKey>,
    pub pli_items: Vec<ItemId>,
    pub inner_content_offset: Point,
    pub border_offset: Point,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl Entity for Pli {
    identity!(Pli);
    boxed!();

    fn child_types(&self) -> &'static [ItemType] {
        &[ItemType::PliItem]
    }

    fn child_link(&self, child: ItemType) -> Option<ChildLink<'_>> {
        match child {
            ItemType::PliItem => Some(ChildLink::List(&self.pli_items)),
            _ => None,
        }
    }

    fn child_link_mut(&mut self, child: ItemType) -> Option<ChildLinkMut<'_>> {
        match child {
            ItemType::PliItem => Some(ChildLinkMut::List(&mut self.pli_items)),
            _ => None,
        }
    }

    fn inner_content_offset(&self) -> Point {
        self.inner_content_offset
    }

    fn border_offset(&self) -> Point {
        self.border_offset
    }
}

registered!(Pli, Pli, plis);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PliItem {
    pub id: ItemId,
    pub parent: Option<LookupKey>,
    pub filename: String,
    pub color_code: ColorCode,
    pub quantity: u32,
    #[serde(rename = "quantityLabelID")]
    pub quantity_label_id: Option<ItemId>,
    pub is_dirty: bool,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl Entity for PliItem {
    identity!(PliItem);
    boxed!();

    fn child_types(&self) -> &'static [ItemType] {
        &[ItemType::QuantityLabel]
    }

    fn child_link(&self, child: ItemType) -> Option<ChildLink<'_>> {
        match child {
            ItemType::QuantityLabel => Some(ChildLink::Single(self.quantity_label_id)),
            _ => None,
        }
    }

    fn child_link_mut(&mut self, child: ItemType) -> Option<ChildLinkMut<'_>> {
        match child {
            ItemType::QuantityLabel => Some(ChildLinkMut::Single(&mut self.quantity_label_id)),
            _ => None,
        }
    }

    fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }
}

registered!(PliItem, PliItem, pli_items);

// =============================================================================
// CALLOUT and CALLOUT ARROW
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Callout {
    pub id: ItemId,
    pub parent: Option<LookupKey>,
    pub steps: Vec<ItemId>,
    pub callout_arrows: Vec<ItemId>,
    pub inner_content_offset: Point,
    pub border_offset: Point,
    pub layout: Orientation,
    pub position: Side,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl Entity for Callout {
    identity!(Callout);
    boxed!();

    fn child_types(&self) -> &'static [ItemType] {
        &[ItemType::Step, ItemType::CalloutArrow]
    }

    fn child_link(&self, child: ItemType) -> Option<ChildLink<'_>> {
        match child {
            ItemType::Step => Some(ChildLink::List(&self.steps)),
            ItemType::CalloutArrow => Some(ChildLink::List(&self.callout_arrows)),
            _ => None,
        }
    }

    fn child_link_mut(&mut self, child: ItemType) -> Option<ChildLinkMut<'_>> {
        match child {
            ItemType::Step => Some(ChildLinkMut::List(&mut self.steps)),
            ItemType::CalloutArrow => Some(ChildLinkMut::List(&mut self.callout_arrows)),
            _ => None,
        }
    }

    fn inner_content_offset(&self) -> Point {
        self.inner_content_offset
    }

    fn border_offset(&self) -> Point {
        self.border_offset
    }
}

registered!(Callout, Callout, callouts);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CalloutArrow {
    pub id: ItemId,
    pub parent: Option<LookupKey>,
    pub points: Vec<ItemId>,
    pub direction: Direction,
}

impl Entity for CalloutArrow {
    identity!(CalloutArrow);

    fn child_types(&self) -> &'static [ItemType] {
        &[ItemType::Point]
    }

    fn child_link(&self, child: ItemType) -> Option<ChildLink<'_>> {
        match child {
            ItemType::Point => Some(ChildLink::List(&self.points)),
            _ => None,
        }
    }

    fn child_link_mut(&mut self, child: ItemType) -> Option<ChildLinkMut<'_>> {
        match child {
            ItemType::Point => Some(ChildLinkMut::List(&mut self.points)),
            _ => None,
        }
    }

    fn point_ids(&self) -> Option<&[ItemId]> {
        Some(&self.points)
    }
}

registered!(CalloutArrow, CalloutArrow, callout_arrows);

// =============================================================================
// ANNOTATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Annotation {
    pub id: ItemId,
    pub parent: Option<LookupKey>,
    pub annotation_type: AnnotationKind,
    pub text: Option<String>,
    pub color: Option<String>,
    pub font: Option<String>,
    pub src: Option<String>,
    pub direction: Option<Direction>,
    pub points: Vec<ItemId>,
    pub align: Align,
    pub valign: VAlign,
    /// Marks generated annotations, e.g. `"titlePageModelName"`.
    pub meta: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl Entity for Annotation {
    identity!(Annotation);
    boxed!();

    fn child_types(&self) -> &'static [ItemType] {
        &[ItemType::Point]
    }

    fn child_link(&self, child: ItemType) -> Option<ChildLink<'_>> {
        match child {
            ItemType::Point => Some(ChildLink::List(&self.points)),
            _ => None,
        }
    }

    fn child_link_mut(&mut self, child: ItemType) -> Option<ChildLinkMut<'_>> {
        match child {
            ItemType::Point => Some(ChildLinkMut::List(&mut self.points)),
            _ => None,
        }
    }

    fn alignment(&self) -> (Align, VAlign) {
        (self.align, self.valign)
    }

    fn point_ids(&self) -> Option<&[ItemId]> {
        (!self.points.is_empty()).then_some(self.points.as_slice())
    }
}

registered!(Annotation, Annotation, annotations);

// =============================================================================
// DIVIDER and POINT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Divider {
    pub id: ItemId,
    pub parent: Option<LookupKey>,
    pub p1: Point,
    pub p2: Point,
}

impl Entity for Divider {
    identity!(Divider);

    fn origin(&self) -> Option<Point> {
        Some(Point::new(self.p1.x.min(self.p2.x), self.p1.y.min(self.p2.y)))
    }

    fn bounds(&self) -> Option<Rect> {
        crate::types::geometry::bbox(&[self.p1, self.p2])
    }

    fn translate(&mut self, delta: Point) -> bool {
        self.p1 = self.p1 + delta;
        self.p2 = self.p2 + delta;
        true
    }
}

registered!(Divider, Divider, dividers);

/// A point owned by an arrow-like item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PointItem {
    pub id: ItemId,
    pub parent: Option<LookupKey>,
    pub x: f64,
    pub y: f64,
    pub relative_to: Option<LookupKey>,
}

impl Entity for PointItem {
    identity!(Point);

    fn origin(&self) -> Option<Point> {
        Some(Point::new(self.x, self.y))
    }

    fn bounds(&self) -> Option<Rect> {
        Some(Rect::new(self.x, self.y, 0.0, 0.0))
    }

    fn translate(&mut self, delta: Point) -> bool {
        self.x += delta.x;
        self.y += delta.y;
        true
    }

    fn relative_to(&self) -> Option<LookupKey> {
        self.relative_to
    }
}

registered!(PointItem, Point, points);

// =============================================================================
// LABELS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NumberLabel {
    pub id: ItemId,
    pub parent: Option<LookupKey>,
    pub align: Align,
    pub valign: VAlign,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl Entity for NumberLabel {
    identity!(NumberLabel);
    boxed!();

    fn alignment(&self) -> (Align, VAlign) {
        (self.align, self.valign)
    }
}

registered!(NumberLabel, NumberLabel, number_labels);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct QuantityLabel {
    pub id: ItemId,
    pub parent: Option<LookupKey>,
    pub align: Align,
    pub valign: VAlign,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl Entity for QuantityLabel {
    identity!(QuantityLabel);
    boxed!();

    fn alignment(&self) -> (Align, VAlign) {
        (self.align, self.valign)
    }
}

registered!(QuantityLabel, QuantityLabel, quantity_labels);

// =============================================================================
// SUBMODEL IMAGE and ROTATE ICON
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmodelImage {
    pub id: ItemId,
    pub parent: Option<LookupKey>,
    #[serde(rename = "csiID")]
    pub csi_id: Option<ItemId>,
    #[serde(rename = "quantityLabelID")]
    pub quantity_label_id: Option<ItemId>,
    pub model_filename: String,
    pub quantity: u32,
    pub inner_content_offset: Point,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl Entity for SubmodelImage {
    identity!(SubmodelImage);
    boxed!();

    fn child_types(&self) -> &'static [ItemType] {
        &[ItemType::Csi, ItemType::QuantityLabel]
    }

    fn child_link(&self, child: ItemType) -> Option<ChildLink<'_>> {
        match child {
            ItemType::Csi => Some(ChildLink::Single(self.csi_id)),
            ItemType::QuantityLabel => Some(ChildLink::Single(self.quantity_label_id)),
            _ => None,
        }
    }

    fn child_link_mut(&mut self, child: ItemType) -> Option<ChildLinkMut<'_>> {
        match child {
            ItemType::Csi => Some(ChildLinkMut::Single(&mut self.csi_id)),
            ItemType::QuantityLabel => Some(ChildLinkMut::Single(&mut self.quantity_label_id)),
            _ => None,
        }
    }

    fn inner_content_offset(&self) -> Point {
        self.inner_content_offset
    }
}

registered!(SubmodelImage, SubmodelImage, submodel_images);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RotateIcon {
    pub id: ItemId,
    pub parent: Option<LookupKey>,
    pub scale: f64,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl Default for RotateIcon {
    fn default() -> Self {
        Self {
            id: ItemId::default(),
            parent: None,
            scale: 1.0,
            x: None,
            y: None,
            width: None,
            height: None,
        }
    }
}

impl Entity for RotateIcon {
    identity!(RotateIcon);
    boxed!();
}

registered!(RotateIcon, RotateIcon, rotate_icons);

// =============================================================================
// TESTS
// =============================================================================
