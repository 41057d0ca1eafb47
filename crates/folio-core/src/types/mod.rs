//! # Core Type Definitions
//!
//! Identifiers, lookup keys, the closed set of item types, small attribute
//! enums shared by several entities, and the crate error type.
//!
//! Entities never hold references to each other. Every link is a
//! [`LookupKey`] resolved through the registry at read time, which keeps
//! the whole document state trivially cloneable for undo snapshots.

pub mod geometry;

pub use geometry::{Point, Rect};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of an item, unique within its [`ItemType`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl ItemId {
    /// Get the raw id value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ItemId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Index of a part inside a model file, as reported by the part catalog.
pub type PartId = u32;

/// Part color code as used by the part library.
pub type ColorCode = i32;

// =============================================================================
// ITEM TYPES
// =============================================================================

/// The closed set of entity types held by the registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum ItemType {
    Annotation,
    Book,
    Callout,
    CalloutArrow,
    Csi,
    Divider,
    NumberLabel,
    Page,
    Pli,
    PliItem,
    Point,
    QuantityLabel,
    RotateIcon,
    Step,
    SubmodelImage,
}

impl ItemType {
    /// Every item type, in registry order.
    pub const ALL: [ItemType; 15] = [
        ItemType::Annotation,
        ItemType::Book,
        ItemType::Callout,
        ItemType::CalloutArrow,
        ItemType::Csi,
        ItemType::Divider,
        ItemType::NumberLabel,
        ItemType::Page,
        ItemType::Pli,
        ItemType::PliItem,
        ItemType::Point,
        ItemType::QuantityLabel,
        ItemType::RotateIcon,
        ItemType::Step,
        ItemType::SubmodelImage,
    ];

    /// Display order used when listing an item's children without a filter.
    /// `Pli` is appended separately when part lists are visible.
    pub const DISPLAY_ORDER: [ItemType; 12] = [
        ItemType::Page,
        ItemType::NumberLabel,
        ItemType::Divider,
        ItemType::Annotation,
        ItemType::Callout,
        ItemType::Csi,
        ItemType::PliItem,
        ItemType::QuantityLabel,
        ItemType::RotateIcon,
        ItemType::Step,
        ItemType::SubmodelImage,
        ItemType::CalloutArrow,
    ];

    /// Wire name of this type, e.g. `"pliItem"`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Annotation => "annotation",
            ItemType::Book => "book",
            ItemType::Callout => "callout",
            ItemType::CalloutArrow => "calloutArrow",
            ItemType::Csi => "csi",
            ItemType::Divider => "divider",
            ItemType::NumberLabel => "numberLabel",
            ItemType::Page => "page",
            ItemType::Pli => "pli",
            ItemType::PliItem => "pliItem",
            ItemType::Point => "point",
            ItemType::QuantityLabel => "quantityLabel",
            ItemType::RotateIcon => "rotateIcon",
            ItemType::Step => "step",
            ItemType::SubmodelImage => "submodelImage",
        }
    }

    /// Whether items of this type may live without a parent.
    #[must_use]
    pub fn is_root_type(&self) -> bool {
        matches!(self, ItemType::Page | ItemType::Book)
    }

    /// Whether items of this type carry a serial number.
    #[must_use]
    pub fn is_numbered(&self) -> bool {
        matches!(self, ItemType::Page | ItemType::Step | ItemType::Book)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FolioError::InvalidArgument(format!("unknown item type '{s}'")))
    }
}

// =============================================================================
// LOOKUP KEY
// =============================================================================

/// A `{type, id}` pair: the store's only form of pointer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LookupKey {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub id: ItemId,
}

impl LookupKey {
    /// Create a new lookup key.
    #[must_use]
    pub const fn new(item_type: ItemType, id: ItemId) -> Self {
        Self { item_type, id }
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.item_type, self.id)
    }
}

// =============================================================================
// PART REFERENCES
// =============================================================================

/// A part as the catalog describes it: which file, in which color.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartRef {
    pub filename: String,
    pub color_code: ColorCode,
}

impl PartRef {
    #[must_use]
    pub fn new(filename: impl Into<String>, color_code: ColorCode) -> Self {
        Self {
            filename: filename.into(),
            color_code,
        }
    }
}

// =============================================================================
// ATTRIBUTE ENUMS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PageSubtype {
    #[default]
    Page,
    TemplatePage,
    TitlePage,
    InventoryPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
}

/// Compass direction for arrows and displaced parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    #[default]
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Next direction clockwise.
    #[must_use]
    pub fn rotated(self) -> Self {
        match self {
            Direction::Up => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
        }
    }
}

/// Side of a step a callout is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    #[default]
    Left,
    Bottom,
    Right,
    Top,
}

impl Side {
    /// Preferred order when picking a free side for a new callout.
    pub const PREFERENCE: [Side; 4] = [Side::Left, Side::Bottom, Side::Right, Side::Top];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum VAlign {
    #[default]
    Top,
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationKind {
    #[default]
    Label,
    Arrow,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Axis {
    X,
    Y,
    Z,
}

/// A single rotation around one axis, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub axis: Axis,
    pub angle: f64,
}

impl Rotation {
    #[must_use]
    pub const fn new(axis: Axis, angle: f64) -> Self {
        Self { axis, angle }
    }
}

/// Per-part rendering override in part lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PliTransform {
    pub rotation: Option<Vec<Rotation>>,
    pub scale: Option<f64>,
}

impl PliTransform {
    /// True when the transform no longer changes anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rotation.is_none() && self.scale.is_none()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors returned by the store.
///
/// `NotFound`, `HasChildren` and `MissingParent` signal caller bugs: the
/// operation was rejected before any write, so the state is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FolioError {
    #[error("Item not found: {0}")]
    NotFound(LookupKey),

    #[error("Cannot delete {item}: it still owns {child_type} children")]
    HasChildren { item: LookupKey, child_type: ItemType },

    #[error("Cannot add {item_type}: parent {parent} does not exist")]
    MissingParent { item_type: ItemType, parent: LookupKey },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown mutation: {0}")]
    UnknownMutation(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        FolioError::DeserializationError(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
