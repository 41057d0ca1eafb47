//! # folio-core
//!
//! The document store behind an instruction-book editor.
//!
//! A document is a typed tree of items (pages, steps, part lists, callouts,
//! annotations, ...) held in one ordered registry per type. Items point at
//! each other only through `{type, id}` lookup keys, which keeps every
//! snapshot a plain value: cloning the state is enough to undo.
//!
//! ## Layers
//!
//! - `document` / `items` / `relations`: registry and the two-way
//!   parent/child links.
//! - `getters`: read-only queries, coordinate conversion and boxes.
//! - `mutations`: structural edits, one engine per item type, plus the
//!   serializable [`Mutation`] command.
//! - `undo`: linear snapshot history.
//! - `formats`: JSON save file with backward compatibility, binary snapshot.
//! - `integrity` / `metrics`: audits and summaries.
//!
//! ## Architectural Constraints
//!
//! - Single writer: operations run to completion on the calling thread.
//! - A rejected mutation leaves the state unchanged.
//! - No async, no network, no filesystem access.

// =============================================================================
// MODULES
// =============================================================================

pub mod catalog;
pub mod document;
pub mod formats;
pub mod getters;
pub mod integrity;
pub mod items;
pub mod metrics;
pub mod mutations;
pub mod relations;
pub mod store;
pub mod types;
pub mod undo;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    Align, AnnotationKind, Axis, ColorCode, Direction, FolioError, ItemId, ItemType, LookupKey,
    Orientation, PageSubtype, PartId, PartRef, PliTransform, Point, Rect, Rotation, Side, VAlign,
};

// =============================================================================
// RE-EXPORTS: Document
// =============================================================================

pub use document::{
    Collection, DocumentState, FirstPageNumbering, PageSize, SceneRendering, Template,
};
pub use items::{
    Annotation, Book, Callout, CalloutArrow, Csi, DisplacedPart, Divider, Entity, NumberLabel,
    Page, Pli, PliItem, PointItem, QuantityLabel, Registered, RotateIcon, Step, StepModel,
    SubmodelImage,
};

// =============================================================================
// RE-EXPORTS: Store & Engines
// =============================================================================

pub use catalog::{EmptyCatalog, ModelCatalog, ModelDef, PartCatalog};
pub use getters::{Getters, SubmodelUsage};
pub use mutations::{Mutation, renumber};
pub use store::{BoundingBoxHook, Store};
pub use undo::{CacheTarget, UndoStack};

// =============================================================================
// RE-EXPORTS: Formats & Audits
// =============================================================================

pub use formats::persistence::{
    MAX_PERSISTENCE_PAYLOAD_SIZE, PersistenceHeader, state_from_bytes, state_to_bytes,
};
pub use formats::save_file::SaveFile;
pub use formats::{checksum, compat};
pub use integrity::{Violation, check};
pub use metrics::DocumentMetrics;
