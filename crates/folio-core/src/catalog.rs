//! # Part Catalog
//!
//! Interface to the part library that parsed the source model. The store
//! never parses model files itself; mutations that need to know which part
//! an id refers to, or how a model was split into steps, ask the catalog.

use crate::types::{PartId, PartRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Read-only view of the loaded model library.
pub trait PartCatalog: fmt::Debug + Send + Sync {
    /// Filename of the top-level model, if one is loaded.
    fn main_model(&self) -> Option<&str>;

    /// Part `part_id` of `model`.
    fn part(&self, model: &str, part_id: PartId) -> Option<PartRef>;

    /// Whether `filename` names a submodel rather than a library part.
    fn is_submodel(&self, filename: &str) -> bool;

    /// Every part of `model`, in file order.
    fn model_parts(&self, model: &str) -> Vec<PartRef>;

    /// Authored step split of `model`, when the file carries one.
    fn model_steps(&self, model: &str) -> Option<Vec<Vec<PartId>>> {
        let _ = model;
        None
    }

    /// Number of library parts in `model`, counting submodel contents.
    fn part_count(&self, model: &str) -> usize {
        self.part_count_bounded(model, 0)
    }

    /// How many times `model` directly contains `submodel`.
    fn submodel_count(&self, model: &str, submodel: &str) -> usize {
        self.model_parts(model)
            .iter()
            .filter(|p| p.filename == submodel)
            .count()
    }

    #[doc(hidden)]
    fn part_count_bounded(&self, model: &str, depth: usize) -> usize {
        if depth > MAX_SUBMODEL_DEPTH {
            return 0;
        }
        self.model_parts(model)
            .iter()
            .map(|p| {
                if self.is_submodel(&p.filename) {
                    self.part_count_bounded(&p.filename, depth + 1)
                } else {
                    1
                }
            })
            .sum()
    }
}

/// Submodel nesting deeper than this is treated as a cycle.
pub const MAX_SUBMODEL_DEPTH: usize = 32;

// =============================================================================
// EMPTY CATALOG
// =============================================================================

/// Catalog with no models. Part-aware mutations become no-ops against it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCatalog;

impl PartCatalog for EmptyCatalog {
    fn main_model(&self) -> Option<&str> {
        None
    }

    fn part(&self, _model: &str, _part_id: PartId) -> Option<PartRef> {
        None
    }

    fn is_submodel(&self, _filename: &str) -> bool {
        false
    }

    fn model_parts(&self, _model: &str) -> Vec<PartRef> {
        Vec::new()
    }
}

// =============================================================================
// IN-MEMORY CATALOG
// =============================================================================

/// One model: its parts and, optionally, the step split authored in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ModelDef {
    pub parts: Vec<PartRef>,
    pub steps: Option<Vec<Vec<PartId>>>,
}

/// Catalog built from plain data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ModelCatalog {
    pub main: Option<String>,
    pub models: BTreeMap<String, ModelDef>,
}

impl ModelCatalog {
    #[must_use]
    pub fn new(main: impl Into<String>) -> Self {
        Self {
            main: Some(main.into()),
            models: BTreeMap::new(),
        }
    }

    /// Add or replace a model definition.
    #[must_use]
    pub fn with_model(mut self, filename: impl Into<String>, def: ModelDef) -> Self {
        self.models.insert(filename.into(), def);
        self
    }
}

impl PartCatalog for ModelCatalog {
    fn main_model(&self) -> Option<&str> {
        self.main.as_deref()
    }

    fn part(&self, model: &str, part_id: PartId) -> Option<PartRef> {
        self.models
            .get(model)
            .and_then(|m| m.parts.get(part_id as usize))
            .cloned()
    }

    fn is_submodel(&self, filename: &str) -> bool {
        self.models.contains_key(filename)
    }

    fn model_parts(&self, model: &str) -> Vec<PartRef> {
        self.models
            .get(model)
            .map(|m| m.parts.clone())
            .unwrap_or_default()
    }

    fn model_steps(&self, model: &str) -> Option<Vec<Vec<PartId>>> {
        self.models.get(model).and_then(|m| m.steps.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ModelCatalog {
        ModelCatalog::new("main.ldr")
            .with_model(
                "main.ldr",
                ModelDef {
                    parts: vec![
                        PartRef::new("3001.dat", 4),
                        PartRef::new("wheel.ldr", 0),
                        PartRef::new("wheel.ldr", 0),
                    ],
                    steps: Some(vec![vec![0], vec![1, 2]]),
                },
            )
            .with_model(
                "wheel.ldr",
                ModelDef {
                    parts: vec![PartRef::new("tyre.dat", 0), PartRef::new("rim.dat", 15)],
                    steps: None,
                },
            )
    }

    #[test]
    fn part_count_recurses_into_submodels() {
        let cat = catalog();
        assert_eq!(cat.part_count("main.ldr"), 5);
        assert_eq!(cat.submodel_count("main.ldr", "wheel.ldr"), 2);
    }

    #[test]
    fn lookups() {
        let cat = catalog();
        assert_eq!(cat.part("main.ldr", 0), Some(PartRef::new("3001.dat", 4)));
        assert_eq!(cat.part("main.ldr", 9), None);
        assert!(cat.is_submodel("wheel.ldr"));
        assert!(!cat.is_submodel("3001.dat"));
        assert_eq!(cat.model_steps("main.ldr").map(|s| s.len()), Some(2));
        assert_eq!(EmptyCatalog.part_count("main.ldr"), 0);
    }

    #[test]
    fn self_referencing_model_terminates() {
        let cat = ModelCatalog::new("loop.ldr").with_model(
            "loop.ldr",
            ModelDef {
                parts: vec![PartRef::new("loop.ldr", 0)],
                steps: None,
            },
        );
        assert_eq!(cat.part_count("loop.ldr"), 0);
    }
}
