//! Document-wide operations: render settings, part list overrides and the
//! first build of pages from a freshly loaded model.

use super::csi::CsiMutations;
use super::page::{AddPage, DeletePage, PageMutations, PageNumber};
use super::pli_item::{MarkPliItemsDirty, PliItemMutations};
use super::step::{AddStep, StepMutations, StepPart, StepRef};
use super::submodel_image::{AddSubmodelImage, SubmodelImageMutations};
use crate::catalog::MAX_SUBMODEL_DEPTH;
use crate::items::StepModel;
use crate::store::Store;
use crate::types::{FolioError, ItemId, ItemType, LookupKey, PartId, Rotation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Parts per generated step when the model carries no step split.
pub const DEFAULT_PARTS_PER_STEP: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSceneRendering {
    pub zoom: f64,
    pub edge_width: f64,
    #[serde(default)]
    pub rotation: Vec<Rotation>,
    /// Also flag every csi, pli item and page for redraw.
    #[serde(default)]
    pub refresh: bool,
}

/// Override how one part file is drawn in part lists. `None` leaves that
/// half of the transform untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPliTransform {
    pub filename: String,
    #[serde(default)]
    pub rotation: Option<Vec<Rotation>>,
    #[serde(default)]
    pub scale: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AddInitialPages {
    /// Defaults to the catalog's main model.
    pub model_filename: Option<String>,
    /// Number given to the first generated step. Defaults to 1.
    pub last_step_number: Option<i64>,
    pub parts_per_step: Option<usize>,
}

/// Walk state shared by the recursive page build.
struct InitialPages {
    next_step_number: i64,
    parts_per_step: usize,
    auto_stepped: bool,
    built: BTreeSet<String>,
}

pub struct DocumentMutations;

impl DocumentMutations {
    pub fn set_scene_rendering(store: &mut Store, opts: &SetSceneRendering) {
        let rendering = &mut store.state_mut().template.scene_rendering;
        rendering.zoom = opts.zoom;
        rendering.edge_width = opts.edge_width;
        rendering.rotation.clone_from(&opts.rotation);
        if opts.refresh {
            Self::refresh_all(store);
        }
    }

    /// Flag everything rendered for the render and layout collaborators.
    pub fn refresh_all(store: &mut Store) {
        CsiMutations::mark_all_dirty(store);
        PliItemMutations::mark_all_dirty(store, &MarkPliItemsDirty::default());
        PageMutations::mark_all_dirty(store);
    }

    /// Zero-angle rotations and a scale of 0 or 1 carry no information and
    /// are dropped. An override left empty is removed.
    pub fn set_pli_transform(store: &mut Store, opts: &SetPliTransform) {
        let transforms = &mut store.state_mut().pli_transforms;
        let transform = transforms.entry(opts.filename.clone()).or_default();
        if let Some(rotation) = &opts.rotation {
            let kept: Vec<Rotation> = rotation.iter().copied().filter(|r| r.angle != 0.0).collect();
            transform.rotation = if kept.is_empty() { None } else { Some(kept) };
        }
        if let Some(scale) = opts.scale {
            transform.scale = if scale == 0.0 || scale == 1.0 { None } else { Some(scale) };
        }
        if transform.is_empty() {
            transforms.remove(&opts.filename);
        }
        PliItemMutations::mark_all_dirty(
            store,
            &MarkPliItemsDirty {
                filename: Some(opts.filename.clone()),
            },
        );
    }

    // =========================================================================
    // INITIAL BUILD
    // =========================================================================

    /// Build one page with one step per model step.
    ///
    /// Submodels used in a step get their own pages first, and their steps
    /// point back at the step that consumes them. A model without an authored
    /// split gets one step per part when any of its submodels is split, and
    /// chunks of `parts_per_step` otherwise. Only the main model is chunked,
    /// unless chunking the main model was needed too. Returns the new page
    /// ids of `model_filename` itself.
    pub fn add_initial_pages(store: &mut Store, opts: &AddInitialPages) -> Result<Vec<ItemId>, FolioError> {
        let Some(model) = opts
            .model_filename
            .clone()
            .or_else(|| store.catalog().main_model().map(str::to_owned))
        else {
            debug!("initial pages requested without a model");
            return Ok(Vec::new());
        };
        let mut walk = InitialPages {
            next_step_number: opts.last_step_number.unwrap_or(1),
            parts_per_step: opts.parts_per_step.unwrap_or(DEFAULT_PARTS_PER_STEP).max(1),
            auto_stepped: false,
            built: BTreeSet::new(),
        };
        let pages = Self::add_model_pages(store, &model, &mut walk, 0)?;
        info!(model = %model, pages = store.state().pages.len(), "initial pages built");
        Ok(pages)
    }

    fn model_steps(store: &Store, model: &str, walk: &mut InitialPages) -> Vec<Vec<PartId>> {
        let catalog = store.catalog();
        if let Some(steps) = catalog.model_steps(model) {
            return steps;
        }
        let parts = catalog.model_parts(model);
        let split_submodel = parts.iter().any(|p| {
            catalog.is_submodel(&p.filename) && catalog.model_steps(&p.filename).is_some_and(|s| !s.is_empty())
        });
        let ids = (0..parts.len()).filter_map(|i| PartId::try_from(i).ok());
        if split_submodel {
            return ids.map(|id| vec![id]).collect();
        }
        let is_main = catalog.main_model() == Some(model);
        if !is_main && !walk.auto_stepped {
            return Vec::new();
        }
        if is_main {
            walk.auto_stepped = true;
        }
        let ids: Vec<PartId> = ids.collect();
        ids.chunks(walk.parts_per_step).map(<[PartId]>::to_vec).collect()
    }

    fn add_model_pages(
        store: &mut Store,
        model: &str,
        walk: &mut InitialPages,
        depth: usize,
    ) -> Result<Vec<ItemId>, FolioError> {
        if depth > MAX_SUBMODEL_DEPTH || !walk.built.insert(model.to_owned()) {
            return Ok(Vec::new());
        }
        let steps = Self::model_steps(store, model, walk);
        let mut pages = Vec::with_capacity(steps.len());

        for parts in steps {
            let mut submodels: Vec<String> = Vec::new();
            for part in parts.iter().filter_map(|id| store.catalog().part(model, *id)) {
                if store.catalog().is_submodel(&part.filename) && !submodels.contains(&part.filename) {
                    submodels.push(part.filename);
                }
            }
            let mut submodel_pages = Vec::new();
            for submodel in &submodels {
                submodel_pages.extend(Self::add_model_pages(store, submodel, walk, depth + 1)?);
            }

            let page = PageMutations::add(
                store,
                &AddPage {
                    page_number: Some(PageNumber::Id),
                    ..AddPage::default()
                },
            )?;
            pages.push(page.id);
            let step = StepMutations::add(
                store,
                &AddStep {
                    model: Some(StepModel {
                        filename: model.to_owned(),
                        parent_step_id: None,
                    }),
                    step_number: Some(walk.next_step_number),
                    ..AddStep::new(page)
                },
            )?;
            walk.next_step_number += 1;

            for page_id in submodel_pages {
                let first = store.state().pages.get(page_id).and_then(|p| p.steps.first().copied());
                if let Some(sub_step) = first.and_then(|id| store.state_mut().steps.get_mut(id)) {
                    sub_step.model.parent_step_id = Some(step.id);
                }
            }
            for part_id in parts {
                StepMutations::add_part(store, &StepPart { step: step.id, part_id })?;
            }
        }
        Ok(pages)
    }

    /// Put a "build this first" image on the first step of each submodel.
    pub fn add_initial_submodel_images(store: &mut Store) -> Result<Vec<LookupKey>, FolioError> {
        let usages = store.get().submodels();
        let mut added = Vec::with_capacity(usages.len());
        for usage in usages {
            let get = store.get();
            let Some(step) = get
                .basic_pages()
                .into_iter()
                .flat_map(|page| page.steps.iter().copied())
                .find(|id| get.step(*id).is_some_and(|s| s.model.filename == usage.filename))
            else {
                debug!(model = %usage.filename, "submodel without steps gets no image");
                continue;
            };
            let image = SubmodelImageMutations::add(
                store,
                &AddSubmodelImage {
                    parent: step,
                    model_filename: usage.filename.clone(),
                    quantity: u32::try_from(usage.quantity).ok(),
                },
            )?;
            added.push(image);
        }
        Ok(added)
    }

    /// Pack the one-step pages of a fresh build onto fewer pages.
    ///
    /// Consecutive page-level steps of one model form a run. Every step in a
    /// run but the first moves onto the previous page. `fits` is asked
    /// whether that page can hold it. If so the emptied page is deleted,
    /// otherwise the step moves back and starts filling its own page.
    /// Returns how many pages were removed.
    pub fn merge_initial_pages<F>(store: &mut Store, mut fits: F) -> Result<usize, FolioError>
    where
        F: FnMut(&Store, ItemId) -> bool,
    {
        let get = store.get();
        let mut runs: Vec<Vec<ItemId>> = Vec::new();
        let mut prev_model: Option<&str> = None;
        for step in get
            .basic_pages()
            .into_iter()
            .flat_map(|page| page.steps.iter().filter_map(|id| get.step(*id)))
        {
            match runs.last_mut() {
                Some(run) if prev_model == Some(step.model.filename.as_str()) => run.push(step.id),
                _ => runs.push(vec![step.id]),
            }
            prev_model = Some(step.model.filename.as_str());
        }

        let mut removed = 0;
        for step in runs.into_iter().flat_map(|run| run.into_iter().skip(1)) {
            let get = store.get();
            let key = LookupKey::new(ItemType::Step, step);
            let Some(origin) = get.page_for_item(key).map(|p| p.id) else {
                continue;
            };
            let Some(dest) = get.prev_basic_page(origin).map(|p| p.id) else {
                continue;
            };
            StepMutations::move_to_previous_page(store, &StepRef { step })?;
            if !fits(&*store, dest) {
                StepMutations::move_to_next_page(store, &StepRef { step })?;
                continue;
            }
            if store.state().pages.get(origin).is_some_and(|p| p.steps.is_empty()) {
                PageMutations::delete(
                    store,
                    &DeletePage {
                        page: origin,
                        delete_steps: false,
                        do_not_renumber: false,
                    },
                )?;
                removed += 1;
            }
            debug!(step = %key, page = %LookupKey::new(ItemType::Page, dest), "step merged");
        }
        info!(removed, "initial pages merged");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ModelCatalog, ModelDef};
    use crate::types::{Axis, PartRef};
    use std::sync::Arc;

    fn car() -> ModelCatalog {
        ModelCatalog::new("car.ldr")
            .with_model(
                "car.ldr",
                ModelDef {
                    parts: vec![
                        PartRef::new("3001.dat", 4),
                        PartRef::new("wheel.ldr", 0),
                        PartRef::new("wheel.ldr", 0),
                    ],
                    steps: None,
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
    fn pli_transform_drops_neutral_values() {
        let mut store = Store::new();
        DocumentMutations::set_pli_transform(
            &mut store,
            &SetPliTransform {
                filename: "3001.dat".into(),
                rotation: Some(vec![Rotation::new(Axis::X, 0.0), Rotation::new(Axis::Y, 90.0)]),
                scale: Some(1.0),
            },
        );
        let transform = store.get().pli_transform("3001.dat").cloned().expect("transform");
        assert_eq!(transform.rotation, Some(vec![Rotation::new(Axis::Y, 90.0)]));
        assert_eq!(transform.scale, None);

        DocumentMutations::set_pli_transform(
            &mut store,
            &SetPliTransform {
                filename: "3001.dat".into(),
                rotation: Some(Vec::new()),
                scale: None,
            },
        );
        assert!(store.state().pli_transforms.is_empty());
    }

    #[test]
    fn scene_rendering_refresh_marks_everything() {
        let mut store = Store::new().with_catalog(Arc::new(car()));
        DocumentMutations::add_initial_pages(&mut store, &AddInitialPages::default()).expect("pages");
        for csi in store.state_mut().csis.iter_mut() {
            csi.is_dirty = false;
        }
        DocumentMutations::set_scene_rendering(
            &mut store,
            &SetSceneRendering {
                zoom: 2.0,
                edge_width: 3.0,
                rotation: vec![Rotation::new(Axis::Z, 45.0)],
                refresh: true,
            },
        );
        let state = store.state();
        assert_eq!(state.template.scene_rendering.zoom, 2.0);
        assert_eq!(state.template.scene_rendering.rotation.len(), 1);
        assert!(state.csis.iter().all(|c| c.is_dirty));
        assert!(state.pages.iter().all(|p| p.needs_layout));
    }

    #[test]
    fn authored_steps_become_pages() {
        let catalog = ModelCatalog::new("wall.ldr").with_model(
            "wall.ldr",
            ModelDef {
                parts: vec![PartRef::new("3001.dat", 4), PartRef::new("3001.dat", 4), PartRef::new("3003.dat", 1)],
                steps: Some(vec![vec![0, 1], vec![2]]),
            },
        );
        let mut store = Store::new().with_catalog(Arc::new(catalog));
        let pages = DocumentMutations::add_initial_pages(&mut store, &AddInitialPages::default()).expect("pages");
        assert_eq!(pages.len(), 2);

        let get = store.get();
        let first = get.page(pages[0]).expect("page");
        let step = get.step(first.steps[0]).expect("step");
        assert_eq!(step.number, 1);
        assert_eq!(step.parts, vec![0, 1]);
        let pli = get.pli(step.pli_id.expect("pli")).expect("pli");
        assert_eq!(pli.pli_items.len(), 1);
        assert_eq!(get.pli_item(pli.pli_items[0]).map(|i| i.quantity), Some(2));
        assert_eq!(get.page(pages[1]).map(|p| p.number), Some(1));
    }

    #[test]
    fn submodels_are_paged_before_their_parent_step() {
        let mut store = Store::new().with_catalog(Arc::new(car()));
        let pages = DocumentMutations::add_initial_pages(
            &mut store,
            &AddInitialPages {
                parts_per_step: Some(2),
                ..AddInitialPages::default()
            },
        )
        .expect("pages");
        assert_eq!(pages.len(), 2);

        let get = store.get();
        let steps: Vec<(String, i64)> = get
            .basic_pages()
            .iter()
            .filter_map(|p| get.step(p.steps[0]))
            .map(|s| (s.model.filename.clone(), s.number))
            .collect();
        assert_eq!(
            steps,
            vec![
                ("wheel.ldr".to_string(), 1),
                ("car.ldr".to_string(), 2),
                ("car.ldr".to_string(), 3),
            ]
        );
        let wheel_step = get.basic_pages()[0].steps[0];
        let car_step = get.page(pages[0]).expect("page").steps[0];
        assert_eq!(get.step(wheel_step).and_then(|s| s.model.parent_step_id), Some(car_step));

        let images = DocumentMutations::add_initial_submodel_images(&mut store).expect("images");
        assert_eq!(images.len(), 1);
        let get = store.get();
        let image = get.submodel_image(images[0].id).expect("image");
        assert_eq!(image.quantity, 2);
        assert_eq!(image.parent.map(|p| p.id), Some(wheel_step));
        assert!(image.quantity_label_id.is_some());
    }

    #[test]
    fn merge_packs_runs_of_one_model() {
        let mut store = Store::new().with_catalog(Arc::new(car()));
        DocumentMutations::add_initial_pages(
            &mut store,
            &AddInitialPages {
                parts_per_step: Some(1),
                ..AddInitialPages::default()
            },
        )
        .expect("pages");
        assert_eq!(store.get().basic_pages().len(), 5);

        // Two steps to a page.
        let removed = DocumentMutations::merge_initial_pages(&mut store, |store, page| {
            store.state().pages.get(page).is_some_and(|p| p.steps.len() <= 2)
        })
        .expect("merge");
        assert_eq!(removed, 2);

        let get = store.get();
        let layout: Vec<Vec<String>> = get
            .basic_pages()
            .iter()
            .map(|p| {
                p.steps
                    .iter()
                    .filter_map(|id| get.step(*id))
                    .map(|s| s.model.filename.clone())
                    .collect()
            })
            .collect();
        assert_eq!(
            layout,
            vec![
                vec!["car.ldr".to_string()],
                vec!["wheel.ldr".to_string(), "wheel.ldr".to_string()],
                vec!["car.ldr".to_string(), "car.ldr".to_string()],
            ]
        );
        assert!(crate::integrity::check(store.state()).is_empty());
    }

    #[test]
    fn merge_without_room_keeps_every_page() {
        let mut store = Store::new().with_catalog(Arc::new(car()));
        DocumentMutations::add_initial_pages(
            &mut store,
            &AddInitialPages {
                parts_per_step: Some(1),
                ..AddInitialPages::default()
            },
        )
        .expect("pages");
        let before: Vec<Vec<ItemId>> = store.get().basic_pages().iter().map(|p| p.steps.clone()).collect();

        let removed = DocumentMutations::merge_initial_pages(&mut store, |_, _| false).expect("merge");
        assert_eq!(removed, 0);
        let after: Vec<Vec<ItemId>> = store.get().basic_pages().iter().map(|p| p.steps.clone()).collect();
        assert_eq!(after, before);
    }

    #[test]
    fn missing_model_builds_nothing() {
        let mut store = Store::new();
        let pages = DocumentMutations::add_initial_pages(&mut store, &AddInitialPages::default()).expect("pages");
        assert!(pages.is_empty());
        assert!(store.state().pages.is_empty());
    }
}
