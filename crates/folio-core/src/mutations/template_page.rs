//! Template page: a sample page showing every styled element, and the
//! template settings it previews.
//!
//! Settings are edited through a JSON tree view of the [`Template`] in
//! which `page` also carries the page size and `sceneRendering` the render
//! settings, so one dotted path addresses every field.

use super::callout::{AddCallout, AddCalloutStep, CalloutMutations};
use super::document::DocumentMutations;
use super::page::{AddPage, PageMutations, PageNumber};
use super::part::{AddToCallout, PartMutations, DISPLACEMENT_DISTANCE};
use super::pli_item::{AddPliItem, PliItemMutations};
use super::step::{AddStep, StepMutations, ToggleRotateIcon};
use super::submodel_image::{AddSubmodelImage, SubmodelImageMutations};
use crate::document::{PageSize, SceneRendering, Template};
use crate::items::{DisplacedPart, StepModel};
use crate::store::Store;
use crate::types::{Direction, FolioError, ItemType, LookupKey, PageSubtype, PartRef};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Model file drawn on the template page.
pub const TEMPLATE_MODEL: &str = "templateModel.ldr";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetTemplateEntry {
    /// Dotted path, e.g. `"step.numberLabel"`.
    pub entry: String,
    /// Objects merge into the entry; anything else replaces it.
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadTemplate {
    pub template: Template,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetPageSize {
    pub width: f64,
    pub height: f64,
}

/// Parts shown in the template page's part list.
fn sample_parts() -> [PartRef; 2] {
    [PartRef::new("3001.dat", 1), PartRef::new("3003.dat", 4)]
}

/// Styles of a fresh document.
#[must_use]
pub fn default_template() -> Template {
    let border = |width: u32, radius: u32| json!({"width": width, "color": "black", "cornerRadius": radius});
    let settings = json!({
        "page": {
            "innerMargin": 0.025,
            "numberLabel": {"font": "bold 18pt Helvetica", "color": "black", "position": "right"},
            "divider": {"border": {"width": 2, "color": "black"}},
            "fill": {"color": "white"},
            "border": border(0, 0)
        },
        "step": {
            "innerMargin": 0.02,
            "csi": {"scale": 1, "rotation": {"x": 0, "y": 0, "z": 0}},
            "numberLabel": {"font": "bold 22pt Helvetica", "color": "black"}
        },
        "submodelImage": {
            "innerMargin": 0.017,
            "csi": {"scale": 1, "rotation": {"x": 0, "y": 0, "z": 0}},
            "fill": {"color": null},
            "border": border(2, 10),
            "quantityLabel": {"font": "bold 18pt Helvetica", "color": "black"}
        },
        "pli": {
            "innerMargin": 0.017,
            "fill": {"color": null},
            "border": border(2, 10)
        },
        "pliItem": {
            "scale": 1,
            "rotation": {"x": 0, "y": 0, "z": 0},
            "quantityLabel": {"font": "bold 10pt Helvetica", "color": "black"}
        },
        "callout": {
            "innerMargin": 0.012,
            "fill": {"color": null},
            "border": border(2, 10),
            "arrow": {"border": {"width": 2, "color": "black"}},
            "step": {"numberLabel": {"font": "bold 18pt Helvetica", "color": "black"}}
        },
        "rotateIcon": {
            "size": 40,
            "fill": {"color": null},
            "border": border(2, 10),
            "arrow": {"border": {"width": 3, "color": "black"}}
        }
    });
    Template {
        page: PageSize::default(),
        scene_rendering: SceneRendering::default(),
        settings,
    }
}

fn to_tree(template: &Template) -> Result<Value, FolioError> {
    let to_value = |v: Result<Value, serde_json::Error>| v.map_err(|e| FolioError::SerializationError(e.to_string()));
    let mut tree = match &template.settings {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    let size = to_value(serde_json::to_value(template.page))?;
    let page = tree
        .entry("page")
        .or_insert_with(|| Value::Object(Map::new()));
    if let (Value::Object(page), Value::Object(size)) = (page, size) {
        page.extend(size);
    }
    tree.insert(
        "sceneRendering".into(),
        to_value(serde_json::to_value(&template.scene_rendering))?,
    );
    Ok(Value::Object(tree))
}

fn from_tree(tree: Value) -> Result<Template, FolioError> {
    let Value::Object(mut settings) = tree else {
        return Err(FolioError::InvalidArgument("template must be an object".into()));
    };
    let scene_rendering = match settings.remove("sceneRendering") {
        Some(value) => serde_json::from_value(value)?,
        None => SceneRendering::default(),
    };
    let defaults = PageSize::default();
    let (page, drop_page) = match settings.get_mut("page") {
        Some(Value::Object(page)) => {
            let size = PageSize {
                width: page.remove("width").and_then(|v| v.as_f64()).unwrap_or(defaults.width),
                height: page.remove("height").and_then(|v| v.as_f64()).unwrap_or(defaults.height),
            };
            (size, page.is_empty())
        }
        _ => (defaults, false),
    };
    if drop_page {
        settings.remove("page");
    }
    Ok(Template {
        page,
        scene_rendering,
        settings: Value::Object(settings),
    })
}

pub struct TemplatePageMutations;

impl TemplatePageMutations {
    /// Add the template page: one numbered step drawing the sample model,
    /// with a rotate icon, a submodel image, a part list, a displaced part
    /// and a two-step callout.
    pub fn add(store: &mut Store) -> Result<LookupKey, FolioError> {
        let page = PageMutations::add(
            store,
            &AddPage {
                page_number: Some(PageNumber::Number(0)),
                subtype: PageSubtype::TemplatePage,
                insertion_index: Some(0),
                ..AddPage::default()
            },
        )?;
        let model = StepModel {
            filename: TEMPLATE_MODEL.into(),
            parent_step_id: None,
        };
        let step = StepMutations::add(
            store,
            &AddStep {
                model: Some(model.clone()),
                step_number: Some(1),
                ..AddStep::new(page)
            },
        )?;
        if let Some(s) = store.state_mut().steps.get_mut(step.id) {
            s.parts = vec![0, 1];
        }
        StepMutations::toggle_rotate_icon(
            store,
            &ToggleRotateIcon {
                step: step.id,
                display: true,
            },
        )?;
        SubmodelImageMutations::add(
            store,
            &AddSubmodelImage {
                parent: step.id,
                model_filename: TEMPLATE_MODEL.into(),
                quantity: Some(2),
            },
        )?;
        if let Some(pli) = store.state().steps.get(step.id).and_then(|s| s.pli_id) {
            for part in sample_parts() {
                PliItemMutations::add(
                    store,
                    &AddPliItem {
                        parent: LookupKey::new(ItemType::Pli, pli),
                        filename: part.filename,
                        color_code: part.color_code,
                        quantity: None,
                    },
                )?;
            }
        }
        if let Some(s) = store.state_mut().steps.get_mut(step.id) {
            s.displaced_parts = vec![DisplacedPart {
                part_id: 1,
                direction: Direction::Up,
                part_distance: DISPLACEMENT_DISTANCE,
                arrow_offset: 0.0,
                arrow_length: DISPLACEMENT_DISTANCE,
                arrow_rotation: 0.0,
            }];
        }

        let callout = CalloutMutations::add(
            store,
            &AddCallout {
                include_empty_step: true,
                ..AddCallout::new(step)
            },
        )?;
        PartMutations::add_to_callout(
            store,
            &AddToCallout {
                part_id: 0,
                step: step.id,
                callout: callout.id,
            },
        )?;
        CalloutMutations::add_step(
            store,
            &AddCalloutStep {
                callout: callout.id,
                insertion_index: None,
            },
        )?;
        PartMutations::add_to_callout(
            store,
            &AddToCallout {
                part_id: 1,
                step: step.id,
                callout: callout.id,
            },
        )?;
        for id in store.state().child_ids(callout, ItemType::Step) {
            if let Some(s) = store.state_mut().steps.get_mut(id) {
                s.model = model.clone();
            }
        }
        Ok(page)
    }

    /// Merge `value` into the template at `entry`, creating missing
    /// objects along the path.
    pub fn set(store: &mut Store, opts: &SetTemplateEntry) -> Result<(), FolioError> {
        let mut tree = to_tree(&store.state().template)?;
        let mut node = &mut tree;
        for segment in opts.entry.split('.').filter(|s| !s.is_empty()) {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            let Value::Object(map) = node else {
                return Err(FolioError::InvalidArgument(format!("bad template path '{}'", opts.entry)));
            };
            node = map
                .entry(segment)
                .or_insert_with(|| Value::Object(Map::new()));
        }
        match (&mut *node, &opts.value) {
            (Value::Object(target), Value::Object(patch)) => {
                target.extend(patch.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            (target, value) => *target = value.clone(),
        }
        let template = from_tree(tree)?;
        let resized = template.page != store.state().template.page;
        store.state_mut().template = template;
        if resized {
            PageMutations::mark_all_dirty(store);
        }
        Ok(())
    }

    pub fn load(store: &mut Store, opts: &LoadTemplate) {
        store.state_mut().template = opts.template.clone();
        DocumentMutations::refresh_all(store);
    }

    pub fn reset(store: &mut Store) {
        store.state_mut().template = default_template();
        DocumentMutations::refresh_all(store);
    }

    pub fn set_page_size(store: &mut Store, opts: &SetPageSize) {
        store.state_mut().template.page = PageSize {
            width: opts.width,
            height: opts.height,
        };
        PageMutations::mark_all_dirty(store);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_page_shows_every_element() {
        let mut store = Store::new();
        PageMutations::add(
            &mut store,
            &AddPage {
                page_number: Some(PageNumber::Id),
                ..AddPage::default()
            },
        )
        .expect("page");
        let page = TemplatePageMutations::add(&mut store).expect("template");

        let get = store.get();
        assert_eq!(get.template_page().map(|p| p.id), Some(page.id));
        assert_eq!(store.state().pages.position(page.id), Some(0));
        assert_eq!(get.basic_pages().first().map(|p| p.number), Some(1));

        let template = get.page(page.id).expect("page");
        let step = get.step(template.steps[0]).expect("step");
        assert_eq!(step.number, 1);
        assert_eq!(step.parts, vec![0, 1]);
        assert!(step.rotate_icon_id.is_some());
        assert_eq!(step.submodel_images.len(), 1);
        assert_eq!(step.displaced_parts.len(), 1);
        let pli = get.pli(step.pli_id.expect("pli")).expect("pli");
        assert_eq!(pli.pli_items.len(), 2);
        let callout = get.callout(step.callouts[0]).expect("callout");
        assert_eq!(callout.steps.len(), 2);
        for id in &callout.steps {
            assert_eq!(get.step(*id).map(|s| s.model.filename.as_str()), Some(TEMPLATE_MODEL));
        }
    }

    #[test]
    fn set_merges_into_settings_and_typed_fields() {
        let mut store = Store::new();
        TemplatePageMutations::reset(&mut store);
        TemplatePageMutations::set(
            &mut store,
            &SetTemplateEntry {
                entry: "step.numberLabel".into(),
                value: json!({"color": "red"}),
            },
        )
        .expect("set");
        TemplatePageMutations::set(
            &mut store,
            &SetTemplateEntry {
                entry: "page".into(),
                value: json!({"width": 1200.0}),
            },
        )
        .expect("set");

        let template = &store.state().template;
        assert_eq!(template.setting("step.numberLabel.color"), Some(&json!("red")));
        assert_eq!(
            template.setting("step.numberLabel.font"),
            Some(&json!("bold 22pt Helvetica"))
        );
        assert_eq!(template.page.width, 1200.0);
        assert_eq!(template.page.height, 700.0);
        assert!(template.setting("page.width").is_none());
        assert!(template.setting("sceneRendering").is_none());
    }

    #[test]
    fn set_page_size_flags_pages() {
        let mut store = Store::new();
        let page = PageMutations::add(&mut store, &AddPage::default()).expect("page");
        if let Some(p) = store.state_mut().pages.get_mut(page.id) {
            p.needs_layout = false;
        }
        TemplatePageMutations::set_page_size(
            &mut store,
            &SetPageSize {
                width: 600.0,
                height: 800.0,
            },
        );
        assert_eq!(store.state().template.page.width, 600.0);
        assert!(store.get().page(page.id).is_some_and(|p| p.needs_layout));
    }
}
