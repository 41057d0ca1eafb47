//! # Backward Compatibility
//!
//! Upgrades the JSON `state` object of an older save file to the shape
//! [`DocumentState`](crate::document::DocumentState) deserializes.
//!
//! Two tiers:
//! - Legacy files (before 0.45) get every historic reshaping: rotation
//!   objects become rotation lists, `distance` becomes `partDistance`,
//!   flat templates move their free-form keys under `settings`.
//! - Every file gets the current-tier fixes: default `books`, default page
//!   subtypes, and the old standalone title, template and inventory pages
//!   folded into `pages` under fresh ids.

use crate::types::FolioError;
use serde_json::{Map, Value, json};
use tracing::debug;

/// Version written by this crate into new save files.
pub const CURRENT_VERSION: &str = "0.46.0";

/// Files older than this need the legacy tier.
const LEGACY_BEFORE: (u64, u64) = (0, 45);

/// `major.minor[.patch]`, compared on major and minor only.
fn parse_version(version: &str) -> Result<(u64, u64), FolioError> {
    let mut parts = version.trim().split('.');
    let mut next = || -> Result<u64, FolioError> {
        parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| FolioError::UnsupportedVersion(version.to_string()))
    };
    Ok((next()?, next()?))
}

/// Upgrade a save file's `state` tagged with `version`.
///
/// `model_filename` seeds the document filename of legacy files that never
/// stored one.
///
/// # Errors
///
/// `UnsupportedVersion` for an unparseable version or one newer than
/// [`CURRENT_VERSION`]; `DeserializationError` if `state` is not an object.
pub fn normalize(mut state: Value, version: &str, model_filename: Option<&str>) -> Result<Value, FolioError> {
    let parsed = parse_version(version)?;
    if parsed > parse_version(CURRENT_VERSION)? {
        return Err(FolioError::UnsupportedVersion(format!(
            "{version} is newer than {CURRENT_VERSION}"
        )));
    }
    let Some(obj) = state.as_object_mut() else {
        return Err(FolioError::DeserializationError("save file state is not an object".to_string()));
    };

    if parsed < LEGACY_BEFORE {
        debug!(version, "upgrading legacy save file");
        fix_legacy_state(obj, model_filename);
        if let Some(template) = obj.get_mut("template").and_then(Value::as_object_mut) {
            fix_legacy_template(template);
        }
    }
    fix_state(obj);
    Ok(state)
}

// =============================================================================
// LEGACY TIER
// =============================================================================

/// `{x, y, z}` to `[{axis, angle}]`, dropping zero angles.
fn fix_rotation(rotation: &mut Value) {
    let Some(obj) = rotation.as_object() else {
        return;
    };
    let list: Vec<Value> = ["x", "y", "z"]
        .into_iter()
        .filter_map(|axis| {
            let angle = obj.get(axis).and_then(Value::as_f64)?;
            (angle != 0.0).then(|| json!({"axis": axis, "angle": angle}))
        })
        .collect();
    *rotation = Value::Array(list);
}

fn fix_rotation_at(root: &mut Value, path: &[&str]) {
    let node = path.iter().try_fold(root, |node, key| node.get_mut(*key));
    if let Some(rotation) = node {
        fix_rotation(rotation);
    }
}

fn each_item(state: &mut Map<String, Value>, list: &str, mut fix: impl FnMut(&mut Map<String, Value>)) {
    if let Some(items) = state.get_mut(list).and_then(Value::as_array_mut) {
        items.iter_mut().filter_map(Value::as_object_mut).for_each(&mut fix);
    }
}

fn default_key(obj: &mut Map<String, Value>, key: &str, value: Value) {
    if obj.get(key).is_none_or(Value::is_null) {
        obj.insert(key.to_string(), value);
    }
}

fn fix_legacy_state(state: &mut Map<String, Value>, model_filename: Option<&str>) {
    let has_filename = state
        .get("filename")
        .and_then(Value::as_str)
        .is_some_and(|f| !f.is_empty());
    if !has_filename {
        if let Some(stem) = model_filename.and_then(|f| f.split('.').next()) {
            state.insert("filename".to_string(), Value::String(stem.to_string()));
        }
    }
    default_key(state, "pliTransforms", json!({}));

    each_item(state, "pages", |page| default_key(page, "pliItems", json!([])));
    each_item(state, "steps", |step| {
        default_key(step, "stretchedPages", json!([]));
        default_key(step, "annotations", json!([]));
        if let Some(displaced) = step.get_mut("displacedParts").and_then(Value::as_array_mut) {
            for part in displaced.iter_mut().filter_map(Value::as_object_mut) {
                if let Some(distance) = part.remove("distance") {
                    part.insert("partDistance".to_string(), distance);
                }
            }
        }
    });
    each_item(state, "csis", |csi| {
        default_key(csi, "annotations", json!([]));
        if let Some(rotation) = csi.get_mut("rotation") {
            fix_rotation(rotation);
        }
    });
    each_item(state, "callouts", |callout| {
        if !callout.contains_key("borderOffset") {
            callout.insert("borderOffset".to_string(), json!({"x": 0, "y": 0}));
        }
        if !callout.contains_key("position") {
            callout.insert("position".to_string(), json!("left"));
        }
    });
    each_item(state, "pliItems", |item| {
        item.remove("partNumbers");
    });
}

/// Older templates were one flat object; everything but page size and
/// scene rendering now lives under `settings`.
fn fix_legacy_template(template: &mut Map<String, Value>) {
    if !template.contains_key("settings") {
        let keys: Vec<String> = template
            .keys()
            .filter(|k| !matches!(k.as_str(), "page" | "sceneRendering"))
            .cloned()
            .collect();
        let mut settings = Map::new();
        for key in keys {
            if let Some(value) = template.remove(&key) {
                settings.insert(key, value);
            }
        }
        template.insert("settings".to_string(), Value::Object(settings));
    }

    if let Some(settings) = template.get_mut("settings") {
        fix_rotation_at(settings, &["pliItem", "rotation"]);
        fix_rotation_at(settings, &["step", "csi", "rotation"]);
        fix_rotation_at(settings, &["submodelImage", "csi", "rotation"]);
        if let Some(image) = settings.get_mut("submodelImage").and_then(Value::as_object_mut) {
            default_key(image, "maxHeight", json!(0.3));
        }
        if let Some(obj) = settings.as_object_mut() {
            obj.insert("useBlackStudFaces".to_string(), Value::Bool(true));
        }
    }

    default_key(template, "sceneRendering", json!({}));
    if let Some(scene) = template.get_mut("sceneRendering").and_then(Value::as_object_mut) {
        default_key(scene, "zoom", json!(0));
        default_key(scene, "edgeWidth", json!(4));
        // Camera angle every legacy document was drawn with.
        default_key(
            scene,
            "rotation",
            json!([{"axis": "x", "angle": 26.33}, {"axis": "y", "angle": 45}]),
        );
    }
}

// =============================================================================
// CURRENT TIER
// =============================================================================

fn fix_state(state: &mut Map<String, Value>) {
    default_key(state, "books", json!([]));
    default_key(state, "pages", json!([]));
    each_item(state, "pages", |page| default_key(page, "subtype", json!("page")));

    let title = state.remove("titlePage").filter(Value::is_object);
    let template = state.remove("templatePage").filter(Value::is_object);
    let inventory = state.remove("inventoryPages");

    if let Some(mut page) = title {
        let id = next_page_id(state);
        retag_page(&mut page, "titlePage", id, state);
        push_page(state, page, true);
    }
    if let Some(mut page) = template {
        let id = next_page_id(state);
        retag_page(&mut page, "templatePage", id, state);
        if let Some(obj) = page.as_object_mut() {
            obj.insert("number".to_string(), json!(0));
        }
        push_page(state, page, true);
    }
    if let Some(Value::Array(pages)) = inventory {
        let first = next_page_id(state);
        for (id, mut page) in (first..).zip(pages) {
            retag_page(&mut page, "inventoryPage", id, state);
            push_page(state, page, false);
        }
    }
}

fn next_page_id(state: &Map<String, Value>) -> u64 {
    state
        .get("pages")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|p| p.get("id").and_then(Value::as_u64))
        .max()
        .map_or(0, |max| max + 1)
}

fn push_page(state: &mut Map<String, Value>, page: Value, front: bool) {
    if let Some(pages) = state.get_mut("pages").and_then(Value::as_array_mut) {
        if front {
            pages.insert(0, page);
        } else {
            pages.push(page);
        }
    }
}

/// Give a standalone page its subtype and a new id, and point its children
/// at that id.
fn retag_page(page: &mut Value, subtype: &str, id: u64, state: &mut Map<String, Value>) {
    let Some(obj) = page.as_object_mut() else {
        return;
    };
    obj.insert("type".to_string(), json!("page"));
    obj.insert("subtype".to_string(), json!(subtype));
    let parent = json!({"type": "page", "id": id});

    for list in ["steps", "annotations", "dividers", "pliItems"] {
        let child_ids: Vec<u64> = obj
            .get(list)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_u64)
            .collect();
        each_item(state, list, |child| {
            if child.get("id").and_then(Value::as_u64).is_some_and(|c| child_ids.contains(&c)) {
                child.insert("parent".to_string(), parent.clone());
            }
        });
    }
    if let Some(label) = obj.get("numberLabelID").and_then(Value::as_u64) {
        each_item(state, "numberLabels", |child| {
            if child.get("id").and_then(Value::as_u64) == Some(label) {
                child.insert("parent".to_string(), parent.clone());
            }
        });
    }
    obj.insert("id".to_string(), json!(id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentState;
    use crate::types::{Axis, ItemId, ItemType, PageSubtype, Rotation};

    #[test]
    fn versions_compare_on_major_and_minor() {
        assert_eq!(parse_version("0.44.7").expect("parse"), (0, 44));
        assert!(parse_version("abc").is_err());
        assert!(matches!(
            normalize(json!({}), "1.0.0", None),
            Err(FolioError::UnsupportedVersion(_))
        ));
        assert!(normalize(json!([]), "0.46", None).is_err());
    }

    #[test]
    fn current_files_get_books_and_subtypes() {
        let state = normalize(json!({"pages": [{"id": 0, "number": 1}]}), CURRENT_VERSION, None).expect("normalize");
        assert_eq!(state["books"], json!([]));
        assert_eq!(state["pages"][0]["subtype"], json!("page"));
    }

    #[test]
    fn standalone_pages_fold_into_pages() {
        let state = json!({
            "pages": [{"id": 0, "number": 1}, {"id": 3, "number": 2}],
            "titlePage": {"id": 0, "steps": [5], "numberLabelID": 2},
            "templatePage": {"id": 0, "number": 9},
            "inventoryPages": [{"id": 0, "annotations": [1]}, {"id": 1}],
            "steps": [{"id": 5, "parent": {"type": "titlePage", "id": 0}}],
            "annotations": [{"id": 1, "parent": {"type": "inventoryPage", "id": 0}}],
            "numberLabels": [{"id": 2, "parent": {"type": "titlePage", "id": 0}}],
        });
        let state = normalize(state, "0.45.0", None).expect("normalize");
        let ids: Vec<u64> = state["pages"]
            .as_array()
            .expect("pages")
            .iter()
            .filter_map(|p| p["id"].as_u64())
            .collect();
        assert_eq!(ids, vec![5, 4, 0, 3, 6, 7]);
        assert_eq!(state["pages"][0]["subtype"], json!("templatePage"));
        assert_eq!(state["pages"][0]["number"], json!(0));
        assert_eq!(state["pages"][1]["subtype"], json!("titlePage"));
        assert_eq!(state["steps"][0]["parent"], json!({"type": "page", "id": 4}));
        assert_eq!(state["numberLabels"][0]["parent"], json!({"type": "page", "id": 4}));
        assert_eq!(state["annotations"][0]["parent"], json!({"type": "page", "id": 6}));
        assert!(state.get("titlePage").is_none());

        let doc: DocumentState = serde_json::from_value(state).expect("deserialize");
        let inventory = doc.pages.get(ItemId(7)).expect("inventory page");
        assert_eq!(inventory.subtype, PageSubtype::InventoryPage);
        let step = doc.steps.get(ItemId(5)).expect("step");
        assert_eq!(step.parent.map(|p| p.item_type), Some(ItemType::Page));
    }

    #[test]
    fn legacy_files_get_historic_reshaping() {
        let state = json!({
            "pages": [{"id": 0, "number": 1, "steps": [0]}],
            "steps": [{"id": 0, "number": 1, "displacedParts": [
                {"partID": 2, "direction": "up", "distance": 40, "arrowOffset": 0, "arrowLength": 60, "arrowRotation": 0}
            ]}],
            "csis": [{"id": 0, "rotation": {"x": 30, "y": 0, "z": -15}}],
            "callouts": [{"id": 0}],
            "pliItems": [{"id": 0, "partNumbers": [1, 2]}],
            "template": {"page": {"width": 800, "height": 600}, "pliItem": {"rotation": {"y": 10}}},
        });
        let state = normalize(state, "0.40.2", Some("trike.ldr")).expect("normalize");
        assert_eq!(state["filename"], json!("trike"));
        assert!(state["pliItems"][0].get("partNumbers").is_none());
        assert_eq!(state["template"]["settings"]["pliItem"]["rotation"], json!([{"axis": "y", "angle": 10.0}]));
        assert_eq!(state["template"]["settings"]["useBlackStudFaces"], json!(true));

        let doc: DocumentState = serde_json::from_value(state).expect("deserialize");
        let step = doc.steps.get(ItemId(0)).expect("step");
        assert_eq!(step.displaced_parts[0].part_distance, 40.0);
        let csi = doc.csis.get(ItemId(0)).expect("csi");
        assert_eq!(
            csi.rotation,
            Some(vec![Rotation::new(Axis::X, 30.0), Rotation::new(Axis::Z, -15.0)])
        );
        assert_eq!(doc.template.page.width, 800.0);
        assert_eq!(doc.template.scene_rendering.edge_width, 4.0);
        assert_eq!(doc.template.scene_rendering.rotation.len(), 2);
    }
}
