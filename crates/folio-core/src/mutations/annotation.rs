//! Free annotations: text labels, arrows and images placed by the user.

use super::item::{DeleteChildList, ItemMutations};
use super::mark_page_for_layout;
use crate::items::{Annotation, PointItem};
use crate::store::Store;
use crate::types::{Align, AnnotationKind, Direction, FolioError, ItemId, ItemType, LookupKey, VAlign};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_LABEL_TEXT: &str = "Label";
pub const DEFAULT_LABEL_FONT: &str = "20pt Helvetica";
pub const DEFAULT_LABEL_COLOR: &str = "black";

/// Length of a freshly drawn arrow.
const ARROW_LENGTH: f64 = 100.0;

/// Content fields shared by `add` and `set`. Unset fields keep their value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnnotationProps {
    pub text: Option<String>,
    pub color: Option<String>,
    pub font: Option<String>,
    pub src: Option<String>,
    pub direction: Option<Direction>,
    pub meta: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAnnotation {
    pub annotation_type: AnnotationKind,
    pub parent: LookupKey,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub properties: AnnotationProps,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAnnotation {
    pub annotation: ItemId,
    #[serde(default)]
    pub new_properties: AnnotationProps,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRef {
    pub annotation: ItemId,
}

fn non_empty(value: Option<&String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| default.to_owned())
}

pub struct AnnotationMutations;

impl AnnotationMutations {
    pub fn add(store: &mut Store, opts: &AddAnnotation) -> Result<LookupKey, FolioError> {
        let props = &opts.properties;
        let mut annotation = Annotation {
            annotation_type: opts.annotation_type,
            text: props.text.clone(),
            color: props.color.clone(),
            font: props.font.clone(),
            src: props.src.clone(),
            direction: props.direction,
            meta: props.meta.clone(),
            align: Align::Left,
            valign: VAlign::Top,
            ..Annotation::default()
        };
        match opts.annotation_type {
            AnnotationKind::Label => {
                annotation.text = Some(non_empty(props.text.as_ref(), DEFAULT_LABEL_TEXT));
                annotation.font = Some(non_empty(props.font.as_ref(), DEFAULT_LABEL_FONT));
                annotation.color = Some(non_empty(props.color.as_ref(), DEFAULT_LABEL_COLOR));
                annotation.x = Some(opts.x);
                annotation.y = Some(opts.y);
            }
            AnnotationKind::Image => {
                annotation.x = Some(opts.x);
                annotation.y = Some(opts.y);
            }
            AnnotationKind::Arrow => {}
        }

        let key = ItemMutations::add(store, annotation, Some(opts.parent), None, None)?;
        if opts.annotation_type == AnnotationKind::Arrow {
            for x in [opts.x, opts.x + ARROW_LENGTH] {
                let point = PointItem {
                    x,
                    y: opts.y,
                    ..PointItem::default()
                };
                ItemMutations::add(store, point, Some(key), None, None)?;
            }
        }
        Ok(key)
    }

    /// Update label text, color and font, or an image's source. A changed
    /// label is re-measured by the layout engine.
    pub fn set(store: &mut Store, opts: &SetAnnotation) {
        let key = LookupKey::new(ItemType::Annotation, opts.annotation);
        let Some(item) = store.state_mut().annotations.get_mut(opts.annotation) else {
            debug!(annotation = %key, "set on missing annotation ignored");
            return;
        };
        let props = &opts.new_properties;
        match item.annotation_type {
            AnnotationKind::Label => {
                for (field, value) in [
                    (&mut item.text, &props.text),
                    (&mut item.color, &props.color),
                    (&mut item.font, &props.font),
                ] {
                    if value.is_some() {
                        field.clone_from(value);
                    }
                }
                item.width = None;
                item.height = None;
            }
            AnnotationKind::Image => {
                if props.src.is_some() {
                    item.src.clone_from(&props.src);
                    item.width = None;
                    item.height = None;
                }
            }
            AnnotationKind::Arrow => {}
        }
        mark_page_for_layout(store, key);
    }

    pub fn delete(store: &mut Store, opts: &AnnotationRef) -> Result<(), FolioError> {
        let key = LookupKey::new(ItemType::Annotation, opts.annotation);
        if !store.state().contains(key) {
            debug!(annotation = %key, "delete of missing annotation ignored");
            return Ok(());
        }
        ItemMutations::delete_child_list(
            store,
            &DeleteChildList {
                item: key,
                list_type: ItemType::Point,
            },
        )?;
        store.state_mut().remove_item(key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::Page;

    fn page(store: &mut Store) -> LookupKey {
        ItemMutations::add(store, Page::default(), None, None, None).expect("page")
    }

    #[test]
    fn label_gets_defaults() {
        let mut store = Store::new();
        let page = page(&mut store);
        let key = AnnotationMutations::add(
            &mut store,
            &AddAnnotation {
                annotation_type: AnnotationKind::Label,
                parent: page,
                x: 15.0,
                y: 25.0,
                properties: AnnotationProps {
                    text: Some(String::new()),
                    ..AnnotationProps::default()
                },
            },
        )
        .expect("label");
        let label = store.get().annotation(key.id).expect("label");
        assert_eq!(label.text.as_deref(), Some(DEFAULT_LABEL_TEXT));
        assert_eq!(label.font.as_deref(), Some(DEFAULT_LABEL_FONT));
        assert_eq!(label.color.as_deref(), Some(DEFAULT_LABEL_COLOR));
        assert_eq!((label.x, label.y), (Some(15.0), Some(25.0)));
    }

    #[test]
    fn arrow_owns_two_points() {
        let mut store = Store::new();
        let page = page(&mut store);
        let key = AnnotationMutations::add(
            &mut store,
            &AddAnnotation {
                annotation_type: AnnotationKind::Arrow,
                parent: page,
                x: 10.0,
                y: 20.0,
                properties: AnnotationProps::default(),
            },
        )
        .expect("arrow");
        let get = store.get();
        let arrow = get.annotation(key.id).expect("arrow");
        let xs: Vec<f64> = arrow.points.iter().filter_map(|id| get.point(*id)).map(|p| p.x).collect();
        assert_eq!(xs, vec![10.0, 110.0]);

        AnnotationMutations::delete(&mut store, &AnnotationRef { annotation: key.id }).expect("delete");
        assert!(store.state().points.is_empty());
        assert!(store.get().page(page.id).expect("page").annotations.is_empty());
    }

    #[test]
    fn set_keeps_unset_fields() {
        let mut store = Store::new();
        let page = page(&mut store);
        let key = AnnotationMutations::add(
            &mut store,
            &AddAnnotation {
                annotation_type: AnnotationKind::Label,
                parent: page,
                x: 0.0,
                y: 0.0,
                properties: AnnotationProps::default(),
            },
        )
        .expect("label");
        AnnotationMutations::set(
            &mut store,
            &SetAnnotation {
                annotation: key.id,
                new_properties: AnnotationProps {
                    text: Some("Hello".into()),
                    ..AnnotationProps::default()
                },
            },
        );
        let label = store.get().annotation(key.id).expect("label");
        assert_eq!(label.text.as_deref(), Some("Hello"));
        assert_eq!(label.font.as_deref(), Some(DEFAULT_LABEL_FONT));
        assert!(store.get().page(page.id).is_some_and(|p| p.needs_layout));
    }
}
