//! # Mutations
//!
//! The write surface. Each submodule owns the rules of one item type and is
//! a unit struct of associated functions taking `&mut Store` and a small
//! serde options struct. Every module composes the generic registry
//! operations of [`item`] plus its own bookkeeping.
//!
//! ## Contract
//!
//! - A mutation never returns with a broken parent/child link, including on
//!   its early-return paths.
//! - Caller bugs (deleting an item that still owns children, adding under a
//!   parent that does not exist) are returned as [`FolioError`] before any
//!   write.
//! - References that no longer resolve are a silent no-op, logged at
//!   `debug`.
//! - Layout is never recomputed here. Mutations only set `needs_layout` and
//!   `is_dirty` flags for the layout and render collaborators.
//!
//! [`Mutation`] names every operation so it can travel as data, for example
//! through the undo stack or a JSON command file.

pub mod annotation;
pub mod book;
pub mod callout;
pub mod callout_arrow;
pub mod csi;
pub mod divider;
pub mod document;
pub mod inventory_page;
pub mod item;
pub mod page;
pub mod part;
pub mod pli;
pub mod pli_item;
pub mod rotate_icon;
pub mod step;
pub mod submodel;
pub mod submodel_image;
pub mod template_page;
pub mod title_page;

pub use annotation::AnnotationMutations;
pub use book::BookMutations;
pub use callout::CalloutMutations;
pub use callout_arrow::CalloutArrowMutations;
pub use csi::CsiMutations;
pub use divider::DividerMutations;
pub use document::DocumentMutations;
pub use inventory_page::InventoryPageMutations;
pub use item::ItemMutations;
pub use page::PageMutations;
pub use part::PartMutations;
pub use pli::PliMutations;
pub use pli_item::PliItemMutations;
pub use rotate_icon::RotateIconMutations;
pub use step::StepMutations;
pub use submodel::SubmodelMutations;
pub use submodel_image::SubmodelImageMutations;
pub use template_page::TemplatePageMutations;
pub use title_page::TitlePageMutations;

use crate::document::DocumentState;
use crate::store::Store;
use crate::types::{FolioError, ItemType, LookupKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Make the numbers of `items` consecutive from `start`.
///
/// The first numbered item gets `start`. Each later item keeps its number
/// when it already follows its predecessor, and gets predecessor + 1
/// otherwise. Items without a number are skipped. Running it twice is the
/// same as running it once.
pub fn renumber(state: &mut DocumentState, items: &[LookupKey], start: i64) {
    let mut prev: Option<i64> = None;
    for key in items {
        let Some(item) = state.entity_mut(*key) else {
            continue;
        };
        let Some(number) = item.number() else {
            continue;
        };
        let next = match prev {
            None => start,
            Some(p) if number.checked_sub(1) != Some(p) => p.saturating_add(1),
            Some(_) => number,
        };
        item.set_number(next);
        prev = Some(next);
    }
}

/// Flag the page holding `item` for the layout engine.
pub(crate) fn mark_page_for_layout(store: &mut Store, item: LookupKey) {
    let page = store.get().page_for_item(item).map(|p| p.id);
    if let Some(page) = page.and_then(|id| store.state_mut().pages.get_mut(id)) {
        page.needs_layout = true;
    }
}

/// Delete `key` through its own type's cascade, taking everything it owns
/// with it. Numbering is left to the caller.
pub(crate) fn delete_cascading(store: &mut Store, key: LookupKey) -> Result<(), FolioError> {
    let id = key.id;
    match key.item_type {
        ItemType::Annotation => AnnotationMutations::delete(store, &annotation::AnnotationRef { annotation: id }),
        ItemType::Book => BookMutations::delete(store, &book::BookRef { book: id }),
        ItemType::Callout => CalloutMutations::delete(store, &callout::CalloutRef { callout: id }),
        ItemType::CalloutArrow => {
            CalloutArrowMutations::delete(store, &callout_arrow::CalloutArrowRef { arrow: id })
        }
        ItemType::Csi => CsiMutations::delete(store, &csi::DeleteCsi { csi: id }),
        ItemType::Divider => DividerMutations::delete(store, &divider::DividerRef { divider: id }),
        ItemType::Page => PageMutations::delete(
            store,
            &page::DeletePage {
                page: id,
                delete_steps: true,
                do_not_renumber: true,
            },
        ),
        ItemType::Pli => PliMutations::delete(
            store,
            &pli::DeletePli {
                pli: id,
                delete_items: true,
            },
        ),
        ItemType::PliItem => PliItemMutations::delete(store, &pli_item::DeletePliItem { pli_item: id }),
        ItemType::RotateIcon => {
            RotateIconMutations::delete(store, &rotate_icon::DeleteRotateIcon { rotate_icon: id })
        }
        ItemType::Step => StepMutations::delete(
            store,
            &step::DeleteStep {
                step: id,
                delete_parts: true,
                do_not_renumber: true,
            },
        ),
        ItemType::SubmodelImage => {
            SubmodelImageMutations::delete(store, &submodel_image::SubmodelImageRef { submodel_image: id })
        }
        ItemType::NumberLabel | ItemType::Point | ItemType::QuantityLabel => {
            for child in store.state().owned_children(key) {
                delete_cascading(store, child)?;
            }
            store.state_mut().remove_item(key).map(|_| ())
        }
    }
}

// =============================================================================
// MUTATION AS DATA
// =============================================================================

/// Every named mutation with its options.
///
/// On the wire a mutation is `{"mutation": "step.add", "opts": {...}}`.
/// Operations without options omit `opts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mutation", content = "opts")]
pub enum Mutation {
    // item
    #[serde(rename = "item.add")]
    ItemAdd(item::AddItem),
    #[serde(rename = "item.delete")]
    ItemDelete(item::DeleteItem),
    #[serde(rename = "item.deleteChildList")]
    ItemDeleteChildList(item::DeleteChildList),
    #[serde(rename = "item.reparent")]
    ItemReparent(item::Reparent),
    #[serde(rename = "item.reposition")]
    ItemReposition(item::Reposition),

    // page
    #[serde(rename = "page.add")]
    PageAdd(page::AddPage),
    #[serde(rename = "page.delete")]
    PageDelete(page::DeletePage),
    #[serde(rename = "page.renumber")]
    PageRenumber,
    #[serde(rename = "page.setLocked")]
    PageSetLocked(page::SetLocked),
    #[serde(rename = "page.setLayout")]
    PageSetLayout(page::SetPageLayout),
    #[serde(rename = "page.markAllDirty")]
    PageMarkAllDirty,

    // step
    #[serde(rename = "step.add")]
    StepAdd(step::AddStep),
    #[serde(rename = "step.delete")]
    StepDelete(step::DeleteStep),
    #[serde(rename = "step.renumber")]
    StepRenumber(step::StepRef),
    #[serde(rename = "step.renumberAll")]
    StepRenumberAll,
    #[serde(rename = "step.moveToPage")]
    StepMoveToPage(step::MoveToPage),
    #[serde(rename = "step.moveToPreviousPage")]
    StepMoveToPreviousPage(step::StepRef),
    #[serde(rename = "step.moveToNextPage")]
    StepMoveToNextPage(step::StepRef),
    #[serde(rename = "step.mergeWithStep")]
    StepMergeWithStep(step::MergeWithStep),
    #[serde(rename = "step.stretchToPage")]
    StepStretchToPage(step::StretchToPage),
    #[serde(rename = "step.addCallout")]
    StepAddCallout(step::StepRef),
    #[serde(rename = "step.addSubStep")]
    StepAddSubStep(step::StepRef),
    #[serde(rename = "step.setSubStepLayout")]
    StepSetSubStepLayout(step::SetSubStepLayout),
    #[serde(rename = "step.toggleRotateIcon")]
    StepToggleRotateIcon(step::ToggleRotateIcon),
    #[serde(rename = "step.copyRotation")]
    StepCopyRotation(step::CopyRotation),
    #[serde(rename = "step.addPart")]
    StepAddPart(step::StepPart),
    #[serde(rename = "step.removePart")]
    StepRemovePart(step::StepPart),

    // csi
    #[serde(rename = "csi.add")]
    CsiAdd(csi::AddCsi),
    #[serde(rename = "csi.rotate")]
    CsiRotate(csi::RotateCsi),
    #[serde(rename = "csi.scale")]
    CsiScale(csi::ScaleCsi),
    #[serde(rename = "csi.resetSize")]
    CsiResetSize(csi::CsiRef),
    #[serde(rename = "csi.markAllDirty")]
    CsiMarkAllDirty,

    // pli
    #[serde(rename = "pli.add")]
    PliAdd(pli::AddPli),
    #[serde(rename = "pli.delete")]
    PliDelete(pli::DeletePli),
    #[serde(rename = "pli.empty")]
    PliEmpty(pli::PliRef),
    #[serde(rename = "pli.addPart")]
    PliAddPart(pli::PliPart),
    #[serde(rename = "pli.removePart")]
    PliRemovePart(pli::PliPart),
    #[serde(rename = "pli.toggleVisibility")]
    PliToggleVisibility(pli::SetPliVisibility),
    #[serde(rename = "pli.syncContent")]
    PliSyncContent(pli::PliRef),

    // pli item
    #[serde(rename = "pliItem.add")]
    PliItemAdd(pli_item::AddPliItem),
    #[serde(rename = "pliItem.delete")]
    PliItemDelete(pli_item::DeletePliItem),
    #[serde(rename = "pliItem.changeQuantity")]
    PliItemChangeQuantity(pli_item::ChangeQuantity),
    #[serde(rename = "pliItem.markAllDirty")]
    PliItemMarkAllDirty(pli_item::MarkPliItemsDirty),

    // callout
    #[serde(rename = "callout.add")]
    CalloutAdd(callout::AddCallout),
    #[serde(rename = "callout.delete")]
    CalloutDelete(callout::CalloutRef),
    #[serde(rename = "callout.addFirstStep")]
    CalloutAddFirstStep(callout::CalloutRef),
    #[serde(rename = "callout.addStep")]
    CalloutAddStep(callout::AddCalloutStep),
    #[serde(rename = "callout.setLayout")]
    CalloutSetLayout(callout::SetCalloutLayout),
    #[serde(rename = "callout.setPosition")]
    CalloutSetPosition(callout::SetCalloutPosition),

    // callout arrow
    #[serde(rename = "calloutArrow.add")]
    CalloutArrowAdd(callout_arrow::AddCalloutArrow),
    #[serde(rename = "calloutArrow.delete")]
    CalloutArrowDelete(callout_arrow::CalloutArrowRef),
    #[serde(rename = "calloutArrow.addPoint")]
    CalloutArrowAddPoint(callout_arrow::CalloutArrowRef),
    #[serde(rename = "calloutArrow.rotateTip")]
    CalloutArrowRotateTip(callout_arrow::RotateTip),

    // annotation
    #[serde(rename = "annotation.add")]
    AnnotationAdd(annotation::AddAnnotation),
    #[serde(rename = "annotation.set")]
    AnnotationSet(annotation::SetAnnotation),
    #[serde(rename = "annotation.delete")]
    AnnotationDelete(annotation::AnnotationRef),

    // divider
    #[serde(rename = "divider.add")]
    DividerAdd(divider::AddDivider),
    #[serde(rename = "divider.reposition")]
    DividerReposition(divider::RepositionDivider),
    #[serde(rename = "divider.setLength")]
    DividerSetLength(divider::SetDividerLength),
    #[serde(rename = "divider.delete")]
    DividerDelete(divider::DividerRef),

    // rotate icon
    #[serde(rename = "rotateIcon.add")]
    RotateIconAdd(rotate_icon::AddRotateIcon),
    #[serde(rename = "rotateIcon.delete")]
    RotateIconDelete(rotate_icon::DeleteRotateIcon),

    // part
    #[serde(rename = "part.displace")]
    PartDisplace(part::DisplacePart),
    #[serde(rename = "part.moveToStep")]
    PartMoveToStep(part::MoveToStep),
    #[serde(rename = "part.addToCallout")]
    PartAddToCallout(part::AddToCallout),
    #[serde(rename = "part.removeFromCallout")]
    PartRemoveFromCallout(part::PartInStep),
    #[serde(rename = "part.delete")]
    PartDelete(part::PartInStep),

    // submodel
    #[serde(rename = "submodelImage.add")]
    SubmodelImageAdd(submodel_image::AddSubmodelImage),
    #[serde(rename = "submodelImage.delete")]
    SubmodelImageDelete(submodel_image::SubmodelImageRef),
    #[serde(rename = "submodel.convertToCallout")]
    SubmodelConvertToCallout(submodel::ConvertToCallout),

    // book
    #[serde(rename = "book.add")]
    BookAdd(book::AddBook),
    #[serde(rename = "book.delete")]
    BookDelete(book::BookRef),
    #[serde(rename = "book.setBookPageNumbers")]
    BookSetBookPageNumbers(book::SetBookPageNumbers),
    #[serde(rename = "book.divideInstructions")]
    BookDivideInstructions(book::DivideInstructions),

    // special pages
    #[serde(rename = "templatePage.add")]
    TemplatePageAdd,
    #[serde(rename = "templatePage.set")]
    TemplatePageSet(template_page::SetTemplateEntry),
    #[serde(rename = "templatePage.load")]
    TemplatePageLoad(template_page::LoadTemplate),
    #[serde(rename = "templatePage.reset")]
    TemplatePageReset,
    #[serde(rename = "templatePage.setPageSize")]
    TemplatePageSetPageSize(template_page::SetPageSize),
    #[serde(rename = "titlePage.add")]
    TitlePageAdd,
    #[serde(rename = "titlePage.delete")]
    TitlePageDelete,
    #[serde(rename = "titlePage.addTitleLabel")]
    TitlePageAddTitleLabel(title_page::TitleLabel),
    #[serde(rename = "titlePage.addPageCountLabel")]
    TitlePageAddPageCountLabel(title_page::PageCountLabel),
    #[serde(rename = "inventoryPage.add")]
    InventoryPageAdd(inventory_page::AddInventoryPages),
    #[serde(rename = "inventoryPage.delete")]
    InventoryPageDelete(inventory_page::InventoryPageRef),
    #[serde(rename = "inventoryPage.deleteAll")]
    InventoryPageDeleteAll,
    #[serde(rename = "inventoryPage.addPart")]
    InventoryPageAddPart(inventory_page::InventoryPart),
    #[serde(rename = "inventoryPage.removePart")]
    InventoryPageRemovePart(inventory_page::InventoryPart),

    // document
    #[serde(rename = "sceneRendering.set")]
    SceneRenderingSet(document::SetSceneRendering),
    #[serde(rename = "sceneRendering.refreshAll")]
    SceneRenderingRefreshAll,
    #[serde(rename = "pliTransform.set")]
    PliTransformSet(document::SetPliTransform),
    #[serde(rename = "document.addInitialPages")]
    AddInitialPages(document::AddInitialPages),
    #[serde(rename = "document.addInitialSubmodelImages")]
    AddInitialSubmodelImages,
}

impl Mutation {
    /// Parse `{"mutation": ..., "opts": ...}`.
    ///
    /// # Errors
    ///
    /// `UnknownMutation` for a name no variant carries, and
    /// `DeserializationError` for malformed options.
    pub fn from_json(text: &str) -> Result<Self, FolioError> {
        serde_json::from_str(text).map_err(|err| {
            let message = err.to_string();
            if message.starts_with("unknown variant") {
                FolioError::UnknownMutation(message)
            } else {
                FolioError::from(err)
            }
        })
    }

    /// Wire name, e.g. `"step.add"`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::ItemAdd(_) => "item.add",
            Mutation::ItemDelete(_) => "item.delete",
            Mutation::ItemDeleteChildList(_) => "item.deleteChildList",
            Mutation::ItemReparent(_) => "item.reparent",
            Mutation::ItemReposition(_) => "item.reposition",
            Mutation::PageAdd(_) => "page.add",
            Mutation::PageDelete(_) => "page.delete",
            Mutation::PageRenumber => "page.renumber",
            Mutation::PageSetLocked(_) => "page.setLocked",
            Mutation::PageSetLayout(_) => "page.setLayout",
            Mutation::PageMarkAllDirty => "page.markAllDirty",
            Mutation::StepAdd(_) => "step.add",
            Mutation::StepDelete(_) => "step.delete",
            Mutation::StepRenumber(_) => "step.renumber",
            Mutation::StepRenumberAll => "step.renumberAll",
            Mutation::StepMoveToPage(_) => "step.moveToPage",
            Mutation::StepMoveToPreviousPage(_) => "step.moveToPreviousPage",
            Mutation::StepMoveToNextPage(_) => "step.moveToNextPage",
            Mutation::StepMergeWithStep(_) => "step.mergeWithStep",
            Mutation::StepStretchToPage(_) => "step.stretchToPage",
            Mutation::StepAddCallout(_) => "step.addCallout",
            Mutation::StepAddSubStep(_) => "step.addSubStep",
            Mutation::StepSetSubStepLayout(_) => "step.setSubStepLayout",
            Mutation::StepToggleRotateIcon(_) => "step.toggleRotateIcon",
            Mutation::StepCopyRotation(_) => "step.copyRotation",
            Mutation::StepAddPart(_) => "step.addPart",
            Mutation::StepRemovePart(_) => "step.removePart",
            Mutation::CsiAdd(_) => "csi.add",
            Mutation::CsiRotate(_) => "csi.rotate",
            Mutation::CsiScale(_) => "csi.scale",
            Mutation::CsiResetSize(_) => "csi.resetSize",
            Mutation::CsiMarkAllDirty => "csi.markAllDirty",
            Mutation::PliAdd(_) => "pli.add",
            Mutation::PliDelete(_) => "pli.delete",
            Mutation::PliEmpty(_) => "pli.empty",
            Mutation::PliAddPart(_) => "pli.addPart",
            Mutation::PliRemovePart(_) => "pli.removePart",
            Mutation::PliToggleVisibility(_) => "pli.toggleVisibility",
            Mutation::PliSyncContent(_) => "pli.syncContent",
            Mutation::PliItemAdd(_) => "pliItem.add",
            Mutation::PliItemDelete(_) => "pliItem.delete",
            Mutation::PliItemChangeQuantity(_) => "pliItem.changeQuantity",
            Mutation::PliItemMarkAllDirty(_) => "pliItem.markAllDirty",
            Mutation::CalloutAdd(_) => "callout.add",
            Mutation::CalloutDelete(_) => "callout.delete",
            Mutation::CalloutAddFirstStep(_) => "callout.addFirstStep",
            Mutation::CalloutAddStep(_) => "callout.addStep",
            Mutation::CalloutSetLayout(_) => "callout.setLayout",
            Mutation::CalloutSetPosition(_) => "callout.setPosition",
            Mutation::CalloutArrowAdd(_) => "calloutArrow.add",
            Mutation::CalloutArrowDelete(_) => "calloutArrow.delete",
            Mutation::CalloutArrowAddPoint(_) => "calloutArrow.addPoint",
            Mutation::CalloutArrowRotateTip(_) => "calloutArrow.rotateTip",
            Mutation::AnnotationAdd(_) => "annotation.add",
            Mutation::AnnotationSet(_) => "annotation.set",
            Mutation::AnnotationDelete(_) => "annotation.delete",
            Mutation::DividerAdd(_) => "divider.add",
            Mutation::DividerReposition(_) => "divider.reposition",
            Mutation::DividerSetLength(_) => "divider.setLength",
            Mutation::DividerDelete(_) => "divider.delete",
            Mutation::RotateIconAdd(_) => "rotateIcon.add",
            Mutation::RotateIconDelete(_) => "rotateIcon.delete",
            Mutation::PartDisplace(_) => "part.displace",
            Mutation::PartMoveToStep(_) => "part.moveToStep",
            Mutation::PartAddToCallout(_) => "part.addToCallout",
            Mutation::PartRemoveFromCallout(_) => "part.removeFromCallout",
            Mutation::PartDelete(_) => "part.delete",
            Mutation::SubmodelImageAdd(_) => "submodelImage.add",
            Mutation::SubmodelImageDelete(_) => "submodelImage.delete",
            Mutation::SubmodelConvertToCallout(_) => "submodel.convertToCallout",
            Mutation::BookAdd(_) => "book.add",
            Mutation::BookDelete(_) => "book.delete",
            Mutation::BookSetBookPageNumbers(_) => "book.setBookPageNumbers",
            Mutation::BookDivideInstructions(_) => "book.divideInstructions",
            Mutation::TemplatePageAdd => "templatePage.add",
            Mutation::TemplatePageSet(_) => "templatePage.set",
            Mutation::TemplatePageLoad(_) => "templatePage.load",
            Mutation::TemplatePageReset => "templatePage.reset",
            Mutation::TemplatePageSetPageSize(_) => "templatePage.setPageSize",
            Mutation::TitlePageAdd => "titlePage.add",
            Mutation::TitlePageDelete => "titlePage.delete",
            Mutation::TitlePageAddTitleLabel(_) => "titlePage.addTitleLabel",
            Mutation::TitlePageAddPageCountLabel(_) => "titlePage.addPageCountLabel",
            Mutation::InventoryPageAdd(_) => "inventoryPage.add",
            Mutation::InventoryPageDelete(_) => "inventoryPage.delete",
            Mutation::InventoryPageDeleteAll => "inventoryPage.deleteAll",
            Mutation::InventoryPageAddPart(_) => "inventoryPage.addPart",
            Mutation::InventoryPageRemovePart(_) => "inventoryPage.removePart",
            Mutation::SceneRenderingSet(_) => "sceneRendering.set",
            Mutation::SceneRenderingRefreshAll => "sceneRendering.refreshAll",
            Mutation::PliTransformSet(_) => "pliTransform.set",
            Mutation::AddInitialPages(_) => "document.addInitialPages",
            Mutation::AddInitialSubmodelImages => "document.addInitialSubmodelImages",
        }
    }

    /// Run the mutation. Returns the created item when there is one; for
    /// operations creating several, the first.
    pub fn apply(&self, store: &mut Store) -> Result<Option<LookupKey>, FolioError> {
        debug!(mutation = self.name(), "apply");
        match self {
            Mutation::ItemAdd(o) => ItemMutations::add_blank(store, o).map(Some),
            Mutation::ItemDelete(o) => ItemMutations::delete(store, o).map(|_| None),
            Mutation::ItemDeleteChildList(o) => ItemMutations::delete_child_list(store, o).map(|()| None),
            Mutation::ItemReparent(o) => ItemMutations::reparent(store, o).map(|_| None),
            Mutation::ItemReposition(o) => ItemMutations::reposition(store, o).map(|()| None),

            Mutation::PageAdd(o) => PageMutations::add(store, o).map(Some),
            Mutation::PageDelete(o) => PageMutations::delete(store, o).map(|()| None),
            Mutation::PageRenumber => {
                PageMutations::renumber(store);
                Ok(None)
            }
            Mutation::PageSetLocked(o) => {
                PageMutations::set_locked(store, o);
                Ok(None)
            }
            Mutation::PageSetLayout(o) => {
                PageMutations::set_layout(store, o);
                Ok(None)
            }
            Mutation::PageMarkAllDirty => {
                PageMutations::mark_all_dirty(store);
                Ok(None)
            }

            Mutation::StepAdd(o) => StepMutations::add(store, o).map(Some),
            Mutation::StepDelete(o) => StepMutations::delete(store, o).map(|()| None),
            Mutation::StepRenumber(o) => {
                StepMutations::renumber(store, o);
                Ok(None)
            }
            Mutation::StepRenumberAll => {
                StepMutations::renumber_all(store);
                Ok(None)
            }
            Mutation::StepMoveToPage(o) => StepMutations::move_to_page(store, o).map(|()| None),
            Mutation::StepMoveToPreviousPage(o) => StepMutations::move_to_previous_page(store, o).map(|()| None),
            Mutation::StepMoveToNextPage(o) => StepMutations::move_to_next_page(store, o).map(|()| None),
            Mutation::StepMergeWithStep(o) => StepMutations::merge_with_step(store, o).map(|()| None),
            Mutation::StepStretchToPage(o) => {
                StepMutations::stretch_to_page(store, o);
                Ok(None)
            }
            Mutation::StepAddCallout(o) => StepMutations::add_callout(store, o),
            Mutation::StepAddSubStep(o) => StepMutations::add_sub_step(store, o),
            Mutation::StepSetSubStepLayout(o) => {
                StepMutations::set_sub_step_layout(store, o);
                Ok(None)
            }
            Mutation::StepToggleRotateIcon(o) => StepMutations::toggle_rotate_icon(store, o).map(|()| None),
            Mutation::StepCopyRotation(o) => {
                StepMutations::copy_rotation(store, o);
                Ok(None)
            }
            Mutation::StepAddPart(o) => StepMutations::add_part(store, o).map(|()| None),
            Mutation::StepRemovePart(o) => StepMutations::remove_part(store, o).map(|()| None),

            Mutation::CsiAdd(o) => CsiMutations::add(store, o.parent).map(Some),
            Mutation::CsiRotate(o) => CsiMutations::rotate(store, o).map(|()| None),
            Mutation::CsiScale(o) => {
                CsiMutations::scale(store, o);
                Ok(None)
            }
            Mutation::CsiResetSize(o) => {
                CsiMutations::reset_size(store, o.csi);
                Ok(None)
            }
            Mutation::CsiMarkAllDirty => {
                CsiMutations::mark_all_dirty(store);
                Ok(None)
            }

            Mutation::PliAdd(o) => PliMutations::add(store, o).map(Some),
            Mutation::PliDelete(o) => PliMutations::delete(store, o).map(|()| None),
            Mutation::PliEmpty(o) => PliMutations::empty(store, o).map(|()| None),
            Mutation::PliAddPart(o) => PliMutations::add_part(store, o).map(|()| None),
            Mutation::PliRemovePart(o) => PliMutations::remove_part(store, o).map(|()| None),
            Mutation::PliToggleVisibility(o) => {
                PliMutations::toggle_visibility(store, o);
                Ok(None)
            }
            Mutation::PliSyncContent(o) => PliMutations::sync_content(store, o).map(|()| None),

            Mutation::PliItemAdd(o) => PliItemMutations::add(store, o).map(Some),
            Mutation::PliItemDelete(o) => PliItemMutations::delete(store, o).map(|()| None),
            Mutation::PliItemChangeQuantity(o) => {
                PliItemMutations::change_quantity(store, o);
                Ok(None)
            }
            Mutation::PliItemMarkAllDirty(o) => {
                PliItemMutations::mark_all_dirty(store, o);
                Ok(None)
            }

            Mutation::CalloutAdd(o) => CalloutMutations::add(store, o).map(Some),
            Mutation::CalloutDelete(o) => CalloutMutations::delete(store, o).map(|()| None),
            Mutation::CalloutAddFirstStep(o) => CalloutMutations::add_first_step(store, o),
            Mutation::CalloutAddStep(o) => CalloutMutations::add_step(store, o),
            Mutation::CalloutSetLayout(o) => {
                CalloutMutations::set_layout(store, o);
                Ok(None)
            }
            Mutation::CalloutSetPosition(o) => {
                CalloutMutations::set_position(store, o);
                Ok(None)
            }

            Mutation::CalloutArrowAdd(o) => CalloutArrowMutations::add(store, o).map(Some),
            Mutation::CalloutArrowDelete(o) => CalloutArrowMutations::delete(store, o).map(|()| None),
            Mutation::CalloutArrowAddPoint(o) => CalloutArrowMutations::add_point(store, o),
            Mutation::CalloutArrowRotateTip(o) => {
                CalloutArrowMutations::rotate_tip(store, o);
                Ok(None)
            }

            Mutation::AnnotationAdd(o) => AnnotationMutations::add(store, o).map(Some),
            Mutation::AnnotationSet(o) => {
                AnnotationMutations::set(store, o);
                Ok(None)
            }
            Mutation::AnnotationDelete(o) => AnnotationMutations::delete(store, o).map(|()| None),

            Mutation::DividerAdd(o) => DividerMutations::add(store, o).map(Some),
            Mutation::DividerReposition(o) => {
                DividerMutations::reposition(store, o);
                Ok(None)
            }
            Mutation::DividerSetLength(o) => {
                DividerMutations::set_length(store, o);
                Ok(None)
            }
            Mutation::DividerDelete(o) => DividerMutations::delete(store, o).map(|()| None),

            Mutation::RotateIconAdd(o) => RotateIconMutations::add(store, o).map(Some),
            Mutation::RotateIconDelete(o) => RotateIconMutations::delete(store, o).map(|()| None),

            Mutation::PartDisplace(o) => {
                PartMutations::displace(store, o);
                Ok(None)
            }
            Mutation::PartMoveToStep(o) => PartMutations::move_to_step(store, o).map(|()| None),
            Mutation::PartAddToCallout(o) => PartMutations::add_to_callout(store, o).map(|()| None),
            Mutation::PartRemoveFromCallout(o) => {
                PartMutations::remove_from_callout(store, o);
                Ok(None)
            }
            Mutation::PartDelete(o) => PartMutations::delete(store, o).map(|()| None),

            Mutation::SubmodelImageAdd(o) => SubmodelImageMutations::add(store, o).map(Some),
            Mutation::SubmodelImageDelete(o) => SubmodelImageMutations::delete(store, o).map(|()| None),
            Mutation::SubmodelConvertToCallout(o) => SubmodelMutations::convert_to_callout(store, o),

            Mutation::BookAdd(o) => BookMutations::add(store, o).map(Some),
            Mutation::BookDelete(o) => BookMutations::delete(store, o).map(|()| None),
            Mutation::BookSetBookPageNumbers(o) => BookMutations::set_book_page_numbers(store, o).map(|()| None),
            Mutation::BookDivideInstructions(o) => {
                BookMutations::divide_instructions(store, o).map(|books| books.first().copied())
            }

            Mutation::TemplatePageAdd => TemplatePageMutations::add(store).map(Some),
            Mutation::TemplatePageSet(o) => TemplatePageMutations::set(store, o).map(|()| None),
            Mutation::TemplatePageLoad(o) => {
                TemplatePageMutations::load(store, o);
                Ok(None)
            }
            Mutation::TemplatePageReset => {
                TemplatePageMutations::reset(store);
                Ok(None)
            }
            Mutation::TemplatePageSetPageSize(o) => {
                TemplatePageMutations::set_page_size(store, o);
                Ok(None)
            }
            Mutation::TitlePageAdd => TitlePageMutations::add(store).map(|pages| pages.first().copied()),
            Mutation::TitlePageDelete => TitlePageMutations::delete(store).map(|()| None),
            Mutation::TitlePageAddTitleLabel(o) => TitlePageMutations::add_title_label(store, o).map(Some),
            Mutation::TitlePageAddPageCountLabel(o) => {
                TitlePageMutations::add_page_count_label(store, o).map(Some)
            }
            Mutation::InventoryPageAdd(o) => {
                InventoryPageMutations::add(store, o).map(|pages| pages.first().copied())
            }
            Mutation::InventoryPageDelete(o) => InventoryPageMutations::delete(store, o).map(|()| None),
            Mutation::InventoryPageDeleteAll => InventoryPageMutations::delete_all(store).map(|()| None),
            Mutation::InventoryPageAddPart(o) => InventoryPageMutations::add_part(store, o).map(|()| None),
            Mutation::InventoryPageRemovePart(o) => InventoryPageMutations::remove_part(store, o).map(|()| None),

            Mutation::SceneRenderingSet(o) => {
                DocumentMutations::set_scene_rendering(store, o);
                Ok(None)
            }
            Mutation::SceneRenderingRefreshAll => {
                DocumentMutations::refresh_all(store);
                Ok(None)
            }
            Mutation::PliTransformSet(o) => {
                DocumentMutations::set_pli_transform(store, o);
                Ok(None)
            }
            Mutation::AddInitialPages(o) => DocumentMutations::add_initial_pages(store, o)
                .map(|pages| pages.first().map(|id| LookupKey::new(ItemType::Page, *id))),
            Mutation::AddInitialSubmodelImages => {
                DocumentMutations::add_initial_submodel_images(store).map(|images| images.first().copied())
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
