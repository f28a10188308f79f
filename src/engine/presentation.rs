//! Presentation (Keynote) traversal: slides enumerated from the package's
//! "Slide"-locator components in ascending identifier order, each
//! contributing its drawables in spatial reading order.

use crate::engine::Engine;
use crate::engine::ListCounters;
use crate::engine::drawable;
use crate::engine::text;
use crate::error::Result;
use crate::object_store::Reference;
use crate::protos::{kn, tsd};
use crate::registry::DrawableKind;
use crate::visitor::{DocumentType, PageSettings, Visitor};

/// Visit a slide's `body_storage` reference, which names either a
/// drawable (placeholder/shape) or, per its field name, a bare text
/// `StorageArchive`. The type code decides which: a drawable dispatches
/// through the usual floating-drawable path, anything else is walked
/// directly as paragraph-structured text so the body's paragraphs still
/// reach the visitor.
async fn visit_body_storage<V: Visitor>(engine: &Engine<'_>, visitor: &mut V, id: u64) -> Result<()> {
    match engine.store.type_code_of(id).and_then(DrawableKind::from_type_code) {
        Some(_) => drawable::visit_floating(engine, visitor, id).await,
        None => text::traverse_storage(engine, visitor, id, &mut ListCounters::new()).await,
    }
}

pub(crate) async fn traverse<V: Visitor>(engine: &Engine<'_>, visitor: &mut V, show: &kn::ShowArchive) -> Result<()> {
    let bounds = show.slide_size.as_ref().map(crate::path::Size::from).unwrap_or_default();

    visitor.document_begin(DocumentType::Keynote, PageSettings { page_size: bounds }).await?;

    for (index, slide_id) in engine.metadata.slide_identifiers().into_iter().enumerate() {
        let Some(slide) = engine.store.get::<kn::SlideArchive>(slide_id) else { continue };

        visitor.slide_begin(index as u32, bounds).await?;

        // Title and body are dedicated placeholder references distinct
        // from the slide's z-ordered drawable list; visit them first so
        // a slide's headline content precedes its body in document order.
        if let Some(title_ref) = &slide.title_placeholder {
            drawable::visit_floating(engine, visitor, title_ref.identifier).await?;
        }
        if let Some(body_ref) = &slide.body_storage {
            visit_body_storage(engine, visitor, body_ref.identifier).await?;
        }

        if let Some(order_ref) = &slide.drawable_order
            && let Some(order) = engine.store.deref::<tsd::DrawableOrderArchive>(Reference::from(order_ref.identifier))
        {
            let ids: Vec<u64> = order.drawables.iter().map(|r| r.identifier).collect();
            for id in drawable::spatial_order(engine, &ids) {
                drawable::visit_floating(engine, visitor, id).await?;
            }
        }

        visitor.slide_end().await?;
    }

    visitor.document_end().await
}
