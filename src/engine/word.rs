//! Word-processor (Pages) traversal: sections in declaration order, each
//! contributing its page-template background drawables and placeholders,
//! then its body storage, then its own floating drawables in z-order
//! (spec §4.G); falls back to the document's own body storage when there
//! are no sections at all.

use crate::engine::Engine;
use crate::engine::ListCounters;
use crate::engine::drawable;
use crate::engine::text;
use crate::error::Result;
use crate::protos::{tp, tsd};
use crate::visitor::{DocumentType, PageSettings, Visitor};

pub(crate) async fn traverse<V: Visitor>(engine: &Engine<'_>, visitor: &mut V, document: &tp::DocumentArchive) -> Result<()> {
    visitor.document_begin(DocumentType::Pages, PageSettings::default()).await?;

    if document.sections.is_empty() {
        if let Some(storage) = &document.body_storage {
            visitor.pages_body_begin().await?;
            text::traverse_storage(engine, visitor, storage.identifier, &mut ListCounters::new()).await?;
            visitor.pages_body_end().await?;
        }
    } else {
        for section in &document.sections {
            visitor.pages_body_begin().await?;

            if let Some(template_ref) = &section.page_template_drawables
                && let Some(order) = engine.store.deref::<tsd::DrawableOrderArchive>(crate::object_store::Reference::from(template_ref.identifier))
            {
                for drawable_ref in &order.drawables {
                    drawable::visit_floating(engine, visitor, drawable_ref.identifier).await?;
                }
            }

            if let Some(storage) = &section.storage {
                text::traverse_storage(engine, visitor, storage.identifier, &mut ListCounters::new()).await?;
            }

            if let Some(order_ref) = &section.drawable_order
                && let Some(order) = engine.store.deref::<tsd::DrawableOrderArchive>(crate::object_store::Reference::from(order_ref.identifier))
            {
                for drawable_ref in &order.drawables {
                    drawable::visit_floating(engine, visitor, drawable_ref.identifier).await?;
                }
            }

            visitor.pages_body_end().await?;
        }
    }

    visitor.document_end().await
}
