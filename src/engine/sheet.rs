//! Spreadsheet (Numbers) traversal: sheets in declaration order, each
//! contributing its tables and other floating drawables in spatial
//! reading order (not z-order).

use crate::engine::Engine;
use crate::engine::drawable;
use crate::error::Result;
use crate::object_store::Reference;
use crate::protos::{tn, tsd};
use crate::visitor::{DocumentType, PageSettings, Visitor};

pub(crate) async fn traverse<V: Visitor>(engine: &Engine<'_>, visitor: &mut V, document: &tn::DocumentArchive) -> Result<()> {
    visitor.document_begin(DocumentType::Numbers, PageSettings::default()).await?;

    for sheet_ref in &document.sheets {
        let Some(sheet) = engine.store.deref::<tn::SheetArchive>(Reference::from(sheet_ref.identifier)) else { continue };

        visitor.sheet_begin(sheet.name.as_deref().unwrap_or("")).await?;

        let ids: Vec<u64> = match &sheet.drawable_order {
            Some(order_ref) => engine
                .store
                .deref::<tsd::DrawableOrderArchive>(Reference::from(order_ref.identifier))
                .map(|order| order.drawables.iter().map(|r| r.identifier).collect())
                .unwrap_or_else(|| sheet.tables.iter().map(|r| r.identifier).collect()),
            None => sheet.tables.iter().map(|r| r.identifier).collect(),
        };

        for id in drawable::spatial_order(engine, &ids) {
            drawable::visit_floating(engine, visitor, id).await?;
        }

        visitor.sheet_end().await?;
    }

    visitor.document_end().await
}
