//! Table walk: resolves a table drawable's model, its tiles, and emits
//! the `table-begin` / `row-begin` / `cell` / `row-end` / `table-end`
//! event sequence. A rich-text cell's referenced storage is traversed
//! immediately afterward as inline content rather than a nested paragraph
//! stream.

use crate::cell::{self, CellTables, CellValue};
use crate::engine::Engine;
use crate::engine::drawable::table_info;
use crate::engine::text;
use crate::error::Result;
use crate::object_store::Reference;
use crate::protos::tst;
use crate::visitor::Visitor;

/// Visit the table rooted at `id`, emitting its full row/cell stream. A
/// table whose model record doesn't resolve is skipped entirely (no
/// `table-begin` is emitted without a model to describe it).
pub(crate) async fn visit<V: Visitor>(engine: &Engine<'_>, visitor: &mut V, id: u64) -> Result<()> {
    let Some(model) = engine.store.get::<tst::TableModelArchive>(id) else { return Ok(()) };

    let info = table_info(engine, id, &model);
    visitor.table_begin(&info).await?;

    let rich_text: Vec<Reference> = model.rich_text_table.iter().map(|r| Reference::from(r.identifier)).collect();
    let tables = CellTables {
        strings: &model.strings_table,
        rich_text: &rich_text,
        number_formats: &model.number_format_table,
        currency_formats: &model.currency_format_table,
    };

    for tile_ref in &model.tiles {
        let Some(store) = engine.store.deref::<tst::TableDataStore>(Reference::from(tile_ref.identifier)) else {
            continue;
        };
        let Some(tile) = store.tile else { continue };

        for row in &tile.rows {
            visitor.row_begin(row.row_index).await?;
            let buf = row.packed_cell_data.as_deref().unwrap_or(&[]);

            for column in 0..info.column_count {
                let offset = row.cell_offsets.get(column as usize).copied().unwrap_or(u32::MAX);
                let decoded = if offset == u32::MAX || offset == 0xFFFF {
                    cell::Cell { value: CellValue::Empty, metadata: Default::default() }
                } else {
                    cell::decode(buf, offset as usize, &tables)
                };

                visitor.cell(column, &decoded).await?;

                if let CellValue::RichText(reference) = decoded.value {
                    Box::pin(text::traverse_storage_inline(engine, visitor, reference.identifier)).await?;
                }
            }

            visitor.row_end().await?;
        }
    }

    visitor.table_end().await
}
