//! Storage (paragraph/run) traversal: partitions a text storage's
//! character range into paragraphs, merges text runs with attachments
//! and footnote markers in document order, and drives list-counter /
//! hyperlink bookkeeping around the merge.

use crate::engine::Engine;
use crate::engine::ListCounters;
use crate::engine::drawable;
use crate::error::Result;
use crate::object_store::Reference;
use crate::protos::tswp;
use crate::style::{self, CharacterStyle, ParagraphStyle};
use crate::visitor::{InlineElement, TextRun, Visitor};

struct AttrEntry {
    start: u32,
    object: Option<Reference>,
}

fn attr_entries(table: &[tswp::AttrTableEntry]) -> Vec<AttrEntry> {
    table
        .iter()
        .map(|e| AttrEntry { start: e.start_index, object: e.object.as_ref().map(|r| Reference::from(r.identifier)) })
        .collect()
}

/// The style entry whose range covers `index`: the last entry whose
/// `start` is `<= index`.
fn active_entry(entries: &[AttrEntry], index: u32) -> Option<&AttrEntry> {
    entries.iter().rev().find(|e| e.start <= index)
}

fn next_boundary_after(entries: &[AttrEntry], index: u32) -> Option<u32> {
    entries.iter().map(|e| e.start).filter(|&s| s > index).min()
}

/// The list nesting depth for the paragraph starting at `start`: taken
/// from the `paragraph_data` attribute table entry covering that
/// position (spec §4.G.1), falling back to the resolved paragraph
/// style's own `list_level` when the table has no covering entry or the
/// entry's object fails to resolve.
fn paragraph_list_level(
    engine: &Engine<'_>,
    paragraph_data_entries: &[AttrEntry],
    start: u32,
    paragraph_style: &ParagraphStyle,
) -> u32 {
    active_entry(paragraph_data_entries, start)
        .and_then(|entry| entry.object)
        .and_then(|r| engine.store.get::<tswp::ParagraphDataArchive>(r.identifier))
        .and_then(|data| data.list_level)
        .unwrap_or(paragraph_style.list_level)
}

struct Hyperlink {
    position: u32,
    url: String,
}

struct SmartField {
    position: u32,
    kind: u32,
}

/// Traverse `storage_id` as a full, paragraph-structured body (a
/// document's body storage, a section storage, or a shape's contained
/// text). Emits `list-*` / `paragraph-*` boundary events around the
/// per-paragraph merge stream.
pub(crate) async fn traverse_storage<V: Visitor>(
    engine: &Engine<'_>,
    visitor: &mut V,
    storage_id: u64,
    counters: &mut ListCounters,
) -> Result<()> {
    let Some(storage) = engine.store.get::<tswp::StorageArchive>(storage_id) else { return Ok(()) };
    let chars: Vec<char> = storage.text.as_deref().unwrap_or("").chars().collect();
    let total = chars.len() as u32;

    let mut paragraph_entries = attr_entries(&storage.paragraph_styles);
    if paragraph_entries.is_empty() {
        paragraph_entries.push(AttrEntry { start: 0, object: None });
    }

    let paragraph_data_entries = attr_entries(&storage.paragraph_data);
    let character_entries = attr_entries(&storage.character_styles);
    let attachments: Vec<(u32, Reference)> = storage
        .attachments
        .iter()
        .filter_map(|a| a.drawable.as_ref().map(|r| (a.character_index, Reference::from(r.identifier))))
        .collect();
    let footnotes: Vec<u32> = storage.footnotes.iter().map(|f| f.character_index).collect();
    let hyperlinks: Vec<Hyperlink> = storage
        .smart_fields
        .iter()
        .filter(|f| f.kind.unwrap_or(0) == 0)
        .filter_map(|f| f.url.clone().map(|url| Hyperlink { position: f.character_index, url }))
        .collect();
    let smart_fields: Vec<SmartField> = storage
        .smart_fields
        .iter()
        .filter(|f| f.kind.unwrap_or(0) != 0)
        .map(|f| SmartField { position: f.character_index, kind: f.kind.unwrap_or(0) })
        .collect();

    let mut in_list = false;

    for (i, entry) in paragraph_entries.iter().enumerate() {
        let start = entry.start;
        let end = paragraph_entries.get(i + 1).map(|e| e.start).unwrap_or(total);

        let paragraph_style = entry.object.map(|r| style::resolve_paragraph_style(engine.store, r.identifier)).unwrap_or_default();
        let list_level = paragraph_list_level(engine, &paragraph_data_entries, start, &paragraph_style);
        let list_style = paragraph_style.list_style.map(|r| style::resolve_list_style(engine.store, r.identifier));
        let label = list_style.as_ref().and_then(|ls| ls.level(list_level)).map(|l| l.label_kind);
        let is_list_item = label.map(|k| k.is_list()).unwrap_or(false);

        if is_list_item {
            if !in_list {
                visitor.list_begin().await?;
                in_list = true;
            }
            let style_identity = paragraph_style.list_style.map(|r| r.identifier).unwrap_or(0);
            let number = counters.next(list_level, style_identity);
            visitor.list_item_begin(number).await?;
            visitor.paragraph_begin(&paragraph_style).await?;
            emit_merge(
                engine,
                visitor,
                &chars,
                start,
                end,
                &character_entries,
                &attachments,
                &footnotes,
                &hyperlinks,
                &smart_fields,
                &paragraph_style,
            )
            .await?;
            visitor.paragraph_end().await?;
            visitor.list_item_end().await?;
        } else {
            if in_list {
                visitor.list_end().await?;
                in_list = false;
                counters.clear();
            }
            visitor.paragraph_begin(&paragraph_style).await?;
            emit_merge(
                engine,
                visitor,
                &chars,
                start,
                end,
                &character_entries,
                &attachments,
                &footnotes,
                &hyperlinks,
                &smart_fields,
                &paragraph_style,
            )
            .await?;
            visitor.paragraph_end().await?;
        }
    }

    if in_list {
        visitor.list_end().await?;
        counters.clear();
    }

    Ok(())
}

/// Traverse `storage_id` as unstructured inline content (a rich-text
/// table cell): the same run/attachment/footnote merge as a paragraph,
/// but without `paragraph-begin`/`paragraph-end` wrapping, since the
/// content isn't organized into paragraphs at all.
pub(crate) async fn traverse_storage_inline<V: Visitor>(engine: &Engine<'_>, visitor: &mut V, storage_id: u64) -> Result<()> {
    let Some(storage) = engine.store.get::<tswp::StorageArchive>(storage_id) else { return Ok(()) };
    let chars: Vec<char> = storage.text.as_deref().unwrap_or("").chars().collect();
    let total = chars.len() as u32;

    let character_entries = attr_entries(&storage.character_styles);
    let attachments: Vec<(u32, Reference)> = storage
        .attachments
        .iter()
        .filter_map(|a| a.drawable.as_ref().map(|r| (a.character_index, Reference::from(r.identifier))))
        .collect();
    let footnotes: Vec<u32> = storage.footnotes.iter().map(|f| f.character_index).collect();
    let hyperlinks: Vec<Hyperlink> = storage
        .smart_fields
        .iter()
        .filter(|f| f.kind.unwrap_or(0) == 0)
        .filter_map(|f| f.url.clone().map(|url| Hyperlink { position: f.character_index, url }))
        .collect();
    let smart_fields: Vec<SmartField> = storage
        .smart_fields
        .iter()
        .filter(|f| f.kind.unwrap_or(0) != 0)
        .map(|f| SmartField { position: f.character_index, kind: f.kind.unwrap_or(0) })
        .collect();

    emit_merge(
        engine,
        visitor,
        &chars,
        0,
        total,
        &character_entries,
        &attachments,
        &footnotes,
        &hyperlinks,
        &smart_fields,
        &ParagraphStyle::default(),
    )
    .await
}

#[allow(clippy::too_many_arguments)]
async fn emit_merge<V: Visitor>(
    engine: &Engine<'_>,
    visitor: &mut V,
    chars: &[char],
    start: u32,
    end: u32,
    character_entries: &[AttrEntry],
    attachments: &[(u32, Reference)],
    footnotes: &[u32],
    hyperlinks: &[Hyperlink],
    smart_fields: &[SmartField],
    paragraph_style: &ParagraphStyle,
) -> Result<()> {
    let default_character_style = style::resolve_paragraph_default_character_style(engine.store, paragraph_style);
    let mut idx = start;

    while idx < end {
        if let Some(&(_, drawable)) = attachments.iter().find(|(pos, _)| *pos == idx) {
            // Attachments may themselves be shapes or tables whose content
            // recurses back into storage traversal; box the call to keep
            // the mutually-recursive future a fixed size.
            Box::pin(drawable::visit_attachment(engine, visitor, drawable.identifier)).await?;
            idx += 1;
            continue;
        }

        if footnotes.iter().any(|&pos| pos == idx) {
            visitor.inline_element(InlineElement::FootnoteMarker).await?;
        }
        if let Some(field) = smart_fields.iter().find(|f| f.position == idx) {
            visitor.inline_element(InlineElement::SmartField { kind: field.kind }).await?;
        }

        let mut run_end = end;
        if let Some(next) = next_boundary_after(character_entries, idx) {
            run_end = run_end.min(next);
        }
        if let Some(next) = attachments.iter().map(|(pos, _)| *pos).filter(|&p| p > idx).min() {
            run_end = run_end.min(next);
        }
        if let Some(next) = footnotes.iter().copied().filter(|&p| p > idx).min() {
            run_end = run_end.min(next);
        }
        if let Some(next) = smart_fields.iter().map(|f| f.position).filter(|&p| p > idx).min() {
            run_end = run_end.min(next);
        }
        run_end = run_end.max(idx + 1);

        let style: CharacterStyle = match active_entry(character_entries, idx) {
            Some(entry) => entry
                .object
                .map(|r| style::resolve_character_style(engine.store, r.identifier))
                .unwrap_or_else(|| default_character_style.clone()),
            None => default_character_style.clone(),
        };

        let hyperlink = hyperlinks.iter().find(|h| h.position >= idx && h.position < run_end).map(|h| h.url.clone());

        let text: String = chars[idx as usize..run_end as usize].iter().collect();
        visitor
            .inline_element(InlineElement::Text(TextRun { text, style, hyperlink }))
            .await?;

        idx = run_end;
    }

    Ok(())
}
