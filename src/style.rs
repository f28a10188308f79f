//! Style resolver (component E): walks parent-pointer style chains and
//! projects them into normalized, caller-friendly style values.
//!
//! Every style archive kind (paragraph, character, cell, media) carries an
//! optional `parent` reference. Resolving a style means following that
//! chain from the requested record up to its root, then applying each
//! level's set fields from general (root) to specific (leaf) — the leaf's
//! value for a field wins, and a field never set anywhere is left absent
//! so the caller can supply its own runtime default (spec §4.E).

use std::collections::HashSet;

use crate::object_store::{ObjectStore, Reference};
use crate::protos::{tsp, tswp};
use crate::registry::DecodableRecord;

/// Walks a style archive's `parent` chain, stopping at the first repeated
/// identifier (spec §9's cycle guard) rather than looping forever on a
/// pathological or adversarial package.
trait HasParent {
    fn parent(&self) -> Option<&tsp::Reference>;
}

impl HasParent for tswp::ParagraphStyleArchive {
    fn parent(&self) -> Option<&tsp::Reference> {
        self.parent.as_ref()
    }
}
impl HasParent for tswp::CharacterStyleArchive {
    fn parent(&self) -> Option<&tsp::Reference> {
        self.parent.as_ref()
    }
}
impl HasParent for tswp::ListStyleArchive {
    fn parent(&self) -> Option<&tsp::Reference> {
        self.parent.as_ref()
    }
}
impl HasParent for tswp::CellStyleArchive {
    fn parent(&self) -> Option<&tsp::Reference> {
        self.parent.as_ref()
    }
}
impl HasParent for tswp::MediaStyleArchive {
    fn parent(&self) -> Option<&tsp::Reference> {
        self.parent.as_ref()
    }
}

/// Root-to-leaf chain of archives for `start`, inclusive of `start` itself.
/// An empty return means `start` does not resolve (a dereference miss).
fn walk_chain<T: DecodableRecord + HasParent>(store: &ObjectStore, start: u64) -> Vec<T> {
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    let mut current = Some(start);

    while let Some(id) = current {
        if !visited.insert(id) {
            break;
        }
        let Some(archive) = store.get::<T>(id) else {
            break;
        };
        let next = archive.parent().map(|r| r.identifier);
        chain.push(archive);
        current = next;
    }

    chain.reverse();
    chain
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

impl From<&tsp::Color> for Color {
    fn from(c: &tsp::Color) -> Self {
        Color {
            red: c.red.unwrap_or(0.0),
            green: c.green.unwrap_or(0.0),
            blue: c.blue.unwrap_or(0.0),
            alpha: c.alpha.unwrap_or(1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    fn from_u32(value: u32) -> Self {
        match value {
            1 => Self::Center,
            2 => Self::Right,
            3 => Self::Justify,
            _ => Self::Left,
        }
    }
}

/// Normalized paragraph style: every field absent unless set at some
/// level of the chain.
#[derive(Debug, Clone, Default)]
pub struct ParagraphStyle {
    pub alignment: Option<Alignment>,
    pub first_line_indent: Option<f64>,
    pub left_indent: Option<f64>,
    pub right_indent: Option<f64>,
    pub space_before: Option<f64>,
    pub space_after: Option<f64>,
    pub line_spacing: Option<f64>,
    pub list_style: Option<Reference>,
    pub list_level: u32,
    pub default_character_style: Option<Reference>,
}

/// Normalized character (run) style.
#[derive(Debug, Clone, Default)]
pub struct CharacterStyle {
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strikethrough: Option<bool>,
    pub font_color: Option<Color>,
}

#[derive(Debug, Clone, Default)]
pub struct CellStyle {
    pub fill_color: Option<Color>,
    pub text_alignment: Option<u32>,
    pub vertical_alignment: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct MediaStyle {
    pub corner_radius: Option<f64>,
    pub stroke_color: Option<Color>,
    pub stroke_width: Option<f64>,
}

/// One list level's label rendering: `none` means the paragraph using
/// this level is not actually a list item (spec §4.G.2's membership test).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListLabelKind {
    #[default]
    None,
    Bullet,
    Decimal,
    LowerRoman,
    UpperRoman,
    LowerAlpha,
    UpperAlpha,
}

impl ListLabelKind {
    fn from_u32(value: u32) -> Self {
        match value {
            1 => Self::Bullet,
            2 => Self::Decimal,
            3 => Self::LowerRoman,
            4 => Self::UpperRoman,
            5 => Self::LowerAlpha,
            6 => Self::UpperAlpha,
            _ => Self::None,
        }
    }

    pub fn is_list(self) -> bool {
        self != Self::None
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListLevelFormat {
    pub label_kind: ListLabelKind,
    pub bullet_char: Option<String>,
    pub text_format: Option<String>,
}

/// Normalized list style: one [`ListLevelFormat`] per nesting depth seen
/// anywhere in the chain, deepest level from the most specific archive
/// that declares it.
#[derive(Debug, Clone, Default)]
pub struct ListStyle {
    pub levels: Vec<ListLevelFormat>,
}

impl ListStyle {
    pub fn level(&self, level: u32) -> Option<&ListLevelFormat> {
        self.levels.get(level as usize)
    }
}

/// Resolve a paragraph style archive's full chain into a [`ParagraphStyle`].
pub fn resolve_paragraph_style(store: &ObjectStore, id: u64) -> ParagraphStyle {
    let chain = walk_chain::<tswp::ParagraphStyleArchive>(store, id);
    let mut out = ParagraphStyle::default();

    for archive in &chain {
        if let Some(v) = archive.alignment {
            out.alignment = Some(Alignment::from_u32(v));
        }
        if let Some(v) = archive.first_line_indent {
            out.first_line_indent = Some(v);
        }
        if let Some(v) = archive.left_indent {
            out.left_indent = Some(v);
        }
        if let Some(v) = archive.right_indent {
            out.right_indent = Some(v);
        }
        if let Some(v) = archive.space_before {
            out.space_before = Some(v);
        }
        if let Some(v) = archive.space_after {
            out.space_after = Some(v);
        }
        if let Some(v) = archive.line_spacing {
            out.line_spacing = Some(v);
        }
        if let Some(r) = &archive.list_style {
            out.list_style = Some(Reference::from(r.identifier));
        }
        if let Some(v) = archive.list_level {
            out.list_level = v;
        }
        if let Some(r) = &archive.default_character_style {
            out.default_character_style = Some(Reference::from(r.identifier));
        }
    }

    out
}

/// Resolve a character style archive's full chain into a [`CharacterStyle`].
pub fn resolve_character_style(store: &ObjectStore, id: u64) -> CharacterStyle {
    let chain = walk_chain::<tswp::CharacterStyleArchive>(store, id);
    let mut out = CharacterStyle::default();

    for archive in &chain {
        if let Some(v) = &archive.font_family {
            out.font_family = Some(v.clone());
        }
        if let Some(v) = archive.font_size {
            out.font_size = Some(v);
        }
        if let Some(v) = archive.bold {
            out.bold = Some(v);
        }
        if let Some(v) = archive.italic {
            out.italic = Some(v);
        }
        if let Some(v) = archive.underline {
            out.underline = Some(v);
        }
        if let Some(v) = archive.strikethrough {
            out.strikethrough = Some(v);
        }
        if let Some(c) = &archive.font_color {
            out.font_color = Some(c.into());
        }
    }

    out
}

/// Resolve a paragraph's inherited default run properties by following its
/// style chain for a `default_character_style` reference and, if present,
/// resolving that style's own chain. Used so inline text with no explicit
/// character style still inherits font/color/decoration (spec §4.E).
pub fn resolve_paragraph_default_character_style(
    store: &ObjectStore,
    paragraph_style: &ParagraphStyle,
) -> CharacterStyle {
    match paragraph_style.default_character_style {
        Some(reference) => resolve_character_style(store, reference.identifier),
        None => CharacterStyle::default(),
    }
}

pub fn resolve_cell_style(store: &ObjectStore, id: u64) -> CellStyle {
    let chain = walk_chain::<tswp::CellStyleArchive>(store, id);
    let mut out = CellStyle::default();

    for archive in &chain {
        if let Some(c) = &archive.fill_color {
            out.fill_color = Some(c.into());
        }
        if let Some(v) = archive.text_alignment {
            out.text_alignment = Some(v);
        }
        if let Some(v) = archive.vertical_alignment {
            out.vertical_alignment = Some(v);
        }
    }

    out
}

pub fn resolve_media_style(store: &ObjectStore, id: u64) -> MediaStyle {
    let chain = walk_chain::<tswp::MediaStyleArchive>(store, id);
    let mut out = MediaStyle::default();

    for archive in &chain {
        if let Some(v) = archive.corner_radius {
            out.corner_radius = Some(v);
        }
        if let Some(c) = &archive.stroke_color {
            out.stroke_color = Some(c.into());
        }
        if let Some(v) = archive.stroke_width {
            out.stroke_width = Some(v);
        }
    }

    out
}

/// Resolve a list style archive plus an integer level into a normalized
/// [`ListStyle`], applying the same chain-projection rule per level: a
/// deeper archive's entry for a given level overrides a shallower one's.
pub fn resolve_list_style(store: &ObjectStore, id: u64) -> ListStyle {
    let chain = walk_chain::<tswp::ListStyleArchive>(store, id);
    let mut levels: Vec<ListLevelFormat> = Vec::new();

    for archive in &chain {
        for level_format in &archive.levels {
            let level = level_format.level as usize;
            if levels.len() <= level {
                levels.resize(level + 1, ListLevelFormat::default());
            }
            levels[level] = ListLevelFormat {
                label_kind: ListLabelKind::from_u32(level_format.label_kind.unwrap_or(0)),
                bullet_char: level_format.bullet_char.clone(),
                text_format: level_format.text_format.clone(),
            };
        }
    }

    ListStyle { levels }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{DirectoryPackage, PackageStorage};
    use prost::Message;

    fn store_with(records: Vec<(u64, u32, Vec<u8>)>) -> ObjectStore {
        use std::collections::HashMap;
        struct Mem(HashMap<String, Vec<u8>>);
        impl PackageStorage for Mem {
            fn contains(&self, p: &str) -> bool {
                self.0.contains_key(p)
            }
            fn read(&self, p: &str) -> crate::error::Result<Vec<u8>> {
                Ok(self.0.get(p).cloned().unwrap_or_default())
            }
            fn size(&self, p: &str) -> crate::error::Result<u64> {
                Ok(self.0.get(p).map(|d| d.len() as u64).unwrap_or(0))
            }
            fn iter_entries(&self) -> Vec<String> {
                self.0.keys().cloned().collect()
            }
        }

        let mut archive_bytes = Vec::new();
        for (id, type_code, payload) in records {
            let message_info = {
                let mut buf = Vec::new();
                buf.extend(crate::varint::encode_varint(1 << 3));
                buf.extend(crate::varint::encode_varint(type_code as u64));
                buf.extend(crate::varint::encode_varint(3 << 3));
                buf.extend(crate::varint::encode_varint(payload.len() as u64));
                buf
            };
            let mut archive_info = Vec::new();
            archive_info.extend(crate::varint::encode_varint(1 << 3));
            archive_info.extend(crate::varint::encode_varint(id));
            archive_info.extend(crate::varint::encode_varint((2 << 3) | 2));
            archive_info.extend(crate::varint::encode_varint(message_info.len() as u64));
            archive_info.extend(message_info);

            archive_bytes.extend(crate::varint::encode_varint(archive_info.len() as u64));
            archive_bytes.extend(archive_info);
            archive_bytes.extend(payload);
        }

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.iwa"), &archive_bytes).unwrap();
        let storage = DirectoryPackage::open(dir.path()).unwrap();
        ObjectStore::load(&storage).unwrap()
    }

    #[test]
    fn leaf_field_wins_over_root() {
        let root = tswp::ParagraphStyleArchive {
            alignment: Some(1),
            left_indent: Some(10.0),
            ..Default::default()
        };
        let leaf = tswp::ParagraphStyleArchive {
            parent: Some(tsp::Reference { identifier: 1, type_hint: None }),
            alignment: Some(2),
            ..Default::default()
        };

        let store = store_with(vec![
            (1, crate::registry::type_code::PARAGRAPH_STYLE, root.encode_to_vec()),
            (2, crate::registry::type_code::PARAGRAPH_STYLE, leaf.encode_to_vec()),
        ]);

        let resolved = resolve_paragraph_style(&store, 2);
        assert_eq!(resolved.alignment, Some(Alignment::Right));
        assert_eq!(resolved.left_indent, Some(10.0));
    }

    #[test]
    fn cycle_terminates_at_first_repeat() {
        let a = tswp::ParagraphStyleArchive {
            parent: Some(tsp::Reference { identifier: 2, type_hint: None }),
            left_indent: Some(1.0),
            ..Default::default()
        };
        let b = tswp::ParagraphStyleArchive {
            parent: Some(tsp::Reference { identifier: 1, type_hint: None }),
            right_indent: Some(2.0),
            ..Default::default()
        };

        let store = store_with(vec![
            (1, crate::registry::type_code::PARAGRAPH_STYLE, a.encode_to_vec()),
            (2, crate::registry::type_code::PARAGRAPH_STYLE, b.encode_to_vec()),
        ]);

        // Must terminate rather than loop forever.
        let resolved = resolve_paragraph_style(&store, 1);
        assert_eq!(resolved.left_indent, Some(1.0));
        assert_eq!(resolved.right_indent, Some(2.0));
    }

    #[test]
    fn empty_chain_yields_defaults() {
        let store = store_with(vec![]);
        let resolved = resolve_paragraph_style(&store, 404);
        assert_eq!(resolved.alignment, None);
        assert_eq!(resolved.left_indent, None);
    }

    #[test]
    fn list_style_level_override() {
        let root = tswp::ListStyleArchive {
            levels: vec![tswp::ListLevelFormat {
                level: 0,
                label_kind: Some(2),
                ..Default::default()
            }],
            ..Default::default()
        };
        let leaf = tswp::ListStyleArchive {
            parent: Some(tsp::Reference { identifier: 1, type_hint: None }),
            levels: vec![tswp::ListLevelFormat {
                level: 1,
                label_kind: Some(1),
                bullet_char: Some("-".into()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let store = store_with(vec![
            (1, crate::registry::type_code::LIST_STYLE, root.encode_to_vec()),
            (2, crate::registry::type_code::LIST_STYLE, leaf.encode_to_vec()),
        ]);

        let resolved = resolve_list_style(&store, 2);
        assert!(resolved.level(0).unwrap().label_kind.is_list());
        assert_eq!(resolved.level(1).unwrap().label_kind, ListLabelKind::Bullet);
    }
}
