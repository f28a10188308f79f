//! Message-type registry: globally unique numeric type codes for every
//! generated record kind, and the [`DecodableRecord`] trait the object
//! store uses to decode a record's raw payload into a caller-requested
//! concrete message type.
//!
//! Unlike a scheme that reuses small integers per namespace, every code
//! below is unique across the whole schema — a record's type code alone
//! determines which `.proto` message decodes it, with no ambiguity.

use prost::Message;

use crate::protos::{kn, tn, tp, tsch, tsd, tsp, tst, tswp};

pub mod type_code {
    pub const ARCHIVE_INFO: u32 = 1;
    pub const MESSAGE_INFO: u32 = 2;
    pub const METADATA_ARCHIVE: u32 = 3;

    pub const STORAGE_ARCHIVE: u32 = 2001;
    pub const PARAGRAPH_STYLE: u32 = 2002;
    pub const CHARACTER_STYLE: u32 = 2003;
    pub const LIST_STYLE: u32 = 2004;
    pub const CELL_STYLE: u32 = 2005;
    pub const MEDIA_STYLE: u32 = 2006;
    pub const PARAGRAPH_DATA: u32 = 2007;

    pub const TABLE_MODEL: u32 = 3001;
    pub const TABLE_DATA_STORE: u32 = 3002;

    pub const GEOMETRY: u32 = 4001;
    pub const SHAPE: u32 = 4002;
    pub const IMAGE: u32 = 4003;
    pub const MOVIE: u32 = 4004;
    pub const OBJECT_3D: u32 = 4005;
    pub const GROUP: u32 = 4006;
    pub const PLACEHOLDER: u32 = 4007;
    pub const DRAWABLE_ORDER: u32 = 4008;
    pub const WRAP: u32 = 4009;
    pub const PATH_SOURCE: u32 = 4010;

    pub const CHART: u32 = 5001;

    pub const PAGES_DOCUMENT: u32 = 6001;
    pub const PAGES_SECTION: u32 = 6002;

    pub const NUMBERS_DOCUMENT: u32 = 7001;
    pub const NUMBERS_SHEET: u32 = 7002;

    pub const KEYNOTE_SHOW: u32 = 8001;
    pub const KEYNOTE_SLIDE: u32 = 8002;
}

/// A concrete generated message type together with the set of type codes
/// that decode to it. Most kinds have exactly one type code; a few (e.g.
/// `tswp::StorageArchive`, reused for word-processor body storage, table
/// cell rich text, and shape text alike) accept several.
pub trait DecodableRecord: Message + Default + Clone + 'static {
    const TYPE_CODES: &'static [u32];
}

macro_rules! decodable_record {
    ($ty:path, $codes:expr) => {
        impl DecodableRecord for $ty {
            const TYPE_CODES: &'static [u32] = $codes;
        }
    };
}

decodable_record!(tsp::MetadataArchive, &[type_code::METADATA_ARCHIVE]);
decodable_record!(tswp::StorageArchive, &[type_code::STORAGE_ARCHIVE]);
decodable_record!(tswp::ParagraphStyleArchive, &[type_code::PARAGRAPH_STYLE]);
decodable_record!(tswp::CharacterStyleArchive, &[type_code::CHARACTER_STYLE]);
decodable_record!(tswp::ListStyleArchive, &[type_code::LIST_STYLE]);
decodable_record!(tswp::CellStyleArchive, &[type_code::CELL_STYLE]);
decodable_record!(tswp::MediaStyleArchive, &[type_code::MEDIA_STYLE]);
decodable_record!(tswp::ParagraphDataArchive, &[type_code::PARAGRAPH_DATA]);
decodable_record!(tst::TableModelArchive, &[type_code::TABLE_MODEL]);
decodable_record!(tst::TableDataStore, &[type_code::TABLE_DATA_STORE]);
decodable_record!(tsd::GeometryArchive, &[type_code::GEOMETRY]);
decodable_record!(tsd::ShapeArchive, &[type_code::SHAPE]);
decodable_record!(tsd::ImageArchive, &[type_code::IMAGE]);
decodable_record!(tsd::MovieArchive, &[type_code::MOVIE]);
decodable_record!(tsd::Object3DArchive, &[type_code::OBJECT_3D]);
decodable_record!(tsd::GroupArchive, &[type_code::GROUP]);
decodable_record!(tsd::PlaceholderArchive, &[type_code::PLACEHOLDER]);
decodable_record!(tsd::DrawableOrderArchive, &[type_code::DRAWABLE_ORDER]);
decodable_record!(tsd::WrapArchive, &[type_code::WRAP]);
decodable_record!(tsd::PathSourceArchive, &[type_code::PATH_SOURCE]);
decodable_record!(tsch::ChartArchive, &[type_code::CHART]);
decodable_record!(tp::DocumentArchive, &[type_code::PAGES_DOCUMENT]);
decodable_record!(tp::SectionArchive, &[type_code::PAGES_SECTION]);
decodable_record!(tn::DocumentArchive, &[type_code::NUMBERS_DOCUMENT]);
decodable_record!(tn::SheetArchive, &[type_code::NUMBERS_SHEET]);
decodable_record!(kn::ShowArchive, &[type_code::KEYNOTE_SHOW]);
decodable_record!(kn::SlideArchive, &[type_code::KEYNOTE_SLIDE]);

/// The polymorphic kind of a drawable record, resolved from its type
/// code alone (spec §9's "tagged variant over concrete record kinds,
/// dispatched by attempted typed downcast"). Used by the traversal
/// engine when walking an attachment or drawable-order entry whose
/// concrete type isn't known until the reference is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawableKind {
    Shape,
    Image,
    Movie,
    Object3D,
    Group,
    Placeholder,
    Chart,
    Table,
}

impl DrawableKind {
    pub fn from_type_code(type_code: u32) -> Option<Self> {
        match type_code {
            type_code::SHAPE => Some(Self::Shape),
            type_code::IMAGE => Some(Self::Image),
            type_code::MOVIE => Some(Self::Movie),
            type_code::OBJECT_3D => Some(Self::Object3D),
            type_code::GROUP => Some(Self::Group),
            type_code::PLACEHOLDER => Some(Self::Placeholder),
            type_code::CHART => Some(Self::Chart),
            type_code::TABLE_MODEL => Some(Self::Table),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawable_kind_resolves_known_codes() {
        assert_eq!(
            DrawableKind::from_type_code(type_code::IMAGE),
            Some(DrawableKind::Image)
        );
        assert_eq!(
            DrawableKind::from_type_code(type_code::TABLE_MODEL),
            Some(DrawableKind::Table)
        );
        assert_eq!(DrawableKind::from_type_code(999_999), None);
    }

    #[test]
    fn type_codes_are_globally_unique() {
        let codes = [
            type_code::ARCHIVE_INFO,
            type_code::MESSAGE_INFO,
            type_code::METADATA_ARCHIVE,
            type_code::STORAGE_ARCHIVE,
            type_code::PARAGRAPH_STYLE,
            type_code::CHARACTER_STYLE,
            type_code::LIST_STYLE,
            type_code::CELL_STYLE,
            type_code::MEDIA_STYLE,
            type_code::PARAGRAPH_DATA,
            type_code::TABLE_MODEL,
            type_code::TABLE_DATA_STORE,
            type_code::GEOMETRY,
            type_code::SHAPE,
            type_code::IMAGE,
            type_code::MOVIE,
            type_code::OBJECT_3D,
            type_code::GROUP,
            type_code::PLACEHOLDER,
            type_code::DRAWABLE_ORDER,
            type_code::WRAP,
            type_code::PATH_SOURCE,
            type_code::CHART,
            type_code::PAGES_DOCUMENT,
            type_code::PAGES_SECTION,
            type_code::NUMBERS_DOCUMENT,
            type_code::NUMBERS_SHEET,
            type_code::KEYNOTE_SHOW,
            type_code::KEYNOTE_SLIDE,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
