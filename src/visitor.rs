//! Visitor interface (component I): the push API the traversal engine
//! drives (spec §4.I). Every method has a default no-op implementation so
//! a visitor implements only the events it cares about; the engine is
//! generic over `V: Visitor`, so calls monomorphize and there is never a
//! concurrent invocation to guard against — the single `async` call chain
//! already guarantees it (spec §5, §9).

use crate::cell::Cell;
use crate::error::Result;
use crate::path::{Point, Size};
use crate::style::{CharacterStyle, ParagraphStyle};

/// Which of the three iWork applications produced the package being
/// traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    Pages,
    Numbers,
    Keynote,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PageSettings {
    pub page_size: Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub position: Point,
    pub size: Size,
    pub angle: f64,
    pub flipped_horizontal: bool,
    pub flipped_vertical: bool,
}

/// A single styled run of text, already split at character-style
/// boundaries and carrying any hyperlink whose range overlaps it
/// (spec §4.G's "Hyperlinks").
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub style: CharacterStyle,
    pub hyperlink: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageInfo {
    pub geometry: Geometry,
    pub data_path: Option<String>,
    pub ocr: Option<OcrResult>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaInfo {
    pub geometry: Geometry,
    pub data_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Object3DInfo {
    pub geometry: Geometry,
    pub data_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartSeries {
    pub name: Option<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartAxis {
    pub is_value_axis: bool,
    pub title: Option<String>,
    pub category_labels: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChartLegend {
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartInfo {
    pub title: Option<String>,
    pub series: Vec<ChartSeries>,
    pub axes: Vec<ChartAxis>,
    pub legend: Option<ChartLegend>,
}

/// One `paragraph-data` / attachment-table entry resolved to its concrete
/// inline content (spec §4.G.4).
#[derive(Debug, Clone, PartialEq)]
pub enum InlineElement {
    Text(TextRun),
    FootnoteMarker,
    Image(ImageInfo),
    Media(MediaInfo),
    Object3D(Object3DInfo),
    Chart(ChartInfo),
    Equation { mathml: Option<String> },
    /// A non-hyperlink smart field (page-number, date, or another kind the
    /// schema doesn't name) — spec §FULL.N's supplement to the hyperlink
    /// case the base spec calls out explicitly.
    SmartField { kind: u32 },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableInfo {
    pub name: Option<String>,
    pub row_count: u32,
    pub column_count: u32,
    pub geometry: Geometry,
}

/// The OCR provider's per-image result (spec §6). `OCRFailure` is turned
/// into an empty result by the caller before it ever reaches a visitor —
/// it is never surfaced as an [`crate::error::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OcrResult {
    pub text: Option<String>,
}

/// Optional collaborator invoked by the engine for each image event when
/// configured (spec §6). The default `()` implementation performs no OCR
/// and always returns an empty result.
pub trait OcrProvider {
    #[allow(async_fn_in_trait)]
    async fn recognize(&mut self, image_bytes: &[u8], image_info: &ImageInfo) -> OcrResult;
}

impl OcrProvider for () {
    async fn recognize(&mut self, _image_bytes: &[u8], _image_info: &ImageInfo) -> OcrResult {
        OcrResult::default()
    }
}

/// The push API the traversal engine targets. Every method defaults to a
/// no-op; a visitor overrides only the events it cares about.
///
/// Events are invoked in strict document order (spec §4.I); for every
/// `begin` there is exactly one matching `end`, properly nested. A
/// returned `Err` propagates out of the traversal and aborts it without
/// emitting further events (spec §5's cancellation semantics).
#[allow(async_fn_in_trait, unused_variables)]
pub trait Visitor {
    async fn document_begin(&mut self, document_type: DocumentType, page_settings: PageSettings) -> Result<()> {
        Ok(())
    }
    async fn document_end(&mut self) -> Result<()> {
        Ok(())
    }

    async fn pages_body_begin(&mut self) -> Result<()> {
        Ok(())
    }
    async fn pages_body_end(&mut self) -> Result<()> {
        Ok(())
    }

    async fn sheet_begin(&mut self, name: &str) -> Result<()> {
        Ok(())
    }
    async fn sheet_end(&mut self) -> Result<()> {
        Ok(())
    }

    async fn slide_begin(&mut self, index: u32, bounds: Size) -> Result<()> {
        Ok(())
    }
    async fn slide_end(&mut self) -> Result<()> {
        Ok(())
    }

    async fn list_begin(&mut self) -> Result<()> {
        Ok(())
    }
    async fn list_end(&mut self) -> Result<()> {
        Ok(())
    }
    async fn list_item_begin(&mut self, number: u32) -> Result<()> {
        Ok(())
    }
    async fn list_item_end(&mut self) -> Result<()> {
        Ok(())
    }

    async fn paragraph_begin(&mut self, style: &ParagraphStyle) -> Result<()> {
        Ok(())
    }
    async fn paragraph_end(&mut self) -> Result<()> {
        Ok(())
    }

    async fn inline_element(&mut self, element: InlineElement) -> Result<()> {
        Ok(())
    }

    async fn table_begin(&mut self, info: &TableInfo) -> Result<()> {
        Ok(())
    }
    async fn table_end(&mut self) -> Result<()> {
        Ok(())
    }
    async fn row_begin(&mut self, row_index: u32) -> Result<()> {
        Ok(())
    }
    async fn row_end(&mut self) -> Result<()> {
        Ok(())
    }
    async fn cell(&mut self, column: u32, cell: &Cell) -> Result<()> {
        Ok(())
    }

    async fn image(&mut self, info: &ImageInfo) -> Result<()> {
        Ok(())
    }
    async fn media(&mut self, info: &MediaInfo) -> Result<()> {
        Ok(())
    }
    async fn object_3d(&mut self, info: &Object3DInfo) -> Result<()> {
        Ok(())
    }
    async fn chart(&mut self, info: &ChartInfo) -> Result<()> {
        Ok(())
    }

    async fn shape_begin(&mut self, geometry: Geometry) -> Result<()> {
        Ok(())
    }
    async fn shape_end(&mut self) -> Result<()> {
        Ok(())
    }
    async fn group_begin(&mut self, geometry: Geometry) -> Result<()> {
        Ok(())
    }
    async fn group_end(&mut self) -> Result<()> {
        Ok(())
    }
}
