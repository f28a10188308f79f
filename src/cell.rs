//! Packed cell storage decoder (component F): a bit-exact reader of the
//! spreadsheet cell-record byte format described in spec §4.F.
//!
//! The layout is a fixed 12-byte header followed by a variable-length
//! payload whose shape is entirely determined by the header's feature-flag
//! bitfield: each set bit consumes a fixed number of bytes, **in the order
//! the bits are declared below**, not in any order a caller might prefer to
//! read them back in.

use bitflags::bitflags;

use crate::object_store::Reference;
use crate::protos::tst;

/// Only this layout version is understood; anything else yields an empty
/// cell deterministically rather than attempting a best-effort parse.
const SUPPORTED_LAYOUT_VERSION: u8 = 5;

bitflags! {
    /// Feature-flag bitfield at header bytes 8..=11 (little-endian u32).
    /// Bit order here is load-bearing: it is also payload read order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CellFlags: u32 {
        const DECIMAL128            = 1 << 0;
        const DOUBLE                = 1 << 1;
        const SECONDS               = 1 << 2;
        const STRING_ID             = 1 << 3;
        const RICH_TEXT_ID          = 1 << 4;
        const CELL_STYLE_ID         = 1 << 5;
        const TEXT_STYLE_ID         = 1 << 6;
        const CONDITIONAL_FORMAT_ID = 1 << 7;
        const FORMAT_ID             = 1 << 8;
        const FORMULA_ID            = 1 << 9;
        const CONTROL_ID            = 1 << 10;
        const COMMENT_ID            = 1 << 11;
        const SUGGEST_ID            = 1 << 12;
        const NUMBER_FORMAT_ID      = 1 << 13;
        const CURRENCY_FORMAT_ID    = 1 << 14;
        const DATE_FORMAT_ID        = 1 << 15;
        const DURATION_FORMAT_ID    = 1 << 16;
        const TEXT_FORMAT_ID        = 1 << 17;
        const BOOLEAN_FORMAT_ID     = 1 << 18;
    }
}

/// Cell type code, spec GLOSSARY. 8 and 9 both mean rich text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellTypeCode {
    Empty,
    Number,
    Text,
    Date,
    Boolean,
    Duration,
    Error,
    RichText,
    Currency,
    Unknown(u8),
}

impl CellTypeCode {
    fn from_byte(b: u8) -> Self {
        match b {
            1 => Self::Empty,
            2 => Self::Number,
            3 => Self::Text,
            4 => Self::Date,
            5 => Self::Boolean,
            6 => Self::Duration,
            7 => Self::Error,
            8 | 9 => Self::RichText,
            10 => Self::Currency,
            other => Self::Unknown(other),
        }
    }
}

/// The decoded, typed payload of one cell (spec §4.F's "cell-type
/// projection"). `RichText` carries the object id of the text storage to
/// recurse into, not its content — the traversal engine resolves and
/// walks it as inline content.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    /// Seconds since the Apple reference epoch (§6). A stored `0.0` is
    /// folded into `CellValue::Empty` by the caller of [`decode`], per the
    /// observed-behavior note in spec §9 — preserved here, not reinterpreted.
    Date(f64),
    Boolean(bool),
    Duration(f64),
    Error(Option<String>),
    RichText(Reference),
    Currency(f64),
}

impl CellValue {
    /// Convert a `Date` value from its stored seconds-since-reference-epoch
    /// offset to a calendar timestamp. `None` for every other variant, and
    /// for a `Date` whose offset over/underflows `DateTime<Utc>`'s range.
    pub fn as_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let CellValue::Date(seconds) = self else { return None };
        let epoch = chrono::DateTime::from_timestamp(crate::APPLE_REFERENCE_EPOCH_UNIX, 0)?;
        epoch.checked_add_signed(chrono::Duration::milliseconds((seconds * 1000.0) as i64))
    }
}

/// Metadata accompanying a decoded cell: the style/format ids a renderer
/// needs but that do not themselves shape `value`. Ids discarded per spec
/// (`conditional_format_id`, `format_id`, `comment_id`) are parsed to keep
/// the byte cursor in sync but not retained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellMetadata {
    pub cell_style_id: Option<u32>,
    pub text_style_id: Option<u32>,
    pub formula_id: Option<u32>,
    pub control_id: Option<u32>,
    pub suggest_id: Option<u32>,
    pub number_format_id: Option<u32>,
    pub currency_format_id: Option<u32>,
    pub date_format_id: Option<u32>,
    pub duration_format_id: Option<u32>,
    pub text_format_id: Option<u32>,
    pub boolean_format_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub metadata: CellMetadata,
}

impl Cell {
    fn empty() -> Self {
        Cell { value: CellValue::Empty, metadata: CellMetadata::default() }
    }
}

/// The side tables a cell's small-integer ids index into (spec §3's
/// "side tables for strings, rich-text payloads, styles, and number
/// formats").
pub struct CellTables<'a> {
    pub strings: &'a [String],
    pub rich_text: &'a [Reference],
    pub number_formats: &'a [tst::NumberFormat],
    pub currency_formats: &'a [tst::NumberFormat],
}

fn read_u32_le(buf: &[u8], offset: usize) -> Option<u32> {
    buf.get(offset..offset + 4).map(|s| u32::from_le_bytes(s.try_into().unwrap()))
}

fn read_f64_le(buf: &[u8], offset: usize) -> Option<f64> {
    buf.get(offset..offset + 8).map(|s| f64::from_le_bytes(s.try_into().unwrap()))
}

/// Unpack Apple's truncated 128-bit decimal representation (spec §4.F's
/// "Decimal128 unpacking"): sign at the high bit of byte 15; a 14-bit
/// biased exponent split across byte 15's low 7 bits and byte 14's high 7
/// bits; a 113-bit mantissa made of byte 14's low bit plus bytes 0..=13.
pub fn decode_decimal128(bytes: &[u8; 16]) -> f64 {
    let byte15 = bytes[15];
    let byte14 = bytes[14];

    let sign_negative = (byte15 >> 7) & 1 == 1;
    let exponent_high = (byte15 & 0x7F) as u32;
    let exponent_low = (byte14 >> 1) as u32;
    let exponent = (exponent_high << 7) | exponent_low;

    let mut mantissa: u128 = ((byte14 & 1) as u128) << 112;
    for (i, &b) in bytes[..14].iter().enumerate() {
        mantissa |= (b as u128) << (8 * i);
    }

    let unbiased_exponent = exponent as i32 - crate::DECIMAL128_EXPONENT_BIAS;
    let magnitude = (mantissa as f64) * 10f64.powi(unbiased_exponent);

    if sign_negative { -magnitude } else { magnitude }
}

/// Decode one cell's packed byte layout starting at `offset` in `buf`.
/// Returns an empty cell (not an error) on an unsupported layout version
/// or a truncated buffer — a corrupt cell header is tolerated per spec
/// §4.G's failure policy, unlike a corrupt stream frame.
pub fn decode(buf: &[u8], offset: usize, tables: &CellTables) -> Cell {
    let Some(header) = buf.get(offset..offset + 12) else {
        return Cell::empty();
    };

    if header[0] != SUPPORTED_LAYOUT_VERSION {
        return Cell::empty();
    }
    let type_code = CellTypeCode::from_byte(header[1]);
    let flags_raw = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);
    let flags = CellFlags::from_bits_truncate(flags_raw);

    let mut pos = offset + 12;
    let mut decimal128: Option<f64> = None;
    let mut double: Option<f64> = None;
    let mut seconds: Option<f64> = None;
    let mut string_id: Option<u32> = None;
    let mut rich_text_id: Option<u32> = None;
    let mut metadata = CellMetadata::default();

    macro_rules! take_u32 {
        () => {{
            let Some(v) = read_u32_le(buf, pos) else { return Cell::empty() };
            pos += 4;
            v
        }};
    }

    if flags.contains(CellFlags::DECIMAL128) {
        let Some(slice) = buf.get(pos..pos + 16) else { return Cell::empty() };
        let mut arr = [0u8; 16];
        arr.copy_from_slice(slice);
        decimal128 = Some(decode_decimal128(&arr));
        pos += 16;
    }
    if flags.contains(CellFlags::DOUBLE) {
        let Some(v) = read_f64_le(buf, pos) else { return Cell::empty() };
        double = Some(v);
        pos += 8;
    }
    if flags.contains(CellFlags::SECONDS) {
        let Some(v) = read_f64_le(buf, pos) else { return Cell::empty() };
        seconds = Some(v);
        pos += 8;
    }
    if flags.contains(CellFlags::STRING_ID) {
        string_id = Some(take_u32!());
    }
    if flags.contains(CellFlags::RICH_TEXT_ID) {
        rich_text_id = Some(take_u32!());
    }
    if flags.contains(CellFlags::CELL_STYLE_ID) {
        metadata.cell_style_id = Some(take_u32!());
    }
    if flags.contains(CellFlags::TEXT_STYLE_ID) {
        metadata.text_style_id = Some(take_u32!());
    }
    if flags.contains(CellFlags::CONDITIONAL_FORMAT_ID) {
        let _ = take_u32!(); // discarded per spec §4.F
    }
    if flags.contains(CellFlags::FORMAT_ID) {
        let _ = take_u32!(); // discarded per spec §4.F
    }
    if flags.contains(CellFlags::FORMULA_ID) {
        metadata.formula_id = Some(take_u32!());
    }
    if flags.contains(CellFlags::CONTROL_ID) {
        metadata.control_id = Some(take_u32!());
    }
    if flags.contains(CellFlags::COMMENT_ID) {
        let _ = take_u32!(); // discarded per spec §4.F
    }
    if flags.contains(CellFlags::SUGGEST_ID) {
        metadata.suggest_id = Some(take_u32!());
    }
    if flags.contains(CellFlags::NUMBER_FORMAT_ID) {
        metadata.number_format_id = Some(take_u32!());
    }
    if flags.contains(CellFlags::CURRENCY_FORMAT_ID) {
        metadata.currency_format_id = Some(take_u32!());
    }
    if flags.contains(CellFlags::DATE_FORMAT_ID) {
        metadata.date_format_id = Some(take_u32!());
    }
    if flags.contains(CellFlags::DURATION_FORMAT_ID) {
        metadata.duration_format_id = Some(take_u32!());
    }
    if flags.contains(CellFlags::TEXT_FORMAT_ID) {
        metadata.text_format_id = Some(take_u32!());
    }
    if flags.contains(CellFlags::BOOLEAN_FORMAT_ID) {
        metadata.boolean_format_id = Some(take_u32!());
    }

    let value = project(type_code, decimal128, double, seconds, string_id, rich_text_id, tables);
    Cell { value, metadata }
}

#[allow(clippy::too_many_arguments)]
fn project(
    type_code: CellTypeCode,
    decimal128: Option<f64>,
    double: Option<f64>,
    seconds: Option<f64>,
    string_id: Option<u32>,
    rich_text_id: Option<u32>,
    tables: &CellTables,
) -> CellValue {
    let numeric = decimal128.or(double);
    match type_code {
        CellTypeCode::Empty | CellTypeCode::Unknown(_) => CellValue::Empty,
        CellTypeCode::Number => numeric.map(CellValue::Number).unwrap_or(CellValue::Empty),
        CellTypeCode::Currency => numeric.map(CellValue::Currency).unwrap_or(CellValue::Empty),
        CellTypeCode::Text => string_id
            .and_then(|id| tables.strings.get(id as usize))
            .cloned()
            .map(CellValue::Text)
            .unwrap_or(CellValue::Empty),
        CellTypeCode::RichText => rich_text_id
            .and_then(|id| tables.rich_text.get(id as usize))
            .copied()
            .map(CellValue::RichText)
            .unwrap_or(CellValue::Empty),
        CellTypeCode::Boolean => CellValue::Boolean(double.unwrap_or(0.0) != 0.0),
        CellTypeCode::Duration => double.map(CellValue::Duration).unwrap_or(CellValue::Empty),
        CellTypeCode::Date => match seconds {
            // A stored zero seconds value means "no date set", not the
            // Apple epoch instant itself — preserve per spec §9.
            Some(s) if s != 0.0 => CellValue::Date(s),
            _ => CellValue::Empty,
        },
        CellTypeCode::Error => CellValue::Error(string_id.and_then(|id| tables.strings.get(id as usize).cloned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_tables() -> CellTables<'static> {
        CellTables { strings: &[], rich_text: &[], number_formats: &[], currency_formats: &[] }
    }

    fn header(version: u8, type_code: u8, flags: u32) -> Vec<u8> {
        let mut h = vec![version, type_code, 0, 0, 0, 0, 0, 0];
        h.extend_from_slice(&flags.to_le_bytes());
        h
    }

    #[test]
    fn unsupported_version_yields_empty() {
        let mut buf = header(4, 2, CellFlags::DOUBLE.bits());
        buf.extend_from_slice(&3.14f64.to_le_bytes());
        let cell = decode(&buf, 0, &empty_tables());
        assert_eq!(cell.value, CellValue::Empty);
    }

    #[test]
    fn double_only_decodes_number() {
        // Scenario 3 from spec §8: header with only hasDouble set, payload
        // is the IEEE-754 encoding of 3.14.
        let mut buf = header(5, 2, CellFlags::DOUBLE.bits());
        buf.extend_from_slice(&3.14f64.to_le_bytes());
        let cell = decode(&buf, 0, &empty_tables());
        assert_eq!(cell.value, CellValue::Number(3.14));
        assert_eq!(cell.metadata.cell_style_id, None);
        assert_eq!(cell.metadata.text_style_id, None);
    }

    #[test]
    fn decimal128_round_trips_through_formula() {
        // Construct bytes matching the spec's bit layout directly, then
        // check decode() against the same formula independently derived
        // (the spec's own worked numeral is internally inconsistent, so
        // we pin the oracle to the documented bit layout instead).
        let sign = 0u8;
        let exponent: u16 = 6176; // unbiased exponent 0
        let mantissa: u128 = 314_159;

        let mut bytes = [0u8; 16];
        bytes[..14].copy_from_slice(&(mantissa as u128 & ((1u128 << 112) - 1)).to_le_bytes()[..14]);
        let mantissa_top_bit = ((mantissa >> 112) & 1) as u8;
        let exp_low = (exponent & 0x7F) as u8;
        let exp_high = (exponent >> 7) as u8;
        bytes[14] = (exp_low << 1) | mantissa_top_bit;
        bytes[15] = (sign << 7) | exp_high;

        let decoded = decode_decimal128(&bytes);
        assert!((decoded - 314_159.0).abs() < 1e-6);
    }

    #[test]
    fn text_cell_resolves_string_table() {
        let mut buf = header(5, 3, CellFlags::STRING_ID.bits());
        buf.extend_from_slice(&0u32.to_le_bytes());
        let tables = CellTables {
            strings: &["hello".to_string()],
            rich_text: &[],
            number_formats: &[],
            currency_formats: &[],
        };
        let cell = decode(&buf, 0, &tables);
        assert_eq!(cell.value, CellValue::Text("hello".to_string()));
    }

    #[test]
    fn zero_seconds_date_is_empty() {
        let mut buf = header(5, 4, CellFlags::SECONDS.bits());
        buf.extend_from_slice(&0.0f64.to_le_bytes());
        let cell = decode(&buf, 0, &empty_tables());
        assert_eq!(cell.value, CellValue::Empty);
    }

    #[test]
    fn nonzero_seconds_date_decodes() {
        let mut buf = header(5, 4, CellFlags::SECONDS.bits());
        buf.extend_from_slice(&86_400.0f64.to_le_bytes());
        let cell = decode(&buf, 0, &empty_tables());
        assert_eq!(cell.value, CellValue::Date(86_400.0));
    }

    #[test]
    fn date_converts_to_the_following_day() {
        let converted = CellValue::Date(86_400.0).as_datetime().unwrap();
        assert_eq!(converted.to_rfc3339(), "2001-01-02T00:00:00+00:00");
    }

    #[test]
    fn non_date_values_have_no_datetime() {
        assert_eq!(CellValue::Number(1.0).as_datetime(), None);
    }

    #[test]
    fn discarded_ids_still_advance_cursor() {
        // FORMAT_ID is read (and discarded) before FORMULA_ID; if the
        // discarded field failed to advance the cursor, FORMULA_ID would
        // decode the wrong four bytes.
        let flags = CellFlags::DOUBLE | CellFlags::FORMAT_ID | CellFlags::FORMULA_ID;
        let mut buf = header(5, 2, flags.bits());
        buf.extend_from_slice(&1.5f64.to_le_bytes());
        buf.extend_from_slice(&999u32.to_le_bytes()); // format_id, discarded
        buf.extend_from_slice(&7u32.to_le_bytes()); // formula_id
        let cell = decode(&buf, 0, &empty_tables());
        assert_eq!(cell.value, CellValue::Number(1.5));
        assert_eq!(cell.metadata.formula_id, Some(7));
    }

    #[test]
    fn decode_same_buffer_twice_is_equal() {
        let mut buf = header(5, 2, CellFlags::DOUBLE.bits());
        buf.extend_from_slice(&2.5f64.to_le_bytes());
        let a = decode(&buf, 0, &empty_tables());
        let b = decode(&buf, 0, &empty_tables());
        assert_eq!(a, b);
    }
}
