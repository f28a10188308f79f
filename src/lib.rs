//! Reader for Apple iWork document packages (Pages, Numbers, Keynote).
//!
//! The crate is organized as a dependency-ordered stack of small
//! components, leaves first:
//!
//! - [`package`] — open a directory-form or ZIP-form package, read entries.
//! - [`frame`] / [`varint`] — decode the length-delimited, optionally
//!   Snappy-compressed record frames inside a single `.iwa` archive.
//! - [`registry`] / [`protos`] — the generated protobuf schema and the
//!   type-code → decode-function dispatch table.
//! - [`object_store`] — index every record across every archive file by
//!   object identifier; typed dereference.
//! - [`metadata`] — the package-level metadata record: data-file registry,
//!   component/slide enumeration, property dictionary.
//! - [`style`] — walk style parent-pointer chains into normalized values.
//! - [`cell`] — decode a single spreadsheet cell's packed byte layout.
//! - [`path`] — normalize the shape-path archive variants.
//! - [`visitor`] — the push API the traversal engine drives.
//! - [`engine`] — the document-type-dispatched traversal engine itself.
//! - [`document`] — a convenience entry point wiring the above together.
//!
//! ```rust,no_run
//! use rambutan::document::Document;
//!
//! # async fn run() -> rambutan::Result<()> {
//! let doc = Document::open("report.pages")?;
//! struct Counter(u32);
//! impl rambutan::visitor::Visitor for Counter {}
//! let mut visitor = Counter(0);
//! doc.traverse(&mut visitor).await?;
//! # Ok(())
//! # }
//! ```

pub mod cell;
pub mod document;
pub mod engine;
pub mod error;
pub mod frame;
pub mod metadata;
pub mod object_store;
pub mod package;
pub mod path;
pub mod registry;
pub mod style;
pub mod varint;
pub mod visitor;

#[allow(
    clippy::all,
    missing_docs,
    non_camel_case_types,
    non_snake_case,
    non_upper_case_globals
)]
pub mod protos {
    include!(concat!(env!("OUT_DIR"), "/iwork_protos.rs"));
}

pub use error::{Error, Result};

/// Apple's reference epoch for cell-storage `seconds` fields and other
/// timestamp-bearing records: 2001-01-01T00:00:00Z.
pub const APPLE_REFERENCE_EPOCH_UNIX: i64 = 978_307_200;

/// Decimal128 exponent bias used by the cell storage decoder (§4.F).
pub const DECIMAL128_EXPONENT_BIAS: i32 = 6176;

/// Cell-storage "automatic decimal places" sentinel value.
pub const AUTOMATIC_DECIMAL_PLACES: u32 = 253;
