//! Error types shared by every layer of the crate.

use thiserror::Error;

/// Errors produced while opening, decoding or traversing an iWork package.
///
/// Per the error-handling design: corruption is fatal, missing references
/// and unknown subtypes are tolerated by skipping, and visitor/OCR failures
/// are surfaced without corrupting engine state.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("package not found: {0}")]
    PackageNotFound(String),

    #[error("entry not found: {0}")]
    EntryNotFound(String),

    #[error("package corrupt: {0}")]
    PackageCorrupt(String),

    #[error("unrecognized record type: {0}")]
    SchemaUnknown(u32),

    #[error("visitor error: {0}")]
    VisitorError(Box<dyn std::error::Error + Send + Sync>),

    #[error("protobuf decode error: {0}")]
    ProtobufDecode(#[from] prost::DecodeError),

    #[error("plist error: {0}")]
    Plist(#[from] plist::Error),

    #[error("zip error: {0}")]
    Zip(#[from] soapberry_zip::Error),
}

/// Internal-only condition: a reference that does not resolve. Never
/// surfaced to callers as an [`Error`] — the object store and traversal
/// engine turn it into a skipped event or an absent field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DereferenceMiss;

pub type Result<T> = std::result::Result<T, Error>;
