//! Error type shared by the archive reader/writer and the `office` module.

use std::fmt;

/// What went wrong reading or writing an archive.
#[derive(Debug)]
pub enum ErrorKind {
    Io(std::io::Error),
    FileNotFound(String),
    UnsupportedCompressionMethod(u16),
    InvalidArchive(String),
    ChecksumMismatch { expected: u32, actual: u32 },
    SizeMismatch { expected: u64, actual: u64 },
}

#[derive(Debug)]
pub struct Error(ErrorKind);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error(ErrorKind::Io(e))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ErrorKind::Io(e) => write!(f, "i/o error: {e}"),
            ErrorKind::FileNotFound(name) => write!(f, "file not found in archive: {name}"),
            ErrorKind::UnsupportedCompressionMethod(id) => write!(f, "unsupported compression method: {id}"),
            ErrorKind::InvalidArchive(msg) => write!(f, "invalid zip archive: {msg}"),
            ErrorKind::ChecksumMismatch { expected, actual } => {
                write!(f, "crc32 mismatch: expected {expected:#010x}, got {actual:#010x}")
            },
            ErrorKind::SizeMismatch { expected, actual } => {
                write!(f, "uncompressed size mismatch: expected {expected}, got {actual}")
            },
        }
    }
}

impl std::error::Error for Error {}
