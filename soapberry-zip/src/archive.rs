//! Minimal ZIP container reader/writer: central directory parsing, local
//! file header location, and a streaming writer that emits a trailing data
//! descriptor per entry. Supports Store and Deflate only — the two methods
//! iWork packages actually use.

use std::io::Write;

use crate::errors::{Error, ErrorKind};

const LOCAL_HEADER_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];
const CENTRAL_DIR_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];
const EOCD_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];
const DATA_DESCRIPTOR_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x07, 0x08];

/// The compression method recorded for a ZIP entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Store,
    Deflate,
    Other(u16),
}

impl CompressionMethod {
    fn from_u16(v: u16) -> Self {
        match v {
            0 => Self::Store,
            8 => Self::Deflate,
            other => Self::Other(other),
        }
    }

    fn to_u16(self) -> u16 {
        match self {
            Self::Store => 0,
            Self::Deflate => 8,
            Self::Other(v) => v,
        }
    }

    pub fn as_id(&self) -> CompressionId {
        CompressionId((*self).to_u16())
    }
}

pub struct CompressionId(u16);

impl CompressionId {
    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

#[derive(Debug, Clone)]
struct CentralDirectoryEntry {
    name: String,
    method: CompressionMethod,
    crc32: u32,
    compressed_size: u64,
    uncompressed_size: u64,
    local_header_offset: u64,
    is_dir: bool,
}

/// An opaque handle locating an entry's local file header, obtained from
/// [`EntryView::wayfinder`] and redeemed via [`ZipSliceArchive::get_entry`].
#[derive(Debug, Clone, Copy)]
pub struct ZipArchiveEntryWayfinder(usize);

/// Entry-point for opening a ZIP archive backed by an in-memory slice.
pub struct ZipArchive;

impl ZipArchive {
    pub fn from_slice<T: AsRef<[u8]>>(data: T) -> Result<ZipSliceArchive<T>, Error> {
        ZipSliceArchive::from_slice(data)
    }
}

/// A parsed central directory over a byte slice (or anything `AsRef<[u8]>`).
pub struct ZipSliceArchive<T> {
    data: T,
    central_entries: Vec<CentralDirectoryEntry>,
}

impl<T: AsRef<[u8]>> ZipSliceArchive<T> {
    pub fn from_slice(data: T) -> Result<Self, Error> {
        let eocd = find_eocd(data.as_ref())?;
        let bytes = data.as_ref();
        let cd_start = eocd.cd_offset as usize;
        let cd_end = cd_start + eocd.cd_size as usize;
        if cd_end > bytes.len() || cd_start > cd_end {
            return Err(ErrorKind::InvalidArchive("central directory out of range".into()).into());
        }

        let mut central_entries = Vec::with_capacity(eocd.total_entries as usize);
        let mut pos = cd_start;
        while pos < cd_end {
            let (entry, consumed) = parse_central_entry(&bytes[pos..cd_end])?;
            pos += consumed;
            central_entries.push(entry);
        }

        Ok(Self { data, central_entries })
    }

    pub fn entries(&self) -> impl Iterator<Item = Result<EntryView<'_>, Error>> {
        self.central_entries
            .iter()
            .enumerate()
            .map(|(index, entry)| Ok(EntryView { entry, index }))
    }

    pub fn get_entry(&self, wayfinder: ZipArchiveEntryWayfinder) -> Result<Entry<'_>, Error> {
        let cde = self
            .central_entries
            .get(wayfinder.0)
            .ok_or_else(|| Error::from(ErrorKind::InvalidArchive("dangling entry wayfinder".into())))?;

        let bytes = self.data.as_ref();
        let local_off = cde.local_header_offset as usize;
        let header = bytes
            .get(local_off..local_off + 30)
            .ok_or_else(|| Error::from(ErrorKind::InvalidArchive("truncated local file header".into())))?;
        if header[0..4] != LOCAL_HEADER_SIGNATURE {
            return Err(ErrorKind::InvalidArchive("bad local file header signature".into()).into());
        }
        let name_len = u16::from_le_bytes([header[26], header[27]]) as usize;
        let extra_len = u16::from_le_bytes([header[28], header[29]]) as usize;
        let data_start = local_off + 30 + name_len + extra_len;
        let data_end = data_start + cde.compressed_size as usize;
        let data = bytes
            .get(data_start..data_end)
            .ok_or_else(|| Error::from(ErrorKind::InvalidArchive("truncated entry data".into())))?;

        Ok(Entry {
            data,
            crc32: cde.crc32,
            uncompressed_size: cde.uncompressed_size,
        })
    }
}

/// A single entry as seen while walking the central directory.
pub struct EntryView<'a> {
    entry: &'a CentralDirectoryEntry,
    index: usize,
}

impl<'a> EntryView<'a> {
    pub fn file_path(&self) -> EntryPath<'a> {
        EntryPath(self.entry.name.as_str())
    }

    pub fn is_dir(&self) -> bool {
        self.entry.is_dir
    }

    pub fn wayfinder(&self) -> ZipArchiveEntryWayfinder {
        ZipArchiveEntryWayfinder(self.index)
    }

    pub fn compression_method(&self) -> CompressionMethod {
        self.entry.method
    }

    pub fn uncompressed_size_hint(&self) -> u64 {
        self.entry.uncompressed_size
    }
}

/// An entry's name, as stored in the central directory (already decoded
/// lossily from UTF-8; ZIP names this crate writes are always valid UTF-8).
pub struct EntryPath<'a>(&'a str);

impl<'a> EntryPath<'a> {
    /// Rejects traversal components and strips a leading separator.
    pub fn try_normalize(&self) -> Result<NormalizedPath, Error> {
        if self.0.contains("..") {
            return Err(ErrorKind::InvalidArchive(format!("unsafe archive path: {}", self.0)).into());
        }
        Ok(NormalizedPath(self.0.trim_start_matches('/').replace('\\', "/")))
    }
}

impl<'a> AsRef<[u8]> for EntryPath<'a> {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

pub struct NormalizedPath(String);

impl AsRef<str> for NormalizedPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Redeemed entry data, ready for decompression.
pub struct Entry<'a> {
    data: &'a [u8],
    crc32: u32,
    uncompressed_size: u64,
}

impl<'a> Entry<'a> {
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn claim_verifier(&self) -> Verifier {
        Verifier {
            expected_crc32: self.crc32,
            expected_uncompressed_size: self.uncompressed_size,
        }
    }

    pub fn verifying_reader<R: std::io::Read>(&self, inner: R) -> VerifyingReader<R> {
        VerifyingReader(inner)
    }
}

/// What a decompressed entry's actual bytes looked like, to compare against
/// the central directory's recorded crc32/size.
pub struct ZipVerification {
    pub crc: u32,
    pub uncompressed_size: u64,
}

pub struct Verifier {
    expected_crc32: u32,
    expected_uncompressed_size: u64,
}

impl Verifier {
    pub fn valid(self, actual: ZipVerification) -> Result<(), Error> {
        if actual.crc != self.expected_crc32 {
            return Err(ErrorKind::ChecksumMismatch {
                expected: self.expected_crc32,
                actual: actual.crc,
            }
            .into());
        }
        if actual.uncompressed_size != self.expected_uncompressed_size {
            return Err(ErrorKind::SizeMismatch {
                expected: self.expected_uncompressed_size,
                actual: actual.uncompressed_size,
            }
            .into());
        }
        Ok(())
    }
}

/// Transparent pass-through reader returned by [`Entry::verifying_reader`].
pub struct VerifyingReader<R>(R);

impl<R: std::io::Read> std::io::Read for VerifyingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}

fn find_eocd(bytes: &[u8]) -> Result<Eocd, Error> {
    if bytes.len() < 22 {
        return Err(ErrorKind::InvalidArchive("too small to contain an end-of-central-directory record".into()).into());
    }
    let max_comment = 65535usize;
    let search_start = bytes.len().saturating_sub(22 + max_comment);
    for start in (search_start..=bytes.len() - 22).rev() {
        if bytes[start..start + 4] != EOCD_SIGNATURE {
            continue;
        }
        let comment_len = u16::from_le_bytes([bytes[start + 20], bytes[start + 21]]) as usize;
        if start + 22 + comment_len != bytes.len() {
            continue;
        }
        let total_entries = u16::from_le_bytes([bytes[start + 10], bytes[start + 11]]);
        let cd_size = u32::from_le_bytes([bytes[start + 12], bytes[start + 13], bytes[start + 14], bytes[start + 15]]);
        let cd_offset = u32::from_le_bytes([bytes[start + 16], bytes[start + 17], bytes[start + 18], bytes[start + 19]]);
        return Ok(Eocd {
            cd_offset,
            cd_size,
            total_entries,
        });
    }
    Err(ErrorKind::InvalidArchive("end of central directory record not found".into()).into())
}

struct Eocd {
    cd_offset: u32,
    cd_size: u32,
    total_entries: u16,
}

fn parse_central_entry(buf: &[u8]) -> Result<(CentralDirectoryEntry, usize), Error> {
    if buf.len() < 46 || buf[0..4] != CENTRAL_DIR_SIGNATURE {
        return Err(ErrorKind::InvalidArchive("bad central directory entry signature".into()).into());
    }
    let method_raw = u16::from_le_bytes([buf[10], buf[11]]);
    let crc32 = u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]);
    let compressed_size = u32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]) as u64;
    let uncompressed_size = u32::from_le_bytes([buf[24], buf[25], buf[26], buf[27]]) as u64;
    let name_len = u16::from_le_bytes([buf[28], buf[29]]) as usize;
    let extra_len = u16::from_le_bytes([buf[30], buf[31]]) as usize;
    let comment_len = u16::from_le_bytes([buf[32], buf[33]]) as usize;
    let local_header_offset = u32::from_le_bytes([buf[42], buf[43], buf[44], buf[45]]) as u64;

    let total_len = 46 + name_len + extra_len + comment_len;
    if buf.len() < total_len {
        return Err(ErrorKind::InvalidArchive("truncated central directory entry".into()).into());
    }
    let name = String::from_utf8_lossy(&buf[46..46 + name_len]).into_owned();
    let is_dir = name.ends_with('/');

    Ok((
        CentralDirectoryEntry {
            is_dir,
            name,
            method: CompressionMethod::from_u16(method_raw),
            crc32,
            compressed_size,
            uncompressed_size,
            local_header_offset,
        },
        total_len,
    ))
}

/// Streaming ZIP writer: every entry is written with its size/crc32 in a
/// trailing data descriptor, so callers never need to know them up front.
pub struct ZipArchiveWriter<W> {
    inner: W,
    offset: u64,
    central_entries: Vec<CentralDirectoryEntry>,
}

impl<W: Write> ZipArchiveWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            offset: 0,
            central_entries: Vec::new(),
        }
    }

    pub fn new_file<'a>(&'a mut self, name: &str) -> FileBuilder<'a, W> {
        FileBuilder {
            writer: self,
            name: name.to_string(),
            method: CompressionMethod::Store,
        }
    }

    pub fn finish(mut self) -> Result<W, Error> {
        let cd_offset = self.offset;
        let total_entries = self.central_entries.len() as u16;
        for entry in std::mem::take(&mut self.central_entries) {
            write_central_entry(&mut self.inner, &entry)?;
            self.offset += 46 + entry.name.len() as u64;
        }
        let cd_size = self.offset - cd_offset;
        write_eocd(&mut self.inner, total_entries, cd_size as u32, cd_offset as u32)?;
        Ok(self.inner)
    }
}

pub struct FileBuilder<'a, W> {
    writer: &'a mut ZipArchiveWriter<W>,
    name: String,
    method: CompressionMethod,
}

impl<'a, W: Write> FileBuilder<'a, W> {
    pub fn compression_method(mut self, method: CompressionMethod) -> Self {
        self.method = method;
        self
    }

    pub fn start(self) -> Result<(EntryHandle<'a, W>, WrapConfig), Error> {
        let local_header_offset = self.writer.offset;
        let header_len = write_local_header(&mut self.writer.inner, &self.name, self.method)?;
        self.writer.offset += header_len as u64;
        Ok((
            EntryHandle {
                writer: self.writer,
                name: self.name,
                method: self.method,
                local_header_offset,
                compressed_size: 0,
            },
            WrapConfig,
        ))
    }
}

/// An open entry's data section. Implements `Write`; bytes written here are
/// whatever the caller's compressor (or nothing, for Store) produces.
pub struct EntryHandle<'a, W> {
    writer: &'a mut ZipArchiveWriter<W>,
    name: String,
    method: CompressionMethod,
    local_header_offset: u64,
    compressed_size: u64,
}

impl<'a, W: Write> Write for EntryHandle<'a, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.writer.inner.write(buf)?;
        self.compressed_size += n as u64;
        self.writer.offset += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.inner.flush()
    }
}

impl<'a, W: Write> EntryHandle<'a, W> {
    pub fn finish(self, desc: Descriptor) -> Result<(), Error> {
        write_data_descriptor(&mut self.writer.inner, desc.crc32, self.compressed_size, desc.uncompressed_size)?;
        self.writer.offset += 16;
        self.writer.central_entries.push(CentralDirectoryEntry {
            name: self.name,
            method: self.method,
            crc32: desc.crc32,
            compressed_size: self.compressed_size,
            uncompressed_size: desc.uncompressed_size,
            local_header_offset: self.local_header_offset,
            is_dir: false,
        });
        Ok(())
    }
}

/// Marker returned alongside a fresh [`EntryHandle`]; wraps a writer with
/// crc32/size tracking ahead of whatever compressor the caller applies.
pub struct WrapConfig;

impl WrapConfig {
    pub fn wrap<R: Write>(self, inner: R) -> CountingWriter<R> {
        CountingWriter {
            inner,
            hasher: crc32fast::Hasher::new(),
            count: 0,
        }
    }
}

pub struct CountingWriter<R> {
    inner: R,
    hasher: crc32fast::Hasher,
    count: u64,
}

impl<R: Write> Write for CountingWriter<R> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl<R> CountingWriter<R> {
    pub fn finish(self) -> Result<(R, Descriptor), Error> {
        Ok((
            self.inner,
            Descriptor {
                crc32: self.hasher.finalize(),
                uncompressed_size: self.count,
            },
        ))
    }
}

pub struct Descriptor {
    crc32: u32,
    uncompressed_size: u64,
}

fn write_local_header<W: Write>(w: &mut W, name: &str, method: CompressionMethod) -> Result<usize, Error> {
    let name_bytes = name.as_bytes();
    w.write_all(&LOCAL_HEADER_SIGNATURE)?;
    w.write_all(&20u16.to_le_bytes())?; // version needed to extract
    w.write_all(&0x0008u16.to_le_bytes())?; // bit 3: sizes/crc follow in a data descriptor
    w.write_all(&method.as_id().as_u16().to_le_bytes())?;
    w.write_all(&0u16.to_le_bytes())?; // mod time
    w.write_all(&0u16.to_le_bytes())?; // mod date
    w.write_all(&0u32.to_le_bytes())?; // crc32 (deferred)
    w.write_all(&0u32.to_le_bytes())?; // compressed size (deferred)
    w.write_all(&0u32.to_le_bytes())?; // uncompressed size (deferred)
    w.write_all(&(name_bytes.len() as u16).to_le_bytes())?;
    w.write_all(&0u16.to_le_bytes())?; // extra field length
    w.write_all(name_bytes)?;
    Ok(30 + name_bytes.len())
}

fn write_data_descriptor<W: Write>(w: &mut W, crc32: u32, compressed_size: u64, uncompressed_size: u64) -> Result<(), Error> {
    w.write_all(&DATA_DESCRIPTOR_SIGNATURE)?;
    w.write_all(&crc32.to_le_bytes())?;
    w.write_all(&(compressed_size as u32).to_le_bytes())?;
    w.write_all(&(uncompressed_size as u32).to_le_bytes())?;
    Ok(())
}

fn write_central_entry<W: Write>(w: &mut W, entry: &CentralDirectoryEntry) -> Result<(), Error> {
    let name_bytes = entry.name.as_bytes();
    w.write_all(&CENTRAL_DIR_SIGNATURE)?;
    w.write_all(&((3u16 << 8) | 20).to_le_bytes())?; // version made by: unix, 2.0
    w.write_all(&20u16.to_le_bytes())?; // version needed to extract
    w.write_all(&0x0008u16.to_le_bytes())?;
    w.write_all(&entry.method.as_id().as_u16().to_le_bytes())?;
    w.write_all(&0u16.to_le_bytes())?; // mod time
    w.write_all(&0u16.to_le_bytes())?; // mod date
    w.write_all(&entry.crc32.to_le_bytes())?;
    w.write_all(&(entry.compressed_size as u32).to_le_bytes())?;
    w.write_all(&(entry.uncompressed_size as u32).to_le_bytes())?;
    w.write_all(&(name_bytes.len() as u16).to_le_bytes())?;
    w.write_all(&0u16.to_le_bytes())?; // extra field length
    w.write_all(&0u16.to_le_bytes())?; // comment length
    w.write_all(&0u16.to_le_bytes())?; // disk number start
    w.write_all(&0u16.to_le_bytes())?; // internal file attributes
    w.write_all(&0u32.to_le_bytes())?; // external file attributes
    w.write_all(&(entry.local_header_offset as u32).to_le_bytes())?;
    w.write_all(name_bytes)?;
    Ok(())
}

fn write_eocd<W: Write>(w: &mut W, total_entries: u16, cd_size: u32, cd_offset: u32) -> Result<(), Error> {
    w.write_all(&EOCD_SIGNATURE)?;
    w.write_all(&0u16.to_le_bytes())?; // disk number
    w.write_all(&0u16.to_le_bytes())?; // disk with central directory start
    w.write_all(&total_entries.to_le_bytes())?; // entries on this disk
    w.write_all(&total_entries.to_le_bytes())?; // entries total
    w.write_all(&cd_size.to_le_bytes())?;
    w.write_all(&cd_offset.to_le_bytes())?;
    w.write_all(&0u16.to_le_bytes())?; // comment length
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_an_empty_archive() {
        let writer = ZipArchiveWriter::new(Vec::new());
        let bytes = writer.finish().unwrap();
        let archive = ZipArchive::from_slice(bytes.as_slice()).unwrap();
        assert_eq!(archive.entries().count(), 0);
    }

    #[test]
    fn writes_and_reads_back_one_stored_entry() {
        let mut writer = ZipArchiveWriter::new(Vec::new());
        {
            let (mut entry, config) = writer.new_file("a.txt").start().unwrap();
            let mut counting = config.wrap(&mut entry);
            counting.write_all(b"hi").unwrap();
            let (_, desc) = counting.finish().unwrap();
            entry.finish(desc).unwrap();
        }
        let bytes = writer.finish().unwrap();

        let archive = ZipSliceArchive::from_slice(bytes.as_slice()).unwrap();
        let views: Vec<_> = archive.entries().collect::<Result<_, _>>().unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].file_path().try_normalize().unwrap().as_ref(), "a.txt");

        let entry = archive.get_entry(views[0].wayfinder()).unwrap();
        assert_eq!(entry.data(), b"hi");
    }
}
