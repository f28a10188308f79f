//! Framed stream reader (component B): decodes the length-delimited,
//! optionally Snappy-compressed record frames inside one `.iwa` archive
//! file into `(object_id, type_code, payload_bytes)` triples.
//!
//! iWork's Snappy framing is not the standard `sNaPpY` container: there is
//! no stream-identifier chunk emitted by convention, no CRC-32C checksum,
//! and the chunk header is four bytes (`type: u8 || length24: u24-le`)
//! rather than the standard three-byte length. Some legacy documents skip
//! the chunk framing entirely and store a bare, uncompressed payload.

use std::io::Read;

use crate::error::{Error, Result};
use crate::varint;
use prost::Message;

/// The five chunk types the iWork Snappy framing declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    StreamIdentifier,
    CompressedData,
    UncompressedData,
    Padding,
    ReservedSkippable,
}

impl ChunkType {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(ChunkType::StreamIdentifier),
            0x01 => Some(ChunkType::CompressedData),
            0x02 => Some(ChunkType::UncompressedData),
            0xFE => Some(ChunkType::Padding),
            0xFF => Some(ChunkType::ReservedSkippable),
            _ => None,
        }
    }
}

/// Decode one archive file's payload, handling both the chunk-framed and
/// bare legacy forms. Returns the concatenated, fully decompressed bytes.
pub fn decode_payload(data: &[u8]) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    match decode_framed(data) {
        Ok(decoded) => Ok(decoded),
        Err(framed_err) => {
            // Legacy fallback: a pure uncompressed payload with no chunk
            // framing at all. Only corrupt if neither interpretation
            // produces something that looks like a valid archive-info
            // header (a varint length followed by a parseable message).
            if looks_like_bare_archive(data) {
                Ok(data.to_vec())
            } else {
                Err(framed_err)
            }
        },
    }
}

fn decode_framed(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = snap::raw::Decoder::new();
    let mut out = Vec::new();
    let mut pos = 0usize;

    while pos < data.len() {
        if data.len() - pos < 4 {
            return Err(Error::PackageCorrupt(
                "truncated snappy chunk header".into(),
            ));
        }

        let header = &data[pos..pos + 4];
        let chunk_type = ChunkType::from_byte(header[0]).ok_or_else(|| {
            Error::PackageCorrupt(format!("unknown snappy chunk type: {}", header[0]))
        })?;
        let length = u32::from_le_bytes([header[1], header[2], header[3], 0]) as usize;
        pos += 4;

        if data.len() - pos < length {
            return Err(Error::PackageCorrupt("truncated snappy chunk body".into()));
        }
        let body = &data[pos..pos + length];
        pos += length;

        match chunk_type {
            ChunkType::StreamIdentifier | ChunkType::Padding | ChunkType::ReservedSkippable => {
                // Carries no payload bytes; skip.
            },
            ChunkType::UncompressedData => out.extend_from_slice(body),
            ChunkType::CompressedData => {
                let decompressed_len = snap::raw::decompress_len(body).map_err(|e| {
                    Error::PackageCorrupt(format!("invalid snappy frame: {e}"))
                })?;
                let mut buf = vec![0u8; decompressed_len];
                let n = decoder
                    .decompress(body, &mut buf)
                    .map_err(|e| Error::PackageCorrupt(format!("snappy decompress: {e}")))?;
                buf.truncate(n);
                out.extend_from_slice(&buf);
            },
        }
    }

    Ok(out)
}

/// A cheap plausibility check used only to decide whether to fall back to
/// treating a chunk-framing failure as a legacy bare payload: the first
/// bytes must parse as a varint length followed by at least that many
/// remaining bytes.
fn looks_like_bare_archive(data: &[u8]) -> bool {
    let Ok((len, consumed)) = varint::decode_varint_from_bytes(data) else {
        return false;
    };
    data.len() - consumed >= len as usize
}

/// One record payload's identity within an archive file, as declared by
/// its `MessageInfo` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub object_id: u64,
    pub type_code: u32,
    pub length: usize,
}

/// A single decoded frame: the record identity plus its raw payload
/// bytes. The reader does not itself parse the payload (component C
/// owns decoding).
#[derive(Debug, Clone)]
pub struct Frame {
    pub object_id: u64,
    pub type_code: u32,
    pub payload: Vec<u8>,
}

/// Iterate the frames of one decompressed archive-file body, yielding
/// `(object_id, type_code, payload_bytes)` triples. An archive-info may
/// declare more than one sub-payload (a primary message plus typed
/// extensions); each becomes its own [`Frame`] sharing the archive's
/// object id.
pub fn read_frames(data: &[u8]) -> Result<Vec<Frame>> {
    let mut frames = Vec::new();
    let mut cursor = std::io::Cursor::new(data);

    while cursor.position() < data.len() as u64 {
        let archive_info_length = varint::decode_varint(&mut cursor)
            .map_err(|_| Error::PackageCorrupt("truncated archive-info length".into()))?
            as usize;

        let mut archive_info_bytes = vec![0u8; archive_info_length];
        cursor
            .read_exact(&mut archive_info_bytes)
            .map_err(|_| Error::PackageCorrupt("truncated archive-info".into()))?;

        let archive_info = parse_archive_info(&archive_info_bytes)?;
        let object_id = archive_info.identifier.unwrap_or(0);

        for message_info in &archive_info.message_infos {
            let mut payload = vec![0u8; message_info.length as usize];
            cursor
                .read_exact(&mut payload)
                .map_err(|_| Error::PackageCorrupt("truncated message payload".into()))?;
            frames.push(Frame {
                object_id,
                type_code: message_info.type_,
                payload,
            });
        }
    }

    Ok(frames)
}

/// Minimal hand-rolled protobuf field parser for `ArchiveInfo`/`MessageInfo`.
/// These two messages bootstrap the type registry, so they cannot
/// themselves be decoded through the generated schema's dispatch table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ArchiveInfoHeader {
    identifier: Option<u64>,
    message_infos: Vec<MessageInfoHeader>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct MessageInfoHeader {
    type_: u32,
    #[allow(dead_code)]
    versions: Vec<u32>,
    length: u32,
}

fn parse_archive_info(data: &[u8]) -> Result<ArchiveInfoHeader> {
    let mut header = ArchiveInfoHeader::default();
    let mut pos = 0usize;

    while pos < data.len() {
        let (tag, consumed) = varint::decode_varint_from_bytes(&data[pos..])
            .map_err(|e| Error::PackageCorrupt(e.to_string()))?;
        pos += consumed;
        let field_number = tag >> 3;
        let wire_type = tag & 0x07;

        match (field_number, wire_type) {
            (1, 0) => {
                let (v, n) = varint::decode_varint_from_bytes(&data[pos..])
                    .map_err(|e| Error::PackageCorrupt(e.to_string()))?;
                header.identifier = Some(v);
                pos += n;
            },
            (2, 2) => {
                let (len, n) = varint::decode_varint_from_bytes(&data[pos..])
                    .map_err(|e| Error::PackageCorrupt(e.to_string()))?;
                pos += n;
                let end = pos + len as usize;
                if end > data.len() {
                    return Err(Error::PackageCorrupt("truncated message_info".into()));
                }
                header.message_infos.push(parse_message_info(&data[pos..end])?);
                pos = end;
            },
            _ => {
                pos = skip_field(data, pos, wire_type)?;
            },
        }
    }

    Ok(header)
}

fn parse_message_info(data: &[u8]) -> Result<MessageInfoHeader> {
    let mut info = MessageInfoHeader::default();
    let mut pos = 0usize;

    while pos < data.len() {
        let (tag, consumed) = varint::decode_varint_from_bytes(&data[pos..])
            .map_err(|e| Error::PackageCorrupt(e.to_string()))?;
        pos += consumed;
        let field_number = tag >> 3;
        let wire_type = tag & 0x07;

        match (field_number, wire_type) {
            (1, 0) => {
                let (v, n) = varint::decode_varint_from_bytes(&data[pos..])
                    .map_err(|e| Error::PackageCorrupt(e.to_string()))?;
                info.type_ = v as u32;
                pos += n;
            },
            (2, 0) => {
                let (v, n) = varint::decode_varint_from_bytes(&data[pos..])
                    .map_err(|e| Error::PackageCorrupt(e.to_string()))?;
                info.versions.push(v as u32);
                pos += n;
            },
            (3, 0) => {
                let (v, n) = varint::decode_varint_from_bytes(&data[pos..])
                    .map_err(|e| Error::PackageCorrupt(e.to_string()))?;
                info.length = v as u32;
                pos += n;
            },
            _ => {
                pos = skip_field(data, pos, wire_type)?;
            },
        }
    }

    Ok(info)
}

fn skip_field(data: &[u8], pos: usize, wire_type: u64) -> Result<usize> {
    match wire_type {
        0 => {
            let (_, n) = varint::decode_varint_from_bytes(&data[pos..])
                .map_err(|e| Error::PackageCorrupt(e.to_string()))?;
            Ok(pos + n)
        },
        1 => Ok(pos + 8),
        2 => {
            let (len, n) = varint::decode_varint_from_bytes(&data[pos..])
                .map_err(|e| Error::PackageCorrupt(e.to_string()))?;
            Ok(pos + n + len as usize)
        },
        5 => Ok(pos + 4),
        other => Err(Error::PackageCorrupt(format!(
            "unknown protobuf wire type: {other}"
        ))),
    }
}

// Referenced so `prost::Message` stays imported for downstream users of
// this module's `Frame` payloads without an unused-import warning here.
#[allow(dead_code)]
fn _assert_message_trait_in_scope<M: Message>() {}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(chunk_type: u8, body: &[u8]) -> Vec<u8> {
        let len = body.len() as u32;
        let mut out = vec![chunk_type, (len & 0xFF) as u8, ((len >> 8) & 0xFF) as u8, ((len >> 16) & 0xFF) as u8];
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn decodes_uncompressed_chunk() {
        let data = chunk(0x02, b"hello world");
        let decoded = decode_payload(&data).unwrap();
        assert_eq!(decoded, b"hello world");
    }

    #[test]
    fn skips_padding_and_stream_identifier_chunks() {
        let mut data = chunk(0x00, b"sNaPpY");
        data.extend(chunk(0xFE, &[0u8; 4]));
        data.extend(chunk(0x02, b"payload"));
        let decoded = decode_payload(&data).unwrap();
        assert_eq!(decoded, b"payload");
    }

    #[test]
    fn decodes_compressed_chunk() {
        let raw = b"the quick brown fox jumps over the lazy dog";
        let compressed = snap::raw::Encoder::new().compress_vec(raw).unwrap();
        let data = chunk(0x01, &compressed);
        let decoded = decode_payload(&data).unwrap();
        assert_eq!(decoded, raw);
    }

    #[test]
    fn falls_back_to_bare_payload() {
        // One archive-info record of length 2 containing field 1=varint 5,
        // with no chunk framing at all (first byte 0x02 is not length-
        // consistent as a chunk type here because the declared chunk
        // length would overrun the buffer).
        let archive_info = vec![0x08, 0x05];
        let mut bare = varint::encode_varint(archive_info.len() as u64);
        bare.extend(archive_info);
        let decoded = decode_payload(&bare).unwrap();
        assert_eq!(decoded, bare);
    }

    #[test]
    fn reports_corruption_on_unknown_chunk_type() {
        let data = chunk(0x05, b"???");
        assert!(decode_payload(&data).is_err());
    }

    #[test]
    fn reads_frames_from_decoded_payload() {
        // ArchiveInfo: identifier=7, one MessageInfo{type=42, length=3}
        let message_info = vec![0x08, 0x2A, 0x18, 0x03];
        let mut archive_info = Vec::new();
        archive_info.extend(varint::encode_varint(1 << 3));
        archive_info.extend(varint::encode_varint(7));
        archive_info.extend(varint::encode_varint((2 << 3) | 2));
        archive_info.extend(varint::encode_varint(message_info.len() as u64));
        archive_info.extend(message_info);

        let mut stream = varint::encode_varint(archive_info.len() as u64);
        stream.extend(archive_info);
        stream.extend(b"abc");

        let frames = read_frames(&stream).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].object_id, 7);
        assert_eq!(frames[0].type_code, 42);
        assert_eq!(frames[0].payload, b"abc");
    }
}
