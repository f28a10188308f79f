//! Shared synthetic-package builder for engine unit tests: encodes raw
//! `.iwa` frames by hand (mirroring [`crate::object_store`]'s own test
//! helper) so each test can assemble exactly the records a scenario
//! needs without a fixture file on disk.

#![cfg(test)]

use std::collections::HashMap;

use prost::Message;

use crate::error::Result;
use crate::package::PackageStorage;

struct Mem(HashMap<String, Vec<u8>>);

impl PackageStorage for Mem {
    fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        Ok(self.0.get(path).cloned().unwrap_or_default())
    }
    fn size(&self, path: &str) -> Result<u64> {
        Ok(self.0.get(path).map(|d| d.len() as u64).unwrap_or(0))
    }
    fn iter_entries(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }
}

fn encode_frame(object_id: u64, type_code: u32, payload: &[u8]) -> Vec<u8> {
    let mut message_info = Vec::new();
    message_info.extend(crate::varint::encode_varint(1 << 3));
    message_info.extend(crate::varint::encode_varint(type_code as u64));
    message_info.extend(crate::varint::encode_varint(3 << 3));
    message_info.extend(crate::varint::encode_varint(payload.len() as u64));

    let mut archive_info = Vec::new();
    archive_info.extend(crate::varint::encode_varint(1 << 3));
    archive_info.extend(crate::varint::encode_varint(object_id));
    archive_info.extend(crate::varint::encode_varint((2 << 3) | 2));
    archive_info.extend(crate::varint::encode_varint(message_info.len() as u64));
    archive_info.extend(message_info);

    let mut frame = crate::varint::encode_varint(archive_info.len() as u64);
    frame.extend(archive_info);
    frame.extend_from_slice(payload);
    frame
}

/// One record to seed into a synthetic package: its object id, registry
/// type code, and already-encoded protobuf payload.
pub(crate) struct Record {
    pub id: u64,
    pub type_code: u32,
    pub payload: Vec<u8>,
}

pub(crate) fn record<M: Message>(id: u64, type_code: u32, message: &M) -> Record {
    Record { id, type_code, payload: message.encode_to_vec() }
}

/// Build an [`crate::object_store::ObjectStore`] containing every given
/// record, all packed into one synthetic `.iwa` file.
pub(crate) fn build_store(records: Vec<Record>) -> crate::object_store::ObjectStore {
    let mut bytes = Vec::new();
    for r in records {
        bytes.extend(encode_frame(r.id, r.type_code, &r.payload));
    }
    let mut files = HashMap::new();
    files.insert("Index/Document.iwa".to_string(), bytes);
    crate::object_store::ObjectStore::load(&Mem(files)).unwrap()
}
