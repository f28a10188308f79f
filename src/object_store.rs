//! Object store (component C): every record from every archive file in
//! the package, indexed by object identifier, with typed memoized decode.

use std::any::Any;
use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::Mutex;
use prost::Message;

use crate::error::Result;
use crate::frame;
use crate::package::PackageStorage;
use crate::registry::DecodableRecord;

struct RawRecord {
    type_code: u32,
    payload: Bytes,
    decoded: Mutex<Option<Box<dyn Any + Send + Sync>>>,
}

/// A reference to another record: an object identifier plus an optional
/// type hint (spec §3's "Reference").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reference {
    pub identifier: u64,
}

impl From<u64> for Reference {
    fn from(identifier: u64) -> Self {
        Reference { identifier }
    }
}

/// Indexes every record across every `.iwa` file in a package and
/// provides typed, memoized dereference.
///
/// Read-only after construction: concurrent `get`/`deref` calls are safe,
/// guarded by a short-lived lock per record's decode cache rather than
/// one lock over the whole store.
pub struct ObjectStore {
    records: HashMap<u64, RawRecord>,
}

impl ObjectStore {
    /// Build a store by reading every `.iwa` entry from `storage`,
    /// decompressing its frames, and indexing every resulting record by
    /// object id. Frames whose object id collides silently overwrite one
    /// another under "last file wins" — packages never legitimately
    /// reuse an identifier (spec §3's uniqueness invariant).
    pub fn load(storage: &dyn PackageStorage) -> Result<Self> {
        let mut records = HashMap::new();

        for entry in storage.iter_entries() {
            if !entry.ends_with(".iwa") {
                continue;
            }
            let raw = storage.read(&entry)?;
            let decompressed = frame::decode_payload(&raw)?;
            for f in frame::read_frames(&decompressed)? {
                records.insert(
                    f.object_id,
                    RawRecord {
                        type_code: f.type_code,
                        payload: Bytes::from(f.payload),
                        decoded: Mutex::new(None),
                    },
                );
            }
        }

        Ok(Self { records })
    }

    pub fn type_code_of(&self, id: u64) -> Option<u32> {
        self.records.get(&id).map(|r| r.type_code)
    }

    /// Decode the record at `id` as `T`, memoizing the result. Returns
    /// `None` if the id is absent (a dereference miss, never surfaced as
    /// an error — spec §7) or if the record's declared type code is not
    /// one of `T::TYPE_CODES` (the schema-unknown / wrong-type case,
    /// also tolerated by skipping).
    pub fn get<T: DecodableRecord>(&self, id: u64) -> Option<T> {
        let raw = self.records.get(&id)?;
        if !T::TYPE_CODES.contains(&raw.type_code) {
            return None;
        }

        let mut cache = raw.decoded.lock();
        if let Some(cached) = cache.as_ref()
            && let Some(value) = cached.downcast_ref::<T>()
        {
            return Some(value.clone());
        }

        let decoded = T::decode(raw.payload.clone()).ok()?;
        *cache = Some(Box::new(decoded.clone()));
        Some(decoded)
    }

    /// Resolve a reference to a typed record, chaining by identifier
    /// lookup (spec §4.C's `deref<T>`).
    pub fn deref<T: DecodableRecord>(&self, reference: Reference) -> Option<T> {
        self.get::<T>(reference.identifier)
    }

    /// The first record in the store decoding as `T`, with its id. Used
    /// to locate the well-known document-type anchor record without
    /// knowing its identifier ahead of time (spec §4.D).
    pub fn first_of_type<T: DecodableRecord>(&self) -> Option<(u64, T)> {
        self.records
            .iter()
            .find(|(_, raw)| T::TYPE_CODES.contains(&raw.type_code))
            .and_then(|(&id, _)| self.get::<T>(id).map(|v| (id, v)))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
