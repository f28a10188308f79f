//! Convenience entry point: opens a package, builds the object store and
//! metadata layer, and wires them into the traversal engine so a caller
//! doesn't have to assemble those pieces by hand.

use std::path::Path;

use crate::engine::Engine;
use crate::error::Result;
use crate::metadata::Metadata;
use crate::object_store::ObjectStore;
use crate::package::{self, PackageStorage};
use crate::visitor::{DocumentType, Visitor};

/// An opened iWork package, ready to traverse.
pub struct Document {
    storage: Box<dyn PackageStorage>,
    store: ObjectStore,
    metadata: Metadata,
}

impl Document {
    /// Open the package at `path` (a directory-form bundle or a single
    /// ZIP-form `.pages`/`.key`/`.numbers` file) and load its full object
    /// store and metadata eagerly.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let storage = package::open(path)?;
        let store = ObjectStore::load(storage.as_ref())?;
        let metadata = Metadata::load(&store);
        Ok(Self { storage, store, metadata })
    }

    /// The document type detected from the package's anchor record, if
    /// one of the three recognized kinds is present.
    pub fn document_type(&self) -> Option<DocumentType> {
        Engine::new(&self.store, &self.metadata, self.storage.as_ref()).detect_document_type()
    }

    /// Drive `visitor` through this document's full event stream.
    pub async fn traverse<V: Visitor>(&self, visitor: &mut V) -> Result<()> {
        Engine::new(&self.store, &self.metadata, self.storage.as_ref()).traverse(visitor).await
    }
}
