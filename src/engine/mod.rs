//! Traversal engine (component G): the document-type-dispatched walker
//! that drives a caller-supplied [`crate::visitor::Visitor`] with a
//! strictly ordered event stream.
//!
//! Split along the same lines as the document-type dispatch itself:
//! [`word`] for Pages-shaped packages, [`sheet`] for Numbers,
//! [`presentation`] for Keynote, with the character-range merge shared in
//! [`text`] and the table tile walk shared in [`table`]. [`drawable`]
//! holds the polymorphic per-kind dispatch every document type needs.

mod drawable;
mod presentation;
mod sheet;
mod table;
#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests;
mod text;
mod word;

use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::object_store::ObjectStore;
use crate::package::PackageStorage;
use crate::protos::{kn, tn, tp};
use crate::visitor::{DocumentType, Visitor};

/// Counters for a single list, keyed by nesting level. Entering a level
/// for the first time (or with a different list-style identity than the
/// one last seen there) resets its count to 1; leaving a level drops
/// every deeper entry so re-entering starts fresh.
pub(crate) struct ListCounters {
    stack: Vec<(u64, u32)>,
}

impl ListCounters {
    fn new() -> Self {
        Self { stack: Vec::new() }
    }

    fn clear(&mut self) {
        self.stack.clear();
    }

    /// Advance the counter at `level` for list-style identity
    /// `style_identity`, returning the new item number.
    fn next(&mut self, level: u32, style_identity: u64) -> u32 {
        let level = level as usize;
        if self.stack.len() > level + 1 {
            self.stack.truncate(level + 1);
        }
        if self.stack.len() <= level {
            self.stack.resize(level + 1, (style_identity, 0));
        }
        let (current_identity, count) = &mut self.stack[level];
        if *current_identity != style_identity {
            *current_identity = style_identity;
            *count = 0;
        }
        *count += 1;
        *count
    }
}

/// Bundles the store, metadata and package together for the duration of
/// one traversal. Borrowed, not owned: a caller may run multiple
/// traversals (each with its own visitor) over the same loaded package.
pub struct Engine<'a> {
    pub(crate) store: &'a ObjectStore,
    pub(crate) metadata: &'a Metadata,
    pub(crate) storage: &'a dyn PackageStorage,
}

impl<'a> Engine<'a> {
    pub fn new(store: &'a ObjectStore, metadata: &'a Metadata, storage: &'a dyn PackageStorage) -> Self {
        Self { store, metadata, storage }
    }

    /// Detect the document type from the store's anchor record and drive
    /// `visitor` through the corresponding traversal.
    pub async fn traverse<V: Visitor>(&self, visitor: &mut V) -> Result<()> {
        if let Some((_, doc)) = self.store.first_of_type::<tp::DocumentArchive>() {
            return word::traverse(self, visitor, &doc).await;
        }
        if let Some((_, doc)) = self.store.first_of_type::<tn::DocumentArchive>() {
            return sheet::traverse(self, visitor, &doc).await;
        }
        if let Some((_, show)) = self.store.first_of_type::<kn::ShowArchive>() {
            return presentation::traverse(self, visitor, &show).await;
        }
        Err(Error::PackageCorrupt("no recognized document anchor record in package".into()))
    }

    /// The document type this engine would dispatch to, without running a
    /// traversal. Used by [`crate::document::Document`] to answer
    /// `document_type()` cheaply.
    pub fn detect_document_type(&self) -> Option<DocumentType> {
        if self.store.first_of_type::<tp::DocumentArchive>().is_some() {
            return Some(DocumentType::Pages);
        }
        if self.store.first_of_type::<tn::DocumentArchive>().is_some() {
            return Some(DocumentType::Numbers);
        }
        if self.store.first_of_type::<kn::ShowArchive>().is_some() {
            return Some(DocumentType::Keynote);
        }
        None
    }
}
