//! Metadata layer (component D): locates the package-level metadata
//! record and exposes the data-file registry, component enumeration, and
//! property dictionary the traversal engine needs to resolve asset paths
//! and enumerate slides (spec §4.D).

use std::collections::HashMap;

use crate::object_store::ObjectStore;
use crate::package::PackageStorage;
use crate::protos::tsp;

/// One entry in the package's asset registry: an object id, the filename
/// the author's machine preferred at save time, and the filename actually
/// used on disk under `Data/` (spec §3's "Data assets").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFileEntry {
    pub identifier: u64,
    pub preferred_filename: Option<String>,
    pub filename: Option<String>,
}

/// One component entry: `preferred_locator` is consulted by the
/// presentation traversal to enumerate slides ("Slide").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentEntry {
    pub identifier: u64,
    pub preferred_locator: Option<String>,
}

/// Package-level metadata: the data-file registry, component list, and a
/// free-form property dictionary, all read from the well-known
/// [`crate::registry::type_code::METADATA_ARCHIVE`] record.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub data_entries: Vec<DataFileEntry>,
    pub components: Vec<ComponentEntry>,
    pub properties: HashMap<String, String>,
}

impl Metadata {
    /// Locate and parse the package's metadata anchor record. Absent (no
    /// `MetadataArchive` in the store) yields an empty, all-default
    /// [`Metadata`] rather than an error — a metadata-free synthetic
    /// package (as used in the boundary-scenario tests) is not corrupt.
    pub fn load(store: &ObjectStore) -> Self {
        let Some((_, archive)) = store.first_of_type::<tsp::MetadataArchive>() else {
            return Self::default();
        };
        Self::from_archive(&archive)
    }

    fn from_archive(archive: &tsp::MetadataArchive) -> Self {
        let data_entries = archive
            .data_entries
            .iter()
            .map(|e| DataFileEntry {
                identifier: e.identifier,
                preferred_filename: e.preferred_filename.clone(),
                filename: e.filename.clone(),
            })
            .collect();

        let components = archive
            .components
            .iter()
            .map(|c| ComponentEntry {
                identifier: c.identifier,
                preferred_locator: c.preferred_locator.clone(),
            })
            .collect();

        let properties = archive
            .properties
            .iter()
            .filter_map(|p| p.value.clone().map(|v| (p.key.clone(), v)))
            .collect();

        Metadata { data_entries, components, properties }
    }

    /// Resolve an image/movie/3D-object data reference's object id to a
    /// package path under `Data/`, preferring `filename` then
    /// `preferred_filename` — but only a name that actually exists in
    /// `storage` counts, per spec §4.D. Returns `None` (silently skipped
    /// by the traversal engine, spec §9) if neither resolves.
    pub fn resolve_data_path(&self, identifier: u64, storage: &dyn PackageStorage) -> Option<String> {
        let entry = self.data_entries.iter().find(|e| e.identifier == identifier)?;

        for candidate in [entry.filename.as_ref(), entry.preferred_filename.as_ref()] {
            if let Some(name) = candidate {
                let path = format!("Data/{name}");
                if storage.contains(&path) {
                    return Some(path);
                }
            }
        }
        None
    }

    /// Identifiers of every component whose `preferred_locator` is
    /// `"Slide"`, ascending (spec §4.G's presentation enumeration).
    pub fn slide_identifiers(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .components
            .iter()
            .filter(|c| c.preferred_locator.as_deref() == Some("Slide"))
            .map(|c| c.identifier)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_filename_over_preferred_filename() {
        let meta = Metadata {
            data_entries: vec![DataFileEntry {
                identifier: 1,
                preferred_filename: Some("original.png".into()),
                filename: Some("renamed.png".into()),
            }],
            ..Default::default()
        };

        struct Fs;
        impl PackageStorage for Fs {
            fn contains(&self, path: &str) -> bool {
                path == "Data/renamed.png"
            }
            fn read(&self, _: &str) -> crate::error::Result<Vec<u8>> {
                unreachable!()
            }
            fn size(&self, _: &str) -> crate::error::Result<u64> {
                unreachable!()
            }
            fn iter_entries(&self) -> Vec<String> {
                vec![]
            }
        }

        assert_eq!(meta.resolve_data_path(1, &Fs), Some("Data/renamed.png".to_string()));
    }

    #[test]
    fn falls_back_to_preferred_filename_when_filename_missing_from_storage() {
        let meta = Metadata {
            data_entries: vec![DataFileEntry {
                identifier: 1,
                preferred_filename: Some("original.png".into()),
                filename: Some("missing.png".into()),
            }],
            ..Default::default()
        };

        struct Fs;
        impl PackageStorage for Fs {
            fn contains(&self, path: &str) -> bool {
                path == "Data/original.png"
            }
            fn read(&self, _: &str) -> crate::error::Result<Vec<u8>> {
                unreachable!()
            }
            fn size(&self, _: &str) -> crate::error::Result<u64> {
                unreachable!()
            }
            fn iter_entries(&self) -> Vec<String> {
                vec![]
            }
        }

        assert_eq!(meta.resolve_data_path(1, &Fs), Some("Data/original.png".to_string()));
    }

    #[test]
    fn neither_name_resolving_is_none() {
        let meta = Metadata {
            data_entries: vec![DataFileEntry { identifier: 1, preferred_filename: None, filename: None }],
            ..Default::default()
        };

        struct Fs;
        impl PackageStorage for Fs {
            fn contains(&self, _: &str) -> bool {
                false
            }
            fn read(&self, _: &str) -> crate::error::Result<Vec<u8>> {
                unreachable!()
            }
            fn size(&self, _: &str) -> crate::error::Result<u64> {
                unreachable!()
            }
            fn iter_entries(&self) -> Vec<String> {
                vec![]
            }
        }

        assert_eq!(meta.resolve_data_path(1, &Fs), None);
    }

    #[test]
    fn slide_identifiers_are_sorted_ascending() {
        let meta = Metadata {
            components: vec![
                ComponentEntry { identifier: 5, preferred_locator: Some("Slide".into()) },
                ComponentEntry { identifier: 2, preferred_locator: Some("Slide".into()) },
                ComponentEntry { identifier: 9, preferred_locator: Some("Master".into()) },
            ],
            ..Default::default()
        };
        assert_eq!(meta.slide_identifiers(), vec![2, 5]);
    }
}
