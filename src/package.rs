//! Package storage (component A): a uniform, POSIX-relative-path view over
//! either a directory-form or ZIP-form iWork package.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use soapberry_zip::office::ArchiveReader;

use crate::error::{Error, Result};

fn normalize(path: &str) -> String {
    path.trim_start_matches('/').replace('\\', "/")
}

/// Uniform read access to a package's entries by POSIX-relative path.
///
/// Implementations must support random access without holding the full
/// archive in memory, since callers (the object store, asset resolution)
/// read individual files out of order.
pub trait PackageStorage {
    fn contains(&self, path: &str) -> bool;
    fn read(&self, path: &str) -> Result<Vec<u8>>;
    fn size(&self, path: &str) -> Result<u64>;
    fn iter_entries(&self) -> Vec<String>;
}

/// A package stored as a plain directory tree (an unzipped `.pages` bundle,
/// for instance).
pub struct DirectoryPackage {
    root: PathBuf,
    entries: Vec<String>,
}

impl DirectoryPackage {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(Error::PackageNotFound(root.display().to_string()));
        }

        let mut entries = Vec::new();
        collect_entries(root, root, &mut entries)?;

        Ok(Self {
            root: root.to_path_buf(),
            entries,
        })
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(normalize(path))
    }
}

fn collect_entries(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_entries(root, &path, out)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
    Ok(())
}

impl PackageStorage for DirectoryPackage {
    fn contains(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        fs::read(self.resolve(path)).map_err(|_| Error::EntryNotFound(path.to_string()))
    }

    fn size(&self, path: &str) -> Result<u64> {
        fs::metadata(self.resolve(path))
            .map(|m| m.len())
            .map_err(|_| Error::EntryNotFound(path.to_string()))
    }

    fn iter_entries(&self) -> Vec<String> {
        self.entries.clone()
    }
}

/// A package stored as a single ZIP container (a `.pages`/`.key`/`.numbers`
/// document file, or an `Index.zip` sub-archive).
///
/// The underlying file is memory-mapped rather than copied into a `Vec<u8>`
/// so random access does not require the whole package resident in
/// process memory; `soapberry_zip::office::ArchiveReader` borrows the
/// mapped slice for its own lifetime.
pub struct ZipPackage {
    _mmap: Mmap,
    // Safety: `archive` borrows from `_mmap`, which is never moved or
    // truncated after construction; both are dropped together.
    archive: ArchiveReader<'static>,
    sizes: HashMap<String, u64>,
}

impl ZipPackage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|_| Error::PackageNotFound(path.display().to_string()))?;
        // SAFETY: the file is not expected to be modified concurrently for
        // the lifetime of this package; this mirrors the read-only,
        // open-once-and-traverse lifecycle spec.md §3 describes.
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_mmap(mmap)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let mut mmap = memmap2::MmapMut::map_anon(data.len().max(1))?;
        mmap[..data.len()].copy_from_slice(&data);
        Self::from_mmap(mmap.make_read_only()?)
    }

    fn from_mmap(mmap: Mmap) -> Result<Self> {
        // Extend the borrow to 'static: `archive` and `_mmap` are stored
        // side by side in the same struct and dropped together, so the
        // borrowed data outlives every use of `archive`.
        let slice: &'static [u8] = unsafe { std::mem::transmute::<&[u8], &'static [u8]>(&mmap[..]) };
        let archive = ArchiveReader::new(slice).map_err(Error::Zip)?;

        let mut sizes = HashMap::new();
        for name in archive.file_names() {
            if let Ok(bytes) = archive.read(name) {
                sizes.insert(name.to_string(), bytes.len() as u64);
            }
        }

        Ok(Self {
            _mmap: mmap,
            archive,
            sizes,
        })
    }
}

impl PackageStorage for ZipPackage {
    fn contains(&self, path: &str) -> bool {
        self.archive.contains(&normalize(path))
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.archive
            .read(&normalize(path))
            .map_err(|_| Error::EntryNotFound(path.to_string()))
    }

    fn size(&self, path: &str) -> Result<u64> {
        self.sizes
            .get(&normalize(path))
            .copied()
            .ok_or_else(|| Error::EntryNotFound(path.to_string()))
    }

    fn iter_entries(&self) -> Vec<String> {
        self.archive.file_names().map(|s| s.to_string()).collect()
    }
}

/// Open a package at `path`, choosing [`DirectoryPackage`] or [`ZipPackage`]
/// by whether the path is a directory.
pub fn open(path: impl AsRef<Path>) -> Result<Box<dyn PackageStorage>> {
    let path = path.as_ref();
    if path.is_dir() {
        Ok(Box::new(DirectoryPackage::open(path)?))
    } else if path.is_file() {
        Ok(Box::new(ZipPackage::open(path)?))
    } else {
        Err(Error::PackageNotFound(path.display().to_string()))
    }
}
