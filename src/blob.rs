//! Key-value blob storage for everything the pipeline persists.
//!
//! The pipeline never touches the filesystem directly: the content store,
//! the publisher and the exercise bundle all go through [`BlobStore`], keyed
//! by `/`-separated paths relative to the site root. [`FsBlobStore`] is the
//! production implementation; [`MemoryBlobStore`] backs tests and dry runs.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Whole-value storage. Writes replace the previous value entirely.
pub trait BlobStore {
    /// Read a blob. `Ok(None)` when the key has never been written.
    fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>>;

    /// Replace a blob. Readers observe either the old or the new value.
    fn write(&self, key: &str, bytes: &[u8]) -> io::Result<()>;
}

impl<B: BlobStore + ?Sized> BlobStore for &B {
    fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        (**self).write(key, bytes)
    }
}

/// Blob store rooted at a directory.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash mid-write leaves the previous content in place.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for a key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

impl BlobStore for FsBlobStore {
    fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path).inspect_err(|_| {
            let _ = fs::remove_file(&tmp);
        })
    }
}

/// In-memory blob store.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob, e.g. a landing page template.
    pub fn with_blob(self, key: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.lock().insert(key.to_string(), bytes.into());
        self
    }

    /// All keys currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Blob content as UTF-8 text, if present.
    pub fn text(&self, key: &str) -> Option<String> {
        self.lock()
            .get(key)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        // A poisoned map is still a consistent map: every write is one insert.
        self.blobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.lock().get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        self.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}
