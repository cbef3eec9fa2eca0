//! Directory-backed media store.
//!
//! Entries are files under `<root>/<relative_path>/`. Creating an entry
//! reserves an empty file so the name is taken before any bytes arrive;
//! colliding display names get a ` (n)` suffix the way gallery stores do.
//!
//! Only entries that are still being written are indexed. Publishing an
//! entry drops it from the index; the file itself stays.

use super::record::{MediaStore, MediaUri, PhotoMetadata};
use crate::capture::PhotoSink;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Give up on a display name after this many collisions.
const MAX_NAME_ATTEMPTS: u32 = 1000;

const URI_PREFIX: &str = "content://media/external/images/media/";

/// Media store rooted at a directory.
#[derive(Debug)]
pub struct FsMediaStore {
    root: PathBuf,
    index: Mutex<HashMap<MediaUri, PathBuf>>,
    next_id: AtomicU64,
}

impl FsMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Returns the file backing an unpublished entry.
    pub fn path_of(&self, uri: &MediaUri) -> Option<PathBuf> {
        self.lock().get(uri).cloned()
    }

    /// Returns every unpublished entry, ordered by URI.
    pub fn pending(&self) -> Vec<(MediaUri, PathBuf)> {
        let mut entries: Vec<_> = self
            .lock()
            .iter()
            .map(|(uri, path)| (uri.clone(), path.clone()))
            .collect();
        entries.sort();
        entries
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<MediaUri, PathBuf>> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reserve(&self, metadata: &PhotoMetadata) -> io::Result<PathBuf> {
        let dir = self.root.join(&metadata.relative_path);
        fs::create_dir_all(&dir)?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = dir.join(numbered_name(&metadata.display_name, attempt));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(path),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free name for {}", metadata.display_name),
        ))
    }
}

/// `name.jpg`, then `name (1).jpg`, `name (2).jpg`, ...
fn numbered_name(display_name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return display_name.to_string();
    }
    match display_name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem} ({attempt}).{ext}"),
        None => format!("{display_name} ({attempt})"),
    }
}

impl MediaStore for FsMediaStore {
    fn create_entry(&self, metadata: &PhotoMetadata) -> Option<MediaUri> {
        let path = match self.reserve(metadata) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(
                    root = %self.root.display(),
                    name = %metadata.display_name,
                    error = %e,
                    "Media store refused entry"
                );
                return None;
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let uri = MediaUri::new(format!("{URI_PREFIX}{id}"));
        tracing::debug!(uri = %uri, path = %path.display(), "Reserved media entry");
        self.lock().insert(uri.clone(), path);
        Some(uri)
    }

    fn open_write_stream(&self, uri: &MediaUri) -> io::Result<PhotoSink> {
        let path = self
            .path_of(uri)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, uri.to_string()))?;
        let file = OpenOptions::new().write(true).truncate(true).open(path)?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn delete_entry(&self, uri: &MediaUri) -> io::Result<()> {
        let path = self
            .path_of(uri)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, uri.to_string()))?;
        match fs::remove_file(&path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
            _ => {}
        }
        // Forget the entry only once its file is gone, so a failed delete
        // can be retried.
        self.lock().remove(uri);
        tracing::debug!(uri = %uri, path = %path.display(), "Removed media entry");
        Ok(())
    }

    fn publish_entry(&self, uri: &MediaUri) -> io::Result<()> {
        let path = self
            .lock()
            .remove(uri)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, uri.to_string()))?;
        tracing::debug!(uri = %uri, path = %path.display(), "Published media entry");
        Ok(())
    }
}
