//! In-memory media store with failure injection.

use super::record::{MediaStore, MediaUri, PhotoMetadata};
use crate::capture::PhotoSink;
use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug)]
struct Entry {
    metadata: PhotoMetadata,
    bytes: Arc<Mutex<Vec<u8>>>,
}

/// Media store that keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemoryMediaStore {
    entries: Mutex<BTreeMap<MediaUri, Entry>>,
    next_id: AtomicU64,
    refuse_create: AtomicBool,
    fail_open: AtomicBool,
    opened: AtomicUsize,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `create_entry` return `None`.
    pub fn set_refuse_create(&self, refuse: bool) {
        self.refuse_create.store(refuse, Ordering::SeqCst);
    }

    /// Makes `open_write_stream` fail with an I/O error.
    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Number of write streams handed out.
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn metadata(&self, uri: &MediaUri) -> Option<PhotoMetadata> {
        self.lock().get(uri).map(|e| e.metadata.clone())
    }

    /// Returns a copy of the bytes written to an entry.
    pub fn bytes(&self, uri: &MediaUri) -> Option<Vec<u8>> {
        self.lock().get(uri).map(|e| {
            e.bytes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<MediaUri, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MediaStore for MemoryMediaStore {
    fn create_entry(&self, metadata: &PhotoMetadata) -> Option<MediaUri> {
        if self.refuse_create.load(Ordering::SeqCst) {
            return None;
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let uri = MediaUri::new(format!("memory://media/images/{id}"));
        self.lock().insert(
            uri.clone(),
            Entry {
                metadata: metadata.clone(),
                bytes: Arc::default(),
            },
        );
        Some(uri)
    }

    fn open_write_stream(&self, uri: &MediaUri) -> io::Result<PhotoSink> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "write access revoked",
            ));
        }
        let bytes = self
            .lock()
            .get(uri)
            .map(|e| Arc::clone(&e.bytes))
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, uri.to_string()))?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryStream(bytes)))
    }

    fn delete_entry(&self, uri: &MediaUri) -> io::Result<()> {
        self.lock()
            .remove(uri)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, uri.to_string()))
    }
}

struct MemoryStream(Arc<Mutex<Vec<u8>>>);

impl io::Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
