//! Destination records in the shared media store.

use crate::capture::PhotoSink;
use chrono::{DateTime, Utc};
use std::fmt;
use std::io;

/// MIME type of every photo written by the screen.
pub const JPEG_MIME: &str = "image/jpeg";

/// Opaque identifier of a media store entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaUri(String);

impl MediaUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata stored with a destination entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoMetadata {
    /// File name shown in galleries, `<epoch-millis>.jpg`.
    pub display_name: String,
    pub mime_type: String,
    /// Collection path, e.g. `Pictures/RubixCube`.
    pub relative_path: String,
}

impl PhotoMetadata {
    /// Metadata for a JPEG taken at `taken_at`.
    pub fn jpeg(taken_at: DateTime<Utc>, relative_path: impl Into<String>) -> Self {
        Self {
            display_name: format!("{}.jpg", taken_at.timestamp_millis()),
            mime_type: JPEG_MIME.to_string(),
            relative_path: relative_path.into(),
        }
    }
}

/// A written photo: where it lives and what it was filed as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRecord {
    pub uri: MediaUri,
    pub metadata: PhotoMetadata,
}

/// Shared media index that owns photo files.
pub trait MediaStore: Send + Sync {
    /// Reserves a destination entry. Returns `None` if the store refuses.
    fn create_entry(&self, metadata: &PhotoMetadata) -> Option<MediaUri>;

    /// Opens a stream that writes the entry's bytes.
    fn open_write_stream(&self, uri: &MediaUri) -> io::Result<PhotoSink>;

    /// Removes an entry and its bytes.
    fn delete_entry(&self, uri: &MediaUri) -> io::Result<()>;

    /// Marks an entry as fully written.
    ///
    /// Stores that track in-progress entries release them here.
    fn publish_entry(&self, _uri: &MediaUri) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_jpeg_metadata() {
        let taken_at = Utc.timestamp_millis_opt(1_700_000_123_456).unwrap();
        let meta = PhotoMetadata::jpeg(taken_at, "Pictures/RubixCube");

        assert_eq!(meta.display_name, "1700000123456.jpg");
        assert_eq!(meta.mime_type, "image/jpeg");
        assert_eq!(meta.relative_path, "Pictures/RubixCube");
    }
}
