//! Photo write sequence: reserve, open, encode.

use super::record::{MediaStore, MediaUri, PhotoMetadata, PhotoRecord};
use crate::capture::{EncodeError, ImageCaptureEndpoint, UserFeedback};
use chrono::{DateTime, Utc};
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Ways a capture attempt can end early.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("media store refused to create an entry")]
    DestinationCreation,
    #[error("could not open output stream: {0}")]
    StreamOpen(#[source] io::Error),
    #[error("could not save: {0}")]
    Encode(#[from] EncodeError),
}

impl CaptureError {
    /// Whether the session must be rebound after this failure.
    ///
    /// Only a refused destination stops before the camera is involved.
    pub fn needs_rebind(&self) -> bool {
        !matches!(self, CaptureError::DestinationCreation)
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CaptureError::DestinationCreation => "destination_creation",
            CaptureError::StreamOpen(_) => "stream_open",
            CaptureError::Encode(_) => "encode",
        }
    }
}

/// Writes captured photos into the media store.
pub struct PhotoWriter {
    store: Arc<dyn MediaStore>,
    feedback: Arc<dyn UserFeedback>,
    relative_path: String,
}

impl PhotoWriter {
    pub fn new(
        store: Arc<dyn MediaStore>,
        feedback: Arc<dyn UserFeedback>,
        relative_path: impl Into<String>,
    ) -> Self {
        Self {
            store,
            feedback,
            relative_path: relative_path.into(),
        }
    }

    /// Captures one photo, named after the current time.
    pub async fn capture(
        &self,
        endpoint: &dyn ImageCaptureEndpoint,
    ) -> Result<PhotoRecord, CaptureError> {
        self.capture_at(endpoint, Utc::now()).await
    }

    /// Captures one photo named after `taken_at`.
    ///
    /// Every failure is reported to the user before it is returned. Entries
    /// that were reserved but never completed are removed again.
    pub async fn capture_at(
        &self,
        endpoint: &dyn ImageCaptureEndpoint,
        taken_at: DateTime<Utc>,
    ) -> Result<PhotoRecord, CaptureError> {
        let metadata = PhotoMetadata::jpeg(taken_at, self.relative_path.clone());

        let Some(uri) = self.store.create_entry(&metadata) else {
            tracing::warn!(name = %metadata.display_name, "Could not create media entry");
            self.feedback.notify("Could not create MediaStore entry");
            return Err(CaptureError::DestinationCreation);
        };

        let sink = match self.store.open_write_stream(&uri) {
            Ok(sink) => sink,
            Err(e) => {
                tracing::error!(uri = %uri, error = %e, "Error opening output stream");
                self.feedback.notify("Could not open output stream");
                self.discard(&uri);
                return Err(CaptureError::StreamOpen(e));
            }
        };

        match endpoint.take_picture(sink).await {
            Ok(()) => {
                if let Err(e) = self.store.publish_entry(&uri) {
                    tracing::warn!(uri = %uri, error = %e, "Could not publish media entry");
                }
                tracing::info!(uri = %uri, name = %metadata.display_name, "Photo saved");
                self.feedback
                    .notify(&format!("Image saved in: {}", self.relative_path));
                Ok(PhotoRecord { uri, metadata })
            }
            Err(e) => {
                tracing::error!(uri = %uri, error = %e, "Error saving image");
                self.feedback.notify(&format!("Could not save: {}", e));
                self.discard(&uri);
                Err(CaptureError::Encode(e))
            }
        }
    }

    fn discard(&self, uri: &MediaUri) {
        if let Err(e) = self.store.delete_entry(uri) {
            tracing::warn!(uri = %uri, error = %e, "Could not remove orphaned media entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{
        AspectRatio, BindRequest, CameraPlatform, CaptureMode, CaptureSpec, LensFacing,
        MockPlatform, MockPlatformConfig, PhotoSink, PreviewSpec, RecordingFeedback, Rotation,
        MOCK_JPEG,
    };
    use crate::storage::{FsMediaStore, MemoryMediaStore};
    use std::fs;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct ScriptedEndpoint {
        calls: AtomicUsize,
        error: Option<&'static str>,
    }

    #[async_trait]
    impl ImageCaptureEndpoint for ScriptedEndpoint {
        async fn take_picture(&self, mut sink: PhotoSink) -> Result<(), EncodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.error {
                Some(message) => Err(EncodeError::new(message)),
                None => {
                    sink.write_all(MOCK_JPEG).unwrap();
                    Ok(())
                }
            }
        }
    }

    fn setup() -> (Arc<MemoryMediaStore>, Arc<RecordingFeedback>, PhotoWriter) {
        let store = Arc::new(MemoryMediaStore::new());
        let feedback = Arc::new(RecordingFeedback::new());
        let writer = PhotoWriter::new(store.clone(), feedback.clone(), "Pictures/RubixCube");
        (store, feedback, writer)
    }

    #[tokio::test]
    async fn test_successful_capture() {
        let (store, feedback, writer) = setup();
        let endpoint = ScriptedEndpoint::default();
        let taken_at = Utc.timestamp_millis_opt(1_650_000_000_000).unwrap();

        let record = writer.capture_at(&endpoint, taken_at).await.unwrap();

        assert_eq!(record.metadata.display_name, "1650000000000.jpg");
        assert_eq!(store.bytes(&record.uri).unwrap(), MOCK_JPEG);
        assert_eq!(
            feedback.messages(),
            vec!["Image saved in: Pictures/RubixCube".to_string()]
        );
    }

    #[tokio::test]
    async fn test_refused_destination_skips_encode() {
        let (store, feedback, writer) = setup();
        store.set_refuse_create(true);
        let endpoint = ScriptedEndpoint::default();

        let err = writer.capture(&endpoint).await.unwrap_err();

        assert!(matches!(err, CaptureError::DestinationCreation));
        assert!(!err.needs_rebind());
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.open_count(), 0);
        assert_eq!(
            feedback.messages(),
            vec!["Could not create MediaStore entry".to_string()]
        );
    }

    #[tokio::test]
    async fn test_stream_failure_removes_orphan() {
        let (store, feedback, writer) = setup();
        store.set_fail_open(true);
        let endpoint = ScriptedEndpoint::default();

        let err = writer.capture(&endpoint).await.unwrap_err();

        assert!(matches!(err, CaptureError::StreamOpen(_)));
        assert!(err.needs_rebind());
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 0);
        assert!(store.is_empty());
        assert_eq!(
            feedback.messages(),
            vec!["Could not open output stream".to_string()]
        );
    }

    #[tokio::test]
    async fn test_encode_failure_reports_message() {
        let (store, feedback, writer) = setup();
        let endpoint = ScriptedEndpoint {
            error: Some("camera closed"),
            ..Default::default()
        };

        let err = writer.capture(&endpoint).await.unwrap_err();

        assert_eq!(err.kind(), "encode");
        assert!(err.needs_rebind());
        assert!(store.is_empty());
        assert_eq!(
            feedback.messages(),
            vec!["Could not save: camera closed".to_string()]
        );
    }

    async fn mock_endpoint(config: MockPlatformConfig) -> Arc<dyn ImageCaptureEndpoint> {
        let platform = MockPlatform::with_config(config);
        let provider = platform.acquire_provider().await.unwrap();
        let request = BindRequest {
            facing: LensFacing::Back,
            preview: PreviewSpec {
                target_aspect: AspectRatio::Ratio4x3,
            },
            capture: CaptureSpec {
                mode: CaptureMode::MinimizeLatency,
                target_rotation: Rotation::Deg0,
            },
        };
        let bound = provider.bind(&request).unwrap();
        bound.image_capture
    }

    fn fs_writer(root: &std::path::Path) -> (Arc<FsMediaStore>, PhotoWriter) {
        let store = Arc::new(FsMediaStore::new(root));
        let writer = PhotoWriter::new(
            store.clone(),
            Arc::new(RecordingFeedback::new()),
            "Pictures/RubixCube",
        );
        (store, writer)
    }

    #[tokio::test]
    async fn test_encode_failure_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let (store, writer) = fs_writer(dir.path());
        let endpoint = mock_endpoint(MockPlatformConfig {
            encode_error: Some("sensor disconnected".into()),
            ..Default::default()
        })
        .await;

        let err = writer.capture(endpoint.as_ref()).await.unwrap_err();

        assert!(matches!(err, CaptureError::Encode(_)));
        assert!(store.pending().is_empty());
        let leftovers = fs::read_dir(dir.path().join("Pictures/RubixCube")).unwrap();
        assert_eq!(leftovers.count(), 0);
    }

    #[tokio::test]
    async fn test_saved_photo_is_complete_on_return() {
        let dir = tempfile::tempdir().unwrap();
        let (store, writer) = fs_writer(dir.path());
        let endpoint = mock_endpoint(MockPlatformConfig::default()).await;
        let taken_at = Utc.timestamp_millis_opt(1_650_000_000_000).unwrap();

        writer.capture_at(endpoint.as_ref(), taken_at).await.unwrap();

        let path = dir.path().join("Pictures/RubixCube/1650000000000.jpg");
        assert_eq!(fs::read(path).unwrap(), MOCK_JPEG);
        assert!(store.pending().is_empty());
    }
}
