//! Synthetic camera platform for tests and the demo binary.
//!
//! Binds succeed for the configured lenses, pictures are a fixed tiny JPEG
//! written from a one-shot worker thread, and every call is counted so
//! tests can check the sequencing.

use super::platform::{
    BindError, BindRequest, BoundCamera, BoundSession, CameraPlatform, CameraProvider,
    EncodeError, FlashIcon, ImageCaptureEndpoint, PhotoSink, ProviderError, TorchState,
    UserFeedback,
};
use super::LensFacing;
use async_trait::async_trait;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

/// Minimal JPEG stream (SOI, COM, EOI) written for every mock capture.
pub const MOCK_JPEG: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xFE, 0x00, 0x06, b'm', b'o', b'c', b'k', 0xFF, 0xD9,
];

/// Behaviour knobs for [`MockPlatform`].
#[derive(Debug, Clone)]
pub struct MockPlatformConfig {
    /// Lenses present on the fake device.
    pub facings: Vec<LensFacing>,
    /// Whether bound cameras report a flash unit.
    pub has_flash: bool,
    /// Fail every provider acquisition.
    pub fail_acquire: bool,
    /// Fail every capture with this message.
    pub encode_error: Option<String>,
}

impl Default for MockPlatformConfig {
    fn default() -> Self {
        Self {
            facings: vec![LensFacing::Back, LensFacing::Front],
            has_flash: true,
            fail_acquire: false,
            encode_error: None,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    config: Mutex<MockPlatformConfig>,
    acquisitions: AtomicUsize,
    binds: AtomicUsize,
    unbinds: AtomicUsize,
    pictures: AtomicUsize,
    bound: AtomicUsize,
    max_bound: AtomicUsize,
    last_bind: Mutex<Option<BindRequest>>,
}

impl MockState {
    fn config(&self) -> MockPlatformConfig {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Mock camera platform.
#[derive(Debug, Clone, Default)]
pub struct MockPlatform {
    state: Arc<MockState>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MockPlatformConfig) -> Self {
        let platform = Self::default();
        *platform
            .state
            .config
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = config;
        platform
    }

    /// Changes the behaviour of subsequent calls.
    pub fn update(&self, f: impl FnOnce(&mut MockPlatformConfig)) {
        let mut config = self
            .state
            .config
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut *config);
    }

    pub fn acquisition_count(&self) -> usize {
        self.state.acquisitions.load(Ordering::SeqCst)
    }

    /// Number of successful binds.
    pub fn bind_count(&self) -> usize {
        self.state.binds.load(Ordering::SeqCst)
    }

    pub fn unbind_count(&self) -> usize {
        self.state.unbinds.load(Ordering::SeqCst)
    }

    /// Number of pictures requested from any endpoint.
    pub fn picture_count(&self) -> usize {
        self.state.pictures.load(Ordering::SeqCst)
    }

    /// Sessions currently bound (0 or 1 when callers unbind first).
    pub fn bound_count(&self) -> usize {
        self.state.bound.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously bound sessions ever observed.
    pub fn max_bound_count(&self) -> usize {
        self.state.max_bound.load(Ordering::SeqCst)
    }

    pub fn last_bind(&self) -> Option<BindRequest> {
        *self
            .state
            .last_bind
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CameraPlatform for MockPlatform {
    async fn acquire_provider(&self) -> Result<Arc<dyn CameraProvider>, ProviderError> {
        self.state.acquisitions.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if self.state.config().fail_acquire {
            return Err(ProviderError::ExecutionFailed(
                "mock provider unavailable".to_string(),
            ));
        }
        Ok(Arc::new(MockProvider {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockProvider {
    state: Arc<MockState>,
}

impl CameraProvider for MockProvider {
    fn unbind_all(&self) {
        self.state.unbinds.fetch_add(1, Ordering::SeqCst);
        self.state.bound.store(0, Ordering::SeqCst);
    }

    fn bind(&self, request: &BindRequest) -> Result<BoundSession, BindError> {
        let config = self.state.config();
        if !config.facings.contains(&request.facing) {
            return Err(BindError::NoMatchingCamera(request.facing));
        }

        self.state.binds.fetch_add(1, Ordering::SeqCst);
        let bound = self.state.bound.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_bound.fetch_max(bound, Ordering::SeqCst);
        *self
            .state
            .last_bind
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(*request);

        tracing::debug!(facing = %request.facing, "MockPlatform bound session");

        Ok(BoundSession {
            camera: Arc::new(MockCamera {
                has_flash: config.has_flash,
                torch: AtomicBool::new(false),
            }),
            image_capture: Arc::new(MockImageCapture {
                state: Arc::clone(&self.state),
            }),
        })
    }
}

/// Bound mock camera with an in-memory torch.
#[derive(Debug)]
pub struct MockCamera {
    has_flash: bool,
    torch: AtomicBool,
}

impl MockCamera {
    pub fn new(has_flash: bool) -> Self {
        Self {
            has_flash,
            torch: AtomicBool::new(false),
        }
    }
}

impl BoundCamera for MockCamera {
    fn has_flash_unit(&self) -> bool {
        self.has_flash
    }

    fn torch_state(&self) -> TorchState {
        if self.torch.load(Ordering::SeqCst) {
            TorchState::On
        } else {
            TorchState::Off
        }
    }

    fn enable_torch(&self, enabled: bool) {
        if self.has_flash {
            self.torch.store(enabled, Ordering::SeqCst);
        }
    }
}

struct MockImageCapture {
    state: Arc<MockState>,
}

#[async_trait]
impl ImageCaptureEndpoint for MockImageCapture {
    async fn take_picture(&self, mut sink: PhotoSink) -> Result<(), EncodeError> {
        self.state.pictures.fetch_add(1, Ordering::SeqCst);
        let encode_error = self.state.config().encode_error;
        let (tx, rx) = oneshot::channel();

        std::thread::spawn(move || {
            let result = match encode_error {
                Some(message) => Err(EncodeError::new(message)),
                None => sink
                    .write_all(MOCK_JPEG)
                    .and_then(|()| sink.flush())
                    .map_err(|e| EncodeError::new(e.to_string())),
            };
            // Close the stream before the caller sees the result.
            drop(sink);
            let _ = tx.send(result);
        });

        rx.await
            .unwrap_or_else(|_| Err(EncodeError::new("capture worker exited")))
    }
}

/// Feedback surface that records everything shown to the user.
#[derive(Debug, Default)]
pub struct RecordingFeedback {
    messages: Mutex<Vec<String>>,
    icon: Mutex<Option<FlashIcon>>,
}

impl RecordingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every message shown so far, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn flash_icon(&self) -> Option<FlashIcon> {
        *self.icon.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UserFeedback for RecordingFeedback {
    fn notify(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }

    fn set_flash_icon(&self, icon: FlashIcon) {
        *self.icon.lock().unwrap_or_else(PoisonError::into_inner) = Some(icon);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{AspectRatio, CaptureMode, CaptureSpec, PreviewSpec, Rotation};

    fn request(facing: LensFacing) -> BindRequest {
        BindRequest {
            facing,
            preview: PreviewSpec {
                target_aspect: AspectRatio::Ratio4x3,
            },
            capture: CaptureSpec {
                mode: CaptureMode::MinimizeLatency,
                target_rotation: Rotation::Deg0,
            },
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_mock_platform_lifecycle() {
        let platform = MockPlatform::new();
        let provider = platform.acquire_provider().await.unwrap();

        provider.unbind_all();
        let session = provider.bind(&request(LensFacing::Back)).unwrap();
        assert_eq!(platform.bind_count(), 1);
        assert_eq!(platform.bound_count(), 1);

        let buf = SharedBuf::default();
        session
            .image_capture
            .take_picture(Box::new(buf.clone()))
            .await
            .unwrap();
        assert_eq!(buf.0.lock().unwrap().as_slice(), MOCK_JPEG);
        assert_eq!(platform.picture_count(), 1);

        provider.unbind_all();
        assert_eq!(platform.bound_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_lens_fails_bind() {
        let platform = MockPlatform::with_config(MockPlatformConfig {
            facings: vec![LensFacing::Back],
            ..Default::default()
        });
        let provider = platform.acquire_provider().await.unwrap();

        assert!(matches!(
            provider.bind(&request(LensFacing::Front)),
            Err(BindError::NoMatchingCamera(LensFacing::Front))
        ));
        assert_eq!(platform.bind_count(), 0);
    }

    #[tokio::test]
    async fn test_encode_error_reported_once() {
        let platform = MockPlatform::new();
        platform.update(|c| c.encode_error = Some("sensor timeout".into()));
        let provider = platform.acquire_provider().await.unwrap();
        let session = provider.bind(&request(LensFacing::Back)).unwrap();

        let err = session
            .image_capture
            .take_picture(Box::new(std::io::sink()))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "sensor timeout");
    }

    #[test]
    fn test_torch_needs_flash_unit() {
        let camera = MockCamera::new(false);
        camera.enable_torch(true);
        assert_eq!(camera.torch_state(), TorchState::Off);

        let camera = MockCamera::new(true);
        camera.enable_torch(true);
        assert_eq!(camera.torch_state(), TorchState::On);
    }
}
