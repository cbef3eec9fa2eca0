//! Contracts with the platform camera framework and the screen surface.
//!
//! Sensor management, preview rendering and JPEG encoding all live on the
//! far side of these traits. The session controller only sequences calls
//! into them.

use super::{AspectRatio, LensFacing, Rotation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;
use thiserror::Error;

/// Errors from acquiring the process camera provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("camera provider acquisition was interrupted")]
    Interrupted,
    #[error("camera provider acquisition failed: {0}")]
    ExecutionFailed(String),
}

/// Errors from binding use cases to a camera.
#[derive(Debug, Clone, Error)]
pub enum BindError {
    #[error("no camera available with {0} facing")]
    NoMatchingCamera(LensFacing),
    #[error("failed to bind use cases: {0}")]
    Failed(String),
}

/// Failure reported by the capture endpoint after a picture was requested.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EncodeError {
    message: String,
}

impl EncodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the platform's failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Trade-off the capture pipeline optimizes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Shortest shutter-to-file latency.
    #[default]
    MinimizeLatency,
    /// Best image quality, possibly slower.
    MaximizeQuality,
}

/// Torch (continuous flash LED) state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TorchState {
    #[default]
    Off,
    On,
}

/// Preview stream configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewSpec {
    pub target_aspect: AspectRatio,
}

/// Still capture configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSpec {
    pub mode: CaptureMode,
    pub target_rotation: Rotation,
}

/// Everything the provider needs to bind one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindRequest {
    /// Lens selector.
    pub facing: LensFacing,
    pub preview: PreviewSpec,
    pub capture: CaptureSpec,
}

/// Entry point into the platform camera framework.
#[async_trait]
pub trait CameraPlatform: Send + Sync {
    /// Acquires the process-wide camera provider.
    async fn acquire_provider(&self) -> Result<Arc<dyn CameraProvider>, ProviderError>;
}

/// Binds and unbinds camera use cases.
pub trait CameraProvider: Send + Sync {
    /// Releases every bound use case.
    fn unbind_all(&self);

    /// Binds a preview and a still capture endpoint to the selected camera.
    fn bind(&self, request: &BindRequest) -> Result<BoundSession, BindError>;
}

/// Handles produced by a successful bind.
#[derive(Clone)]
pub struct BoundSession {
    /// Camera info and control.
    pub camera: Arc<dyn BoundCamera>,
    /// Still capture endpoint.
    pub image_capture: Arc<dyn ImageCaptureEndpoint>,
}

impl std::fmt::Debug for BoundSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundSession")
            .field("has_flash_unit", &self.camera.has_flash_unit())
            .field("torch", &self.camera.torch_state())
            .finish()
    }
}

/// Info and control for a bound camera.
pub trait BoundCamera: Send + Sync {
    fn has_flash_unit(&self) -> bool;

    fn torch_state(&self) -> TorchState;

    fn enable_torch(&self, enabled: bool);
}

/// Destination for encoded JPEG bytes.
pub type PhotoSink = Box<dyn Write + Send>;

/// Still capture endpoint of a bound session.
#[async_trait]
pub trait ImageCaptureEndpoint: Send + Sync {
    /// Encodes one picture into `sink`.
    ///
    /// Resolves exactly once, either when the bytes are written or with the
    /// platform's failure.
    async fn take_picture(&self, sink: PhotoSink) -> Result<(), EncodeError>;
}

/// Icon shown on the flash button.
///
/// The icon names the action a tap would perform next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashIcon {
    FlashOn,
    FlashOff,
}

/// Transient notifications and indicator state on the screen.
pub trait UserFeedback: Send + Sync {
    /// Shows a short-lived message.
    fn notify(&self, message: &str);

    fn set_flash_icon(&self, icon: FlashIcon);
}

/// Feedback surface that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFeedback;

impl UserFeedback for LogFeedback {
    fn notify(&self, message: &str) {
        tracing::info!(target: "rubix_capture::toast", "{}", message);
    }

    fn set_flash_icon(&self, icon: FlashIcon) {
        tracing::info!(target: "rubix_capture::toast", icon = ?icon, "Flash icon updated");
    }
}

/// Camera permission collaborator.
#[async_trait]
pub trait PermissionPrompt: Send + Sync {
    /// Returns true if camera access was already granted.
    fn is_granted(&self) -> bool;

    /// Asks the user for camera access.
    async fn request(&self) -> bool;
}

/// Permission prompt that always grants access.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysGranted;

#[async_trait]
impl PermissionPrompt for AlwaysGranted {
    fn is_granted(&self) -> bool {
        true
    }

    async fn request(&self) -> bool {
        true
    }
}
