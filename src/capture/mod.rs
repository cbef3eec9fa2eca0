//! Camera-side types and collaborator contracts.
//!
//! This module covers what the screen asks of the camera: which lens,
//! which surface shape, which capture trade-off. The platform framework
//! behind [`CameraPlatform`] does the actual sensor work.

mod aspect;
mod config;
mod facing;
mod mock;
#[cfg(feature = "camera")]
mod nokhwa_backend;
mod platform;

pub use aspect::{AspectRatio, ViewportError};
pub use config::{
    ConfigError, FileConfig, MetricsConfig, SessionConfig, StorageConfig, DEFAULT_RELATIVE_PATH,
};
pub use facing::{LensFacing, Rotation, Viewport};
pub use mock::{MockCamera, MockPlatform, MockPlatformConfig, RecordingFeedback, MOCK_JPEG};
#[cfg(feature = "camera")]
pub use nokhwa_backend::NokhwaPlatform;
pub use platform::{
    AlwaysGranted, BindError, BindRequest, BoundCamera, BoundSession, CameraPlatform,
    CameraProvider, CaptureMode, CaptureSpec, EncodeError, FlashIcon, ImageCaptureEndpoint,
    LogFeedback, PermissionPrompt, PhotoSink, PreviewSpec, ProviderError, TorchState,
    UserFeedback,
};
