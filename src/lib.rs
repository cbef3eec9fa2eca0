//! Rubix Capture Library
//!
//! The core of a minimal camera capture screen: live preview binding,
//! shutter, torch toggle and front/back lens switching, with photos saved
//! as JPEGs into a shared media store under `Pictures/RubixCube`.
//!
//! # Architecture
//!
//! ```text
//! UserEvent → screen → session (controller, flash) → capture::CameraPlatform
//!                          ↓
//!                      storage (PhotoWriter) → MediaStore
//! ```
//!
//! The platform camera framework and the media store sit behind traits;
//! [`capture::MockPlatform`] and [`storage::MemoryMediaStore`] stand in for
//! them in tests, [`storage::FsMediaStore`] writes real files, and the
//! `camera` feature adds a webcam platform.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rubix_capture::{
//!     capture::{AlwaysGranted, LogFeedback, MockPlatform, SessionConfig, Viewport},
//!     screen::{CaptureScreen, UserEvent},
//!     session::CaptureSessionController,
//!     storage::FsMediaStore,
//! };
//!
//! # async fn run() {
//! let controller = CaptureSessionController::new(
//!     Arc::new(MockPlatform::new()),
//!     Arc::new(FsMediaStore::new("media")),
//!     Arc::new(LogFeedback),
//!     SessionConfig::default(),
//!     "Pictures/RubixCube",
//! );
//! let mut screen = CaptureScreen::new(Arc::new(controller), Arc::new(AlwaysGranted));
//!
//! screen.open(Viewport::new(1080, 1920)).await;
//! screen.dispatch(UserEvent::Shutter).await;
//! screen.close().await;
//! # }
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod metrics;
pub mod screen;
pub mod session;
pub mod storage;

// Re-export commonly used types at crate root
pub use capture::{AspectRatio, LensFacing, Viewport};
pub use screen::{CaptureScreen, EventOutcome, UserEvent};
pub use session::{CaptureSessionController, FlashOutcome, SessionInfo};
pub use storage::{CaptureError, PhotoRecord, PhotoWriter};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
