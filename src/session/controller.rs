//! Capture session lifecycle.
//!
//! The controller owns the single bound session. Every start tears down
//! whatever was bound before and binds a fresh preview and capture pair;
//! shutter and flash always resolve the session at the moment they run, so
//! a handler can never reach a camera that has been replaced.

use super::flash::{self, FlashOutcome};
use crate::capture::{
    AspectRatio, BindError, BindRequest, BoundSession, CameraPlatform, CameraProvider,
    CaptureSpec, LensFacing, PreviewSpec, ProviderError, SessionConfig, UserFeedback, Viewport,
};
use crate::metrics::MetricsRegistry;
use crate::storage::{CaptureError, MediaStore, PhotoRecord, PhotoWriter};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Mutex};

/// Reasons a session could not be started.
#[derive(Debug, Clone, Error)]
pub enum StartError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error("capture screen has been shut down")]
    Closed,
}

/// Description of the bound session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    /// Increases by one with every successful bind.
    pub generation: u64,
    pub facing: LensFacing,
    pub aspect: AspectRatio,
    pub capture: CaptureSpec,
}

struct ActiveSession {
    info: SessionInfo,
    bound: BoundSession,
}

struct ControllerState {
    /// Lens of the most recent start request.
    facing: LensFacing,
    provider: Option<Arc<dyn CameraProvider>>,
    active: Option<ActiveSession>,
    generation: u64,
    closed: bool,
}

/// Owns the bound capture session and sequences rebinds.
pub struct CaptureSessionController {
    platform: Arc<dyn CameraPlatform>,
    writer: PhotoWriter,
    feedback: Arc<dyn UserFeedback>,
    config: SessionConfig,
    metrics: Option<Arc<MetricsRegistry>>,
    /// Latest laid-out viewport; updated without waiting on a bind.
    viewport: watch::Sender<Viewport>,
    state: Mutex<ControllerState>,
}

impl CaptureSessionController {
    /// Creates a controller with nothing bound.
    pub fn new(
        platform: Arc<dyn CameraPlatform>,
        store: Arc<dyn MediaStore>,
        feedback: Arc<dyn UserFeedback>,
        config: SessionConfig,
        relative_path: impl Into<String>,
    ) -> Self {
        let writer = PhotoWriter::new(store, Arc::clone(&feedback), relative_path);
        let (viewport, _) = watch::channel(Viewport::default());
        Self {
            platform,
            writer,
            feedback,
            state: Mutex::new(ControllerState {
                facing: config.initial_facing,
                provider: None,
                active: None,
                generation: 0,
                closed: false,
            }),
            config,
            metrics: None,
            viewport,
        }
    }

    /// Records session and capture events into `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Records a new viewport size or rotation for the next rebind.
    ///
    /// The bound session keeps its current targets until it is rebound.
    pub fn set_viewport(&self, viewport: Viewport) {
        let previous = self.viewport.send_replace(viewport);
        if previous != viewport {
            tracing::debug!(
                width = viewport.width,
                height = viewport.height,
                rotation = viewport.rotation.degrees(),
                "Viewport changed"
            );
        }
    }

    /// Binds a fresh session for `facing`.
    ///
    /// Overlapping calls are serialized: a second start waits until the
    /// first has finished binding, then replaces its session.
    pub async fn start(
        &self,
        facing: LensFacing,
        viewport: Viewport,
    ) -> Result<SessionInfo, StartError> {
        let mut state = self.state.lock().await;
        self.start_locked(&mut state, facing, viewport).await
    }

    async fn start_locked(
        &self,
        state: &mut ControllerState,
        facing: LensFacing,
        viewport: Viewport,
    ) -> Result<SessionInfo, StartError> {
        if state.closed {
            return Err(StartError::Closed);
        }
        state.facing = facing;
        self.viewport.send_replace(viewport);

        let aspect = AspectRatio::select(viewport.width, viewport.height).unwrap_or_else(|e| {
            tracing::warn!(error = %e, fallback = %self.config.fallback_aspect, "Viewport not laid out");
            self.config.fallback_aspect
        });

        let provider = match self.platform.acquire_provider().await {
            Ok(provider) => provider,
            Err(e) => {
                tracing::error!(error = %e, facing = %facing, "Camera provider unavailable");
                if let Some(metrics) = &self.metrics {
                    metrics.record_provider_failure();
                }
                return Err(e.into());
            }
        };

        let request = BindRequest {
            facing,
            preview: PreviewSpec {
                target_aspect: aspect,
            },
            capture: CaptureSpec {
                mode: self.config.capture_mode,
                target_rotation: viewport.rotation,
            },
        };

        provider.unbind_all();
        state.active = None;
        state.provider = Some(Arc::clone(&provider));

        let bound = match provider.bind(&request) {
            Ok(bound) => bound,
            Err(e) => {
                tracing::error!(error = %e, facing = %facing, "Use case binding failed");
                if let Some(metrics) = &self.metrics {
                    metrics.record_bind_failure();
                    metrics.record_unbound();
                }
                return Err(e.into());
            }
        };

        state.generation += 1;
        let info = SessionInfo {
            generation: state.generation,
            facing,
            aspect,
            capture: request.capture,
        };
        state.active = Some(ActiveSession { info, bound });

        tracing::info!(
            generation = info.generation,
            facing = %facing,
            aspect = %aspect,
            rotation = viewport.rotation.degrees(),
            "Capture session bound"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_bind(info.generation, facing);
        }

        Ok(info)
    }

    /// Rebinds with the most recently requested lens and viewport.
    pub async fn restart(&self) -> Result<SessionInfo, StartError> {
        let mut state = self.state.lock().await;
        let facing = state.facing;
        let viewport = *self.viewport.borrow();
        self.start_locked(&mut state, facing, viewport).await
    }

    /// Takes a photo with the bound session.
    ///
    /// Returns `None` when nothing is bound. After the attempt the session
    /// is rebound once, unless the media store refused the destination.
    pub async fn shutter(&self) -> Option<Result<PhotoRecord, CaptureError>> {
        let endpoint = {
            let state = self.state.lock().await;
            let Some(active) = state.active.as_ref() else {
                tracing::debug!("Shutter pressed with no bound session");
                return None;
            };
            Arc::clone(&active.bound.image_capture)
        };

        let result = self.writer.capture(endpoint.as_ref()).await;

        if let Some(metrics) = &self.metrics {
            match &result {
                Ok(_) => metrics.record_photo_saved(),
                Err(e) => metrics.record_capture_failure(e.kind()),
            }
        }

        let rebind = match &result {
            Ok(_) => true,
            Err(e) => e.needs_rebind(),
        };
        if rebind {
            if let Err(e) = self.restart().await {
                tracing::debug!(error = %e, "Post-capture rebind skipped");
            }
        }

        Some(result)
    }

    /// Toggles the torch on the bound camera.
    ///
    /// Returns `None` when nothing is bound.
    pub async fn toggle_flash(&self) -> Option<FlashOutcome> {
        let camera = {
            let state = self.state.lock().await;
            Arc::clone(&state.active.as_ref()?.bound.camera)
        };

        let outcome = flash::toggle(camera.as_ref(), self.feedback.as_ref());
        if let Some(metrics) = &self.metrics {
            match outcome {
                FlashOutcome::NoFlashUnit => metrics.record_torch_unavailable(),
                FlashOutcome::Enabled | FlashOutcome::Disabled => metrics.record_torch_toggle(),
            }
        }
        Some(outcome)
    }

    /// Returns the bound session, if any.
    pub async fn current(&self) -> Option<SessionInfo> {
        self.state.lock().await.active.as_ref().map(|s| s.info)
    }

    /// Unbinds everything and refuses further starts.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        state.closed = true;
        state.active = None;
        if let Some(provider) = state.provider.take() {
            provider.unbind_all();
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_unbound();
        }
        tracing::info!("Capture session controller shut down");
    }
}
