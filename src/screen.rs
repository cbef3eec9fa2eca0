//! The capture screen: user events in, session calls out.
//!
//! The screen holds the UI-side state (selected lens, viewport size,
//! permission and lifecycle) and threads it into the session controller.
//! Shutter presses run as background tasks so the screen keeps handling
//! events while a photo is encoded.

use crate::capture::{LensFacing, PermissionPrompt, Viewport};
use crate::session::{CaptureSessionController, FlashOutcome, SessionInfo};
use crate::storage::{CaptureError, PhotoRecord};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Taps on the screen's three buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserEvent {
    Shutter,
    ToggleFlash,
    FlipCamera,
}

/// Visibility of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Visible,
    Destroyed,
}

/// What the screen did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// A capture task was started.
    CaptureQueued,
    /// Torch toggle result, `None` if nothing was bound.
    Flash(Option<FlashOutcome>),
    /// Lens switched; carries the new session if one was bound.
    Flipped {
        facing: LensFacing,
        session: Option<SessionInfo>,
    },
    /// The screen is not visible or no session is bound.
    Ignored,
}

type CaptureTask = JoinHandle<Option<Result<PhotoRecord, CaptureError>>>;

/// UI layer of the capture screen.
pub struct CaptureScreen {
    controller: Arc<CaptureSessionController>,
    permission: Arc<dyn PermissionPrompt>,
    facing: LensFacing,
    viewport: Viewport,
    permitted: bool,
    lifecycle: LifecycleState,
    pending: Vec<CaptureTask>,
}

impl CaptureScreen {
    pub fn new(
        controller: Arc<CaptureSessionController>,
        permission: Arc<dyn PermissionPrompt>,
    ) -> Self {
        let facing = controller.config().initial_facing;
        Self {
            controller,
            permission,
            facing,
            viewport: Viewport::default(),
            permitted: false,
            lifecycle: LifecycleState::Created,
            pending: Vec::new(),
        }
    }

    pub fn facing(&self) -> LensFacing {
        self.facing
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    /// Whether camera access has been granted.
    pub fn is_permitted(&self) -> bool {
        self.permitted
    }

    /// Records the laid-out preview size and rotation.
    ///
    /// Takes effect at the next bind, including the rebind after a capture.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.controller.set_viewport(viewport);
    }

    /// Shows the screen and starts the camera once access is granted.
    pub async fn open(&mut self, viewport: Viewport) -> Option<SessionInfo> {
        self.viewport = viewport;
        self.lifecycle = LifecycleState::Visible;

        self.permitted = self.permission.is_granted() || self.permission.request().await;
        if !self.permitted {
            tracing::warn!("Camera permission denied, preview not started");
            return None;
        }

        self.controller.start(self.facing, self.viewport).await.ok()
    }

    /// Handles one tap.
    pub async fn dispatch(&mut self, event: UserEvent) -> EventOutcome {
        self.pending.retain(|task| !task.is_finished());

        if self.lifecycle != LifecycleState::Visible {
            tracing::debug!(event = ?event, lifecycle = ?self.lifecycle, "Event ignored");
            return EventOutcome::Ignored;
        }

        match event {
            UserEvent::Shutter => {
                if self.controller.current().await.is_none() {
                    return EventOutcome::Ignored;
                }
                let controller = Arc::clone(&self.controller);
                self.pending
                    .push(tokio::spawn(async move { controller.shutter().await }));
                EventOutcome::CaptureQueued
            }
            UserEvent::ToggleFlash => EventOutcome::Flash(self.controller.toggle_flash().await),
            UserEvent::FlipCamera => {
                self.facing = self.facing.toggled();
                tracing::info!(facing = %self.facing, "Lens flipped");
                let session = if self.permitted {
                    self.controller.start(self.facing, self.viewport).await.ok()
                } else {
                    None
                };
                EventOutcome::Flipped {
                    facing: self.facing,
                    session,
                }
            }
        }
    }

    /// Waits for every in-flight capture and returns their results.
    pub async fn settle(&mut self) -> Vec<Result<PhotoRecord, CaptureError>> {
        let mut results = Vec::new();
        for task in self.pending.drain(..) {
            match task.await {
                Ok(Some(result)) => results.push(result),
                Ok(None) => {}
                Err(e) => tracing::error!(error = %e, "Capture task failed"),
            }
        }
        results
    }

    /// Tears the screen down after in-flight captures finish.
    pub async fn close(&mut self) -> Vec<Result<PhotoRecord, CaptureError>> {
        self.lifecycle = LifecycleState::Destroyed;
        let results = self.settle().await;
        self.controller.shutdown().await;
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{MockPlatform, RecordingFeedback, Rotation, SessionConfig};
    use crate::storage::MemoryMediaStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Prompt {
        granted: bool,
        answer: bool,
        requests: AtomicUsize,
    }

    impl Prompt {
        fn new(granted: bool, answer: bool) -> Arc<Self> {
            Arc::new(Self {
                granted,
                answer,
                requests: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PermissionPrompt for Prompt {
        fn is_granted(&self) -> bool {
            self.granted
        }

        async fn request(&self) -> bool {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.answer
        }
    }

    fn screen(platform: &MockPlatform, prompt: Arc<Prompt>) -> (CaptureScreen, Arc<MemoryMediaStore>) {
        let store = Arc::new(MemoryMediaStore::new());
        let controller = CaptureSessionController::new(
            Arc::new(platform.clone()),
            store.clone(),
            Arc::new(RecordingFeedback::new()),
            SessionConfig::default(),
            "Pictures/RubixCube",
        );
        (CaptureScreen::new(Arc::new(controller), prompt), store)
    }

    #[tokio::test]
    async fn test_open_with_granted_permission() {
        let platform = MockPlatform::new();
        let prompt = Prompt::new(true, false);
        let (mut screen, _) = screen(&platform, prompt.clone());

        let session = screen.open(Viewport::new(720, 1280)).await.unwrap();

        assert_eq!(session.facing, LensFacing::Back);
        assert_eq!(prompt.requests.load(Ordering::SeqCst), 0);
        assert_eq!(platform.bind_count(), 1);
    }

    #[tokio::test]
    async fn test_open_requests_permission() {
        let platform = MockPlatform::new();
        let prompt = Prompt::new(false, true);
        let (mut screen, _) = screen(&platform, prompt.clone());

        assert!(screen.open(Viewport::new(720, 1280)).await.is_some());
        assert_eq!(prompt.requests.load(Ordering::SeqCst), 1);
        assert!(screen.is_permitted());
    }

    #[tokio::test]
    async fn test_denied_permission_never_starts() {
        let platform = MockPlatform::new();
        let (mut screen, _) = screen(&platform, Prompt::new(false, false));

        assert!(screen.open(Viewport::new(720, 1280)).await.is_none());
        assert_eq!(platform.acquisition_count(), 0);

        // Flipping still switches the lens, but nothing is bound.
        let outcome = screen.dispatch(UserEvent::FlipCamera).await;
        assert_eq!(
            outcome,
            EventOutcome::Flipped {
                facing: LensFacing::Front,
                session: None
            }
        );
        assert_eq!(platform.bind_count(), 0);
        assert_eq!(screen.dispatch(UserEvent::Shutter).await, EventOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_flip_rebinds_other_lens() {
        let platform = MockPlatform::new();
        let (mut screen, _) = screen(&platform, Prompt::new(true, true));
        screen.open(Viewport::new(720, 1280)).await;

        let outcome = screen.dispatch(UserEvent::FlipCamera).await;
        let EventOutcome::Flipped { facing, session } = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(facing, LensFacing::Front);
        assert_eq!(session.unwrap().facing, LensFacing::Front);

        screen.dispatch(UserEvent::FlipCamera).await;
        assert_eq!(screen.facing(), LensFacing::Back);
        assert_eq!(platform.bind_count(), 3);
        assert_eq!(platform.max_bound_count(), 1);
    }

    #[tokio::test]
    async fn test_shutter_runs_in_background() {
        let platform = MockPlatform::new();
        let (mut screen, store) = screen(&platform, Prompt::new(true, true));
        screen.open(Viewport::new(720, 1280)).await;

        assert_eq!(
            screen.dispatch(UserEvent::Shutter).await,
            EventOutcome::CaptureQueued
        );
        let results = screen.settle().await;

        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());
        assert_eq!(store.len(), 1);
        assert_eq!(platform.bind_count(), 2);
    }

    #[tokio::test]
    async fn test_rotation_before_shutter_reaches_rebind() {
        let platform = MockPlatform::new();
        let (mut screen, _) = screen(&platform, Prompt::new(true, true));
        screen.open(Viewport::new(1080, 1920)).await;

        screen.set_viewport(Viewport::new(1920, 1080).with_rotation(Rotation::Deg90));
        screen.dispatch(UserEvent::Shutter).await;
        screen.settle().await;

        let request = platform.last_bind().unwrap();
        assert_eq!(platform.bind_count(), 2);
        assert_eq!(request.capture.target_rotation, Rotation::Deg90);
        assert_eq!(request.facing, LensFacing::Back);
    }

    #[tokio::test]
    async fn test_close_finishes_captures_then_unbinds() {
        let platform = MockPlatform::new();
        let (mut screen, store) = screen(&platform, Prompt::new(true, true));
        screen.open(Viewport::new(720, 1280)).await;
        screen.dispatch(UserEvent::Shutter).await;

        let results = screen.close().await;

        assert_eq!(results.len(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(platform.bound_count(), 0);
        assert_eq!(screen.lifecycle(), LifecycleState::Destroyed);
        assert_eq!(
            screen.dispatch(UserEvent::ToggleFlash).await,
            EventOutcome::Ignored
        );
    }
}
