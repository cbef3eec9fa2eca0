//! Session sequencing: binding, rebinding, shutter and torch.

mod controller;
pub mod flash;

pub use controller::{CaptureSessionController, SessionInfo, StartError};
pub use flash::FlashOutcome;
