//! Two-state torch toggle.

use crate::capture::{BoundCamera, FlashIcon, TorchState, UserFeedback};

/// Result of a torch toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashOutcome {
    /// The camera has no flash unit; nothing changed.
    NoFlashUnit,
    /// Torch switched on.
    Enabled,
    /// Torch switched off.
    Disabled,
}

/// Flips the torch on `camera` and updates the flash button icon.
///
/// The icon always shows what the next tap will do, so turning the torch
/// on shows [`FlashIcon::FlashOff`].
pub fn toggle(camera: &dyn BoundCamera, feedback: &dyn UserFeedback) -> FlashOutcome {
    if !camera.has_flash_unit() {
        feedback.notify("You have no flash");
        return FlashOutcome::NoFlashUnit;
    }

    match camera.torch_state() {
        TorchState::Off => {
            camera.enable_torch(true);
            feedback.set_flash_icon(FlashIcon::FlashOff);
            tracing::debug!("Torch enabled");
            FlashOutcome::Enabled
        }
        TorchState::On => {
            camera.enable_torch(false);
            feedback.set_flash_icon(FlashIcon::FlashOn);
            tracing::debug!("Torch disabled");
            FlashOutcome::Disabled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{MockCamera, RecordingFeedback};

    #[test]
    fn test_no_flash_unit() {
        let camera = MockCamera::new(false);
        let feedback = RecordingFeedback::new();

        assert_eq!(toggle(&camera, &feedback), FlashOutcome::NoFlashUnit);
        assert_eq!(camera.torch_state(), TorchState::Off);
        assert_eq!(feedback.messages(), vec!["You have no flash".to_string()]);
        assert_eq!(feedback.flash_icon(), None);
    }

    #[test]
    fn test_toggle_cycle() {
        let camera = MockCamera::new(true);
        let feedback = RecordingFeedback::new();

        assert_eq!(toggle(&camera, &feedback), FlashOutcome::Enabled);
        assert_eq!(camera.torch_state(), TorchState::On);
        assert_eq!(feedback.flash_icon(), Some(FlashIcon::FlashOff));

        assert_eq!(toggle(&camera, &feedback), FlashOutcome::Disabled);
        assert_eq!(camera.torch_state(), TorchState::Off);
        assert_eq!(feedback.flash_icon(), Some(FlashIcon::FlashOn));

        assert!(feedback.messages().is_empty());
    }
}
