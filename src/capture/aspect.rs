//! Target aspect ratio selection for preview and capture surfaces.
//!
//! The platform only accepts a small set of standard ratios, so the
//! viewport shape is snapped to whichever of them it is closest to.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Viewport dimension errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewportError {
    #[error("viewport has a zero dimension ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// Standard aspect ratios accepted by the camera platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 4:3, the native sensor shape on most devices.
    #[serde(rename = "4:3")]
    Ratio4x3,
    /// 16:9 widescreen.
    #[serde(rename = "16:9")]
    Ratio16x9,
}

impl AspectRatio {
    /// Picks the standard ratio closest to the viewport shape.
    ///
    /// Orientation does not matter: the long side is always divided by the
    /// short side. An exact tie between the two candidates resolves to 4:3.
    pub fn select(width: u32, height: u32) -> Result<Self, ViewportError> {
        if width == 0 || height == 0 {
            return Err(ViewportError::Empty { width, height });
        }

        let long = u64::from(width.max(height));
        let short = u64::from(width.min(height));

        // |L/S - 4/3| <= |L/S - 16/9|, scaled by 9S to stay in integers.
        let to_4x3 = (9 * long).abs_diff(12 * short);
        let to_16x9 = (9 * long).abs_diff(16 * short);

        if to_4x3 <= to_16x9 {
            Ok(AspectRatio::Ratio4x3)
        } else {
            Ok(AspectRatio::Ratio16x9)
        }
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        AspectRatio::Ratio4x3
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectRatio::Ratio4x3 => f.write_str("4:3"),
            AspectRatio::Ratio16x9 => f.write_str("16:9"),
        }
    }
}
