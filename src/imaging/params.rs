//! Parameter types for image operations.
//!
//! These describe *what* to produce, not *how*. They sit between the
//! [`operations`](super::operations) module (which decides what each upload
//! turns into) and the [`backend`](super::backend) (which does the pixel work).
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1–100). Clamped on construction.
//! - [`ThumbnailBox`]: bounding box a thumbnail must fit inside.

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
///
/// Out-of-range values are clamped, never rejected: `0` becomes `1` and
/// anything above `100` becomes `100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Bounding box for thumbnails, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailBox {
    pub max_width: u32,
    pub max_height: u32,
}

impl ThumbnailBox {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }

    pub fn as_tuple(self) -> (u32, u32) {
        (self.max_width, self.max_height)
    }
}

impl Default for ThumbnailBox {
    fn default() -> Self {
        Self::new(300, 300)
    }
}
