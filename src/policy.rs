//! Transcode policy: what happens to an upload's bytes.
//!
//! | Decision | When | Primary output |
//! |---|---|---|
//! | [`Preserve`](TranscodeDecision::Preserve) | source format or declared type is special (GIF, SVG) | input bytes verbatim |
//! | [`RecompressSame`](TranscodeDecision::RecompressSame) | source is already WebP | re-encoded WebP above the size threshold, verbatim below |
//! | [`ConvertTarget`](TranscodeDecision::ConvertTarget) | everything else | decoded raster encoded as WebP |
//!
//! The decision is a pure function of `(source format, declared content-type)`,
//! except that any animated source is preserved: re-encoding it would keep
//! only the first frame.
//! The recompress size threshold is applied when the decision is executed, see
//! [`operations::transcode_primary`](crate::imaging::operations::transcode_primary).

use crate::imaging::{DecodedImage, OutputFormat, SourceFormat, TARGET_FORMAT};
use serde::Serialize;
use std::fmt;

/// Source formats whose re-encoding would lose essential content (animation).
const SPECIAL_FORMATS: &[SourceFormat] = &[SourceFormat::Gif];

/// Declared content-types treated as special (animation, vector scalability).
const SPECIAL_CONTENT_TYPES: &[&str] = &["image/gif", "image/svg+xml"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscodeDecision {
    Preserve,
    RecompressSame,
    ConvertTarget,
}

impl TranscodeDecision {
    /// Thumbnail format for uploads under this decision.
    ///
    /// Preserved uploads get a JPEG thumbnail; the target format may not
    /// represent them acceptably. Everything else gets a target-format thumbnail.
    pub fn thumbnail_format(self) -> OutputFormat {
        match self {
            Self::Preserve => OutputFormat::Jpeg,
            Self::RecompressSame | Self::ConvertTarget => TARGET_FORMAT,
        }
    }
}

impl fmt::Display for TranscodeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Preserve => "preserve",
            Self::RecompressSame => "recompress-same",
            Self::ConvertTarget => "convert-target",
        })
    }
}

pub fn is_special(source: SourceFormat, declared_content_type: &str) -> bool {
    SPECIAL_FORMATS.contains(&source) || SPECIAL_CONTENT_TYPES.contains(&declared_content_type)
}

/// Decide how to transcode an upload.
pub fn decide(source: SourceFormat, declared_content_type: &str) -> TranscodeDecision {
    if is_special(source, declared_content_type) {
        TranscodeDecision::Preserve
    } else if source == TARGET_FORMAT.source_format() {
        TranscodeDecision::RecompressSame
    } else {
        TranscodeDecision::ConvertTarget
    }
}

/// Decide for a decoded upload. Animated sources are always preserved.
pub fn decide_for(decoded: &DecodedImage, declared_content_type: &str) -> TranscodeDecision {
    if decoded.animated {
        TranscodeDecision::Preserve
    } else {
        decide(decoded.format, declared_content_type)
    }
}
