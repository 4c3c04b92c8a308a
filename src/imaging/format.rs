//! Format tags, byte-signature sniffing, and the mime/extension tables.
//!
//! The declared content-type of an upload is attacker-controlled. Everything
//! that ends up stored (mime type, extension) is derived from the format
//! detected here or by the decoder chain, never from the client's claim.

use image::ImageFormat;
use std::fmt;

/// Encoded format an upload was decoded from.
///
/// The named variants are the formats the decoder chain tries explicitly;
/// everything else the generic fallback recognizes lands in [`Other`](Self::Other).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    WebP,
    Gif,
    Png,
    Jpeg,
    Other(ImageFormat),
}

impl SourceFormat {
    /// Map an `image` crate format onto a source tag.
    pub fn from_image_format(format: ImageFormat) -> Self {
        match format {
            ImageFormat::WebP => Self::WebP,
            ImageFormat::Gif => Self::Gif,
            ImageFormat::Png => Self::Png,
            ImageFormat::Jpeg => Self::Jpeg,
            other => Self::Other(other),
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::WebP => ImageFormat::WebP,
            Self::Gif => ImageFormat::Gif,
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Other(format) => format,
        }
    }

    /// Short lowercase tag, e.g. `"webp"`, `"jpeg"`, `"tiff"`.
    pub fn name(self) -> &'static str {
        match self {
            Self::WebP => "webp",
            Self::Gif => "gif",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Other(format) => format.extensions_str().first().copied().unwrap_or("bin"),
        }
    }

    pub fn mime_type(self) -> &'static str {
        self.image_format().to_mime_type()
    }

    /// File extension (without the dot) used for stored keys.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            other => other.name(),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Formats the encoder can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// The normalized storage format every non-special upload converges to.
    WebP,
    /// Fallback raster format for thumbnails of special (preserved) uploads.
    Jpeg,
}

impl OutputFormat {
    pub fn source_format(self) -> SourceFormat {
        match self {
            Self::WebP => SourceFormat::WebP,
            Self::Jpeg => SourceFormat::Jpeg,
        }
    }

    pub fn mime_type(self) -> &'static str {
        self.source_format().mime_type()
    }

    pub fn extension(self) -> &'static str {
        self.source_format().extension()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source_format().name())
    }
}

/// The single format non-special uploads are normalized to.
pub const TARGET_FORMAT: OutputFormat = OutputFormat::WebP;

/// Detect the encoded format from the leading byte signature.
///
/// Returns `None` when no known signature matches. This only looks at magic
/// bytes; a match does not guarantee the rest of the buffer decodes.
pub fn sniff(bytes: &[u8]) -> Option<SourceFormat> {
    image::guess_format(bytes)
        .ok()
        .map(SourceFormat::from_image_format)
}

/// Whether `bytes` is an animated WebP container.
///
/// Walks the RIFF chunk list and reports `true` on an `ANIM` chunk or a
/// `VP8X` header with the animation flag set. Still WebP (simple `VP8 `/`VP8L`
/// files, or extended files without the flag) and non-WebP input report
/// `false`.
pub fn is_animated_webp(bytes: &[u8]) -> bool {
    const VP8X_ANIMATION_FLAG: u8 = 0x02;

    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WEBP" {
        return false;
    }

    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let fourcc = &bytes[offset..offset + 4];
        let size = u32::from_le_bytes([
            bytes[offset + 4],
            bytes[offset + 5],
            bytes[offset + 6],
            bytes[offset + 7],
        ]) as usize;
        let payload = offset + 8;

        match fourcc {
            b"ANIM" | b"ANMF" => return true,
            b"VP8X" => {
                if bytes
                    .get(payload)
                    .is_some_and(|flags| flags & VP8X_ANIMATION_FLAG != 0)
                {
                    return true;
                }
            }
            _ => {}
        }

        // Chunk payloads are padded to an even length.
        offset = payload.saturating_add(size).saturating_add(size & 1);
    }
    false
}

/// Guess a declared content-type from a file extension.
///
/// Used by the CLI to fill in the hint a browser would normally send.
pub fn content_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "svg" => Some("image/svg+xml"),
        other => ImageFormat::from_extension(other).map(|f| f.to_mime_type()),
    }
}
