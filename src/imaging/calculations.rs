//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the largest dimensions that fit inside `bounds` while keeping
/// the aspect ratio of `source`.
///
/// Images that already fit are returned unchanged: thumbnails never upscale.
/// Neither output edge is ever rounded down to zero.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `bounds` - Bounding box (max width, max height)
///
/// # Returns
/// * `(width, height)` - Fitted dimensions, each `<=` the matching bound
///
/// # Examples
/// ```
/// # use image_ingest::imaging::calculate_fit_dimensions;
/// // 3000x2000 landscape into a 300 box → 300x200
/// assert_eq!(calculate_fit_dimensions((3000, 2000), (300, 300)), (300, 200));
///
/// // Already small enough → untouched
/// assert_eq!(calculate_fit_dimensions((120, 80), (300, 300)), (120, 80));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = (bounds.0.max(1), bounds.1.max(1));

    if src_w <= max_w && src_h <= max_h {
        return source;
    }

    let src_aspect = src_w as f64 / src_h as f64;
    let max_aspect = max_w as f64 / max_h as f64;

    let (w, h) = if src_aspect > max_aspect {
        // Source is wider than the box: width is the limiting edge
        (max_w, (max_w as f64 / src_aspect).round() as u32)
    } else {
        // Source is taller (or same shape): height is the limiting edge
        ((max_h as f64 * src_aspect).round() as u32, max_h)
    };

    (w.clamp(1, max_w), h.clamp(1, max_h))
}
