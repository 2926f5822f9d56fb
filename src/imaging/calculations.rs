//! Pure calculation functions for image geometry.
//!
//! All functions here are pure and testable without any I/O or images.

/// Whether the rectangle `(x, y, width, height)` lies fully inside an image
/// of `bounds = (width, height)`.
///
/// Sums are computed in `u64` so coordinates near `u32::MAX` can't wrap
/// around and sneak past the check.
///
/// ```
/// # use photo_editor::imaging::rect_within;
/// assert!(rect_within((10, 10, 80, 80), (100, 100)));
/// assert!(!rect_within((90, 0, 20, 10), (100, 100)));
/// ```
pub fn rect_within(rect: (u32, u32, u32, u32), bounds: (u32, u32)) -> bool {
    let (x, y, w, h) = rect;
    let (bw, bh) = bounds;
    x as u64 + w as u64 <= bw as u64 && y as u64 + h as u64 <= bh as u64
}

/// Height that keeps the source aspect ratio at the given width.
///
/// Never returns 0: a 1000x1 strip resized to width 10 stays 1px tall.
pub fn height_for_width(source: (u32, u32), width: u32) -> u32 {
    let (src_w, src_h) = source;
    if src_w == 0 {
        return src_h.max(1);
    }
    let h = (width as f64 * src_h as f64 / src_w as f64).round() as u32;
    h.max(1)
}

/// Width that keeps the source aspect ratio at the given height.
pub fn width_for_height(source: (u32, u32), height: u32) -> u32 {
    let (src_w, src_h) = source;
    if src_h == 0 {
        return src_w.max(1);
    }
    let w = (height as f64 * src_w as f64 / src_h as f64).round() as u32;
    w.max(1)
}

/// Scale both dimensions by `factor`, rounding to the nearest pixel.
///
/// Unlike the aspect helpers this may return 0; callers reject that.
pub fn scaled_dimensions(source: (u32, u32), factor: f64) -> (u64, u64) {
    let (w, h) = source;
    (
        (w as f64 * factor).round() as u64,
        (h as f64 * factor).round() as u64,
    )
}
