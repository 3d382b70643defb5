//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::ScalePercent;

/// Scale both edges by a percentage, rounding to the nearest pixel.
///
/// Neither edge drops below one pixel, so tiny inputs still produce a
/// decodable image.
///
/// # Examples
/// ```
/// # use resize_pipe::imaging::{ScalePercent, scale_dimensions};
/// // Halving a 6000x4000 photo
/// assert_eq!(scale_dimensions((6000, 4000), ScalePercent::new(50)), (3000, 2000));
///
/// // Odd edges round to nearest
/// assert_eq!(scale_dimensions((101, 33), ScalePercent::new(50)), (51, 17));
/// ```
pub fn scale_dimensions(source: (u32, u32), scale: ScalePercent) -> (u32, u32) {
    let (w, h) = source;
    let pct = scale.value() as f64 / 100.0;
    let scaled = |edge: u32| ((edge as f64 * pct).round() as u32).max(1);
    (scaled(w), scaled(h))
}

/// The ImageMagick geometry argument for a percentage resize, e.g. `"50%"`.
pub fn resize_geometry(scale: ScalePercent) -> String {
    format!("{}%", scale.value())
}
