//! Coordinate mapping between a displayed (scaled) rendition of an image and
//! its native pixel space, plus bounds clamping for crop rectangles.

use scriptmatch_types::{CompareError, CompareResult, CropRect, DisplaySize};

/// Rectangle in source pixel coordinates, always inside the source bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Maps a display-space rectangle into source pixels using independent X/Y
/// scale factors, rounding to the nearest pixel, then clamps to the source
/// bounds. Degenerate display dimensions or rectangles are caller errors.
pub fn map_display_to_source(
    rect: &CropRect,
    display: DisplaySize,
    source_width: u32,
    source_height: u32,
) -> CompareResult<SourceRect> {
    if display.width <= 0.0 || display.height <= 0.0 {
        return Err(CompareError::geometry(format!(
            "display size {}x{} is degenerate",
            display.width, display.height
        )));
    }
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return Err(CompareError::geometry(format!(
            "crop rectangle {}x{} is degenerate",
            rect.width, rect.height
        )));
    }
    if source_width == 0 || source_height == 0 {
        return Err(CompareError::geometry("source image has zero pixels"));
    }
    let scale_x = source_width as f64 / display.width as f64;
    let scale_y = source_height as f64 / display.height as f64;
    let x = (rect.x as f64 * scale_x).round() as i64;
    let y = (rect.y as f64 * scale_y).round() as i64;
    let width = (rect.width as f64 * scale_x).round() as i64;
    let height = (rect.height as f64 * scale_y).round() as i64;
    Ok(clamp_to_bounds(x, y, width, height, source_width, source_height))
}

/// Clamps a rectangle to the image bounds instead of rejecting overflow. The
/// result always has at least one pixel and never exceeds the source size.
pub fn clamp_to_bounds(
    x: i64,
    y: i64,
    width: i64,
    height: i64,
    source_width: u32,
    source_height: u32,
) -> SourceRect {
    let sw = source_width as i64;
    let sh = source_height as i64;
    let x0 = x.clamp(0, sw - 1);
    let y0 = y.clamp(0, sh - 1);
    let x1 = (x + width.max(1)).clamp(x0 + 1, sw);
    let y1 = (y + height.max(1)).clamp(y0 + 1, sh);
    SourceRect {
        x: x0 as u32,
        y: y0 as u32,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
    }
}
