//! Region extraction and interactive local comparison. `crop` pulls a
//! sub-region out of the source image at native resolution from display-space
//! coordinates; `local_compare` re-scores a user-positioned overlay region
//! against the base image on every transform update.

use image::{Rgba, RgbaImage};
use scriptmatch_types::{
    CompareError, CompareResult, CropOutput, CropRect, DisplaySize, LocalComparisonResult,
    OverlayTransform,
};

use crate::geometry;
use crate::metrics::{edge_overlap, ssim};
use crate::pipeline::ops;
use crate::pipeline::preprocess::{decode_gray, GrayPatch};
use crate::visualize;

/// Longest edge of the buffers actually compared by `local_compare`. Larger
/// regions are downsampled so gesture-frequency calls stay interactive.
const MAX_LOCAL_EDGE: usize = 512;

/// Fill used when a resampled overlay pixel falls outside its source; paper
/// white so it reads as background everywhere downstream.
const OVERLAY_FILL: f32 = 1.0;

/// Extracts the display-space rectangle from `bytes` at native resolution.
/// Overflowing rectangles are clamped, never rejected; the returned size
/// never exceeds the source dimensions. Two renderings come back: one with
/// the paper background knocked out to alpha for overlay compositing, and an
/// opaque fallback for surfaces without alpha support.
pub fn crop(bytes: &[u8], rect: CropRect, display: DisplaySize) -> CompareResult<CropOutput> {
    let decoded =
        image::load_from_memory(bytes).map_err(|err| CompareError::decode(err.to_string()))?;
    let source = decoded.to_rgba8();
    let region = geometry::map_display_to_source(&rect, display, source.width(), source.height())?;

    let mut solid = RgbaImage::new(region.width, region.height);
    for y in 0..region.height {
        for x in 0..region.width {
            let pixel = source.get_pixel(region.x + x, region.y + y);
            solid.put_pixel(x, y, Rgba([pixel[0], pixel[1], pixel[2], 255]));
        }
    }

    let mut transparent = solid.clone();
    if let Some(threshold) = background_threshold(&solid) {
        // Levels at or below the split stay opaque ink; everything brighter
        // is paper and gets knocked out.
        for pixel in transparent.pixels_mut() {
            if luma(pixel) > threshold {
                pixel[3] = 0;
            }
        }
    }

    Ok(CropOutput {
        transparent_png: visualize::encode_png_rgba(&transparent)?,
        solid_png: visualize::encode_png_rgba(&solid)?,
        width: region.width,
        height: region.height,
        origin_x: region.x,
        origin_y: region.y,
    })
}

/// Otsu split of the crop's luminance histogram. `None` when the region has
/// no meaningful foreground/background separation, in which case the crop
/// stays fully opaque.
fn background_threshold(region: &RgbaImage) -> Option<u8> {
    let mut histogram = [0u32; 256];
    for pixel in region.pixels() {
        histogram[luma(pixel) as usize] += 1;
    }
    let total = region.width() as u64 * region.height() as u64;
    if total == 0 {
        return None;
    }
    let weighted_total: u64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as u64 * count as u64)
        .sum();

    let mut best_threshold = None;
    let mut best_variance = 0.0f64;
    let mut background_count = 0u64;
    let mut background_sum = 0u64;
    for level in 0..256 {
        background_count += histogram[level] as u64;
        if background_count == 0 {
            continue;
        }
        let foreground_count = total - background_count;
        if foreground_count == 0 {
            break;
        }
        background_sum += level as u64 * histogram[level] as u64;
        let mean_background = background_sum as f64 / background_count as f64;
        let mean_foreground =
            (weighted_total - background_sum) as f64 / foreground_count as f64;
        let delta = mean_background - mean_foreground;
        let variance =
            background_count as f64 * foreground_count as f64 * delta * delta;
        if variance > best_variance {
            best_variance = variance;
            best_threshold = Some(level as u8);
        }
    }
    best_threshold
}

fn luma(pixel: &Rgba<u8>) -> u8 {
    ((pixel[0] as u32 * 299 + pixel[1] as u32 * 587 + pixel[2] as u32 * 114) / 1000) as u8
}

/// Scores the overlay region against the base image under a transform
/// snapshot. Out-of-bounds placements are clamped to the visible
/// intersection; the comparison itself runs on bounded buffers so each
/// gesture update completes well inside interactive latency.
pub fn local_compare(
    base_bytes: &[u8],
    overlay_bytes: &[u8],
    transform: OverlayTransform,
) -> CompareResult<LocalComparisonResult> {
    let transform = transform.clamped();
    let base = decode_gray(base_bytes)?;
    let overlay = decode_gray(overlay_bytes)?;
    if base.is_empty() || overlay.is_empty() {
        return Err(CompareError::decode("image has zero pixels"));
    }

    let scale = transform.scale;
    let target_width = ((overlay.width as f32 * scale).round() as i64).max(1);
    let target_height = ((overlay.height as f32 * scale).round() as i64).max(1);
    let translate_x = transform.translate_x.round() as i64;
    let translate_y = transform.translate_y.round() as i64;

    let region = geometry::clamp_to_bounds(
        translate_x,
        translate_y,
        target_width,
        target_height,
        base.width as u32,
        base.height as u32,
    );
    // Window offset of the visible region inside the transformed overlay.
    let window_x = (region.x as i64 - translate_x).max(0) as f32;
    let window_y = (region.y as i64 - translate_y).max(0) as f32;

    let longest = (region.width.max(region.height)) as usize;
    let bound = (MAX_LOCAL_EDGE as f32 / longest as f32).min(1.0);
    let compared_width = ((region.width as f32 * bound).round() as usize).max(1);
    let compared_height = ((region.height as f32 * bound).round() as usize).max(1);

    let mut overlay_region = resample_overlay(
        &overlay,
        scale,
        transform.rotation_degrees,
        (target_width as f32, target_height as f32),
        (window_x, window_y),
        (region.width as f32, region.height as f32),
        (compared_width, compared_height),
    );
    let mut base_region = extract_base_region(&base, &region, compared_width, compared_height);

    ops::equalize_histogram(&mut overlay_region.pixels);
    ops::equalize_histogram(&mut base_region.pixels);

    let local_ssim = ssim(&base_region, &overlay_region);
    let overlap = edge_overlap(&base_region, &overlay_region);
    let heatmap = visualize::difference_heatmap(&base_region, &overlay_region, transform.alpha);
    let edges = visualize::edge_visualization(&base_region, &overlay_region);

    Ok(LocalComparisonResult {
        local_ssim,
        edge_overlap: overlap,
        difference_heatmap: visualize::encode_png_rgb(&heatmap)?,
        edge_visualization: visualize::encode_png_rgb(&edges)?,
        region_width: compared_width as u32,
        region_height: compared_height as u32,
    })
}

/// Inverse-maps each compared pixel through the bound, the window offset,
/// and the rotation/scale back into overlay source coordinates, sampling
/// bilinearly.
fn resample_overlay(
    overlay: &GrayPatch,
    scale: f32,
    rotation_degrees: f32,
    (canvas_width, canvas_height): (f32, f32),
    (window_x, window_y): (f32, f32),
    (window_width, window_height): (f32, f32),
    (out_width, out_height): (usize, usize),
) -> GrayPatch {
    let theta = rotation_degrees.to_radians();
    let (sin, cos) = theta.sin_cos();
    let center_x = canvas_width / 2.0;
    let center_y = canvas_height / 2.0;
    let source_center_x = overlay.width as f32 / 2.0;
    let source_center_y = overlay.height as f32 / 2.0;
    let step_x = window_width / out_width as f32;
    let step_y = window_height / out_height as f32;

    let mut pixels = vec![OVERLAY_FILL; out_width * out_height];
    for oy in 0..out_height {
        let canvas_y = window_y + (oy as f32 + 0.5) * step_y - 0.5;
        let dy = canvas_y - center_y;
        for ox in 0..out_width {
            let canvas_x = window_x + (ox as f32 + 0.5) * step_x - 0.5;
            let dx = canvas_x - center_x;
            // Inverse rotation, then inverse scale, into source space.
            let rx = dx * cos + dy * sin;
            let ry = -dx * sin + dy * cos;
            let sx = rx / scale + source_center_x;
            let sy = ry / scale + source_center_y;
            pixels[oy * out_width + ox] = ops::sample_bilinear(
                &overlay.pixels,
                overlay.width,
                overlay.height,
                sx,
                sy,
                OVERLAY_FILL,
            );
        }
    }
    GrayPatch::new(out_width, out_height, pixels)
}

fn extract_base_region(
    base: &GrayPatch,
    region: &geometry::SourceRect,
    out_width: usize,
    out_height: usize,
) -> GrayPatch {
    let width = region.width as usize;
    let height = region.height as usize;
    let mut pixels = vec![0.0f32; width * height];
    for y in 0..height {
        let src = (region.y as usize + y) * base.width + region.x as usize;
        let dst = y * width;
        pixels[dst..dst + width].copy_from_slice(&base.pixels[src..src + width]);
    }
    if out_width == width && out_height == height {
        return GrayPatch::new(width, height, pixels);
    }
    GrayPatch::new(
        out_width,
        out_height,
        ops::resize_average(&pixels, width, height, out_width, out_height),
    )
}
