//! Renders comparison artifacts: the difference heatmap, the edge-overlap
//! visualization, grayscale/mask exports, and thumbnails. All outputs leave
//! the engine as encoded PNG or JPEG buffers.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, GrayImage, ImageEncoder, RgbImage, RgbaImage};
use scriptmatch_types::{CompareError, CompareResult};

use crate::metrics::edge_mask;
use crate::pipeline::ops;
use crate::pipeline::preprocess::GrayPatch;

const HEATMAP_BLUR_RADIUS: usize = 5;
const THUMBNAIL_QUALITY: u8 = 85;

/// Pixel-wise difference of two equally-sized patches, blurred, min-max
/// normalized, false-colored (red = high dissimilarity), and blended over
/// the first patch.
pub fn difference_heatmap(a: &GrayPatch, b: &GrayPatch, alpha: f32) -> RgbImage {
    debug_assert_eq!(a.width, b.width);
    debug_assert_eq!(a.height, b.height);
    let width = a.width;
    let height = a.height;
    let mut diff: Vec<f32> = a
        .pixels
        .iter()
        .zip(b.pixels.iter())
        .map(|(&pa, &pb)| (pa - pb).abs())
        .collect();
    diff = ops::box_blur(&diff, width, height, HEATMAP_BLUR_RADIUS);

    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for &v in &diff {
        min = min.min(v);
        max = max.max(v);
    }
    let range = (max - min).max(f32::EPSILON);

    let blend = alpha.clamp(0.0, 1.0);
    let mut output = RgbImage::new(width as u32, height as u32);
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let heat = jet((diff[idx] - min) / range);
            let base = (a.pixels[idx].clamp(0.0, 1.0) * 255.0) as f32;
            let pixel = [
                (base * (1.0 - blend) + heat[0] as f32 * blend) as u8,
                (base * (1.0 - blend) + heat[1] as f32 * blend) as u8,
                (base * (1.0 - blend) + heat[2] as f32 * blend) as u8,
            ];
            output.put_pixel(x as u32, y as u32, image::Rgb(pixel));
        }
    }
    output
}

/// Edge maps of both patches overlaid in distinguishing colors: base-only
/// edges cyan, overlay-only edges red, agreement white.
pub fn edge_visualization(a: &GrayPatch, b: &GrayPatch) -> RgbImage {
    debug_assert_eq!(a.width, b.width);
    debug_assert_eq!(a.height, b.height);
    let mask_a = edge_mask(a);
    let mask_b = edge_mask(b);
    let mut output = RgbImage::new(a.width as u32, a.height as u32);
    for y in 0..a.height {
        for x in 0..a.width {
            let idx = y * a.width + x;
            let color = match (mask_a[idx] > 0, mask_b[idx] > 0) {
                (true, true) => [245, 245, 245],
                (true, false) => [0, 200, 255],
                (false, true) => [255, 64, 64],
                (false, false) => [16, 16, 24],
            };
            output.put_pixel(x as u32, y as u32, image::Rgb(color));
        }
    }
    output
}

fn jet(value: f32) -> [u8; 3] {
    let v = value.clamp(0.0, 1.0);
    let r = (1.5 - (4.0 * v - 3.0).abs()).clamp(0.0, 1.0);
    let g = (1.5 - (4.0 * v - 2.0).abs()).clamp(0.0, 1.0);
    let b = (1.5 - (4.0 * v - 1.0).abs()).clamp(0.0, 1.0);
    [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8]
}

/// Renders a binary mask white-on-black, the conventional skeleton export.
pub fn render_mask(mask: &[u8], width: usize, height: usize) -> GrayImage {
    let data: Vec<u8> = mask.iter().map(|&v| if v > 0 { 255 } else { 0 }).collect();
    GrayImage::from_raw(width as u32, height as u32, data)
        .expect("mask dimensions match buffer length")
}

pub fn encode_png_gray(image: &GrayImage) -> CompareResult<Vec<u8>> {
    let mut encoded = Vec::new();
    PngEncoder::new(&mut encoded)
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::L8)
        .map_err(encode_error)?;
    Ok(encoded)
}

pub fn encode_png_rgb(image: &RgbImage) -> CompareResult<Vec<u8>> {
    let mut encoded = Vec::new();
    PngEncoder::new(&mut encoded)
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)
        .map_err(encode_error)?;
    Ok(encoded)
}

pub fn encode_png_rgba(image: &RgbaImage) -> CompareResult<Vec<u8>> {
    let mut encoded = Vec::new();
    PngEncoder::new(&mut encoded)
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)
        .map_err(encode_error)?;
    Ok(encoded)
}

/// Downscaled JPEG preview of an encoded image, longest edge `max_edge`.
pub fn thumbnail(bytes: &[u8], max_edge: u32) -> CompareResult<Vec<u8>> {
    let decoded =
        image::load_from_memory(bytes).map_err(|err| CompareError::decode(err.to_string()))?;
    let preview = decoded.thumbnail(max_edge, max_edge).to_rgb8();
    let mut encoded = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut encoded, THUMBNAIL_QUALITY)
        .encode(
            preview.as_raw(),
            preview.width(),
            preview.height(),
            ColorType::Rgb8,
        )
        .map_err(encode_error)?;
    Ok(encoded.into_inner())
}

fn encode_error(err: image::ImageError) -> CompareError {
    CompareError::Io(std::io::Error::other(err))
}
