//! Converts an arbitrary encoded specimen into a normalized, comparably
//! scaled representation: single-channel grayscale at a canonical size,
//! contrast-equalized, with a binary ink mask and its skeleton.

use image::GrayImage;
use scriptmatch_types::{CompareError, CompareResult};

use crate::pipeline::ops;

/// Longest edge of a normalized specimen, in pixels. Scans and phone photos
/// of wildly different resolution land on the same grid.
pub const CANONICAL_EDGE: u32 = 512;

const THRESHOLD_WINDOW: usize = 21;
const THRESHOLD_OFFSET: f32 = 10.0 / 255.0;

#[derive(Copy, Clone, Debug)]
pub struct PreprocessSettings {
    pub canonical_edge: u32,
    pub threshold_window: usize,
    pub threshold_offset: f32,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            canonical_edge: CANONICAL_EDGE,
            threshold_window: THRESHOLD_WINDOW,
            threshold_offset: THRESHOLD_OFFSET,
        }
    }
}

/// Owned single-channel raster in the 0..=1 range, row-major, origin top-left.
#[derive(Clone, Debug)]
pub struct GrayPatch {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<f32>,
}

impl GrayPatch {
    pub fn new(width: usize, height: usize, pixels: Vec<f32>) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn from_luma(image: &GrayImage) -> Self {
        let width = image.width() as usize;
        let height = image.height() as usize;
        let pixels = image.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn to_luma(&self) -> GrayImage {
        let data: Vec<u8> = self
            .pixels
            .iter()
            .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect();
        GrayImage::from_raw(self.width as u32, self.height as u32, data)
            .expect("patch dimensions match buffer length")
    }
}

/// A specimen after the full normalization pass. `ink` and `skeleton` are
/// binary masks over the same grid as `gray`.
#[derive(Clone, Debug)]
pub struct NormalizedSpecimen {
    pub gray: GrayPatch,
    pub ink: Vec<u8>,
    pub skeleton: Vec<u8>,
}

impl NormalizedSpecimen {
    pub fn width(&self) -> usize {
        self.gray.width
    }

    pub fn height(&self) -> usize {
        self.gray.height
    }

    pub fn ink_pixels(&self) -> usize {
        self.ink.iter().filter(|&&v| v > 0).count()
    }
}

/// Decodes an encoded image buffer to grayscale at native resolution.
pub fn decode_gray(bytes: &[u8]) -> CompareResult<GrayPatch> {
    let decoded =
        image::load_from_memory(bytes).map_err(|err| CompareError::decode(err.to_string()))?;
    Ok(GrayPatch::from_luma(&decoded.to_luma8()))
}

/// Full normalization pass. Deterministic: identical input bytes always
/// produce an identical specimen.
pub fn normalize(bytes: &[u8], settings: PreprocessSettings) -> CompareResult<NormalizedSpecimen> {
    let native = decode_gray(bytes)?;
    if native.is_empty() {
        return Err(CompareError::decode("image has zero pixels"));
    }
    let gray = rescale_to_canonical(&native, settings.canonical_edge);
    normalize_patch(gray, settings)
}

/// Normalization for an already-decoded region, used by the local comparison
/// path where the region keeps its native resolution.
pub fn normalize_patch(
    mut gray: GrayPatch,
    settings: PreprocessSettings,
) -> CompareResult<NormalizedSpecimen> {
    ops::equalize_histogram(&mut gray.pixels);
    let ink = ops::adaptive_threshold(
        &gray.pixels,
        gray.width,
        gray.height,
        settings.threshold_window,
        settings.threshold_offset,
    );
    let skeleton = ops::skeletonize(&ink, gray.width, gray.height);
    Ok(NormalizedSpecimen {
        gray,
        ink,
        skeleton,
    })
}

fn rescale_to_canonical(patch: &GrayPatch, canonical_edge: u32) -> GrayPatch {
    let edge = canonical_edge.max(1) as usize;
    let longest = patch.width.max(patch.height);
    if longest == edge {
        return patch.clone();
    }
    let scale = edge as f32 / longest as f32;
    let new_width = ((patch.width as f32 * scale).round() as usize).max(1);
    let new_height = ((patch.height as f32 * scale).round() as usize).max(1);
    let pixels = if longest > edge {
        ops::resize_average(
            &patch.pixels,
            patch.width,
            patch.height,
            new_width,
            new_height,
        )
    } else {
        ops::resize_bilinear(
            &patch.pixels,
            patch.width,
            patch.height,
            new_width,
            new_height,
        )
    };
    GrayPatch::new(new_width, new_height, pixels)
}
