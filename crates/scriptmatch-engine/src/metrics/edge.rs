use crate::metrics::fit_common_shape;
use crate::pipeline::ops;
use crate::pipeline::preprocess::GrayPatch;

const EDGE_PERCENTILE: f32 = 0.7;
const EDGE_FLOOR: f32 = 0.05;

/// Binary edge map: blur, Sobel magnitude, then a per-image percentile
/// threshold so the edge density adapts to the specimen's contrast.
pub fn edge_mask(patch: &GrayPatch) -> Vec<u8> {
    if patch.is_empty() {
        return Vec::new();
    }
    let blurred = ops::gaussian_blur_3x3(&patch.pixels, patch.width, patch.height);
    let mut magnitude = ops::sobel_magnitude(&blurred, patch.width, patch.height);
    ops::normalize(&mut magnitude);
    let threshold = ops::percentile(&magnitude, EDGE_PERCENTILE).max(EDGE_FLOOR);
    magnitude
        .iter()
        .map(|&m| if m >= threshold { 1 } else { 0 })
        .collect()
}

/// Intersection-over-union of the two edge masks at matching coordinates, as
/// a percentage. Returns 0 when either mask is empty. Symmetric.
pub fn edge_overlap(a: &GrayPatch, b: &GrayPatch) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (a, b) = fit_common_shape(a, b);
    let mask_a = edge_mask(&a);
    let mask_b = edge_mask(&b);

    let mut intersection = 0usize;
    let mut union = 0usize;
    let mut any_a = false;
    let mut any_b = false;
    for (&ea, &eb) in mask_a.iter().zip(mask_b.iter()) {
        if ea > 0 {
            any_a = true;
        }
        if eb > 0 {
            any_b = true;
        }
        if ea > 0 && eb > 0 {
            intersection += 1;
        }
        if ea > 0 || eb > 0 {
            union += 1;
        }
    }
    if !any_a || !any_b || union == 0 {
        return 0.0;
    }
    (intersection as f32 / union as f32 * 100.0).clamp(0.0, 100.0)
}
