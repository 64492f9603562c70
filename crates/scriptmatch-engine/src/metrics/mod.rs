//! Pure similarity metrics. Every function here is deterministic,
//! side-effect-free, and usable in isolation from the pipeline.

mod correlation;
mod edge;
mod feature_distance;
mod ssim;

pub use correlation::cross_correlation;
pub use edge::{edge_mask, edge_overlap};
pub use feature_distance::{feature_distance, FeatureKind};
pub use ssim::ssim;

use crate::pipeline::ops;
use crate::pipeline::preprocess::GrayPatch;

/// Background value used when padding a patch onto a larger canvas.
pub(crate) const PAD_VALUE: f32 = 1.0;

/// Brings two patches to a shared canvas. The smaller patch is scaled up to
/// fit (aspect preserved) and centered with background padding; stretching
/// would distort the very geometry being compared.
pub(crate) fn fit_common_shape(a: &GrayPatch, b: &GrayPatch) -> (GrayPatch, GrayPatch) {
    let target_width = a.width.max(b.width);
    let target_height = a.height.max(b.height);
    (
        fit_onto(a, target_width, target_height),
        fit_onto(b, target_width, target_height),
    )
}

fn fit_onto(patch: &GrayPatch, target_width: usize, target_height: usize) -> GrayPatch {
    if patch.width == target_width && patch.height == target_height {
        return patch.clone();
    }
    if patch.is_empty() || target_width == 0 || target_height == 0 {
        return GrayPatch::new(
            target_width,
            target_height,
            vec![PAD_VALUE; target_width * target_height],
        );
    }
    let scale = (target_width as f32 / patch.width as f32)
        .min(target_height as f32 / patch.height as f32);
    let fitted_width = ((patch.width as f32 * scale).round() as usize)
        .clamp(1, target_width);
    let fitted_height = ((patch.height as f32 * scale).round() as usize)
        .clamp(1, target_height);
    let resized = if fitted_width == patch.width && fitted_height == patch.height {
        patch.pixels.clone()
    } else if fitted_width < patch.width {
        ops::resize_average(
            &patch.pixels,
            patch.width,
            patch.height,
            fitted_width,
            fitted_height,
        )
    } else {
        ops::resize_bilinear(
            &patch.pixels,
            patch.width,
            patch.height,
            fitted_width,
            fitted_height,
        )
    };

    let mut canvas = vec![PAD_VALUE; target_width * target_height];
    let offset_x = (target_width - fitted_width) / 2;
    let offset_y = (target_height - fitted_height) / 2;
    for y in 0..fitted_height {
        let src = y * fitted_width;
        let dst = (y + offset_y) * target_width + offset_x;
        canvas[dst..dst + fitted_width].copy_from_slice(&resized[src..src + fitted_width]);
    }
    GrayPatch::new(target_width, target_height, canvas)
}

/// Maps a similarity value in [-1, 1] to a percentage.
pub(crate) fn to_percentage(value: f32) -> f32 {
    (((value.clamp(-1.0, 1.0)) + 1.0) * 0.5 * 100.0).clamp(0.0, 100.0)
}
