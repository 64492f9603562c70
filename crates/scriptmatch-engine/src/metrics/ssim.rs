use crate::metrics::{fit_common_shape, to_percentage};
use crate::pipeline::preprocess::GrayPatch;

const WINDOW: usize = 7;
// Window stride: dense enough to cover every stroke, sparse enough to stay
// inside interactive latency for canonical-size images.
const STEP: usize = 3;
const C1: f32 = 0.01 * 0.01;
const C2: f32 = 0.03 * 0.03;

/// Structural similarity between two grayscale patches, as a percentage.
/// Patches of different sizes are fitted to a common shape first. Symmetric:
/// `ssim(a, b) == ssim(b, a)`.
pub fn ssim(a: &GrayPatch, b: &GrayPatch) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (a, b) = fit_common_shape(a, b);
    let width = a.width;
    let height = a.height;
    if width < WINDOW || height < WINDOW {
        return to_percentage(window_ssim(&a.pixels, &b.pixels, width, 0, 0, width, height));
    }

    let mut total = 0.0f64;
    let mut windows = 0usize;
    let mut y = 0;
    while y + WINDOW <= height {
        let mut x = 0;
        while x + WINDOW <= width {
            total += window_ssim(&a.pixels, &b.pixels, width, x, y, WINDOW, WINDOW) as f64;
            windows += 1;
            x += STEP;
        }
        y += STEP;
    }
    if windows == 0 {
        return 0.0;
    }
    to_percentage((total / windows as f64) as f32)
}

fn window_ssim(
    a: &[f32],
    b: &[f32],
    stride: usize,
    x0: usize,
    y0: usize,
    win_w: usize,
    win_h: usize,
) -> f32 {
    let len = (win_w * win_h) as f32;
    if len <= 0.0 {
        return 0.0;
    }
    let mut sum_a = 0.0f32;
    let mut sum_b = 0.0f32;
    for y in y0..y0 + win_h {
        let row = y * stride;
        for x in x0..x0 + win_w {
            sum_a += a[row + x];
            sum_b += b[row + x];
        }
    }
    let mean_a = sum_a / len;
    let mean_b = sum_b / len;

    let mut var_a = 0.0f32;
    let mut var_b = 0.0f32;
    let mut cov = 0.0f32;
    for y in y0..y0 + win_h {
        let row = y * stride;
        for x in x0..x0 + win_w {
            let da = a[row + x] - mean_a;
            let db = b[row + x] - mean_b;
            var_a += da * da;
            var_b += db * db;
            cov += da * db;
        }
    }
    let denom = (win_w * win_h).saturating_sub(1).max(1) as f32;
    var_a /= denom;
    var_b /= denom;
    cov /= denom;

    let numerator = (2.0 * mean_a * mean_b + C1) * (2.0 * cov + C2);
    // C1 and C2 keep the denominator strictly positive.
    let denominator = (mean_a * mean_a + mean_b * mean_b + C1) * (var_a + var_b + C2);
    if denominator <= 0.0 {
        return 0.0;
    }
    (numerator / denominator).clamp(-1.0, 1.0)
}
