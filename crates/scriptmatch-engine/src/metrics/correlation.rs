use crate::metrics::{fit_common_shape, to_percentage};
use crate::pipeline::preprocess::GrayPatch;

const VARIANCE_GUARD: f32 = 1e-8;

/// Normalized cross-correlation coefficient between two grayscale patches,
/// rescaled to a percentage. Symmetric in its arguments.
pub fn cross_correlation(a: &GrayPatch, b: &GrayPatch) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (a, b) = fit_common_shape(a, b);
    let len = a.len() as f64;

    let mean_a = a.pixels.iter().map(|&v| v as f64).sum::<f64>() / len;
    let mean_b = b.pixels.iter().map(|&v| v as f64).sum::<f64>() / len;

    let mut var_a = 0.0f64;
    let mut var_b = 0.0f64;
    let mut cov = 0.0f64;
    for (&pa, &pb) in a.pixels.iter().zip(b.pixels.iter()) {
        let da = pa as f64 - mean_a;
        let db = pb as f64 - mean_b;
        var_a += da * da;
        var_b += db * db;
        cov += da * db;
    }
    let std_a = (var_a / len).sqrt();
    let std_b = (var_b / len).sqrt();
    let r = (cov / len) / ((std_a + VARIANCE_GUARD as f64) * (std_b + VARIANCE_GUARD as f64));
    to_percentage(r as f32)
}
