use crate::pipeline::feature::FeatureVector;

/// Saturation points: a difference at or beyond these floors the score at 0.
const SLANT_SATURATION_DEGREES: f32 = 30.0;
const RATIO_SATURATION: f32 = 0.5;
const SPACING_SATURATION: f32 = 0.2;
const CURVATURE_SATURATION: f32 = 0.5;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FeatureKind {
    MacroGeometry,
    StrokeDistribution,
    Curvature,
}

/// Compares one facet of two feature vectors, returning a percentage. A
/// specimen without ink degrades every facet to 0 rather than erroring.
pub fn feature_distance(a: &FeatureVector, b: &FeatureVector, kind: FeatureKind) -> f32 {
    if !a.has_ink() || !b.has_ink() {
        return 0.0;
    }
    match kind {
        FeatureKind::MacroGeometry => macro_geometry(a, b),
        FeatureKind::StrokeDistribution => bhattacharyya(&a.stroke_widths, &b.stroke_widths),
        FeatureKind::Curvature => curvature(a, b),
    }
}

fn macro_geometry(a: &FeatureVector, b: &FeatureVector) -> f32 {
    let slant = bounded_score(slant_delta(a.slant_degrees, b.slant_degrees), SLANT_SATURATION_DEGREES);
    let ratio = bounded_score((a.size_ratio - b.size_ratio).abs(), RATIO_SATURATION);
    let spacing = bounded_score((a.line_spacing - b.line_spacing).abs(), SPACING_SATURATION);
    (slant + ratio + spacing) / 3.0 * 100.0
}

fn curvature(a: &FeatureVector, b: &FeatureVector) -> f32 {
    let mean = bounded_score((a.curvature_mean - b.curvature_mean).abs(), CURVATURE_SATURATION);
    let std = bounded_score((a.curvature_std - b.curvature_std).abs(), CURVATURE_SATURATION);
    (mean + std) / 2.0 * 100.0
}

/// Slant is axial: -89 and +89 degrees are two degrees apart, not 178.
fn slant_delta(a: f32, b: f32) -> f32 {
    let diff = (a - b).abs() % 180.0;
    diff.min(180.0 - diff)
}

fn bounded_score(delta: f32, saturation: f32) -> f32 {
    (1.0 - delta / saturation).clamp(0.0, 1.0)
}

/// Bhattacharyya coefficient between two density histograms, as a
/// percentage. 100 means identical distributions.
fn bhattacharyya(a: &[f32], b: &[f32]) -> f32 {
    let sum_a: f32 = a.iter().sum();
    let sum_b: f32 = b.iter().sum();
    if sum_a <= f32::EPSILON || sum_b <= f32::EPSILON {
        return 0.0;
    }
    let coefficient: f32 = a
        .iter()
        .zip(b.iter())
        .map(|(&pa, &pb)| ((pa / sum_a) * (pb / sum_b)).max(0.0).sqrt())
        .sum();
    (coefficient * 100.0).clamp(0.0, 100.0)
}
