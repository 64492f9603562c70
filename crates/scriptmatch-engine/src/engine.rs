//! Top-level comparison engine. Stateless per call: every operation decodes
//! its inputs fresh, computes, and returns owned results, so concurrent
//! comparisons need no locking.

use scriptmatch_types::{
    CompareResult, CompositeResult, CropOutput, CropRect, DisplaySize, LocalComparisonResult,
    OverlayTransform, SubScore, Verdict, CORRELATION, CURVATURE_MATCH, MACRO_GEOMETRY,
    STROKE_DISTRIBUTION, STRUCTURAL_SIMILARITY,
};

use crate::metrics::{cross_correlation, feature_distance, ssim, FeatureKind};
use crate::overlay;
use crate::pipeline::feature::{self, FeatureVector};
use crate::pipeline::preprocess::{self, NormalizedSpecimen, PreprocessSettings};
use crate::scorer::{self, ScoreConfig};
use crate::visualize;

const THUMBNAIL_EDGE: u32 = 150;
const HEATMAP_BLEND: f32 = 0.5;

#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    pub preprocess: PreprocessSettings,
    pub score: ScoreConfig,
}

#[derive(Debug)]
pub struct ComparisonEngine {
    config: EngineConfig,
}

impl ComparisonEngine {
    /// Validates the score configuration up front; a malformed weight table
    /// is a programming bug and fails here rather than skewing comparisons.
    pub fn new(config: EngineConfig) -> CompareResult<Self> {
        scorer::validate(&config.score)?;
        Ok(Self { config })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Full deterministic comparison of two encoded specimens. The AI
    /// enrichment is a caller concern layered on top of this result.
    pub fn compare(&self, questioned: &[u8], known: &[u8]) -> CompareResult<CompositeResult> {
        let settings = self.config.preprocess;
        let (questioned, known) = rayon::join(
            || preprocess::normalize(questioned, settings),
            || preprocess::normalize(known, settings),
        );
        let questioned = questioned?;
        let known = known?;

        let (questioned_features, known_features) = rayon::join(
            || feature::extract(&questioned),
            || feature::extract(&known),
        );

        let sub_scores = self.sub_scores(
            &questioned,
            &known,
            &questioned_features,
            &known_features,
        );
        let (composite_score, verdict) = scorer::compose(&sub_scores, &self.config.score)?;

        let (fitted_questioned, fitted_known) =
            crate::metrics::fit_common_shape(&questioned.gray, &known.gray);
        let heatmap =
            visualize::difference_heatmap(&fitted_questioned, &fitted_known, HEATMAP_BLEND);

        Ok(CompositeResult {
            composite_score,
            verdict,
            verdict_color: verdict.color(),
            sub_scores,
            difference_heatmap: visualize::encode_png_rgb(&heatmap)?,
            processed_questioned: visualize::encode_png_gray(&questioned.gray.to_luma())?,
            processed_known: visualize::encode_png_gray(&known.gray.to_luma())?,
            skeleton_questioned: visualize::encode_png_gray(&visualize::render_mask(
                &questioned.skeleton,
                questioned.width(),
                questioned.height(),
            ))?,
            skeleton_known: visualize::encode_png_gray(&visualize::render_mask(
                &known.skeleton,
                known.width(),
                known.height(),
            ))?,
            ai_analysis: None,
            ai_warning: None,
        })
    }

    fn sub_scores(
        &self,
        questioned: &NormalizedSpecimen,
        known: &NormalizedSpecimen,
        questioned_features: &FeatureVector,
        known_features: &FeatureVector,
    ) -> Vec<SubScore> {
        let macro_score =
            feature_distance(questioned_features, known_features, FeatureKind::MacroGeometry);
        let stroke_score = feature_distance(
            questioned_features,
            known_features,
            FeatureKind::StrokeDistribution,
        );
        let curvature_score =
            feature_distance(questioned_features, known_features, FeatureKind::Curvature);
        let ssim_score = ssim(&questioned.gray, &known.gray);
        let correlation_score = cross_correlation(&questioned.gray, &known.gray);

        vec![
            SubScore::new(
                MACRO_GEOMETRY,
                macro_score,
                format!(
                    "Slant: {:.1}\u{b0} vs {:.1}\u{b0}, letter ratio: {:.2} vs {:.2}",
                    questioned_features.slant_degrees,
                    known_features.slant_degrees,
                    questioned_features.size_ratio,
                    known_features.size_ratio,
                ),
            ),
            SubScore::new(
                STROKE_DISTRIBUTION,
                stroke_score,
                "Stroke width histogram similarity",
            ),
            SubScore::new(
                CURVATURE_MATCH,
                curvature_score,
                format!(
                    "Mean curvature: {:.3} vs {:.3}",
                    questioned_features.curvature_mean, known_features.curvature_mean,
                ),
            ),
            SubScore::new(
                STRUCTURAL_SIMILARITY,
                ssim_score,
                "Structural similarity of the normalized specimens",
            ),
            SubScore::new(
                CORRELATION,
                correlation_score,
                "Normalized cross-correlation of the normalized specimens",
            ),
        ]
    }

    /// Re-fuses an amended sub-score sequence, e.g. after the AI sub-score
    /// has been appended by the caller.
    pub fn rescore(&self, sub_scores: &[SubScore]) -> CompareResult<(f32, Verdict)> {
        scorer::compose(sub_scores, &self.config.score)
    }

    pub fn crop_region(
        &self,
        image: &[u8],
        rect: CropRect,
        display: DisplaySize,
    ) -> CompareResult<CropOutput> {
        overlay::crop(image, rect, display)
    }

    pub fn local_comparison(
        &self,
        base: &[u8],
        overlay_image: &[u8],
        transform: OverlayTransform,
    ) -> CompareResult<LocalComparisonResult> {
        overlay::local_compare(base, overlay_image, transform)
    }

    pub fn thumbnail(&self, image: &[u8]) -> CompareResult<Vec<u8>> {
        visualize::thumbnail(image, THUMBNAIL_EDGE)
    }
}
