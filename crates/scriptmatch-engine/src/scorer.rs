//! Fuses the ordered sub-score sequence into one composite percentage and a
//! categorical verdict. Weights and thresholds live in one table here; they
//! are configuration, not logic scattered through the pipeline.

use scriptmatch_types::{
    AI_DEEP_ANALYSIS, CompareError, CompareResult, CORRELATION, CURVATURE_MATCH, MACRO_GEOMETRY,
    STROKE_DISTRIBUTION, STRUCTURAL_SIMILARITY, SubScore, Verdict,
};

/// Display order of the deterministic sub-scores. The engine emits them in
/// exactly this order.
pub const SUB_SCORE_ORDER: [&str; 5] = [
    MACRO_GEOMETRY,
    STROKE_DISTRIBUTION,
    CURVATURE_MATCH,
    STRUCTURAL_SIMILARITY,
    CORRELATION,
];

/// Default weight table, v1. Keyed by sub-score name; sums to 1.0.
pub const DEFAULT_WEIGHTS: [(&str, f32); 5] = [
    (MACRO_GEOMETRY, 0.30),
    (STROKE_DISTRIBUTION, 0.20),
    (CURVATURE_MATCH, 0.15),
    (STRUCTURAL_SIMILARITY, 0.20),
    (CORRELATION, 0.15),
];

pub const DEFAULT_MATCH_THRESHOLD: f32 = 88.0;
pub const DEFAULT_INCONCLUSIVE_THRESHOLD: f32 = 70.0;

/// Share of the composite taken by the AI opinion when it is explicitly
/// weighted in; the deterministic weights scale down proportionally.
pub const DEFAULT_AI_WEIGHT: f32 = 0.35;

const WEIGHT_SUM_TOLERANCE: f32 = 1e-3;

#[derive(Clone, Debug)]
pub struct ScoreConfig {
    pub weights: Vec<(String, f32)>,
    pub match_threshold: f32,
    pub inconclusive_threshold: f32,
    /// When false (the default) the AI opinion is advisory text only and is
    /// excluded from the composite average.
    pub include_ai: bool,
    pub ai_weight: f32,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS
                .iter()
                .map(|(name, weight)| (name.to_string(), *weight))
                .collect(),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            inconclusive_threshold: DEFAULT_INCONCLUSIVE_THRESHOLD,
            include_ai: false,
            ai_weight: DEFAULT_AI_WEIGHT,
        }
    }
}

impl ScoreConfig {
    fn weight_for(&self, name: &str) -> Option<f32> {
        self.weights
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, weight)| *weight)
    }
}

/// Validates a weight/threshold table. Called once at engine construction so
/// a bad configuration fails fast instead of skewing every comparison.
pub fn validate(config: &ScoreConfig) -> CompareResult<()> {
    if config.weights.is_empty() {
        return Err(CompareError::configuration("weight table is empty"));
    }
    for (name, weight) in &config.weights {
        if name.trim().is_empty() {
            return Err(CompareError::configuration("weight table has an unnamed entry"));
        }
        if !weight.is_finite() || *weight < 0.0 {
            return Err(CompareError::configuration(format!(
                "weight for '{name}' is invalid: {weight}"
            )));
        }
    }
    let sum: f32 = config.weights.iter().map(|(_, weight)| weight).sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(CompareError::configuration(format!(
            "weights sum to {sum:.4}, expected 1.0"
        )));
    }
    if !(0.0..=100.0).contains(&config.match_threshold)
        || !(0.0..=100.0).contains(&config.inconclusive_threshold)
        || config.inconclusive_threshold > config.match_threshold
    {
        return Err(CompareError::configuration(format!(
            "verdict thresholds {:.1}/{:.1} are out of order",
            config.match_threshold, config.inconclusive_threshold
        )));
    }
    if config.include_ai && !(0.0..1.0).contains(&config.ai_weight) {
        return Err(CompareError::configuration(format!(
            "ai weight {} must be in [0, 1)",
            config.ai_weight
        )));
    }
    Ok(())
}

pub fn classify(score: f32, config: &ScoreConfig) -> Verdict {
    if score >= config.match_threshold {
        Verdict::MatchLikely
    } else if score >= config.inconclusive_threshold {
        Verdict::Inconclusive
    } else {
        Verdict::MatchUnlikely
    }
}

/// Weighted fusion of an ordered sub-score sequence. The AI sub-score is
/// skipped unless the configuration explicitly weights it in; every other
/// sub-score must have a weight table entry.
pub fn compose(sub_scores: &[SubScore], config: &ScoreConfig) -> CompareResult<(f32, Verdict)> {
    if sub_scores.is_empty() {
        return Err(CompareError::configuration(
            "cannot compose an empty sub-score sequence",
        ));
    }

    let ai_score = sub_scores
        .iter()
        .find(|sub| sub.name == AI_DEEP_ANALYSIS)
        .map(|sub| sub.score);
    let ai_share = if config.include_ai && ai_score.is_some() {
        config.ai_weight
    } else {
        0.0
    };
    let base_scale = 1.0 - ai_share;

    let mut weighted = 0.0f32;
    let mut total_weight = 0.0f32;
    for sub in sub_scores {
        if sub.name == AI_DEEP_ANALYSIS {
            continue;
        }
        let weight = config.weight_for(sub.name).ok_or_else(|| {
            CompareError::configuration(format!("no weight configured for sub-score '{}'", sub.name))
        })? * base_scale;
        weighted += sub.score * weight;
        total_weight += weight;
    }
    if let (Some(score), true) = (ai_score, ai_share > 0.0) {
        weighted += score * ai_share;
        total_weight += ai_share;
    }
    if total_weight <= f32::EPSILON {
        return Err(CompareError::configuration(
            "sub-score sequence matched no configured weights",
        ));
    }

    let composite = (weighted / total_weight).clamp(0.0, 100.0);
    Ok((composite, classify(composite, config)))
}
