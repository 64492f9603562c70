//! Shared domain models for the scriptmatch workspace.
//!
//! This crate centralizes lightweight data structures used across the engine,
//! analysis, and CLI crates. Keep it backend-agnostic and free of image or
//! networking dependencies so every crate can depend on it cheaply.

use serde::Serialize;
use thiserror::Error;

pub type CompareResult<T> = Result<T, CompareError>;

/// Stable sub-score names. The weight table and the UI ordering are keyed by
/// these exact strings.
pub const MACRO_GEOMETRY: &str = "Macro Geometry";
pub const STROKE_DISTRIBUTION: &str = "Stroke Distribution";
pub const CURVATURE_MATCH: &str = "Curvature Match";
pub const STRUCTURAL_SIMILARITY: &str = "Structural Similarity";
pub const CORRELATION: &str = "Correlation";
pub const AI_DEEP_ANALYSIS: &str = "AI Deep Analysis";

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("failed to decode image: {reason}")]
    ImageDecode { reason: String },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("invalid geometry: {message}")]
    Geometry { message: String },

    #[error("analysis service failed: {message}")]
    ExternalService { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompareError {
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::ImageDecode {
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn geometry(message: impl Into<String>) -> Self {
        Self::Geometry {
            message: message.into(),
        }
    }

    pub fn external_service(message: impl Into<String>) -> Self {
        Self::ExternalService {
            message: message.into(),
        }
    }
}

/// One named component of a comparison, already rescaled to a percentage.
#[derive(Debug, Clone, Serialize)]
pub struct SubScore {
    pub name: &'static str,
    pub score: f32,
    pub description: String,
}

impl SubScore {
    pub fn new(name: &'static str, score: f32, description: impl Into<String>) -> Self {
        Self {
            name,
            score: score.clamp(0.0, 100.0),
            description: description.into(),
        }
    }
}

/// Categorical classification of a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    MatchLikely,
    Inconclusive,
    MatchUnlikely,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::MatchLikely => "High probability same writer",
            Verdict::Inconclusive => "Possible / Inconclusive",
            Verdict::MatchUnlikely => "Likely different writers",
        }
    }

    /// Display color associated with the verdict tier.
    pub fn color(&self) -> &'static str {
        match self {
            Verdict::MatchLikely => "#22c55e",
            Verdict::Inconclusive => "#f59e0b",
            Verdict::MatchUnlikely => "#ef4444",
        }
    }
}

/// Full outcome of a two-specimen comparison. Encoded image buffers are
/// written out as files by the caller and skipped during serialization.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeResult {
    pub composite_score: f32,
    pub verdict: Verdict,
    pub verdict_color: &'static str,
    pub sub_scores: Vec<SubScore>,
    #[serde(skip_serializing)]
    pub difference_heatmap: Vec<u8>,
    #[serde(skip_serializing)]
    pub processed_questioned: Vec<u8>,
    #[serde(skip_serializing)]
    pub processed_known: Vec<u8>,
    #[serde(skip_serializing)]
    pub skeleton_questioned: Vec<u8>,
    #[serde(skip_serializing)]
    pub skeleton_known: Vec<u8>,
    pub ai_analysis: Option<String>,
    pub ai_warning: Option<String>,
}

/// Rectangle in display coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Size of the displayed (possibly letterboxed) rendition of an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    pub width: f32,
    pub height: f32,
}

pub const MIN_OVERLAY_SCALE: f32 = 0.25;
pub const MAX_OVERLAY_SCALE: f32 = 3.0;
pub const MIN_OVERLAY_ALPHA: f32 = 0.1;
pub const MAX_OVERLAY_ALPHA: f32 = 1.0;

/// Snapshot of the user-adjusted overlay state. The engine only ever reads a
/// clamped copy; the UI owns the live value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayTransform {
    pub translate_x: f32,
    pub translate_y: f32,
    pub scale: f32,
    pub rotation_degrees: f32,
    pub alpha: f32,
}

impl OverlayTransform {
    pub fn clamped(self) -> Self {
        let mut rotation = self.rotation_degrees;
        if !rotation.is_finite() {
            rotation = 0.0;
        }
        Self {
            translate_x: self.translate_x,
            translate_y: self.translate_y,
            scale: self.scale.clamp(MIN_OVERLAY_SCALE, MAX_OVERLAY_SCALE),
            rotation_degrees: rotation.clamp(-180.0, 180.0),
            alpha: self.alpha.clamp(MIN_OVERLAY_ALPHA, MAX_OVERLAY_ALPHA),
        }
    }
}

impl Default for OverlayTransform {
    fn default() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            scale: 1.0,
            rotation_degrees: 0.0,
            alpha: 1.0,
        }
    }
}

/// Outcome of a region-of-interest comparison.
#[derive(Debug, Clone, Serialize)]
pub struct LocalComparisonResult {
    pub local_ssim: f32,
    pub edge_overlap: f32,
    #[serde(skip_serializing)]
    pub difference_heatmap: Vec<u8>,
    #[serde(skip_serializing)]
    pub edge_visualization: Vec<u8>,
    pub region_width: u32,
    pub region_height: u32,
}

/// Cropped region rendered both with and without an alpha channel. The solid
/// fallback exists for display surfaces without alpha support.
#[derive(Debug, Clone)]
pub struct CropOutput {
    pub transparent_png: Vec<u8>,
    pub solid_png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub origin_x: u32,
    pub origin_y: u32,
}
