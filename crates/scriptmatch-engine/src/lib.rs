//! Deterministic handwriting comparison engine with flat, easy-to-import modules.

pub mod engine;
pub mod geometry;
pub mod metrics;
pub mod overlay;
pub mod pipeline;
pub mod scorer;
pub mod visualize;

pub use engine::{ComparisonEngine, EngineConfig};
pub use pipeline::{FeatureVector, GrayPatch, NormalizedSpecimen, PreprocessSettings};
pub use scorer::ScoreConfig;

#[cfg(test)]
mod tests;
