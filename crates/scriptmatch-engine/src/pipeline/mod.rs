pub mod feature;
pub mod ops;
pub mod preprocess;

pub use feature::{FeatureVector, STROKE_BINS};
pub use preprocess::{GrayPatch, NormalizedSpecimen, PreprocessSettings};
