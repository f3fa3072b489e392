//! Math text handling: detection of math in free text and normalisation of
//! worded expressions into LaTeX-like notation.

pub mod detect;
pub mod normalize;
pub mod numbers;

pub use detect::{is_likely_math, DetectionConfig, MathDetector, MathSignal};
pub use normalize::{normalize_to_latex, Normalized};
