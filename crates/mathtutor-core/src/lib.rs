//! mathtutor-core: Quiz evaluation, math detection, and mastery scoring.
//!
//! This crate defines the quiz data model, the answer evaluator, the math
//! text classifier and normaliser, and the mastery update rules that the
//! rest of mathtutor builds on.

pub mod error;
pub mod evaluate;
pub mod mastery;
pub mod math;
pub mod model;
pub mod parser;
pub mod report;
pub mod statistics;
pub mod traits;
