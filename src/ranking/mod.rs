//! Value-added ranking stage.
//!
//! Fits log earnings on standardized student-body characteristics with
//! seeded k-fold cross-validation, scores every school by its standardized
//! residual, and bands the score into a 1–5 rating.

pub mod aggregate;
pub mod analyzer;
pub mod folds;
pub mod grade;
pub mod model;
pub mod types;
