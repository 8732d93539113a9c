//! # SourceNet-Eval
//!
//! Prediction quality assessment: smoothed single-point heatmaps, SSIM
//! and pixel-error metrics between reconstructed true/predicted images,
//! Euclidean error in physical units, and the report sink that turns a
//! finished run into figures and a text summary without ever letting an
//! artifact failure abort the numeric results.

pub mod heatmap;
pub mod metrics;
pub mod report;

pub use heatmap::*;
pub use metrics::*;
pub use report::*;
