//! # SourceNet-CLI
//!
//! End-to-end run composition: prepare the dataset, train, predict the
//! test partition, inverse-scale, evaluate, and emit the report.

pub mod pipeline;

pub use pipeline::*;
