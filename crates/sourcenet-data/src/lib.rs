//! # SourceNet-Data
//!
//! Turns the raw event table into fixed-shape training data: CSV
//! ingestion with schema validation, grouping by source identity, feature
//! and label scaling, pad/truncate tensorization, and the seeded
//! group-level train/validation/test split.

pub mod pipeline;
pub mod reader;
pub mod scaling;
pub mod split;
pub mod tensorize;

pub use pipeline::*;
pub use reader::*;
pub use scaling::*;
pub use split::*;
pub use tensorize::*;
