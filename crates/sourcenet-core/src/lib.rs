//! # SourceNet-Core
//!
//! Core types and configuration for the SourceNet gamma-source
//! localization pipeline: detector event records, source groups, the
//! fixed-shape tensor contract, and the error taxonomy shared by every
//! other crate in the workspace.

pub mod config;
pub mod error;
pub mod types;

pub use config::*;
pub use error::{Error, Result};
pub use types::*;
