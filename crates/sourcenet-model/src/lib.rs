//! # SourceNet-Model
//!
//! The regression network and its training loop: convolutional feature
//! extraction along the event axis, bidirectional recurrent aggregation,
//! dense regression heads, a weighted composite loss, pluggable
//! learning-rate policies, and early stopping with best-checkpoint
//! rollback.

pub mod loss;
pub mod network;
pub mod schedule;
pub mod trainer;

pub use loss::*;
pub use network::*;
pub use schedule::*;
pub use trainer::*;
