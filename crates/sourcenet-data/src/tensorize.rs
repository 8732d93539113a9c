//! Fixed-shape tensorization.
//!
//! Every source group becomes exactly (EVENT_COUNT, FEATURE_COUNT): short
//! groups are zero-padded at the end, long groups keep only their first
//! EVENT_COUNT rows. No resampling, no reordering. An empty group yields
//! an all-zero tensor, which is accepted behavior.

use ndarray::Array2;

use sourcenet_core::{
    Error, FixedEventTensor, Result, EVENT_COUNT, FEATURE_COUNT,
};

/// Pad/truncate one scaled feature matrix to the fixed contract.
pub fn to_fixed_tensor(scaled: &Array2<f32>) -> Result<FixedEventTensor> {
    let (rows, cols) = scaled.dim();
    if rows > 0 && cols != FEATURE_COUNT {
        return Err(Error::Shape {
            expected_rows: EVENT_COUNT,
            expected_cols: FEATURE_COUNT,
            rows,
            cols,
        });
    }

    let mut fixed = Array2::zeros((EVENT_COUNT, FEATURE_COUNT));
    let keep = rows.min(EVENT_COUNT);
    for r in 0..keep {
        for c in 0..FEATURE_COUNT {
            let v = scaled[[r, c]];
            // The scaler scrubs NaN before fitting; a NaN here would be an
            // upstream bug, still never allowed to reach the model.
            fixed[[r, c]] = if v.is_finite() { v } else { 0.0 };
        }
    }

    FixedEventTensor::new(fixed)
}
