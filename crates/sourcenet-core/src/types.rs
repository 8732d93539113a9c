//! Fundamental types for the SourceNet pipeline.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Fixed number of event rows every tensor is padded/truncated to.
pub const EVENT_COUNT: usize = 3000;

/// Number of numeric features per detector event.
pub const FEATURE_COUNT: usize = 6;

/// Side length of the reconstruction heatmaps used for image metrics.
pub const HEATMAP_SIZE: usize = 256;

/// One detector hit: Compton scatter position/energy followed by the
/// absorption position/energy. Missing table cells arrive as NaN and are
/// substituted with zero during scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub scatter_x: f64,
    pub scatter_y: f64,
    pub energy: f64,
    pub absorb_x: f64,
    pub absorb_y: f64,
    pub energy_abs: f64,
}

impl EventRecord {
    /// The six numeric features in canonical column order.
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.scatter_x,
            self.scatter_y,
            self.energy,
            self.absorb_x,
            self.absorb_y,
            self.energy_abs,
        ]
    }
}

/// The 2-D origin coordinate being predicted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourcePosition {
    pub x: f64,
    pub y: f64,
}

impl SourcePosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Planar Euclidean distance to another position, in physical units.
    pub fn distance_to(&self, other: &SourcePosition) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Grouping key for source identity. Equality is bitwise on the
/// coordinate pair so that every distinct (x, y) in the table maps to
/// exactly one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceKey {
    x_bits: u64,
    y_bits: u64,
}

impl From<SourcePosition> for SourceKey {
    fn from(pos: SourcePosition) -> Self {
        Self {
            x_bits: pos.x.to_bits(),
            y_bits: pos.y.to_bits(),
        }
    }
}

/// One source and its ordered sequence of detector events. Row order is
/// preserved exactly as read from the input table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceGroup {
    pub source: SourcePosition,
    pub events: Vec<EventRecord>,
}

impl SourceGroup {
    pub fn new(source: SourcePosition) -> Self {
        Self {
            source,
            events: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Raw (rows, 6) feature matrix in table order.
    pub fn feature_matrix(&self) -> Array2<f64> {
        let mut m = Array2::zeros((self.events.len(), FEATURE_COUNT));
        for (i, event) in self.events.iter().enumerate() {
            for (j, v) in event.features().into_iter().enumerate() {
                m[[i, j]] = v;
            }
        }
        m
    }
}

/// A scaled feature matrix locked to exactly (EVENT_COUNT, FEATURE_COUNT).
///
/// Construction is the only place the shape contract is enforced; once a
/// value of this type exists the model may rely on the shape blindly.
#[derive(Debug, Clone)]
pub struct FixedEventTensor {
    data: Array2<f32>,
}

impl FixedEventTensor {
    pub fn new(data: Array2<f32>) -> Result<Self> {
        let (rows, cols) = data.dim();
        if rows != EVENT_COUNT || cols != FEATURE_COUNT {
            return Err(Error::Shape {
                expected_rows: EVENT_COUNT,
                expected_cols: FEATURE_COUNT,
                rows,
                cols,
            });
        }
        Ok(Self { data })
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    /// Feature-major storage, (FEATURE_COUNT, EVENT_COUNT) row-major, the
    /// layout the network's Conv1d input expects.
    pub fn to_channels_first(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(FEATURE_COUNT * EVENT_COUNT);
        for c in 0..FEATURE_COUNT {
            for r in 0..EVENT_COUNT {
                out.push(self.data[[r, c]]);
            }
        }
        out
    }
}

/// One fully prepared sample: fixed tensor, model-space label, and the
/// physical source position it came from.
#[derive(Debug, Clone)]
pub struct Sample {
    pub tensor: FixedEventTensor,
    pub label: [f32; 2],
    pub source: SourcePosition,
}
