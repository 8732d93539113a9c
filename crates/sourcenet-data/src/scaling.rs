//! Feature and label scaling.
//!
//! Two feature policies are supported: per-group standardization (each
//! group fitted independently to zero mean / unit variance) and a single
//! global min-max transform into [-1, 1]. NaN cells are substituted with
//! zero before any statistics are computed. Label scaling keeps its
//! fitted parameters so predictions can be mapped back to physical
//! coordinates at evaluation time; the inverse is never re-fit.

use ndarray::{Array2, Axis};

use sourcenet_core::{
    FeatureScaling, LabelPolicy, SourceGroup, SourcePosition, FEATURE_COUNT,
};

/// Replace NaN with zero, in place.
pub fn scrub_nan(matrix: &mut Array2<f64>) {
    for v in matrix.iter_mut() {
        if v.is_nan() {
            *v = 0.0;
        }
    }
}

/// Per-column affine parameters of a fitted feature transform.
#[derive(Debug, Clone)]
pub struct FittedFeatureScaler {
    /// Subtracted per column before dividing
    offset: [f64; FEATURE_COUNT],
    /// Divisor per column; zero marks a degenerate (constant) column
    scale: [f64; FEATURE_COUNT],
    /// Added after dividing (min-max shifts into [-1, 1])
    shift: [f64; FEATURE_COUNT],
}

impl FittedFeatureScaler {
    /// Zero-mean / unit-variance fit over one matrix.
    pub fn fit_standard(matrix: &Array2<f64>) -> Self {
        let rows = matrix.nrows().max(1) as f64;
        let mut offset = [0.0; FEATURE_COUNT];
        let mut scale = [0.0; FEATURE_COUNT];

        for (c, col) in matrix.axis_iter(Axis(1)).enumerate() {
            let mean = col.sum() / rows;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / rows;
            offset[c] = mean;
            scale[c] = var.sqrt();
        }

        Self {
            offset,
            scale,
            shift: [0.0; FEATURE_COUNT],
        }
    }

    /// Affine [-1, 1] min-max fit over one matrix.
    pub fn fit_minmax(matrix: &Array2<f64>) -> Self {
        let mut offset = [0.0; FEATURE_COUNT];
        let mut scale = [0.0; FEATURE_COUNT];
        let mut shift = [0.0; FEATURE_COUNT];

        for (c, col) in matrix.axis_iter(Axis(1)).enumerate() {
            let min = col.iter().copied().fold(f64::INFINITY, f64::min);
            let max = col.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if min.is_finite() && max.is_finite() && max > min {
                offset[c] = min;
                scale[c] = (max - min) / 2.0;
                shift[c] = -1.0;
            }
        }

        Self {
            offset,
            scale,
            shift,
        }
    }

    /// Apply the fitted transform; degenerate columns map to zero.
    pub fn transform(&self, matrix: &Array2<f64>) -> Array2<f32> {
        let (rows, cols) = matrix.dim();
        let mut out = Array2::zeros((rows, cols));
        for r in 0..rows {
            for c in 0..cols {
                out[[r, c]] = if self.scale[c] > 0.0 {
                    ((matrix[[r, c]] - self.offset[c]) / self.scale[c] + self.shift[c]) as f32
                } else {
                    0.0
                };
            }
        }
        out
    }
}

/// Scale every group's feature matrix under the configured policy.
///
/// Per-group standardization fits each group independently; global
/// min-max fits once over all rows and applies the same transform to
/// every group. Output order matches input order.
pub fn scale_groups(groups: &[SourceGroup], policy: FeatureScaling) -> Vec<Array2<f32>> {
    match policy {
        FeatureScaling::PerGroupStandard => groups
            .iter()
            .map(|g| {
                let mut m = g.feature_matrix();
                scrub_nan(&mut m);
                FittedFeatureScaler::fit_standard(&m).transform(&m)
            })
            .collect(),
        FeatureScaling::GlobalMinMax => {
            let total_rows: usize = groups.iter().map(|g| g.len()).sum();
            let mut all = Array2::zeros((total_rows, FEATURE_COUNT));
            let mut offset = 0;
            for g in groups {
                let mut m = g.feature_matrix();
                scrub_nan(&mut m);
                for r in 0..m.nrows() {
                    for c in 0..FEATURE_COUNT {
                        all[[offset + r, c]] = m[[r, c]];
                    }
                }
                offset += m.nrows();
            }

            let scaler = FittedFeatureScaler::fit_minmax(&all);
            groups
                .iter()
                .map(|g| {
                    let mut m = g.feature_matrix();
                    scrub_nan(&mut m);
                    scaler.transform(&m)
                })
                .collect()
        }
    }
}

/// Fitted label transform with a retained inverse.
#[derive(Debug, Clone, Copy)]
pub struct LabelScaler {
    min: [f64; 2],
    range: [f64; 2],
}

impl LabelScaler {
    /// Fit under the configured policy over all labels jointly.
    pub fn fit(positions: &[SourcePosition], policy: LabelPolicy) -> Self {
        match policy {
            LabelPolicy::FixedDomain { bound } => Self {
                min: [0.0; 2],
                range: [bound; 2],
            },
            LabelPolicy::FittedMinMax => {
                let mut min = [f64::INFINITY; 2];
                let mut max = [f64::NEG_INFINITY; 2];
                for p in positions {
                    for (i, v) in [p.x, p.y].into_iter().enumerate() {
                        min[i] = min[i].min(v);
                        max[i] = max[i].max(v);
                    }
                }
                let mut range = [0.0; 2];
                for i in 0..2 {
                    if !min[i].is_finite() {
                        min[i] = 0.0;
                    }
                    range[i] = if max[i] > min[i] { max[i] - min[i] } else { 1.0 };
                }
                Self { min, range }
            }
        }
    }

    /// Physical coordinates to model space.
    pub fn transform(&self, pos: &SourcePosition) -> [f32; 2] {
        [
            ((pos.x - self.min[0]) / self.range[0]) as f32,
            ((pos.y - self.min[1]) / self.range[1]) as f32,
        ]
    }

    /// Model space back to physical coordinates.
    pub fn inverse(&self, label: [f32; 2]) -> SourcePosition {
        SourcePosition::new(
            label[0] as f64 * self.range[0] + self.min[0],
            label[1] as f64 * self.range[1] + self.min[1],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use sourcenet_core::EventRecord;

    fn group_with(rows: &[[f64; 6]]) -> SourceGroup {
        let mut g = SourceGroup::new(SourcePosition::new(0.0, 0.0));
        for r in rows {
            g.events.push(EventRecord {
                scatter_x: r[0],
                scatter_y: r[1],
                energy: r[2],
                absorb_x: r[3],
                absorb_y: r[4],
                energy_abs: r[5],
            });
        }
        g
    }

    #[test]
    fn standard_fit_centers_and_scales() {
        let m = array![
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [3.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        ];
        let scaled = FittedFeatureScaler::fit_standard(&m).transform(&m);

        // column 0: mean 2, std 1 -> [-1, 1]
        assert!((scaled[[0, 0]] + 1.0).abs() < 1e-6);
        assert!((scaled[[1, 0]] - 1.0).abs() < 1e-6);
        // constant columns scale to zero, not NaN
        assert_eq!(scaled[[0, 1]], 0.0);
    }

    #[test]
    fn minmax_fit_lands_in_unit_interval() {
        let m = array![
            [0.0, 5.0, 0.0, 0.0, 0.0, 0.0],
            [10.0, 15.0, 0.0, 0.0, 0.0, 0.0],
            [5.0, 10.0, 0.0, 0.0, 0.0, 0.0]
        ];
        let scaled = FittedFeatureScaler::fit_minmax(&m).transform(&m);

        for v in scaled.iter() {
            assert!(*v >= -1.0 && *v <= 1.0);
        }
        assert!((scaled[[0, 0]] + 1.0).abs() < 1e-6);
        assert!((scaled[[1, 0]] - 1.0).abs() < 1e-6);
        assert!(scaled[[2, 0]].abs() < 1e-6);
    }

    #[test]
    fn nan_is_scrubbed_before_fitting() {
        let g = group_with(&[[1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0]]);
        let scaled = scale_groups(&[g], FeatureScaling::PerGroupStandard);
        assert!(scaled[0].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn global_minmax_shares_one_fit() {
        let a = group_with(&[[0.0, 0.0, 0.0, 0.0, 0.0, 0.0]]);
        let b = group_with(&[[10.0, 0.0, 0.0, 0.0, 0.0, 0.0]]);
        let scaled = scale_groups(&[a, b], FeatureScaling::GlobalMinMax);

        // with one shared fit, the two rows land at the interval ends
        assert!((scaled[0][[0, 0]] + 1.0).abs() < 1e-6);
        assert!((scaled[1][[0, 0]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn label_round_trip_within_tolerance() {
        let positions = vec![
            SourcePosition::new(12.5, 200.0),
            SourcePosition::new(87.0, 15.25),
            SourcePosition::new(254.0, 100.0),
        ];
        let scaler = LabelScaler::fit(&positions, LabelPolicy::FittedMinMax);

        for p in &positions {
            let back = scaler.inverse(scaler.transform(p));
            assert!((back.x - p.x).abs() < 1e-5);
            assert!((back.y - p.y).abs() < 1e-5);
        }
    }

    #[test]
    fn fixed_domain_divides_by_bound() {
        let scaler = LabelScaler::fit(&[], LabelPolicy::FixedDomain { bound: 255.0 });
        let label = scaler.transform(&SourcePosition::new(255.0, 127.5));
        assert!((label[0] - 1.0).abs() < 1e-6);
        assert!((label[1] - 0.5).abs() < 1e-6);

        let back = scaler.inverse(label);
        assert!((back.x - 255.0).abs() < 1e-4);
    }
}
