//! Evaluation metrics.
//!
//! Image metrics (SSIM, pixel MSE/MAE) are computed between the smoothed
//! true/predicted heatmaps; the Euclidean error is computed directly on
//! physical coordinates and is independent of the image pipeline.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use sourcenet_core::SourcePosition;

use crate::heatmap::{gaussian_blur, render_point_heatmap};

// SSIM stabilizers for unit dynamic range (K1 = 0.01, K2 = 0.03).
const SSIM_C1: f64 = 1e-4;
const SSIM_C2: f64 = 9e-4;

/// Structural similarity between two equally shaped images, computed
/// globally over the full image. 1.0 means identical.
pub fn ssim(a: &Array2<f32>, b: &Array2<f32>) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().map(|&v| v as f64).sum::<f64>() / n;
    let mean_b = b.iter().map(|&v| v as f64).sum::<f64>() / n;

    let mut var_a = 0.0;
    let mut var_b = 0.0;
    let mut cov = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x as f64 - mean_a;
        let dy = y as f64 - mean_b;
        var_a += dx * dx;
        var_b += dy * dy;
        cov += dx * dy;
    }
    var_a /= n;
    var_b /= n;
    cov /= n;

    ((2.0 * mean_a * mean_b + SSIM_C1) * (2.0 * cov + SSIM_C2))
        / ((mean_a * mean_a + mean_b * mean_b + SSIM_C1) * (var_a + var_b + SSIM_C2))
}

/// Mean squared pixel difference.
pub fn pixel_mse(a: &Array2<f32>, b: &Array2<f32>) -> f64 {
    let n = a.len() as f64;
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| ((x - y) as f64).powi(2))
        .sum::<f64>()
        / n
}

/// Mean absolute pixel difference.
pub fn pixel_mae(a: &Array2<f32>, b: &Array2<f32>) -> f64 {
    let n = a.len() as f64;
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| ((x - y) as f64).abs())
        .sum::<f64>()
        / n
}

/// Metrics for one test sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleMetrics {
    pub index: usize,
    pub true_position: SourcePosition,
    pub predicted_position: SourcePosition,
    pub ssim: f64,
    pub mse: f64,
    pub mae: f64,
    pub distance: f64,
}

/// Aggregate evaluation over the test partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub samples: Vec<SampleMetrics>,
    pub mean_ssim: f64,
    pub mean_mse: f64,
    pub mean_mae: f64,
    pub mean_distance: f64,
    /// Artifact failures recovered during report generation
    pub warnings: Vec<String>,
}

impl EvaluationReport {
    fn aggregate(samples: Vec<SampleMetrics>) -> Self {
        let n = samples.len().max(1) as f64;
        let mean_ssim = samples.iter().map(|s| s.ssim).sum::<f64>() / n;
        let mean_mse = samples.iter().map(|s| s.mse).sum::<f64>() / n;
        let mean_mae = samples.iter().map(|s| s.mae).sum::<f64>() / n;
        let mean_distance = samples.iter().map(|s| s.distance).sum::<f64>() / n;
        Self {
            samples,
            mean_ssim,
            mean_mse,
            mean_mae,
            mean_distance,
            warnings: Vec::new(),
        }
    }
}

/// Evaluate predictions against ground truth, both in physical units.
///
/// Predictions must already be inverse-scaled; this function never
/// re-fits any transform.
pub fn evaluate(
    predicted: &[SourcePosition],
    truth: &[SourcePosition],
    smoothing_sigma: f64,
) -> EvaluationReport {
    let samples = predicted
        .iter()
        .zip(truth.iter())
        .enumerate()
        .map(|(index, (pred, actual))| {
            let true_img = gaussian_blur(&render_point_heatmap(actual), smoothing_sigma);
            let pred_img = gaussian_blur(&render_point_heatmap(pred), smoothing_sigma);
            SampleMetrics {
                index,
                true_position: *actual,
                predicted_position: *pred,
                ssim: ssim(&true_img, &pred_img),
                mse: pixel_mse(&true_img, &pred_img),
                mae: pixel_mae(&true_img, &pred_img),
                distance: actual.distance_to(pred),
            }
        })
        .collect();

    EvaluationReport::aggregate(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssim_of_identical_images_is_one() {
        let img = gaussian_blur(&render_point_heatmap(&SourcePosition::new(50.0, 60.0)), 2.0);
        assert!((ssim(&img, &img) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ssim_drops_for_distant_points() {
        let a = gaussian_blur(&render_point_heatmap(&SourcePosition::new(50.0, 50.0)), 2.0);
        let b = gaussian_blur(&render_point_heatmap(&SourcePosition::new(200.0, 200.0)), 2.0);
        assert!(ssim(&a, &b) < ssim(&a, &a));
    }

    #[test]
    fn identical_coordinates_have_zero_distance() {
        let p = SourcePosition::new(12.0, 34.0);
        let report = evaluate(&[p], &[p], 2.0);
        assert_eq!(report.samples.len(), 1);
        assert_eq!(report.samples[0].distance, 0.0);
        assert!((report.samples[0].ssim - 1.0).abs() < 1e-12);
        assert!(report.samples[0].mse < 1e-12);
    }

    #[test]
    fn report_has_one_entry_per_test_sample() {
        let truth = vec![
            SourcePosition::new(10.0, 10.0),
            SourcePosition::new(20.0, 20.0),
            SourcePosition::new(30.0, 30.0),
        ];
        let pred = vec![
            SourcePosition::new(11.0, 10.0),
            SourcePosition::new(22.0, 19.0),
            SourcePosition::new(28.0, 33.0),
        ];
        let report = evaluate(&pred, &truth, 2.0);
        assert_eq!(report.samples.len(), 3);
        assert!(report.mean_distance > 0.0);
        assert!(report.mean_ssim < 1.0);
    }

    #[test]
    fn euclidean_error_matches_geometry() {
        let truth = vec![SourcePosition::new(0.0, 0.0)];
        let pred = vec![SourcePosition::new(3.0, 4.0)];
        let report = evaluate(&pred, &truth, 2.0);
        assert!((report.mean_distance - 5.0).abs() < 1e-12);
    }
}
