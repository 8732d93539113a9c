//! Report sink.
//!
//! Produces the run artifacts: loss curves and an error histogram as SVG
//! figures, per-sample true/predicted heatmap pairs as PNG, the metric
//! history as JSON, a prediction table as CSV, and a plain-text summary.
//! Every artifact is an independent failure domain: an error is logged,
//! recorded in the report's warnings list, and never aborts the numeric
//! pipeline.

use std::path::{Path, PathBuf};

use anyhow::Result;
use ndarray::Array2;
use plotters::prelude::*;
use plotters_svg::SVGBackend;

use sourcenet_core::{LossWeights, ReportConfig, HEATMAP_SIZE};
use sourcenet_model::TrainingHistory;

use crate::heatmap::{gaussian_blur, render_point_heatmap};
use crate::metrics::{EvaluationReport, SampleMetrics};

/// Partition sizes carried into the text summary.
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    pub loss_weights: LossWeights,
    pub train_groups: usize,
    pub validation_groups: usize,
    pub test_groups: usize,
}

/// Writes all artifacts for one finished run into an output directory.
pub struct ReportSink {
    out_dir: PathBuf,
    config: ReportConfig,
}

impl ReportSink {
    pub fn new<P: AsRef<Path>>(out_dir: P, config: &ReportConfig) -> Self {
        Self {
            out_dir: out_dir.as_ref().to_path_buf(),
            config: config.clone(),
        }
    }

    /// Emit every artifact, collecting recovered failures into the
    /// report's warnings list.
    pub fn write_all(
        &self,
        history: &TrainingHistory,
        report: &mut EvaluationReport,
        context: &RunContext,
    ) {
        let mut warnings: Vec<String> = Vec::new();
        {
            let mut record = |name: &str, result: Result<()>| {
                if let Err(e) = result {
                    tracing::warn!(artifact = name, error = %e, "report artifact failed");
                    warnings.push(format!("{}: {}", name, e));
                }
            };

            record("history_json", self.write_history_json(history));
            record("loss_curves", self.write_loss_curves(history));
            record("error_histogram", self.write_error_histogram(report));
            record("predictions_csv", self.write_predictions_csv(report));

            for sample in report.samples.iter().take(self.config.max_heatmap_pairs) {
                record(
                    &format!("heatmap_pair_{:04}", sample.index),
                    self.write_heatmap_pair(sample),
                );
            }

            record("summary_txt", self.write_summary(history, report, context));
        }
        report.warnings.extend(warnings);
    }

    fn write_history_json(&self, history: &TrainingHistory) -> Result<()> {
        let json = serde_json::to_string_pretty(history)?;
        std::fs::write(self.out_dir.join("history.json"), json)?;
        Ok(())
    }

    fn write_loss_curves(&self, history: &TrainingHistory) -> Result<()> {
        let path = self.out_dir.join("loss_curves.svg");
        let root = SVGBackend::new(&path, (800, 500)).into_drawing_area();
        root.fill(&WHITE)?;

        if history.epochs.is_empty() {
            root.draw(&Text::new(
                "No epochs recorded",
                (400, 250),
                ("sans-serif", 20).into_font().color(&BLACK),
            ))?;
            root.present()?;
            return Ok(());
        }

        let losses: Vec<f64> = history
            .epochs
            .iter()
            .flat_map(|e| {
                std::iter::once(e.train_loss).chain(e.validation_loss.into_iter())
            })
            .collect();
        let min_loss = losses.iter().copied().fold(f64::INFINITY, f64::min);
        let max_loss = losses.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let n = history.epochs.len();

        let mut chart = ChartBuilder::on(&root)
            .caption("Training / Validation Loss", ("sans-serif", 20))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0..n, min_loss..max_loss * 1.05 + 1e-12)?;

        chart
            .configure_mesh()
            .x_desc("Epoch")
            .y_desc("Loss")
            .draw()?;

        chart.draw_series(LineSeries::new(
            history.epochs.iter().map(|e| (e.epoch, e.train_loss)),
            &BLUE,
        ))?;

        if history.epochs.iter().any(|e| e.validation_loss.is_some()) {
            chart.draw_series(LineSeries::new(
                history
                    .epochs
                    .iter()
                    .filter_map(|e| e.validation_loss.map(|v| (e.epoch, v))),
                &RED,
            ))?;
        }

        root.present()?;
        Ok(())
    }

    fn write_error_histogram(&self, report: &EvaluationReport) -> Result<()> {
        let path = self.out_dir.join("error_histogram.svg");
        let root = SVGBackend::new(&path, (800, 500)).into_drawing_area();
        root.fill(&WHITE)?;

        if report.samples.is_empty() {
            root.draw(&Text::new(
                "No test samples",
                (400, 250),
                ("sans-serif", 20).into_font().color(&BLACK),
            ))?;
            root.present()?;
            return Ok(());
        }

        let distances: Vec<f64> = report.samples.iter().map(|s| s.distance).collect();
        let max_d = distances.iter().copied().fold(0.0f64, f64::max).max(1e-9);
        let n_buckets = 20usize;
        let width = max_d / n_buckets as f64;

        let mut counts = vec![0usize; n_buckets];
        for d in &distances {
            let bucket = ((d / width) as usize).min(n_buckets - 1);
            counts[bucket] += 1;
        }
        let max_count = counts.iter().copied().max().unwrap_or(1) as f64;

        let mut chart = ChartBuilder::on(&root)
            .caption("Euclidean Error Distribution", ("sans-serif", 20))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..max_d, 0.0..max_count * 1.1)?;

        chart
            .configure_mesh()
            .x_desc("Distance (physical units)")
            .y_desc("Samples")
            .draw()?;

        chart.draw_series(counts.iter().enumerate().map(|(i, &count)| {
            let x0 = i as f64 * width;
            let x1 = x0 + width;
            Rectangle::new([(x0, 0.0), (x1, count as f64)], BLUE.filled())
        }))?;

        root.present()?;
        Ok(())
    }

    fn write_heatmap_pair(&self, sample: &SampleMetrics) -> Result<()> {
        let sigma = self.config.smoothing_sigma;
        let true_img = gaussian_blur(&render_point_heatmap(&sample.true_position), sigma);
        let pred_img = gaussian_blur(&render_point_heatmap(&sample.predicted_position), sigma);

        let side = HEATMAP_SIZE as u32;
        let mut img = image::GrayImage::new(side * 2, side);
        paint(&mut img, &true_img, 0);
        paint(&mut img, &pred_img, side);

        let path = self
            .out_dir
            .join(format!("heatmap_pair_{:04}.png", sample.index));
        img.save(path)?;
        Ok(())
    }

    fn write_predictions_csv(&self, report: &EvaluationReport) -> Result<()> {
        let mut writer = csv::Writer::from_path(self.out_dir.join("predictions.csv"))?;
        writer.write_record(["true_x", "true_y", "pred_x", "pred_y", "distance"])?;
        for s in &report.samples {
            writer.write_record([
                s.true_position.x.to_string(),
                s.true_position.y.to_string(),
                s.predicted_position.x.to_string(),
                s.predicted_position.y.to_string(),
                s.distance.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_summary(
        &self,
        history: &TrainingHistory,
        report: &EvaluationReport,
        context: &RunContext,
    ) -> Result<()> {
        let final_loss = history
            .final_train_loss()
            .map(|l| format!("{:.6}", l))
            .unwrap_or_else(|| "n/a".to_string());

        let text = format!(
            "SourceNet evaluation summary\n\
             ============================\n\
             groups: train={} validation={} test={}\n\
             epochs run: {} (early stop: {})\n\
             loss weights: squared={} absolute={} magnitude={}\n\
             final train loss: {}\n\
             best monitored loss: {:.6}\n\
             \n\
             test metrics (means over {} samples)\n\
             mean SSIM:      {:.6}\n\
             mean pixel MSE: {:.6e}\n\
             mean pixel MAE: {:.6e}\n\
             mean distance:  {:.4}\n",
            context.train_groups,
            context.validation_groups,
            context.test_groups,
            history.epochs.len(),
            history.stopped_early,
            context.loss_weights.squared,
            context.loss_weights.absolute,
            context.loss_weights.magnitude,
            final_loss,
            history.best_monitored_loss,
            report.samples.len(),
            report.mean_ssim,
            report.mean_mse,
            report.mean_mae,
            report.mean_distance,
        );

        std::fs::write(self.out_dir.join("summary.txt"), text)?;
        Ok(())
    }
}

fn paint(img: &mut image::GrayImage, data: &Array2<f32>, x_offset: u32) {
    let peak = data.iter().copied().fold(0.0f32, f32::max).max(1e-12);
    for ((r, c), &v) in data.indexed_iter() {
        let level = ((v / peak) * 255.0).round().clamp(0.0, 255.0) as u8;
        img.put_pixel(x_offset + c as u32, r as u32, image::Luma([level]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::evaluate;
    use sourcenet_core::SourcePosition;

    fn history() -> TrainingHistory {
        TrainingHistory {
            epochs: vec![
                sourcenet_model::EpochRecord {
                    epoch: 0,
                    train_loss: 0.5,
                    validation_loss: Some(0.6),
                    learning_rate: 1e-3,
                },
                sourcenet_model::EpochRecord {
                    epoch: 1,
                    train_loss: 0.3,
                    validation_loss: Some(0.4),
                    learning_rate: 1e-3,
                },
            ],
            stopped_early: false,
            best_monitored_loss: 0.4,
        }
    }

    fn context() -> RunContext {
        RunContext {
            loss_weights: LossWeights {
                squared: 1.0,
                absolute: 0.5,
                magnitude: 0.1,
            },
            train_groups: 7,
            validation_groups: 2,
            test_groups: 1,
        }
    }

    #[test]
    fn write_all_produces_artifacts_without_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ReportSink::new(
            dir.path(),
            &ReportConfig {
                smoothing_sigma: 2.0,
                max_heatmap_pairs: 8,
            },
        );

        let truth = vec![SourcePosition::new(100.0, 120.0)];
        let pred = vec![SourcePosition::new(104.0, 117.0)];
        let mut report = evaluate(&pred, &truth, 2.0);

        sink.write_all(&history(), &mut report, &context());

        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        for name in [
            "history.json",
            "loss_curves.svg",
            "error_histogram.svg",
            "predictions.csv",
            "heatmap_pair_0000.png",
            "summary.txt",
        ] {
            assert!(dir.path().join(name).exists(), "missing {}", name);
        }

        let summary = std::fs::read_to_string(dir.path().join("summary.txt")).unwrap();
        assert!(summary.contains("mean SSIM"));
        assert!(summary.contains("train=7"));
    }

    #[test]
    fn artifact_failure_is_recovered_into_warnings() {
        // nonexistent directory: every artifact fails, numeric results stay
        let sink = ReportSink::new(
            "/nonexistent/sourcenet-report-sink",
            &ReportConfig {
                smoothing_sigma: 2.0,
                max_heatmap_pairs: 1,
            },
        );

        let truth = vec![SourcePosition::new(10.0, 10.0)];
        let pred = vec![SourcePosition::new(12.0, 10.0)];
        let mut report = evaluate(&pred, &truth, 2.0);
        let mean_distance = report.mean_distance;

        sink.write_all(&history(), &mut report, &context());

        assert!(!report.warnings.is_empty());
        assert_eq!(report.mean_distance, mean_distance);
        assert_eq!(report.samples.len(), 1);
    }

    #[test]
    fn heatmap_pair_cap_is_respected() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ReportSink::new(
            dir.path(),
            &ReportConfig {
                smoothing_sigma: 2.0,
                max_heatmap_pairs: 2,
            },
        );

        let truth: Vec<_> = (0..5).map(|i| SourcePosition::new(i as f64 * 10.0, 50.0)).collect();
        let pred = truth.clone();
        let mut report = evaluate(&pred, &truth, 2.0);

        sink.write_all(&history(), &mut report, &context());

        assert!(dir.path().join("heatmap_pair_0001.png").exists());
        assert!(!dir.path().join("heatmap_pair_0002.png").exists());
    }
}
