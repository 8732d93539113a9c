//! Full pipeline run.

use sourcenet_core::{PipelineConfig, Result, SourcePosition};
use sourcenet_data::prepare_dataset;
use sourcenet_eval::{evaluate, EvaluationReport, ReportSink, RunContext};
use sourcenet_model::{Trainer, TrainingHistory};

/// Numeric results of one complete run.
pub struct PipelineOutcome {
    pub history: TrainingHistory,
    pub report: EvaluationReport,
}

/// Execute the whole pipeline: ingest → scale → tensorize → split →
/// train → predict → inverse-scale → evaluate → report.
pub fn run(config: &PipelineConfig) -> Result<PipelineOutcome> {
    std::fs::create_dir_all(&config.data.output_dir)?;

    let prepared = prepare_dataset(&config.data, &config.scaling)?;
    let train = prepared.train();
    let validation = prepared.validation();
    let test = prepared.test();

    let mut trainer = Trainer::new(&config.model, &config.training, config.data.seed)?;
    let history = trainer.fit(&train, &validation, &config.data.output_dir)?;
    let model = trainer.freeze();

    let predictions = model.predict(&test)?;
    let predicted: Vec<SourcePosition> = predictions
        .into_iter()
        .map(|label| prepared.label_scaler.inverse(label))
        .collect();
    let truth: Vec<SourcePosition> = test.iter().map(|s| s.source).collect();

    let mut report = evaluate(&predicted, &truth, config.report.smoothing_sigma);

    let sink = ReportSink::new(&config.data.output_dir, &config.report);
    sink.write_all(
        &history,
        &mut report,
        &RunContext {
            loss_weights: config.training.loss,
            train_groups: train.len(),
            validation_groups: validation.len(),
            test_groups: test.len(),
        },
    );

    tracing::info!(
        test_samples = report.samples.len(),
        mean_ssim = report.mean_ssim,
        mean_distance = report.mean_distance,
        warnings = report.warnings.len(),
        "pipeline run complete"
    );

    Ok(PipelineOutcome { history, report })
}
