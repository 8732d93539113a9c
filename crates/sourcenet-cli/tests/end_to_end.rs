//! End-to-end pipeline test on a synthetic event table.

use std::io::Write;

use sourcenet_core::{HeadActivation, PipelineConfig, EVENT_COUNT, FEATURE_COUNT};

/// Two distinct source groups: one with 10 rows, one with 5000 rows
/// (crossing the pad and truncate regimes), valid numeric features.
fn write_synthetic_table(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("events.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        "Source_X,Source_Y,Scatter_X,Scatter_Y,Energy,Absorb_X,Absorb_Y,Energy_Abs"
    )
    .unwrap();

    for r in 0..10 {
        let v = r as f64;
        writeln!(
            file,
            "40,60,{},{},{},{},{},{}",
            v,
            v + 0.5,
            100.0 + v,
            v * 2.0,
            v * 2.0 + 1.0,
            50.0 + v
        )
        .unwrap();
    }
    for r in 0..5000 {
        let v = (r % 97) as f64;
        writeln!(
            file,
            "200,120,{},{},{},{},{},{}",
            v,
            v + 0.25,
            80.0 + v,
            v * 1.5,
            v * 1.5 + 2.0,
            30.0 + v
        )
        .unwrap();
    }

    path
}

fn fast_config(dir: &std::path::Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.data.input_path = write_synthetic_table(dir);
    config.data.output_dir = dir.join("out");
    config.model.conv_widths = vec![4, 8, 8];
    config.model.rnn_widths = [4, 2];
    config.model.dense_width = 8;
    config.model.head = HeadActivation::Linear;
    config.training.epochs = 1;
    config.training.batch_size = 2;
    config.report.max_heatmap_pairs = 4;
    config
}

#[test]
fn pipeline_runs_on_two_group_table() {
    let dir = tempfile::tempdir().unwrap();
    let config = fast_config(dir.path());

    let outcome = sourcenet_cli::run(&config).unwrap();

    // 2 groups split 1/0/1 under 70/15/15 rounding; one per-sample metric
    // entry per test group
    assert_eq!(outcome.report.samples.len(), 1);
    assert_eq!(outcome.history.epochs.len(), 1);
    assert!(outcome.history.epochs[0].train_loss.is_finite());
    assert!(outcome.report.samples[0].distance.is_finite());
    assert!(outcome.report.samples[0].ssim <= 1.0);

    // artifacts land in the output directory
    let out = config.data.output_dir;
    assert!(out.join("summary.txt").exists());
    assert!(out.join("history.json").exists());
    assert!(out.join("predictions.csv").exists());
    assert!(out.join("model_final.safetensors").exists());
}

#[test]
fn tensor_contract_holds_through_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let config = fast_config(dir.path());

    let prepared =
        sourcenet_data::prepare_dataset(&config.data, &config.scaling).unwrap();
    assert_eq!(prepared.samples.len(), 2);
    for sample in &prepared.samples {
        assert_eq!(sample.tensor.data().dim(), (EVENT_COUNT, FEATURE_COUNT));
        assert!(sample.tensor.data().iter().all(|v| v.is_finite()));
    }
}
