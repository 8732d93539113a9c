//! Pipeline configuration.
//!
//! Everything that was a module-level constant in earlier prototypes is an
//! explicit field here, passed into the pipeline entry point.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Input/output locations
    pub data: DataConfig,

    /// Feature and label scaling policies
    pub scaling: ScalingConfig,

    /// Network architecture
    pub model: ModelConfig,

    /// Training loop parameters
    pub training: TrainingConfig,

    /// Report sink parameters
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path to the event table (CSV)
    pub input_path: PathBuf,

    /// Output directory, created if absent
    pub output_dir: PathBuf,

    /// Train/validation/test ratios over source groups
    pub split_ratios: SplitRatios,

    /// Seed for the group shuffle and batch shuffles
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SplitRatios {
    pub train: f64,
    pub validation: f64,
    pub test: f64,
}

/// Feature scaling policy applied to the six event columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureScaling {
    /// Zero-mean / unit-variance, fitted independently per source group
    PerGroupStandard,
    /// Affine map into [-1, 1], fitted once over all groups' rows
    GlobalMinMax,
}

/// Label scaling policy for the (source_x, source_y) target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum LabelPolicy {
    /// Divide by a fixed domain bound (coordinates assumed in [0, bound]);
    /// pairs with sigmoid output heads
    FixedDomain { bound: f64 },
    /// Min-max fitted over all labels jointly; the inverse is retained and
    /// handed to the evaluator
    FittedMinMax,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingConfig {
    pub features: FeatureScaling,
    pub labels: LabelPolicy,
}

/// Output head activation, tied to the label policy in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadActivation {
    /// Bounded [0, 1] outputs for normalized-coordinate labels
    Sigmoid,
    /// Unbounded outputs for fitted-transform labels
    Linear,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Channel widths of the convolutional blocks, in order
    pub conv_widths: Vec<usize>,

    /// Convolution kernel size along the event axis
    pub kernel_size: usize,

    /// Hidden widths (per direction) of the two bidirectional layers
    pub rnn_widths: [usize; 2],

    /// Width of the dense layer ahead of the output head
    pub dense_width: usize,

    /// Dropout probability in the dense head
    pub dropout: f32,

    /// Output head activation
    pub head: HeadActivation,
}

/// Composite loss weights; fixed for a full run so evaluations compare
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LossWeights {
    /// Weight on the squared-error term
    pub squared: f64,
    /// Weight on the absolute-error term
    pub absolute: f64,
    /// Weight on the |error| * target^2 magnitude penalty (0 disables)
    pub magnitude: f64,
}

/// Learning-rate adaptation policy; the two are mutually exclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum LrPolicy {
    /// Multiply by `factor` when validation loss stagnates for `patience`
    /// epochs, never going below `min_lr`
    Plateau {
        factor: f64,
        patience: usize,
        min_lr: f64,
    },
    /// lr0 * gamma^epoch, applied every epoch
    Exponential { gamma: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Epoch budget
    pub epochs: usize,

    /// Mini-batch size
    pub batch_size: usize,

    /// Initial learning rate
    pub learning_rate: f64,

    /// AdamW weight decay (stands in for dense-layer L2 regularization)
    pub weight_decay: f64,

    /// Loss composition
    pub loss: LossWeights,

    /// Learning-rate adaptation
    pub lr_policy: LrPolicy,

    /// Early stopping patience in epochs; None trains the full budget
    pub early_stopping_patience: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Gaussian smoothing sigma applied to both heatmaps
    pub smoothing_sigma: f64,

    /// Maximum number of per-sample heatmap pair images to write
    pub max_heatmap_pairs: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data: DataConfig {
                input_path: PathBuf::from("data/events.csv"),
                output_dir: PathBuf::from("out"),
                split_ratios: SplitRatios {
                    train: 0.70,
                    validation: 0.15,
                    test: 0.15,
                },
                seed: 42,
            },
            scaling: ScalingConfig {
                features: FeatureScaling::GlobalMinMax,
                labels: LabelPolicy::FittedMinMax,
            },
            model: ModelConfig {
                conv_widths: vec![64, 128, 256],
                kernel_size: 3,
                rnn_widths: [128, 64],
                dense_width: 64,
                dropout: 0.3,
                head: HeadActivation::Linear,
            },
            training: TrainingConfig {
                epochs: 300,
                batch_size: 32,
                learning_rate: 1e-3,
                weight_decay: 1e-4,
                loss: LossWeights {
                    squared: 1.0,
                    absolute: 0.5,
                    magnitude: 0.1,
                },
                lr_policy: LrPolicy::Plateau {
                    factor: 0.5,
                    patience: 20,
                    min_lr: 1e-6,
                },
                early_stopping_patience: None,
            },
            report: ReportConfig {
                smoothing_sigma: 2.0,
                max_heatmap_pairs: 32,
            },
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a file, with `SOURCENET_`-prefixed
    /// environment variables taking precedence.
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("SOURCENET").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Variant-A preset: per-group standardization, /255 labels with
    /// sigmoid heads, plateau learning rate, full epoch budget.
    pub fn variant_a() -> Self {
        let mut cfg = Self::default();
        cfg.scaling.features = FeatureScaling::PerGroupStandard;
        cfg.scaling.labels = LabelPolicy::FixedDomain { bound: 255.0 };
        cfg.model.head = HeadActivation::Sigmoid;
        cfg.training.loss.magnitude = 0.0;
        cfg
    }

    /// Variant-B preset: global min-max features, fitted labels with
    /// linear heads, deeper conv stack, exponential decay, early stopping.
    pub fn variant_b() -> Self {
        let mut cfg = Self::default();
        cfg.model.conv_widths = vec![128, 256, 512];
        cfg.training.epochs = 400;
        cfg.training.lr_policy = LrPolicy::Exponential { gamma: 0.995 };
        cfg.training.early_stopping_patience = Some(600);
        cfg
    }
}
