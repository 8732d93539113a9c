//! Training loop.
//!
//! Lifecycle: construction binds the optimizer and loss (Compiled),
//! `fit` runs the epoch loop with per-epoch validation, learning-rate
//! adaptation, and optional early stopping with rollback to the best
//! checkpoint (Training -> Converged/Stopped), and `freeze` turns the
//! trainer into a read-only model for inference.

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use sourcenet_core::{
    Error, ModelConfig, Result, Sample, TrainingConfig, EVENT_COUNT, FEATURE_COUNT,
};

use crate::loss::composite_loss;
use crate::network::LocatorNetwork;
use crate::schedule::LrSchedule;

const BEST_CHECKPOINT: &str = "checkpoint_best.safetensors";
const FINAL_CHECKPOINT: &str = "model_final.safetensors";

/// One epoch of the metric history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: usize,
    pub train_loss: f64,
    pub validation_loss: Option<f64>,
    pub learning_rate: f64,
}

/// Per-epoch history returned by a completed fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochRecord>,
    pub stopped_early: bool,
    pub best_monitored_loss: f64,
}

impl TrainingHistory {
    pub fn final_train_loss(&self) -> Option<f64> {
        self.epochs.last().map(|e| e.train_loss)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Compiled model + optimizer, ready to fit.
pub struct Trainer {
    varmap: VarMap,
    model: LocatorNetwork,
    optimizer: AdamW,
    config: TrainingConfig,
    device: Device,
    seed: u64,
}

impl Trainer {
    /// Build the network with fresh weights and bind the optimizer.
    pub fn new(
        model_config: &ModelConfig,
        training_config: &TrainingConfig,
        seed: u64,
    ) -> Result<Self> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let model = LocatorNetwork::new(model_config, vb).map_err(train_err)?;

        let optimizer = AdamW::new(
            varmap.all_vars(),
            ParamsAdamW {
                lr: training_config.learning_rate,
                weight_decay: training_config.weight_decay,
                ..Default::default()
            },
        )
        .map_err(train_err)?;

        Ok(Self {
            varmap,
            model,
            optimizer,
            config: training_config.clone(),
            device,
            seed,
        })
    }

    /// Run the epoch loop. Checkpoints land in `out_dir`.
    ///
    /// Validation loss is the monitored quantity for the learning-rate
    /// policy and early stopping; with an empty validation partition the
    /// training loss is monitored instead.
    pub fn fit(
        &mut self,
        train: &[&Sample],
        validation: &[&Sample],
        out_dir: &Path,
    ) -> Result<TrainingHistory> {
        if train.is_empty() {
            return Err(Error::Training("empty training partition".into()));
        }

        let mut schedule = LrSchedule::new(self.config.lr_policy, self.config.learning_rate);
        let mut lr = self.config.learning_rate;
        let best_path = out_dir.join(BEST_CHECKPOINT);

        let mut history = TrainingHistory {
            epochs: Vec::with_capacity(self.config.epochs),
            stopped_early: false,
            best_monitored_loss: f64::INFINITY,
        };
        let mut stale_epochs = 0usize;

        let mut order: Vec<usize> = (0..train.len()).collect();

        for epoch in 0..self.config.epochs {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(epoch as u64));
            order.shuffle(&mut rng);

            let mut epoch_loss = 0.0;
            let mut batches = 0usize;
            for chunk in order.chunks(self.config.batch_size) {
                let batch: Vec<&Sample> = chunk.iter().map(|&i| train[i]).collect();
                let (x, y) = batch_inputs(&batch, &self.device).map_err(train_err)?;

                let pred = self.model.forward(&x, true).map_err(train_err)?;
                let loss = composite_loss(&pred, &y, &self.config.loss).map_err(train_err)?;
                self.optimizer.backward_step(&loss).map_err(train_err)?;

                epoch_loss += loss.to_scalar::<f32>().map_err(train_err)? as f64;
                batches += 1;
            }
            let train_loss = epoch_loss / batches as f64;

            let validation_loss = if validation.is_empty() {
                None
            } else {
                Some(self.evaluate_loss(validation)?)
            };
            let monitored = validation_loss.unwrap_or(train_loss);

            history.epochs.push(EpochRecord {
                epoch,
                train_loss,
                validation_loss,
                learning_rate: lr,
            });
            tracing::debug!(epoch, train_loss, ?validation_loss, lr, "epoch complete");

            if monitored < history.best_monitored_loss {
                history.best_monitored_loss = monitored;
                stale_epochs = 0;
                if self.config.early_stopping_patience.is_some() {
                    self.varmap.save(&best_path).map_err(train_err)?;
                }
            } else {
                stale_epochs += 1;
            }

            if let Some(patience) = self.config.early_stopping_patience {
                if stale_epochs >= patience {
                    tracing::info!(
                        epoch,
                        best = history.best_monitored_loss,
                        "early stopping; rolling back to best checkpoint"
                    );
                    self.varmap.load(&best_path).map_err(train_err)?;
                    history.stopped_early = true;
                    break;
                }
            }

            let next_lr = schedule.step(epoch, monitored, lr);
            if (next_lr - lr).abs() > f64::EPSILON {
                tracing::info!(epoch, from = lr, to = next_lr, "learning rate updated");
                lr = next_lr;
                self.optimizer.set_learning_rate(lr);
            }
        }

        self.varmap
            .save(out_dir.join(FINAL_CHECKPOINT))
            .map_err(train_err)?;

        tracing::info!(
            epochs = history.epochs.len(),
            stopped_early = history.stopped_early,
            best = history.best_monitored_loss,
            "training finished"
        );

        Ok(history)
    }

    /// Mean composite loss over a partition, without weight updates.
    fn evaluate_loss(&self, samples: &[&Sample]) -> Result<f64> {
        let mut total = 0.0;
        let mut batches = 0usize;
        for chunk in samples.chunks(self.config.batch_size) {
            let (x, y) = batch_inputs(chunk, &self.device).map_err(train_err)?;
            let pred = self.model.forward(&x, false).map_err(train_err)?;
            let loss = composite_loss(&pred, &y, &self.config.loss).map_err(train_err)?;
            total += loss.to_scalar::<f32>().map_err(train_err)? as f64;
            batches += 1;
        }
        Ok(total / batches.max(1) as f64)
    }

    /// Freeze into a read-only model.
    pub fn freeze(self) -> TrainedModel {
        TrainedModel {
            model: self.model,
            device: self.device,
            batch_size: self.config.batch_size,
        }
    }
}

/// Read-only trained model.
pub struct TrainedModel {
    model: LocatorNetwork,
    device: Device,
    batch_size: usize,
}

impl TrainedModel {
    /// Predict label-space coordinates for a set of samples.
    pub fn predict(&self, samples: &[&Sample]) -> Result<Vec<[f32; 2]>> {
        let mut out = Vec::with_capacity(samples.len());
        for chunk in samples.chunks(self.batch_size) {
            let (x, _) = batch_inputs(chunk, &self.device).map_err(infer_err)?;
            let pred = self
                .model
                .forward(&x, false)
                .and_then(|p| p.detach().to_vec2::<f32>())
                .map_err(infer_err)?;
            for row in pred {
                out.push([row[0], row[1]]);
            }
        }
        Ok(out)
    }
}

/// Assemble a batch into (inputs, labels) tensors of shapes
/// [batch, FEATURE_COUNT, EVENT_COUNT] and [batch, 2].
fn batch_inputs(samples: &[&Sample], device: &Device) -> candle_core::Result<(Tensor, Tensor)> {
    let b = samples.len();
    let mut xs = Vec::with_capacity(b * FEATURE_COUNT * EVENT_COUNT);
    let mut ys = Vec::with_capacity(b * 2);
    for s in samples {
        xs.extend_from_slice(&s.tensor.to_channels_first());
        ys.extend_from_slice(&s.label);
    }
    let x = Tensor::from_vec(xs, (b, FEATURE_COUNT, EVENT_COUNT), device)?;
    let y = Tensor::from_vec(ys, (b, 2), device)?;
    Ok((x, y))
}

fn train_err(e: candle_core::Error) -> Error {
    Error::Training(e.to_string())
}

fn infer_err(e: candle_core::Error) -> Error {
    Error::Inference(e.to_string())
}
