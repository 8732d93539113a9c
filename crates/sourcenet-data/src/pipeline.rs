//! Data preparation pipeline.
//!
//! Composes reader → scaler → tensorizer → splitter into one call that
//! yields model-ready samples plus the fitted label transform the
//! evaluator needs to recover physical units.

use sourcenet_core::{DataConfig, Result, Sample, ScalingConfig, SourceGroup};

use crate::reader::read_groups;
use crate::scaling::{scale_groups, LabelScaler};
use crate::split::{split_groups, DatasetSplit};
use crate::tensorize::to_fixed_tensor;

/// Everything the training and evaluation stages consume.
pub struct PreparedDataset {
    pub samples: Vec<Sample>,
    pub split: DatasetSplit,
    pub label_scaler: LabelScaler,
}

impl PreparedDataset {
    pub fn train(&self) -> Vec<&Sample> {
        self.split.train.iter().map(|&i| &self.samples[i]).collect()
    }

    pub fn validation(&self) -> Vec<&Sample> {
        self.split
            .validation
            .iter()
            .map(|&i| &self.samples[i])
            .collect()
    }

    pub fn test(&self) -> Vec<&Sample> {
        self.split.test.iter().map(|&i| &self.samples[i]).collect()
    }
}

/// Read the event table and produce fixed-shape samples and the split.
pub fn prepare_dataset(data: &DataConfig, scaling: &ScalingConfig) -> Result<PreparedDataset> {
    let groups = read_groups(&data.input_path)?;
    prepare_groups(&groups, data, scaling)
}

/// Same as [`prepare_dataset`] but starting from in-memory groups.
pub fn prepare_groups(
    groups: &[SourceGroup],
    data: &DataConfig,
    scaling: &ScalingConfig,
) -> Result<PreparedDataset> {
    let positions: Vec<_> = groups.iter().map(|g| g.source).collect();
    let label_scaler = LabelScaler::fit(&positions, scaling.labels);

    let scaled = scale_groups(groups, scaling.features);

    let mut samples = Vec::with_capacity(groups.len());
    for (group, matrix) in groups.iter().zip(&scaled) {
        if group.is_empty() {
            tracing::warn!(
                source_x = group.source.x,
                source_y = group.source.y,
                "source group has no events; using zero tensor"
            );
        }
        samples.push(Sample {
            tensor: to_fixed_tensor(matrix)?,
            label: label_scaler.transform(&group.source),
            source: group.source,
        });
    }

    let split = split_groups(samples.len(), data.split_ratios, data.seed);

    Ok(PreparedDataset {
        samples,
        split,
        label_scaler,
    })
}
