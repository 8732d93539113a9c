//! Composite regression loss.
//!
//! Weighted sum of a squared-error term, an absolute-error term, and an
//! optional magnitude penalty that weights absolute error by the squared
//! true value, penalizing mispredictions of larger-magnitude targets
//! more. Weights stay fixed across a full run.

use candle_core::{Result, Tensor};

use sourcenet_core::LossWeights;

/// Compute the weighted composite loss between predictions and targets,
/// both shaped [batch, 2].
pub fn composite_loss(pred: &Tensor, target: &Tensor, weights: &LossWeights) -> Result<Tensor> {
    let diff = (pred - target)?;

    let mut total = (diff.sqr()?.mean_all()? * weights.squared)?;

    if weights.absolute > 0.0 {
        let mae = diff.abs()?.mean_all()?;
        total = (total + (mae * weights.absolute)?)?;
    }

    if weights.magnitude > 0.0 {
        let weighted = (diff.abs()? * target.sqr()?)?.mean_all()?;
        total = (total + (weighted * weights.magnitude)?)?;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    const WEIGHTS: LossWeights = LossWeights {
        squared: 1.0,
        absolute: 0.5,
        magnitude: 0.1,
    };

    #[test]
    fn perfect_prediction_has_zero_loss() -> Result<()> {
        let device = Device::Cpu;
        let y = Tensor::new(&[[0.3f32, 0.7], [0.1, 0.9]], &device)?;
        let loss: f32 = composite_loss(&y, &y, &WEIGHTS)?.to_scalar()?;
        assert!(loss.abs() < 1e-7);
        Ok(())
    }

    #[test]
    fn loss_grows_with_error() -> Result<()> {
        let device = Device::Cpu;
        let target = Tensor::new(&[[0.5f32, 0.5]], &device)?;
        let near = Tensor::new(&[[0.6f32, 0.5]], &device)?;
        let far = Tensor::new(&[[0.9f32, 0.5]], &device)?;

        let near_loss: f32 = composite_loss(&near, &target, &WEIGHTS)?.to_scalar()?;
        let far_loss: f32 = composite_loss(&far, &target, &WEIGHTS)?.to_scalar()?;
        assert!(far_loss > near_loss);
        Ok(())
    }

    #[test]
    fn magnitude_term_penalizes_large_targets_more() -> Result<()> {
        let device = Device::Cpu;
        let weights = LossWeights {
            squared: 0.0,
            absolute: 0.0,
            magnitude: 1.0,
        };

        // same absolute error, different target magnitude
        let small_t = Tensor::new(&[[1.0f32, 1.0]], &device)?;
        let small_p = Tensor::new(&[[1.5f32, 1.5]], &device)?;
        let large_t = Tensor::new(&[[10.0f32, 10.0]], &device)?;
        let large_p = Tensor::new(&[[10.5f32, 10.5]], &device)?;

        let small: f32 = composite_loss(&small_p, &small_t, &weights)?.to_scalar()?;
        let large: f32 = composite_loss(&large_p, &large_t, &weights)?.to_scalar()?;
        assert!(large > small * 10.0);
        Ok(())
    }

    #[test]
    fn squared_term_matches_mse() -> Result<()> {
        let device = Device::Cpu;
        let weights = LossWeights {
            squared: 1.0,
            absolute: 0.0,
            magnitude: 0.0,
        };
        let target = Tensor::new(&[[0.0f32, 0.0]], &device)?;
        let pred = Tensor::new(&[[1.0f32, 3.0]], &device)?;

        let loss: f32 = composite_loss(&pred, &target, &weights)?.to_scalar()?;
        assert!((loss - 5.0).abs() < 1e-6); // (1 + 9) / 2
        Ok(())
    }
}
