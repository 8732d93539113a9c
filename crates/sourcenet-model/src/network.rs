//! Source localization network.
//!
//! A stack of convolutional blocks compresses the padded event sequence
//! along the event axis only, preserving all six feature channels as
//! convolution channels. The compressed sequence then passes through two
//! bidirectional LSTM layers of decreasing width and a dense head that
//! regresses the 2-D coordinate pair.

use candle_core::{Module, Result, Tensor};
use candle_nn::{
    conv1d, layer_norm, linear, lstm, Conv1d, Conv1dConfig, Dropout, LSTMConfig, LayerNorm,
    Linear, VarBuilder, LSTM, RNN,
};

use sourcenet_core::{HeadActivation, ModelConfig, FEATURE_COUNT};

/// 1D convolutional block: conv -> layer norm -> ReLU -> max-pool by 2
/// along the event axis.
struct ConvBlock {
    conv: Conv1d,
    norm: LayerNorm,
}

impl ConvBlock {
    fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let config = Conv1dConfig {
            padding: kernel_size / 2,
            ..Default::default()
        };

        let conv = conv1d(in_channels, out_channels, kernel_size, config, vb.pp("conv"))?;
        let norm = layer_norm(out_channels, 1e-5, vb.pp("norm"))?;

        Ok(Self { conv, norm })
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let x = self.conv.forward(x)?;
        // Transpose for layer norm (expects last dim to be normalized)
        let x = x.transpose(1, 2)?;
        let x = self.norm.forward(&x)?;
        let x = x.transpose(1, 2)?;
        let x = x.relu()?;

        // Pool along events only; the feature axis is the channel axis
        // and is untouched.
        let (b, c, l) = x.dims3()?;
        let x = x.reshape((b, c, 1, l))?;
        let x = x.max_pool2d_with_stride((1, 2), (1, 2))?;
        let (b, c, _, l) = x.dims4()?;
        x.reshape((b, c, l))
    }
}

/// Bidirectional LSTM built from two unidirectional runs; the reversed
/// pass is realigned so both directions agree on timestep positions.
struct BiLstm {
    fwd: LSTM,
    bwd: LSTM,
}

impl BiLstm {
    fn new(in_dim: usize, hidden_dim: usize, vb: VarBuilder) -> Result<Self> {
        let fwd = lstm(in_dim, hidden_dim, LSTMConfig::default(), vb.pp("fwd"))?;
        let bwd = lstm(in_dim, hidden_dim, LSTMConfig::default(), vb.pp("bwd"))?;
        Ok(Self { fwd, bwd })
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let fwd_out = run_seq(&self.fwd, x)?;
        let rev = reverse_events(x)?;
        let bwd_out = reverse_events(&run_seq(&self.bwd, &rev)?)?;
        Tensor::cat(&[&fwd_out, &bwd_out], 2)
    }
}

/// Run an LSTM over a (batch, seq, features) tensor and stack the hidden
/// states back into (batch, seq, hidden).
fn run_seq(cell: &LSTM, x: &Tensor) -> Result<Tensor> {
    let states = cell.seq(x)?;
    let hs: Vec<Tensor> = states.iter().map(|s| s.h().clone()).collect();
    Tensor::stack(&hs, 1)
}

/// Reverse a tensor along its sequence (event) axis.
fn reverse_events(x: &Tensor) -> Result<Tensor> {
    let seq = x.dim(1)?;
    let idx: Vec<u32> = (0..seq as u32).rev().collect();
    let idx = Tensor::from_vec(idx, seq, x.device())?;
    x.contiguous()?.index_select(&idx, 1)
}

/// The complete regression network.
pub struct LocatorNetwork {
    blocks: Vec<ConvBlock>,
    rnn1: BiLstm,
    rnn2: BiLstm,
    dense: Linear,
    head_x: Linear,
    head_y: Linear,
    dropout: Dropout,
    activation: HeadActivation,
}

impl LocatorNetwork {
    pub fn new(config: &ModelConfig, vb: VarBuilder) -> Result<Self> {
        let mut blocks = Vec::new();
        let mut in_channels = FEATURE_COUNT;
        for (i, &width) in config.conv_widths.iter().enumerate() {
            blocks.push(ConvBlock::new(
                in_channels,
                width,
                config.kernel_size,
                vb.pp(format!("conv_{}", i)),
            )?);
            in_channels = width;
        }

        let rnn1 = BiLstm::new(in_channels, config.rnn_widths[0], vb.pp("rnn_0"))?;
        let rnn2 = BiLstm::new(config.rnn_widths[0] * 2, config.rnn_widths[1], vb.pp("rnn_1"))?;

        let dense = linear(config.rnn_widths[1] * 2, config.dense_width, vb.pp("dense"))?;
        let head_x = linear(config.dense_width, 1, vb.pp("head_x"))?;
        let head_y = linear(config.dense_width, 1, vb.pp("head_y"))?;

        Ok(Self {
            blocks,
            rnn1,
            rnn2,
            dense,
            head_x,
            head_y,
            dropout: Dropout::new(config.dropout),
            activation: config.head,
        })
    }

    /// Forward pass.
    ///
    /// # Arguments
    /// * `x` - Input batch of shape [batch, FEATURE_COUNT, EVENT_COUNT]
    /// * `train` - Enables dropout
    ///
    /// # Returns
    /// Coordinate predictions of shape [batch, 2] in label space.
    pub fn forward(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        let mut x = x.clone();
        for block in &self.blocks {
            x = block.forward(&x)?;
        }

        // (batch, channels, seq) -> (batch, seq, channels) for recurrence
        let x = x.transpose(1, 2)?;
        let x = self.rnn1.forward(&x)?;
        let x = self.rnn2.forward(&x)?;

        // Context-aware summary of the padded sequence
        let x = x.mean(1)?;

        let x = self.dense.forward(&x)?.relu()?;
        let x = self.dropout.forward(&x, train)?;

        let out_x = self.head_x.forward(&x)?;
        let out_y = self.head_y.forward(&x)?;
        let out = Tensor::cat(&[&out_x, &out_y], 1)?;

        match self.activation {
            HeadActivation::Sigmoid => candle_nn::ops::sigmoid(&out),
            HeadActivation::Linear => Ok(out),
        }
    }
}
