//! End-to-end wiring: load operands, pad, convolve, write.

use log::info;

use crate::config::{ConvConfig, PAD};
use crate::conv::{conv2d, convolve, ConvAlgorithm};
use crate::error::{Result, WinogradError};
use crate::loader::{TensorRole, TensorSink, TensorSource};
use crate::tensor::layout::pad_zero;
use crate::tensor::{Bias, FeatureMap, KernelWeights};

/// The three operands of a convolution, input already padded.
#[derive(Debug, Clone)]
pub struct Operands {
    pub input: FeatureMap,
    pub weights: KernelWeights,
    pub bias: Bias,
}

/// Load operands shaped by `config`. An unpadded input (`padded == false`) is zero-padded here.
pub fn load_operands(source: &mut dyn TensorSource, config: &ConvConfig, padded: bool) -> Result<Operands> {
    config.validate()?;
    let input = if padded {
        let data = source.load_tensor(TensorRole::Input, config.input_len())?;
        FeatureMap::from_vec(config.in_channels, config.padded_height(), config.padded_width(), data)?
    } else {
        let len = config.in_channels * config.height * config.width;
        let data = source.load_tensor(TensorRole::Input, len)?;
        let raw = FeatureMap::from_vec(config.in_channels, config.height, config.width, data)?;
        pad_zero(&raw, PAD)
    };
    let weights = KernelWeights::from_vec(
        config.out_channels,
        config.in_channels,
        source.load_tensor(TensorRole::Weight, config.weight_len())?,
    )?;
    let bias = Bias::from_vec(source.load_tensor(TensorRole::Bias, config.out_channels)?);
    Ok(Operands { input, weights, bias })
}

/// Load, convolve with `config.algorithm`, and write the CHW result to `sink`.
pub fn run_pipeline(
    config: &ConvConfig,
    source: &mut dyn TensorSource,
    sink: &mut dyn TensorSink,
    padded: bool,
) -> Result<FeatureMap> {
    let ops = load_operands(source, config, padded)?;
    info!(
        "convolving {} input with {:?} using {} algorithm",
        ops.input, ops.weights, config.algorithm
    );
    let output = convolve(config, &ops.input, &ops.weights, &ops.bias)?;
    sink.write_tensor(TensorRole::Output, output.as_slice())?;
    info!("wrote {} output", output);
    Ok(output)
}

/// Default relative tolerance for [`verify_against_direct`].
pub const VERIFY_TOLERANCE: f32 = 1e-4;

/// Recompute `ops` with the direct convolution and compare `result` against it.
///
/// Each element may differ by `tolerance * max(|direct|, 1)`. Returns the largest
/// relative difference seen.
pub fn verify_against_direct(
    result: &FeatureMap,
    ops: &Operands,
    config: &ConvConfig,
    tolerance: f32,
) -> Result<f32> {
    let reference = conv2d(ConvAlgorithm::Direct, &ops.input, &ops.weights, &ops.bias, config.numeric_check)?;
    if (result.c, result.h, result.w) != (reference.c, reference.h, reference.w) {
        return Err(WinogradError::shape("verified output", &reference, result));
    }
    let diff = result.max_rel_diff(&reference);
    info!("max relative |{} - direct| = {:.3e}", config.algorithm, diff);
    if diff > tolerance {
        return Err(WinogradError::Verification {
            max_rel_diff: diff,
            tolerance,
        });
    }
    Ok(diff)
}
