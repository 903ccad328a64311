//! Three ways to compute the same padded 3x3, stride-1 convolution:
//! direct (brute-force oracle), naive Winograd F(2x2, 3x3) (reference), and tiled
//! Winograd over packed channel blocks (the fast path).

mod direct;
pub mod matrices;
mod naive;
pub mod packing;
mod scheduler;
pub mod simd;
mod winograd;

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::{ConvConfig, NumericCheck, KERNEL};
use crate::error::{Result, Stage, WinogradError};
use crate::tensor::{Bias, FeatureMap, KernelWeights};

pub use direct::conv2d_direct;
pub use naive::conv2d_winograd_naive;
pub use packing::{HadamardBuffer, PackedInput, PackedWeights, WeightLayout};
pub use scheduler::{add_bias, combine, conv2d_winograd_tiled, scatter_tile, OutputExtent, TiledConv};
pub use winograd::{
    transform_filter, transform_input, transform_input_slab, transform_output, transform_output_block,
    IC_LANES, OC_LANES,
};

/// Selects which convolution algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvAlgorithm {
    /// Brute-force 3x3 loops (non-Winograd oracle).
    Direct,
    /// Per-tile, per-channel Winograd with dense transforms (reference).
    Naive,
    /// Packed, channel-blocked Winograd.
    #[default]
    Tiled,
}

impl fmt::Display for ConvAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvAlgorithm::Direct => write!(f, "direct"),
            ConvAlgorithm::Naive => write!(f, "naive"),
            ConvAlgorithm::Tiled => write!(f, "tiled"),
        }
    }
}

impl FromStr for ConvAlgorithm {
    type Err = WinogradError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(ConvAlgorithm::Direct),
            "naive" => Ok(ConvAlgorithm::Naive),
            "tiled" => Ok(ConvAlgorithm::Tiled),
            other => Err(WinogradError::InvalidConfig(format!("unknown algorithm '{}'", other))),
        }
    }
}

/// Scan `data` for NaN/infinity according to `policy`.
pub(crate) fn check_finite(stage: Stage, data: &[f32], policy: NumericCheck) -> Result<()> {
    if policy == NumericCheck::Off {
        return Ok(());
    }
    let Some((index, &value)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) else {
        return Ok(());
    };
    match policy {
        NumericCheck::Error => Err(WinogradError::NumericAnomaly { stage, index, value }),
        _ => {
            warn!("non-finite value {} at index {} after {}", value, index, stage);
            Ok(())
        }
    }
}

/// Dispatch convolution to the selected algorithm.
///
/// Input should already be padded. Shapes are only checked against each other;
/// use [`convolve`] to check them against a [`ConvConfig`].
pub fn conv2d(
    algorithm: ConvAlgorithm,
    input: &FeatureMap,
    weights: &KernelWeights,
    bias: &Bias,
    numeric_check: NumericCheck,
) -> Result<FeatureMap> {
    match algorithm {
        ConvAlgorithm::Direct => {
            check_operands(input, weights, bias)?;
            let out = conv2d_direct(input, weights, bias);
            check_finite(Stage::OutputTransform, out.as_slice(), numeric_check)?;
            Ok(out)
        }
        ConvAlgorithm::Naive => {
            check_operands(input, weights, bias)?;
            let out = conv2d_winograd_naive(input, weights, bias);
            check_finite(Stage::OutputTransform, out.as_slice(), numeric_check)?;
            Ok(out)
        }
        ConvAlgorithm::Tiled => conv2d_winograd_tiled(input, weights, bias, numeric_check),
    }
}

/// Validate the operands against `config`, then run `config.algorithm`.
///
/// Nothing is transformed unless every shape matches.
pub fn convolve(config: &ConvConfig, input: &FeatureMap, weights: &KernelWeights, bias: &Bias) -> Result<FeatureMap> {
    config.validate()?;
    let expected_input = (config.in_channels, config.padded_height(), config.padded_width());
    if (input.c, input.h, input.w) != expected_input {
        return Err(WinogradError::shape(
            "padded input",
            format!("{}x{}x{}", expected_input.0, expected_input.1, expected_input.2),
            input,
        ));
    }
    if (weights.out_channels, weights.in_channels) != (config.out_channels, config.in_channels) {
        return Err(WinogradError::shape(
            "weights",
            format!("{}x{}x{}x{}", config.out_channels, config.in_channels, KERNEL, KERNEL),
            format!("{:?}", weights),
        ));
    }
    if bias.len() != config.out_channels {
        return Err(WinogradError::shape("bias", config.out_channels, bias.len()));
    }
    conv2d(config.algorithm, input, weights, bias, config.numeric_check)
}

fn check_operands(input: &FeatureMap, weights: &KernelWeights, bias: &Bias) -> Result<()> {
    if input.c != weights.in_channels {
        return Err(WinogradError::shape("input channels", weights.in_channels, input.c));
    }
    if bias.len() != weights.out_channels {
        return Err(WinogradError::shape("bias", weights.out_channels, bias.len()));
    }
    if input.h < KERNEL || input.w < KERNEL {
        return Err(WinogradError::shape("padded input", "at least 3x3", format!("{}x{}", input.h, input.w)));
    }
    Ok(())
}
