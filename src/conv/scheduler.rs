//! Tiled Winograd F(2x2, 3x3) convolution over packed buffers.
//!
//! Weights are transformed and packed once. Output is walked in 4x4 tile groups
//! (four 2x2 tiles): the group's input patches are transformed together, then for
//! every block of 4 output channels the Hadamard products are reduced over input
//! channels and inverse-transformed back into the output.

use log::{debug, trace};

use super::packing::{alloc_zeroed, HadamardBuffer, PackedInput, PackedWeights, POSITIONS, SUB_TILES};
use super::simd::dot16_strided;
use super::winograd::{transform_output_block, IC_LANES, OC_LANES};
use super::check_finite;
use crate::config::NumericCheck;
use crate::error::{Result, Stage, WinogradError};
use crate::tensor::layout::{from_channel_last, to_channel_last};
use crate::tensor::{Bias, FeatureMap, KernelWeights};

/// Output rows/columns covered by one tile group.
const GROUP: usize = 4;
/// Output rows/columns covered by one tile.
const TILE: usize = 2;

/// Extent of a channel-last output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputExtent {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl OutputExtent {
    pub fn len(&self) -> usize {
        self.height * self.width * self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reduce `U * V` over all (padded) input channels for one output block.
///
/// Writes every entry of `hadamard`.
pub fn combine(weights: &PackedWeights, input: &PackedInput, oc_block: usize, hadamard: &mut HadamardBuffer) {
    let ic_blocks = weights.layout().ic_blocks;
    debug_assert_eq!(ic_blocks * IC_LANES, input.padded_channels());
    for position in 0..POSITIONS {
        let panel = weights.panel(oc_block, position);
        for sub_tile in 0..SUB_TILES {
            let v = input.lanes(sub_tile, position);
            for lane in 0..OC_LANES {
                let sum = dot16_strided(
                    &panel[lane * IC_LANES..],
                    OC_LANES * IC_LANES,
                    v,
                    IC_LANES,
                    ic_blocks,
                );
                hadamard.set(position, sub_tile, lane, sum);
            }
        }
    }
}

/// Add a 2x2 tile for output channels `oc_base..oc_base + 4` at (`y`, `x`) into a
/// channel-last output. Rows, columns and channels outside `extent` are dropped.
pub fn scatter_tile(
    output: &mut [f32],
    extent: OutputExtent,
    oc_base: usize,
    y: usize,
    x: usize,
    tile: &[[f32; OC_LANES]; 4],
) {
    let rows = extent.height.saturating_sub(y).min(TILE);
    let cols = extent.width.saturating_sub(x).min(TILE);
    let lanes = extent.channels.saturating_sub(oc_base).min(OC_LANES);
    for dy in 0..rows {
        for dx in 0..cols {
            let base = ((y + dy) * extent.width + (x + dx)) * extent.channels + oc_base;
            let pixel = &tile[dy * TILE + dx];
            for lane in 0..lanes {
                output[base + lane] += pixel[lane];
            }
        }
    }
}

/// Add `bias[oc]` to every position of a channel-last output.
pub fn add_bias(output: &mut [f32], extent: OutputExtent, bias: &[f32]) {
    if extent.channels == 0 {
        return;
    }
    for pixel in output.chunks_exact_mut(extent.channels) {
        for (val, b) in pixel.iter_mut().zip(bias) {
            *val += b;
        }
    }
}

/// A convolution with its weights already transformed and packed.
///
/// Immutable once built; every [`forward`](Self::forward) call owns its scratch buffers.
#[derive(Debug, Clone)]
pub struct TiledConv {
    weights: PackedWeights,
    bias: Vec<f32>,
    numeric_check: NumericCheck,
}

impl TiledConv {
    pub fn new(weights: &KernelWeights, bias: &Bias, numeric_check: NumericCheck) -> Result<Self> {
        if bias.len() != weights.out_channels {
            return Err(WinogradError::shape("bias", weights.out_channels, bias.len()));
        }
        let packed = PackedWeights::pack(weights)?;
        check_finite(Stage::WeightTransform, packed.as_slice(), numeric_check)?;
        debug!(
            "packed {}x{} weights into {} oc blocks x {} ic blocks",
            weights.out_channels,
            weights.in_channels,
            packed.layout().oc_blocks,
            packed.layout().ic_blocks
        );
        Ok(TiledConv {
            weights: packed,
            bias: bias.as_slice().to_vec(),
            numeric_check,
        })
    }

    pub fn packed_weights(&self) -> &PackedWeights {
        &self.weights
    }

    /// Convolve a padded CHW input, returning CHW output.
    pub fn forward(&self, input: &FeatureMap) -> Result<FeatureMap> {
        if input.c != self.weights.in_channels() {
            return Err(WinogradError::shape("input channels", self.weights.in_channels(), input.c));
        }
        if input.h < 3 || input.w < 3 {
            return Err(WinogradError::shape("padded input", "at least 3x3", format!("{}x{}", input.h, input.w)));
        }
        let hwc = to_channel_last(input)?;
        let (out_h, out_w) = (input.h - 2, input.w - 2);
        let out = self.forward_hwc(&hwc, input.h, input.w)?;
        from_channel_last(self.weights.out_channels(), out_h, out_w, &out)
    }

    /// Convolve a padded HWC input of `in_h x in_w`, returning HWC output of `(in_h - 2) x (in_w - 2)`.
    pub fn forward_hwc(&self, input: &[f32], in_h: usize, in_w: usize) -> Result<Vec<f32>> {
        let in_c = self.weights.in_channels();
        if input.len() != in_h * in_w * in_c {
            return Err(WinogradError::shape("channel-last input", in_h * in_w * in_c, input.len()));
        }
        let extent = OutputExtent {
            height: in_h.saturating_sub(2),
            width: in_w.saturating_sub(2),
            channels: self.weights.out_channels(),
        };

        let mut output = alloc_zeroed(extent.len())?;
        let mut packed_input = PackedInput::zeroed(in_c)?;
        let mut hadamard = HadamardBuffer::new();

        let oc_blocks = self.weights.layout().oc_blocks;
        debug!(
            "tiling {}x{} output: {} tile groups x {} oc blocks",
            extent.height,
            extent.width,
            extent.height.div_ceil(GROUP) * extent.width.div_ceil(GROUP),
            oc_blocks
        );

        for oh in (0..extent.height).step_by(GROUP) {
            for ow in (0..extent.width).step_by(GROUP) {
                trace!("tile group at ({}, {})", oh, ow);
                for sub_tile in 0..SUB_TILES {
                    let (ht, wt) = (sub_tile / 2, sub_tile % 2);
                    packed_input.fill_tile(sub_tile, input, in_c, in_h, in_w, oh + ht * TILE, ow + wt * TILE);
                }
                check_finite(Stage::InputTransform, packed_input.as_slice(), self.numeric_check)?;

                for oc_block in 0..oc_blocks {
                    combine(&self.weights, &packed_input, oc_block, &mut hadamard);
                    check_finite(Stage::Combine, hadamard.as_slice(), self.numeric_check)?;

                    for sub_tile in 0..SUB_TILES {
                        let y = oh + (sub_tile / 2) * TILE;
                        let x = ow + (sub_tile % 2) * TILE;
                        if y >= extent.height || x >= extent.width {
                            continue;
                        }
                        let tile = transform_output_block(&hadamard.sub_tile(sub_tile));
                        scatter_tile(&mut output, extent, oc_block * OC_LANES, y, x, &tile);
                    }
                }
            }
        }

        add_bias(&mut output, extent, &self.bias);
        check_finite(Stage::OutputTransform, &output, self.numeric_check)?;
        Ok(output)
    }
}

/// Tiled Winograd convolution of a padded CHW input.
pub fn conv2d_winograd_tiled(
    input: &FeatureMap,
    weights: &KernelWeights,
    bias: &Bias,
    numeric_check: NumericCheck,
) -> Result<FeatureMap> {
    TiledConv::new(weights, bias, numeric_check)?.forward(input)
}
