//! Packed buffers for the tiled Winograd path.
//!
//! Weights: `[oc_block][position][ic_block][oc_lane][ic_lane]`, with 4 output lanes
//! and 16 input lanes per block. Input: `[sub_tile][position][ic]` with `ic`
//! rounded up to a multiple of 16. Hadamard: `[position][sub_tile][oc_lane]`.
//! Entries for channels past the true counts are always zero.

use std::mem::size_of;

use super::winograd::{transform_filter, transform_input_slab, IC_LANES, OC_LANES};
use crate::error::{Result, WinogradError};
use crate::tensor::KernelWeights;

/// Domain positions of the 4x4 Winograd tile.
pub const POSITIONS: usize = 16;
/// 2x2 output tiles per 4x4 tile group.
pub const SUB_TILES: usize = 4;

const OC_LANE_STRIDE: usize = IC_LANES;
const IC_BLOCK_STRIDE: usize = OC_LANES * IC_LANES;

#[inline]
pub fn round_up(n: usize, multiple: usize) -> usize {
    n.div_ceil(multiple) * multiple
}

/// Zeroed scratch buffer; fails instead of aborting when the allocator refuses.
pub fn alloc_zeroed(len: usize) -> Result<Vec<f32>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| WinogradError::Allocation {
        bytes: len.saturating_mul(size_of::<f32>()),
    })?;
    buf.resize(len, 0.0);
    Ok(buf)
}

/// Block counts of the packed weight buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightLayout {
    pub oc_blocks: usize,
    pub ic_blocks: usize,
}

impl WeightLayout {
    pub fn new(out_channels: usize, in_channels: usize) -> Self {
        WeightLayout {
            oc_blocks: out_channels.div_ceil(OC_LANES),
            ic_blocks: in_channels.div_ceil(IC_LANES),
        }
    }

    pub fn len(&self) -> usize {
        self.oc_blocks * POSITIONS * self.ic_blocks * IC_BLOCK_STRIDE
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offset of `U[oc][ic][row][col]` where `oc = oc_block * 4 + oc_offset` and
    /// `ic = ic_block * 16 + ic_offset`. Every reader and writer of packed weights goes through here.
    #[inline]
    pub fn pack_index(
        &self,
        oc_block: usize,
        oc_offset: usize,
        ic_block: usize,
        ic_offset: usize,
        row: usize,
        col: usize,
    ) -> usize {
        debug_assert!(oc_block < self.oc_blocks && ic_block < self.ic_blocks);
        debug_assert!(oc_offset < OC_LANES && ic_offset < IC_LANES && row < 4 && col < 4);
        let position = row * 4 + col;
        ((oc_block * POSITIONS + position) * self.ic_blocks + ic_block) * IC_BLOCK_STRIDE
            + oc_offset * OC_LANE_STRIDE
            + ic_offset
    }
}

/// Transformed weights `U = G g G^T` for every (oc, ic) pair, packed for [`combine`](super::combine).
#[derive(Debug, Clone)]
pub struct PackedWeights {
    layout: WeightLayout,
    out_channels: usize,
    in_channels: usize,
    data: Vec<f32>,
}

impl PackedWeights {
    pub fn pack(weights: &KernelWeights) -> Result<Self> {
        let layout = WeightLayout::new(weights.out_channels, weights.in_channels);
        let mut data = alloc_zeroed(layout.len())?;

        let oc_r4 = layout.oc_blocks * OC_LANES;
        let ic_r16 = layout.ic_blocks * IC_LANES;
        for oc in 0..oc_r4 {
            let (oc_block, oc_offset) = (oc / OC_LANES, oc % OC_LANES);
            for ic in 0..ic_r16 {
                let (ic_block, ic_offset) = (ic / IC_LANES, ic % IC_LANES);
                let u = if oc < weights.out_channels && ic < weights.in_channels {
                    transform_filter(&weights.kernel(oc, ic))
                } else {
                    [0.0f32; POSITIONS]
                };
                for (position, &val) in u.iter().enumerate() {
                    let idx = layout.pack_index(oc_block, oc_offset, ic_block, ic_offset, position / 4, position % 4);
                    data[idx] = val;
                }
            }
        }
        let finite_weights = weights.as_slice().iter().all(|v| v.is_finite());
        debug_assert!(
            !finite_weights || data.iter().all(|v| v.is_finite()),
            "weight transform produced non-finite values from finite weights"
        );

        Ok(PackedWeights {
            layout,
            out_channels: weights.out_channels,
            in_channels: weights.in_channels,
            data,
        })
    }

    pub fn layout(&self) -> WeightLayout {
        self.layout
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    /// `U[oc][ic]` at domain cell (`row`, `col`), padding included.
    pub fn get(&self, oc: usize, ic: usize, row: usize, col: usize) -> f32 {
        let idx = self.layout.pack_index(oc / OC_LANES, oc % OC_LANES, ic / IC_LANES, ic % IC_LANES, row, col);
        self.data[idx]
    }

    /// All input blocks of one output block at one domain position: `[ic_block][oc_lane][ic_lane]`.
    pub fn panel(&self, oc_block: usize, position: usize) -> &[f32] {
        let start = self.layout.pack_index(oc_block, 0, 0, 0, position / 4, position % 4);
        &self.data[start..start + self.layout.ic_blocks * IC_BLOCK_STRIDE]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Transformed input `V = B^T d B` for the four sub-tiles of one tile group.
#[derive(Debug, Clone)]
pub struct PackedInput {
    ic_r16: usize,
    data: Vec<f32>,
}

impl PackedInput {
    pub fn zeroed(in_channels: usize) -> Result<Self> {
        let ic_r16 = round_up(in_channels, IC_LANES);
        Ok(PackedInput {
            ic_r16,
            data: alloc_zeroed(SUB_TILES * POSITIONS * ic_r16)?,
        })
    }

    pub fn padded_channels(&self) -> usize {
        self.ic_r16
    }

    #[inline]
    pub fn index(&self, sub_tile: usize, position: usize, ic: usize) -> usize {
        (sub_tile * POSITIONS + position) * self.ic_r16 + ic
    }

    /// Transform the 4x4 patch at (`y`, `x`) of a channel-last `in_h x in_w x in_c` input
    /// into `sub_tile`. Cells outside the input and channels past `in_c` read as zero.
    pub fn fill_tile(
        &mut self,
        sub_tile: usize,
        input: &[f32],
        in_c: usize,
        in_h: usize,
        in_w: usize,
        y: usize,
        x: usize,
    ) {
        for ic_base in (0..self.ic_r16).step_by(IC_LANES) {
            let lanes = in_c.saturating_sub(ic_base).min(IC_LANES);
            let mut d = [[0.0f32; IC_LANES]; POSITIONS];
            for r in 0..4 {
                let ih = y + r;
                if ih >= in_h {
                    break;
                }
                for c in 0..4 {
                    let iw = x + c;
                    if iw >= in_w {
                        break;
                    }
                    let src = (ih * in_w + iw) * in_c + ic_base;
                    d[r * 4 + c][..lanes].copy_from_slice(&input[src..src + lanes]);
                }
            }

            let v = transform_input_slab(&d);
            for (position, cell) in v.iter().enumerate() {
                let dst = self.index(sub_tile, position, ic_base);
                self.data[dst..dst + IC_LANES].copy_from_slice(cell);
            }
        }
    }

    /// Channel vector of one sub-tile at one domain position.
    pub fn lanes(&self, sub_tile: usize, position: usize) -> &[f32] {
        let start = self.index(sub_tile, position, 0);
        &self.data[start..start + self.ic_r16]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

/// Combine results for one (tile group, output block): `[position][sub_tile][oc_lane]`.
#[derive(Debug, Clone)]
pub struct HadamardBuffer {
    data: [f32; POSITIONS * SUB_TILES * OC_LANES],
}

impl Default for HadamardBuffer {
    fn default() -> Self {
        HadamardBuffer {
            data: [0.0; POSITIONS * SUB_TILES * OC_LANES],
        }
    }
}

impl HadamardBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn index(position: usize, sub_tile: usize, lane: usize) -> usize {
        (position * SUB_TILES + sub_tile) * OC_LANES + lane
    }

    pub fn get(&self, position: usize, sub_tile: usize, lane: usize) -> f32 {
        self.data[Self::index(position, sub_tile, lane)]
    }

    pub fn set(&mut self, position: usize, sub_tile: usize, lane: usize, val: f32) {
        self.data[Self::index(position, sub_tile, lane)] = val;
    }

    /// The `[position][oc_lane]` slice belonging to one sub-tile.
    pub fn sub_tile(&self, sub_tile: usize) -> [[f32; OC_LANES]; POSITIONS] {
        let mut m = [[0.0f32; OC_LANES]; POSITIONS];
        for (position, row) in m.iter_mut().enumerate() {
            let start = Self::index(position, sub_tile, 0);
            row.copy_from_slice(&self.data[start..start + OC_LANES]);
        }
        m
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}
