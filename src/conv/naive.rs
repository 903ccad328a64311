use super::matrices::{filter_dense, input_dense, output_dense};
use crate::tensor::{Bias, FeatureMap, KernelWeights};

/// Reference Winograd F(2x2, 3x3) convolution.
///
/// One output channel and one 2x2 tile at a time, one input channel at a time, with
/// `U = G g G^T`, `V = B^T d B` and `Y = A^T (U . V) A` computed as dense matrix products
/// against the unpacked CHW tensors. Input is already padded; patch cells past the input
/// and tile pixels past the output (odd extents) are treated as zero and dropped.
pub fn conv2d_winograd_naive(input: &FeatureMap, weights: &KernelWeights, bias: &Bias) -> FeatureMap {
    debug_assert_eq!(input.c, weights.in_channels);
    debug_assert_eq!(bias.len(), weights.out_channels);

    let out_h = input.h.saturating_sub(2);
    let out_w = input.w.saturating_sub(2);
    let mut output = FeatureMap::new(weights.out_channels, out_h, out_w);

    for oc in 0..weights.out_channels {
        for th in (0..out_h).step_by(2) {
            for tw in (0..out_w).step_by(2) {
                let mut acc = [[bias.get(oc); 2]; 2];

                for ic in 0..input.c {
                    let u = filter_dense(&kernel_3x3(weights, oc, ic));
                    let v = input_dense(&patch_4x4(input, ic, th, tw));

                    let mut m = [[0.0f32; 4]; 4];
                    for i in 0..4 {
                        for j in 0..4 {
                            m[i][j] = u[i][j] * v[i][j];
                        }
                    }

                    let y = output_dense(&m);
                    for i in 0..2 {
                        for j in 0..2 {
                            acc[i][j] += y[i][j];
                        }
                    }
                }

                for dy in 0..2 {
                    for dx in 0..2 {
                        let (oh, ow) = (th + dy, tw + dx);
                        if oh < out_h && ow < out_w {
                            output.set(oc, oh, ow, acc[dy][dx]);
                        }
                    }
                }
            }
        }
    }
    output
}

fn kernel_3x3(weights: &KernelWeights, oc: usize, ic: usize) -> [[f32; 3]; 3] {
    let mut g = [[0.0f32; 3]; 3];
    for (kh, row) in g.iter_mut().enumerate() {
        for (kw, val) in row.iter_mut().enumerate() {
            *val = weights.get(oc, ic, kh, kw);
        }
    }
    g
}

fn patch_4x4(input: &FeatureMap, ic: usize, y: usize, x: usize) -> [[f32; 4]; 4] {
    let mut d = [[0.0f32; 4]; 4];
    for (r, row) in d.iter_mut().enumerate() {
        for (c, val) in row.iter_mut().enumerate() {
            let (ih, iw) = (y + r, x + c);
            if ih < input.h && iw < input.w {
                *val = input.get(ic, ih, iw);
            }
        }
    }
    d
}
