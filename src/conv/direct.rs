use crate::config::KERNEL;
use crate::tensor::{Bias, FeatureMap, KernelWeights};

/// Direct 3x3, stride-1 convolution (brute-force reference).
///
/// Input is already padded; output is `(h - 2) x (w - 2)`. Shapes are assumed consistent.
pub fn conv2d_direct(input: &FeatureMap, weights: &KernelWeights, bias: &Bias) -> FeatureMap {
    debug_assert_eq!(input.c, weights.in_channels);
    debug_assert_eq!(bias.len(), weights.out_channels);

    let out_h = input.h.saturating_sub(KERNEL - 1);
    let out_w = input.w.saturating_sub(KERNEL - 1);
    let mut output = FeatureMap::new(weights.out_channels, out_h, out_w);

    for oc in 0..weights.out_channels {
        for oh in 0..out_h {
            for ow in 0..out_w {
                let mut sum = 0.0f32;
                for ic in 0..input.c {
                    for kh in 0..KERNEL {
                        for kw in 0..KERNEL {
                            sum += input.get(ic, oh + kh, ow + kw) * weights.get(oc, ic, kh, kw);
                        }
                    }
                }
                output.set(oc, oh, ow, sum + bias.get(oc));
            }
        }
    }
    output
}
