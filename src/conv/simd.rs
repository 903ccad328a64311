//! Fixed-width lane micro-kernels.
//!
//! Written as plain fixed-size loops so the compiler can keep each 16-lane
//! block in vector registers; there is no target-specific code here.

use super::winograd::IC_LANES;

// ── FP32 16-lane dot product: sum(a[0..16] * b[0..16]) ──

#[inline]
pub fn dot16(a: &[f32], b: &[f32]) -> f32 {
    let mut prod = [0.0f32; IC_LANES];
    for (p, (x, y)) in prod.iter_mut().zip(a[..IC_LANES].iter().zip(&b[..IC_LANES])) {
        *p = x * y;
    }
    // pairwise reduction 16 -> 8 -> 4 -> 2 -> 1
    let mut width = IC_LANES / 2;
    while width > 0 {
        for j in 0..width {
            prod[j] += prod[j + width];
        }
        width /= 2;
    }
    prod[0]
}

// ── FP32 16-lane dot product accumulated over `blocks` strided blocks ──

/// `sum_k dot16(a[k * a_stride..], b[k * b_stride..])` for `k in 0..blocks`.
#[inline]
pub fn dot16_strided(a: &[f32], a_stride: usize, b: &[f32], b_stride: usize, blocks: usize) -> f32 {
    let mut sum = 0.0f32;
    for k in 0..blocks {
        sum += dot16(&a[k * a_stride..], &b[k * b_stride..]);
    }
    sum
}
