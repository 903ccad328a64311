//! Unrolled Winograd F(2x2, 3x3) transforms.
//!
//! The scalar forms work on one channel. The weight packer calls
//! [`transform_filter`] directly; [`transform_input`] and [`transform_output`] are the
//! single-channel reference forms of [`transform_input_slab`] and
//! [`transform_output_block`], which apply the same arithmetic to a fixed number of
//! channel lanes at once with the lane as the innermost index.

/// Channels processed together by the input transform.
pub const IC_LANES: usize = 16;
/// Output channels processed together by combine and the output transform.
pub const OC_LANES: usize = 4;

/// Transform a 3x3 filter tile using G * g * G^T.
/// G is 4x3, g is 3x3, result U is 4x4.
#[inline]
pub fn transform_filter(g: &[f32; 9]) -> [f32; 16] {
    // G matrix for F(2x2, 3x3):
    // [ 1     0     0   ]
    // [ 1/2   1/2   1/2 ]
    // [ 1/2  -1/2   1/2 ]
    // [ 0     0     1   ]
    let mut tmp = [0.0f32; 12]; // 4x3
    for j in 0..3 {
        let g0 = g[j];
        let g1 = g[3 + j];
        let g2 = g[6 + j];
        tmp[j] = g0;
        tmp[3 + j] = (g0 + g1 + g2) * 0.5;
        tmp[6 + j] = (g0 - g1 + g2) * 0.5;
        tmp[9 + j] = g2;
    }
    let mut u = [0.0f32; 16];
    for i in 0..4 {
        let t0 = tmp[i * 3];
        let t1 = tmp[i * 3 + 1];
        let t2 = tmp[i * 3 + 2];
        u[i * 4] = t0;
        u[i * 4 + 1] = (t0 + t1 + t2) * 0.5;
        u[i * 4 + 2] = (t0 - t1 + t2) * 0.5;
        u[i * 4 + 3] = t2;
    }
    u
}

/// Transform a 4x4 input tile using B^T * d * B.
///
/// Single-channel form; the tiled path uses [`transform_input_slab`].
#[inline]
pub fn transform_input(d: &[f32; 16]) -> [f32; 16] {
    // B^T matrix for F(2x2, 3x3):
    // [ 1   0  -1   0 ]
    // [ 0   1   1   0 ]
    // [ 0  -1   1   0 ]
    // [ 0   1   0  -1 ]
    let mut tmp = [0.0f32; 16];
    for j in 0..4 {
        let d0 = d[j];
        let d1 = d[4 + j];
        let d2 = d[8 + j];
        let d3 = d[12 + j];
        tmp[j] = d0 - d2;
        tmp[4 + j] = d1 + d2;
        tmp[8 + j] = -d1 + d2;
        tmp[12 + j] = d1 - d3;
    }
    let mut v = [0.0f32; 16];
    for i in 0..4 {
        let t0 = tmp[i * 4];
        let t1 = tmp[i * 4 + 1];
        let t2 = tmp[i * 4 + 2];
        let t3 = tmp[i * 4 + 3];
        v[i * 4] = t0 - t2;
        v[i * 4 + 1] = t1 + t2;
        v[i * 4 + 2] = -t1 + t2;
        v[i * 4 + 3] = t1 - t3;
    }
    v
}

/// `transform_input` over 16 channel lanes. `d[cell][lane]`, cells row-major over the 4x4 patch.
pub fn transform_input_slab(d: &[[f32; IC_LANES]; 16]) -> [[f32; IC_LANES]; 16] {
    let mut tmp = [[0.0f32; IC_LANES]; 16];
    for j in 0..4 {
        for c in 0..IC_LANES {
            let d0 = d[j][c];
            let d1 = d[4 + j][c];
            let d2 = d[8 + j][c];
            let d3 = d[12 + j][c];
            tmp[j][c] = d0 - d2;
            tmp[4 + j][c] = d1 + d2;
            tmp[8 + j][c] = -d1 + d2;
            tmp[12 + j][c] = d1 - d3;
        }
    }
    let mut v = [[0.0f32; IC_LANES]; 16];
    for i in 0..4 {
        for c in 0..IC_LANES {
            let t0 = tmp[i * 4][c];
            let t1 = tmp[i * 4 + 1][c];
            let t2 = tmp[i * 4 + 2][c];
            let t3 = tmp[i * 4 + 3][c];
            v[i * 4][c] = t0 - t2;
            v[i * 4 + 1][c] = t1 + t2;
            v[i * 4 + 2][c] = -t1 + t2;
            v[i * 4 + 3][c] = t1 - t3;
        }
    }
    v
}

/// Inverse transform: A^T * m * A, producing 2x2 output from 4x4.
///
/// Single-channel form; the tiled path uses [`transform_output_block`].
#[inline]
pub fn transform_output(m: &[f32; 16]) -> [f32; 4] {
    // A^T matrix for F(2x2, 3x3):
    // [ 1  1  1  0 ]
    // [ 0  1 -1 -1 ]
    let mut tmp = [0.0f32; 8]; // 2x4
    for j in 0..4 {
        let m0 = m[j];
        let m1 = m[4 + j];
        let m2 = m[8 + j];
        let m3 = m[12 + j];
        tmp[j] = m0 + m1 + m2;
        tmp[4 + j] = m1 - m2 - m3;
    }
    let mut out = [0.0f32; 4];
    for i in 0..2 {
        let t0 = tmp[i * 4];
        let t1 = tmp[i * 4 + 1];
        let t2 = tmp[i * 4 + 2];
        let t3 = tmp[i * 4 + 3];
        out[i * 2] = t0 + t1 + t2;
        out[i * 2 + 1] = t1 - t2 - t3;
    }
    out
}

/// `transform_output` over 4 output-channel lanes. `m[position][lane]` in, `[pixel][lane]` out,
/// pixels row-major over the 2x2 tile.
pub fn transform_output_block(m: &[[f32; OC_LANES]; 16]) -> [[f32; OC_LANES]; 4] {
    let mut tmp = [[0.0f32; OC_LANES]; 8];
    for j in 0..4 {
        for c in 0..OC_LANES {
            let m0 = m[j][c];
            let m1 = m[4 + j][c];
            let m2 = m[8 + j][c];
            let m3 = m[12 + j][c];
            tmp[j][c] = m0 + m1 + m2;
            tmp[4 + j][c] = m1 - m2 - m3;
        }
    }
    let mut out = [[0.0f32; OC_LANES]; 4];
    for i in 0..2 {
        for c in 0..OC_LANES {
            let t0 = tmp[i * 4][c];
            let t1 = tmp[i * 4 + 1][c];
            let t2 = tmp[i * 4 + 2][c];
            let t3 = tmp[i * 4 + 3][c];
            out[i * 2][c] = t0 + t1 + t2;
            out[i * 2 + 1][c] = t1 - t2 - t3;
        }
    }
    out
}
