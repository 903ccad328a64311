//! Transform matrices for Winograd F(2x2, 3x3) and the small dense products used with them.
//!
//! Each pair is stored in both orientations so the dense products read row-major on both sides.

/// Filter transform, 4x3.
pub const G: [[f32; 3]; 4] = [
    [1.0, 0.0, 0.0],
    [0.5, 0.5, 0.5],
    [0.5, -0.5, 0.5],
    [0.0, 0.0, 1.0],
];

/// Filter transform (right side), 3x4.
pub const GT: [[f32; 4]; 3] = [
    [1.0, 0.5, 0.5, 0.0],
    [0.0, 0.5, -0.5, 0.0],
    [0.0, 0.5, 0.5, 1.0],
];

/// Input transform (left side), 4x4.
pub const BT: [[f32; 4]; 4] = [
    [1.0, 0.0, -1.0, 0.0],
    [0.0, 1.0, 1.0, 0.0],
    [0.0, -1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0, -1.0],
];

/// Input transform (right side), 4x4.
pub const B: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, -1.0, 1.0],
    [-1.0, 1.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, -1.0],
];

/// Output transform (left side), 2x4.
pub const AT: [[f32; 4]; 2] = [
    [1.0, 1.0, 1.0, 0.0],
    [0.0, 1.0, -1.0, -1.0],
];

/// Output transform (right side), 4x2.
pub const A: [[f32; 2]; 4] = [
    [1.0, 0.0],
    [1.0, 1.0],
    [1.0, -1.0],
    [0.0, -1.0],
];

/// Dense `R x K` times `K x C` product.
pub fn matmul<const R: usize, const K: usize, const C: usize>(
    lhs: &[[f32; K]; R],
    rhs: &[[f32; C]; K],
) -> [[f32; C]; R] {
    let mut out = [[0.0f32; C]; R];
    for i in 0..R {
        for j in 0..C {
            let mut acc = 0.0f32;
            for k in 0..K {
                acc += lhs[i][k] * rhs[k][j];
            }
            out[i][j] = acc;
        }
    }
    out
}

/// `G * g * GT` by dense products.
pub fn filter_dense(g: &[[f32; 3]; 3]) -> [[f32; 4]; 4] {
    matmul(&matmul(&G, g), &GT)
}

/// `BT * d * B` by dense products.
pub fn input_dense(d: &[[f32; 4]; 4]) -> [[f32; 4]; 4] {
    matmul(&matmul(&BT, d), &B)
}

/// `AT * m * A` by dense products.
pub fn output_dense(m: &[[f32; 4]; 4]) -> [[f32; 2]; 2] {
    matmul(&matmul(&AT, m), &A)
}
