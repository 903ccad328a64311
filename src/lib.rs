//! Winograd F(2x2, 3x3) convolution in Rust.
//!
//! This crate computes a 3x3, stride-1, pad-1 convolution three ways: a direct
//! brute-force loop, a naive per-tile Winograd reference, and a tiled Winograd path
//! that packs the transformed weights and inputs into channel blocks (16 input
//! channels, 4 output channels) so the reduction over input channels runs in
//! fixed-width lanes. All three agree to within floating-point tolerance.
//!
//! # Example
//!
//! ```
//! use winoconv::config::ConvConfig;
//! use winoconv::conv::convolve;
//! use winoconv::metrics::benchmark::random_operands;
//!
//! let config = ConvConfig::default();
//! let ops = random_operands(&config, 7);
//! let out = convolve(&config, &ops.input, &ops.weights, &ops.bias).unwrap();
//! assert_eq!((out.c, out.h, out.w), (16, 4, 4));
//! ```

/// Convolution shapes and numeric policy.
pub mod config;
/// Convolution algorithm implementations.
pub mod conv;
/// Error type and result alias.
pub mod error;
/// Tensor sources and sinks (text files, memory).
pub mod loader;
/// Benchmarking utilities.
pub mod metrics;
/// Load, pad, convolve, write.
pub mod pipeline;
/// FP32 feature maps, kernel weights, bias and layout helpers.
pub mod tensor;

pub use error::{Result, WinogradError};
