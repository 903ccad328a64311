/// Benchmarking utilities for comparing the convolution algorithms.
pub mod benchmark;
