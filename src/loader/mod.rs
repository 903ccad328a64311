//! Tensor sources and sinks.
//!
//! The convolution core never touches storage; the pipeline pulls operands from a
//! [`TensorSource`] and pushes the result into a [`TensorSink`].

mod memory;
mod text;

use std::fmt;

pub use memory::MemoryTensors;
pub use text::{parse_tensor_text, TextFormat, TextTensorFiles};

use crate::error::Result;

/// Which operand of the convolution a tensor is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorRole {
    Input,
    Weight,
    Bias,
    Output,
}

impl fmt::Display for TensorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorRole::Input => write!(f, "input"),
            TensorRole::Weight => write!(f, "weight"),
            TensorRole::Bias => write!(f, "bias"),
            TensorRole::Output => write!(f, "output"),
        }
    }
}

pub trait TensorSource {
    /// Load the dense values of `role`; fails unless exactly `expected_len` values are present.
    fn load_tensor(&mut self, role: TensorRole, expected_len: usize) -> Result<Vec<f32>>;
}

pub trait TensorSink {
    fn write_tensor(&mut self, role: TensorRole, data: &[f32]) -> Result<()>;
}
