use std::fmt;

use crate::config::KERNEL;
use crate::error::{Result, WinogradError};

/// Convolution weights in OIHW layout with a fixed 3x3 spatial extent.
#[derive(Clone, PartialEq)]
pub struct KernelWeights {
    pub out_channels: usize,
    pub in_channels: usize,
    data: Vec<f32>,
}

impl KernelWeights {
    pub fn new(out_channels: usize, in_channels: usize) -> Self {
        KernelWeights {
            out_channels,
            in_channels,
            data: vec![0.0; out_channels * in_channels * KERNEL * KERNEL],
        }
    }

    pub fn from_vec(out_channels: usize, in_channels: usize, data: Vec<f32>) -> Result<Self> {
        let expected = out_channels * in_channels * KERNEL * KERNEL;
        if data.len() != expected {
            return Err(WinogradError::shape(
                "kernel weights",
                format!("{} values ({}x{}x3x3)", expected, out_channels, in_channels),
                format!("{} values", data.len()),
            ));
        }
        Ok(KernelWeights {
            out_channels,
            in_channels,
            data,
        })
    }

    #[inline]
    fn base(&self, oc: usize, ic: usize) -> usize {
        (oc * self.in_channels + ic) * KERNEL * KERNEL
    }

    /// The 3x3 slice for one (output, input) channel pair, row-major.
    pub fn kernel(&self, oc: usize, ic: usize) -> [f32; 9] {
        let base = self.base(oc, ic);
        let mut g = [0.0f32; 9];
        g.copy_from_slice(&self.data[base..base + 9]);
        g
    }

    pub fn get(&self, oc: usize, ic: usize, kh: usize, kw: usize) -> f32 {
        self.data[self.base(oc, ic) + kh * KERNEL + kw]
    }

    pub fn set(&mut self, oc: usize, ic: usize, kh: usize, kw: usize, val: f32) {
        let idx = self.base(oc, ic) + kh * KERNEL + kw;
        self.data[idx] = val;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

impl fmt::Debug for KernelWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KernelWeights({}x{}x3x3)", self.out_channels, self.in_channels)
    }
}

/// Per-output-channel bias.
#[derive(Debug, Clone, PartialEq)]
pub struct Bias {
    values: Vec<f32>,
}

impl Bias {
    pub fn zeros(out_channels: usize) -> Self {
        Bias {
            values: vec![0.0; out_channels],
        }
    }

    pub fn from_vec(values: Vec<f32>) -> Self {
        Bias { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, oc: usize) -> f32 {
        self.values[oc]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}
