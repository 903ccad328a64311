use std::fmt;

use crate::error::{Result, WinogradError};

/// A 3D floating-point tensor for a single batch element.
///
/// Layout is CHW (channels, height, width), row-major.
#[derive(Clone, PartialEq)]
pub struct FeatureMap {
    pub c: usize,
    pub h: usize,
    pub w: usize,
    data: Vec<f32>,
}

impl FeatureMap {
    pub fn new(c: usize, h: usize, w: usize) -> Self {
        FeatureMap {
            c,
            h,
            w,
            data: vec![0.0; c * h * w],
        }
    }

    /// Wrap an existing CHW buffer. Fails if `data` does not hold exactly `c * h * w` values.
    pub fn from_vec(c: usize, h: usize, w: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != c * h * w {
            return Err(WinogradError::shape(
                "feature map data",
                format!("{} values ({}x{}x{})", c * h * w, c, h, w),
                format!("{} values", data.len()),
            ));
        }
        Ok(FeatureMap { c, h, w, data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn fill(&mut self, val: f32) {
        self.data.fill(val);
    }

    #[inline]
    fn index(&self, c: usize, h: usize, w: usize) -> usize {
        c * self.h * self.w + h * self.w + w
    }

    pub fn get(&self, c: usize, h: usize, w: usize) -> f32 {
        self.data[self.index(c, h, w)]
    }

    pub fn set(&mut self, c: usize, h: usize, w: usize, val: f32) {
        let idx = self.index(c, h, w);
        self.data[idx] = val;
    }

    pub fn add(&mut self, c: usize, h: usize, w: usize, val: f32) {
        let idx = self.index(c, h, w);
        self.data[idx] += val;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Largest absolute elementwise difference against `other` (same shape assumed).
    pub fn max_abs_diff(&self, other: &FeatureMap) -> f32 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max)
    }

    /// Largest elementwise `|self - other| / max(|other|, 1)`, with `other` as the reference.
    pub fn max_rel_diff(&self, other: &FeatureMap) -> f32 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b).abs() / b.abs().max(1.0))
            .fold(0.0f32, f32::max)
    }
}

impl fmt::Display for FeatureMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.c, self.h, self.w)
    }
}

impl fmt::Debug for FeatureMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeatureMap({})", self)
    }
}
