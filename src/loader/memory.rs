use std::collections::HashMap;

use super::{TensorRole, TensorSink, TensorSource};
use crate::error::{Result, WinogradError};

/// Tensors held in memory, keyed by role.
#[derive(Debug, Clone, Default)]
pub struct MemoryTensors {
    tensors: HashMap<TensorRole, Vec<f32>>,
}

impl MemoryTensors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: TensorRole, data: Vec<f32>) -> Self {
        self.insert(role, data);
        self
    }

    pub fn insert(&mut self, role: TensorRole, data: Vec<f32>) {
        self.tensors.insert(role, data);
    }

    pub fn get(&self, role: TensorRole) -> Option<&[f32]> {
        self.tensors.get(&role).map(Vec::as_slice)
    }
}

impl TensorSource for MemoryTensors {
    fn load_tensor(&mut self, role: TensorRole, expected_len: usize) -> Result<Vec<f32>> {
        let data = self
            .tensors
            .get(&role)
            .ok_or_else(|| WinogradError::InvalidConfig(format!("no {} tensor present", role)))?;
        if data.len() != expected_len {
            return Err(WinogradError::shape(&role.to_string(), expected_len, data.len()));
        }
        Ok(data.clone())
    }
}

impl TensorSink for MemoryTensors {
    fn write_tensor(&mut self, role: TensorRole, data: &[f32]) -> Result<()> {
        self.tensors.insert(role, data.to_vec());
        Ok(())
    }
}
