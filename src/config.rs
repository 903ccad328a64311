use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::conv::ConvAlgorithm;
use crate::error::{Result, WinogradError};

/// Spatial padding applied around the input. Fixed: F(2x2, 3x3) with "same" output.
pub const PAD: usize = 1;
/// Kernel height and width.
pub const KERNEL: usize = 3;

/// What to do when a stage produces NaN or infinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericCheck {
    /// Do not scan buffers.
    Off,
    /// Log the first offending value and keep going.
    #[default]
    Warn,
    /// Fail the call with [`WinogradError::NumericAnomaly`].
    Error,
}

/// Shape and policy of one convolution.
///
/// `height` and `width` are the *unpadded* input extents; the core expects the input
/// already padded by [`PAD`] on every border and produces a `height x width` output.
///
/// ```
/// use winoconv::config::ConvConfig;
///
/// let config = ConvConfig::default();
/// assert_eq!(config.padded_height(), 6);
/// assert_eq!(config.out_height(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvConfig {
    pub in_channels: usize,
    pub out_channels: usize,
    pub height: usize,
    pub width: usize,
    pub algorithm: ConvAlgorithm,
    pub numeric_check: NumericCheck,
}

impl Default for ConvConfig {
    fn default() -> Self {
        ConvConfig {
            in_channels: 16,
            out_channels: 16,
            height: 4,
            width: 4,
            algorithm: ConvAlgorithm::Tiled,
            numeric_check: NumericCheck::Warn,
        }
    }
}

impl ConvConfig {
    pub fn new(in_channels: usize, out_channels: usize, height: usize, width: usize) -> Self {
        ConvConfig {
            in_channels,
            out_channels,
            height,
            width,
            ..ConvConfig::default()
        }
    }

    /// Read a JSON config file. Missing fields take their default values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: ConvConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let dims = [
            ("in_channels", self.in_channels),
            ("out_channels", self.out_channels),
            ("height", self.height),
            ("width", self.width),
        ];
        for (name, value) in dims {
            if value == 0 {
                return Err(WinogradError::InvalidConfig(format!("{} must be non-zero", name)));
            }
        }
        Ok(())
    }

    pub fn padded_height(&self) -> usize {
        self.height + 2 * PAD
    }

    pub fn padded_width(&self) -> usize {
        self.width + 2 * PAD
    }

    pub fn out_height(&self) -> usize {
        self.padded_height() - KERNEL + 1
    }

    pub fn out_width(&self) -> usize {
        self.padded_width() - KERNEL + 1
    }

    pub fn input_len(&self) -> usize {
        self.in_channels * self.padded_height() * self.padded_width()
    }

    pub fn weight_len(&self) -> usize {
        self.out_channels * self.in_channels * KERNEL * KERNEL
    }

    pub fn output_len(&self) -> usize {
        self.out_channels * self.out_height() * self.out_width()
    }
}
