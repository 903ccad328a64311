//! Padding and channel-first / channel-last conversion.
//!
//! These run before and after the convolution core; the core itself never pads.

use super::FeatureMap;
use crate::conv::packing::alloc_zeroed;
use crate::error::{Result, WinogradError};

/// Pads a feature map with zeros on all spatial borders.
pub fn pad_zero(input: &FeatureMap, pad: usize) -> FeatureMap {
    if pad == 0 {
        return input.clone();
    }
    let mut padded = FeatureMap::new(input.c, input.h + 2 * pad, input.w + 2 * pad);
    for ch in 0..input.c {
        for h in 0..input.h {
            for w in 0..input.w {
                padded.set(ch, h + pad, w + pad, input.get(ch, h, w));
            }
        }
    }
    padded
}

/// Strips `pad` rows and columns from every border.
pub fn crop(input: &FeatureMap, pad: usize) -> Result<FeatureMap> {
    if input.h < 2 * pad || input.w < 2 * pad {
        return Err(WinogradError::shape(
            "crop input",
            format!("at least {}x{} spatial", 2 * pad, 2 * pad),
            format!("{}x{}", input.h, input.w),
        ));
    }
    let mut out = FeatureMap::new(input.c, input.h - 2 * pad, input.w - 2 * pad);
    for ch in 0..out.c {
        for h in 0..out.h {
            for w in 0..out.w {
                out.set(ch, h, w, input.get(ch, h + pad, w + pad));
            }
        }
    }
    Ok(out)
}

/// CHW -> HWC.
pub fn to_channel_last(input: &FeatureMap) -> Result<Vec<f32>> {
    let (c, h, w) = (input.c, input.h, input.w);
    let src = input.as_slice();
    let mut dst = alloc_zeroed(src.len())?;
    for ch in 0..c {
        for y in 0..h {
            for x in 0..w {
                dst[y * w * c + x * c + ch] = src[ch * h * w + y * w + x];
            }
        }
    }
    Ok(dst)
}

/// HWC -> CHW.
pub fn from_channel_last(c: usize, h: usize, w: usize, src: &[f32]) -> Result<FeatureMap> {
    if src.len() != c * h * w {
        return Err(WinogradError::shape(
            "channel-last buffer",
            format!("{} values ({}x{}x{})", c * h * w, h, w, c),
            format!("{} values", src.len()),
        ));
    }
    let mut dst = alloc_zeroed(src.len())?;
    for y in 0..h {
        for x in 0..w {
            for ch in 0..c {
                dst[ch * h * w + y * w + x] = src[y * w * c + x * c + ch];
            }
        }
    }
    FeatureMap::from_vec(c, h, w, dst)
}
