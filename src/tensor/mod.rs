mod feature_map;
mod kernel;
pub mod layout;

pub use feature_map::FeatureMap;
pub use kernel::{Bias, KernelWeights};
