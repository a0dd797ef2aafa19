//! Visual signal chain: motion extraction and breathing estimation.

pub mod breathing;
pub mod motion;

pub use breathing::{BreathingAnalysis, BreathingConfig, BreathingEstimator};
pub use motion::{motion_magnitude, Frame};
