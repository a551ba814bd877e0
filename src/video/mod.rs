//! Synthetic video sources.

pub mod gradient;

pub use gradient::GradientPattern;
