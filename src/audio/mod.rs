//! Synthetic audio sources.

pub mod tone;

pub use tone::ToneGenerator;
