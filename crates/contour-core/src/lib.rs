//! Contour Core - Signal equalizer engine: EQ pipeline, playback clock, mixer

pub mod config;
pub mod eq;
pub mod mixer;
pub mod playback;
pub mod remote;
pub mod types;

pub use types::*;
