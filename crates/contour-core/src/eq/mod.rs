//! Equalization - band gain construction and spectral application
//!
//! A set of [`BandSpec`]s is compiled into one [`GainVector`] (one gain per
//! non-negative-frequency bin), which is then applied to every short-time
//! spectrum frame with Hermitian symmetry preserved. The asynchronous
//! recompute sequencing lives in [`pipeline`].

pub mod bands;
pub mod pipeline;
pub mod spectral;

pub use bands::{BandSpec, BandWindow, GainVector};
pub use pipeline::{EqPipeline, PipelineError, RecomputeOutcome};
pub use spectral::{apply_gain, apply_gain_in_place};

use num_complex::Complex32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One short-time spectrum: a complex frame of length `fft_size`
///
/// Only bins `0..=fft_size/2` are meaningful inputs; the upper half is
/// rewritten as conjugate mirrors by [`apply_gain`].
pub type SpectralFrame = Vec<Complex32>;

/// Invalid transform parameter combinations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformOptionsError {
    #[error("window_size must be greater than 1 (got {0})")]
    WindowTooSmall(usize),
    #[error("hop_size must be positive")]
    ZeroHop,
    #[error("fft_size ({fft_size}) must be >= window_size ({window_size})")]
    FftSmallerThanWindow { fft_size: usize, window_size: usize },
    #[error("fft_size must be a power of two (got {0})")]
    FftNotPowerOfTwo(usize),
}

/// Short-time transform parameters shared by every DSP engine request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOptions {
    pub window_size: usize,
    pub hop_size: usize,
    pub fft_size: usize,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            window_size: 2048,
            hop_size: 512,
            fft_size: 2048,
        }
    }
}

impl TransformOptions {
    /// Check the parameter invariants the DSP service enforces
    ///
    /// Rejecting locally avoids a round-trip that would come back as a 400.
    pub fn validate(&self) -> Result<(), TransformOptionsError> {
        if self.window_size <= 1 {
            return Err(TransformOptionsError::WindowTooSmall(self.window_size));
        }
        if self.hop_size == 0 {
            return Err(TransformOptionsError::ZeroHop);
        }
        if self.fft_size < self.window_size {
            return Err(TransformOptionsError::FftSmallerThanWindow {
                fft_size: self.fft_size,
                window_size: self.window_size,
            });
        }
        if !self.fft_size.is_power_of_two() {
            return Err(TransformOptionsError::FftNotPowerOfTwo(self.fft_size));
        }
        Ok(())
    }

    /// Number of non-negative-frequency bins (`fft_size/2 + 1`)
    #[inline]
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }
}
