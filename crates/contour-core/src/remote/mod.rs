//! Remote DSP engine boundary
//!
//! Contour never computes forward or inverse transforms itself; they are
//! delegated to an external DSP service. [`TransformEngine`] is the seam:
//! the production implementation is [`HttpTransformEngine`], tests plug in
//! local or scripted engines.

pub mod http;
pub mod protocol;

pub use http::HttpTransformEngine;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::eq::{SpectralFrame, TransformOptions};
use crate::types::Sample;

/// Failures crossing the engine boundary
///
/// A timeout is deliberately just another failure; the pipeline treats all
/// engine errors identically and gates them behind the staleness check.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Network-level failure reaching the service
    #[error("transform request failed: {0}")]
    Transport(String),

    /// The request exceeded the configured deadline
    #[error("transform request timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered with a non-success status
    #[error("DSP service rejected request ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    /// The service answered 200 but the body wasn't usable
    #[error("malformed DSP service response: {0}")]
    InvalidResponse(String),
}

/// Asynchronous forward/inverse short-time transform provider
#[async_trait]
pub trait TransformEngine: Send + Sync {
    /// Compute STFT frames for a single-channel signal
    ///
    /// Returned frames are full-length (`fft_size` complex bins each).
    async fn forward(
        &self,
        signal: &[Sample],
        sample_rate: u32,
        options: &TransformOptions,
    ) -> Result<Vec<SpectralFrame>, EngineError>;

    /// Reconstruct a single-channel signal from (modified) frames
    async fn inverse(
        &self,
        frames: &[SpectralFrame],
        options: &TransformOptions,
    ) -> Result<Vec<Sample>, EngineError>;
}
