//! Recompute orchestration with token-based supersession
//!
//! Every slider movement can trigger a recompute, and each recompute makes
//! several round-trips to the remote DSP engine. Requests therefore overlap,
//! and nothing guarantees they complete in issue order. The pipeline hands
//! each request a token from a monotonically increasing counter and
//! re-checks `token == current` after every await: only the most recently
//! issued request may install its result, everything else is discarded
//! without side effects.
//!
//! The processing flag and the error slot are gated the same way - a
//! superseded request never clears a flag a newer request is relying on,
//! and its failures are swallowed silently.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::playback::BufferSlot;
use crate::remote::{EngineError, TransformEngine};
use crate::types::{Sample, SampleBuffer};

use super::bands::{BandSpec, GainVector};
use super::spectral::apply_gain_in_place;
use super::{TransformOptions, TransformOptionsError};

/// Errors surfaced to the caller of [`EqPipeline::recompute`]
///
/// Only the currently-current request ever sees an `Err`; superseded
/// requests resolve to [`RecomputeOutcome::Superseded`] no matter what
/// happened to them.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid transform options: {0}")]
    InvalidOptions(#[from] TransformOptionsError),

    #[error("equalization failed: {0}")]
    Engine(#[from] EngineError),
}

/// How one recompute request ended
#[derive(Debug, Clone)]
pub enum RecomputeOutcome {
    /// This request was still the newest at every suspension point; its
    /// result is installed in the output slot.
    Committed(Arc<SampleBuffer>),
    /// A newer request was issued while this one was in flight; the work
    /// was discarded without side effects.
    Superseded,
}

impl RecomputeOutcome {
    /// The committed buffer, if this request won
    pub fn committed(&self) -> Option<&Arc<SampleBuffer>> {
        match self {
            RecomputeOutcome::Committed(buffer) => Some(buffer),
            RecomputeOutcome::Superseded => None,
        }
    }
}

/// Equalization recompute pipeline
///
/// Shareable behind an `Arc`; all methods take `&self`. `E` is the remote
/// transform engine (HTTP in production, scripted in tests).
pub struct EqPipeline<E> {
    engine: E,
    options: TransformOptions,
    output: Arc<BufferSlot>,
    current_token: AtomicU64,
    /// Token of the request currently showing the processing indicator
    processing: Mutex<Option<u64>>,
    last_error: Mutex<Option<String>>,
}

impl<E: TransformEngine> EqPipeline<E> {
    pub fn new(engine: E, options: TransformOptions, output: Arc<BufferSlot>) -> Self {
        Self {
            engine,
            options,
            output,
            current_token: AtomicU64::new(0),
            processing: Mutex::new(None),
            last_error: Mutex::new(None),
        }
    }

    /// The slot committed results are installed into
    pub fn output_slot(&self) -> Arc<BufferSlot> {
        Arc::clone(&self.output)
    }

    /// Whether any request is currently in flight
    pub fn is_processing(&self) -> bool {
        self.processing.lock().unwrap().is_some()
    }

    /// Message of the most recent surfaced engine failure, if any
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    #[inline]
    fn is_current(&self, token: u64) -> bool {
        self.current_token.load(Ordering::Acquire) == token
    }

    /// Issue a new token, making every in-flight request stale
    fn issue_token(&self) -> u64 {
        let token = self.current_token.fetch_add(1, Ordering::AcqRel) + 1;
        *self.processing.lock().unwrap() = Some(token);
        token
    }

    /// Clear the processing flag, but only if this request still owns it
    fn release_flag(&self, token: u64) {
        let mut flag = self.processing.lock().unwrap();
        if *flag == Some(token) {
            *flag = None;
        }
    }

    /// Record a failure, but only if this request is still current
    ///
    /// The token check runs under the error slot's lock, so a request
    /// superseded mid-exit cannot overwrite an error a newer request just
    /// recorded. Returns whether the error was surfaced.
    fn record_error_if_current(&self, token: u64, error: &EngineError) -> bool {
        let mut last_error = self.last_error.lock().unwrap();
        if self.is_current(token) {
            *last_error = Some(error.to_string());
            true
        } else {
            false
        }
    }

    /// Clear the error slot, but only if this request is still current
    fn clear_error_if_current(&self, token: u64) {
        let mut last_error = self.last_error.lock().unwrap();
        if self.is_current(token) {
            *last_error = None;
        }
    }

    /// Re-render the source buffer under the given band specs
    ///
    /// Suspension points: the forward transform, the inverse transform and
    /// the install into playback. At each one the request abandons itself
    /// if a newer `recompute` has been issued since.
    pub async fn recompute(
        &self,
        source: &SampleBuffer,
        specs: &[BandSpec],
    ) -> Result<RecomputeOutcome, PipelineError> {
        self.options.validate()?;

        let token = self.issue_token();
        log::debug!(
            "pipeline: request {} issued ({} bands, {} channels)",
            token,
            specs.len(),
            source.num_channels()
        );

        let result = self.render(token, source, specs).await;
        self.release_flag(token);

        match result {
            Ok(Some(buffer)) => {
                self.clear_error_if_current(token);
                log::debug!("pipeline: request {} committed", token);
                Ok(RecomputeOutcome::Committed(buffer))
            }
            Ok(None) => {
                log::debug!("pipeline: request {} superseded, discarding", token);
                Ok(RecomputeOutcome::Superseded)
            }
            Err(e) => {
                if self.record_error_if_current(token, &e) {
                    log::warn!("pipeline: request {} failed: {}", token, e);
                    Err(e.into())
                } else {
                    // Stale failure: swallowed, same as a stale success
                    log::debug!("pipeline: request {} failed after supersession: {}", token, e);
                    Ok(RecomputeOutcome::Superseded)
                }
            }
        }
    }

    /// Transform, apply gains, inverse-transform and install
    ///
    /// `Ok(None)` means the request went stale at a suspension point.
    async fn render(
        &self,
        token: u64,
        source: &SampleBuffer,
        specs: &[BandSpec],
    ) -> Result<Option<Arc<SampleBuffer>>, EngineError> {
        let gains = GainVector::build(specs, self.options.fft_size, source.sample_rate());

        let mut channels: Vec<Vec<Sample>> = Vec::with_capacity(source.num_channels());
        for ch in 0..source.num_channels() {
            // Suspension point: forward transform round-trip
            let mut frames = self
                .engine
                .forward(source.channel(ch), source.sample_rate(), &self.options)
                .await?;
            if !self.is_current(token) {
                return Ok(None);
            }

            // The engine contract is full-length frames; a short frame is a
            // processing error, not a panic
            if let Some(bad) = frames.iter().find(|f| f.len() != self.options.fft_size) {
                return Err(EngineError::InvalidResponse(format!(
                    "frame carries {} bins, expected fft_size {}",
                    bad.len(),
                    self.options.fft_size
                )));
            }

            // Synchronous: gain application, no suspension
            for frame in &mut frames {
                apply_gain_in_place(frame, &gains);
            }

            // Suspension point: inverse transform round-trip
            let signal = self.engine.inverse(&frames, &self.options).await?;
            if !self.is_current(token) {
                return Ok(None);
            }

            // All channels must reconstruct to the same length
            if let Some(first) = channels.first() {
                if signal.len() != first.len() {
                    return Err(EngineError::InvalidResponse(format!(
                        "channel {} reconstructed to {} samples, channel 0 to {}",
                        ch,
                        signal.len(),
                        first.len()
                    )));
                }
            }
            channels.push(signal);
        }

        let buffer = Arc::new(SampleBuffer::new(source.sample_rate(), channels));

        // Commit under the slot lock: the token check and the install are one
        // step, so a request superseded mid-commit cannot overwrite
        if !self
            .output
            .install_if(Arc::clone(&buffer), || self.is_current(token))
        {
            return Ok(None);
        }
        Ok(Some(buffer))
    }
}
