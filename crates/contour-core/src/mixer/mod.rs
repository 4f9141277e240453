//! Multi-source mixer.
//!
//! Sums named sources into one output buffer with per-source gains, then
//! applies a single global peak normalization so the result never clips.
//! Mute and solo are both expressed through the gain map: a muted source
//! carries gain zero, and solo is the caller zeroing every other source.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::types::{Sample, SampleBuffer};

#[derive(Debug, Error)]
pub enum MixerError {
    #[error("no sources to mix")]
    NoSources,

    /// Sources must be resampled to a common rate before mixing
    #[error("source \"{name}\" is at {got} Hz, expected {expected} Hz")]
    SampleRateMismatch {
        name: String,
        expected: u32,
        got: u32,
    },
}

/// A source with a stable display name used to look up its gain.
#[derive(Clone)]
pub struct NamedSource {
    pub name: String,
    pub buffer: Arc<SampleBuffer>,
}

impl NamedSource {
    pub fn new(name: impl Into<String>, buffer: Arc<SampleBuffer>) -> Self {
        NamedSource {
            name: name.into(),
            buffer,
        }
    }
}

fn gain_for(gains: &HashMap<String, Sample>, name: &str) -> Sample {
    gains.get(name).copied().unwrap_or(1.0)
}

/// Mix `sources` into a single buffer.
///
/// Every buffer in one mix must already share a sample rate; a mismatch is
/// rejected with [`MixerError::SampleRateMismatch`] rather than silently
/// producing pitch-shifted output.
///
/// A source is active when its gain is positive; a missing gain entry
/// defaults to 1.0. The output takes its sample rate, channel count, and
/// length from the first active source; shorter sources contribute zeros
/// past their end, and a source with fewer channels than the output
/// repeats its last channel for the remainder. When every source is
/// inactive the result is a silent buffer shaped like the first source.
///
/// If the summed peak exceeds 1.0, every channel is scaled by the same
/// `1.0 / peak` so inter-channel balance is preserved.
pub fn mix(
    sources: &[NamedSource],
    gains: &HashMap<String, Sample>,
) -> Result<SampleBuffer, MixerError> {
    let first = sources.first().ok_or(MixerError::NoSources)?;

    let expected = first.buffer.sample_rate();
    if let Some(off) = sources.iter().find(|s| s.buffer.sample_rate() != expected) {
        return Err(MixerError::SampleRateMismatch {
            name: off.name.clone(),
            expected,
            got: off.buffer.sample_rate(),
        });
    }

    let active: Vec<&NamedSource> = sources
        .iter()
        .filter(|source| gain_for(gains, &source.name) > 0.0)
        .collect();

    let shape = active.first().map(|source| &source.buffer).unwrap_or(&first.buffer);
    let mut out = SampleBuffer::silence(shape.sample_rate(), shape.num_channels(), shape.len());
    if active.is_empty() {
        log::debug!("mix: all {} sources muted, emitting silence", sources.len());
        return Ok(out);
    }

    for source in &active {
        let gain = gain_for(gains, &source.name);
        let buffer = &source.buffer;
        for ch in 0..out.num_channels() {
            // Upmix by repeating the source's last channel.
            let src_ch = ch.min(buffer.num_channels() - 1);
            let samples = buffer.channel(src_ch);
            let dst = out.channel_mut(ch);
            for (i, sample) in samples.iter().take(dst.len()).enumerate() {
                dst[i] += gain * sample;
            }
        }
    }

    let peak = out.peak();
    if peak > 1.0 {
        log::debug!("mix: normalizing peak {peak:.3} down to 1.0");
        out.scale(1.0 / peak);
    }
    Ok(out)
}
