//! Common types for Contour
//!
//! This module contains the fundamental audio types shared by the
//! equalization pipeline, the playback transport and the mixer.

/// Default sample rate assumed when a file carries no rate of its own
/// (44.1kHz - matches the remote DSP service default)
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Audio sample type (32-bit float for processing)
pub type Sample = f32;

/// A non-interleaved multichannel sample buffer tagged with its sample rate
///
/// This is the unit of hand-off in Contour: decoded files, equalized render
/// results and mixer outputs are all `SampleBuffer`s. Channels are stored as
/// separate `Vec<Sample>` planes and are always the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    sample_rate: u32,
    channels: Vec<Vec<Sample>>,
}

impl SampleBuffer {
    /// Create a buffer from channel planes
    ///
    /// Panics if `channels` is empty or the planes have different lengths.
    pub fn new(sample_rate: u32, channels: Vec<Vec<Sample>>) -> Self {
        assert!(!channels.is_empty(), "SampleBuffer needs at least one channel");
        let len = channels[0].len();
        assert!(
            channels.iter().all(|c| c.len() == len),
            "All channel planes must have the same length"
        );
        Self {
            sample_rate,
            channels,
        }
    }

    /// Create a single-channel buffer
    pub fn mono(sample_rate: u32, samples: Vec<Sample>) -> Self {
        Self::new(sample_rate, vec![samples])
    }

    /// Create a buffer filled with silence
    pub fn silence(sample_rate: u32, num_channels: usize, len: usize) -> Self {
        assert!(num_channels > 0, "SampleBuffer needs at least one channel");
        Self {
            sample_rate,
            channels: vec![vec![0.0; len]; num_channels],
        }
    }

    /// Sample rate in Hz
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Length in frames (samples per channel)
    #[inline]
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    /// Check if the buffer holds no frames
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// Get a channel plane
    #[inline]
    pub fn channel(&self, index: usize) -> &[Sample] {
        &self.channels[index]
    }

    /// Get a mutable channel plane
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [Sample] {
        &mut self.channels[index]
    }

    /// Iterate over channel planes
    pub fn channels(&self) -> impl Iterator<Item = &[Sample]> {
        self.channels.iter().map(|c| c.as_slice())
    }

    /// Get the peak absolute amplitude across all channels
    pub fn peak(&self) -> Sample {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .map(|s| s.abs())
            .fold(0.0, Sample::max)
    }

    /// Scale every sample by a factor
    pub fn scale(&mut self, factor: Sample) {
        for channel in &mut self.channels {
            for sample in channel.iter_mut() {
                *sample *= factor;
            }
        }
    }
}
