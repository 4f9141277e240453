//! Band specifications and gain vector construction
//!
//! A [`BandSpec`] is one user-controlled rule: a scale factor applied over
//! one or more frequency windows. Compiling all specs against a transform
//! size yields a [`GainVector`] with one multiplicative gain per bin.

use crate::types::Sample;

/// A contiguous frequency interval in Hz, half-open: `[start_hz, end_hz)`
///
/// A bin whose center frequency falls inside the interval is covered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandWindow {
    pub start_hz: f32,
    pub end_hz: f32,
}

impl BandWindow {
    pub fn new(start_hz: f32, end_hz: f32) -> Self {
        Self { start_hz, end_hz }
    }

    /// Check whether a frequency falls inside this window
    #[inline]
    pub fn contains(&self, freq_hz: f32) -> bool {
        freq_hz >= self.start_hz && freq_hz < self.end_hz
    }
}

/// One logical equalizer control: a scale over a set of frequency windows
///
/// Overlapping specs compose multiplicatively and order-independently.
/// Malformed windows (start >= end) simply cover nothing; validation is the
/// authoring layer's responsibility.
#[derive(Debug, Clone, PartialEq)]
pub struct BandSpec {
    /// Multiplicative gain, >= 0 (0 kills the band, 1 leaves it untouched)
    pub scale: Sample,
    pub windows: Vec<BandWindow>,
}

impl BandSpec {
    pub fn new(scale: Sample, windows: Vec<BandWindow>) -> Self {
        Self { scale, windows }
    }

    /// Check whether any window of this spec covers the frequency
    #[inline]
    fn covers(&self, freq_hz: f32) -> bool {
        self.windows.iter().any(|w| w.contains(freq_hz))
    }
}

/// Per-bin multiplicative gains for the non-negative-frequency half spectrum
///
/// Length is always `fft_size/2 + 1`; bins covered by no spec stay at 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct GainVector {
    gains: Vec<Sample>,
}

impl GainVector {
    /// Compile band specs into a gain vector
    ///
    /// Bin `i` sits at frequency `i * sample_rate / fft_size`; its gain is
    /// the product of every covering spec's scale. Pure and deterministic,
    /// safe to call repeatedly and concurrently.
    pub fn build(specs: &[BandSpec], fft_size: usize, sample_rate: u32) -> Self {
        let num_bins = fft_size / 2 + 1;
        let bin_width = sample_rate as f32 / fft_size as f32;

        let gains = (0..num_bins)
            .map(|bin| {
                let freq = bin as f32 * bin_width;
                specs
                    .iter()
                    .filter(|spec| spec.covers(freq))
                    .map(|spec| spec.scale)
                    .product::<Sample>()
            })
            .collect();

        Self { gains }
    }

    /// A unity vector for the given transform size (no bands applied)
    pub fn identity(fft_size: usize) -> Self {
        Self {
            gains: vec![1.0; fft_size / 2 + 1],
        }
    }

    /// Number of bins (`fft_size/2 + 1`)
    #[inline]
    pub fn len(&self) -> usize {
        self.gains.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.gains.is_empty()
    }

    /// Gain for one bin
    #[inline]
    pub fn gain(&self, bin: usize) -> Sample {
        self.gains[bin]
    }

    /// All bin gains, DC first
    #[inline]
    pub fn as_slice(&self) -> &[Sample] {
        &self.gains
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin_for_freq(freq: f32, fft_size: usize, sample_rate: u32) -> usize {
        (freq * fft_size as f32 / sample_rate as f32).round() as usize
    }

    #[test]
    fn test_uncovered_bins_stay_unity() {
        let specs = [BandSpec::new(0.5, vec![BandWindow::new(100.0, 200.0)])];
        let gains = GainVector::build(&specs, 2048, 48_000);

        assert_eq!(gains.len(), 1025);
        assert_eq!(gains.gain(0), 1.0);
        assert_eq!(gains.gain(1024), 1.0);
    }

    #[test]
    fn test_overlapping_specs_compose_multiplicatively() {
        // The concrete scenario: 0.8 over [0, 500) plus 0.5 over [100, 200)
        let specs = [
            BandSpec::new(0.8, vec![BandWindow::new(0.0, 500.0)]),
            BandSpec::new(0.5, vec![BandWindow::new(100.0, 200.0)]),
        ];
        let gains = GainVector::build(&specs, 2048, 48_000);

        let at_50 = gains.gain(bin_for_freq(50.0, 2048, 48_000));
        let at_150 = gains.gain(bin_for_freq(150.0, 2048, 48_000));
        let at_1000 = gains.gain(bin_for_freq(1000.0, 2048, 48_000));

        assert!((at_50 - 0.8).abs() < 1e-6);
        assert!((at_150 - 0.4).abs() < 1e-6);
        assert!((at_1000 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_order_independence() {
        let a = BandSpec::new(0.7, vec![BandWindow::new(0.0, 4000.0)]);
        let b = BandSpec::new(1.5, vec![BandWindow::new(1000.0, 2000.0)]);

        let forward = GainVector::build(&[a.clone(), b.clone()], 1024, 44_100);
        let reverse = GainVector::build(&[b, a], 1024, 44_100);
        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_half_open_window_boundary() {
        // Bin at exactly end_hz is NOT covered
        let sample_rate = 44_100;
        let fft_size = 1024;
        let bin_width = sample_rate as f32 / fft_size as f32;
        let end = bin_width * 10.0;

        let specs = [BandSpec::new(0.0, vec![BandWindow::new(0.0, end)])];
        let gains = GainVector::build(&specs, fft_size, sample_rate);

        assert_eq!(gains.gain(9), 0.0);
        assert_eq!(gains.gain(10), 1.0);
    }

    #[test]
    fn test_disjoint_windows_one_spec() {
        let specs = [BandSpec::new(
            0.25,
            vec![BandWindow::new(0.0, 100.0), BandWindow::new(1000.0, 1100.0)],
        )];
        let gains = GainVector::build(&specs, 2048, 48_000);

        assert!((gains.gain(bin_for_freq(50.0, 2048, 48_000)) - 0.25).abs() < 1e-6);
        assert!((gains.gain(bin_for_freq(1050.0, 2048, 48_000)) - 0.25).abs() < 1e-6);
        assert!((gains.gain(bin_for_freq(500.0, 2048, 48_000)) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_identity() {
        let gains = GainVector::identity(256);
        assert_eq!(gains.len(), 129);
        assert!(gains.as_slice().iter().all(|&g| g == 1.0));
    }
}
