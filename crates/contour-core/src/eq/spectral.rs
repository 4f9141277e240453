//! Hermitian-symmetric gain application to spectrum frames
//!
//! The inverse transform of a frame is real-valued only if the frame is
//! conjugate-symmetric: `bin[i] == conj(bin[fft_size - i])`. Scaling bin `i`
//! without scaling its mirror would break that, so the applier scales the
//! lower half and rewrites the upper half as conjugate mirrors. Symmetry
//! holds by construction, even when the input's upper half is stale.

use num_complex::Complex32;

use super::bands::GainVector;

/// Apply a gain vector to one frame, producing a new frame
///
/// Panics if `gains.len() != frame.len()/2 + 1` (the gain vector was built
/// for a different transform size).
pub fn apply_gain(frame: &[Complex32], gains: &GainVector) -> Vec<Complex32> {
    let mut out = frame.to_vec();
    apply_gain_in_place(&mut out, gains);
    out
}

/// Apply a gain vector to one frame in place
///
/// - bin 0 (DC) is scaled by `gains[0]`
/// - bins `1..fft_size/2` are scaled by `gains[i]` and mirrored into
///   `fft_size - i` as conjugates
/// - the Nyquist bin (`fft_size/2`, even sizes only) is scaled with no mirror
pub fn apply_gain_in_place(frame: &mut [Complex32], gains: &GainVector) {
    let fft_size = frame.len();
    assert_eq!(
        gains.len(),
        fft_size / 2 + 1,
        "gain vector built for a different fft_size"
    );

    frame[0] *= gains.gain(0);

    let half = fft_size / 2;
    for i in 1..half {
        let scaled = frame[i] * gains.gain(i);
        frame[i] = scaled;
        frame[fft_size - i] = scaled.conj();
    }

    if fft_size % 2 == 0 && half > 0 {
        frame[half] *= gains.gain(half);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eq::bands::{BandSpec, BandWindow};

    fn is_hermitian(frame: &[Complex32]) -> bool {
        let n = frame.len();
        (1..n / 2).all(|i| {
            let mirror = frame[n - i];
            (frame[i] - mirror.conj()).norm() < 1e-6
        })
    }

    #[test]
    fn test_mirror_bins_get_identical_multiplier() {
        let fft_size = 16;
        // Frame with arbitrary (non-symmetric) content in both halves
        let frame: Vec<Complex32> = (0..fft_size)
            .map(|i| Complex32::new(i as f32 * 0.3, (fft_size - i) as f32 * -0.2))
            .collect();

        let specs = [BandSpec::new(0.5, vec![BandWindow::new(0.0, 24_000.0)])];
        let gains = GainVector::build(&specs, fft_size, 48_000);

        let out = apply_gain(&frame, &gains);
        assert!(is_hermitian(&out));

        // Lower half really was scaled, not just mirrored
        for i in 1..fft_size / 2 {
            assert!((out[i] - frame[i] * 0.5).norm() < 1e-6);
        }
    }

    #[test]
    fn test_dc_and_nyquist_scaled_without_mirror() {
        let fft_size = 8;
        let mut frame = vec![Complex32::new(1.0, 0.0); fft_size];
        frame[0] = Complex32::new(2.0, 0.0);
        frame[4] = Complex32::new(3.0, 0.0);

        let specs = [BandSpec::new(0.25, vec![BandWindow::new(0.0, f32::MAX)])];
        let gains = GainVector::build(&specs, fft_size, 48_000);

        apply_gain_in_place(&mut frame, &gains);
        assert!((frame[0].re - 0.5).abs() < 1e-6);
        assert!((frame[4].re - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_unity_gain_repairs_symmetry_only() {
        // Identity gains still rewrite the upper half as conjugate mirrors
        let fft_size = 8;
        let mut frame = vec![Complex32::new(0.0, 0.0); fft_size];
        frame[1] = Complex32::new(1.0, 1.0);
        frame[7] = Complex32::new(9.0, 9.0); // stale mirror

        apply_gain_in_place(&mut frame, &GainVector::identity(fft_size));
        assert_eq!(frame[1], Complex32::new(1.0, 1.0));
        assert_eq!(frame[7], Complex32::new(1.0, -1.0));
    }

    #[test]
    #[should_panic]
    fn test_size_mismatch_panics() {
        let mut frame = vec![Complex32::new(0.0, 0.0); 16];
        apply_gain_in_place(&mut frame, &GainVector::identity(8));
    }
}
