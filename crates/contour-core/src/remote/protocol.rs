//! Wire types for the DSP service's JSON API
//!
//! Field names follow the service's snake_case schema. Complex values are
//! transmitted as `{re, im}` objects.

use num_complex::Complex32;
use serde::{Deserialize, Serialize};

use crate::eq::{SpectralFrame, TransformOptions};
use crate::types::Sample;

/// One complex value on the wire
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexNumber {
    pub re: f32,
    pub im: f32,
}

impl From<Complex32> for ComplexNumber {
    fn from(value: Complex32) -> Self {
        Self {
            re: value.re,
            im: value.im,
        }
    }
}

impl From<ComplexNumber> for Complex32 {
    fn from(value: ComplexNumber) -> Self {
        Complex32::new(value.re, value.im)
    }
}

/// `POST /api/dsp/stft` request body
#[derive(Debug, Clone, Serialize)]
pub struct StftRequest {
    pub signal: Vec<Sample>,
    pub sample_rate: u32,
    pub options: TransformOptions,
    pub include_frames: bool,
    pub include_magnitudes: bool,
}

/// `POST /api/dsp/stft` response body
///
/// `frames` is present only when `include_frames` was requested; the
/// magnitude/frequency/time arrays only with `include_magnitudes`.
#[derive(Debug, Clone, Deserialize)]
pub struct StftResponse {
    pub frames: Option<Vec<Vec<ComplexNumber>>>,
    pub magnitudes: Option<Vec<Vec<Sample>>>,
    pub frequencies: Option<Vec<Sample>>,
    pub times: Option<Vec<Sample>>,
}

/// `POST /api/dsp/istft` request body
#[derive(Debug, Clone, Serialize)]
pub struct IstftRequest {
    pub frames: Vec<Vec<ComplexNumber>>,
    pub options: TransformOptions,
}

/// `POST /api/dsp/istft` response body
#[derive(Debug, Clone, Deserialize)]
pub struct IstftResponse {
    pub signal: Vec<Sample>,
}

/// Convert wire frames into spectral frames
pub fn frames_from_wire(frames: Vec<Vec<ComplexNumber>>) -> Vec<SpectralFrame> {
    frames
        .into_iter()
        .map(|frame| frame.into_iter().map(Complex32::from).collect())
        .collect()
}

/// Convert spectral frames into wire frames
pub fn frames_to_wire(frames: &[SpectralFrame]) -> Vec<Vec<ComplexNumber>> {
    frames
        .iter()
        .map(|frame| frame.iter().map(|&bin| ComplexNumber::from(bin)).collect())
        .collect()
}
