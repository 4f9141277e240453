//! HTTP transform engine
//!
//! Talks to the DSP service over its JSON API. One [`reqwest::Client`] is
//! held for the engine's lifetime; the per-request timeout comes from
//! [`EngineConfig`] and is minutes-scale since transforms over whole files
//! are costly.

use async_trait::async_trait;

use crate::config::EngineConfig;
use crate::eq::{SpectralFrame, TransformOptions};
use crate::types::Sample;

use super::protocol::{
    frames_from_wire, frames_to_wire, IstftRequest, IstftResponse, StftRequest, StftResponse,
};
use super::{EngineError, TransformEngine};

/// Transform engine backed by the remote DSP service
pub struct HttpTransformEngine {
    client: reqwest::Client,
    base_url: String,
    timeout: std::time::Duration,
}

impl HttpTransformEngine {
    /// Build an engine from connection settings
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn map_send_error(&self, e: reqwest::Error) -> EngineError {
        if e.is_timeout() {
            EngineError::Timeout(self.timeout)
        } else {
            EngineError::Transport(e.to_string())
        }
    }

    /// Probe the service's health endpoint
    ///
    /// Not used by the recompute path; callers surface this in status UI.
    pub async fn healthy(&self) -> bool {
        match self.client.get(self.endpoint("/health")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::debug!("engine health probe failed: {}", e);
                false
            }
        }
    }

    /// Send a request body and decode the JSON reply
    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, EngineError>
    where
        Req: serde::Serialize + Sync,
        Resp: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EngineError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| EngineError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl TransformEngine for HttpTransformEngine {
    async fn forward(
        &self,
        signal: &[Sample],
        sample_rate: u32,
        options: &TransformOptions,
    ) -> Result<Vec<SpectralFrame>, EngineError> {
        let request = StftRequest {
            signal: signal.to_vec(),
            sample_rate,
            options: *options,
            include_frames: true,
            include_magnitudes: false,
        };

        let response: StftResponse = self.post_json("/api/dsp/stft", &request).await?;
        let frames = response
            .frames
            .ok_or_else(|| EngineError::InvalidResponse("response carried no frames".into()))?;

        // A frame not matching fft_size would corrupt gain application
        if let Some(bad) = frames.iter().find(|f| f.len() != options.fft_size) {
            return Err(EngineError::InvalidResponse(format!(
                "frame carries {} bins, expected fft_size {}",
                bad.len(),
                options.fft_size
            )));
        }

        log::debug!(
            "engine: forward transform returned {} frames of {} samples",
            frames.len(),
            signal.len()
        );
        Ok(frames_from_wire(frames))
    }

    async fn inverse(
        &self,
        frames: &[SpectralFrame],
        options: &TransformOptions,
    ) -> Result<Vec<Sample>, EngineError> {
        let request = IstftRequest {
            frames: frames_to_wire(frames),
            options: *options,
        };

        let response: IstftResponse = self.post_json("/api/dsp/istft", &request).await?;
        log::debug!(
            "engine: inverse transform returned {} samples from {} frames",
            response.signal.len(),
            frames.len()
        );
        Ok(response.signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let engine = HttpTransformEngine::new(&EngineConfig {
            base_url: "http://localhost:8000/".to_string(),
            timeout_secs: 5,
        })
        .unwrap();

        assert_eq!(
            engine.endpoint("/api/dsp/stft"),
            "http://localhost:8000/api/dsp/stft"
        );
    }
}
