//! Instrument Time Calculator client.
//!
//! The ITC is an external oracle: given an observation's science
//! requirements and observing conditions it answers with the exposure time
//! and exposure count needed to reach the requested signal-to-noise. The
//! trait keeps the engine testable; the HTTP implementation talks to the
//! real service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{OdbError, OdbResult};
use crate::models::{Observation, TimeSpan};

/// One sequence's worth of integration: how long and how many.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationTime {
    pub exposure_time: TimeSpan,
    pub exposure_count: u32,
}

/// Full ITC answer for an observation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItcResult {
    pub science: IntegrationTime,
    pub acquisition: IntegrationTime,
}

#[async_trait]
pub trait ItcClient: Send + Sync {
    /// Compute (or retrieve) the integration time for an observation.
    async fn integration_time(&self, observation: &Observation) -> OdbResult<ItcResult>;
}

/// Request body sent to the remote ITC.
#[derive(Debug, Serialize)]
struct ItcRequest {
    wavelength_nm: Option<f64>,
    signal_to_noise: Option<f64>,
    image_quality: String,
    cloud_extinction: String,
    sky_background: String,
    water_vapor: String,
}

/// Response body from the remote ITC.
#[derive(Debug, Deserialize)]
struct ItcResponse {
    exposure_time_us: u64,
    exposure_count: u32,
    acquisition_exposure_time_us: u64,
}

/// HTTP client for the production ITC service.
pub struct HttpItcClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpItcClient {
    pub fn new(base_url: impl Into<String>) -> HttpItcClient {
        HttpItcClient {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ItcClient for HttpItcClient {
    async fn integration_time(&self, observation: &Observation) -> OdbResult<ItcResult> {
        let reqs = &observation.science_requirements;
        let cs = &observation.constraint_set;
        let body = ItcRequest {
            wavelength_nm: reqs.wavelength.map(|w| w.nanometers().value()),
            signal_to_noise: reqs.signal_to_noise,
            image_quality: format!("{:?}", cs.image_quality),
            cloud_extinction: format!("{:?}", cs.cloud_extinction),
            sky_background: format!("{:?}", cs.sky_background),
            water_vapor: format!("{:?}", cs.water_vapor),
        };

        let url = format!("{}/spectroscopy/integration-time", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| OdbError::external("itc", e.to_string()))?;

        if !response.status().is_success() {
            return Err(OdbError::external(
                "itc",
                format!("unexpected status {}", response.status()),
            ));
        }

        let parsed: ItcResponse = response
            .json()
            .await
            .map_err(|e| OdbError::external("itc", format!("malformed response: {}", e)))?;

        Ok(ItcResult {
            science: IntegrationTime {
                exposure_time: TimeSpan::from_microseconds(parsed.exposure_time_us),
                exposure_count: parsed.exposure_count,
            },
            acquisition: IntegrationTime {
                exposure_time: TimeSpan::from_microseconds(parsed.acquisition_exposure_time_us),
                exposure_count: 1,
            },
        })
    }
}

/// ITC stub answering with a fixed result. Used in tests and local
/// development where the remote service is unavailable.
pub struct FixedItcClient {
    result: ItcResult,
}

impl FixedItcClient {
    pub fn new(result: ItcResult) -> FixedItcClient {
        FixedItcClient { result }
    }

    /// Ten-second exposures, six of them, with a ten-second acquisition.
    pub fn default_spectroscopy() -> FixedItcClient {
        FixedItcClient::new(ItcResult {
            science: IntegrationTime {
                exposure_time: TimeSpan::from_seconds(10),
                exposure_count: 6,
            },
            acquisition: IntegrationTime {
                exposure_time: TimeSpan::from_seconds(10),
                exposure_count: 1,
            },
        })
    }
}

#[async_trait]
impl ItcClient for FixedItcClient {
    async fn integration_time(&self, _observation: &Observation) -> OdbResult<ItcResult> {
        Ok(self.result)
    }
}
