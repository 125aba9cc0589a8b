use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use k6ctl_core::api::{
    ControllerApi, FetchError, METRICS_PATH, STATUS_PATH, decode_metrics, decode_status,
    encode_status_patch,
};
use k6ctl_core::model::{MetricsSnapshot, TestStatus};

/// `ControllerApi` over the k6 REST API
pub struct HttpController {
    base_url: String,
    client: reqwest::Client,
}

impl HttpController {
    /// `base_url` must not end with `/` (see `Config::resolve`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::transport(STATUS_PATH, e))?;
        Ok(Self {
            base_url: base_url.to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_text(&self, path: &'static str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| classify(path, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::protocol(path, format!("HTTP {}", status)));
        }
        resp.text().await.map_err(|e| classify(path, e))
    }
}

/// Body decoding problems are protocol errors, everything else is transport
fn classify(endpoint: &'static str, err: reqwest::Error) -> FetchError {
    if err.is_decode() {
        FetchError::protocol(endpoint, err)
    } else {
        FetchError::transport(endpoint, err)
    }
}

#[async_trait]
impl ControllerApi for HttpController {
    async fn status(&self) -> Result<TestStatus, FetchError> {
        let body = self.get_text(STATUS_PATH).await?;
        decode_status(&body)
    }

    async fn metrics(&self) -> Result<MetricsSnapshot, FetchError> {
        let body = self.get_text(METRICS_PATH).await?;
        decode_metrics(&body)
    }

    async fn patch_status(&self, status: &TestStatus) -> Result<(), FetchError> {
        debug!(paused = status.paused, vus = status.vus, "PATCH {}", STATUS_PATH);
        let resp = self
            .client
            .patch(self.url(STATUS_PATH))
            .json(&encode_status_patch(status))
            .send()
            .await
            .map_err(|e| classify(STATUS_PATH, e))?;

        let code = resp.status();
        if code.is_success() {
            Ok(())
        } else {
            Err(FetchError::protocol(STATUS_PATH, format!("HTTP {}", code)))
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
