use crate::contracts::{PipelineError, StageResult};
use crate::cost_tracker::CostTracker;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::json;
use std::sync::{Arc, Mutex};
use url::Url;

/// # NDOC
/// component: `image_service`
/// purpose: Opaque background-image generation seam. `None` means the
/// service declined; the slide ships without a background.
#[async_trait]
pub trait ImageClient: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        aspect: &str,
    ) -> StageResult<Option<Vec<u8>>>;
}

pub struct HttpImageClient {
    http: reqwest::Client,
    base: Url,
    api_key: String,
}

impl HttpImageClient {
    pub fn new(base: Url, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
            api_key,
        }
    }

    fn endpoint(&self, model: &str) -> StageResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| PipelineError::config("image API base URL cannot be a base"))?
            .push("v1beta")
            .push("models")
            .push(&format!("{model}:generateImage"));
        Ok(url)
    }
}

#[async_trait]
impl ImageClient for HttpImageClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        aspect: &str,
    ) -> StageResult<Option<Vec<u8>>> {
        let url = self.endpoint(model)?;
        let response = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "prompt": prompt,
                "aspect_ratio": aspect,
                "samples": 1,
            }))
            .send()
            .await
            .map_err(|e| PipelineError::provider(format!("image request failed: {e}"), true))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "could not read error body".to_string());
            return Err(PipelineError::provider(
                format!("image generation failed: {status} - {body}"),
                status.as_u16() == 429 || status.is_server_error(),
            ));
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::provider(format!("image response: {e}"), false))?;
        if let Some(artifacts) = body.get("artifacts").and_then(|a| a.as_array()) {
            for artifact in artifacts {
                if let Some(encoded) = artifact.get("base64").and_then(|b| b.as_str()) {
                    let bytes = BASE64
                        .decode(encoded)
                        .map_err(|e| PipelineError::provider(format!("bad image payload: {e}"), false))?;
                    return Ok(Some(bytes));
                }
            }
        }
        // A well-formed reply with no artifact is a decline, not an error.
        Ok(None)
    }
}

/// # NDOC
/// component: `image_service`
/// purpose: Try-fallback pair over the image tier: cheap model first, pro
/// model when the cheap one fails or declines.
/// invariants:
///   - Never raises; image failure is always a graceful degrade.
///   - Successful generations are charged per image to the cost tracker.
pub struct ImageService {
    client: Arc<dyn ImageClient>,
    fast_model: String,
    pro_model: String,
    tracker: Arc<Mutex<CostTracker>>,
}

impl ImageService {
    pub fn new(
        client: Arc<dyn ImageClient>,
        fast_model: String,
        pro_model: String,
        tracker: Arc<Mutex<CostTracker>>,
    ) -> Self {
        Self {
            client,
            fast_model,
            pro_model,
            tracker,
        }
    }

    /// Generate a background and return it as a data URL, or `None`.
    pub async fn generate_background(&self, prompt: &str, aspect: &str) -> Option<String> {
        for model in [&self.fast_model, &self.pro_model] {
            match self.client.generate(model, prompt, aspect).await {
                Ok(Some(bytes)) => {
                    {
                        let mut tracker = self.tracker.lock().expect("tracker lock poisoned");
                        tracker.record_image(model);
                    }
                    return Some(format!("data:image/png;base64,{}", BASE64.encode(bytes)));
                }
                Ok(None) => {
                    log::info!(target: "image_service", model = model.as_str(); "image model declined prompt");
                }
                Err(err) => {
                    log::warn!(target: "image_service", model = model.as_str(), error = err.message.as_str(); "image generation failed");
                }
            }
        }
        None
    }
}
