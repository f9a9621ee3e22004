//! The analysis collaborator: image + prompt in, free text out.
//!
//! [`AnalysisClient`] is the only network-shaped seam in the crate. The
//! controller holds an `Arc<dyn AnalysisClient>`; production wires in
//! [`GeminiClient`], tests wire in scripted fakes.
//!
//! No timeout and no retries live here. A failed call is reported once and
//! the user decides whether to try again.

use crate::encode::EncodedImage;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why an analysis call produced no text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// Human-readable message from the provider, shown verbatim.
    #[error("{0}")]
    Provider(String),

    /// The provider failed without saying why.
    #[error("Failed to analyze the image. Please try again.")]
    Unavailable,
}

#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Describe `image` following `prompt`. The returned text has no
    /// guaranteed structure.
    async fn analyze(&self, image: &EncodedImage, prompt: &str) -> Result<String, AnalysisError>;

    /// Model name shown next to the result.
    fn model_name(&self) -> &str;
}

/// Google Gemini `generateContent` over HTTPS.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl AnalysisClient for GeminiClient {
    async fn analyze(&self, image: &EncodedImage, prompt: &str) -> Result<String, AnalysisError> {
        let payload = request_body(image, prompt);

        info!("Sending {} image to {}", image.media_type(), self.model);

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                warn!("Gemini request failed: {}", e);
                AnalysisError::Provider(format!("Could not reach the analysis service: {e}"))
            })?;

        let status = response.status();
        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Gemini returned {} with an unreadable body: {}", status, e);
                return Err(AnalysisError::Unavailable);
            }
        };

        if !status.is_success() {
            warn!("Gemini returned {}", status);
            return Err(error_message(&body)
                .map(AnalysisError::Provider)
                .unwrap_or(AnalysisError::Unavailable));
        }

        let text = response_text(&body);
        if text.trim().is_empty() {
            warn!("Gemini returned no candidate text");
            return Err(AnalysisError::Unavailable);
        }

        debug!("Gemini returned {} chars", text.len());
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn request_body(image: &EncodedImage, prompt: &str) -> Value {
    serde_json::json!({
        "contents": [{
            "parts": [
                { "text": prompt },
                {
                    "inline_data": {
                        "mime_type": image.media_type(),
                        "data": image.payload()
                    }
                }
            ]
        }]
    })
}

/// Concatenated text parts of the first candidate.
fn response_text(body: &Value) -> String {
    body["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
        .unwrap_or_default()
}

fn error_message(body: &Value) -> Option<String> {
    body["error"]["message"]
        .as_str()
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}
