//! Client for the Gemini image-generation endpoint.
//!
//! One request per call, no retries, no client-side timeout. The service is an
//! opaque box: we hand it the uploaded bytes plus an instruction and take the
//! first inline image it returns.

use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use tracing::debug;

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// Transport-level failure: DNS, TLS, connection reset, malformed body.
    #[error("request to the generation service failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// The service answered with a non-success status (auth, quota, bad input).
    #[error("generation service returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The body was not the JSON shape we expect.
    #[error("could not decode the generation response: {0}")]
    BadPayload(#[from] serde_json::Error),

    /// The image part carried invalid base64.
    #[error("generated image data was not valid base64: {0}")]
    BadEncoding(#[from] base64::DecodeError),

    /// The call succeeded but no content part was an image.
    #[error("the response did not contain an image")]
    NoImage,
}

/// Seam between the controller and the outside world. The real implementation
/// talks to Gemini; tests swap in a canned one.
pub trait ImageGenerator: Send + Sync + 'static {
    /// Transform `data` according to the configured instruction and return the
    /// resulting image bytes. Resolves or fails exactly once.
    fn generate(
        &self,
        data: &[u8],
        mime_type: &str,
    ) -> impl Future<Output = Result<Vec<u8>, GenerateError>> + Send;
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    instruction: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            instruction: config.instruction.clone(),
        }
    }
}

impl ImageGenerator for GeminiClient {
    async fn generate(&self, data: &[u8], mime_type: &str) -> Result<Vec<u8>, GenerateError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let encoded = general_purpose::STANDARD.encode(data);
        let payload = request_body(&self.instruction, mime_type, &encoded);

        debug!(model = %self.model, bytes = data.len(), "sending generation request");

        let response = self.http.post(&url).json(&payload).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GenerateError::Api { status, body });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)?;
        let part = first_inline_image(&parsed).ok_or(GenerateError::NoImage)?;
        Ok(general_purpose::STANDARD.decode(&part.data)?)
    }
}

/// Request body for `models/{model}:generateContent`: the image first, then
/// the instruction, and a constraint that only an image comes back.
fn request_body(instruction: &str, mime_type: &str, base64_data: &str) -> serde_json::Value {
    json!({
        "contents": [{
            "parts": [
                {
                    "inline_data": {
                        "mime_type": mime_type,
                        "data": base64_data,
                    }
                },
                { "text": instruction }
            ]
        }],
        "generationConfig": {
            "responseModalities": ["IMAGE"]
        }
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(rename = "inlineData", alias = "inline_data")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

/// First inline-image part of the first candidate. Later parts and candidates
/// are never consulted.
fn first_inline_image(response: &GenerateContentResponse) -> Option<&InlineData> {
    response
        .candidates
        .first()?
        .content
        .as_ref()?
        .parts
        .iter()
        .find_map(|part| part.inline_data.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_has_image_instruction_and_modality() {
        let body = request_body("quítale el pelo", "image/jpeg", "AQID");
        assert_eq!(
            body["contents"][0]["parts"][0]["inline_data"]["mime_type"],
            "image/jpeg"
        );
        assert_eq!(body["contents"][0]["parts"][0]["inline_data"]["data"], "AQID");
        assert_eq!(body["contents"][0]["parts"][1]["text"], "quítale el pelo");
        assert_eq!(body["generationConfig"]["responseModalities"][0], "IMAGE");
    }

    #[test]
    fn picks_first_inline_image_skipping_text_parts() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "aquí tienes" },
                        { "inlineData": { "mimeType": "image/png", "data": "Zmlyc3Q=" } },
                        { "inlineData": { "mimeType": "image/png", "data": "c2Vjb25k" } }
                    ]
                }
            }]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let part = first_inline_image(&parsed).unwrap();
        assert_eq!(part.data, "Zmlyc3Q=");
    }

    #[test]
    fn accepts_snake_case_inline_data() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "inline_data": { "mime_type": "image/png", "data": "AQID" } }
                    ]
                }
            }]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        assert!(first_inline_image(&parsed).is_some());
    }

    #[test]
    fn no_image_when_parts_are_text_only() {
        let raw = json!({
            "candidates": [{
                "content": { "parts": [ { "text": "no puedo hacer eso" } ] }
            }]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        assert!(first_inline_image(&parsed).is_none());
    }

    #[test]
    fn no_image_when_candidates_missing() {
        let parsed: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(first_inline_image(&parsed).is_none());
    }
}
