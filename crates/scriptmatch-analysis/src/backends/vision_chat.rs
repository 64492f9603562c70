//! Vision-capable chat-completions backend. Both specimens travel as base64
//! data URLs in a single request; the reply is parsed for the structured
//! similarity line and otherwise kept verbatim as advisory text.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use crate::error::AnalysisError;
use crate::provider::AnalysisProvider;
use crate::request::AnalysisRequest;
use crate::response::AnalysisReport;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

const SYSTEM_PROMPT: &str = "You are an expert forensic document examiner specializing in \
handwriting analysis. Analyze the two handwriting samples provided and compare them for \
authorship determination. Focus on: letter formations, slant consistency, spacing patterns, \
pressure indicators, baseline alignment, connecting strokes, unique characteristics, and \
overall writing style. Provide a similarity score from 0-100 and detailed analysis.";

const USER_PROMPT: &str = "Compare these two handwriting samples for forensic analysis.\n\n\
The first image is the Questioned Document (sample to be verified).\n\
The second image is the Known Sample (reference sample).\n\n\
Provide your analysis in this exact format:\n\
SIMILARITY_SCORE: [0-100]\n\
CONFIDENCE: [LOW/MEDIUM/HIGH]\n\
KEY_SIMILARITIES: [list main similar features]\n\
KEY_DIFFERENCES: [list main different features]\n\
DETAILED_ANALYSIS: [comprehensive analysis paragraph]";

#[derive(Clone, Debug)]
pub struct VisionChatConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for VisionChatConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

pub struct VisionChatProvider {
    config: VisionChatConfig,
    client: reqwest::Client,
}

impl VisionChatProvider {
    pub fn new(config: VisionChatConfig) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| AnalysisError::http(err.to_string()))?;
        Ok(Self { config, client })
    }

    fn request_body(&self, request: &AnalysisRequest<'_>) -> Value {
        json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": SYSTEM_PROMPT,
                },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": USER_PROMPT },
                        {
                            "type": "image_url",
                            "image_url": { "url": data_url(request.questioned_png) },
                        },
                        {
                            "type": "image_url",
                            "image_url": { "url": data_url(request.known_png) },
                        },
                    ],
                },
            ],
        })
    }

    async fn send(&self, request: AnalysisRequest<'_>) -> Result<AnalysisReport, AnalysisError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(AnalysisError::MissingCredentials)?;
        let body = self.request_body(&request);
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| map_transport_error(err, self.config.timeout.as_secs()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AnalysisError::http(format!(
                "{status}: {}",
                detail.chars().take(200).collect::<String>()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| AnalysisError::malformed(err.to_string()))?;
        let text = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AnalysisError::malformed("reply has no message content"))?
            .to_string();
        Ok(AnalysisReport::from_text(text))
    }
}

impl AnalysisProvider for VisionChatProvider {
    fn name(&self) -> &'static str {
        "vision-chat"
    }

    fn analyze<'a>(
        &'a self,
        request: AnalysisRequest<'a>,
    ) -> BoxFuture<'a, Result<AnalysisReport, AnalysisError>> {
        Box::pin(self.send(request))
    }
}

fn data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(png))
}

fn map_transport_error(err: reqwest::Error, timeout_secs: u64) -> AnalysisError {
    if err.is_timeout() {
        AnalysisError::Timeout { secs: timeout_secs }
    } else {
        AnalysisError::http(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_both_specimens() {
        let provider = VisionChatProvider::new(VisionChatConfig {
            api_key: Some("key".to_string()),
            ..VisionChatConfig::default()
        })
        .unwrap();
        let body = provider.request_body(&AnalysisRequest::new(b"first", b"second"));

        let content = &body["messages"][1]["content"];
        assert_eq!(content.as_array().unwrap().len(), 3);
        let first_url = content[1]["image_url"]["url"].as_str().unwrap();
        assert!(first_url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn missing_credentials_fail_before_any_network_use() {
        let provider = VisionChatProvider::new(VisionChatConfig::default()).unwrap();
        let request = AnalysisRequest::new(b"a", b"b");
        let err = futures_util::future::FutureExt::now_or_never(provider.analyze(request))
            .expect("fails before any await point")
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MissingCredentials));
    }
}
