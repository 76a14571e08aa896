//! Upstream text-generation client

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{Stream, TryStreamExt};
use serde::Serialize;
use std::pin::Pin;

use crate::config::UpstreamSettings;
use crate::error::{GatewayError, Result};
use crate::validator::ValidatedPrompt;

use super::error::UpstreamError;

/// Instruction prepended to every prompt sent upstream
pub const INSTRUCTION_TEMPLATE: &str =
    "You are a legal AI assistant. Write a long HTML Terms of Service. Business context: ";

/// Raw upstream response body, chunked as it arrives
pub type UpstreamBody = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, UpstreamError>> + Send>>;

/// Request body for the generation endpoint.
///
/// Only constructible from a [`ValidatedPrompt`]:
///
/// ```compile_fail
/// use contract_gateway::relay::GenerateRequest;
///
/// let request = GenerateRequest { contents: Vec::new() };
/// ```
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct Part {
    text: String,
}

impl GenerateRequest {
    /// Wrap a validated prompt in the instruction template
    pub fn from_validated(prompt: &ValidatedPrompt) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: format!("{INSTRUCTION_TEMPLATE}{prompt}"),
                }],
            }],
        }
    }

    /// Full text of the first part
    pub fn text(&self) -> Option<&str> {
        self.contents
            .first()?
            .parts
            .first()
            .map(|p| p.text.as_str())
    }
}

/// A service that turns a generation request into a streamed response
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Open the upstream stream. Resolves once response headers arrive;
    /// non-success statuses are reported as [`UpstreamError::Status`].
    async fn open(
        &self,
        request: &GenerateRequest,
    ) -> std::result::Result<UpstreamBody, UpstreamError>;
}

/// Gemini-style endpoint: POST with the key as a `key` query parameter
pub struct GeminiUpstream {
    client: reqwest::Client,
    settings: UpstreamSettings,
}

impl GeminiUpstream {
    pub fn new(settings: UpstreamSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.read_timeout)
            .build()
            .map_err(|e| GatewayError::Upstream(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &UpstreamSettings {
        &self.settings
    }
}

#[async_trait]
impl Upstream for GeminiUpstream {
    async fn open(
        &self,
        request: &GenerateRequest,
    ) -> std::result::Result<UpstreamBody, UpstreamError> {
        tracing::debug!("Opening upstream stream to {}", self.settings.url);

        let response = self
            .client
            .post(self.settings.url.clone())
            .query(&[("key", self.settings.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(UpstreamError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                error_type = "status",
                status = %status,
                body = %body,
                "HTTP error from upstream"
            );
            return Err(UpstreamError::Status(status.as_u16()));
        }

        Ok(Box::pin(response.bytes_stream().map_err(UpstreamError::from)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidatorConfig;
    use crate::validator::PromptValidator;

    fn validated(text: &str) -> ValidatedPrompt {
        PromptValidator::new(ValidatorConfig::default())
            .unwrap()
            .validate(Some(text))
            .unwrap()
    }

    #[test]
    fn test_request_wraps_prompt_in_template() {
        let request = GenerateRequest::from_validated(&validated(
            "Draft ToS for a cloud SaaS company",
        ));

        assert_eq!(
            request.text(),
            Some(
                "You are a legal AI assistant. Write a long HTML Terms of Service. \
                 Business context: Draft ToS for a cloud SaaS company"
            )
        );
    }

    #[test]
    fn test_request_serializes_to_contents_parts() {
        let request = GenerateRequest::from_validated(&validated(
            "Privacy policy for an online store",
        ));
        let json = serde_json::to_value(&request).unwrap();

        let text = json["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.starts_with(INSTRUCTION_TEMPLATE));
        assert!(text.ends_with("Privacy policy for an online store"));
        assert_eq!(json["contents"].as_array().unwrap().len(), 1);
    }
}
