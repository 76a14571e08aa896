//! Tests for the HTTP upstream client against a mock server
//!
//! Checks the outgoing request shape, status and transport error
//! classification, and end-to-end framing through the relay.

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;
use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

use contract_gateway::config::{UpstreamSettings, ValidatorConfig};
use contract_gateway::relay::{
    GeminiUpstream, GenerateRequest, INSTRUCTION_TEMPLATE, Upstream, UpstreamError, relay_stream,
};
use contract_gateway::validator::PromptValidator;

// =============================================================================
// Test Fixtures
// =============================================================================

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.0-flash:streamGenerateContent";
const PROMPT: &str = "Draft ToS for a cloud SaaS company";

fn settings_for(base: &str) -> UpstreamSettings {
    UpstreamSettings {
        url: Url::parse(&format!("{base}{GENERATE_PATH}")).unwrap(),
        api_key: "test-key".to_string(),
        connect_timeout: Duration::from_millis(500),
        read_timeout: Duration::from_millis(500),
    }
}

fn generate_request() -> GenerateRequest {
    let prompt = PromptValidator::new(ValidatorConfig::default())
        .unwrap()
        .validate(Some(PROMPT))
        .unwrap();
    GenerateRequest::from_validated(&prompt)
}

async fn relay_output(upstream: GeminiUpstream) -> String {
    let frames: Vec<_> = relay_stream(Arc::new(upstream), generate_request(), Uuid::new_v4())
        .map(|frame| frame.unwrap())
        .collect()
        .await;
    frames
        .iter()
        .map(|f| String::from_utf8_lossy(f).into_owned())
        .collect()
}

fn error_frame(message: &str) -> String {
    format!("data: {{\"error\": \"{message}\", \"type\": \"error\"}}\n\n")
}

// =============================================================================
// Request Shape
// =============================================================================

mod request_tests {
    use super::*;

    #[tokio::test]
    async fn test_post_with_key_query_and_template_body() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path(GENERATE_PATH))
            .and(matchers::query_param("key", "test-key"))
            .and(matchers::header("content-type", "application/json"))
            .and(matchers::body_partial_json(serde_json::json!({
                "contents": [{"parts": [{"text": format!("{INSTRUCTION_TEMPLATE}{PROMPT}")}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"a\":1}\n{\"b\":2}\n"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let upstream = GeminiUpstream::new(settings_for(&mock_server.uri())).unwrap();
        let output = relay_output(upstream).await;

        assert_eq!(output, "data: {\"a\":1}\n\ndata: {\"b\":2}\n\n");
    }

    #[tokio::test]
    async fn test_settings_accessor() {
        let upstream = GeminiUpstream::new(settings_for("http://127.0.0.1:9")).unwrap();
        assert_eq!(upstream.settings().api_key, "test-key");
        assert!(upstream.settings().url.path().ends_with(":streamGenerateContent"));
    }
}

// =============================================================================
// Status Classification
// =============================================================================

mod status_tests {
    use super::*;

    async fn open_with_status(status: u16) -> UpstreamError {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(
                ResponseTemplate::new(status).set_body_string("{\"error\":\"upstream detail\"}"),
            )
            .mount(&mock_server)
            .await;

        let upstream = GeminiUpstream::new(settings_for(&mock_server.uri())).unwrap();
        match upstream.open(&generate_request()).await {
            Ok(_) => panic!("expected status {status} to fail"),
            Err(e) => e,
        }
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let err = open_with_status(401).await;
        assert_eq!(err, UpstreamError::Status(401));
        assert_eq!(
            err.user_message(),
            "Authentication failed. Please check API configuration."
        );
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let err = open_with_status(429).await;
        assert_eq!(
            err.user_message(),
            "Rate limit exceeded. Please try again later."
        );
    }

    #[tokio::test]
    async fn test_server_errors() {
        for status in [500, 503] {
            let err = open_with_status(status).await;
            assert_eq!(
                err.user_message(),
                "AI service is temporarily unavailable. Please try again later."
            );
        }
    }

    #[tokio::test]
    async fn test_other_client_error() {
        let err = open_with_status(404).await;
        assert_eq!(err.user_message(), "AI service error. Please try again.");
    }

    #[tokio::test]
    async fn test_status_body_is_not_relayed() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("secret internal detail"))
            .mount(&mock_server)
            .await;

        let upstream = GeminiUpstream::new(settings_for(&mock_server.uri())).unwrap();
        let output = relay_output(upstream).await;

        assert_eq!(
            output,
            error_frame("AI service is temporarily unavailable. Please try again later.")
        );
        assert!(!output.contains("secret"));
    }
}

// =============================================================================
// Transport Failures
// =============================================================================

mod transport_tests {
    use super::*;

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{\"late\":true}\n")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let upstream = GeminiUpstream::new(settings_for(&mock_server.uri())).unwrap();
        let output = relay_output(upstream).await;

        assert_eq!(output, error_frame("Request timeout. Please try again."));
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let upstream = GeminiUpstream::new(settings_for(&format!("http://127.0.0.1:{port}"))).unwrap();
        let output = relay_output(upstream).await;

        assert_eq!(
            output,
            error_frame("Unable to connect to AI service. Please try again later.")
        );
    }
}
