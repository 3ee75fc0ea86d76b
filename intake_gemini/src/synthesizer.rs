//! GeminiSynthesizer - REST implementation of the response synthesizer.

use async_trait::async_trait;
use intake_core::{ReceptionistPrompt, ResponseSynthesizer, SynthesisError, Turn};
use intake_protocol::{IntakePolicy, KnowledgeBase};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GeminiConfig;

/// Synthesizer that asks Gemini for the receptionist's next line.
#[derive(Clone)]
pub struct GeminiSynthesizer {
    client: Client,
    config: GeminiConfig,
    prompt: ReceptionistPrompt,
}

impl GeminiSynthesizer {
    /// Create a synthesizer with a fresh HTTP client.
    pub fn new(config: GeminiConfig, prompt: ReceptionistPrompt) -> Self {
        Self {
            client: Client::new(),
            config,
            prompt,
        }
    }

    /// Build from the environment, taking the physician and arrival window
    /// from the policy.
    pub fn from_env(policy: &IntakePolicy) -> Result<Self, SynthesisError> {
        Ok(Self::new(
            GeminiConfig::from_env()?,
            ReceptionistPrompt::from_policy(policy),
        ))
    }

    /// Use a preconfigured HTTP client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// The connection settings in use.
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> Result<String, SynthesisError> {
        let response = self
            .client
            .post(self.config.endpoint())
            .json(body)
            .send()
            .await
            .map_err(|err| SynthesisError::Transport(format!("Gemini API request failed: {}", err.without_url())))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read Gemini error body".to_string());
            return Err(map_http_error(status, &body_text));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| SynthesisError::Transport(format!("failed to parse Gemini response: {}", err.without_url())))?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl ResponseSynthesizer for GeminiSynthesizer {
    async fn synthesize(
        &self,
        history: &[Turn],
        raw_input: &str,
        knowledge_base: &KnowledgeBase,
    ) -> Result<String, SynthesisError> {
        let prompt = self.prompt.render(history, raw_input, knowledge_base);
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part { text: prompt }],
            }],
        };

        debug!(model = %self.config.model, turns = history.len(), "sending generateContent request");
        let result = self.send_request(&request).await;
        if let Err(error) = &result {
            warn!(model = %self.config.model, %error, "Gemini request failed");
        }
        result
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String, SynthesisError> {
    response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
        .filter(|text| !text.trim().is_empty())
        .ok_or(SynthesisError::EmptyResponse)
}

fn map_http_error(status: StatusCode, body: &str) -> SynthesisError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.to_string());

    let retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    SynthesisError::Rejected {
        status: status.as_u16(),
        message,
        retryable,
    }
}
