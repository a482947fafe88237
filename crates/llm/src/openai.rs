use async_trait::async_trait;
use mentor_common::{MentorError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::client::{Completion, CompletionRequest, ReasoningModel, Role, TokenUsage};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    model: String,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Client for OpenAI-compatible chat-completion endpoints (including local
/// gateways that speak the same protocol).
pub struct OpenAiModel {
    base_url: String,
    model: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl OpenAiModel {
    pub fn new(
        base_url: Option<String>,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model,
            api_key,
            http_client,
        }
    }

    fn role_to_string(role: &Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    fn build_messages(request: &CompletionRequest) -> Vec<OpenAiMessage> {
        let mut messages = Vec::new();
        if let Some(ref system) = request.system_prompt {
            messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        for msg in &request.messages {
            messages.push(OpenAiMessage {
                role: Self::role_to_string(&msg.role).to_string(),
                content: msg.content.clone(),
            });
        }
        messages
    }

    /// Build the request body for testing purposes.
    #[cfg(test)]
    fn build_request_body(&self, request: &CompletionRequest) -> OpenAiRequest {
        OpenAiRequest {
            model: self.model.clone(),
            messages: Self::build_messages(request),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

/// Classify an HTTP status: retryable upstream trouble vs. a permanent error.
pub(crate) fn classify_status(status: reqwest::StatusCode, body: &str, provider: &str) -> MentorError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        MentorError::Transient(format!("{provider} API error {status}: {body}"))
    } else {
        MentorError::Model(format!("{provider} API error {status}: {body}"))
    }
}

/// Classify a transport-level failure. Timeouts and connection errors are
/// transient; anything else (e.g. a malformed URL) is not.
pub(crate) fn classify_transport(err: reqwest::Error, provider: &str) -> MentorError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        MentorError::Transient(format!("{provider} request failed: {err}"))
    } else {
        MentorError::Model(format!("{provider} request failed: {err}"))
    }
}

#[async_trait]
impl ReasoningModel for OpenAiModel {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = OpenAiRequest {
            model: self.model.clone(),
            messages: Self::build_messages(&request),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut http_req = self.http_client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            http_req = http_req.bearer_auth(key);
        }

        let response = http_req
            .send()
            .await
            .map_err(|e| classify_transport(e, "OpenAI"))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body_text, "OpenAI"));
        }

        let oai_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| MentorError::Model(format!("Failed to parse OpenAI response: {e}")))?;

        let choice = oai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| MentorError::Model("No choices in OpenAI response".to_string()))?;

        Ok(Completion {
            text: choice.message.content,
            model: oai_response.model,
            usage: oai_response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
            finish_reason: choice.finish_reason,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::PromptMessage;

    fn test_model() -> OpenAiModel {
        OpenAiModel::new(
            None,
            "gpt-4o".to_string(),
            Some("sk-test".to_string()),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn request_body_matches_chat_completions_format() {
        let request = CompletionRequest {
            system_prompt: Some("Be rigorous.".to_string()),
            messages: vec![PromptMessage::user("Solve x + 1 = 3")],
            temperature: Some(0.2),
            max_tokens: Some(512),
        };

        let body = test_model().build_request_body(&request);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "gpt-4o");
        let temp = json["temperature"].as_f64().unwrap();
        assert!((temp - 0.2).abs() < 0.001);
        assert_eq!(json["max_tokens"], 512);

        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "Be rigorous.");
        assert_eq!(messages[1]["role"], "user");
    }

    #[test]
    fn request_body_omits_absent_fields() {
        let request = CompletionRequest {
            system_prompt: None,
            messages: vec![PromptMessage::user("Hello")],
            temperature: None,
            max_tokens: None,
        };

        let body = test_model().build_request_body(&request);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn status_classification() {
        use reqwest::StatusCode;
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, "", "OpenAI").is_transient());
        assert!(classify_status(StatusCode::BAD_GATEWAY, "", "OpenAI").is_transient());
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, "", "OpenAI").is_transient());
        assert!(!classify_status(StatusCode::UNAUTHORIZED, "", "OpenAI").is_transient());
        assert!(!classify_status(StatusCode::BAD_REQUEST, "", "OpenAI").is_transient());
    }
}
