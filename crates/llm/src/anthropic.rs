use async_trait::async_trait;
use mentor_common::{MentorError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::client::{Completion, CompletionRequest, ReasoningModel, Role, TokenUsage};
use crate::openai::{classify_status, classify_transport};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicContent>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    model: String,
    usage: Option<AnthropicUsage>,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

pub struct AnthropicModel {
    model: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl AnthropicModel {
    pub fn new(model: String, api_key: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            model,
            api_key,
            http_client,
        }
    }

    fn role_to_string(role: &Role) -> &'static str {
        match role {
            Role::System => "user", // system text goes in the top-level system field
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    fn build_messages(request: &CompletionRequest) -> Vec<AnthropicMessage> {
        request
            .messages
            .iter()
            .filter(|msg| msg.role != Role::System)
            .map(|msg| AnthropicMessage {
                role: Self::role_to_string(&msg.role).to_string(),
                content: vec![AnthropicContent {
                    content_type: "text".to_string(),
                    text: msg.content.clone(),
                }],
            })
            .collect()
    }

    /// Build the request body for testing purposes.
    #[cfg(test)]
    fn build_request_body(&self, request: &CompletionRequest) -> AnthropicRequest {
        AnthropicRequest {
            model: self.model.clone(),
            messages: Self::build_messages(request),
            system: request.system_prompt.clone(),
            temperature: request.temperature,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }
}

#[async_trait]
impl ReasoningModel for AnthropicModel {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let body = AnthropicRequest {
            model: self.model.clone(),
            messages: Self::build_messages(&request),
            system: request.system_prompt.clone(),
            temperature: request.temperature,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        };

        let response = self
            .http_client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport(e, "Anthropic"))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body_text, "Anthropic"));
        }

        let anthropic_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| MentorError::Model(format!("Failed to parse Anthropic response: {e}")))?;

        let text = anthropic_response
            .content
            .into_iter()
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(Completion {
            text,
            model: anthropic_response.model,
            usage: anthropic_response.usage.map(|u| TokenUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
            }),
            finish_reason: anthropic_response.stop_reason,
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

    fn test_model() -> AnthropicModel {
        AnthropicModel::new(
            "claude-sonnet-4-20250514".to_string(),
            "sk-ant-test".to_string(),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn request_body_matches_messages_format() {
        let request = CompletionRequest {
            system_prompt: Some("Be rigorous.".to_string()),
            messages: vec![
                PromptMessage::user("Solve x + 1 = 3"),
                PromptMessage {
                    role: Role::Assistant,
                    content: "x = 2".to_string(),
                },
                PromptMessage::user("Explain why"),
            ],
            temperature: Some(0.7),
            max_tokens: Some(1024),
        };

        let body = test_model().build_request_body(&request);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "claude-sonnet-4-20250514");
        assert_eq!(json["system"], "Be rigorous.");
        assert_eq!(json["max_tokens"], 1024);

        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"][0]["type"], "text");
        assert_eq!(messages[1]["role"], "assistant");
    }

    #[test]
    fn system_prompt_is_top_level_not_in_messages() {
        let request = CompletionRequest::single_turn("System instruction", "Hello");

        let body = test_model().build_request_body(&request);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["system"], "System instruction");
        for msg in json["messages"].as_array().unwrap() {
            assert_ne!(msg["role"], "system");
        }
    }

    #[test]
    fn default_max_tokens_when_none() {
        let request = CompletionRequest::single_turn("sys", "Hello");
        let body = test_model().build_request_body(&request);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["max_tokens"], 4096);
    }
}
