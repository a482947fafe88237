use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mentor_common::{MentorError, Result};
use serde::{Deserialize, Serialize};

use crate::anthropic::AnthropicModel;
use crate::client::{Completion, CompletionRequest, ReasoningModel};
use crate::openai::OpenAiModel;
use crate::retry::{RetryPolicy, RetryingModel};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// "openai" or "anthropic".
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_max_concurrent() -> usize {
    2
}

impl ModelConfig {
    /// Resolve the API key from config or the provider's environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        let env_var = match self.provider.as_str() {
            "openai" => "OPENAI_API_KEY",
            "anthropic" => "ANTHROPIC_API_KEY",
            _ => return None,
        };
        std::env::var(env_var).ok()
    }
}

/// Caps concurrent in-flight requests to the underlying model.
pub struct ThrottledModel {
    inner: Arc<dyn ReasoningModel>,
    semaphore: Arc<tokio::sync::Semaphore>,
}

impl ThrottledModel {
    pub fn new(inner: Arc<dyn ReasoningModel>, max_concurrent: usize) -> Self {
        Self {
            inner,
            semaphore: Arc::new(tokio::sync::Semaphore::new(max_concurrent)),
        }
    }
}

#[async_trait]
impl ReasoningModel for ThrottledModel {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| MentorError::Model(format!("Semaphore acquire failed: {e}")))?;
        self.inner.complete(request).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Assemble the full client stack for a configured provider:
/// base client, retry decorator, concurrency throttle.
pub fn build_reasoning_model(config: &ModelConfig) -> Result<Arc<dyn ReasoningModel>> {
    let timeout = Duration::from_millis(config.timeout_ms);

    let base: Box<dyn ReasoningModel> = match config.provider.as_str() {
        "openai" => Box::new(OpenAiModel::new(
            config.api_url.clone(),
            config.model.clone(),
            config.resolve_api_key(),
            timeout,
        )),
        "anthropic" => {
            let api_key = config.resolve_api_key().ok_or_else(|| {
                MentorError::Config("Anthropic requires an API key".to_string())
            })?;
            Box::new(AnthropicModel::new(config.model.clone(), api_key, timeout))
        }
        other => {
            return Err(MentorError::Config(format!(
                "Unknown model provider: {other}"
            )));
        }
    };

    let retrying: Box<dyn ReasoningModel> =
        Box::new(RetryingModel::new(base, config.retry.clone()));

    let throttled = ThrottledModel::new(Arc::from(retrying), config.max_concurrent_requests);

    Ok(Arc::new(throttled))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML_CONFIG: &str = r#"
provider = "openai"
model = "gpt-4o"
api_url = "http://localhost:11434"
timeout_ms = 20000
max_concurrent_requests = 4

[retry]
max_retries = 5
initial_delay_ms = 1000
max_delay_ms = 60000
backoff_multiplier = 3.0
"#;

    #[test]
    fn deserialize_config_from_toml() {
        let config: ModelConfig = toml::from_str(TOML_CONFIG).unwrap();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.api_url.as_deref(), Some("http://localhost:11434"));
        assert!(config.api_key.is_none());
        assert_eq!(config.timeout_ms, 20000);
        assert_eq!(config.max_concurrent_requests, 4);
        assert_eq!(config.retry.max_retries, 5);
    }

    #[test]
    fn deserialize_config_defaults() {
        let toml_str = r#"
provider = "anthropic"
model = "claude-sonnet-4-20250514"
api_key = "sk-ant-test"
"#;
        let config: ModelConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.timeout_ms, 60_000);
        assert_eq!(config.max_concurrent_requests, 2);
        assert_eq!(config.retry.max_retries, 3);
    }

    fn base_config(provider: &str) -> ModelConfig {
        ModelConfig {
            provider: provider.to_string(),
            model: "test-model".to_string(),
            api_key: Some("sk-test".to_string()),
            api_url: None,
            temperature: None,
            max_tokens: None,
            timeout_ms: default_timeout_ms(),
            max_concurrent_requests: 2,
            retry: RetryPolicy::default(),
        }
    }

    #[test]
    fn build_openai_model() {
        let model = build_reasoning_model(&base_config("openai")).unwrap();
        assert_eq!(model.model_name(), "test-model");
    }

    #[test]
    fn build_anthropic_model() {
        let model = build_reasoning_model(&base_config("anthropic")).unwrap();
        assert_eq!(model.model_name(), "test-model");
    }

    #[test]
    fn build_anthropic_without_key_fails() {
        let mut config = base_config("anthropic");
        config.api_key = None;
        // A key may still come from the environment; only assert failure
        // when it is genuinely absent.
        if std::env::var("ANTHROPIC_API_KEY").is_err() {
            assert!(build_reasoning_model(&config).is_err());
        }
    }

    #[test]
    fn build_unknown_provider_fails() {
        assert!(build_reasoning_model(&base_config("gemini")).is_err());
    }

    #[tokio::test]
    async fn throttled_model_limits_concurrency() {
        use std::sync::atomic::{AtomicU32, Ordering};

        struct CountingModel {
            concurrent: Arc<AtomicU32>,
            max_seen: Arc<AtomicU32>,
        }

        #[async_trait]
        impl ReasoningModel for CountingModel {
            async fn complete(&self, _request: CompletionRequest) -> Result<Completion> {
                let current = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_seen.fetch_max(current, Ordering::SeqCst);
                tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
                self.concurrent.fetch_sub(1, Ordering::SeqCst);
                Ok(Completion {
                    text: "ok".to_string(),
                    model: "test".to_string(),
                    usage: None,
                    finish_reason: None,
                })
            }
            fn model_name(&self) -> &str {
                "test"
            }
        }

        let concurrent = Arc::new(AtomicU32::new(0));
        let max_seen = Arc::new(AtomicU32::new(0));

        let inner = Arc::new(CountingModel {
            concurrent: concurrent.clone(),
            max_seen: max_seen.clone(),
        });

        let throttled = Arc::new(ThrottledModel::new(inner, 2));

        let mut handles = vec![];
        for _ in 0..6 {
            let model = throttled.clone();
            handles.push(tokio::spawn(async move {
                model.complete(CompletionRequest::default()).await.unwrap();
            }));
        }

        for h in handles {
            h.await.unwrap();
        }

        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }
}
