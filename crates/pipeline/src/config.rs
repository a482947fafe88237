//! Pipeline configuration.

use mentor_agents::{SolverPolicy, VerifierPolicy};
use mentor_llm::ModelConfig;
use mentor_memory::MemoryConfig;
use serde::{Deserialize, Serialize};

use crate::gate::ConfidenceGate;

/// Bounded retry applied by the orchestrator around each stage call.
///
/// Only transient collaborator errors are retried, sequentially, with
/// exponential backoff. This sits above any per-request retry the model
/// client itself performs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRetry {
    /// Total attempts per stage, first try included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    250
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for StageRetry {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl StageRetry {
    /// Backoff before retry number `attempt` (1-based).
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        let exp = attempt.saturating_sub(1);
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exp as i32);
        (delay as u64).min(self.max_delay_ms)
    }
}

/// Everything the orchestrator needs, loadable from one TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub model: ModelConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub gate: ConfidenceGate,

    #[serde(default)]
    pub solver: SolverPolicy,

    #[serde(default)]
    pub verifier: VerifierPolicy,

    #[serde(default)]
    pub stage_retry: StageRetry,

    /// OCR/transcription confidence below this routes through input review
    /// before parsing.
    #[serde(default = "default_input_confidence_floor")]
    pub input_confidence_floor: f32,

    /// How many similar past problems to hand the solver.
    #[serde(default = "default_similar_limit")]
    pub similar_limit: usize,

    /// Bound on each human-review wait, in milliseconds. Absent means the
    /// run waits indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_timeout_ms: Option<u64>,
}

fn default_input_confidence_floor() -> f32 {
    0.7
}

fn default_similar_limit() -> usize {
    3
}

impl PipelineConfig {
    /// Defaults for everything except the model, which has no sensible
    /// default provider.
    pub fn with_model(model: ModelConfig) -> Self {
        Self {
            model,
            memory: MemoryConfig::default(),
            gate: ConfidenceGate::default(),
            solver: SolverPolicy::default(),
            verifier: VerifierPolicy::default(),
            stage_retry: StageRetry::default(),
            input_confidence_floor: default_input_confidence_floor(),
            similar_limit: default_similar_limit(),
            review_timeout_ms: None,
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
