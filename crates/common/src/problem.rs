//! Problem submissions and the parsed form produced by the parser agent.

use serde::{Deserialize, Serialize};

/// How the problem text entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceModality {
    Text,
    Image,
    Audio,
}

/// A single user request. Created once per request and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemSubmission {
    /// Raw problem text (typed, or extracted by OCR/transcription).
    pub raw_text: String,

    /// Where the text came from.
    pub source_modality: SourceModality,

    /// Extraction confidence reported by the OCR/transcription collaborator.
    /// Absent for typed text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_confidence: Option<f32>,
}

impl ProblemSubmission {
    /// A submission typed directly by the user.
    pub fn text(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            source_modality: SourceModality::Text,
            input_confidence: None,
        }
    }

    /// A submission whose text was extracted from an image or audio clip.
    pub fn extracted(
        raw_text: impl Into<String>,
        modality: SourceModality,
        confidence: f32,
    ) -> Self {
        Self {
            raw_text: raw_text.into(),
            source_modality: modality,
            input_confidence: Some(confidence.clamp(0.0, 1.0)),
        }
    }
}

/// Broad problem category, used for prompt framing and memory tagging.
///
/// Categorization is delegated to the reasoning model and is allowed to be
/// imprecise; downstream stages only use it as a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Algebra,
    Calculus,
    Geometry,
    Trigonometry,
    Probability,
    NumberTheory,
    General,
}

impl Topic {
    /// Map a free-form label (typically model output) onto a known topic.
    pub fn from_label(label: &str) -> Option<Topic> {
        let normalized = label.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "algebra" | "linear_algebra" | "equations" => Some(Topic::Algebra),
            "calculus" | "differentiation" | "integration" | "limits" => Some(Topic::Calculus),
            "geometry" | "coordinate_geometry" => Some(Topic::Geometry),
            "trigonometry" | "trig" => Some(Topic::Trigonometry),
            "probability" | "statistics" | "combinatorics" => Some(Topic::Probability),
            "number_theory" | "arithmetic" => Some(Topic::NumberTheory),
            "general" | "other" | "mixed" => Some(Topic::General),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Algebra => "algebra",
            Topic::Calculus => "calculus",
            Topic::Geometry => "geometry",
            Topic::Trigonometry => "trigonometry",
            Topic::Probability => "probability",
            Topic::NumberTheory => "number_theory",
            Topic::General => "general",
        }
    }
}

/// Coarse difficulty estimate. Ordered so callers can compare.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Map a free-form label onto a difficulty level.
    pub fn from_label(label: &str) -> Option<Difficulty> {
        match label.trim().to_lowercase().as_str() {
            "easy" | "basic" | "simple" => Some(Difficulty::Easy),
            "medium" | "moderate" | "intermediate" => Some(Difficulty::Medium),
            "hard" | "difficult" | "advanced" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// Structured problem description produced by the parser agent.
///
/// Owned by the orchestrator for the lifetime of one run; exactly one is
/// produced per submission and it is never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedProblem {
    /// Normalized, ASCII-mathematical restatement of the problem.
    pub canonical_statement: String,

    pub topic: Topic,

    pub difficulty: Difficulty,

    /// The submission this problem was parsed from.
    pub original: ProblemSubmission,
}
