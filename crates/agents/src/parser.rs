//! Parser agent: raw text in, structured problem out.

use std::sync::Arc;

use mentor_common::{
    Difficulty, MentorError, ParsedProblem, ProblemSubmission, Result, Topic,
};
use mentor_llm::{CompletionRequest, ReasoningModel};
use tracing::{debug, warn};

use crate::output::extract_json_object;

const PARSER_SYSTEM_PROMPT: &str = r#"You are a math problem classifier. Given a problem statement, respond ONLY with a JSON object, no other text:

{
  "topic": "algebra|calculus|geometry|trigonometry|probability|number_theory|general",
  "difficulty": "easy|medium|hard",
  "canonical_statement": "the problem restated precisely in plain ASCII math notation"
}

Rules:
- Keep the canonical statement faithful to the original problem; do not solve it.
- Use ^ for powers, * for multiplication, / for division.
- Pick the single best-fitting topic."#;

/// Turns a raw submission into a [`ParsedProblem`].
///
/// Deterministic given the same model response; categorization across calls
/// is only as stable as the model itself, which downstream stages tolerate.
pub struct ParserAgent {
    model: Arc<dyn ReasoningModel>,
}

impl ParserAgent {
    pub fn new(model: Arc<dyn ReasoningModel>) -> Self {
        Self { model }
    }

    /// Parse a submission, optionally overriding its text with a
    /// reviewer-corrected version.
    pub async fn parse(
        &self,
        submission: &ProblemSubmission,
        corrected_text: Option<&str>,
    ) -> Result<ParsedProblem> {
        let raw = corrected_text.unwrap_or(&submission.raw_text);
        let normalized = normalize(raw);

        if !has_math_content(&normalized) {
            return Err(MentorError::Input(
                "no identifiable mathematical content".into(),
            ));
        }

        let (topic, difficulty, canonical) = match self.categorize(&normalized).await {
            Ok(parts) => parts,
            Err(e) if e.is_transient() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Model categorization failed, using keyword fallback");
                (keyword_topic(&normalized), keyword_difficulty(&normalized), None)
            }
        };

        let canonical_statement = canonical.unwrap_or_else(|| normalized.clone());

        debug!(
            topic = topic.as_str(),
            difficulty = ?difficulty,
            statement_preview = %canonical_statement.chars().take(50).collect::<String>(),
            "Parsed problem"
        );

        Ok(ParsedProblem {
            canonical_statement,
            topic,
            difficulty,
            original: submission.clone(),
        })
    }

    async fn categorize(
        &self,
        normalized: &str,
    ) -> Result<(Topic, Difficulty, Option<String>)> {
        let request =
            CompletionRequest::single_turn(PARSER_SYSTEM_PROMPT, normalized).with_temperature(0.2);
        let completion = self.model.complete(request).await?;

        let json_str = extract_json_object(&completion.text).ok_or_else(|| {
            MentorError::Model(format!(
                "no JSON in categorization response: {}",
                completion.text.chars().take(100).collect::<String>()
            ))
        })?;
        let parsed: serde_json::Value = serde_json::from_str(json_str)?;

        let topic = parsed
            .get("topic")
            .and_then(|v| v.as_str())
            .and_then(Topic::from_label)
            .unwrap_or_else(|| keyword_topic(normalized));

        let difficulty = parsed
            .get("difficulty")
            .and_then(|v| v.as_str())
            .and_then(Difficulty::from_label)
            .unwrap_or_else(|| keyword_difficulty(normalized));

        let canonical = parsed
            .get("canonical_statement")
            .and_then(|v| v.as_str())
            .map(|s| normalize(s))
            .filter(|s| has_math_content(s));

        Ok((topic, difficulty, canonical))
    }
}

/// Normalize common mathematical glyphs into the ASCII forms the symbolic
/// engine understands, and collapse whitespace.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        match c {
            '⁰' => out.push_str("^0"),
            '¹' => out.push_str("^1"),
            '²' => out.push_str("^2"),
            '³' => out.push_str("^3"),
            '⁴' => out.push_str("^4"),
            '⁵' => out.push_str("^5"),
            '⁶' => out.push_str("^6"),
            '⁷' => out.push_str("^7"),
            '⁸' => out.push_str("^8"),
            '⁹' => out.push_str("^9"),
            '×' => out.push('*'),
            '·' => out.push('*'),
            '÷' => out.push('/'),
            '−' | '–' => out.push('-'),
            _ => out.push(c),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

const MATH_KEYWORDS: &[&str] = &[
    "solve", "evaluate", "simplify", "integrate", "differentiate", "derivative", "limit",
    "probability", "equation", "root", "factor", "angle", "triangle", "area", "perimeter",
    "prime", "divisible", "sum", "product",
];

/// Whether normalized text contains anything recognizably mathematical.
pub fn has_math_content(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    if text.chars().any(|c| c.is_ascii_digit()) {
        return true;
    }
    if text.contains(['=', '+', '^', '/']) || text.contains('*') {
        return true;
    }
    let lower = text.to_lowercase();
    MATH_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Keyword classification, used when the model's tag is unusable.
fn keyword_topic(text: &str) -> Topic {
    let lower = text.to_lowercase();

    if lower.contains("derivative")
        || lower.contains("differentiate")
        || lower.contains("integra")
        || lower.contains("limit")
        || lower.contains("dx")
    {
        return Topic::Calculus;
    }

    if lower.contains("sin") || lower.contains("cos") || lower.contains("tan") || lower.contains("trig")
    {
        return Topic::Trigonometry;
    }

    if lower.contains("probability")
        || lower.contains("dice")
        || lower.contains("coin")
        || lower.contains("chance")
        || lower.contains("permutation")
        || lower.contains("combination")
    {
        return Topic::Probability;
    }

    if lower.contains("area")
        || lower.contains("perimeter")
        || lower.contains("circle")
        || lower.contains("triangle")
        || lower.contains("volume")
    {
        return Topic::Geometry;
    }

    if lower.contains("prime")
        || lower.contains("divisible")
        || lower.contains("gcd")
        || lower.contains("lcm")
        || lower.contains("remainder")
        || lower.contains("modulo")
    {
        return Topic::NumberTheory;
    }

    if lower.contains("solve")
        || lower.contains("equation")
        || lower.contains("root")
        || lower.contains("factor")
        || lower.contains("polynomial")
        || lower.contains('=')
    {
        return Topic::Algebra;
    }

    Topic::General
}

fn keyword_difficulty(text: &str) -> Difficulty {
    let lower = text.to_lowercase();
    if lower.contains("prove") || lower.contains("integra") || lower.contains("limit") {
        Difficulty::Hard
    } else {
        Difficulty::Medium
    }
}
