//! Memory record and configuration types.

use chrono::{DateTime, Utc};
use mentor_common::PipelineRecord;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Durable form of a terminal pipeline record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Storage identifier, distinct from the run id inside `record`.
    pub id: String,

    pub created_at: DateTime<Utc>,

    pub record: PipelineRecord,

    /// Normalized token set of the problem statement, precomputed at append
    /// time so similarity queries never re-tokenize the whole log.
    pub signature: Vec<String>,
}

impl MemoryRecord {
    /// The statement this record is indexed under: the canonical statement
    /// when parsing succeeded, the raw submission text otherwise.
    pub fn statement(&self) -> &str {
        self.record
            .parsed
            .as_ref()
            .map(|p| p.canonical_statement.as_str())
            .unwrap_or(&self.record.submission.raw_text)
    }
}

/// Configuration for the memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Path to the JSONL log file.
    pub path: PathBuf,

    /// Minimum token-overlap score for a record to count as similar.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,

    /// Default number of records a similarity query returns.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_min_similarity() -> f32 {
    0.3
}

fn default_max_results() -> usize {
    3
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/memory.jsonl"),
            min_similarity: default_min_similarity(),
            max_results: default_max_results(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentor_common::ProblemSubmission;

    #[test]
    fn default_config() {
        let config = MemoryConfig::default();
        assert_eq!(config.min_similarity, 0.3);
        assert_eq!(config.max_results, 3);
    }

    #[test]
    fn statement_falls_back_to_raw_text() {
        let record = MemoryRecord {
            id: "m1".into(),
            created_at: Utc::now(),
            record: PipelineRecord::new(ProblemSubmission::text("2 + 2")),
            signature: vec![],
        };
        assert_eq!(record.statement(), "2 + 2");
    }
}
