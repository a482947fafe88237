//! The append-only memory store.

use std::cmp::Ordering;

use chrono::Utc;
use mentor_common::{MentorError, PipelineRecord, Result};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::similarity::{jaccard, signature};
use crate::types::{MemoryConfig, MemoryRecord};

/// Append-only log of terminal pipeline records with similarity lookup.
///
/// Opened once at process start and injected into the orchestrator; there
/// is no global instance. The on-disk format is one JSON record per line.
pub struct MemoryStore {
    config: MemoryConfig,
    records: RwLock<Vec<MemoryRecord>>,
}

impl MemoryStore {
    /// Open the store, loading any existing log.
    ///
    /// Lines that fail to parse are skipped with a warning rather than
    /// poisoning the whole log.
    pub async fn open(config: MemoryConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut records = Vec::new();
        match tokio::fs::read_to_string(&config.path).await {
            Ok(content) => {
                for (line_no, line) in content.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<MemoryRecord>(line) {
                        Ok(record) => records.push(record),
                        Err(e) => warn!(
                            path = %config.path.display(),
                            line = line_no + 1,
                            error = %e,
                            "Skipping corrupt memory record"
                        ),
                    }
                }
                info!(
                    path = %config.path.display(),
                    count = records.len(),
                    "Loaded memory log"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %config.path.display(), "No memory log yet, starting fresh");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            config,
            records: RwLock::new(records),
        })
    }

    /// Append a terminal record, durably, and return its stored form.
    ///
    /// The write lock is held across the file write so concurrent appends
    /// serialize and a reader never sees a half-written record.
    pub async fn append(&self, record: &PipelineRecord) -> Result<MemoryRecord> {
        if !record.is_terminal() {
            return Err(MentorError::Memory(
                "only terminal records are persisted".into(),
            ));
        }

        let statement = record
            .parsed
            .as_ref()
            .map(|p| p.canonical_statement.as_str())
            .unwrap_or(&record.submission.raw_text);

        let memory = MemoryRecord {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            record: record.clone(),
            signature: signature(statement),
        };

        let mut line = serde_json::to_string(&memory)?;
        line.push('\n');

        let mut records = self.records.write().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        records.push(memory.clone());

        debug!(
            memory_id = %memory.id,
            run_id = %record.id,
            status = ?record.final_status,
            "Appended memory record"
        );

        Ok(memory)
    }

    /// The `k` most similar prior records, descending by overlap score,
    /// ties broken by most recent first. Records below the configured
    /// similarity floor are excluded.
    pub async fn similar(&self, statement: &str, k: usize) -> Vec<MemoryRecord> {
        if k == 0 {
            return Vec::new();
        }

        let query = signature(statement);
        let records = self.records.read().await;

        let mut scored: Vec<(f32, usize)> = records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let score = jaccard(&query, &record.signature);
                (score > self.config.min_similarity).then_some((score, index))
            })
            .collect();

        scored.sort_by(|(score_a, index_a), (score_b, index_b)| {
            score_b
                .partial_cmp(score_a)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    let (a, b) = (&records[*index_a], &records[*index_b]);
                    b.created_at
                        .cmp(&a.created_at)
                        .then_with(|| index_b.cmp(index_a))
                })
        });

        let results: Vec<MemoryRecord> = scored
            .into_iter()
            .take(k)
            .map(|(_, index)| records[index].clone())
            .collect();

        debug!(
            query_preview = %statement.chars().take(50).collect::<String>(),
            matches = results.len(),
            "Similarity lookup"
        );

        results
    }

    /// Records appended so far (the original surfaced this as a
    /// solved-problem counter).
    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }
}
