//! Integration tests for the memory store.
//!
//! These exercise the JSONL-backed log end to end: durability across
//! reopen, similarity ranking, the append-only guarantee, and concurrent
//! appends.

use mentor_common::{FinalStatus, PipelineRecord, ProblemSubmission};
use mentor_memory::{MemoryConfig, MemoryStore};
use std::sync::Arc;
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> MemoryConfig {
    MemoryConfig {
        path: dir.path().join("memory.jsonl"),
        ..Default::default()
    }
}

fn resolved_record(text: &str) -> PipelineRecord {
    let mut record = PipelineRecord::new(ProblemSubmission::text(text));
    record.resolve(FinalStatus::AutoResolved);
    record
}

#[tokio::test]
async fn append_and_reload() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let store = MemoryStore::open(config.clone()).await.unwrap();
    let memory = store
        .append(&resolved_record("solve x^2 - 4x + 4 = 0"))
        .await
        .unwrap();
    assert_eq!(store.count().await, 1);

    // Reopen from disk and find the same record.
    let reopened = MemoryStore::open(config).await.unwrap();
    assert_eq!(reopened.count().await, 1);
    let similar = reopened.similar("solve x^2 - 4x + 4 = 0", 3).await;
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].id, memory.id);
}

#[tokio::test]
async fn rejects_non_terminal_records() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::open(test_config(&dir)).await.unwrap();

    let unfinished = PipelineRecord::new(ProblemSubmission::text("2 + 2"));
    assert!(store.append(&unfinished).await.is_err());
    assert_eq!(store.count().await, 0);
}

#[tokio::test]
async fn similar_ranks_by_overlap_then_recency() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::open(test_config(&dir)).await.unwrap();

    store
        .append(&resolved_record("probability of rolling two sixes with dice"))
        .await
        .unwrap();
    let close_old = store
        .append(&resolved_record("solve x^2 - 4x + 4 = 0"))
        .await
        .unwrap();
    let close_new = store
        .append(&resolved_record("solve x^2 - 4x + 4 = 0"))
        .await
        .unwrap();

    let similar = store.similar("solve x^2 - 4x + 4 = 0", 3).await;

    // The dice problem is below the overlap floor; the two quadratics tie
    // on score and the newer one wins.
    assert_eq!(similar.len(), 2);
    assert_eq!(similar[0].id, close_new.id);
    assert_eq!(similar[1].id, close_old.id);
}

#[tokio::test]
async fn similar_respects_k() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::open(test_config(&dir)).await.unwrap();

    for _ in 0..5 {
        store
            .append(&resolved_record("solve x^2 - 4x + 4 = 0"))
            .await
            .unwrap();
    }

    assert_eq!(store.similar("solve x^2 - 4x + 4 = 0", 2).await.len(), 2);
    assert!(store.similar("solve x^2 - 4x + 4 = 0", 0).await.is_empty());
}

#[tokio::test]
async fn append_only_on_disk() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let store = MemoryStore::open(config.clone()).await.unwrap();

    store
        .append(&resolved_record("solve x^2 - 4x + 4 = 0"))
        .await
        .unwrap();
    let first_line = std::fs::read_to_string(&config.path)
        .unwrap()
        .lines()
        .next()
        .unwrap()
        .to_string();

    // Queries and further appends must not rewrite existing lines.
    store.similar("solve x^2 - 4x + 4 = 0", 3).await;
    store
        .append(&resolved_record("solve x^2 - 5x + 6 = 0"))
        .await
        .unwrap();

    let content = std::fs::read_to_string(&config.path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], first_line);
}

#[tokio::test]
async fn similar_returns_only_appended_records() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::open(test_config(&dir)).await.unwrap();

    let appended = store
        .append(&resolved_record("solve x^2 - 4x + 4 = 0"))
        .await
        .unwrap();

    for record in store.similar("solve x^2 - 4x + 4 = 0", 10).await {
        assert_eq!(record.id, appended.id);
    }
}

#[tokio::test]
async fn concurrent_appends_all_land() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let store = Arc::new(MemoryStore::open(config.clone()).await.unwrap());

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .append(&resolved_record(&format!("solve x + {i} = 0")))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.count().await, 8);
    let content = std::fs::read_to_string(&config.path).unwrap();
    assert_eq!(content.lines().count(), 8);
}

#[tokio::test]
async fn corrupt_lines_are_skipped_on_open() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    {
        let store = MemoryStore::open(config.clone()).await.unwrap();
        store
            .append(&resolved_record("solve x^2 - 4x + 4 = 0"))
            .await
            .unwrap();
    }

    // Corrupt the log with a truncated line.
    let mut content = std::fs::read_to_string(&config.path).unwrap();
    content.push_str("{\"id\": \"broken\"\n");
    std::fs::write(&config.path, content).unwrap();

    let reopened = MemoryStore::open(config).await.unwrap();
    assert_eq!(reopened.count().await, 1);
}
