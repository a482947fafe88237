//! Retrieval collaborator for the Mentor pipeline.
//!
//! Only the query side lives here: given a problem statement, return the
//! top-K most similar knowledge snippets with scores. Corpus construction
//! (chunking, ingestion) happens elsewhere; an index is seeded with
//! ready-made snippets and queried by cosine similarity over an
//! [`Embedder`]'s vectors.

pub mod embedding;
pub mod index;

pub use embedding::{cosine_similarity, Embedder, HashEmbedder};
pub use index::{KnowledgeIndex, RetrievedSnippet, Retriever};
