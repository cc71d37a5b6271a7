//! In-memory vector index over one chunk collection.
//!
//! Embeddings are computed once at build time and never mutated; a rebuild
//! constructs a fresh index and the session handle swaps it in atomically.
//! Search is a brute-force cosine scan, which is the right trade for the
//! corpus sizes this engine targets (hundreds to low thousands of chunks).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::chunk::{Chunk, ChunkStore, SearchHit};
use crate::core::errors::RagError;
use crate::llm::provider::EmbeddingProvider;

/// Distance metric used for nearest-neighbor ranking, recorded in the
/// persisted manifest so a loaded index knows how it was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    Cosine,
}

#[derive(Debug)]
pub struct VectorIndex {
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f32>>,
    dim: usize,
    metric: DistanceMetric,
}

impl VectorIndex {
    /// Embed every chunk and construct a `Ready` index.
    ///
    /// Fails atomically: any provider error, non-finite vector, or
    /// mid-build dimension change aborts the whole build and no index is
    /// exposed. An empty store fails with `EmptyCorpus`.
    pub async fn build(
        store: ChunkStore,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Self, RagError> {
        if store.is_empty() {
            return Err(RagError::EmptyCorpus);
        }

        let chunks = store.into_chunks();
        let mut embeddings = Vec::with_capacity(chunks.len());
        let mut dim = 0usize;

        for chunk in &chunks {
            let vector = embedder.embed(&chunk.text).await?;
            if vector.is_empty() {
                return Err(RagError::Embedding(format!(
                    "provider returned an empty vector for chunk {}",
                    chunk.id
                )));
            }
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(RagError::Embedding(format!(
                    "provider returned a non-finite value for chunk {}",
                    chunk.id
                )));
            }
            if dim == 0 {
                dim = vector.len();
            } else if vector.len() != dim {
                return Err(RagError::DimensionMismatch {
                    expected: dim,
                    actual: vector.len(),
                });
            }
            embeddings.push(vector);
        }

        tracing::info!(chunks = chunks.len(), dim, "vector index built");

        Ok(Self {
            chunks,
            embeddings,
            dim,
            metric: DistanceMetric::Cosine,
        })
    }

    /// Reassemble an index from persisted parts. The caller (`persist::load`)
    /// has already validated counts, dimensions, and id pairing.
    pub(crate) fn from_parts(
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
        dim: usize,
        metric: DistanceMetric,
    ) -> Self {
        debug_assert_eq!(chunks.len(), embeddings.len());
        debug_assert!(embeddings.iter().all(|e| e.len() == dim));
        Self {
            chunks,
            embeddings,
            dim,
            metric,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Indexed chunks in corpus order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub(crate) fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    /// Return the `min(k, n)` chunks nearest to `vector`, ascending by
    /// cosine distance, ties broken by ascending chunk id.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit<'_>>, RagError> {
        if vector.len() != self.dim {
            return Err(RagError::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }

        let mut hits: Vec<SearchHit<'_>> = self
            .chunks
            .iter()
            .zip(self.embeddings.iter())
            .map(|(chunk, embedding)| SearchHit {
                chunk,
                distance: cosine_distance(vector, embedding),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        hits.truncate(k);

        Ok(hits)
    }
}

/// Cosine distance (1 - cosine similarity). Zero-norm vectors score as
/// maximally distant rather than erroring.
pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    /// Deterministic embedder mapping known texts to fixed vectors.
    struct TableEmbedder {
        rows: Vec<(&'static str, Vec<f32>)>,
    }

    #[async_trait]
    impl EmbeddingProvider for TableEmbedder {
        fn name(&self) -> &str {
            "table-stub"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
            self.rows
                .iter()
                .find(|(key, _)| *key == text)
                .map(|(_, vector)| vector.clone())
                .ok_or_else(|| RagError::Embedding(format!("no stub vector for {text:?}")))
        }
    }

    fn make_chunk(id: u64, text: &str) -> Chunk {
        Chunk {
            id,
            text: text.to_string(),
            source_path: "doc.txt".to_string(),
            sequence_no: id as u32,
        }
    }

    fn three_chunk_index() -> (ChunkStore, TableEmbedder) {
        let store = ChunkStore::from_chunks(vec![
            make_chunk(0, "alpha"),
            make_chunk(1, "beta"),
            make_chunk(2, "gamma"),
        ]);
        let embedder = TableEmbedder {
            rows: vec![
                ("alpha", vec![1.0, 0.0, 0.0]),
                ("beta", vec![0.9, 0.1, 0.0]),
                ("gamma", vec![0.0, 0.0, 1.0]),
            ],
        };
        (store, embedder)
    }

    #[tokio::test]
    async fn build_empty_store_fails() {
        let embedder = TableEmbedder { rows: vec![] };
        let err = VectorIndex::build(ChunkStore::default(), &embedder)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::EmptyCorpus));
    }

    #[tokio::test]
    async fn build_propagates_provider_failure() {
        let store = ChunkStore::from_chunks(vec![make_chunk(0, "alpha"), make_chunk(1, "beta")]);
        let embedder = TableEmbedder {
            rows: vec![("alpha", vec![1.0, 0.0])],
        };
        let err = VectorIndex::build(store, &embedder).await.unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
    }

    #[tokio::test]
    async fn build_rejects_mixed_dimensions() {
        let store = ChunkStore::from_chunks(vec![make_chunk(0, "alpha"), make_chunk(1, "beta")]);
        let embedder = TableEmbedder {
            rows: vec![("alpha", vec![1.0, 0.0]), ("beta", vec![1.0, 0.0, 0.0])],
        };
        let err = VectorIndex::build(store, &embedder).await.unwrap_err();
        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[tokio::test]
    async fn build_rejects_non_finite_vectors() {
        let store = ChunkStore::from_chunks(vec![make_chunk(0, "alpha")]);
        let embedder = TableEmbedder {
            rows: vec![("alpha", vec![f32::NAN, 0.0])],
        };
        let err = VectorIndex::build(store, &embedder).await.unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
    }

    #[tokio::test]
    async fn query_ranks_by_distance() {
        let (store, embedder) = three_chunk_index();
        let index = VectorIndex::build(store, &embedder).await.unwrap();

        let hits = index.query(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.id, 0);
        assert_eq!(hits[1].chunk.id, 1);
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn query_k_larger_than_corpus_returns_all() {
        let (store, embedder) = three_chunk_index();
        let index = VectorIndex::build(store, &embedder).await.unwrap();

        let hits = index.query(&[1.0, 0.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn query_k_zero_returns_nothing() {
        let (store, embedder) = three_chunk_index();
        let index = VectorIndex::build(store, &embedder).await.unwrap();
        assert!(index.query(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_wrong_dimension_fails() {
        let (store, embedder) = three_chunk_index();
        let index = VectorIndex::build(store, &embedder).await.unwrap();

        let err = index.query(&[1.0, 0.0], 2).unwrap_err();
        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[tokio::test]
    async fn equidistant_chunks_tie_break_by_id() {
        let store = ChunkStore::from_chunks(vec![
            make_chunk(7, "same"),
            make_chunk(3, "same-again"),
            make_chunk(5, "same-more"),
        ]);
        let embedder = TableEmbedder {
            rows: vec![
                ("same", vec![0.5, 0.5]),
                ("same-again", vec![0.5, 0.5]),
                ("same-more", vec![0.5, 0.5]),
            ],
        };
        let index = VectorIndex::build(store, &embedder).await.unwrap();

        let hits = index.query(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<u64> = hits.iter().map(|hit| hit.chunk.id).collect();
        assert_eq!(ids, vec![3, 5, 7]);
    }

    #[test]
    fn cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        // zero vector: defined as no similarity, not an error
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
