use serde::{Deserialize, Serialize};

/// A unit of source text with identity and provenance.
///
/// Immutable once created. `sequence_no` is the chunk's position within its
/// source document; `id` is unique across the whole corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: u64,
    pub text: String,
    pub source_path: String,
    pub sequence_no: u32,
}

/// Ordered collection of chunks for one corpus, as produced by the loader.
///
/// Owns the chunks until an index build consumes them. The engine assumes
/// unique ids and non-empty text; the loader upholds both.
#[derive(Debug, Default)]
pub struct ChunkStore {
    chunks: Vec<Chunk>,
}

impl ChunkStore {
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    /// Number of distinct source documents represented.
    pub fn source_count(&self) -> usize {
        let mut sources: Vec<&str> = self.chunks.iter().map(|c| c.source_path.as_str()).collect();
        sources.sort_unstable();
        sources.dedup();
        sources.len()
    }

    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks
    }
}

/// One nearest-neighbor match: a reference into the live index plus its
/// cosine distance to the query (smaller is closer).
#[derive(Debug, Clone, Copy)]
pub struct SearchHit<'a> {
    pub chunk: &'a Chunk,
    pub distance: f32,
}

/// Provenance of one retrieved chunk, as surfaced to the caller.
///
/// `score` is the cosine distance of the chunk to the query.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub source_path: String,
    pub sequence_no: u32,
    pub score: f32,
}

/// Final answer plus the evidence it was synthesized from.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerResult {
    pub text: String,
    /// Retrieved chunks in relevance order, for citation.
    pub retrieved: Vec<RetrievedChunk>,
    /// True when the context budget dropped part of the retrieved text.
    pub truncated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_counts_distinct_sources() {
        let store = ChunkStore::from_chunks(vec![
            Chunk {
                id: 0,
                text: "a".to_string(),
                source_path: "one.txt".to_string(),
                sequence_no: 0,
            },
            Chunk {
                id: 1,
                text: "b".to_string(),
                source_path: "one.txt".to_string(),
                sequence_no: 1,
            },
            Chunk {
                id: 2,
                text: "c".to_string(),
                source_path: "two.txt".to_string(),
                sequence_no: 0,
            },
        ]);

        assert_eq!(store.len(), 3);
        assert_eq!(store.source_count(), 2);
    }
}
