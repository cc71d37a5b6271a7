//! Self-describing on-disk index format.
//!
//! A persisted index is a directory holding a matched triple:
//!
//! - `manifest.json`: format version marker, chunk count, dimension,
//!   distance metric, creation timestamp
//! - `chunks.json`: chunk metadata table keyed by chunk id
//! - `embeddings.bin`: binary embedding table, a magic/version/dimension/
//!   count header followed by `id (u64 LE)` + `dim x f32 LE` records
//!
//! Writes are atomic with respect to crashes: everything lands in a hidden
//! sibling staging directory first, then a rename swap replaces the target.
//! A previously valid directory is moved aside before the swap and only
//! deleted once the new index is in place, so a failed `persist` never
//! destroys a working on-disk index.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chunk::Chunk;
use super::index::{DistanceMetric, VectorIndex};
use crate::core::errors::RagError;

const MANIFEST_FILE: &str = "manifest.json";
const CHUNKS_FILE: &str = "chunks.json";
const EMBEDDINGS_FILE: &str = "embeddings.bin";

pub const FORMAT_VERSION: u32 = 1;
const EMBEDDINGS_MAGIC: u32 = 0x4E52_4147; // "NRAG"

const HEADER_LEN: usize = 4 + 4 + 4 + 8;

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    format_version: u32,
    chunk_count: u64,
    dimension: u32,
    metric: DistanceMetric,
    created_at: String,
}

/// Write `index` to `path`, replacing whatever was there.
pub fn persist(index: &VectorIndex, path: &Path) -> Result<(), RagError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| invalid_path(path))?;

    let staging = path.with_file_name(format!(".{}.tmp-{}", name, Uuid::new_v4()));
    fs::create_dir_all(&staging)?;

    if let Err(err) = write_tables(index, &staging) {
        let _ = fs::remove_dir_all(&staging);
        return Err(err);
    }

    // Swap: move any previous index aside, promote the staging directory,
    // then drop the old one. If the promotion fails the previous index is
    // restored, so the path never points at a half-written directory.
    let backup = path.with_file_name(format!(".{}.old-{}", name, Uuid::new_v4()));
    let had_previous = path.exists();
    if had_previous {
        if let Err(err) = fs::rename(path, &backup) {
            let _ = fs::remove_dir_all(&staging);
            return Err(err.into());
        }
    }

    if let Err(err) = fs::rename(&staging, path) {
        if had_previous {
            let _ = fs::rename(&backup, path);
        }
        let _ = fs::remove_dir_all(&staging);
        return Err(err.into());
    }

    if had_previous {
        let _ = fs::remove_dir_all(&backup);
    }

    tracing::debug!(path = %path.display(), chunks = index.len(), "index persisted");
    Ok(())
}

/// Load a persisted index from `path`.
///
/// `NotFound` when the directory or its manifest is absent; `CorruptIndex`
/// when the triple is present but fails any cross-check.
pub fn load(path: &Path) -> Result<VectorIndex, RagError> {
    if !path.is_dir() {
        return Err(RagError::NotFound(path.to_path_buf()));
    }

    let manifest_path = path.join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Err(RagError::NotFound(path.to_path_buf()));
    }

    let manifest_raw = fs::read_to_string(&manifest_path)?;
    let manifest: Manifest = serde_json::from_str(&manifest_raw)
        .map_err(|err| RagError::corrupt(path, format!("unreadable manifest: {err}")))?;

    if manifest.format_version != FORMAT_VERSION {
        return Err(RagError::corrupt(
            path,
            format!(
                "unsupported format version {} (expected {})",
                manifest.format_version, FORMAT_VERSION
            ),
        ));
    }

    let chunks_path = path.join(CHUNKS_FILE);
    if !chunks_path.is_file() {
        return Err(RagError::corrupt(path, "chunk table missing"));
    }
    let chunks_raw = fs::read_to_string(&chunks_path)?;
    let chunks: Vec<Chunk> = serde_json::from_str(&chunks_raw)
        .map_err(|err| RagError::corrupt(path, format!("unreadable chunk table: {err}")))?;

    let embeddings_path = path.join(EMBEDDINGS_FILE);
    if !embeddings_path.is_file() {
        return Err(RagError::corrupt(path, "embedding table missing"));
    }
    let embeddings_raw = fs::read(&embeddings_path)?;
    let (dim, records) = decode_embeddings(path, &embeddings_raw)?;

    if chunks.len() as u64 != manifest.chunk_count {
        return Err(RagError::corrupt(
            path,
            format!(
                "chunk table holds {} entries, manifest says {}",
                chunks.len(),
                manifest.chunk_count
            ),
        ));
    }
    if records.len() != chunks.len() {
        return Err(RagError::corrupt(
            path,
            format!(
                "embedding table holds {} entries, chunk table holds {}",
                records.len(),
                chunks.len()
            ),
        ));
    }
    if dim != manifest.dimension as usize {
        return Err(RagError::corrupt(
            path,
            format!(
                "embedding table is {}D, manifest says {}D",
                dim, manifest.dimension
            ),
        ));
    }

    // Pair embeddings to chunks by id; the pairing must be exactly 1:1.
    let mut by_id: std::collections::HashMap<u64, Vec<f32>> =
        records.into_iter().collect();
    let mut embeddings = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        let embedding = by_id.remove(&chunk.id).ok_or_else(|| {
            RagError::corrupt(path, format!("no embedding for chunk {}", chunk.id))
        })?;
        embeddings.push(embedding);
    }
    if let Some(orphan) = by_id.keys().next() {
        return Err(RagError::corrupt(
            path,
            format!("embedding {orphan} has no chunk"),
        ));
    }

    tracing::debug!(path = %path.display(), chunks = chunks.len(), dim, "index loaded");
    Ok(VectorIndex::from_parts(
        chunks,
        embeddings,
        dim,
        manifest.metric,
    ))
}

fn write_tables(index: &VectorIndex, dir: &Path) -> Result<(), RagError> {
    let manifest = Manifest {
        format_version: FORMAT_VERSION,
        chunk_count: index.len() as u64,
        dimension: index.dim() as u32,
        metric: index.metric(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    fs::write(dir.join(MANIFEST_FILE), to_json(&manifest)?)?;
    fs::write(dir.join(CHUNKS_FILE), to_json(index.chunks())?)?;
    fs::write(dir.join(EMBEDDINGS_FILE), encode_embeddings(index))?;
    Ok(())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, RagError> {
    serde_json::to_vec_pretty(value).map_err(|err| RagError::Io(io::Error::other(err)))
}

fn encode_embeddings(index: &VectorIndex) -> Vec<u8> {
    let dim = index.dim();
    let count = index.len();
    let mut buf = Vec::with_capacity(HEADER_LEN + count * (8 + dim * 4));

    buf.extend_from_slice(&EMBEDDINGS_MAGIC.to_le_bytes());
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&(dim as u32).to_le_bytes());
    buf.extend_from_slice(&(count as u64).to_le_bytes());

    for (chunk, embedding) in index.chunks().iter().zip(index.embeddings()) {
        buf.extend_from_slice(&chunk.id.to_le_bytes());
        for value in embedding {
            buf.extend_from_slice(&value.to_le_bytes());
        }
    }

    buf
}

fn decode_embeddings(path: &Path, bytes: &[u8]) -> Result<(usize, Vec<(u64, Vec<f32>)>), RagError> {
    if bytes.len() < HEADER_LEN {
        return Err(RagError::corrupt(path, "embedding table truncated"));
    }

    let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != EMBEDDINGS_MAGIC {
        return Err(RagError::corrupt(path, "embedding table has wrong magic"));
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != FORMAT_VERSION {
        return Err(RagError::corrupt(
            path,
            format!("embedding table version {version} (expected {FORMAT_VERSION})"),
        ));
    }
    let dim = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    let count = u64::from_le_bytes([
        bytes[12], bytes[13], bytes[14], bytes[15], bytes[16], bytes[17], bytes[18], bytes[19],
    ]) as usize;

    if dim == 0 {
        return Err(RagError::corrupt(path, "embedding table declares 0 dimensions"));
    }

    let record_len = 8 + dim * 4;
    let expected_len = count
        .checked_mul(record_len)
        .and_then(|n| n.checked_add(HEADER_LEN))
        .ok_or_else(|| RagError::corrupt(path, "embedding table header implies an impossible size"))?;
    if bytes.len() != expected_len {
        return Err(RagError::corrupt(
            path,
            format!(
                "embedding table is {} bytes, header implies {}",
                bytes.len(),
                expected_len
            ),
        ));
    }

    let mut records = Vec::with_capacity(count);
    let mut offset = HEADER_LEN;
    for _ in 0..count {
        let id = u64::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
            bytes[offset + 4],
            bytes[offset + 5],
            bytes[offset + 6],
            bytes[offset + 7],
        ]);
        offset += 8;

        let mut embedding = Vec::with_capacity(dim);
        for _ in 0..dim {
            let value = f32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ]);
            if !value.is_finite() {
                return Err(RagError::corrupt(
                    path,
                    format!("non-finite value in embedding {id}"),
                ));
            }
            embedding.push(value);
            offset += 4;
        }
        records.push((id, embedding));
    }

    Ok((dim, records))
}

fn invalid_path(path: &Path) -> RagError {
    RagError::Io(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("invalid index path: {}", path.display()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::index::DistanceMetric;

    fn make_chunk(id: u64, text: &str) -> Chunk {
        Chunk {
            id,
            text: text.to_string(),
            source_path: "doc.txt".to_string(),
            sequence_no: id as u32,
        }
    }

    fn sample_index() -> VectorIndex {
        VectorIndex::from_parts(
            vec![
                make_chunk(0, "cats are mammals"),
                make_chunk(1, "dogs are mammals"),
                make_chunk(2, "rust is a language"),
            ],
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.9, 0.1, 0.0],
                vec![0.0, 0.0, 1.0],
            ],
            3,
            DistanceMetric::Cosine,
        )
    }

    #[test]
    fn roundtrip_preserves_query_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session");

        let index = sample_index();
        persist(&index, &path).unwrap();
        let reloaded = load(&path).unwrap();

        assert_eq!(reloaded.len(), index.len());
        assert_eq!(reloaded.dim(), index.dim());

        let query = [1.0, 0.0, 0.0];
        let before: Vec<u64> = index
            .query(&query, 3)
            .unwrap()
            .iter()
            .map(|hit| hit.chunk.id)
            .collect();
        let after: Vec<u64> = reloaded
            .query(&query, 3)
            .unwrap()
            .iter()
            .map(|hit| hit.chunk.id)
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn load_missing_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("nowhere")).unwrap_err();
        assert!(matches!(err, RagError::NotFound(_)));
    }

    #[test]
    fn load_directory_without_manifest_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session");
        fs::create_dir_all(&path).unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, RagError::NotFound(_)));
    }

    #[test]
    fn load_without_chunk_table_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session");
        persist(&sample_index(), &path).unwrap();
        fs::remove_file(path.join(CHUNKS_FILE)).unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, RagError::CorruptIndex { .. }));
    }

    #[test]
    fn load_without_embedding_table_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session");
        persist(&sample_index(), &path).unwrap();
        fs::remove_file(path.join(EMBEDDINGS_FILE)).unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, RagError::CorruptIndex { .. }));
    }

    #[test]
    fn load_rejects_version_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session");
        persist(&sample_index(), &path).unwrap();

        let manifest_path = path.join(MANIFEST_FILE);
        let raw = fs::read_to_string(&manifest_path).unwrap();
        fs::write(&manifest_path, raw.replace("\"format_version\": 1", "\"format_version\": 99"))
            .unwrap();

        let err = load(&path).unwrap_err();
        match err {
            RagError::CorruptIndex { reason, .. } => assert!(reason.contains("version")),
            other => panic!("expected CorruptIndex, got {other:?}"),
        }
    }

    #[test]
    fn load_rejects_truncated_embedding_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session");
        persist(&sample_index(), &path).unwrap();

        let embeddings_path = path.join(EMBEDDINGS_FILE);
        let mut raw = fs::read(&embeddings_path).unwrap();
        raw.truncate(raw.len() - 5);
        fs::write(&embeddings_path, raw).unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, RagError::CorruptIndex { .. }));
    }

    #[test]
    fn load_rejects_count_mismatch_with_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session");
        persist(&sample_index(), &path).unwrap();

        let chunks_path = path.join(CHUNKS_FILE);
        let chunks: Vec<Chunk> =
            serde_json::from_str(&fs::read_to_string(&chunks_path).unwrap()).unwrap();
        fs::write(&chunks_path, serde_json::to_vec_pretty(&chunks[..2]).unwrap()).unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, RagError::CorruptIndex { .. }));
    }

    #[test]
    fn persist_replaces_previous_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session");

        persist(&sample_index(), &path).unwrap();

        let smaller = VectorIndex::from_parts(
            vec![make_chunk(10, "only one")],
            vec![vec![0.5, 0.5]],
            2,
            DistanceMetric::Cosine,
        );
        persist(&smaller, &path).unwrap();

        let reloaded = load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.dim(), 2);
        assert_eq!(reloaded.chunks()[0].id, 10);

        // no staging or backup leftovers
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn rebuilding_identical_index_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");

        persist(&sample_index(), &first).unwrap();
        persist(&sample_index(), &second).unwrap();

        // manifest differs by timestamp; the data tables must not
        assert_eq!(
            fs::read(first.join(CHUNKS_FILE)).unwrap(),
            fs::read(second.join(CHUNKS_FILE)).unwrap()
        );
        assert_eq!(
            fs::read(first.join(EMBEDDINGS_FILE)).unwrap(),
            fs::read(second.join(EMBEDDINGS_FILE)).unwrap()
        );
    }
}
