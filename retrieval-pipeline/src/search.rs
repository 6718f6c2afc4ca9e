use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        index::{validate_index_name, IndexManifest},
    },
};
use serde::Deserialize;
use tracing::debug;

/// Minimum candidate pool handed to the HNSW search.
const EF_FLOOR: usize = 40;

/// One knn hit: the chunk and its Euclidean distance to the query vector.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    pub chunk_id: i64,
    pub text: String,
    pub distance: f32,
}

/// Nearest-neighbour search over an ingested index. Read-only.
///
/// Results are ordered by ascending distance; equal distances are broken by
/// ascending chunk id. Returns at most `k` rows, fewer when the index holds
/// fewer chunks, and an empty vector for an empty index.
///
/// Fails with `IndexNotReady` before the first successful ingestion run,
/// `InvalidConfiguration` for `k == 0`, and `DimensionMismatch` when the
/// query vector's length differs from the index's declared dimension.
pub async fn search(
    db: &SurrealDbClient,
    index_name: &str,
    query_vector: &[f32],
    k: usize,
) -> Result<Vec<RetrievedChunk>, AppError> {
    validate_index_name(index_name)?;
    if k == 0 {
        return Err(AppError::InvalidConfiguration(
            "search k must be positive".into(),
        ));
    }

    let manifest = IndexManifest::load(db, index_name)
        .await?
        .ok_or(AppError::IndexNotReady)?;

    if query_vector.len() != manifest.dimension {
        return Err(AppError::DimensionMismatch {
            expected: manifest.dimension,
            actual: query_vector.len(),
        });
    }

    let ef = k.max(EF_FLOOR);
    let sql = format!(
        "SELECT chunk_id, text, vector::distance::knn() AS distance \
         FROM {index_name} \
         WHERE embedding <|{k},{ef}|> $embedding \
         ORDER BY distance ASC, chunk_id ASC"
    );

    let mut response = db
        .query(sql)
        .bind(("embedding", query_vector.to_vec()))
        .await?;
    let rows: Vec<RetrievedChunk> = response.take(0)?;

    debug!(index = index_name, k, hits = rows.len(), "knn search complete");
    Ok(rows)
}
