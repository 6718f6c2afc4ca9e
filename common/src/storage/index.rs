use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{error::AppError, storage::db::SurrealDbClient};

/// Table holding one manifest record per index, keyed by index name.
pub const MANIFEST_TABLE: &str = "index_manifest";

/// A chunk with its embedding attached, ready to be written to the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedChunk {
    pub id: usize,
    pub text: String,
    pub offset: usize,
    pub embedding: Vec<f32>,
}

/// Written after a fully successful ingestion run; its presence is the
/// `Indexed` phase marker. A run that fails midway leaves no manifest, so
/// queries keep failing with `IndexNotReady` until a run completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexManifest {
    pub index_name: String,
    pub dimension: usize,
    pub chunk_count: usize,
    pub embedding_model: String,
    pub created_at: String,
}

impl IndexManifest {
    pub async fn load(
        db: &SurrealDbClient,
        index_name: &str,
    ) -> Result<Option<Self>, AppError> {
        let manifest: Option<Self> = db.select((MANIFEST_TABLE, index_name)).await?;
        Ok(manifest)
    }
}

/// Owns the lifecycle of one vector index: a SurrealDB table of chunk rows
/// with an HNSW index over `embedding`.
///
/// Distance metric is Euclidean (`DIST EUCLIDEAN`), fixed at definition
/// time; `vector::distance::knn()` distances read back from searches are
/// therefore L2 distances.
pub struct ChunkIndex {
    db: SurrealDbClient,
    table: String,
    dimension: usize,
}

impl ChunkIndex {
    /// Destroy any previous index under `name` and define a fresh table and
    /// HNSW index with the given dimension (delete-then-create, idempotent).
    ///
    /// The manifest record is removed first: from this point until
    /// `mark_ready`, the index is not considered queryable.
    pub async fn recreate(
        db: SurrealDbClient,
        name: &str,
        dimension: usize,
    ) -> Result<Self, AppError> {
        validate_index_name(name)?;
        if dimension == 0 {
            return Err(AppError::InvalidConfiguration(
                "index dimension must be positive".into(),
            ));
        }

        // Plain multi-statement query: wrapping the DDL in a transaction
        // makes the commit conflict on kv-mem whenever the table already
        // exists.
        let query = format!(
            "DELETE type::thing('{manifest}', '{name}');
             REMOVE TABLE IF EXISTS {name};
             DEFINE TABLE {name} SCHEMALESS;
             DEFINE FIELD text ON {name} TYPE string;
             DEFINE INDEX idx_embedding_{name} ON TABLE {name} \
             FIELDS embedding HNSW DIMENSION {dimension} DIST EUCLIDEAN TYPE F32 EFC 100 M 8;",
            manifest = MANIFEST_TABLE,
        );

        let res = db.query(query).await?;
        res.check()?;

        info!(index = name, dimension, "recreated vector index");

        Ok(Self {
            db,
            table: name.to_owned(),
            dimension,
        })
    }

    pub fn name(&self) -> &str {
        &self.table
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Write or overwrite the row at `chunk.id`. Visible to searches issued
    /// after this returns.
    pub async fn upsert(&self, chunk: &IndexedChunk) -> Result<(), AppError> {
        if chunk.embedding.len() != self.dimension {
            return Err(AppError::SchemaMismatch(format!(
                "chunk {} embedding has {} dimensions, index '{}' declares {}",
                chunk.id,
                chunk.embedding.len(),
                self.table,
                self.dimension
            )));
        }

        self.db
            .query(
                "UPSERT type::thing($table, $id) \
                 SET chunk_id = $id, text = $text, offset = $offset, embedding = $embedding",
            )
            .bind(("table", self.table.clone()))
            .bind(("id", chunk.id as i64))
            .bind(("text", chunk.text.clone()))
            .bind(("offset", chunk.offset as i64))
            .bind(("embedding", chunk.embedding.clone()))
            .await?
            .check()?;

        debug!(index = %self.table, chunk_id = chunk.id, "upserted chunk");
        Ok(())
    }

    /// Record a completed ingestion run, flipping the index to queryable.
    pub async fn mark_ready(
        &self,
        chunk_count: usize,
        embedding_model: &str,
    ) -> Result<IndexManifest, AppError> {
        let manifest = IndexManifest {
            index_name: self.table.clone(),
            dimension: self.dimension,
            chunk_count,
            embedding_model: embedding_model.to_owned(),
            created_at: Utc::now().to_rfc3339(),
        };

        let _: Option<IndexManifest> = self
            .db
            .upsert((MANIFEST_TABLE, self.table.as_str()))
            .content(manifest.clone())
            .await?;

        info!(index = %self.table, chunk_count, "index marked ready");
        Ok(manifest)
    }

    pub async fn count(&self) -> Result<usize, AppError> {
        count_rows(&self.db, &self.table).await
    }
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

pub async fn count_rows(db: &SurrealDbClient, table: &str) -> Result<usize, AppError> {
    validate_index_name(table)?;
    let query = format!("SELECT count() AS count FROM {table} GROUP ALL;");
    let mut response = db.query(query).await?;
    let rows: Vec<CountRow> = response.take(0)?;
    Ok(rows.first().map(|r| r.count as usize).unwrap_or(0))
}

/// Index names are spliced into SurrealQL statements, so restrict them to
/// plain identifiers.
pub fn validate_index_name(name: &str) -> Result<(), AppError> {
    let valid = !name.is_empty()
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidConfiguration(format!(
            "invalid index name '{name}': expected an identifier"
        )))
    }
}
