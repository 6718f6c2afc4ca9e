use std::time::{Duration, Instant};

use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        index::{ChunkIndex, IndexedChunk},
    },
    utils::{config::AppConfig, embedding::EmbeddingProvider, timeout::bounded},
};
use tracing::{debug, info};

use crate::{
    chunker::chunk_text,
    extract::{extract_text, DocumentSource},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionReport {
    pub chunks: usize,
    pub dimension: usize,
}

/// Sequences one ingestion run: extract, chunk, embed, recreate the index,
/// populate it, then mark it queryable.
///
/// The index is fully rebuilt on every run, so re-running with identical
/// source text is idempotent. A failure at any stage aborts the run without
/// rollback; because the ready marker is only written at the end, queries
/// keep reporting `IndexNotReady` until a run completes, and the next
/// successful run is the recovery path.
pub struct IngestionPipeline {
    db: SurrealDbClient,
    embedder: EmbeddingProvider,
    config: AppConfig,
}

impl IngestionPipeline {
    pub fn new(db: SurrealDbClient, embedder: EmbeddingProvider, config: AppConfig) -> Self {
        Self {
            db,
            embedder,
            config,
        }
    }

    #[tracing::instrument(skip_all, fields(index = %self.config.index_name))]
    pub async fn ingest(&self, source: &DocumentSource) -> Result<IngestionReport, AppError> {
        let started = Instant::now();
        let limit = Duration::from_secs(self.config.request_timeout_secs);

        let text = bounded("text extraction", limit, extract_text(source)).await?;

        let chunks = chunk_text(&text, self.config.chunk_size)?;
        debug!(chunk_count = chunks.len(), "document chunked");

        // Ids are assigned before the embedding call and the batch API
        // returns one vector per input in input order, so each embedding
        // lands on the chunk it was derived from.
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = bounded("embedding", limit, self.embedder.embed_batch(texts)).await?;
        if embeddings.len() != chunks.len() {
            return Err(AppError::EmbeddingService(format!(
                "embedding count {} does not match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        let index = bounded(
            "index creation",
            limit,
            ChunkIndex::recreate(
                self.db.clone(),
                &self.config.index_name,
                self.embedder.dimension(),
            ),
        )
        .await?;

        let chunk_count = chunks.len();
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            let indexed = IndexedChunk {
                id: chunk.id,
                text: chunk.text,
                offset: chunk.offset,
                embedding,
            };
            bounded("chunk upsert", limit, index.upsert(&indexed)).await?;
        }

        bounded(
            "index manifest write",
            limit,
            async {
                index
                    .mark_ready(chunk_count, &self.embedder.model_code())
                    .await
            },
        )
        .await?;

        info!(
            chunks = chunk_count,
            dimension = index.dimension(),
            elapsed = ?started.elapsed(),
            "ingestion run complete"
        );

        Ok(IngestionReport {
            chunks: chunk_count,
            dimension: index.dimension(),
        })
    }
}
