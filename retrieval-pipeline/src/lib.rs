pub mod answer;
pub mod search;

use std::time::Duration;

use common::{
    error::AppError,
    storage::db::SurrealDbClient,
    utils::{
        config::AppConfig, embedding::EmbeddingProvider, generation::GenerationProvider,
        timeout::bounded,
    },
};
use tracing::instrument;

pub use search::RetrievedChunk;

/// A generated answer together with the chunks it was conditioned on.
#[derive(Debug, Clone)]
pub struct QueryResponse {
    pub answer: String,
    pub context: Vec<RetrievedChunk>,
}

/// Sequences one question: embed the query, retrieve the `top_k` nearest
/// chunks, assemble the prompt and invoke the generative model.
pub struct QueryPipeline {
    db: SurrealDbClient,
    embedder: EmbeddingProvider,
    generator: GenerationProvider,
    config: AppConfig,
}

impl QueryPipeline {
    pub fn new(
        db: SurrealDbClient,
        embedder: EmbeddingProvider,
        generator: GenerationProvider,
        config: AppConfig,
    ) -> Self {
        Self {
            db,
            embedder,
            generator,
            config,
        }
    }

    #[instrument(skip_all, fields(index = %self.config.index_name))]
    pub async fn answer(&self, question: &str) -> Result<QueryResponse, AppError> {
        let limit = Duration::from_secs(self.config.request_timeout_secs);

        let query_embedding =
            bounded("query embedding", limit, self.embedder.embed(question)).await?;

        let context = bounded(
            "knn search",
            limit,
            search::search(
                &self.db,
                &self.config.index_name,
                &query_embedding,
                self.config.top_k,
            ),
        )
        .await?;

        let texts: Vec<String> = context.iter().map(|hit| hit.text.clone()).collect();
        let answer = bounded(
            "answer generation",
            limit,
            answer::synthesize(&self.generator, question, &texts),
        )
        .await?;

        Ok(QueryResponse { answer, context })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{
        storage::index::{ChunkIndex, IndexedChunk},
        utils::config::EmbeddingBackend,
    };
    use uuid::Uuid;

    fn test_config(index_name: &str, top_k: usize) -> AppConfig {
        AppConfig {
            index_name: index_name.into(),
            chunk_size: 5,
            top_k,
            embedding_backend: EmbeddingBackend::Hashed,
            embedding_model: "unused".into(),
            embedding_dimensions: 32,
            query_model: "unused".into(),
            openai_api_key: String::new(),
            openai_base_url: "https://example.invalid".into(),
            surrealdb_address: "mem://".into(),
            surrealdb_username: "root".into(),
            surrealdb_password: "root".into(),
            surrealdb_namespace: "test_ns".into(),
            surrealdb_database: "test_db".into(),
            request_timeout_secs: 30,
        }
    }

    async fn setup_db() -> SurrealDbClient {
        let database = Uuid::new_v4().to_string();
        SurrealDbClient::memory("query_test_ns", &database)
            .await
            .expect("Failed to start in-memory surrealdb")
    }

    /// Index three chunks with the same hashed embedder the pipeline uses,
    /// so a query repeating a chunk's text lands exactly on that chunk.
    async fn index_chunks(db: &SurrealDbClient, embedder: &EmbeddingProvider, texts: &[&str]) {
        let index = ChunkIndex::recreate(db.clone(), "doc_chunks", embedder.dimension())
            .await
            .expect("recreate failed");
        for (id, text) in texts.iter().enumerate() {
            let embedding = embedder.embed(text).await.expect("embed failed");
            index
                .upsert(&IndexedChunk {
                    id,
                    text: (*text).to_owned(),
                    offset: id * text.chars().count(),
                    embedding,
                })
                .await
                .expect("upsert failed");
        }
        index
            .mark_ready(texts.len(), "hashed")
            .await
            .expect("mark_ready failed");
    }

    #[tokio::test]
    async fn answers_with_nearest_chunk_as_context() {
        let db = setup_db().await;
        let embedder = EmbeddingProvider::new_hashed(32).expect("provider");
        index_chunks(&db, &embedder, &["alpha facts", "beta facts", "gamma facts"]).await;

        let pipeline = QueryPipeline::new(
            db,
            embedder,
            GenerationProvider::new_echo(None),
            test_config("doc_chunks", 1),
        );

        let response = pipeline.answer("beta facts").await.expect("query failed");

        assert_eq!(response.context.len(), 1);
        assert_eq!(response.context[0].text, "beta facts");
        assert_eq!(
            response.answer,
            "Question: beta facts\nContext: beta facts\nAnswer:"
        );
    }

    #[tokio::test]
    async fn generated_answer_is_passed_through_verbatim() {
        let db = setup_db().await;
        let embedder = EmbeddingProvider::new_hashed(32).expect("provider");
        index_chunks(&db, &embedder, &["only chunk"]).await;

        let pipeline = QueryPipeline::new(
            db,
            embedder,
            GenerationProvider::new_echo(Some("the model said this".into())),
            test_config("doc_chunks", 3),
        );

        let response = pipeline.answer("anything").await.expect("query failed");
        assert_eq!(response.answer, "the model said this");
    }

    #[tokio::test]
    async fn query_before_ingestion_fails_with_index_not_ready() {
        let db = setup_db().await;
        let embedder = EmbeddingProvider::new_hashed(32).expect("provider");
        let pipeline = QueryPipeline::new(
            db,
            embedder,
            GenerationProvider::new_echo(None),
            test_config("doc_chunks", 3),
        );

        let err = pipeline
            .answer("too early")
            .await
            .expect_err("expected IndexNotReady");
        assert!(matches!(err, AppError::IndexNotReady));
    }
}
