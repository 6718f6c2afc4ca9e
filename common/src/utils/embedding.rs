use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    sync::Arc,
};

use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use tracing::debug;

use crate::{
    error::AppError,
    utils::config::{AppConfig, EmbeddingBackend},
};

/// Produces fixed-dimension vectors for text. The dimension is fixed for the
/// lifetime of a provider instance and discoverable before first use.
#[derive(Clone)]
pub struct EmbeddingProvider {
    inner: EmbeddingInner,
}

#[derive(Clone)]
enum EmbeddingInner {
    OpenAi {
        client: Arc<Client<OpenAIConfig>>,
        model: String,
        dimensions: u32,
    },
    /// Deterministic token-bucket vectors; no network, bit-stable for a
    /// given input. Used by tests and offline runs.
    Hashed { dimension: usize },
}

impl EmbeddingProvider {
    pub fn from_config(
        config: &AppConfig,
        client: Option<Arc<Client<OpenAIConfig>>>,
    ) -> Result<Self, AppError> {
        match config.embedding_backend {
            EmbeddingBackend::Hashed => {
                Self::new_hashed(config.embedding_dimensions as usize)
            }
            EmbeddingBackend::OpenAi => {
                let client = client.ok_or_else(|| {
                    AppError::InvalidConfiguration(
                        "openai embedding backend requires an OpenAI client".into(),
                    )
                })?;
                Ok(Self::new_openai(
                    client,
                    config.embedding_model.clone(),
                    config.embedding_dimensions,
                ))
            }
        }
    }

    pub fn new_openai(
        client: Arc<Client<OpenAIConfig>>,
        model: String,
        dimensions: u32,
    ) -> Self {
        EmbeddingProvider {
            inner: EmbeddingInner::OpenAi {
                client,
                model,
                dimensions,
            },
        }
    }

    pub fn new_hashed(dimension: usize) -> Result<Self, AppError> {
        if dimension == 0 {
            return Err(AppError::InvalidConfiguration(
                "embedding dimension must be positive".into(),
            ));
        }
        Ok(EmbeddingProvider {
            inner: EmbeddingInner::Hashed { dimension },
        })
    }

    pub fn backend_label(&self) -> &'static str {
        match self.inner {
            EmbeddingInner::Hashed { .. } => "hashed",
            EmbeddingInner::OpenAi { .. } => "openai",
        }
    }

    pub fn model_code(&self) -> String {
        match &self.inner {
            EmbeddingInner::Hashed { .. } => "hashed".to_owned(),
            EmbeddingInner::OpenAi { model, .. } => model.clone(),
        }
    }

    pub fn dimension(&self) -> usize {
        match &self.inner {
            EmbeddingInner::Hashed { dimension } => *dimension,
            EmbeddingInner::OpenAi { dimensions, .. } => *dimensions as usize,
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let mut vectors = self.embed_batch(vec![text.to_owned()]).await?;
        vectors.pop().ok_or_else(|| {
            AppError::EmbeddingService("no embedding returned for input".into())
        })
    }

    /// One vector per input string, in input order.
    pub async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, AppError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        match &self.inner {
            EmbeddingInner::Hashed { dimension } => Ok(texts
                .iter()
                .map(|text| hashed_embedding(text, *dimension))
                .collect()),
            EmbeddingInner::OpenAi {
                client,
                model,
                dimensions,
            } => {
                let expected = texts.len();
                let request = CreateEmbeddingRequestArgs::default()
                    .model(model.clone())
                    .input(texts)
                    .dimensions(*dimensions)
                    .build()
                    .map_err(|e| AppError::EmbeddingService(e.to_string()))?;

                let response = client
                    .embeddings()
                    .create(request)
                    .await
                    .map_err(|e| AppError::EmbeddingService(e.to_string()))?;

                let embeddings: Vec<Vec<f32>> = response
                    .data
                    .into_iter()
                    .map(|item| item.embedding)
                    .collect();

                if embeddings.len() != expected {
                    return Err(AppError::EmbeddingService(format!(
                        "expected {expected} embeddings, received {}",
                        embeddings.len()
                    )));
                }

                debug!(count = embeddings.len(), "embedding batch complete");
                Ok(embeddings)
            }
        }
    }
}

fn hashed_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dimension];
    if text.is_empty() {
        return vector;
    }

    for token in tokens(text) {
        let idx = bucket(&token, dimension);
        vector[idx] += 1.0;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }

    vector
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
}

fn bucket(token: &str, dimension: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    (hasher.finish() as usize) % dimension
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        dot / (norm_a * norm_b)
    }

    #[tokio::test]
    async fn hashed_embedding_is_deterministic() {
        let provider = EmbeddingProvider::new_hashed(64).expect("provider");
        let first = provider.embed("the quick brown fox").await.expect("embed");
        let second = provider.embed("the quick brown fox").await.expect("embed");

        assert_eq!(first.len(), 64);
        assert!(
            cosine(&first, &second) >= 0.999_999,
            "repeated embeddings should be identical up to float tolerance"
        );
    }

    #[tokio::test]
    async fn hashed_embedding_distinguishes_texts() {
        let provider = EmbeddingProvider::new_hashed(64).expect("provider");
        let fox = provider.embed("quick brown fox").await.expect("embed");
        let tax = provider
            .embed("quarterly revenue statement")
            .await
            .expect("embed");

        assert!(cosine(&fox, &tax) < 0.999);
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let provider = EmbeddingProvider::new_hashed(32).expect("provider");
        let inputs = vec!["alpha".to_owned(), "beta".to_owned(), "gamma".to_owned()];
        let batch = provider.embed_batch(inputs.clone()).await.expect("batch");

        assert_eq!(batch.len(), 3);
        for (text, vector) in inputs.iter().zip(&batch) {
            let single = provider.embed(text).await.expect("embed");
            assert_eq!(&single, vector, "batch order must match input order");
        }
    }

    #[tokio::test]
    async fn empty_batch_returns_empty() {
        let provider = EmbeddingProvider::new_hashed(32).expect("provider");
        let batch = provider.embed_batch(Vec::new()).await.expect("batch");
        assert!(batch.is_empty());
    }

    #[test]
    fn dimension_is_fixed_and_discoverable() {
        let provider = EmbeddingProvider::new_hashed(384).expect("provider");
        assert_eq!(provider.dimension(), 384);
        assert_eq!(provider.backend_label(), "hashed");
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let err = EmbeddingProvider::new_hashed(0)
            .err()
            .expect("expected rejection");
        assert!(matches!(err, AppError::InvalidConfiguration(_)));
    }
}
