use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use common::{
    storage::db::SurrealDbClient,
    utils::{
        config::get_config, embedding::EmbeddingProvider, generation::GenerationProvider,
    },
};
use ingestion_pipeline::{DocumentSource, IngestionPipeline};
use retrieval_pipeline::QueryPipeline;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docqa", about = "Ask questions about a single ingested document")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, chunk, embed and index a document, replacing any previous index
    Ingest {
        /// Path to a UTF-8 text document
        file: PathBuf,
    },
    /// Answer a question against the ingested document
    Ask {
        /// The question to answer
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    let config = get_config()?;

    let db = Arc::new(
        SurrealDbClient::new(
            &config.surrealdb_address,
            &config.surrealdb_username,
            &config.surrealdb_password,
            &config.surrealdb_namespace,
            &config.surrealdb_database,
        )
        .await?,
    );

    let openai_client = Arc::new(async_openai::Client::with_config(
        async_openai::config::OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_base_url),
    ));

    let embedder = EmbeddingProvider::from_config(&config, Some(Arc::clone(&openai_client)))?;
    info!(
        embedding_backend = embedder.backend_label(),
        embedding_dimension = embedder.dimension(),
        "Embedding provider initialized"
    );

    match cli.command {
        Command::Ingest { file } => {
            let pipeline =
                IngestionPipeline::new((*db).clone(), embedder, config.clone());
            let report = pipeline.ingest(&DocumentSource::File(file)).await?;
            println!(
                "Indexed {} chunks into '{}' (dimension {})",
                report.chunks, config.index_name, report.dimension
            );
        }
        Command::Ask { question } => {
            let generator =
                GenerationProvider::new_openai(openai_client, config.query_model.clone());
            let pipeline =
                QueryPipeline::new((*db).clone(), embedder, generator, config.clone());
            let response = pipeline.answer(&question).await?;
            info!(
                context_chunks = response.context.len(),
                "query answered"
            );
            println!("{}", response.answer);
        }
    }

    Ok(())
}
