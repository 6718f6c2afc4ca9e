use std::path::PathBuf;

use common::error::AppError;
use tracing::debug;

/// Where the document text comes from. The extractor is an external
/// collaborator; the pipeline only requires a non-empty string out.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Text(String),
    File(PathBuf),
}

pub async fn extract_text(source: &DocumentSource) -> Result<String, AppError> {
    let text = match source {
        DocumentSource::Text(text) => text.clone(),
        DocumentSource::File(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::Extraction(format!("reading {}: {e}", path.display())))?,
    };

    if text.is_empty() {
        return Err(AppError::Extraction("extracted text is empty".into()));
    }

    debug!(chars = text.chars().count(), "document text extracted");
    Ok(text)
}
