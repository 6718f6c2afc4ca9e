use common::error::AppError;

/// A contiguous slice of the source document, the unit of retrieval.
///
/// Ids are sequential and zero-based in extraction order; `offset` is the
/// starting character position in the source. Chunks never overlap, and
/// concatenating them in id order reconstructs the source exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: usize,
    pub text: String,
    pub offset: usize,
}

/// Partition `text` into fixed-width chunks of `size` characters; the final
/// chunk holds the remainder. Counting is per `char`, so multi-byte input is
/// never split inside a code point.
///
/// Empty input yields no chunks. `size == 0` is a configuration error.
pub fn chunk_text(text: &str, size: usize) -> Result<Vec<Chunk>, AppError> {
    if size == 0 {
        return Err(AppError::InvalidConfiguration(
            "chunk size must be positive".into(),
        ));
    }

    let chars: Vec<char> = text.chars().collect();
    Ok(chars
        .chunks(size)
        .enumerate()
        .map(|(id, window)| Chunk {
            id,
            text: window.iter().collect(),
            offset: id * size,
        })
        .collect())
}
