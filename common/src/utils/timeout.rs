use std::{future::Future, time::Duration};

use crate::error::AppError;

/// Bound an external call by the configured timeout. Elapsing maps to
/// `AppError::Timeout`, kept distinct from the call's own service errors so
/// callers can tell a slow dependency from a broken one.
pub async fn bounded<T, F>(
    operation: &str,
    limit: Duration,
    future: F,
) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout {
            operation: operation.to_owned(),
            limit_secs: limit.as_secs(),
        }),
    }
}
