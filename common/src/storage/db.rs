use std::ops::Deref;

use surrealdb::{
    engine::any::{connect, Any},
    opt::auth::Root,
    Surreal,
};

use crate::error::AppError;

#[derive(Clone)]
pub struct SurrealDbClient {
    pub client: Surreal<Any>,
}

impl SurrealDbClient {
    /// Connect to SurrealDB, sign in and select the namespace/database.
    ///
    /// An unreachable endpoint or rejected credentials surface as
    /// `AppError::IndexUnavailable` so callers can distinguish a missing
    /// backing service from per-operation database errors.
    pub async fn new(
        address: &str,
        username: &str,
        password: &str,
        namespace: &str,
        database: &str,
    ) -> Result<Self, AppError> {
        let db = connect(address)
            .await
            .map_err(|e| AppError::IndexUnavailable(format!("connect to {address}: {e}")))?;

        // mem:// has no authentication layer
        if !address.starts_with("mem:") {
            db.signin(Root { username, password })
                .await
                .map_err(|e| AppError::IndexUnavailable(format!("signin: {e}")))?;
        }

        db.use_ns(namespace).use_db(database).await?;

        Ok(SurrealDbClient { client: db })
    }
}

impl Deref for SurrealDbClient {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl SurrealDbClient {
    /// Create an in-memory SurrealDB client for testing.
    pub async fn memory(namespace: &str, database: &str) -> Result<Self, AppError> {
        let db = connect("mem://").await?;

        db.use_ns(namespace).use_db(database).await?;

        Ok(SurrealDbClient { client: db })
    }
}
