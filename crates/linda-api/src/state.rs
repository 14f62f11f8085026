use std::sync::Arc;

use anyhow::anyhow;
use tracing::{error, warn};

use linda_db::Database;

use crate::error::ApiError;
use crate::llm::ChatModel;
use crate::storage::ObjectStore;
use crate::transcribe::Transcriber;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    /// `None` when the database could not be opened at startup.
    pub db: Option<Database>,
    pub jwt_secret: String,
    /// Login identity that is promoted to admin on every sign-in.
    pub owner_open_id: Option<String>,
    pub chat_model: Arc<dyn ChatModel>,
    pub transcriber: Arc<dyn Transcriber>,
    pub store: Arc<dyn ObjectStore>,
}

impl AppStateInner {
    pub fn db(&self) -> Result<&Database, ApiError> {
        self.db.as_ref().ok_or(ApiError::DatabaseUnavailable)
    }

    pub fn is_owner(&self, open_id: &str) -> bool {
        self.owner_open_id.as_deref() == Some(open_id)
    }
}

/// Run blocking database work off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    state.db()?;

    let state = state.clone();
    tokio::task::spawn_blocking(move || {
        let db = state.db()?;
        f(db).map_err(ApiError::from)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow!("database task failed"))
    })?
}

/// Like `with_db`, but a missing database yields an empty result instead of an error.
/// Used by the public listing procedures.
pub async fn read_or_empty<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Default + Send + 'static,
{
    if state.db.is_none() {
        warn!("Database not available, returning empty result");
        return Ok(T::default());
    }
    with_db(state, f).await
}
