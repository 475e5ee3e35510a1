use std::sync::Arc;

use strongbox_core::SecretString;
use strongbox_store::BackupEngine;

use crate::error::{ApiError, ApiResult};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BackupEngine>,
    pub admin_token: Arc<SecretString>,
}

impl AppState {
    pub fn new(engine: BackupEngine, admin_token: SecretString) -> Self {
        Self {
            engine: Arc::new(engine),
            admin_token: Arc::new(admin_token),
        }
    }

    /// Run blocking engine work off the async executor.
    pub async fn run_blocking<T, F>(&self, work: F) -> ApiResult<T>
    where
        F: FnOnce(&BackupEngine) -> Result<T, strongbox_core::BackupError> + Send + 'static,
        T: Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || work(engine.as_ref()))
            .await
            .map_err(|e| ApiError::Internal(format!("engine task failed: {}", e)))?
            .map_err(ApiError::from)
    }
}
