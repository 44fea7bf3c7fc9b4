use std::sync::Arc;
use std::time::Instant;

use crate::db::DatabaseProxy;
use crate::response::AppError;
use crate::services::model_sync::ModelSyncService;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    db_proxy: Option<Arc<DatabaseProxy>>,
    model_id: Arc<str>,
}

impl AppState {
    pub fn new(db_proxy: Option<Arc<DatabaseProxy>>, model_id: impl Into<String>) -> Self {
        Self {
            started_at: Instant::now(),
            db_proxy,
            model_id: Arc::from(model_id.into()),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn db_proxy(&self) -> Option<Arc<DatabaseProxy>> {
        self.db_proxy.clone()
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Sync service bound to this process's model, or 503 without a store.
    pub fn model_sync(&self) -> Result<ModelSyncService, AppError> {
        let proxy = self
            .db_proxy()
            .ok_or_else(|| AppError::service_unavailable("Database not configured"))?;
        Ok(ModelSyncService::new(proxy, self.model_id.to_string()))
    }
}
