use std::sync::Arc;

use async_trait::async_trait;
use slipway_core::Supervisor;
use slipway_model::{SearchPath, Table};
use tracing::info;

use crate::{ApiError, ApiHandler, Interceptor};

/// Serves the control API straight from an [`Interceptor`].
///
/// Shutdown requests are forwarded to the supervisor running the daemon.
pub struct InterceptorAdapter {
    store: Arc<Interceptor>,
    supervisor: Supervisor,
}

impl InterceptorAdapter {
    pub fn new(store: Arc<Interceptor>, supervisor: Supervisor) -> Self {
        Self { store, supervisor }
    }
}

#[async_trait]
impl ApiHandler for InterceptorAdapter {
    async fn list_tables(&self) -> Result<Vec<Table>, ApiError> {
        Ok(self
            .store
            .tables()
            .into_iter()
            .map(Arc::unwrap_or_clone)
            .collect())
    }

    async fn render_table(&self, name: &str) -> Result<String, ApiError> {
        self.store
            .render(name)
            .ok_or_else(|| ApiError::TableNotFound(name.to_string()))
    }

    async fn update_tables(&self, tables: Vec<Table>) -> Result<(), ApiError> {
        if let Some(unnamed) = tables.iter().position(|t| t.name.is_empty()) {
            return Err(ApiError::InvalidRequest(format!(
                "table at index {unnamed} has no name"
            )));
        }
        for table in tables {
            self.store.update(table).await;
        }
        Ok(())
    }

    async fn delete_table(&self, name: &str) -> Result<(), ApiError> {
        self.store.delete(name).await;
        Ok(())
    }

    async fn search_path(&self) -> Result<SearchPath, ApiError> {
        Ok(self.store.search_path())
    }

    async fn set_search_path(&self, paths: SearchPath) -> Result<(), ApiError> {
        self.store.set_search_path(paths);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ApiError> {
        info!("shutdown requested over the control API");
        self.supervisor.shutdown();
        Ok(())
    }
}
