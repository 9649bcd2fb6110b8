use async_trait::async_trait;
use slipway_model::{SearchPath, Table};

use crate::ApiError;

/// Control-plane operations behind the HTTP surface.
#[async_trait]
pub trait ApiHandler: Send + Sync + 'static {
    /// All tables, ordered by name.
    async fn list_tables(&self) -> Result<Vec<Table>, ApiError>;

    /// Rendered JSON of one table, [`ApiError::TableNotFound`] if absent.
    async fn render_table(&self, name: &str) -> Result<String, ApiError>;

    /// Replaces every given table by name.
    async fn update_tables(&self, tables: Vec<Table>) -> Result<(), ApiError>;

    async fn delete_table(&self, name: &str) -> Result<(), ApiError>;

    async fn search_path(&self) -> Result<SearchPath, ApiError>;

    async fn set_search_path(&self, paths: SearchPath) -> Result<(), ApiError>;

    /// Asks the daemon to stop.
    async fn shutdown(&self) -> Result<(), ApiError>;
}
