use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::header,
    response::IntoResponse,
    routing::{get, post},
};
use slipway_model::{SearchPath, Table};
use tracing::debug;

use crate::{ApiError, ApiHandler};

/// HTTP API service builder.
pub struct HttpApi<H> {
    handler: Arc<H>,
}

impl<H> HttpApi<H>
where
    H: ApiHandler,
{
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Build axum router with mounted endpoints.
    ///
    /// Routes:
    /// - GET /api/tables - List all tables
    /// - POST /api/tables - Replace tables listed in the body
    /// - GET /api/tables/{name} - Render one table
    /// - POST /api/tables/{name} - Replace tables listed in the body
    /// - DELETE /api/tables/{name} - Delete one table
    /// - GET /api/search - Current search path
    /// - POST /api/search - Replace the search path
    /// - POST /api/shutdown - Stop the daemon
    pub fn router(self) -> Router {
        Router::new()
            .route("/api/tables", get(list_tables::<H>).post(update_tables::<H>))
            .route(
                "/api/tables/{name}",
                get(get_table::<H>)
                    .post(update_named::<H>)
                    .delete(delete_table::<H>),
            )
            .route("/api/search", get(get_search::<H>).post(set_search::<H>))
            .route("/api/shutdown", post(shutdown::<H>))
            .with_state(self.handler)
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(v)| v)
        .map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/tables
async fn list_tables<H>(State(handler): State<Arc<H>>) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    Ok(Json(handler.list_tables().await?))
}

/// GET /api/tables/{name}
async fn get_table<H>(
    State(handler): State<Arc<H>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let mut rendered = handler.render_table(&name).await?;
    rendered.push('\n');
    Ok(([(header::CONTENT_TYPE, "application/json")], rendered))
}

/// POST /api/tables
async fn update_tables<H>(
    State(handler): State<Arc<H>>,
    payload: Result<Json<Vec<Table>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let tables = body(payload)?;
    debug!(count = tables.len(), "updating tables");
    handler.update_tables(tables).await?;
    Ok(())
}

/// POST /api/tables/{name}
///
/// The path segment is informational; every table in the body is stored under its own
/// name.
async fn update_named<H>(
    State(handler): State<Arc<H>>,
    Path(name): Path<String>,
    payload: Result<Json<Vec<Table>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let tables = body(payload)?;
    debug!(path = %name, count = tables.len(), "updating tables");
    handler.update_tables(tables).await?;
    Ok(())
}

/// DELETE /api/tables/{name}
async fn delete_table<H>(
    State(handler): State<Arc<H>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    handler.delete_table(&name).await?;
    Ok(())
}

/// GET /api/search
async fn get_search<H>(State(handler): State<Arc<H>>) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    Ok(Json(handler.search_path().await?))
}

/// POST /api/search
async fn set_search<H>(
    State(handler): State<Arc<H>>,
    payload: Result<Json<SearchPath>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    handler.set_search_path(body(payload)?).await?;
    Ok(())
}

/// POST /api/shutdown
async fn shutdown<H>(State(handler): State<Arc<H>>) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    handler.shutdown().await?;
    Ok("Goodbye!\n")
}
