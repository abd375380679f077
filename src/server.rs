//! Plain-text HTTP front end over a shared catalog.
//!
//! Every handler takes the single catalog mutex for the duration of one store
//! operation, so requests are serialized against the catalog and its file.
//! Mutations write the file synchronously and run on the blocking pool.

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::storage::FileStorage;
use axum::error_handling::HandleErrorLayer;
use axum::extract::{OriginalUri, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{BoxError, Router};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

pub type SharedCatalog = Arc<Mutex<Catalog<FileStorage>>>;

/// Shared state for catalog handlers.
#[derive(Clone)]
pub struct AppState {
    catalog: SharedCatalog,
}

impl AppState {
    pub fn new(catalog: Catalog<FileStorage>) -> Self {
        AppState {
            catalog: Arc::new(Mutex::new(catalog)),
        }
    }

    pub fn catalog(&self) -> &SharedCatalog {
        &self.catalog
    }

    fn lock(&self) -> std::result::Result<MutexGuard<'_, Catalog<FileStorage>>, ApiError> {
        self.catalog.lock().map_err(|_| ApiError::Poisoned)
    }
}

/// Handler error, rendered as a plain-text body.
#[derive(Debug)]
pub enum ApiError {
    Catalog(Error),
    NotEnoughArguments,
    TooManyArguments,
    Poisoned,
    WorkerFailed,
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Catalog(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Catalog(Error::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Catalog(Error::AlreadyExists(_)) => StatusCode::CONFLICT,
            ApiError::Catalog(Error::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotEnoughArguments | ApiError::TooManyArguments => StatusCode::BAD_REQUEST,
            ApiError::Poisoned | ApiError::WorkerFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Catalog(e) => e.to_string(),
            ApiError::NotEnoughArguments => "Not enough arguments".to_string(),
            ApiError::TooManyArguments => {
                "Too many arguments ('/' is not allowed inside a field)".to_string()
            }
            ApiError::Poisoned => "catalog lock poisoned".to_string(),
            ApiError::WorkerFailed => "catalog worker failed".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), format!("{}\n", self.message())).into_response()
    }
}

type ApiResult = std::result::Result<String, ApiError>;

/// Build the catalog router.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/list", get(list))
        .route("/insert", get(missing_arguments))
        .route("/insert/*params", get(insert))
        .route("/search", get(missing_arguments))
        .route("/search/:key", get(search))
        .route("/delete", get(missing_arguments))
        .route("/delete/:key", get(delete))
        .route("/status", get(status))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(state: AppState, addr: &str, request_timeout: Duration) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Io(format!("Failed to bind {}: {}", addr, e)))?;
    info!(addr = %addr, "ready to serve");

    axum::serve(listener, router(state, request_timeout))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Io(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
}

async fn list(State(state): State<AppState>) -> ApiResult {
    let catalog = state.lock()?;
    Ok(catalog.render_list())
}

/// Run a mutating store operation under the catalog lock on the blocking pool.
async fn with_catalog_blocking<T, F>(state: &AppState, op: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce(&mut Catalog<FileStorage>) -> std::result::Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let catalog = Arc::clone(&state.catalog);
    tokio::task::spawn_blocking(move || {
        let mut guard = catalog.lock().map_err(|_| ApiError::Poisoned)?;
        op(&mut guard)
    })
    .await
    .map_err(|_| ApiError::WorkerFailed)?
}

/// Split `key/name/prerequisite`. One trailing slash is tolerated and an
/// empty key segment is allowed.
fn insert_fields(params: &str) -> std::result::Result<[String; 3], ApiError> {
    let params = params.strip_suffix('/').unwrap_or(params);
    let fields: Vec<&str> = params.split('/').collect();
    match fields.as_slice() {
        [key, name, prerequisite] => Ok([
            key.to_string(),
            name.to_string(),
            prerequisite.to_string(),
        ]),
        short if short.len() < 3 => Err(ApiError::NotEnoughArguments),
        _ => Err(ApiError::TooManyArguments),
    }
}

/// `GET /insert/{key}/{name}/{prerequisite}`
async fn insert(State(state): State<AppState>, Path(params): Path<String>) -> ApiResult {
    let [key, name, prerequisite] = insert_fields(&params)?;

    with_catalog_blocking(&state, move |catalog| {
        catalog.insert_fields(&key, &name, &prerequisite)?;
        Ok("New record added successfully\n".to_string())
    })
    .await
}

async fn search(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let catalog = match state.lock() {
        Ok(catalog) => catalog,
        Err(e) => return e.into_response(),
    };
    match catalog.search(&key) {
        Some(record) => format!("{}\n", record).into_response(),
        None => (StatusCode::NOT_FOUND, format!("{} not found\n", key)).into_response(),
    }
}

async fn delete(State(state): State<AppState>, Path(key): Path<String>) -> ApiResult {
    with_catalog_blocking(&state, move |catalog| {
        catalog.delete(&key)?;
        Ok(format!("{} deleted\n", key))
    })
    .await
}

async fn status(State(state): State<AppState>) -> ApiResult {
    let catalog = state.lock()?;
    Ok(format!("Total number of entries: {}\n", catalog.len()))
}

async fn missing_arguments() -> ApiError {
    ApiError::NotEnoughArguments
}

async fn not_found(uri: OriginalUri) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("not found: {}\n", uri.0.path()))
}

async fn handle_timeout_error(err: BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "request timed out\n".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("unhandled internal error: {}\n", err),
        )
    }
}
