//! HTTP boundary.
//!
//! Routes:
//! - `GET /api/documents/list`
//! - `GET /api/documents/tree`
//! - `GET /api/documents/download/{*path}`
//! - `GET /api/documents/preview/{file_name}`
//! - `GET /health`
//!
//! Download and preview hand the still percent-encoded path from the request
//! URI to the resolver, so a path is decoded exactly once. Errors are mapped
//! to fixed JSON bodies; filesystem paths and OS error text only go to the
//! log.

use std::future::Future;
use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use protocol::{DocumentEntry, ErrorBody, ErrorKind, TreeNode};
use tokio::net::TcpListener;
use tokio::task::{self, JoinError};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::files::{DocumentError, DocumentService, OpenDocument, Preview};

/// Prefix of the download route; the rest of the path is the document path.
pub const DOWNLOAD_PREFIX: &str = "/api/documents/download/";

/// Prefix of the preview route; the rest of the path is the file name.
pub const PREVIEW_PREFIX: &str = "/api/documents/preview/";

/// Content type of inline text previews.
pub const TEXT_PREVIEW_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Methods advertised to a preflight that does not name one.
const PREFLIGHT_DEFAULT_METHODS: &str = "GET, HEAD, OPTIONS";

/// How long browsers may cache a preflight answer.
const PREFLIGHT_MAX_AGE_SECS: &str = "86400";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Document operations over the configured root.
    pub documents: Arc<DocumentService>,
}

impl AppState {
    /// Wrap a document service.
    pub fn new(documents: DocumentService) -> Self {
        Self {
            documents: Arc::new(documents),
        }
    }
}

/// A document failure on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError(DocumentError);

impl From<DocumentError> for ApiError {
    fn from(err: DocumentError) -> Self {
        Self(err)
    }
}

impl From<JoinError> for ApiError {
    fn from(err: JoinError) -> Self {
        Self(DocumentError::Io(io::Error::other(err)))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        match kind {
            ErrorKind::PathTraversal => warn!("Rejected document path: {}", self.0),
            ErrorKind::NotFound => debug!("{}", self.0),
            ErrorKind::Internal => error!("Document request failed: {}", self.0),
        }

        let status =
            StatusCode::from_u16(kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorBody::from(kind))).into_response()
    }
}

/// Build the application router.
pub fn router(state: AppState, cors_allow_any: bool) -> Router {
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/documents/list", get(list_documents))
        .route("/api/documents/tree", get(document_tree))
        .route("/api/documents/download/{*path}", get(download_document))
        .route("/api/documents/preview/{file_name}", get(preview_document))
        .layer(middleware::from_fn(log_request))
        .with_state(state);

    if cors_allow_any {
        app.layer(middleware::from_fn(allow_any_origin))
    } else {
        app
    }
}

/// Create the documents root, bind the configured address and serve until
/// SIGINT or SIGTERM.
pub async fn serve(config: &Config) -> Result<()> {
    let documents = open_documents(config)?;

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(
        "Serving {:?} on http://{}",
        documents.root(),
        listener.local_addr()?
    );

    let app = router(AppState::new(documents), config.server.cors_allow_any);
    run(listener, app, wait_for_shutdown_signal()).await
}

/// Document service over the configured root, created if missing.
pub fn open_documents(config: &Config) -> Result<DocumentService> {
    let root = config.ensure_documents_root()?;
    let documents = DocumentService::new(&root)
        .with_context(|| format!("Failed to open documents root: {}", root.display()))?
        .with_max_tree_depth(config.documents.max_tree_depth)
        .with_max_text_preview_bytes(config.documents.max_text_preview_bytes);
    Ok(documents)
}

/// Serve `app` on `listener` until `shutdown` completes.
pub async fn run<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")?;

    info!("HTTP server stopped");
    Ok(())
}

async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentEntry>>, ApiError> {
    let documents = state.documents.clone();
    let entries = task::spawn_blocking(move || documents.list()).await?;
    Ok(Json(entries))
}

async fn document_tree(State(state): State<AppState>) -> Result<Json<TreeNode>, ApiError> {
    let documents = state.documents.clone();
    let tree = task::spawn_blocking(move || documents.tree()).await?;
    Ok(Json(tree))
}

async fn download_document(
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Response, ApiError> {
    let raw = raw_tail(&uri, DOWNLOAD_PREFIX);
    let document = state.documents.open(raw).await?;
    stream_response(document)
}

async fn preview_document(
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Response, ApiError> {
    let raw = raw_tail(&uri, PREVIEW_PREFIX);
    match state.documents.preview(raw).await? {
        Preview::Text(preview) => {
            if preview.truncated {
                debug!("Preview of {} cut at the size limit", raw);
            }
            Ok((
                [(header::CONTENT_TYPE, TEXT_PREVIEW_CONTENT_TYPE)],
                preview.text,
            )
                .into_response())
        }
        Preview::Stream(document) => stream_response(document),
    }
}

/// Percent-encoded remainder of the request path after `prefix`.
fn raw_tail<'a>(uri: &'a Uri, prefix: &str) -> &'a str {
    uri.path().strip_prefix(prefix).unwrap_or_default()
}

fn stream_response(document: OpenDocument) -> Result<Response, ApiError> {
    let disposition = format!(
        "inline; filename=\"{}\"",
        urlencoding::encode(&document.file_name)
    );
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| DocumentError::Io(io::Error::other(e)))?;

    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static(document.content_type),
        ),
        (
            header::CONTENT_LENGTH,
            HeaderValue::from(document.stream.len()),
        ),
        (header::CONTENT_DISPOSITION, disposition),
    ];
    let body = Body::from_stream(document.stream.into_body_stream());

    Ok((headers, body).into_response())
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    debug!("{} {} -> {}", method, path, response.status().as_u16());
    response
}

/// Allow any origin, method and header. Preflight requests are answered here
/// and never reach the routes.
async fn allow_any_origin(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        preflight_response(&request)
    } else {
        next.run(request).await
    };

    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

fn preflight_response(request: &Request) -> Response {
    let requested = request.headers();
    let methods = requested
        .get(header::ACCESS_CONTROL_REQUEST_METHOD)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(PREFLIGHT_DEFAULT_METHODS));
    let headers = requested
        .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*"));

    let mut response = StatusCode::NO_CONTENT.into_response();
    let out = response.headers_mut();
    out.insert(header::ACCESS_CONTROL_ALLOW_METHODS, methods);
    out.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, headers);
    out.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(PREFLIGHT_MAX_AGE_SECS),
    );
    response
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!("Failed to register SIGTERM handler: {}", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to wait for Ctrl-C: {}", e);
            }
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM");
        }
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to wait for Ctrl-C: {}", e);
            }
            info!("Received SIGINT");
        }
    }
}
