//! HTTP daemon for mediasorter
//!
//! One accept loop, one task per connection. The JSON API lives under
//! `/api`; every other GET is a range-aware file transfer from the root.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use serde::de::DeserializeOwned;
use tokio::net::{TcpListener, TcpStream};
use tower::Service;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::filesystem::config::LibraryConfig;
use crate::filesystem::LibraryService;
use crate::protocol::{
    DeleteRequest, ErrorResponse, FileSystemError, ListResponse, MoveRequest, SuccessResponse,
};
use crate::streaming;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8001;

/// Front-end document, relative to the working directory
pub const DEFAULT_FRONTEND: &str = "video-organizer/video-organizer.html";

/// Listener and front-end settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Document served for the app routes
    pub frontend: PathBuf,
    /// Request paths answered with the front-end document
    pub app_routes: Vec<String>,
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            frontend: PathBuf::from(DEFAULT_FRONTEND),
            app_routes: vec!["/".to_string(), "/video-organizer.html".to_string()],
        }
    }
}

/// Daemon shared state
pub struct AppState {
    pub library: LibraryService,
    pub server: ServerConfig,
}

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/list", post(list_media))
        .route("/api/move", post(move_media))
        .route("/api/delete", post(delete_media))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(fallback)
        .layer(
            TraceLayer::new_for_http()
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .with_state(state)
}

/// Start the server and run until Ctrl+C or SIGTERM
pub async fn run(library: LibraryConfig, server: ServerConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(server.addr()).await?;
    let state: SharedState = Arc::new(AppState {
        library: LibraryService::new(library),
        server,
    });
    tracing::info!(
        "Serving {} on http://{}",
        state.library.config().root.display(),
        listener.local_addr()?
    );
    let app = router(state);

    #[cfg(unix)]
    run_server_loop_unix(listener, app).await;

    #[cfg(not(unix))]
    run_server_loop_ctrlc_only(listener, app).await;

    Ok(())
}

/// Server loop with Unix signal handling (SIGTERM + Ctrl+C)
#[cfg(unix)]
async fn run_server_loop_unix(listener: TcpListener, app: Router) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::warn!(
                "Failed to set up SIGTERM handler: {:?}. Only Ctrl+C will work for shutdown.",
                e
            );
            run_server_loop_ctrlc_only(listener, app).await;
            return;
        }
    };

    let shutdown = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Server shutting down (Ctrl+C)");
            }
            _ = sigterm.recv() => {
                tracing::info!("Server shutting down (SIGTERM)");
            }
        }
    };
    serve_until(listener, app, shutdown).await;
}

/// Server loop with Ctrl+C only (fallback or non-Unix)
async fn run_server_loop_ctrlc_only(listener: TcpListener, app: Router) {
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Server shutting down (Ctrl+C)");
    };
    serve_until(listener, app, shutdown).await;
}

async fn serve_until<F>(listener: TcpListener, app: Router, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            result = listener.accept() => match result {
                Ok((stream, addr)) => {
                    tokio::spawn(handle_connection(stream, addr, app.clone()));
                }
                Err(e) => {
                    tracing::warn!("Failed to accept connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            },
            _ = &mut shutdown => break,
        }
    }
}

/// Serve one client connection. Hang-ups mid-transfer are expected while
/// scrubbing through a video and are only logged at debug level.
async fn handle_connection(stream: TcpStream, addr: SocketAddr, app: Router) {
    let io = TokioIo::new(stream);
    let service =
        hyper::service::service_fn(move |request: Request<Incoming>| app.clone().call(request));

    if let Err(e) = Builder::new(TokioExecutor::new())
        .serve_connection(io, service)
        .await
    {
        if streaming::is_connection_noise(e.as_ref()) {
            tracing::debug!("Client {} went away: {}", addr, e);
        } else {
            tracing::warn!("Connection error from {}: {}", addr, e);
        }
    }
}

async fn list_media(State(state): State<SharedState>) -> Result<Json<ListResponse>, ApiError> {
    match state.library.list().await {
        Ok(listing) => Ok(Json(listing)),
        Err(e) => {
            tracing::warn!("Listing failed: {}", e);
            Err(e.into())
        }
    }
}

async fn move_media(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, ApiError> {
    let request: MoveRequest = parse_json(&body)?;
    let (Some(filename), Some(target)) = (non_empty(request.filename), non_empty(request.target))
    else {
        return Err(ApiError::BadRequest("Missing filename or target".to_string()));
    };

    let ops = state.library.ops();
    match ops.move_to(&filename, &target).await {
        Ok(destination) => {
            tracing::info!("Moved {} to {}", filename, ops.display_relative(&destination));
            Ok(Json(SuccessResponse::ok()))
        }
        Err(e) => {
            tracing::warn!("Error moving {}: {}", filename, e);
            Err(e.into())
        }
    }
}

async fn delete_media(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, ApiError> {
    let request: DeleteRequest = parse_json(&body)?;
    let Some(filename) = non_empty(request.filename) else {
        return Err(ApiError::BadRequest("Missing filename".to_string()));
    };

    let ops = state.library.ops();
    match ops.trash(&filename).await {
        Ok(destination) => {
            tracing::info!("Moved to trash: {}", ops.display_relative(&destination));
            Ok(Json(SuccessResponse::ok()))
        }
        Err(e) => {
            tracing::warn!("Error trashing {}: {}", filename, e);
            Err(e.into())
        }
    }
}

async fn fallback(
    State(state): State<SharedState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if method == Method::POST {
        return Err(ApiError::NotFound("API endpoint not found".to_string()));
    }
    if method != Method::GET && method != Method::HEAD {
        return Err(ApiError::MethodNotAllowed("GET, HEAD, POST"));
    }

    let path = uri.path();
    if state.server.app_routes.iter().any(|route| route == path) {
        if let Some(response) = serve_frontend(&state.server.frontend, &headers).await? {
            return Ok(response);
        }
    }

    serve_static(&state, path, &headers).await
}

/// Non-POST requests to an API route
async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed("POST")
}

/// The front-end document, or `None` when it is not installed
async fn serve_frontend(frontend: &Path, headers: &HeaderMap) -> Result<Option<Response>, ApiError> {
    let installed = tokio::fs::metadata(frontend)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !installed {
        tracing::debug!("Front end {} not found, serving from root", frontend.display());
        return Ok(None);
    }
    Ok(Some(streaming::serve_file(frontend, headers).await?))
}

async fn serve_static(state: &AppState, path: &str, headers: &HeaderMap) -> Result<Response, ApiError> {
    let decoded = urlencoding::decode(path.trim_start_matches('/'))
        .map_err(|_| ApiError::BadRequest("Invalid request path".to_string()))?;
    let name = if decoded.is_empty() {
        "index.html"
    } else {
        decoded.as_ref()
    };

    let validator = state.library.validator();
    let mut target = validator.resolve_existing(name).await?;
    let is_dir = tokio::fs::metadata(&target)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if is_dir {
        let index = format!("{}/index.html", name.trim_end_matches('/'));
        target = validator.resolve_existing(&index).await?;
    }

    Ok(streaming::serve_file(&target, headers).await?)
}

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|_| ApiError::BadRequest("Invalid JSON".to_string()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Request-boundary error; every variant renders as a JSON `{ "error" }` body
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    /// Carries the `Allow` header value
    MethodNotAllowed(&'static str),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::MethodNotAllowed(allow) => {
                let mut headers = HeaderMap::new();
                headers.insert(header::ALLOW, HeaderValue::from_static(allow));
                let body = Json(ErrorResponse {
                    error: "Method not allowed".to_string(),
                });
                return (StatusCode::METHOD_NOT_ALLOWED, headers, body).into_response();
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<FileSystemError> for ApiError {
    fn from(error: FileSystemError) -> Self {
        let message = error.to_string();
        match error {
            FileSystemError::PathTraversal { .. } | FileSystemError::PermissionDenied { .. } => {
                ApiError::Forbidden(message)
            }
            FileSystemError::NotFound { .. } | FileSystemError::NotAFile { .. } => {
                ApiError::NotFound(message)
            }
            FileSystemError::NotADirectory { .. } | FileSystemError::AlreadyExists { .. } => {
                ApiError::Conflict(message)
            }
            FileSystemError::IoError { .. } => ApiError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use serde_json::Value;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tower::ServiceExt;

    fn app_for(temp: &TempDir) -> Router {
        let state = Arc::new(AppState {
            library: LibraryService::new(LibraryConfig::with_root(temp.path())),
            server: ServerConfig {
                frontend: temp.path().join("ui").join("app.html"),
                ..Default::default()
            },
        });
        router(state)
    }

    async fn send(app: Router, request: axum::http::Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body)
    }

    async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, bytes) = send(app, request).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(app: Router, uri: &str, range: Option<&str>) -> (StatusCode, HeaderMap, Bytes) {
        let mut builder = axum::http::Request::builder().method(Method::GET).uri(uri);
        if let Some(range) = range {
            builder = builder.header(header::RANGE, range);
        }
        send(app, builder.body(Body::empty()).unwrap()).await
    }

    #[tokio::test]
    async fn list_returns_files_dirs_and_cwd() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("b.mp4"), "b").unwrap();
        std::fs::write(temp.path().join("a.png"), "a").unwrap();
        std::fs::write(temp.path().join("C.MOV"), "c").unwrap();
        std::fs::create_dir(temp.path().join("keep")).unwrap();
        std::fs::create_dir(temp.path().join("trash")).unwrap();

        let (status, body) = post_json(app_for(&temp), "/api/list", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["files"], serde_json::json!(["C.MOV", "a.png", "b.mp4"]));
        assert_eq!(body["dirs"], serde_json::json!([{"name": "keep", "shortcut": "K"}]));
        assert_eq!(
            body["cwd"].as_str().unwrap(),
            temp.path().canonicalize().unwrap().display().to_string()
        );
    }

    #[tokio::test]
    async fn move_then_repeat_reports_not_found() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.mp4"), "video").unwrap();
        let app = app_for(&temp);
        let body = r#"{"filename": "a.mp4", "target": "folder1"}"#;

        let (status, value) = post_json(app.clone(), "/api/move", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, serde_json::json!({"success": true}));
        assert!(temp.path().join("folder1/a.mp4").is_file());

        let (status, value) = post_json(app, "/api/move", body).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(value["error"].as_str().unwrap().contains("a.mp4"));
    }

    #[tokio::test]
    async fn move_requires_both_fields() {
        let temp = TempDir::new().unwrap();
        let app = app_for(&temp);

        for body in [r#"{"filename": "a.mp4"}"#, r#"{"target": "x"}"#, r#"{"filename": "", "target": "x"}"#] {
            let (status, value) = post_json(app.clone(), "/api/move", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
            assert_eq!(value["error"], "Missing filename or target");
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_client_error() {
        let temp = TempDir::new().unwrap();
        let (status, value) = post_json(app_for(&temp), "/api/delete", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "Invalid JSON");

        let (status, _) = post_json(app_for(&temp), "/api/move", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn traversal_is_forbidden_and_moves_nothing() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.mp4"), "video").unwrap();
        let app = app_for(&temp);

        let (status, _) = post_json(
            app.clone(),
            "/api/move",
            r#"{"filename": "a.mp4", "target": "../outside"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = post_json(app, "/api/delete", r#"{"filename": "../a.mp4"}"#).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(temp.path().join("a.mp4").is_file());
    }

    #[tokio::test]
    async fn delete_moves_into_trash() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("bad.mp4"), "x").unwrap();
        let app = app_for(&temp);

        let (status, value) = post_json(app.clone(), "/api/delete", r#"{"filename": "bad.mp4"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["success"], true);
        assert!(temp.path().join("trash/bad.mp4").is_file());

        let (status, _) = post_json(app.clone(), "/api/delete", r#"{"filename": "bad.mp4"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, value) = post_json(app, "/api/delete", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "Missing filename");
    }

    #[tokio::test]
    async fn occupied_destination_is_a_conflict() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("trash")).unwrap();
        std::fs::write(temp.path().join("trash/a.mp4"), "old").unwrap();
        std::fs::write(temp.path().join("a.mp4"), "new").unwrap();

        let (status, _) = post_json(app_for(&temp), "/api/delete", r#"{"filename": "a.mp4"}"#).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(temp.path().join("a.mp4").is_file());
    }

    #[tokio::test]
    async fn unknown_api_endpoint() {
        let temp = TempDir::new().unwrap();
        let (status, value) = post_json(app_for(&temp), "/api/rename", "{}").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(value["error"], "API endpoint not found");
    }

    #[tokio::test]
    async fn get_streams_ranges_of_encoded_names() {
        let temp = TempDir::new().unwrap();
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 256) as u8).collect();
        std::fs::write(temp.path().join("my clip.mp4"), &data).unwrap();

        let (status, headers, body) =
            get(app_for(&temp), "/my%20clip.mp4", Some("bytes=100-199")).await;
        assert_eq!(status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(headers[header::CONTENT_RANGE], "bytes 100-199/1000");
        assert_eq!(body.as_ref(), &data[100..200]);

        let (status, headers, body) =
            get(app_for(&temp), "/my%20clip.mp4", Some("bytes=999999-")).await;
        assert_eq!(status, StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(headers[header::CONTENT_RANGE], "bytes */1000");
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn get_rejects_traversal_and_missing_files() {
        let temp = TempDir::new().unwrap();
        let (status, _, _) = get(app_for(&temp), "/..%2Fsecret", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, body) = get(app_for(&temp), "/missing.mp4", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert!(value["error"].is_string());
    }

    #[tokio::test]
    async fn frontend_served_on_app_routes() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("ui")).unwrap();
        std::fs::write(temp.path().join("ui/app.html"), "<html>organizer</html>").unwrap();

        for route in ["/", "/video-organizer.html"] {
            let (status, headers, body) = get(app_for(&temp), route, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(headers[header::CONTENT_TYPE], "text/html; charset=utf-8");
            assert_eq!(body.as_ref(), b"<html>organizer</html>");
        }
    }

    #[tokio::test]
    async fn missing_frontend_falls_through_to_root() {
        let temp = TempDir::new().unwrap();
        let (status, _, _) = get(app_for(&temp), "/", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        std::fs::write(temp.path().join("index.html"), "root index").unwrap();
        let (status, _, body) = get(app_for(&temp), "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_ref(), b"root index");
    }

    #[tokio::test]
    async fn directory_paths_serve_their_index() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("docs")).unwrap();
        std::fs::write(temp.path().join("docs/index.html"), "docs index").unwrap();
        std::fs::create_dir(temp.path().join("empty")).unwrap();

        let (status, _, body) = get(app_for(&temp), "/docs/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_ref(), b"docs index");

        let (status, _, _) = get(app_for(&temp), "/empty", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn api_routes_reject_other_methods_with_json() {
        let temp = TempDir::new().unwrap();
        for uri in ["/api/list", "/api/move", "/api/delete"] {
            let (status, headers, body) = get(app_for(&temp), uri, None).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{}", uri);
            assert_eq!(headers[header::ALLOW], "POST");
            let value: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(value["error"], "Method not allowed");
        }
    }

    #[tokio::test]
    async fn unsupported_methods_are_rejected() {
        let temp = TempDir::new().unwrap();
        let request = axum::http::Request::builder()
            .method(Method::PUT)
            .uri("/a.mp4")
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = send(app_for(&temp), request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(headers[header::ALLOW], "GET, HEAD, POST");
    }

    #[tokio::test]
    async fn aborted_transfer_keeps_server_running() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("big.mp4"), vec![7u8; 4 * 1024 * 1024]).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve_until(listener, app_for(&temp), async move {
            let _ = stop_rx.await;
        }));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET /big.mp4 HTTP/1.1\r\nHost: localhost\r\nRange: bytes=0-\r\n\r\n")
            .await
            .unwrap();
        let mut buf = vec![0u8; 4096];
        let n = client.read(&mut buf).await.unwrap();
        assert!(String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 206"));
        drop(client);

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(
                b"POST /api/list HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            )
            .await
            .unwrap();
        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("big.mp4"));

        stop_tx.send(()).unwrap();
        server.await.unwrap();
    }
}
