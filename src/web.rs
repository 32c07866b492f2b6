use crate::assets::{DEFAULT_ENTRY, content_type_for, resolve_request_path};
use axum::{
    Router,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::any,
};
use std::fmt;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{debug, info, warn};

type SharedState = Arc<AppState>;
pub const DEFAULT_PORT: u16 = 5000;
const FAVICON_PATH: &str = "/favicon.ico";

#[derive(Debug, Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub entry: String,
}

impl AppState {
    fn entry_path(&self) -> PathBuf {
        self.root.join(&self.entry)
    }
}

/// How files below the root are turned into responses.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ServeStrategy {
    /// Read files directly and label them from the fixed content-type table.
    #[default]
    Mapped,
    /// Delegate to `tower-http`'s `ServeDir` and its content-type inference.
    Middleware,
}

impl fmt::Display for ServeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServeStrategy::Mapped => write!(f, "mapped"),
            ServeStrategy::Middleware => write!(f, "middleware"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub root: PathBuf,
    pub entry: String,
    pub strategy: ServeStrategy,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            root: PathBuf::from("."),
            entry: DEFAULT_ENTRY.to_string(),
            strategy: ServeStrategy::default(),
        }
    }
}

impl WebConfig {
    /// Defaults with the port taken from `$PORT`, bound on all interfaces.
    pub fn from_env() -> Self {
        let port = port_from_var(std::env::var("PORT").ok().as_deref());
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], port)),
            ..Self::default()
        }
    }
}

/// Parses a `PORT` value, falling back to [`DEFAULT_PORT`] when it is unset
/// or not a valid port number.
fn port_from_var(value: Option<&str>) -> u16 {
    match value.map(str::trim) {
        None | Some("") => DEFAULT_PORT,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(value = raw, default = DEFAULT_PORT, "ignoring unparsable PORT");
            DEFAULT_PORT
        }),
    }
}

#[derive(Debug)]
pub enum WebError {
    Io(std::io::Error),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for WebError {}

impl From<std::io::Error> for WebError {
    fn from(value: std::io::Error) -> Self {
        WebError::Io(value)
    }
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let state = Arc::new(AppState {
        root: config.root.clone(),
        entry: config.entry.clone(),
    });
    let router = build_router(state, config.strategy);
    info!(
        %config.addr,
        root = %config.root.display(),
        entry = %config.entry,
        strategy = %config.strategy,
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    info!("Server running at http://{}/", config.addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

fn build_router(state: SharedState, strategy: ServeStrategy) -> Router {
    let router = Router::new().route(FAVICON_PATH, any(favicon));
    let router = match strategy {
        ServeStrategy::Mapped => router.fallback(serve_mapped),
        ServeStrategy::Middleware => {
            let entry = ServeFile::new(state.entry_path());
            router.fallback_service(ServeDir::new(&state.root).fallback(entry))
        }
    };
    router
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Browsers always ask for a favicon; answering here keeps the entry
/// document from being sent back as an icon.
async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn serve_mapped(State(state): State<SharedState>, uri: Uri) -> Response {
    let request_path = uri.path();
    let Some(path) = resolve_request_path(&state.root, request_path, &state.entry) else {
        debug!(path = request_path, "path leaves served root; serving entry document");
        return serve_entry(&state).await;
    };
    let content_type = content_type_for(&path);
    match fs::read(&path).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type.to_string())],
            bytes,
        )
            .into_response(),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = request_path, "no such file; serving entry document");
            serve_entry(&state).await
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read static file");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Server Error: {}", error_code(&err)),
            )
                .into_response()
        }
    }
}

async fn serve_entry(state: &AppState) -> Response {
    let path = state.entry_path();
    match fs::read(&path).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, mime::TEXT_HTML.to_string())],
            bytes,
        )
            .into_response(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read entry document");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error loading {}", state.entry),
            )
                .into_response()
        }
    }
}

fn error_code(err: &std::io::Error) -> String {
    format!("{:?}", err.kind())
}

#[cfg(all(test, feature = "web"))]
mod tests {
    use super::*;
    use axum::{body, body::Body, http::Request};
    use std::fs as stdfs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const INDEX: &str = "<!DOCTYPE html><title>Bevel</title>";

    fn site() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        stdfs::write(root.join("index.html"), INDEX).unwrap();
        stdfs::create_dir_all(root.join("css")).unwrap();
        stdfs::write(root.join("css").join("style.css"), "body { margin: 0 }").unwrap();
        stdfs::write(root.join("data.json"), "{\"ok\":true}").unwrap();
        stdfs::write(root.join("notes.md"), "# notes").unwrap();
        stdfs::write(root.join("my file.txt"), "spaced").unwrap();
        stdfs::write(root.join("favicon.ico"), [0u8, 0, 1, 0]).unwrap();
        stdfs::create_dir_all(root.join("docs")).unwrap();
        dir
    }

    fn test_router(root: &std::path::Path, strategy: ServeStrategy) -> Router {
        let state = Arc::new(AppState {
            root: root.to_path_buf(),
            entry: DEFAULT_ENTRY.to_string(),
        });
        build_router(state, strategy)
    }

    async fn fetch(router: Router, request: Request<Body>) -> (StatusCode, Option<String>, Vec<u8>) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|value| value.to_str().unwrap().to_string());
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, bytes.to_vec())
    }

    async fn get(router: Router, path: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        fetch(router, Request::get(path).body(Body::empty()).unwrap()).await
    }

    #[tokio::test]
    async fn root_serves_entry_document() {
        let dir = site();
        let (status, content_type, body) =
            get(test_router(dir.path(), ServeStrategy::Mapped), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("text/html"));
        assert_eq!(body, INDEX.as_bytes());
    }

    #[tokio::test]
    async fn existing_files_use_the_content_type_table() {
        let dir = site();
        let cases = [
            ("/css/style.css", "text/css"),
            ("/data.json", "application/json"),
            ("/notes.md", "text/plain"),
            ("/my%20file.txt", "text/plain"),
        ];
        for (path, expected) in cases {
            let (status, content_type, _) =
                get(test_router(dir.path(), ServeStrategy::Mapped), path).await;
            assert_eq!(status, StatusCode::OK, "{path}");
            assert_eq!(content_type.as_deref(), Some(expected), "{path}");
        }
        let (_, _, body) = get(test_router(dir.path(), ServeStrategy::Mapped), "/css/style.css").await;
        assert_eq!(body, b"body { margin: 0 }");
    }

    #[tokio::test]
    async fn missing_paths_fall_back_to_entry() {
        let dir = site();
        for path in ["/about", "/deep/link/page.css", "/?q=rust", "/search?q=tokio"] {
            let (status, content_type, body) =
                get(test_router(dir.path(), ServeStrategy::Mapped), path).await;
            assert_eq!(status, StatusCode::OK, "{path}");
            assert_eq!(content_type.as_deref(), Some("text/html"), "{path}");
            assert_eq!(body, INDEX.as_bytes(), "{path}");
        }
    }

    #[tokio::test]
    async fn traversal_outside_root_gets_entry_document() {
        let outer = tempfile::tempdir().unwrap();
        stdfs::write(outer.path().join("secret.txt"), "top secret").unwrap();
        let root = outer.path().join("site");
        stdfs::create_dir_all(&root).unwrap();
        stdfs::write(root.join("index.html"), INDEX).unwrap();

        for path in ["/../secret.txt", "/%2e%2e/secret.txt"] {
            let (status, _, body) = get(test_router(&root, ServeStrategy::Mapped), path).await;
            assert_eq!(status, StatusCode::OK, "{path}");
            assert_eq!(body, INDEX.as_bytes(), "{path}");
        }
    }

    #[tokio::test]
    async fn missing_entry_document_is_a_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _, body) = get(test_router(dir.path(), ServeStrategy::Mapped), "/nothing").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, b"Error loading index.html");
    }

    #[tokio::test]
    async fn unreadable_path_reports_error_code() {
        let dir = site();
        let (status, _, body) = get(test_router(dir.path(), ServeStrategy::Mapped), "/docs/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("Server Error: "), "{text}");
    }

    #[tokio::test]
    async fn favicon_is_always_no_content() {
        let dir = site();
        for strategy in [ServeStrategy::Mapped, ServeStrategy::Middleware] {
            let (status, _, body) = get(test_router(dir.path(), strategy), "/favicon.ico").await;
            assert_eq!(status, StatusCode::NO_CONTENT, "{strategy}");
            assert!(body.is_empty(), "{strategy}");
        }
        let empty = tempfile::tempdir().unwrap();
        let (status, _, _) = get(test_router(empty.path(), ServeStrategy::Mapped), "/favicon.ico").await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let request = Request::post("/favicon.ico").body(Body::empty()).unwrap();
        let (status, _, _) = fetch(test_router(dir.path(), ServeStrategy::Mapped), request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn middleware_serves_files_and_falls_back() {
        let dir = site();
        let (status, content_type, body) =
            get(test_router(dir.path(), ServeStrategy::Middleware), "/css/style.css").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/css"));
        assert_eq!(body, b"body { margin: 0 }");

        let (status, content_type, body) =
            get(test_router(dir.path(), ServeStrategy::Middleware), "/anything/else").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/html"));
        assert_eq!(body, INDEX.as_bytes());

        let (status, _, body) = get(test_router(dir.path(), ServeStrategy::Middleware), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, INDEX.as_bytes());
    }

    #[test]
    fn default_config_binds_all_interfaces_on_5000() {
        let config = WebConfig::default();
        assert_eq!(config.addr.to_string(), "0.0.0.0:5000");
        assert_eq!(config.entry, "index.html");
        assert_eq!(config.strategy, ServeStrategy::Mapped);
    }

    #[test]
    fn port_variable_parsing() {
        assert_eq!(port_from_var(Some("8081")), 8081);
        assert_eq!(port_from_var(Some(" 3000 ")), 3000);
        assert_eq!(port_from_var(None), DEFAULT_PORT);
        assert_eq!(port_from_var(Some("")), DEFAULT_PORT);
        assert_eq!(port_from_var(Some("not-a-port")), DEFAULT_PORT);
        assert_eq!(port_from_var(Some("70000")), DEFAULT_PORT);
    }

    #[test]
    fn env_config_binds_all_interfaces() {
        let config = WebConfig::from_env();
        assert!(config.addr.ip().is_unspecified());
        assert_eq!(config.entry, DEFAULT_ENTRY);
        assert_eq!(config.root, PathBuf::from("."));
    }

    #[tokio::test]
    async fn favicon_with_query_string_is_no_content() {
        let dir = site();
        let (status, _, body) =
            get(test_router(dir.path(), ServeStrategy::Mapped), "/favicon.ico?v=2").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn bundled_landing_page_loads_the_search_widget() {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("site");
        let (status, content_type, body) = get(test_router(&root, ServeStrategy::Mapped), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("text/html"));
        let html = String::from_utf8(body).unwrap();
        assert!(html.contains("https://cse.google.com/cse.js"));
        assert!(html.contains("window.__gcse"));
        assert!(html.contains("callback"));
        assert!(html.contains("data-search=\"rust programming\""));

        let (status, content_type, _) =
            get(test_router(&root, ServeStrategy::Mapped), "/js/host.js").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("text/javascript"));
    }

    #[test]
    fn error_code_names_the_io_kind() {
        let err = std::io::Error::from(ErrorKind::PermissionDenied);
        assert_eq!(error_code(&err), "PermissionDenied");
    }
}
