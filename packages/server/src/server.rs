use crate::error::{ServerError, ServerResult};
use crate::live_reload;
use crate::watcher::FileWatcher;
use axum::body::Body;
use axum::extract::{Path as UrlPath, Request, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::stream::{self, Stream};
use merge_compiler::{is_html, CompileOptions, Compiler};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub root_dir: PathBuf,
    /// Port to listen on; any free port when unset
    pub port: Option<u16>,
    /// JSON context for every page
    pub state: Option<PathBuf>,
    pub live_reload: bool,
}

impl ServerConfig {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            port: None,
            state: None,
            live_reload: true,
        }
    }
}

struct AppState {
    config: ServerConfig,
    compiler: Compiler,
    reload: broadcast::Sender<String>,
}

impl AppState {
    /// HTML page a request path maps to. Directories map to their `index.html`.
    fn page(&self, relative: &Path) -> Option<PathBuf> {
        let fs = self.compiler.file_system();
        let mut candidate = self.config.root_dir.join(relative);
        if fs.exists(&candidate) && !fs.is_file(&candidate) {
            candidate = candidate.join("index.html");
        }
        (is_html(&candidate) && fs.is_file(&candidate)).then_some(candidate)
    }

    async fn render(&self, file: &Path) -> Response {
        let options = CompileOptions {
            state: self.config.state.clone(),
            pretty: false,
            ..Default::default()
        };
        match self
            .compiler
            .compile_file(&self.config.root_dir, file, &options)
            .await
        {
            Ok(compiled) => Html(self.with_reload(compiled.output)).into_response(),
            Err(e) => {
                error!(file = %file.display(), error = %e, "Failed to render page");
                let page = format!(
                    "<!DOCTYPE html><html><head><title>Merge error</title></head><body><pre>{}</pre></body></html>",
                    escape(&e.to_string())
                );
                (StatusCode::INTERNAL_SERVER_ERROR, Html(self.with_reload(page))).into_response()
            }
        }
    }

    fn with_reload(&self, html: String) -> String {
        if self.config.live_reload {
            live_reload::inject(&html)
        } else {
            html
        }
    }

    /// Tell connected pages to reload. Returns how many were listening.
    fn broadcast(&self, changed: &[PathBuf]) -> usize {
        let message = changed
            .iter()
            .map(|path| {
                path.strip_prefix(&self.config.root_dir)
                    .unwrap_or(path)
                    .display()
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join(",");
        self.reload.send(message).unwrap_or(0)
    }
}

/// Development server: merges pages on request and reloads the browser when
/// anything under the site root changes
pub struct DevServer {
    state: Arc<AppState>,
}

impl DevServer {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_compiler(config, Compiler::new())
    }

    pub fn with_compiler(config: ServerConfig, compiler: Compiler) -> Self {
        let (reload, _) = broadcast::channel(16);
        Self {
            state: Arc::new(AppState {
                config,
                compiler,
                reload,
            }),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(live_reload::EVENTS_PATH, get(reload_events))
            .route("/", get(serve_root))
            .route("/*path", get(serve_path))
            .with_state(self.state.clone())
            .layer(CorsLayer::permissive())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.state.reload.subscribe()
    }

    pub fn notify_change(&self, changed: &[PathBuf]) -> usize {
        self.state.broadcast(changed)
    }

    /// Bind the listener on localhost
    pub async fn bind(&self) -> ServerResult<TcpListener> {
        let root = &self.state.config.root_dir;
        if !root.is_dir() {
            return Err(ServerError::NotADirectory(root.clone()));
        }
        let addr = SocketAddr::from(([127, 0, 0, 1], self.state.config.port.unwrap_or(0)));
        TcpListener::bind(addr)
            .await
            .map_err(|error| ServerError::Bind { addr, error })
    }

    /// Serve until the listener fails
    pub async fn serve(self, listener: TcpListener) -> ServerResult<()> {
        if self.state.config.live_reload {
            self.spawn_watcher()?;
        }
        info!(
            addr = ?listener.local_addr().ok(),
            root = %self.state.config.root_dir.display(),
            "Serving"
        );
        axum::serve(listener, self.router())
            .await
            .map_err(ServerError::Serve)
    }

    fn spawn_watcher(&self) -> ServerResult<()> {
        let mut watcher = FileWatcher::new(&self.state.config.root_dir)?;
        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(changed) = watcher.next_change().await {
                let listeners = state.broadcast(&changed);
                info!(files = changed.len(), listeners, "Site changed");
            }
        });
        Ok(())
    }
}

async fn serve_root(State(state): State<Arc<AppState>>, request: Request) -> Response {
    serve(state, "", request).await
}

async fn serve_path(
    State(state): State<Arc<AppState>>,
    UrlPath(path): UrlPath<String>,
    request: Request,
) -> Response {
    serve(state, &path, request).await
}

async fn serve(state: Arc<AppState>, path: &str, request: Request) -> Response {
    let Some(relative) = sanitize(path) else {
        warn!(path, "Rejected path outside the site root");
        return StatusCode::NOT_FOUND.into_response();
    };
    match state.page(&relative) {
        Some(file) => state.render(&file).await,
        None => serve_static(&state.config.root_dir, request).await,
    }
}

async fn serve_static(root: &Path, request: Request) -> Response {
    match ServeDir::new(root).oneshot(request).await {
        Ok(response) => response.map(Body::new).into_response(),
        Err(never) => match never {},
    }
}

/// Relative path of a request, rejecting anything that could leave the root
fn sanitize(path: &str) -> Option<PathBuf> {
    let relative = PathBuf::from(path.trim_start_matches('/'));
    relative
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
        .then_some(relative)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

async fn reload_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.reload.subscribe();
    let events = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(changed) => {
                    let event = Event::default()
                        .event(live_reload::RELOAD_EVENT)
                        .data(changed);
                    return Some((Ok(event), receiver));
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("Reload subscriber lagged by {} messages", n);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
