// src/serve/server.rs

//! HTTP surface of the serve session: static style-guide pages plus the
//! live-reload channel.
//!
//! Routes:
//! - `/__musashi/reload`: WebSocket; each connected browser gets one
//!   message per reload broadcast.
//! - `/__musashi/reload.js`: the client script injected into HTML pages.
//! - everything else is resolved against the style guide directory.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::serve::hub::ReloadHub;
use crate::serve::static_files::{inject_reload_script, StaticError, StaticSite};

pub const RELOAD_WS_PATH: &str = "/__musashi/reload";
pub const RELOAD_SCRIPT_PATH: &str = "/__musashi/reload.js";

/// Browser side of the reload channel: reload on any message, reconnect with
/// a delay when the session restarts.
const RELOAD_CLIENT_JS: &str = r#"(function () {
  function connect() {
    var ws = new WebSocket("ws://" + location.host + "/__musashi/reload");
    ws.onmessage = function () { location.reload(); };
    ws.onclose = function () { setTimeout(connect, 1000); };
  }
  connect();
})();
"#;

#[derive(Clone)]
struct ServerState {
    site: Arc<StaticSite>,
    hub: ReloadHub,
}

/// Router over the style guide directory with the reload channel mounted.
pub fn build_router(site: StaticSite, hub: ReloadHub) -> Router {
    let state = ServerState {
        site: Arc::new(site),
        hub,
    };

    Router::new()
        .route(RELOAD_WS_PATH, get(reload_ws_handler))
        .route(RELOAD_SCRIPT_PATH, get(reload_script_handler))
        .fallback(get(static_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn reload_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<ServerState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| forward_reloads(socket, state.hub))
}

/// Push reload broadcasts to one browser until either side goes away.
async fn forward_reloads(socket: WebSocket, hub: ReloadHub) {
    let mut reloads = hub.subscribe();
    let (mut sink, mut stream) = socket.split();

    info!(clients = hub.client_count(), "reload client connected");

    loop {
        tokio::select! {
            reload = reloads.recv() => match reload {
                Ok(_) => {
                    if sink.send(Message::Text("reload".into())).await.is_err() {
                        debug!("reload sink closed");
                        break;
                    }
                }
                // Missed broadcasts collapse into the next reload.
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                // The client script never talks to us; drop anything else.
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(error = %err, "reload socket receive error");
                    break;
                }
            },
        }
    }

    debug!("reload client disconnected");
}

async fn reload_script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        RELOAD_CLIENT_JS,
    )
}

/// Resolve any other path against the style guide directory.
///
/// HTML responses get the reload client script injected so every generated
/// page participates in live reload without the generator knowing about it.
async fn static_handler(State(state): State<ServerState>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    let site = Arc::clone(&state.site);

    let resolved = tokio::task::spawn_blocking(move || site.resolve(&path)).await;

    match resolved {
        Ok(Ok(file)) => {
            if file.is_html() {
                let html = String::from_utf8_lossy(&file.body);
                let injected = inject_reload_script(&html, RELOAD_SCRIPT_PATH);
                ([(header::CONTENT_TYPE, file.content_type)], injected).into_response()
            } else {
                ([(header::CONTENT_TYPE, file.content_type)], file.body).into_response()
            }
        }
        Ok(Err(StaticError::NotFound(path))) => {
            (StatusCode::NOT_FOUND, format!("not found: {path}")).into_response()
        }
        Ok(Err(StaticError::Traversal(path))) => {
            warn!(path = %path, "rejected path traversal attempt");
            StatusCode::FORBIDDEN.into_response()
        }
        Ok(Err(StaticError::Io(err))) => {
            warn!(error = %err, "static file read failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(err) => {
            warn!(error = %err, "static resolve task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
