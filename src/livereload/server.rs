// src/livereload/server.rs

//! LiveReload protocol over an axum websocket.
//!
//! ```text
//! Browser ── {"command":"hello","protocols":[...]} ──────────────► server
//!         ◄─ {"command":"hello","protocols":[...],"serverName":..} ─
//!         ◄─ {"command":"reload","path":"...","liveCSS":true} ───── per event
//! ```

use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{BuildError, Result};
use crate::livereload::LiveReload;
use crate::task::CancelToken;

const PROTOCOL_7: &str = "http://livereload.com/protocols/official-7";
const SERVER_NAME: &str = "plugin-builder";

#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
enum ServerMessage {
    Hello {
        protocols: Vec<&'static str>,
        #[serde(rename = "serverName")]
        server_name: &'static str,
    },
    Reload {
        path: String,
        #[serde(rename = "liveCSS")]
        live_css: bool,
    },
}

#[derive(Debug, Deserialize)]
struct ClientMessage {
    command: String,
}

#[derive(Clone)]
struct ServerState {
    livereload: LiveReload,
    cancel: CancelToken,
}

/// A running live-reload listener.
#[derive(Debug)]
pub struct LiveReloadServer {
    addr: SocketAddr,
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

impl LiveReloadServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for the server task to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!("live-reload server task ended abnormally: {e}");
        }
    }
}

/// Bind the listener and start serving in the background.
///
/// The server shuts down gracefully once `cancel` fires.
pub async fn serve(
    livereload: LiveReload,
    host: &str,
    port: u16,
    cancel: CancelToken,
) -> Result<LiveReloadServer> {
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .map_err(|e| BuildError::Config(format!("failed to bind live-reload on {host}:{port}: {e}")))?;
    let addr = listener.local_addr()?;

    let state = ServerState {
        livereload,
        cancel: cancel.clone(),
    };
    let app = Router::new()
        .route("/", get(status_handler))
        .route("/livereload", get(ws_handler))
        .with_state(state);

    let shutdown = cancel.clone();
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                info!("live-reload server shutting down");
            })
            .await
        {
            warn!("live-reload server error: {e}");
        }
    });

    info!(%addr, "live-reload server listening");
    Ok(LiveReloadServer {
        addr,
        cancel,
        handle,
    })
}

async fn status_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({ "server": SERVER_NAME, "protocols": [PROTOCOL_7] }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ServerState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

fn encode(msg: &ServerMessage) -> Option<Message> {
    serde_json::to_string(msg)
        .ok()
        .map(|json| Message::Text(json.into()))
}

async fn handle_connection(socket: WebSocket, state: ServerState) {
    let (mut sink, mut stream) = socket.split();
    let mut events = state.livereload.subscribe();
    let mut greeted = false;
    debug!("live-reload client connected");

    loop {
        tokio::select! {
            frame = stream.next() => {
                let Some(Ok(frame)) = frame else { break };
                match frame {
                    Message::Text(text) => {
                        let hello = serde_json::from_str::<ClientMessage>(&text)
                            .map(|m| m.command == "hello")
                            .unwrap_or(false);
                        if hello && !greeted {
                            greeted = true;
                            let reply = ServerMessage::Hello {
                                protocols: vec![PROTOCOL_7],
                                server_name: SERVER_NAME,
                            };
                            if let Some(msg) = encode(&reply) {
                                if sink.send(msg).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if !greeted {
                            continue;
                        }
                        let reload = ServerMessage::Reload { path: event.path, live_css: true };
                        if let Some(msg) = encode(&reload) {
                            if sink.send(msg).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "live-reload client lagging");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            _ = state.cancel.cancelled() => break,
        }
    }

    debug!("live-reload client disconnected");
}
