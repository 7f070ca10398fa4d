//! WebSocket upgrade handler and HTTP routes for the relay.
//!
//! Handles the HTTP → WebSocket upgrade and hands the socket to the
//! session lifecycle:
//! 1. Upgrade to WebSocket
//! 2. Handshake (first message = identity)
//! 3. Join the identity's room
//! 4. Route messages until disconnect
//! 5. Leave the room

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

use super::{
    connection::split_socket,
    handshake::HandshakeConfig,
    rooms::RoomManager,
    session::serve_connection,
};

/// State shared by all relay routes.
#[derive(Clone)]
pub struct WebSocketState {
    /// Room manager owning all membership.
    pub room_manager: Arc<RoomManager>,
    /// Handshake settings applied to every new connection.
    pub handshake: HandshakeConfig,
    /// Prometheus handle for `/metrics`; the route answers 404 without one.
    pub metrics: Option<PrometheusHandle>,
}

impl WebSocketState {
    /// Create a new WebSocket state.
    pub fn new(room_manager: Arc<RoomManager>, handshake: HandshakeConfig) -> Self {
        Self {
            room_manager,
            handshake,
            metrics: None,
        }
    }

    /// Attach a Prometheus handle to serve `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /stream`
///
/// No authentication: room membership is whatever the client claims in
/// its handshake.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    State(state): State<WebSocketState>,
) -> Response {
    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    tracing::debug!(peer = ?peer, "upgrading connection");

    ws.on_upgrade(move |socket| handle_socket(socket, peer, state))
}

/// Run an established WebSocket connection to completion.
async fn handle_socket(socket: WebSocket, peer: Option<SocketAddr>, state: WebSocketState) {
    let (connection, source) = split_socket(socket, state.room_manager.write_timeout());

    // Handshake failures are already logged and the socket closed.
    let _ = serve_connection(
        connection,
        source,
        &state.room_manager,
        &state.handshake,
        peer,
    )
    .await;
}

/// Render Prometheus metrics.
///
/// Route: `GET /metrics`
pub async fn metrics_handler(State(state): State<WebSocketState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Liveness probe.
///
/// Route: `GET /health`
pub async fn health_handler() -> &'static str {
    "ok"
}

/// Create the relay router with all routes and request tracing.
///
/// # Example
///
/// ```ignore
/// let state = WebSocketState::new(Arc::new(RoomManager::default()), HandshakeConfig::default());
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(
///     listener,
///     relay_router(state).into_make_service_with_connect_info::<SocketAddr>(),
/// )
/// .await?;
/// ```
pub fn relay_router(state: WebSocketState) -> Router {
    Router::new()
        .route("/stream", get(ws_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
