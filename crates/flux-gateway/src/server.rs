//! Gateway server - Axum-based HTTP + WS server

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

use flux_core::{ChatRequest, Collaboration, CollaborationEvent};

use crate::connections::ConnectionManager;
use crate::protocol::{
    ChatEnvelope, ClientFrame, ErrorEnvelope, FrameKind, ServerEvent, parse_chat_body,
};

pub const WELCOME_MESSAGE: &str = "Connected to FLUX - the team is ready!";

const ENDPOINTS: &[&str] = &[
    "GET /",
    "GET /health",
    "GET /agents",
    "POST /chat",
    "GET /ws/{client_id}",
];

/// Shared state for every handler
#[derive(Clone)]
pub struct GatewayState {
    pub collaboration: Arc<Collaboration>,
    pub connections: Arc<ConnectionManager>,
    pub start_time: std::time::Instant,
}

/// The gateway server
pub struct GatewayServer {
    state: GatewayState,
    bind: SocketAddr,
}

impl GatewayServer {
    pub fn new(bind: SocketAddr, collaboration: Arc<Collaboration>) -> Self {
        let state = GatewayState {
            collaboration,
            connections: Arc::new(ConnectionManager::new()),
            start_time: std::time::Instant::now(),
        };
        Self { state, bind }
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(root_handler).options(options_handler))
            .route("/health", get(health_handler).options(options_handler))
            .route("/api/health", get(health_handler).options(options_handler))
            .route("/agents", get(agents_handler).options(options_handler))
            .route("/api/agents", get(agents_handler).options(options_handler))
            .route("/chat", post(chat_handler).options(options_handler))
            .route("/api/chat", post(chat_handler).options(options_handler))
            .route("/ws/{client_id}", get(ws_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Bind and serve until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.bind).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener until `shutdown` is cancelled
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> anyhow::Result<()> {
        let router = self.router();
        info!("Gateway listening on {}", listener.local_addr()?);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

        info!("Gateway stopped");
        Ok(())
    }

    /// Start the server in the background, returning a handle
    pub fn spawn(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}

// ── HTTP Handlers ──

async fn root_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let agents: Vec<&str> = state
        .collaboration
        .registry()
        .iter()
        .map(|d| d.id.as_str())
        .collect();

    axum::Json(json!({
        "service": "FLUX",
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "groq_configured": state.collaboration.is_configured(),
        "agents": agents,
        "endpoints": ENDPOINTS,
    }))
}

async fn health_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    axum::Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "active_connections": state.connections.count().await,
        "agents_loaded": state.collaboration.registry().len(),
        "groq_configured": state.collaboration.is_configured(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

async fn agents_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let status = if state.collaboration.is_configured() {
        "active"
    } else {
        "unconfigured"
    };
    let registry = state.collaboration.registry();
    let agents: serde_json::Map<String, serde_json::Value> = registry
        .iter()
        .map(|d| {
            (
                d.id.to_string(),
                json!({
                    "name": d.name,
                    "role": d.role,
                    "model": d.model,
                    "status": status,
                }),
            )
        })
        .collect();

    axum::Json(json!({
        "agents": agents,
        "total": registry.len(),
    }))
}

async fn options_handler() -> StatusCode {
    StatusCode::OK
}

/// Always answers 200; failures use the error envelope
async fn chat_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let request = match parse_chat_body(content_type, &body) {
        Ok(r) => r,
        Err(e) => {
            warn!("Rejected chat request: {}", e);
            return axum::Json(ErrorEnvelope::post(&e)).into_response();
        }
    };

    match state.collaboration.run(&request, None).await {
        Ok(outcome) => axum::Json(ChatEnvelope::from(outcome)).into_response(),
        Err(e) => {
            warn!("Rejected chat request: {}", e);
            axum::Json(ErrorEnvelope::post(&e)).into_response()
        }
    }
}

// ── WebSocket Handler ──

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(client_id): Path<String>,
    State(state): State<GatewayState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state, client_id))
}

async fn handle_ws(socket: WebSocket, state: GatewayState, client_id: String) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(64);
    let conn_id = state.connections.register(&client_id, tx.clone()).await;

    // Forward queued events to this socket
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(j) => j,
                Err(e) => {
                    error!("Failed to serialize event: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let _ = tx.send(ServerEvent::system(WELCOME_MESSAGE)).await;

    while let Some(msg) = ws_receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => {
                debug!("Client {} sent close", client_id);
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!("WebSocket error from {}: {}", client_id, e);
                break;
            }
        };

        let frame = match ClientFrame::parse(&text) {
            Ok(f) => f,
            Err(e) => {
                let _ = tx.send(ServerEvent::system(format!("Error: {}", e))).await;
                continue;
            }
        };

        match frame.kind {
            FrameKind::Ping => {
                let _ = tx.send(ServerEvent::pong()).await;
            }
            FrameKind::Message => {
                debug!("Message from {}: {} chars", client_id, frame.message.len());
                let request = frame.into_request();
                if let Err(e) = run_for_client(&state, &client_id, &request).await {
                    let _ = tx.send(ServerEvent::system(format!("Error: {}", e))).await;
                }
            }
        }
    }

    state.connections.unregister(&client_id, conn_id).await;
    send_task.abort();
}

/// Run one collaboration, pushing events to the client's current connection
async fn run_for_client(
    state: &GatewayState,
    client_id: &str,
    request: &ChatRequest,
) -> flux_core::error::Result<()> {
    let (events_tx, mut events_rx) = mpsc::channel::<CollaborationEvent>(32);

    let forward = async {
        while let Some(event) = events_rx.recv().await {
            let Some(event) = to_server_event(event) else {
                continue;
            };
            if !state.connections.send(client_id, event).await {
                debug!("Client {} gone, dropping event", client_id);
            }
        }
    };

    let (outcome, ()) = tokio::join!(state.collaboration.run(request, Some(events_tx)), forward);
    let outcome = outcome?;
    info!(
        "Client {}: {} responses over {} round(s)",
        client_id,
        outcome.responses.len(),
        outcome.rounds
    );
    Ok(())
}

fn to_server_event(event: CollaborationEvent) -> Option<ServerEvent> {
    match event {
        CollaborationEvent::RoundStarted { .. } => None,
        CollaborationEvent::Typing { agent, typing } => Some(ServerEvent::typing(agent, typing)),
        CollaborationEvent::Response(record) => Some(ServerEvent::AgentResponse { record }),
        CollaborationEvent::NotConfigured(message) => Some(ServerEvent::system(message)),
    }
}
