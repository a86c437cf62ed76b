//! flux-gateway - HTTP and WebSocket front end for FLUX
//!
//! Serves the chat endpoint, registry and health views, and a per-client
//! WebSocket that streams typing indicators and agent responses as the
//! collaboration loop runs.

pub mod connections;
pub mod protocol;
pub mod server;

pub use connections::ConnectionManager;
pub use server::GatewayServer;
