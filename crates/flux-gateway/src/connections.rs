//! Live WebSocket connections keyed by client id

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::protocol::ServerEvent;

/// Outbound half of one connection
#[derive(Debug, Clone)]
struct ClientHandle {
    conn_id: Uuid,
    sender: mpsc::Sender<ServerEvent>,
}

/// Maps client ids to their current connection. A reconnect replaces the
/// previous handle, and only the connection that registered a handle can
/// remove it.
pub struct ConnectionManager {
    connections: Arc<RwLock<HashMap<String, ClientHandle>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a connection, returning the id that must be passed to `unregister`
    pub async fn register(&self, client_id: &str, sender: mpsc::Sender<ServerEvent>) -> Uuid {
        let conn_id = Uuid::new_v4();
        let handle = ClientHandle { conn_id, sender };
        let mut connections = self.connections.write().await;
        if connections.insert(client_id.to_string(), handle).is_some() {
            info!("Client {} reconnected, replacing previous connection", client_id);
        }
        info!(
            "Client {} connected ({} active)",
            client_id,
            connections.len()
        );
        conn_id
    }

    /// Remove the handle for `client_id` if it still belongs to `conn_id`
    pub async fn unregister(&self, client_id: &str, conn_id: Uuid) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get(client_id) {
            Some(handle) if handle.conn_id == conn_id => {
                connections.remove(client_id);
                info!(
                    "Client {} disconnected ({} active)",
                    client_id,
                    connections.len()
                );
                true
            }
            Some(_) => {
                debug!("Stale disconnect for {} ignored", client_id);
                false
            }
            None => false,
        }
    }

    /// Push an event to a client's current connection
    pub async fn send(&self, client_id: &str, event: ServerEvent) -> bool {
        let sender = {
            let connections = self.connections.read().await;
            match connections.get(client_id) {
                Some(handle) => handle.sender.clone(),
                None => return false,
            }
        };
        sender.send(event).await.is_ok()
    }

    pub async fn count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
