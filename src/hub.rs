//! Streaming broadcast hub
//!
//! Owns the set of open event-stream connections. This is the only shared
//! mutable state in the engine; every access goes through the single mutex.
//! Broadcast never blocks the request that triggered it: sends are unbounded
//! and clients whose channel is gone are evicted silently.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

struct StreamClient {
    sender: UnboundedSender<String>,
}

#[derive(Clone, Default)]
pub struct StreamHub {
    clients: Arc<Mutex<Vec<StreamClient>>>,
}

impl StreamHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stream client; the returned receiver yields the serialized
    /// payload of every subsequent broadcast. Dropping it evicts the client
    /// on the next broadcast.
    pub fn subscribe(&self) -> UnboundedReceiver<String> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut clients = self.clients.lock().expect("stream client set poisoned");
        clients.push(StreamClient { sender });
        debug!(total = clients.len(), "stream client connected");
        receiver
    }

    pub fn broadcast(&self, message: &Value) {
        self.broadcast_raw(&message.to_string());
    }

    /// Fan an already-serialized payload out to every open stream. The
    /// synchronous response path reuses the same string, keeping the bytes
    /// sent to the caller and to the streams identical.
    pub fn broadcast_raw(&self, payload: &str) {
        let mut clients = self.clients.lock().expect("stream client set poisoned");
        let before = clients.len();
        clients.retain(|client| client.sender.send(payload.to_string()).is_ok());
        if clients.len() < before {
            debug!(
                evicted = before - clients.len(),
                total = clients.len(),
                "evicted disconnected stream clients"
            );
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().expect("stream client set poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn broadcast_reaches_all_subscribers_identically() {
        let hub = StreamHub::new();
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        hub.broadcast(&json!({"jsonrpc": "2.0", "id": 200, "result": {}}));

        let a = first.recv().await.expect("first client message");
        let b = second.recv().await.expect("second client message");
        assert_eq!(a, b);
        assert!(a.contains("\"id\":200"));
    }

    #[tokio::test]
    async fn dropped_subscriber_is_evicted_on_next_broadcast() {
        let hub = StreamHub::new();
        let _alive = hub.subscribe();
        let dead = hub.subscribe();
        drop(dead);
        assert_eq!(hub.client_count(), 2);

        hub.broadcast(&json!({"jsonrpc": "2.0", "id": 1, "result": {}}));
        assert_eq!(hub.client_count(), 1);
    }

    #[tokio::test]
    async fn broadcast_with_no_clients_is_a_no_op() {
        let hub = StreamHub::new();
        hub.broadcast(&json!({"jsonrpc": "2.0", "id": 1, "result": {}}));
        assert_eq!(hub.client_count(), 0);
    }
}
