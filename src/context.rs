//! Per-invocation handler context
//!
//! Created by the dispatcher for handlers registered with `wants_context`,
//! bound to a single call and dropped when the handler returns. Offers a
//! logging side channel and progress reporting to connected stream clients.

use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};

use crate::hub::StreamHub;

pub struct Context {
    request_id: Option<Value>,
    hub: StreamHub,
}

impl Context {
    pub(crate) fn new(request_id: Option<Value>, hub: StreamHub) -> Self {
        Self { request_id, hub }
    }

    /// JSON-RPC id of the originating request; `None` on the direct REST
    /// path and for notifications.
    pub fn request_id(&self) -> Option<&Value> {
        self.request_id.as_ref()
    }

    pub fn debug(&self, message: &str) {
        debug!(request_id = ?self.request_id, "{message}");
    }

    pub fn info(&self, message: &str) {
        info!(request_id = ?self.request_id, "{message}");
    }

    pub fn warning(&self, message: &str) {
        warn!(request_id = ?self.request_id, "{message}");
    }

    pub fn error(&self, message: &str) {
        error!(request_id = ?self.request_id, "{message}");
    }

    /// Emit a `notifications/progress` event to every open stream. A
    /// notification carries no id, so no response envelope is produced.
    pub fn report_progress(&self, progress: f64, total: Option<f64>, message: Option<&str>) {
        let mut params = Map::new();
        params.insert(
            "requestId".to_string(),
            self.request_id.clone().unwrap_or(Value::Null),
        );
        params.insert("progress".to_string(), json!(progress));
        if let Some(total) = total {
            params.insert("total".to_string(), json!(total));
        }
        if let Some(message) = message {
            params.insert("message".to_string(), json!(message));
        }

        self.hub.broadcast(&json!({
            "jsonrpc": "2.0",
            "method": "notifications/progress",
            "params": params,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn report_progress_broadcasts_notification_with_request_id() {
        let hub = StreamHub::new();
        let mut stream = hub.subscribe();

        let ctx = Context::new(Some(json!(7)), hub.clone());
        ctx.report_progress(0.5, Some(1.0), Some("halfway"));

        let raw = stream.recv().await.expect("progress event");
        let event: Value = serde_json::from_str(&raw).expect("valid json");
        assert_eq!(event["method"], "notifications/progress");
        assert_eq!(event["params"]["requestId"], 7);
        assert_eq!(event["params"]["progress"], 0.5);
        assert_eq!(event["params"]["message"], "halfway");
        assert!(event.get("id").is_none());
    }
}
