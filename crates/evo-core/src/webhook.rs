use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::info;

pub const WEBHOOK_HISTORY_MAX: usize = 256;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WebhookEvent {
    pub sequence: u64,
    pub instance_id: String,
    pub received_at: DateTime<Utc>,
    pub payload: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebhookAck {
    pub sequence: u64,
}

/// Ingress point for inbound events. Instance ids are taken as given; the
/// registry is never consulted.
#[derive(Debug)]
pub struct WebhookSink {
    capacity: usize,
    received: AtomicU64,
    history: Mutex<VecDeque<WebhookEvent>>,
}

impl Default for WebhookSink {
    fn default() -> Self {
        Self::with_capacity(WEBHOOK_HISTORY_MAX)
    }
}

impl WebhookSink {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            received: AtomicU64::new(0),
            history: Mutex::new(VecDeque::new()),
        }
    }

    pub async fn receive(&self, instance_id: &str, payload: Value) -> WebhookAck {
        let sequence = self.received.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            event = "webhook_received",
            instance_id = instance_id,
            sequence = sequence,
            payload = %payload
        );
        let mut history = self.history.lock().await;
        while history.len() >= self.capacity {
            history.pop_front();
        }
        history.push_back(WebhookEvent {
            sequence,
            instance_id: instance_id.to_string(),
            received_at: Utc::now(),
            payload,
        });
        WebhookAck { sequence }
    }

    /// Up to `limit` most recent events, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<WebhookEvent> {
        self.history
            .lock()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn total_received(&self) -> u64 {
        self.received.load(Ordering::SeqCst)
    }
}
