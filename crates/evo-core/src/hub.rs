use crate::dispatch::MessageDispatcher;
use crate::error::InstanceError;
use crate::handshake::{connect_payload, encode_qr_data_url_off_thread, CONNECT_INSTRUCTIONS};
use crate::model::{HandshakeArtifact, Instance, Receipt};
use crate::registry::InstanceRegistry;
use crate::scheduler::{LifecycleScheduler, CONNECT_DELAY};
use crate::webhook::{WebhookAck, WebhookEvent, WebhookSink};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct HubConfig {
    pub connect_delay: Duration,
    pub webhook_history: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            connect_delay: CONNECT_DELAY,
            webhook_history: crate::webhook::WEBHOOK_HISTORY_MAX,
        }
    }
}

/// Owns one registry and the components that act on it.
pub struct Hub {
    registry: Arc<InstanceRegistry>,
    scheduler: LifecycleScheduler,
    dispatcher: MessageDispatcher,
    webhooks: WebhookSink,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

impl Hub {
    pub fn new(config: HubConfig) -> Self {
        let registry = Arc::new(InstanceRegistry::new());
        Self {
            scheduler: LifecycleScheduler::new(registry.clone(), config.connect_delay),
            registry,
            dispatcher: MessageDispatcher::new(),
            webhooks: WebhookSink::with_capacity(config.webhook_history),
        }
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &LifecycleScheduler {
        &self.scheduler
    }

    /// Creates or replaces a record. Completions pending for a replaced
    /// record are aborted; the fresh record starts its own lifecycle.
    pub async fn create_instance(&self, name: Option<&str>) -> Instance {
        let instance = self.registry.create(name).await;
        self.scheduler.cancel(&instance.id).await;
        instance
    }

    pub async fn get_instance(&self, id: &str) -> Result<Instance, InstanceError> {
        self.registry.get(id).await
    }

    pub async fn list_instances(&self) -> Vec<Instance> {
        self.registry.list().await
    }

    pub async fn instance_count(&self) -> usize {
        self.registry.len().await
    }

    /// Encodes a fresh connect QR code, then moves the instance to
    /// `Connecting` and schedules its completion. Nothing is mutated when
    /// the lookup or the encoding fails.
    pub async fn begin_connect(&self, id: &str) -> Result<HandshakeArtifact, InstanceError> {
        self.registry.get(id).await?;

        let payload = connect_payload(id, Utc::now());
        let qr = match encode_qr_data_url_off_thread(payload).await {
            Ok(value) => value,
            Err(err) => {
                warn!(event = "qr_encode_failed", instance_id = id, error = %err);
                return Err(err);
            }
        };

        // Deleted while encoding: report it instead of reviving the record.
        let (_, generation) = self.registry.mark_connecting(id).await?;
        self.scheduler.schedule(id, generation).await;
        info!(event = "connect_started", instance_id = id);

        Ok(HandshakeArtifact {
            qr,
            message: CONNECT_INSTRUCTIONS.to_string(),
        })
    }

    /// Always succeeds; also aborts completions still pending for `id`.
    pub async fn delete_instance(&self, id: &str) {
        self.registry.delete(id).await;
        self.scheduler.cancel(id).await;
    }

    pub fn send_text(&self, instance_id: &str, body: &Value) -> Result<Receipt, InstanceError> {
        match self.dispatcher.send_text(instance_id, body) {
            Ok(receipt) => Ok(receipt),
            Err(err) => {
                warn!(event = "send_rejected", instance_id = instance_id, error = %err);
                Err(err)
            }
        }
    }

    pub async fn receive_webhook(&self, instance_id: &str, payload: Value) -> WebhookAck {
        self.webhooks.receive(instance_id, payload).await
    }

    pub async fn recent_webhooks(&self, limit: usize) -> Vec<WebhookEvent> {
        self.webhooks.recent(limit).await
    }

    pub fn webhooks_received(&self) -> u64 {
        self.webhooks.total_received()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InstanceStatus, SYNTHETIC_PHONE};
    use serde_json::json;

    const DELAY: Duration = Duration::from_millis(1_000);

    fn test_hub() -> Hub {
        Hub::new(HubConfig {
            connect_delay: DELAY,
            ..HubConfig::default()
        })
    }

    async fn settle() {
        tokio::time::sleep(DELAY + Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn connect_unknown_instance_is_not_found() {
        let hub = test_hub();
        let err = hub.begin_connect("ghost").await.expect_err("unknown id");
        assert_eq!(err, InstanceError::NotFound("ghost".to_string()));
        assert_eq!(hub.instance_count().await, 0);
        assert_eq!(hub.scheduler().pending("ghost").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_moves_to_connecting_then_connected() {
        let hub = test_hub();
        hub.create_instance(Some("gym")).await;

        let artifact = hub.begin_connect("gym").await.expect("connect");
        assert!(artifact.qr.starts_with("data:image/png;base64,"));
        assert_eq!(artifact.message, CONNECT_INSTRUCTIONS);

        let instance = hub.get_instance("gym").await.expect("exists");
        assert_eq!(instance.status, InstanceStatus::Connecting);
        assert!(instance.phone.is_none());

        settle().await;
        let instance = hub.get_instance("gym").await.expect("exists");
        assert_eq!(instance.status, InstanceStatus::Connected);
        assert_eq!(instance.phone.as_deref(), Some(SYNTHETIC_PHONE));
    }

    #[tokio::test(start_paused = true)]
    async fn encoding_failure_leaves_status_untouched() {
        let hub = test_hub();
        let oversized = "x".repeat(8_000);
        hub.create_instance(Some(&oversized)).await;

        let err = hub.begin_connect(&oversized).await.expect_err("too large");
        assert!(matches!(err, InstanceError::Encoding(_)));
        let instance = hub.get_instance(&oversized).await.expect("exists");
        assert_eq!(instance.status, InstanceStatus::Created);
        assert_eq!(hub.scheduler().pending(&oversized).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_before_completion_prevents_resurrection() {
        let hub = test_hub();
        hub.create_instance(Some("gym")).await;
        hub.begin_connect("gym").await.expect("connect");
        assert_eq!(hub.scheduler().pending("gym").await, 1);

        hub.delete_instance("gym").await;
        assert_eq!(hub.scheduler().pending("gym").await, 0);
        settle().await;

        assert!(hub.list_instances().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn recreate_during_connect_stays_created() {
        let hub = test_hub();
        hub.create_instance(Some("gym")).await;
        hub.begin_connect("gym").await.expect("connect");

        hub.create_instance(Some("gym")).await;
        assert_eq!(hub.scheduler().pending("gym").await, 0);
        settle().await;

        let instance = hub.get_instance("gym").await.expect("exists");
        assert_eq!(instance.status, InstanceStatus::Created);
        assert!(instance.phone.is_none());
        assert_eq!(hub.instance_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_while_encoding_is_not_found_and_schedules_nothing() {
        let hub = test_hub();
        hub.create_instance(Some("gym")).await;

        // The connect parks on the blocking QR encode, letting the delete run.
        let (connect, ()) = tokio::join!(hub.begin_connect("gym"), hub.delete_instance("gym"));
        assert_eq!(connect, Err(InstanceError::NotFound("gym".to_string())));
        assert_eq!(hub.scheduler().pending("gym").await, 0);
        assert_eq!(hub.instance_count().await, 0);

        settle().await;
        assert!(!hub.registry().contains("gym").await);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_unknown_instance_is_a_no_op() {
        let hub = test_hub();
        hub.delete_instance("ghost").await;
        assert_eq!(hub.instance_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_connect_settles_on_single_connected_record() {
        let hub = test_hub();
        hub.create_instance(Some("gym")).await;

        let (first, second) = tokio::join!(hub.begin_connect("gym"), hub.begin_connect("gym"));
        first.expect("first connect");
        second.expect("second connect");
        settle().await;

        let instances = hub.list_instances().await;
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].status, InstanceStatus::Connected);
        assert_eq!(instances[0].phone.as_deref(), Some(SYNTHETIC_PHONE));
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_after_connected_restarts_handshake() {
        let hub = test_hub();
        hub.create_instance(Some("gym")).await;
        hub.begin_connect("gym").await.expect("connect");
        settle().await;

        hub.begin_connect("gym").await.expect("reconnect");
        let instance = hub.get_instance("gym").await.expect("exists");
        assert_eq!(instance.status, InstanceStatus::Connecting);
        assert_eq!(instance.phone.as_deref(), Some(SYNTHETIC_PHONE));

        settle().await;
        assert!(hub.get_instance("gym").await.expect("exists").is_connected());
    }

    #[tokio::test]
    async fn send_does_not_require_connected_instance() {
        let hub = test_hub();
        let receipt = hub
            .send_text("never-created", &json!({"number": "555", "textMessage": {"text": "hi"}}))
            .expect("send");
        assert!(receipt.remote_jid.ends_with("@s.whatsapp.net"));
        assert!(hub
            .send_text("never-created", &json!({"number": "555", "textMessage": {}}))
            .is_err());
    }

    #[tokio::test]
    async fn webhooks_are_recorded_without_registry_lookup() {
        let hub = test_hub();
        hub.receive_webhook("ghost", json!({"event": "ping"})).await;
        assert_eq!(hub.webhooks_received(), 1);
        assert_eq!(hub.recent_webhooks(5).await[0].instance_id, "ghost");
        assert_eq!(hub.instance_count().await, 0);
    }
}
