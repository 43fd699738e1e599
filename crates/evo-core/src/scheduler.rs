use crate::model::SYNTHETIC_PHONE;
use crate::registry::InstanceRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// Delay between a connect request and the simulated confirmation.
pub const CONNECT_DELAY: Duration = Duration::from_millis(10_000);

/// Fires one deferred `Connected` transition per connect request.
///
/// Completions look the instance up again when they fire and only touch the
/// record generation they were scheduled for, so a deleted or recreated
/// instance is never moved to `Connected` by a stale completion. Pending
/// completions for an id can be aborted with [`LifecycleScheduler::cancel`].
pub struct LifecycleScheduler {
    registry: Arc<InstanceRegistry>,
    delay: Duration,
    pending: Mutex<HashMap<String, Vec<AbortHandle>>>,
}

impl LifecycleScheduler {
    pub fn new(registry: Arc<InstanceRegistry>, delay: Duration) -> Self {
        Self {
            registry,
            delay,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn schedule(&self, instance_id: &str, generation: u64) {
        let deadline = Instant::now() + self.delay;
        let registry = self.registry.clone();
        let target = instance_id.to_string();
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let connected = registry
                .mark_connected(&target, generation, SYNTHETIC_PHONE)
                .await;
            if connected {
                info!(event = "instance_connected", instance_id = %target);
            } else {
                debug!(
                    event = "completion_skipped",
                    instance_id = %target,
                    reason = "missing_or_replaced"
                );
            }
        });

        let mut pending = self.pending.lock().await;
        let handles = pending.entry(instance_id.to_string()).or_default();
        handles.retain(|handle| !handle.is_finished());
        handles.push(task.abort_handle());
        debug!(
            event = "completion_scheduled",
            instance_id = instance_id,
            delay_ms = u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX),
            pending = handles.len()
        );
    }

    /// Aborts every completion still pending for `instance_id`. Returns how
    /// many were still running.
    pub async fn cancel(&self, instance_id: &str) -> usize {
        let handles = self
            .pending
            .lock()
            .await
            .remove(instance_id)
            .unwrap_or_default();
        let mut aborted = 0;
        for handle in handles {
            if !handle.is_finished() {
                handle.abort();
                aborted += 1;
            }
        }
        if aborted > 0 {
            debug!(event = "completion_cancelled", instance_id = instance_id, count = aborted);
        }
        aborted
    }

    pub async fn pending(&self, instance_id: &str) -> usize {
        self.pending
            .lock()
            .await
            .get(instance_id)
            .map(|handles| handles.iter().filter(|h| !h.is_finished()).count())
            .unwrap_or(0)
    }
}
