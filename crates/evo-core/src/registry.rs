use crate::error::InstanceError;
use crate::model::{Instance, InstanceStatus, DEFAULT_INSTANCE_ID};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug)]
struct Slot {
    instance: Instance,
    /// Bumped every time `create` (re)inserts the id.
    generation: u64,
}

/// In-memory instance table. Each hub owns its own registry; nothing here is
/// process-global.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    next_generation: AtomicU64,
    instances: RwLock<HashMap<String, Slot>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fresh `Created` record, replacing any record with the same id.
    pub async fn create(&self, id: Option<&str>) -> Instance {
        let id = resolve_instance_id(id);
        let instance = Instance::new(id.clone());
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let replaced = self
            .instances
            .write()
            .await
            .insert(
                id.clone(),
                Slot {
                    instance: instance.clone(),
                    generation,
                },
            )
            .is_some();
        info!(event = "instance_created", instance_id = %id, replaced = replaced);
        instance
    }

    pub async fn get(&self, id: &str) -> Result<Instance, InstanceError> {
        self.instances
            .read()
            .await
            .get(id)
            .map(|slot| slot.instance.clone())
            .ok_or_else(|| InstanceError::NotFound(id.to_string()))
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.instances.read().await.contains_key(id)
    }

    /// Removes the record if present. Returns whether anything was removed.
    pub async fn delete(&self, id: &str) -> bool {
        let removed = self.instances.write().await.remove(id).is_some();
        info!(event = "instance_deleted", instance_id = id, existed = removed);
        removed
    }

    /// Snapshot of every record, sorted by id.
    pub async fn list(&self) -> Vec<Instance> {
        let instances = self.instances.read().await;
        let mut ids: Vec<_> = instances.keys().cloned().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| instances.get(&id).map(|slot| slot.instance.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.instances.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.instances.read().await.is_empty()
    }

    /// Restarts the handshake for `id` and returns the record together with
    /// its generation. The previous phone is kept until the next completion
    /// overwrites it.
    pub(crate) async fn mark_connecting(
        &self,
        id: &str,
    ) -> Result<(Instance, u64), InstanceError> {
        let mut instances = self.instances.write().await;
        let slot = instances
            .get_mut(id)
            .ok_or_else(|| InstanceError::NotFound(id.to_string()))?;
        slot.instance.status = InstanceStatus::Connecting;
        debug!(event = "instance_connecting", instance_id = id, generation = slot.generation);
        Ok((slot.instance.clone(), slot.generation))
    }

    /// Completes a handshake started against `generation`. A missing id or a
    /// record recreated since then is left alone; returns whether the record
    /// was updated.
    pub(crate) async fn mark_connected(&self, id: &str, generation: u64, phone: &str) -> bool {
        let mut instances = self.instances.write().await;
        match instances.get_mut(id) {
            Some(slot) if slot.generation == generation => {
                slot.instance.status = InstanceStatus::Connected;
                slot.instance.phone = Some(phone.to_string());
                true
            }
            _ => false,
        }
    }
}

fn resolve_instance_id(id: Option<&str>) -> String {
    match id.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => DEFAULT_INSTANCE_ID.to_string(),
    }
}
