pub mod dispatch;
pub mod error;
pub mod handshake;
pub mod hub;
pub mod model;
pub mod registry;
pub mod scheduler;
pub mod webhook;

pub use dispatch::{MessageDispatcher, OutboundText, REMOTE_JID_SUFFIX};
pub use error::InstanceError;
pub use hub::{Hub, HubConfig};
pub use model::{
    HandshakeArtifact, Instance, InstanceStatus, Receipt, DEFAULT_INSTANCE_ID, SYNTHETIC_PHONE,
};
pub use registry::InstanceRegistry;
pub use scheduler::{LifecycleScheduler, CONNECT_DELAY};
pub use webhook::{WebhookAck, WebhookEvent, WebhookSink};
