use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier used when a caller creates an instance without naming it.
pub const DEFAULT_INSTANCE_ID: &str = "default";

/// Phone number assigned to every instance once its handshake completes.
pub const SYNTHETIC_PHONE: &str = "+1234567890";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Created,
    Connecting,
    Connected,
}

impl Default for InstanceStatus {
    fn default() -> Self {
        Self::Created
    }
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Created => "created",
            InstanceStatus::Connecting => "connecting",
            InstanceStatus::Connected => "connected",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceStatus {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "created" => Ok(InstanceStatus::Created),
            "connecting" => Ok(InstanceStatus::Connecting),
            "connected" => Ok(InstanceStatus::Connected),
            other => Err(format!("Unknown instance status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Instance {
    pub id: String,
    pub status: InstanceStatus,
    pub phone: Option<String>,
    /// Reserved; no transition reads or writes it yet.
    #[serde(default, rename = "webhook")]
    pub webhook_url: Option<String>,
}

impl Instance {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: InstanceStatus::Created,
            phone: None,
            webhook_url: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == InstanceStatus::Connected
    }
}

/// Scannable artifact handed back by a successful connect request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandshakeArtifact {
    /// `data:image/png;base64,...` rendering of the connect QR code.
    pub qr: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Receipt {
    pub id: String,
    #[serde(rename = "remoteJid")]
    pub remote_jid: String,
}
