use crate::error::InstanceError;
use crate::model::Receipt;
use chrono::Utc;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

pub const REMOTE_JID_SUFFIX: &str = "@s.whatsapp.net";

/// Validated form of a `sendText` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundText {
    pub number: String,
    pub text: String,
}

impl OutboundText {
    /// Pulls `number` and `textMessage.text` out of an arbitrary JSON body.
    pub fn from_value(body: &Value) -> Result<Self, InstanceError> {
        let number = match body.get("number") {
            Some(Value::String(value)) if !value.trim().is_empty() => value.trim().to_string(),
            Some(Value::Number(value)) => value.to_string(),
            Some(_) => {
                return Err(InstanceError::MalformedPayload(
                    "number must be a non-empty string".to_string(),
                ))
            }
            None => return Err(InstanceError::MalformedPayload("missing number".to_string())),
        };
        let text = body
            .get("textMessage")
            .and_then(|message| message.get("text"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                InstanceError::MalformedPayload("missing textMessage.text".to_string())
            })?;
        Ok(Self {
            number,
            text: text.to_string(),
        })
    }
}

/// Accepts outbound sends and hands back synthetic receipts. Nothing leaves
/// the process.
#[derive(Debug, Default)]
pub struct MessageDispatcher {
    seq: AtomicU64,
}

impl MessageDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send_text(&self, instance_id: &str, body: &Value) -> Result<Receipt, InstanceError> {
        let outbound = OutboundText::from_value(body)?;
        Ok(self.dispatch(instance_id, &outbound))
    }

    pub fn dispatch(&self, instance_id: &str, outbound: &OutboundText) -> Receipt {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let receipt = Receipt {
            id: format!("mock_message_id_{}_{seq}", Utc::now().timestamp_millis()),
            remote_jid: canonical_jid(&outbound.number),
        };
        info!(
            event = "message_sent",
            instance_id = instance_id,
            remote_jid = %receipt.remote_jid,
            message_id = %receipt.id,
            text_len = outbound.text.len()
        );
        receipt
    }
}

fn canonical_jid(number: &str) -> String {
    if number.ends_with(REMOTE_JID_SUFFIX) {
        number.to_string()
    } else {
        format!("{number}{REMOTE_JID_SUFFIX}")
    }
}
