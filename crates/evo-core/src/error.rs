use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InstanceError {
    #[error("instance not found: {0}")]
    NotFound(String),
    #[error("failed to generate QR code: {0}")]
    Encoding(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl InstanceError {
    /// Stable machine-readable code for logs and error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            InstanceError::NotFound(_) => "not_found",
            InstanceError::Encoding(_) => "encoding_error",
            InstanceError::MalformedPayload(_) => "malformed_payload",
        }
    }
}
