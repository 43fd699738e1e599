use crate::error::InstanceError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use image::{ImageFormat, Luma};
use qrcode::QrCode;
use std::io::Cursor;

pub const CONNECT_INSTRUCTIONS: &str = "Scan QR code with WhatsApp";

const QR_MIN_DIMENSION: u32 = 200;

/// Token embedded in the QR code for one connect attempt.
pub fn connect_payload(instance_id: &str, at: DateTime<Utc>) -> String {
    format!(
        "whatsapp://connect/{instance_id}/{}",
        at.timestamp_millis()
    )
}

/// Renders `payload` as a PNG QR code and wraps it in a base64 data URL.
pub fn encode_qr_data_url(payload: &str) -> Result<String, InstanceError> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|err| InstanceError::Encoding(err.to_string()))?;
    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(QR_MIN_DIMENSION, QR_MIN_DIMENSION)
        .build();
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|err| InstanceError::Encoding(err.to_string()))?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&png)))
}

/// Runs [`encode_qr_data_url`] on the blocking pool.
pub async fn encode_qr_data_url_off_thread(payload: String) -> Result<String, InstanceError> {
    match tokio::task::spawn_blocking(move || encode_qr_data_url(&payload)).await {
        Ok(result) => result,
        Err(err) => Err(InstanceError::Encoding(err.to_string())),
    }
}
