use crate::manager;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::HOST, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use evo_core::{Hub, InstanceError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

pub const API_VERSION: &str = "2.3.0";

const MANAGER_WEBHOOK_PREVIEW: usize = 10;

#[derive(Debug, Default, Deserialize)]
struct CreateInstanceRequest {
    #[serde(default, rename = "instanceName")]
    instance_name: Option<String>,
}

pub struct ApiError(InstanceError);

impl From<InstanceError> for ApiError {
    fn from(err: InstanceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InstanceError::NotFound(_) => StatusCode::NOT_FOUND,
            InstanceError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
            InstanceError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
        };
        let body = json!({
            "error": self.0.to_string(),
            "code": self.0.code(),
        });
        (status, Json(body)).into_response()
    }
}

pub fn router(hub: Arc<Hub>) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/manager", get(manager_page))
        .route("/instance/create", post(create_instance))
        .route("/instance/connect/:id", post(connect_instance))
        .route("/instance/delete/:id", delete(delete_instance))
        .route("/instance/list", get(list_instances))
        .route("/webhook/:instance", post(receive_webhook))
        .route("/message/sendText/:instance", post(send_text))
        .route("/health", get(health))
        .with_state(hub)
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "message": "Evolution API is running",
        "version": API_VERSION,
        "endpoints": {
            "manager": "/manager",
            "instances": "/instance",
            "webhook": "/webhook",
        },
    }))
}

async fn manager_page(State(hub): State<Arc<Hub>>, headers: HeaderMap) -> Html<String> {
    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    let instances = hub.list_instances().await;
    let webhooks = hub.recent_webhooks(MANAGER_WEBHOOK_PREVIEW).await;
    Html(manager::render(host, &instances, &webhooks))
}

async fn create_instance(State(hub): State<Arc<Hub>>, body: Bytes) -> Json<Value> {
    let request = if body.is_empty() {
        CreateInstanceRequest::default()
    } else {
        serde_json::from_slice::<CreateInstanceRequest>(&body).unwrap_or_else(|err| {
            warn!(event = "create_body_invalid", error = %err);
            CreateInstanceRequest::default()
        })
    };
    let instance = hub.create_instance(request.instance_name.as_deref()).await;
    Json(json!({
        "status": "success",
        "instance": {
            "instanceName": instance.id,
            "status": instance.status,
        },
    }))
}

async fn connect_instance(
    State(hub): State<Arc<Hub>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let artifact = hub.begin_connect(&id).await?;
    Ok(Json(json!({
        "status": "success",
        "qr": artifact.qr,
        "message": artifact.message,
    })))
}

async fn delete_instance(State(hub): State<Arc<Hub>>, Path(id): Path<String>) -> Json<Value> {
    hub.delete_instance(&id).await;
    Json(json!({ "status": "deleted" }))
}

async fn list_instances(State(hub): State<Arc<Hub>>) -> Json<Value> {
    Json(json!({ "instances": hub.list_instances().await }))
}

async fn receive_webhook(
    State(hub): State<Arc<Hub>>,
    Path(instance): Path<String>,
    body: Bytes,
) -> Json<Value> {
    let payload = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    hub.receive_webhook(&instance, payload).await;
    Json(json!({ "status": "received" }))
}

async fn send_text(
    State(hub): State<Arc<Hub>>,
    Path(instance): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let body: Value = serde_json::from_slice(&body)
        .map_err(|err| InstanceError::MalformedPayload(err.to_string()))?;
    let receipt = hub.send_text(&instance, &body)?;
    Ok(Json(json!({ "status": "success", "key": receipt })))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
