use std::sync::Arc;

use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use serde_json::Value;
use uuid::Uuid;

use crate::actuator::ActuatorClient;
use crate::classifier::Classifier;
use crate::error::ApiError;
use crate::models::{ClassificationResponse, ServoAck};
use crate::storage::ImageStore;

/// Everything a request needs, built once in `main`.
pub struct AppState {
    pub classifier: Arc<dyn Classifier>,
    pub store: Arc<ImageStore>,
    pub actuator: ActuatorClient,
    /// Largest body either route will buffer.
    pub max_body_bytes: usize,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/upload").route(web::post().to(upload)))
        .service(web::resource("/servo").route(web::post().to(servo)));
}

/// Buffers the request body, rejecting it as soon as it grows past `limit`.
async fn read_body(mut payload: web::Payload, limit: usize) -> Result<web::Bytes, ApiError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk?;
        if body.len() + chunk.len() > limit {
            tracing::warn!(limit, "request body too large");
            return Err(ApiError::PayloadTooLarge);
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

#[tracing::instrument(skip_all, fields(upload_id = %Uuid::new_v4(), bytes = tracing::field::Empty))]
pub async fn upload(
    state: web::Data<AppState>,
    payload: web::Payload,
) -> Result<HttpResponse, ApiError> {
    let body = read_body(payload, state.max_body_bytes).await?;
    tracing::Span::current().record("bytes", body.len());
    if body.is_empty() {
        tracing::warn!("upload without an image");
        return Err(ApiError::EmptyUpload);
    }

    let store = state.store.clone();
    let image = web::block(move || store.replace_and_decode(&body))
        .await?
        .map_err(|e| {
            tracing::error!(error = ?e, "stored image unusable");
            ApiError::from(e)
        })?;

    let classifier = state.classifier.clone();
    let prediction = web::block(move || classifier.classify(&image))
        .await?
        .map_err(|e| {
            tracing::error!(error = %e, "model inference failed");
            ApiError::from(e)
        })?;
    tracing::info!(
        label = %prediction.label,
        confidence = format_args!("{:.2}", prediction.confidence),
        "predicted"
    );

    state.actuator.notify(prediction.label).await;

    Ok(HttpResponse::Ok().json(ClassificationResponse {
        class: prediction.label,
        confidence: prediction.confidence,
    }))
}

pub async fn servo(
    state: web::Data<AppState>,
    payload: web::Payload,
) -> Result<HttpResponse, ApiError> {
    let body = read_body(payload, state.max_body_bytes).await?;
    if body.is_empty() {
        return Err(ApiError::InvalidServoRequest);
    }

    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!(error = %e, "error processing servo request");
        ApiError::from(e)
    })?;
    let waste_type = payload
        .get("waste_type")
        .cloned()
        .ok_or(ApiError::InvalidServoRequest)?;

    tracing::info!(%waste_type, "received request to move servo");

    Ok(HttpResponse::Ok().json(ServoAck {
        status: "success",
        waste_type,
    }))
}
