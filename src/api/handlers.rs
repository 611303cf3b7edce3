use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app::App;
use crate::error::{AppError, Result};
use crate::models::{Alert, CallbackPayload};
use crate::services::{AlertQuery, CallbackOutcome, RegistrationRequest};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertResponse {
    pub trigger_id: String,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteParams {
    pub trigger_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email_address: Option<String>,
}

/// Malformed or mistyped JSON bodies are client errors.
fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value).map_err(|rejection| {
        AppError::validation(format!("Invalid request body: {}", rejection.body_text()))
    })
}

#[tracing::instrument(skip_all)]
pub async fn create_alert(
    State(app): State<Arc<App>>,
    body: std::result::Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<Json<CreateAlertResponse>> {
    let request = json_body(body)?;
    let trigger_id = app.registration.register(&request).await?;
    Ok(Json(CreateAlertResponse { trigger_id }))
}

#[tracing::instrument(skip_all, fields(trigger_id = ?params.trigger_id))]
pub async fn delete_alert(
    State(app): State<Arc<App>>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode> {
    app.access.delete_alert(params.trigger_id.as_deref()).await?;
    Ok(StatusCode::OK)
}

#[tracing::instrument(skip_all)]
pub async fn list_alerts(
    State(app): State<Arc<App>>,
    Query(query): Query<AlertQuery>,
) -> Result<Json<AlertsResponse>> {
    let alerts = app.access.list_alerts(&query).await?;
    Ok(Json(AlertsResponse { alerts }))
}

#[tracing::instrument(skip_all)]
pub async fn callback(
    State(app): State<Arc<App>>,
    body: std::result::Result<Json<CallbackPayload>, JsonRejection>,
) -> Result<StatusCode> {
    let payload = json_body(body)?;
    match app.callbacks.ingest(payload).await? {
        CallbackOutcome::Sent { sections } => {
            tracing::debug!("Digest covered {} objects", sections)
        }
        CallbackOutcome::Empty | CallbackOutcome::SendFailed => {}
    }
    Ok(StatusCode::OK)
}

#[tracing::instrument(skip_all)]
pub async fn login(
    State(app): State<Arc<App>>,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<StatusCode> {
    let request = json_body(body)?;
    app.access
        .issue_login_link(request.email_address.as_deref())
        .await?;
    Ok(StatusCode::OK)
}
