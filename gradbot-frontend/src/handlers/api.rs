//! JSON view of the same session, for scripts polling busy flags.

use crate::models::ChatSession;
use crate::services::detached::run_detached;
use crate::services::metrics::record_operation;
use axum::{response::IntoResponse, Json};
use gradbot_core::models::{Document, Notice};
use gradbot_core::{AppError, SendOutcome, SessionSnapshot};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct StateResponse {
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
    pub notices: Vec<Notice>,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

pub async fn state_handler(session: ChatSession) -> impl IntoResponse {
    let snapshot = session.sync.snapshot().await;
    let notices = session.sync.take_notices().await;
    Json(StateResponse { snapshot, notices })
}

pub async fn refresh_handler(session: ChatSession) -> Result<Json<Vec<Document>>, AppError> {
    let sync = session.sync;
    let result = run_detached(async move { sync.refresh_documents().await }).await?;
    record_operation("refresh", &result);
    Ok(Json(result?))
}

pub async fn chat_handler(
    session: ChatSession,
    Json(request): Json<ChatRequest>,
) -> Result<Json<SendOutcome>, AppError> {
    let sync = session.sync;
    let result = run_detached(async move { sync.send_message(&request.message).await }).await?;
    if !matches!(result, Ok(SendOutcome::Ignored)) {
        record_operation("chat", &result);
    }
    Ok(Json(result?))
}
