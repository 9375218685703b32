use crate::models::{ChatSession, MessageView};
use crate::AppState;
use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use gradbot_core::models::{accept_attribute, Document, Notice};
use gradbot_core::BusyFlags;
use serde::Deserialize;
use serde_json::json;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub show_chat: bool,
    pub documents: Vec<Document>,
    pub messages: Vec<MessageView>,
    pub notices: Vec<Notice>,
    pub busy: BusyFlags,
    /// Chat is blocked until a document is loaded.
    pub chat_locked: bool,
    pub accept: String,
}

#[derive(Deserialize, Default)]
pub struct PageParams {
    /// `documents` (default) or `chat`; anything else falls back to documents.
    pub tab: Option<String>,
}

pub async fn index(session: ChatSession, Query(params): Query<PageParams>) -> impl IntoResponse {
    let snapshot = session.sync.snapshot().await;
    let notices = session.sync.take_notices().await;
    let chat_locked = session.sync.options().require_documents && snapshot.documents.is_empty();

    IndexTemplate {
        show_chat: params.tab.as_deref() == Some("chat"),
        messages: MessageView::from_snapshot(&snapshot),
        documents: snapshot.documents,
        notices,
        busy: snapshot.busy,
        chat_locked,
        accept: accept_attribute(),
    }
}

pub async fn health_check() -> &'static str {
    "OK"
}

/// Ready when the chat backend answers its own health probe.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.sessions.transport().health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": "gradbot-frontend",
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Chat backend is not ready");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "gradbot-frontend",
                    "error": e.to_string()
                })),
            )
        }
    }
}
