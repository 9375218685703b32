use crate::models::ChatSession;
use crate::services::detached::run_detached;
use crate::services::metrics::record_operation;
use axum::{
    response::{IntoResponse, Redirect},
    Form,
};
use gradbot_core::{AppError, SendOutcome};
use serde::Deserialize;

const CHAT_PAGE: &str = "/?tab=chat";

#[derive(Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    pub message: String,
}

/// Failures are shown as notices on the chat page; the user's message stays
/// in the transcript without a reply. Leaving the page does not abort the
/// turn: the answer shows up on the next load.
pub async fn send_handler(
    session: ChatSession,
    Form(form): Form<ChatForm>,
) -> Result<impl IntoResponse, AppError> {
    let sync = session.sync;
    let result = run_detached(async move { sync.send_message(&form.message).await }).await?;
    if !matches!(result, Ok(SendOutcome::Ignored)) {
        record_operation("chat", &result);
    }
    Ok(Redirect::to(CHAT_PAGE))
}
