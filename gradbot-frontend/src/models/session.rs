use crate::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use gradbot_core::{AppError, Synchronizer};
use std::sync::Arc;
use tower_sessions::Session;
use uuid::Uuid;

const SESSION_KEY: &str = "chat_session_id";

/// The browser session's synchronizer, created and mounted on first use.
pub struct ChatSession {
    pub id: Uuid,
    pub sync: Arc<Synchronizer>,
}

#[async_trait]
impl FromRequestParts<AppState> for ChatSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::InternalError(anyhow::anyhow!(msg)))?;

        let existing: Option<Uuid> = session.get(SESSION_KEY).await.map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Failed to read session: {}", e))
        })?;

        let id = match existing {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                session.insert(SESSION_KEY, id).await.map_err(|e| {
                    AppError::InternalError(anyhow::anyhow!("Failed to store session: {}", e))
                })?;
                id
            }
        };

        let sync = state.sessions.open(id);
        sync.mount().await;

        Ok(ChatSession { id, sync })
    }
}
