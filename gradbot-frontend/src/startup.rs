use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use gradbot_core::middleware::{request_id_middleware, RequestId};
use gradbot_core::SessionRegistry;
use std::sync::Arc;
use time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Settings;
use crate::handlers::{
    api::{chat_handler, refresh_handler, state_handler},
    app::{health_check, index, readiness_check},
    chat::send_handler,
    documents::{delete_handler, reload_handler, upload_handler},
};
use crate::middleware::http_metrics_middleware;
use crate::AppState;

pub fn build_router(state: AppState, settings: &Settings) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(settings.session.secure_cookie)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(
            settings.session.idle_minutes as i64,
        )));

    Router::new()
        .route("/", get(index))
        .route("/documents/upload", post(upload_handler))
        .route("/documents/delete", post(delete_handler))
        .route("/documents/reload", post(reload_handler))
        .route("/chat/send", post(send_handler))
        .route("/api/state", get(state_handler))
        .route("/api/documents/refresh", post(refresh_handler))
        .route("/api/chat", post(chat_handler))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(crate::handlers::metrics::metrics))
        .route_layer(from_fn(http_metrics_middleware))
        .nest_service("/static", ServeDir::new(&settings.server.static_dir))
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .extensions()
                    .get::<RequestId>()
                    .map(|id| id.0.as_str())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Periodically drop transcripts of browser sessions that went idle.
pub fn spawn_session_reaper(sessions: Arc<SessionRegistry>, max_idle: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            ticker.tick().await;
            sessions.evict_idle(max_idle);
        }
    });
}
