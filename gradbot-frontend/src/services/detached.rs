use gradbot_core::middleware::{current_request_id, scope_request_id};
use gradbot_core::AppError;
use std::future::Future;
use tracing::Instrument;

/// Run a synchronizer operation on its own task and wait for it.
///
/// Hyper drops the handler future when the browser goes away. The spawned
/// task is not dropped with it, so the backend call still completes and the
/// session state is reconciled for the next page load. The request id and
/// the current span follow the task.
pub async fn run_detached<F>(operation: F) -> Result<F::Output, AppError>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let request_id = current_request_id();
    let task = scope_request_id(request_id, operation).instrument(tracing::Span::current());

    tokio::spawn(task).await.map_err(|e| {
        tracing::error!(error = %e, "Synchronizer task failed");
        AppError::InternalError(anyhow::anyhow!("Synchronizer task failed: {}", e))
    })
}
