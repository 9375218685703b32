use crate::models::ChatSession;
use crate::services::detached::run_detached;
use crate::services::metrics::record_operation;
use axum::{
    extract::Multipart,
    response::{IntoResponse, Redirect},
    Form,
};
use gradbot_core::models::UploadFile;
use gradbot_core::AppError;
use serde::Deserialize;

const DOCUMENTS_PAGE: &str = "/?tab=documents";

#[derive(Deserialize)]
pub struct DeleteForm {
    pub filename: String,
}

/// Pass the picked file to the backend, then show the reconciled list.
///
/// The page is re-rendered from scratch afterwards, which also clears the
/// file input so the same file can be picked again.
pub async fn upload_handler(
    session: ChatSession,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut picked = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Failed to read upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read {}: {}", file_name, e))
        })?;

        let mut file = UploadFile::new(file_name, bytes.to_vec());
        if let Some(content_type) = content_type {
            file = file.with_content_type(content_type);
        }
        picked = Some(file);
        break;
    }

    match picked {
        Some(file) => {
            let sync = session.sync.clone();
            let result = run_detached(async move { sync.upload_document(file).await }).await?;
            record_operation("upload", &result);
        }
        None => tracing::debug!(session = %session.id, "Upload submitted without a file"),
    }

    Ok(Redirect::to(DOCUMENTS_PAGE))
}

pub async fn delete_handler(
    session: ChatSession,
    Form(form): Form<DeleteForm>,
) -> Result<impl IntoResponse, AppError> {
    let sync = session.sync;
    let result = run_detached(async move { sync.delete_document(&form.filename).await }).await?;
    record_operation("delete", &result);
    Ok(Redirect::to(DOCUMENTS_PAGE))
}

pub async fn reload_handler(session: ChatSession) -> Result<impl IntoResponse, AppError> {
    let sync = session.sync;
    let result = run_detached(async move { sync.refresh_documents().await }).await?;
    record_operation("refresh", &result);
    Ok(Redirect::to(DOCUMENTS_PAGE))
}
