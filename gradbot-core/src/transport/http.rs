use super::{Operation, Transport};
use crate::config::{BackendEndpoints, BackendSettings};
use crate::error::SyncError;
use crate::models::{ChatReply, ChatTurn, DocumentListing, UploadFile, UploadReceipt};
use crate::observability::TracedClientExt;
use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use std::time::Duration;

/// Field name the upload endpoint expects the file under.
const UPLOAD_FIELD: &str = "file";

/// Talks to the chat backend over plain HTTP/JSON.
pub struct HttpTransport {
    client: Client,
    endpoints: BackendEndpoints,
}

impl HttpTransport {
    pub fn new(settings: &BackendSettings) -> Result<Self, SyncError> {
        let endpoints = settings.endpoints()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| SyncError::Transport(format!("failed to build HTTP client: {}", e)))?;

        tracing::info!(
            base_url = %settings.base_url,
            timeout_secs = settings.timeout_secs,
            "Configured chat backend transport"
        );

        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &BackendEndpoints {
        &self.endpoints
    }

    /// Turn a non-success status into [`SyncError::Status`], keeping the body
    /// for the logs.
    async fn ensure_success(
        operation: Operation,
        response: Response,
    ) -> Result<Response, SyncError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(
            operation = operation.as_str(),
            status = status.as_u16(),
            body = %body,
            "Backend rejected request"
        );
        Err(SyncError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn transport_error(operation: Operation, err: reqwest::Error) -> SyncError {
        tracing::error!(operation = operation.as_str(), error = %err, "Backend request failed");
        SyncError::from(err)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn list_documents(&self) -> Result<DocumentListing, SyncError> {
        let response = self
            .client
            .traced_get(self.endpoints.list.as_str())
            .send()
            .await
            .map_err(|e| Self::transport_error(Operation::List, e))?;

        Self::ensure_success(Operation::List, response)
            .await?
            .json::<DocumentListing>()
            .await
            .map_err(SyncError::from)
    }

    async fn upload_document(&self, file: UploadFile) -> Result<UploadReceipt, SyncError> {
        let mut part = multipart::Part::bytes(file.bytes).file_name(file.file_name);
        if let Some(content_type) = file.content_type.as_deref() {
            part = part.mime_str(content_type).map_err(SyncError::from)?;
        }
        let form = multipart::Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .client
            .traced_post(self.endpoints.upload.as_str())
            .multipart(form)
            .send()
            .await
            .map_err(|e| Self::transport_error(Operation::Upload, e))?;

        let body = Self::ensure_success(Operation::Upload, response)
            .await?
            .bytes()
            .await
            .map_err(SyncError::from)?;

        if body.is_empty() {
            return Ok(UploadReceipt::default());
        }
        let value: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| SyncError::Decode(format!("upload response is not JSON: {}", e)))?;

        Ok(UploadReceipt::from_value(&value))
    }

    async fn remove_document(&self, name: &str) -> Result<(), SyncError> {
        let response = self
            .client
            .traced_post(self.endpoints.remove.as_str())
            .query(&[("filename", name)])
            .send()
            .await
            .map_err(|e| Self::transport_error(Operation::Remove, e))?;

        Self::ensure_success(Operation::Remove, response).await?;
        Ok(())
    }

    async fn interact(&self, turns: &[ChatTurn]) -> Result<ChatReply, SyncError> {
        let response = self
            .client
            .traced_post(self.endpoints.chat.as_str())
            .json(turns)
            .send()
            .await
            .map_err(|e| Self::transport_error(Operation::Interact, e))?;

        Self::ensure_success(Operation::Interact, response)
            .await?
            .json::<ChatReply>()
            .await
            .map_err(SyncError::from)
    }

    async fn health_check(&self) -> Result<(), SyncError> {
        let response = self
            .client
            .traced_get(self.endpoints.health.as_str())
            .send()
            .await
            .map_err(|e| Self::transport_error(Operation::Health, e))?;

        Self::ensure_success(Operation::Health, response).await?;
        Ok(())
    }
}
