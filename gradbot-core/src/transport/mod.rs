//! Backend transports.
//!
//! The synchronizer only sees the [`Transport`] trait, so it can run against
//! the real HTTP backend or the in-memory mock used by tests.

pub mod http;
pub mod mock;

pub use http::HttpTransport;
pub use mock::MockTransport;

use crate::error::SyncError;
use crate::models::{ChatReply, ChatTurn, DocumentListing, UploadFile, UploadReceipt};
use async_trait::async_trait;

/// Backend operations, used for metric labels and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Upload,
    Remove,
    Interact,
    Health,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Upload => "upload",
            Operation::Remove => "remove",
            Operation::Interact => "interact",
            Operation::Health => "health",
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Current document names, in backend order.
    async fn list_documents(&self) -> Result<DocumentListing, SyncError>;

    async fn upload_document(&self, file: UploadFile) -> Result<UploadReceipt, SyncError>;

    /// Remove by name. A name the backend does not know may surface as a
    /// 404 status or as plain success, depending on the backend.
    async fn remove_document(&self, name: &str) -> Result<(), SyncError>;

    /// Send the whole conversation so far and get the assistant's answer.
    async fn interact(&self, turns: &[ChatTurn]) -> Result<ChatReply, SyncError>;

    async fn health_check(&self) -> Result<(), SyncError>;
}
