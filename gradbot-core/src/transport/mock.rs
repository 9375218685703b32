//! In-memory backend for tests and local demos.

use super::{Operation, Transport};
use crate::error::SyncError;
use crate::models::{ChatReply, ChatTurn, DocumentListing, Role, UploadFile, UploadReceipt};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;

/// A call the mock received, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Upload(String),
    Remove(String),
    Interact(Vec<ChatTurn>),
    Health,
}

/// Behaves like the reference backend: uploads add a name, removals of
/// unknown names still succeed, and chat echoes the last user turn unless a
/// reply was queued.
#[derive(Default)]
pub struct MockTransport {
    documents: Mutex<Vec<String>>,
    wrap_listing: bool,
    failures: Mutex<HashMap<Operation, SyncError>>,
    replies: Mutex<VecDeque<String>>,
    list_delays: Mutex<VecDeque<Duration>>,
    reply_delays: Mutex<VecDeque<Duration>>,
    calls: Mutex<Vec<Call>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(mut self, names: &[&str]) -> Self {
        *self.documents.get_mut() = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Answer listings as `{ "local_documents": [...] }` instead of a bare array.
    pub fn wrapped(mut self) -> Self {
        self.wrap_listing = true;
        self
    }

    pub async fn set_documents(&self, names: &[&str]) {
        *self.documents.lock().await = names.iter().map(|n| n.to_string()).collect();
    }

    pub async fn documents(&self) -> Vec<String> {
        self.documents.lock().await.clone()
    }

    /// Make every call to `operation` fail with `error` until [`Self::recover`].
    pub async fn fail_with(&self, operation: Operation, error: SyncError) {
        self.failures.lock().await.insert(operation, error);
    }

    pub async fn recover(&self, operation: Operation) {
        self.failures.lock().await.remove(&operation);
    }

    pub async fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().await.push_back(reply.into());
    }

    /// Delay the answer to the next listing. The listing itself is taken
    /// when the call arrives, before the delay.
    pub async fn delay_next_list(&self, delay: Duration) {
        self.list_delays.lock().await.push_back(delay);
    }

    pub async fn delay_next_reply(&self, delay: Duration) {
        self.reply_delays.lock().await.push_back(delay);
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self, operation: Operation) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    async fn enter(&self, call: Call) -> Result<(), SyncError> {
        let operation = call.operation();
        self.calls.lock().await.push(call);
        match self.failures.lock().await.get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl Call {
    pub fn operation(&self) -> Operation {
        match self {
            Call::List => Operation::List,
            Call::Upload(_) => Operation::Upload,
            Call::Remove(_) => Operation::Remove,
            Call::Interact(_) => Operation::Interact,
            Call::Health => Operation::Health,
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn list_documents(&self) -> Result<DocumentListing, SyncError> {
        self.enter(Call::List).await?;

        let names = self.documents.lock().await.clone();
        let delay = self.list_delays.lock().await.pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(if self.wrap_listing {
            DocumentListing::Wrapped {
                local_documents: names,
            }
        } else {
            DocumentListing::Names(names)
        })
    }

    async fn upload_document(&self, file: UploadFile) -> Result<UploadReceipt, SyncError> {
        self.enter(Call::Upload(file.file_name.clone())).await?;

        let mut documents = self.documents.lock().await;
        let message = if documents.contains(&file.file_name) {
            "file already indexed."
        } else {
            documents.push(file.file_name.clone());
            "file indexed successfully"
        };

        Ok(UploadReceipt {
            filename: Some(file.file_name),
            message: Some(message.to_string()),
        })
    }

    async fn remove_document(&self, name: &str) -> Result<(), SyncError> {
        self.enter(Call::Remove(name.to_string())).await?;
        self.documents.lock().await.retain(|n| n != name);
        Ok(())
    }

    async fn interact(&self, turns: &[ChatTurn]) -> Result<ChatReply, SyncError> {
        self.enter(Call::Interact(turns.to_vec())).await?;

        let scripted = self.replies.lock().await.pop_front();
        let delay = self.reply_delays.lock().await.pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let message = scripted.unwrap_or_else(|| {
            let last_user = turns
                .iter()
                .rev()
                .find(|turn| turn.role == Role::User)
                .map(|turn| turn.content.as_str())
                .unwrap_or_default();
            format!("echo: {}", last_user)
        });

        Ok(ChatReply { message })
    }

    async fn health_check(&self) -> Result<(), SyncError> {
        self.enter(Call::Health).await
    }
}
