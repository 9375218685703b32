//! Client state synchronizer.
//!
//! Owns one browser session's view of the backend: the document set, the
//! chat transcript and the busy flags. Every mutation goes through here.
//! The state lock is never held across a backend call, so readers always
//! see either the old or the new state, never a mix.

use crate::config::ChatSettings;
use crate::error::SyncError;
use crate::models::{DeleteOutcome, Document, Message, Notice, UploadFile, UploadReceipt};
use crate::transport::Transport;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Refuse `send_message` while the document set is empty.
    pub require_documents: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            require_documents: true,
        }
    }
}

impl From<&ChatSettings> for SyncOptions {
    fn from(settings: &ChatSettings) -> Self {
        Self {
            require_documents: settings.require_documents,
        }
    }
}

/// Advisory flags for the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusyFlags {
    /// A document listing is being fetched.
    pub documents_loading: bool,
    /// An upload or delete is in flight.
    pub document_operation_in_flight: bool,
    /// At least one chat turn is awaiting its answer.
    pub message_operation_in_flight: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendOutcome {
    /// Blank input; nothing was recorded or sent.
    Ignored,
    Answered { reply: Message },
}

/// Consistent copy of the session state for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub documents: Vec<Document>,
    pub messages: Vec<Message>,
    pub busy: BusyFlags,
    pub pending_exchanges: Vec<u64>,
    pub failed_exchanges: Vec<u64>,
}

impl SessionSnapshot {
    pub fn is_pending(&self, exchange: u64) -> bool {
        self.pending_exchanges.contains(&exchange)
    }

    pub fn is_failed(&self, exchange: u64) -> bool {
        self.failed_exchanges.contains(&exchange)
    }
}

#[derive(Debug, Default)]
struct SessionState {
    documents: Vec<Document>,
    messages: Vec<Message>,
    /// Generation of the listing currently shown.
    applied_generation: u64,
    next_exchange: u64,
    pending: BTreeSet<u64>,
    failed: BTreeSet<u64>,
    notices: Vec<Notice>,
}

impl SessionState {
    /// Close an exchange without a reply; its user message stays.
    fn fail_exchange(&mut self, exchange: u64, notice: Notice) {
        self.pending.remove(&exchange);
        self.failed.insert(exchange);
        self.notices.push(notice);
    }
}

/// Counts an operation as in flight until dropped, on every exit path.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// An exchange awaiting its reply. Dropping it unresolved, which happens
/// when the sending future is cancelled, marks the exchange as failed so it
/// never stays pending.
struct PendingExchange<'a> {
    state: &'a Arc<RwLock<SessionState>>,
    exchange: u64,
    resolved: bool,
    _busy: InFlight<'a>,
}

impl PendingExchange<'_> {
    fn resolve(mut self) {
        self.resolved = true;
    }
}

impl Drop for PendingExchange<'_> {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }

        let exchange = self.exchange;
        tracing::warn!(exchange, "Chat turn abandoned before the backend answered");
        let notice = || Notice::error("The assistant's answer was interrupted");

        match self.state.try_write() {
            Ok(mut state) => state.fail_exchange(exchange, notice()),
            Err(_) => {
                let state = Arc::clone(self.state);
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        state.write().await.fail_exchange(exchange, notice());
                    });
                }
            }
        }
    }
}

pub struct Synchronizer {
    transport: Arc<dyn Transport>,
    options: SyncOptions,
    state: Arc<RwLock<SessionState>>,
    mounted: OnceCell<()>,
    refresh_generation: AtomicU64,
    documents_loading: AtomicUsize,
    document_ops: AtomicUsize,
    message_ops: AtomicUsize,
}

impl Synchronizer {
    pub fn new(transport: Arc<dyn Transport>, options: SyncOptions) -> Self {
        Self {
            transport,
            options,
            state: Arc::new(RwLock::new(SessionState::default())),
            mounted: OnceCell::new(),
            refresh_generation: AtomicU64::new(0),
            documents_loading: AtomicUsize::new(0),
            document_ops: AtomicUsize::new(0),
            message_ops: AtomicUsize::new(0),
        }
    }

    pub fn options(&self) -> SyncOptions {
        self.options
    }

    /// Load the document set the first time the session is used.
    ///
    /// Concurrent callers wait for the same initial refresh. Once it has
    /// succeeded later calls do nothing; after a failure (already reported as
    /// a notice) the next call tries again.
    pub async fn mount(&self) {
        let result = self
            .mounted
            .get_or_try_init(|| async { self.refresh_documents().await.map(|_| ()) })
            .await;
        if let Err(e) = result {
            tracing::debug!(error = %e, "Initial document refresh failed");
        }
    }

    /// Replace the document set with the backend's listing.
    ///
    /// A listing that resolves after a more recently issued one has been
    /// applied is discarded, so the set always reflects the latest request.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_documents(&self) -> Result<Vec<Document>, SyncError> {
        let _loading = InFlight::enter(&self.documents_loading);
        let generation = self.refresh_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let listing = match self.transport.list_documents().await {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!(error = %e, generation, "Failed to load documents");
                self.notify(Notice::error(format!("Could not load documents: {}", e)))
                    .await;
                return Err(e);
            }
        };

        let documents = listing.into_documents();
        let mut state = self.state.write().await;
        if generation < state.applied_generation {
            tracing::debug!(
                generation,
                applied = state.applied_generation,
                "Discarding stale document listing"
            );
            return Ok(state.documents.clone());
        }

        tracing::info!(generation, count = documents.len(), "Documents refreshed");
        state.applied_generation = generation;
        state.documents = documents;
        Ok(state.documents.clone())
    }

    /// Upload a file, then pull the authoritative listing.
    ///
    /// The new entry is never added locally. A failing follow-up refresh is
    /// reported on its own and does not turn the upload into a failure.
    #[tracing::instrument(skip(self, file), fields(document = %file.file_name, size = file.bytes.len()))]
    pub async fn upload_document(&self, file: UploadFile) -> Result<UploadReceipt, SyncError> {
        let _busy = InFlight::enter(&self.document_ops);
        let file_name = file.file_name.clone();

        let receipt = match self.transport.upload_document(file).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(error = %e, "Upload failed");
                self.notify(Notice::error(format!("Could not upload {}: {}", file_name, e)))
                    .await;
                return Err(e);
            }
        };

        let detail = receipt
            .message
            .clone()
            .unwrap_or_else(|| "uploaded".to_string());
        self.notify(Notice::success(format!("{}: {}", file_name, detail)))
            .await;

        if let Err(e) = self.refresh_documents().await {
            tracing::debug!(error = %e, "Refresh after upload failed");
        }
        Ok(receipt)
    }

    /// Remove a document by name, then pull the authoritative listing.
    ///
    /// A 404 means someone else removed it first; that is reported as
    /// [`DeleteOutcome::AlreadyAbsent`] and the listing is still refreshed.
    #[tracing::instrument(skip(self))]
    pub async fn delete_document(&self, name: &str) -> Result<DeleteOutcome, SyncError> {
        let _busy = InFlight::enter(&self.document_ops);

        let outcome = match self.transport.remove_document(name).await {
            Ok(()) => {
                self.notify(Notice::success(format!("{} removed", name))).await;
                DeleteOutcome::Removed
            }
            Err(e) if e.is_not_found() => {
                tracing::info!("Document was already gone");
                self.notify(Notice::info(format!("{} was already removed", name)))
                    .await;
                DeleteOutcome::AlreadyAbsent
            }
            Err(e) => {
                tracing::warn!(error = %e, "Delete failed");
                self.notify(Notice::error(format!("Could not remove {}: {}", name, e)))
                    .await;
                return Err(e);
            }
        };

        if let Err(e) = self.refresh_documents().await {
            tracing::debug!(error = %e, "Refresh after delete failed");
        }
        Ok(outcome)
    }

    /// Record the user's message and ask the backend for a reply.
    ///
    /// Blank input is ignored. The user message is appended before the call
    /// and stays even when the call fails; the reply is appended when (and
    /// only if) this request's own response arrives. If the future is dropped
    /// before that, the exchange is recorded as failed.
    #[tracing::instrument(skip(self, text))]
    pub async fn send_message(&self, text: &str) -> Result<SendOutcome, SyncError> {
        let content = text.trim();
        if content.is_empty() {
            return Ok(SendOutcome::Ignored);
        }

        let (pending, turns) = {
            let mut state = self.state.write().await;
            if self.options.require_documents && state.documents.is_empty() {
                let err = SyncError::NoDocuments;
                state.notices.push(Notice::error(err.to_string()));
                return Err(err);
            }

            state.next_exchange += 1;
            let exchange = state.next_exchange;
            state.messages.push(Message::user(content, exchange));
            state.pending.insert(exchange);
            let turns: Vec<_> = state.messages.iter().map(Message::turn).collect();
            let pending = PendingExchange {
                state: &self.state,
                exchange,
                resolved: false,
                _busy: InFlight::enter(&self.message_ops),
            };
            (pending, turns)
        };

        let exchange = pending.exchange;
        tracing::debug!(exchange, turns = turns.len(), "Sending chat turn");

        match self.transport.interact(&turns).await {
            Ok(reply) => {
                let reply = Message::assistant(reply.message, exchange);
                let mut state = self.state.write().await;
                state.pending.remove(&exchange);
                state.messages.push(reply.clone());
                pending.resolve();
                tracing::info!(exchange, "Chat turn answered");
                Ok(SendOutcome::Answered { reply })
            }
            Err(e) => {
                tracing::warn!(exchange, error = %e, "Chat turn failed");
                let mut state = self.state.write().await;
                state.fail_exchange(
                    exchange,
                    Notice::error(format!("No answer from the assistant: {}", e)),
                );
                pending.resolve();
                Err(e)
            }
        }
    }

    pub fn busy(&self) -> BusyFlags {
        BusyFlags {
            documents_loading: self.documents_loading.load(Ordering::SeqCst) > 0,
            document_operation_in_flight: self.document_ops.load(Ordering::SeqCst) > 0,
            message_operation_in_flight: self.message_ops.load(Ordering::SeqCst) > 0,
        }
    }

    pub async fn documents(&self) -> Vec<Document> {
        self.state.read().await.documents.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.read().await.messages.clone()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        let busy = BusyFlags {
            message_operation_in_flight: !state.pending.is_empty(),
            ..self.busy()
        };
        SessionSnapshot {
            documents: state.documents.clone(),
            messages: state.messages.clone(),
            busy,
            pending_exchanges: state.pending.iter().copied().collect(),
            failed_exchanges: state.failed.iter().copied().collect(),
        }
    }

    /// Drain notices raised since the last call.
    pub async fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.state.write().await.notices)
    }

    async fn notify(&self, notice: Notice) {
        self.state.write().await.notices.push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::transport::mock::Call;
    use crate::transport::{MockTransport, Operation};
    use std::time::Duration;

    fn synchronizer(mock: MockTransport) -> (Arc<MockTransport>, Synchronizer) {
        let mock = Arc::new(mock);
        let sync = Synchronizer::new(mock.clone(), SyncOptions::default());
        (mock, sync)
    }

    fn names(documents: &[Document]) -> Vec<&str> {
        documents.iter().map(|d| d.name.as_str()).collect()
    }

    fn unreachable() -> SyncError {
        SyncError::Transport("connection refused".to_string())
    }

    #[tokio::test]
    async fn refresh_keeps_backend_order() {
        let (_, sync) = synchronizer(MockTransport::new().with_documents(&["a.pdf", "b.txt"]));

        sync.refresh_documents().await.unwrap();

        assert_eq!(names(&sync.documents().await), vec!["a.pdf", "b.txt"]);
    }

    #[tokio::test]
    async fn refresh_unwraps_local_documents() {
        let (_, sync) = synchronizer(MockTransport::new().with_documents(&["a.pdf"]).wrapped());

        sync.refresh_documents().await.unwrap();

        assert_eq!(names(&sync.documents().await), vec!["a.pdf"]);
    }

    #[tokio::test]
    async fn failed_refresh_leaves_documents_unchanged() {
        let (mock, sync) = synchronizer(MockTransport::new().with_documents(&["a.pdf"]));
        sync.refresh_documents().await.unwrap();

        mock.set_documents(&["b.txt"]).await;
        mock.fail_with(Operation::List, unreachable()).await;
        let result = sync.refresh_documents().await;

        assert!(result.is_err());
        assert_eq!(names(&sync.documents().await), vec!["a.pdf"]);
        assert!(!sync.busy().documents_loading);
        let notices = sync.take_notices().await;
        assert_eq!(notices.len(), 1);
        assert!(notices[0].is_error());
    }

    #[tokio::test]
    async fn stale_listing_does_not_overwrite_newer_one() {
        let (mock, sync) = synchronizer(MockTransport::new().with_documents(&["a.pdf"]));
        let sync = Arc::new(sync);

        mock.delay_next_list(Duration::from_millis(150)).await;
        let slow = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.refresh_documents().await })
        };
        // let the slow call take its snapshot first
        tokio::time::sleep(Duration::from_millis(30)).await;

        mock.set_documents(&["a.pdf", "b.txt"]).await;
        sync.refresh_documents().await.unwrap();
        assert_eq!(names(&sync.documents().await), vec!["a.pdf", "b.txt"]);

        let stale = slow.await.unwrap().unwrap();
        assert_eq!(names(&stale), vec!["a.pdf", "b.txt"]);
        assert_eq!(names(&sync.documents().await), vec!["a.pdf", "b.txt"]);
    }

    #[tokio::test]
    async fn upload_refreshes_from_backend() {
        let (mock, sync) = synchronizer(MockTransport::new().with_documents(&["a.pdf"]));

        let receipt = sync
            .upload_document(UploadFile::new("b.txt", b"notes".to_vec()))
            .await
            .unwrap();

        assert_eq!(receipt.filename.as_deref(), Some("b.txt"));
        assert_eq!(names(&sync.documents().await), vec!["a.pdf", "b.txt"]);
        assert_eq!(
            mock.calls().await,
            vec![Call::Upload("b.txt".to_string()), Call::List]
        );
        assert!(!sync.busy().document_operation_in_flight);
    }

    #[tokio::test]
    async fn failed_upload_does_not_touch_documents() {
        let (mock, sync) = synchronizer(MockTransport::new().with_documents(&["a.pdf"]));
        sync.refresh_documents().await.unwrap();
        mock.fail_with(
            Operation::Upload,
            SyncError::Status {
                status: 415,
                body: "unsupported".to_string(),
            },
        )
        .await;

        let result = sync
            .upload_document(UploadFile::new("movie.mp4", vec![0; 16]))
            .await;

        assert!(matches!(result, Err(SyncError::Status { status: 415, .. })));
        assert_eq!(names(&sync.documents().await), vec!["a.pdf"]);
        assert_eq!(mock.call_count(Operation::List).await, 1);
        assert!(!sync.busy().document_operation_in_flight);
        assert!(sync.take_notices().await.iter().any(Notice::is_error));
    }

    #[tokio::test]
    async fn delete_then_refresh_empties_set() {
        let (_, sync) = synchronizer(MockTransport::new().with_documents(&["a.pdf"]));
        sync.refresh_documents().await.unwrap();

        let outcome = sync.delete_document("a.pdf").await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Removed);
        assert!(sync.documents().await.is_empty());
    }

    #[tokio::test]
    async fn delete_of_missing_document_is_tolerated() {
        let (mock, sync) = synchronizer(MockTransport::new().with_documents(&["b.txt"]));
        mock.fail_with(
            Operation::Remove,
            SyncError::Status {
                status: 404,
                body: "file not found.".to_string(),
            },
        )
        .await;

        let outcome = sync.delete_document("a.pdf").await.unwrap();

        assert_eq!(outcome, DeleteOutcome::AlreadyAbsent);
        assert_eq!(names(&sync.documents().await), vec!["b.txt"]);
        assert!(!sync.take_notices().await.iter().any(Notice::is_error));
    }

    #[tokio::test]
    async fn failed_delete_keeps_documents() {
        let (mock, sync) = synchronizer(MockTransport::new().with_documents(&["a.pdf"]));
        sync.refresh_documents().await.unwrap();
        mock.fail_with(Operation::Remove, unreachable()).await;

        assert!(sync.delete_document("a.pdf").await.is_err());
        assert_eq!(names(&sync.documents().await), vec!["a.pdf"]);
        assert_eq!(mock.call_count(Operation::List).await, 1);
    }

    #[tokio::test]
    async fn blank_messages_are_ignored() {
        let (mock, sync) = synchronizer(MockTransport::new().with_documents(&["a.pdf"]));
        sync.refresh_documents().await.unwrap();

        assert_eq!(sync.send_message("").await.unwrap(), SendOutcome::Ignored);
        assert_eq!(sync.send_message("   ").await.unwrap(), SendOutcome::Ignored);

        assert!(sync.messages().await.is_empty());
        assert_eq!(mock.call_count(Operation::Interact).await, 0);
    }

    #[tokio::test]
    async fn answered_message_follows_user_message() {
        let (mock, sync) = synchronizer(MockTransport::new().with_documents(&["a.pdf"]));
        sync.refresh_documents().await.unwrap();
        mock.push_reply("hi").await;

        let outcome = sync.send_message("hello").await.unwrap();

        let messages = sync.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!((messages[0].role, messages[0].content.as_str()), (Role::User, "hello"));
        assert_eq!((messages[1].role, messages[1].content.as_str()), (Role::Assistant, "hi"));
        assert_eq!(messages[0].exchange, messages[1].exchange);
        assert!(matches!(outcome, SendOutcome::Answered { reply } if reply.content == "hi"));
        assert!(!sync.busy().message_operation_in_flight);
    }

    #[tokio::test]
    async fn whole_transcript_is_sent_as_context() {
        let (mock, sync) = synchronizer(MockTransport::new().with_documents(&["a.pdf"]));
        sync.refresh_documents().await.unwrap();

        sync.send_message("first").await.unwrap();
        sync.send_message("  second  ").await.unwrap();

        let calls = mock.calls().await;
        let Some(Call::Interact(turns)) = calls.last() else {
            panic!("expected a chat call, got {:?}", calls);
        };
        let sent: Vec<_> = turns
            .iter()
            .map(|t| (t.role, t.content.as_str()))
            .collect();
        assert_eq!(
            sent,
            vec![
                (Role::User, "first"),
                (Role::Assistant, "echo: first"),
                (Role::User, "second"),
            ]
        );
    }

    #[tokio::test]
    async fn failed_message_keeps_user_turn_without_reply() {
        let (mock, sync) = synchronizer(MockTransport::new().with_documents(&["a.pdf"]));
        sync.refresh_documents().await.unwrap();
        mock.fail_with(Operation::Interact, unreachable()).await;

        assert!(sync.send_message("hello").await.is_err());

        let snapshot = sync.snapshot().await;
        let last = snapshot.messages.last().unwrap();
        assert_eq!((last.role, last.content.as_str()), (Role::User, "hello"));
        assert!(snapshot.is_failed(last.exchange));
        assert!(!snapshot.is_pending(last.exchange));
        assert!(!snapshot.busy.message_operation_in_flight);
    }

    #[tokio::test]
    async fn chat_requires_a_document() {
        let (mock, sync) = synchronizer(MockTransport::new());
        sync.refresh_documents().await.unwrap();

        let result = sync.send_message("hello").await;

        assert!(matches!(result, Err(SyncError::NoDocuments)));
        assert!(sync.messages().await.is_empty());
        assert_eq!(mock.call_count(Operation::Interact).await, 0);
    }

    #[tokio::test]
    async fn chat_without_documents_when_guard_is_off() {
        let mock = Arc::new(MockTransport::new());
        let sync = Synchronizer::new(
            mock.clone(),
            SyncOptions {
                require_documents: false,
            },
        );

        sync.send_message("hello").await.unwrap();

        assert_eq!(sync.messages().await.len(), 2);
    }

    #[tokio::test]
    async fn racing_replies_are_attributed_to_their_own_request() {
        let (mock, sync) = synchronizer(MockTransport::new().with_documents(&["a.pdf"]));
        sync.refresh_documents().await.unwrap();
        mock.delay_next_reply(Duration::from_millis(150)).await;
        mock.delay_next_reply(Duration::from_millis(10)).await;

        let (slow, fast) = tokio::join!(sync.send_message("slow"), async {
            // make sure "slow" is sent first
            tokio::time::sleep(Duration::from_millis(20)).await;
            sync.send_message("fast").await
        });
        slow.unwrap();
        fast.unwrap();

        let messages = sync.messages().await;
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["slow", "fast", "echo: fast", "echo: slow"]);

        for reply in messages.iter().filter(|m| m.role == Role::Assistant) {
            let question = messages
                .iter()
                .find(|m| m.is_user() && m.exchange == reply.exchange)
                .unwrap();
            assert_eq!(reply.content, format!("echo: {}", question.content));
        }
    }

    #[tokio::test]
    async fn busy_flag_is_set_while_waiting() {
        let (mock, sync) = synchronizer(MockTransport::new().with_documents(&["a.pdf"]));
        sync.refresh_documents().await.unwrap();
        mock.delay_next_reply(Duration::from_millis(100)).await;

        let (result, observed) = tokio::join!(sync.send_message("hello"), async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            sync.snapshot().await
        });
        result.unwrap();

        assert!(observed.busy.message_operation_in_flight);
        assert_eq!(observed.pending_exchanges, vec![1]);
        assert!(!sync.busy().message_operation_in_flight);
    }

    #[tokio::test]
    async fn mount_refreshes_only_once() {
        let (mock, sync) = synchronizer(MockTransport::new().with_documents(&["a.pdf"]));

        sync.mount().await;
        sync.mount().await;

        assert_eq!(mock.call_count(Operation::List).await, 1);
        assert_eq!(names(&sync.documents().await), vec!["a.pdf"]);
    }

    #[tokio::test]
    async fn mount_retries_after_failed_first_load() {
        let (mock, sync) = synchronizer(MockTransport::new().with_documents(&["a.pdf"]));
        mock.fail_with(Operation::List, unreachable()).await;

        sync.mount().await;
        assert!(sync.documents().await.is_empty());

        mock.recover(Operation::List).await;
        sync.mount().await;
        sync.mount().await;

        assert_eq!(names(&sync.documents().await), vec!["a.pdf"]);
        assert_eq!(mock.call_count(Operation::List).await, 2);
    }

    #[tokio::test]
    async fn concurrent_mount_waits_for_first_load() {
        let (mock, sync) = synchronizer(MockTransport::new().with_documents(&["a.pdf"]));
        mock.delay_next_list(Duration::from_millis(100)).await;

        let (_, seen_by_second) = tokio::join!(sync.mount(), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            sync.mount().await;
            sync.documents().await
        });

        assert_eq!(names(&seen_by_second), vec!["a.pdf"]);
        assert_eq!(mock.call_count(Operation::List).await, 1);
    }

    #[tokio::test]
    async fn cancelled_send_is_recorded_as_failed() {
        let (mock, sync) = synchronizer(MockTransport::new().with_documents(&["a.pdf"]));
        let sync = Arc::new(sync);
        sync.refresh_documents().await.unwrap();
        mock.delay_next_reply(Duration::from_millis(100)).await;

        let task = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.send_message("hello").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        tokio::time::sleep(Duration::from_millis(20)).await;

        let snapshot = sync.snapshot().await;
        let contents: Vec<_> = snapshot.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hello"]);
        assert!(snapshot.pending_exchanges.is_empty());
        assert_eq!(snapshot.failed_exchanges, vec![1]);
        assert!(!snapshot.busy.message_operation_in_flight);
        assert!(!sync.busy().message_operation_in_flight);
        assert!(sync.take_notices().await.iter().any(Notice::is_error));
    }

    #[tokio::test]
    async fn pending_exchange_always_shows_as_busy() {
        let (mock, sync) = synchronizer(MockTransport::new().with_documents(&["a.pdf"]));
        sync.refresh_documents().await.unwrap();
        mock.delay_next_reply(Duration::from_millis(50)).await;

        let (result, observed) = tokio::join!(sync.send_message("hello"), async {
            let mut snapshots = Vec::new();
            for _ in 0..10 {
                snapshots.push(sync.snapshot().await);
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            snapshots
        });
        result.unwrap();

        assert!(observed.iter().any(|s| !s.pending_exchanges.is_empty()));
        for snapshot in observed {
            assert_eq!(
                snapshot.busy.message_operation_in_flight,
                !snapshot.pending_exchanges.is_empty()
            );
        }
    }
}
