use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Extensions offered by the upload picker. Advisory only: nothing is
/// validated after selection, the backend rejects what it cannot ingest.
pub const ACCEPTED_EXTENSIONS: [&str; 4] = [".pdf", ".doc", ".docx", ".txt"];

/// Value for the file input's `accept` attribute.
pub fn accept_attribute() -> String {
    ACCEPTED_EXTENSIONS.join(",")
}

/// A document tracked by the backend, keyed by its file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
}

impl Document {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Raw listing payload. Some backends wrap the names, some return them bare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentListing {
    Names(Vec<String>),
    Wrapped { local_documents: Vec<String> },
}

impl DocumentListing {
    /// Normalize either shape into documents, keeping the backend's order.
    ///
    /// Names are the deletion key, so a repeated name keeps only its first
    /// occurrence.
    pub fn into_documents(self) -> Vec<Document> {
        let names = match self {
            DocumentListing::Wrapped { local_documents } => local_documents,
            DocumentListing::Names(names) => names,
        };

        let mut seen = HashSet::with_capacity(names.len());
        let mut documents = Vec::with_capacity(names.len());
        for name in names {
            if seen.insert(name.clone()) {
                documents.push(Document { name });
            } else {
                tracing::warn!(document = %name, "Backend listed a document twice");
            }
        }
        documents
    }
}

/// A file picked by the user, buffered for a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Whatever the upload endpoint said back. The body is not validated beyond
/// being JSON; known fields are picked up when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub filename: Option<String>,
    pub message: Option<String>,
}

impl UploadReceipt {
    pub fn from_value(value: &serde_json::Value) -> Self {
        let field = |key: &str| value.get(key).and_then(|v| v.as_str()).map(str::to_string);
        Self {
            filename: field("filename"),
            message: field("message"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Removed,
    /// The backend no longer knew the name (another deletion won the race).
    AlreadyAbsent,
}
