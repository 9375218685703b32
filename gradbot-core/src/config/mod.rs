use crate::error::SyncError;
use reqwest::Url;
use serde::Deserialize;

/// Where the document chat backend lives and how each operation is routed.
#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    /// Base URL shared by every endpoint (e.g., http://localhost:8000).
    pub base_url: String,
    #[serde(default = "default_list_path")]
    pub list_path: String,
    #[serde(default = "default_upload_path")]
    pub upload_path: String,
    #[serde(default = "default_remove_path")]
    pub remove_path: String,
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    /// Per-request timeout. Chat turns wait on the language model, so keep it generous.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_list_path() -> String {
    "/documents/list".to_string()
}

fn default_upload_path() -> String {
    "/documents/insert".to_string()
}

fn default_remove_path() -> String {
    "/documents/remove".to_string()
}

fn default_chat_path() -> String {
    "/chat/interact".to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl BackendSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            list_path: default_list_path(),
            upload_path: default_upload_path(),
            remove_path: default_remove_path(),
            chat_path: default_chat_path(),
            health_path: default_health_path(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Resolve every configured path against the base URL.
    ///
    /// Paths are appended verbatim, so a base URL carrying a prefix
    /// (`http://host/api`) keeps it.
    pub fn endpoints(&self) -> Result<BackendEndpoints, SyncError> {
        let base = self.base_url.trim_end_matches('/');
        Url::parse(base).map_err(|e| SyncError::InvalidEndpoint(format!("{}: {}", base, e)))?;

        let resolve = |path: &str| -> Result<Url, SyncError> {
            let joined = if path.starts_with('/') {
                format!("{}{}", base, path)
            } else {
                format!("{}/{}", base, path)
            };
            Url::parse(&joined).map_err(|e| SyncError::InvalidEndpoint(format!("{}: {}", joined, e)))
        };

        Ok(BackendEndpoints {
            list: resolve(&self.list_path)?,
            upload: resolve(&self.upload_path)?,
            remove: resolve(&self.remove_path)?,
            chat: resolve(&self.chat_path)?,
            health: resolve(&self.health_path)?,
        })
    }
}

/// Fully resolved backend URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoints {
    pub list: Url,
    pub upload: Url,
    pub remove: Url,
    pub chat: Url,
    pub health: Url,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatSettings {
    /// Refuse to chat while no grounding document is loaded.
    #[serde(default = "default_require_documents")]
    pub require_documents: bool,
}

fn default_require_documents() -> bool {
    true
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            require_documents: default_require_documents(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetrySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP gRPC collector (e.g., http://tempo:4317). Spans are only exported when set.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_use_default_paths() {
        let endpoints = BackendSettings::new("http://localhost:8000")
            .endpoints()
            .unwrap();

        assert_eq!(endpoints.list.as_str(), "http://localhost:8000/documents/list");
        assert_eq!(endpoints.upload.as_str(), "http://localhost:8000/documents/insert");
        assert_eq!(endpoints.remove.as_str(), "http://localhost:8000/documents/remove");
        assert_eq!(endpoints.chat.as_str(), "http://localhost:8000/chat/interact");
        assert_eq!(endpoints.health.as_str(), "http://localhost:8000/health");
    }

    #[test]
    fn base_url_prefix_is_kept() {
        let mut settings = BackendSettings::new("http://backend:8000/api/");
        settings.chat_path = "chat/interact".to_string();

        let endpoints = settings.endpoints().unwrap();

        assert_eq!(endpoints.list.as_str(), "http://backend:8000/api/documents/list");
        assert_eq!(endpoints.chat.as_str(), "http://backend:8000/api/chat/interact");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = BackendSettings::new("not a url").endpoints();
        assert!(matches!(result, Err(SyncError::InvalidEndpoint(_))));
    }
}
