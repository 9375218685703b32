use gradbot_core::config::{BackendSettings, ChatSettings, TelemetrySettings};
use serde::Deserialize;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    #[serde(default)]
    pub chat: ChatSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Directory served under /static.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

fn default_static_dir() -> String {
    "gradbot-frontend/static".to_string()
}

#[derive(Deserialize, Clone, Debug)]
pub struct SessionSettings {
    /// Minutes of inactivity before the cookie and the transcript are dropped.
    #[serde(default = "default_idle_minutes")]
    pub idle_minutes: u64,
    /// Set to true in production with HTTPS.
    #[serde(default)]
    pub secure_cookie: bool,
}

fn default_idle_minutes() -> u64 {
    24 * 60
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_minutes: default_idle_minutes(),
            secure_cookie: false,
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| {
        config::ConfigError::Message(format!("Failed to determine the current directory: {}", e))
    })?;

    // Works from the workspace root and from inside the crate directory
    let configuration_directory = if base_path.ends_with("gradbot-frontend") {
        base_path.join("config")
    } else {
        base_path.join("gradbot-frontend").join("config")
    };

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<Settings, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()?
            .try_deserialize()
    }

    #[test]
    fn minimal_file_fills_defaults() {
        let settings = parse(
            r#"
server:
  host: 127.0.0.1
  port: 3000
backend:
  base_url: http://localhost:8000
"#,
        )
        .unwrap();

        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.backend.chat_path, "/chat/interact");
        assert_eq!(settings.backend.timeout_secs, 120);
        assert!(settings.chat.require_documents);
        assert_eq!(settings.session.idle_minutes, 1440);
        assert_eq!(settings.telemetry.log_level, "info");
        assert!(settings.telemetry.otlp_endpoint.is_none());
    }

    #[test]
    fn overrides_are_respected() {
        let settings = parse(
            r#"
server:
  host: 0.0.0.0
  port: 8080
backend:
  base_url: http://backend:8000/api
  remove_path: /documents/delete
chat:
  require_documents: false
telemetry:
  otlp_endpoint: http://tempo:4317
"#,
        )
        .unwrap();

        assert_eq!(settings.backend.remove_path, "/documents/delete");
        assert!(!settings.chat.require_documents);
        assert_eq!(
            settings.telemetry.otlp_endpoint.as_deref(),
            Some("http://tempo:4317")
        );
    }

    #[test]
    fn backend_base_url_is_required() {
        let result = parse(
            r#"
server:
  host: 127.0.0.1
  port: 3000
backend:
  list_path: /documents/list
"#,
        );
        assert!(result.is_err());
    }
}
