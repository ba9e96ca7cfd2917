//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use dash_session::{LifecycleOptions, ProvisioningMode};

use crate::error::CoreError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP origin of the backend
    pub server_url: String,
    pub mode: ProvisioningMode,
    /// Session to provision in HTTP mode
    pub session_name: String,
    /// Delay before reconnecting after a loss
    pub retry_delay_ms: u64,
    /// Keystroke bytes held while disconnected
    pub outbox_limit: usize,
    /// Connect to the first running container automatically
    pub auto_select_running: bool,
    pub pane_id: Option<String>,
}

impl Config {
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("dash"))
            .unwrap_or_else(|| PathBuf::from(".dash"))
    }

    pub fn config_path() -> PathBuf {
        Self::data_dir().join("config.json")
    }

    pub fn log_path() -> PathBuf {
        Self::data_dir().join("dash.log")
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;

        tracing::info!(path = %path.display(), "Loaded config");

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let base = self.base_url()?;
        if self.session_name.trim().is_empty() {
            return Err(CoreError::Config("session_name must not be empty".to_string()));
        }
        if self.outbox_limit == 0 {
            return Err(CoreError::Config("outbox_limit must be positive".to_string()));
        }
        ws_scheme(&base)?;
        Ok(())
    }

    /// The backend origin as a URL
    pub fn base_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.server_url)?)
    }

    /// WebSocket endpoint, optionally bound to a provisioned session.
    pub fn ws_url(&self, session_id: Option<&str>) -> Result<Url> {
        let mut url = self.base_url()?;
        let scheme = ws_scheme(&url)?;
        url.set_scheme(scheme)
            .map_err(|_| CoreError::Config(format!("Cannot use {} as a WebSocket URL", self.server_url)))?;
        url.set_path("/ws");
        url.set_query(None);
        url.set_fragment(None);

        if let Some(id) = session_id {
            url.query_pairs_mut().append_pair("session", id);
        }

        Ok(url)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn lifecycle_options(&self) -> LifecycleOptions {
        LifecycleOptions {
            mode: self.mode,
            session_name: self.session_name.trim().to_string(),
            retry_delay: self.retry_delay(),
            outbox_limit: self.outbox_limit,
            auto_select_running: self.auto_select_running,
            pane_id: self.pane_id.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            mode: ProvisioningMode::Multiplexed,
            session_name: "default".to_string(),
            retry_delay_ms: 3000,
            outbox_limit: 64 * 1024,
            auto_select_running: true,
            pane_id: Some("main".to_string()),
        }
    }
}

fn ws_scheme(url: &Url) -> Result<&'static str> {
    match url.scheme() {
        "http" | "ws" => Ok("ws"),
        "https" | "wss" => Ok("wss"),
        other => Err(CoreError::Config(format!("Unsupported server scheme: {}", other))),
    }
}

mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_server(url: &str) -> Config {
        Config {
            server_url: url.to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_ws_url_from_http() {
        let config = with_server("http://localhost:8080");
        assert_eq!(config.ws_url(None).unwrap().as_str(), "ws://localhost:8080/ws");
    }

    #[test]
    fn test_ws_url_from_https_with_session() {
        let config = with_server("https://term.example.com/app?x=1");
        assert_eq!(
            config.ws_url(Some("work 1")).unwrap().as_str(),
            "wss://term.example.com/ws?session=work+1"
        );
    }

    #[test]
    fn test_unsupported_scheme() {
        let config = with_server("ftp://example.com");
        assert!(matches!(config.ws_url(None), Err(CoreError::Config(_))));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"mode":"http_sessions","retry_delay_ms":500}"#).unwrap();
        assert_eq!(config.mode, ProvisioningMode::HttpSessions);
        assert_eq!(config.retry_delay(), Duration::from_millis(500));
        assert_eq!(config.session_name, "default");
        assert_eq!(config.pane_id.as_deref(), Some("main"));
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join(format!("dash-missing-{}.json", std::process::id()));
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!("dash-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"server_url":"https://example.com","auto_select_running":false}"#)
            .unwrap();

        let config = Config::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.server_url, "https://example.com");
        assert!(!config.auto_select_running);
        assert_eq!(config.outbox_limit, 64 * 1024);
    }

    #[test]
    fn test_lifecycle_options() {
        let options = Config::default().lifecycle_options();
        assert_eq!(options.mode, ProvisioningMode::Multiplexed);
        assert_eq!(options.retry_delay, Duration::from_millis(3000));
        assert_eq!(options.pane_id.as_deref(), Some("main"));
    }
}
