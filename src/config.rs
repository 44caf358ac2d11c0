use std::time::Duration;

use serde::Deserialize;

use crate::error::WsError;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings for a client instance. Credential sourcing stays at
/// the edge of the process; the client itself only ever sees explicit
/// values.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ClientConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Read `KBASE_ENDPOINT` and optional `KBASE_TOKEN`, the variables the
    /// example scripts around this service conventionally use.
    pub fn from_env() -> Result<Self, WsError> {
        let url = std::env::var("KBASE_ENDPOINT")
            .map_err(|_| WsError::Config("KBASE_ENDPOINT is not set".to_string()))?;
        let token = std::env::var("KBASE_TOKEN").ok();
        Ok(Self {
            url,
            token,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::new("https://ci.kbase.us/services/ws");
        assert!(config.token.is_none());
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"url": "https://ci.kbase.us/services/ws"}"#).unwrap();
        assert_eq!(config.url, "https://ci.kbase.us/services/ws");
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn builder_sets_token() {
        let config = ClientConfig::new("https://ci.kbase.us/services/ws").with_token("abc");
        assert_eq!(config.token.as_deref(), Some("abc"));
    }
}
