//! Audience API client configuration

use serde::Deserialize;

use crate::error::{Result, SegmentError};

/// Settings for talking to the segmentation backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_url", alias = "apiUrl")]
    pub api_url: String,
    #[serde(default = "default_timeout_secs", alias = "timeoutSecs")]
    pub timeout_secs: u64,
    #[serde(default = "default_client_version", alias = "clientVersion")]
    pub client_version: String,
    #[serde(default = "default_count_path", alias = "countPath")]
    pub count_path: String,
    #[serde(default = "default_save_path", alias = "savePath")]
    pub save_path: String,
    /// Prefix of the per-owner listing, `{segments_path}/{created_by}`
    #[serde(default = "default_segments_path", alias = "segmentsPath")]
    pub segments_path: String,
}

fn default_api_url() -> String {
    "https://crm-backend-y93k.onrender.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_client_version() -> String {
    "1.0.0".to_string()
}

fn default_count_path() -> String {
    "/api/segmentation/count".to_string()
}

fn default_save_path() -> String {
    "/api/segments/save".to_string()
}

fn default_segments_path() -> String {
    "/api/segments".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            client_version: default_client_version(),
            count_path: default_count_path(),
            save_path: default_save_path(),
            segments_path: default_segments_path(),
        }
    }
}

impl ClientConfig {
    /// Parse a config from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ClientConfig = serde_json::from_str(json)
            .map_err(|e| SegmentError::Deserialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(SegmentError::Config(format!(
                "api_url must be an http(s) URL, got '{}'",
                self.api_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(SegmentError::Config("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Absolute URL for an endpoint path, with exactly one slash at the join
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
