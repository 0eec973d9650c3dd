use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Transcription backend endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// HTTP(S) base URL of the backend, e.g. "http://localhost:8000"
    pub base_url: String,
}

impl BackendConfig {
    /// Websocket URL for live streaming. The session id is optional and
    /// only used by the backend for keyword biasing.
    pub fn listen_url(&self, session_id: Option<&str>) -> String {
        let base = self.base_url.trim_end_matches('/').replacen("http", "ws", 1);
        match session_id {
            Some(id) => format!("{}/listen?session_id={}", base, id),
            None => format!("{}/listen", base),
        }
    }

    /// Request/response endpoint for whole-file transcription.
    pub fn upload_url(&self) -> String {
        format!("{}/upload-audio", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Requested capture sample rate in Hz
    pub sample_rate: u32,
    /// Input device name, or "default"
    pub device: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
