//! Client for the locally emulated backend functions.
//!
//! The backend under test runs inside the Firebase emulator suite; this
//! module probes it, optionally starts it, and drives the end-to-end
//! `dubVideo` function.

use reqwest::Client;
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::EmulatorConfig;
use crate::error::{DubError, Result};
use crate::locale::Locale;

/// Function entrypoints the backend exposes.
pub const FUNCTION_NAMES: &[&str] = &["dubVideo", "handleDubbing", "handleMention"];

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const STARTUP_PROBE_INTERVAL: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointHealth {
    Up,
    Down,
    Http(u16),
}

impl std::fmt::Display for EndpointHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointHealth::Up => write!(f, "up"),
            EndpointHealth::Down => write!(f, "down"),
            EndpointHealth::Http(code) => write!(f, "http {code}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EndpointStatus {
    pub name: &'static str,
    pub url: String,
    pub health: EndpointHealth,
}

pub struct EmulatorClient {
    client: Client,
    config: EmulatorConfig,
    firebase_path: String,
}

impl EmulatorClient {
    pub fn new(config: EmulatorConfig, firebase_path: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("dubkit/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            config,
            firebase_path,
        })
    }

    pub fn ui_url(&self) -> &str {
        &self.config.ui_url
    }

    pub fn function_url(&self, name: &str) -> String {
        format!("{}/{}", self.config.base_url, name)
    }

    pub async fn ui_reachable(&self) -> bool {
        match self
            .client
            .get(&self.config.ui_url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Probe every function entrypoint.
    pub async fn probe_functions(&self) -> Vec<EndpointStatus> {
        let mut statuses = Vec::with_capacity(FUNCTION_NAMES.len());
        for &name in FUNCTION_NAMES {
            let url = self.function_url(name);
            let health = match self.client.get(&url).timeout(PROBE_TIMEOUT).send().await {
                Ok(response) => classify_probe(response.status().as_u16()),
                Err(_) => EndpointHealth::Down,
            };
            statuses.push(EndpointStatus { name, url, health });
        }
        statuses
    }

    /// Spawn the emulator detached and wait for the UI to come up.
    pub async fn start_and_wait(&self) -> Result<()> {
        info!("Starting emulator via {}", self.firebase_path);

        Command::new(&self.firebase_path)
            .arg("emulators:start")
            .arg("--only")
            .arg("functions")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| DubError::Emulator(format!("Failed to start emulator: {}", e)))?;

        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(self.config.startup_wait_secs);
        while tokio::time::Instant::now() < deadline {
            if self.ui_reachable().await {
                info!("Emulator UI is ready at {}", self.config.ui_url);
                return Ok(());
            }
            tokio::time::sleep(STARTUP_PROBE_INTERVAL).await;
        }

        warn!("Emulator did not come up at {}", self.config.ui_url);
        Err(DubError::Emulator(format!(
            "Emulator did not become ready within {}s",
            self.config.startup_wait_secs
        )))
    }

    /// Run the complete backend dubbing flow through the emulated
    /// `dubVideo` function. The backend downloads, dubs, and re-uploads
    /// inside this single call, so the timeout is generous.
    pub async fn dub_video(&self, tweet_url: &str, locale: &Locale) -> Result<String> {
        let url = self.function_url("dubVideo");
        info!("Calling {} for {}", url, locale.service_code);

        let response = self
            .client
            .get(&url)
            .query(&[("tweetUrl", tweet_url), ("targetLanguage", locale.service_code)])
            .timeout(Duration::from_secs(self.config.request_timeout_secs))
            .send()
            .await
            .map_err(|e| DubError::Emulator(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DubError::Emulator(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(DubError::Emulator(format!(
                "Backend returned {status}: {body}"
            )));
        }

        parse_dub_response(&body)
    }
}

// 400/404 still indicate the emulator is serving the function entrypoint.
fn classify_probe(status: u16) -> EndpointHealth {
    match status {
        200 | 400 | 404 => EndpointHealth::Up,
        other => EndpointHealth::Http(other),
    }
}

fn parse_dub_response(body: &str) -> Result<String> {
    let value: Value = serde_json::from_str(body)
        .map_err(|_| DubError::Emulator(format!("Backend returned non-JSON response: {body}")))?;

    value
        .get("dubbedVideoUrl")
        .or_else(|| value.get("url"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| DubError::Emulator(format!("No dubbed video URL in response: {body}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn served_entrypoints_count_as_up() {
        assert_eq!(classify_probe(200), EndpointHealth::Up);
        assert_eq!(classify_probe(400), EndpointHealth::Up);
        assert_eq!(classify_probe(404), EndpointHealth::Up);
        assert_eq!(classify_probe(500), EndpointHealth::Http(500));
    }

    #[test]
    fn dub_response_accepts_both_url_fields() {
        assert_eq!(
            parse_dub_response(r#"{"dubbedVideoUrl":"https://cdn.example/a.mp4"}"#).unwrap(),
            "https://cdn.example/a.mp4"
        );
        assert_eq!(
            parse_dub_response(r#"{"url":"https://cdn.example/b.mp4"}"#).unwrap(),
            "https://cdn.example/b.mp4"
        );
    }

    #[test]
    fn dub_response_without_url_is_an_error() {
        assert!(parse_dub_response(r#"{"message":"processing"}"#).is_err());
        assert!(parse_dub_response("<html>oops</html>").is_err());
    }
}
