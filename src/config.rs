use std::path::PathBuf;

/// Runtime configuration, assembled once from the process environment.
///
/// Secrets are read here and handed to the clients explicitly; nothing
/// deeper in the crate touches `std::env`.
#[derive(Debug, Clone)]
pub struct Config {
    pub murf: MurfConfig,
    pub emulator: EmulatorConfig,
    pub tools: ToolsConfig,
    pub storage: StorageConfig,
    pub polling: PollingConfig,
}

#[derive(Debug, Clone)]
pub struct MurfConfig {
    /// API key for the dubbing service; direct dubbing is unavailable without it.
    pub api_key: Option<String>,
    /// Base URL of the dubbing jobs API.
    pub api_url: String,
    /// Timeout for the multipart job submission request.
    pub submit_timeout_secs: u64,
    /// Timeout for a single status poll request.
    pub poll_timeout_secs: u64,
    /// Timeout for the artifact download request.
    pub download_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct EmulatorConfig {
    /// Base URL of the locally emulated function endpoints.
    pub base_url: String,
    /// Emulator UI address, used as the readiness probe.
    pub ui_url: String,
    /// How long to wait for the emulator to become ready after spawning it.
    pub startup_wait_secs: u64,
    /// Timeout for the end-to-end dubVideo call; the backend does the whole
    /// download/dub/upload cycle inside this one request.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ToolsConfig {
    pub ytdlp_path: String,
    pub ffmpeg_path: String,
    pub firebase_path: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub downloads_dir: PathBuf,
    pub dubbed_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub max_attempts: u32,
    pub interval_secs: u64,
}

/// Environment variables surfaced (masked) in the configuration view.
/// The Twitter credentials belong to the backend, not the harness, but
/// showing their presence saves a round of debugging when a flow fails.
pub const SURFACED_ENV_VARS: &[&str] = &[
    "API_KEY",
    "API_KEY_SECRET",
    "ACCESS_TOKEN",
    "ACCESS_TOKEN_SECRET",
    "MURF_API_KEY",
    "OPENAI_API_KEY",
];

impl Default for Config {
    fn default() -> Self {
        Self {
            murf: MurfConfig {
                api_key: None,
                api_url: "https://api.murf.ai/v1/murfdub".to_string(),
                submit_timeout_secs: 60,
                poll_timeout_secs: 30,
                download_timeout_secs: 120,
            },
            emulator: EmulatorConfig {
                base_url: "http://127.0.0.1:5001/project-4261681351/us-central1".to_string(),
                ui_url: "http://127.0.0.1:4000".to_string(),
                startup_wait_secs: 45,
                request_timeout_secs: 600,
            },
            tools: ToolsConfig {
                ytdlp_path: "yt-dlp".to_string(),
                ffmpeg_path: "ffmpeg".to_string(),
                firebase_path: "firebase".to_string(),
            },
            storage: StorageConfig {
                downloads_dir: PathBuf::from("downloads"),
                dubbed_dir: PathBuf::from("dubbed"),
            },
            polling: PollingConfig {
                max_attempts: 120,
                interval_secs: 3,
            },
        }
    }
}

impl Config {
    /// Build the configuration from the environment, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.murf.api_key = non_empty_env("MURF_API_KEY");
        if let Some(url) = non_empty_env("MURF_API_URL") {
            config.murf.api_url = url;
        }
        if let Some(url) = non_empty_env("EMULATOR_BASE_URL") {
            config.emulator.base_url = url;
        }
        if let Some(url) = non_empty_env("EMULATOR_UI_URL") {
            config.emulator.ui_url = url;
        }

        config
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Presence report for the surfaced environment variables, values masked.
pub fn env_report() -> Vec<(&'static str, Option<String>)> {
    SURFACED_ENV_VARS
        .iter()
        .map(|name| (*name, non_empty_env(name).map(|v| mask_secret(&v))))
        .collect()
}

/// Mask a secret for display: first and last four characters for anything
/// long enough, a bare "set" otherwise.
pub fn mask_secret(value: &str) -> String {
    if value.len() > 8 {
        format!("{}...{}", &value[..4], &value[value.len() - 4..])
    } else {
        "set".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_secret_keeps_edges() {
        assert_eq!(mask_secret("abcdefghijkl"), "abcd...ijkl");
    }

    #[test]
    fn mask_secret_hides_short_values() {
        assert_eq!(mask_secret("short"), "set");
        assert_eq!(mask_secret("12345678"), "set");
    }

    #[test]
    fn defaults_point_at_local_emulator() {
        let config = Config::default();
        assert!(config.emulator.base_url.starts_with("http://127.0.0.1:5001"));
        assert_eq!(config.emulator.ui_url, "http://127.0.0.1:4000");
        assert_eq!(config.polling.max_attempts, 120);
    }
}
