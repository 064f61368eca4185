use thiserror::Error;

#[derive(Error, Debug)]
pub enum DubError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Job submission failed: {0}")]
    Submission(String),

    #[error("Status poll failed: {0}")]
    Poll(String),

    #[error("Dubbing job failed: {0}")]
    JobFailed(String),

    #[error("Dubbing job did not finish within {attempts} polling attempts")]
    JobTimeout { attempts: u32 },

    #[error("Download error: {0}")]
    Download(String),

    #[error("External tool error: {0}")]
    Tool(String),

    #[error("Emulator error: {0}")]
    Emulator(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
}

pub type Result<T> = std::result::Result<T, DubError>;
