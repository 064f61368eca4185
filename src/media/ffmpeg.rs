use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

use super::AudioExtractor;
use crate::error::{DubError, Result};

/// ffmpeg based transcoder.
pub struct FfmpegTranscoder {
    binary_path: String,
}

impl FfmpegTranscoder {
    pub fn new(binary_path: String) -> Self {
        Self { binary_path }
    }
}

#[async_trait]
impl AudioExtractor for FfmpegTranscoder {
    async fn extract_audio(&self, video: &Path, audio: &Path) -> Result<()> {
        info!(
            "Extracting audio from {} to {}",
            video.display(),
            audio.display()
        );

        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("-i")
            .arg(video)
            .arg("-vn")
            .arg("-acodec")
            .arg("libmp3lame")
            .arg("-q:a")
            .arg("2")
            .arg("-y")
            .arg(audio);

        debug!("Executing ffmpeg command: {:?}", cmd);

        let output = cmd
            .output()
            .await
            .map_err(|e| DubError::Tool(format!("Failed to execute ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DubError::Tool(format!("Audio extraction failed: {}", stderr)));
        }

        info!("Audio extraction completed");
        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        self.version().await.map(|_| ())
    }

    async fn version(&self) -> Result<String> {
        let output = Command::new(&self.binary_path)
            .arg("-version")
            .output()
            .await
            .map_err(|e| DubError::Tool(format!("ffmpeg not found: {}", e)))?;

        if !output.status.success() {
            return Err(DubError::Tool("ffmpeg version check failed".to_string()));
        }

        let version = String::from_utf8_lossy(&output.stdout);
        Ok(version.lines().next().unwrap_or("unknown").trim().to_string())
    }
}
