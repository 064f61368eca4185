// External tool seams.
//
// The harness never processes media itself; it drives a video downloader
// and a media transcoder as opaque binaries. The narrow traits keep the
// rest of the crate (and the tests) independent of the executables
// actually being installed.

pub mod ffmpeg;
pub mod ytdlp;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use ffmpeg::FfmpegTranscoder;
pub use ytdlp::YtDlpFetcher;

use crate::config::ToolsConfig;
use crate::error::Result;

/// Fetches the video attached to a tweet URL into a local file.
#[async_trait]
pub trait VideoFetcher: Send + Sync {
    /// Download `url` to `dest`; returns the path of the written file.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<PathBuf>;

    /// Check that the downloader binary is runnable.
    async fn check_availability(&self) -> Result<()>;

    /// Version line of the underlying tool.
    async fn version(&self) -> Result<String>;
}

/// Transcodes a local video file into an audio file.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Extract the audio track of `video` into `audio` (mp3).
    async fn extract_audio(&self, video: &Path, audio: &Path) -> Result<()>;

    /// Check that the transcoder binary is runnable.
    async fn check_availability(&self) -> Result<()>;

    /// Version line of the underlying tool.
    async fn version(&self) -> Result<String>;
}

/// Factory for the default tool implementations.
pub struct MediaToolFactory;

impl MediaToolFactory {
    pub fn create_fetcher(config: &ToolsConfig) -> Box<dyn VideoFetcher> {
        Box::new(YtDlpFetcher::new(config.ytdlp_path.clone()))
    }

    pub fn create_extractor(config: &ToolsConfig) -> Box<dyn AudioExtractor> {
        Box::new(FfmpegTranscoder::new(config.ffmpeg_path.clone()))
    }
}
