//! Flat-file storage layout.
//!
//! The harness keeps no state between invocations beyond two directories:
//! `downloads/` for fetched tweet videos and `dubbed/` for retrieved
//! artifacts, both holding timestamped files.

use chrono::Utc;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::StorageConfig;
use crate::error::Result;
use crate::locale::Locale;

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm"];

pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.config.downloads_dir
    }

    pub fn dubbed_dir(&self) -> &Path {
        &self.config.dubbed_dir
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config.downloads_dir)?;
        std::fs::create_dir_all(&self.config.dubbed_dir)?;
        Ok(())
    }

    /// Most recently modified video file in the downloads directory.
    pub fn latest_download(&self) -> Option<PathBuf> {
        latest_video_in(&self.config.downloads_dir)
    }

    /// Up to `limit` most recently modified files in the downloads
    /// directory, newest first. Used for "did you mean" hints.
    pub fn recent_downloads(&self, limit: usize) -> Vec<PathBuf> {
        let mut entries: Vec<(std::time::SystemTime, PathBuf)> = WalkDir::new(&self.config.downloads_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let modified = e.metadata().ok()?.modified().ok()?;
                Some((modified, e.into_path()))
            })
            .collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        entries.into_iter().take(limit).map(|(_, p)| p).collect()
    }

    /// Fresh timestamped destination for a video download.
    pub fn new_download_path(&self) -> PathBuf {
        self.config
            .downloads_dir
            .join(download_file_name(Utc::now().timestamp()))
    }

    /// Fresh timestamped destination for a dubbed artifact.
    pub fn new_dubbed_path(&self, locale: &Locale) -> PathBuf {
        self.config
            .dubbed_dir
            .join(dubbed_file_name(Utc::now().timestamp(), locale))
    }

    pub fn item_count(dir: &Path) -> usize {
        WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count()
    }
}

pub fn download_file_name(timestamp: i64) -> String {
    format!("video_{timestamp}.mp4")
}

pub fn dubbed_file_name(timestamp: i64, locale: &Locale) -> String {
    format!("dubbed_{timestamp}_{}.mp4", locale.short)
}

fn latest_video_in(dir: &Path) -> Option<PathBuf> {
    WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        })
        .filter_map(|e| {
            let modified = e.metadata().ok()?.modified().ok()?;
            Some((modified, e.into_path()))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    fn touch(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
        path
    }

    #[test]
    fn artifact_names_are_deterministic() {
        let fr = Locale::resolve("fr").unwrap();
        assert_eq!(download_file_name(1700000000), "video_1700000000.mp4");
        assert_eq!(dubbed_file_name(1700000000, fr), "dubbed_1700000000_fr.mp4");
    }

    #[test]
    fn latest_download_picks_newest_video() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "old.mp4", 300);
        let newest = touch(dir.path(), "new.webm", 10);
        touch(dir.path(), "middle.mov", 100);

        assert_eq!(latest_video_in(dir.path()), Some(newest));
    }

    #[test]
    fn non_video_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "notes.txt", 5);
        let video = touch(dir.path(), "clip.mp4", 60);

        assert_eq!(latest_video_in(dir.path()), Some(video));
    }

    #[test]
    fn empty_or_missing_dir_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(latest_video_in(dir.path()), None);
        assert_eq!(latest_video_in(&dir.path().join("nope")), None);
    }
}
