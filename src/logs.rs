//! Backend function log retrieval.
//!
//! Prefers `firebase functions:log`; not every firebase-tools version
//! supports it, so the fallback tails the newest `firebase-debug*.log`
//! and filters it down to recent, relevant lines.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use tokio::process::Command;
use tracing::debug;

use crate::error::{DubError, Result};

const TAIL_LINES: usize = 1000;
const DISPLAY_LINES: usize = 300;
const FALLBACK_DISPLAY_LINES: usize = 200;
const RECENT_WINDOW_MINUTES: i64 = 15;

/// Lines worth showing: our functions, job milestones, and error levels.
const KEYWORDS: &[&str] = &[
    "functions[",
    "us-central1-",
    "dubVideo",
    "handleDubbing",
    "handleMention",
    "Created Murf Job",
    "Dubbed video URL",
    "Downloading video",
    "Video downloaded successfully",
    "Murf",
    "ERROR",
    "INFO",
    "[error]",
    "[info]",
];

pub struct LogViewer {
    firebase_path: String,
    repo_root: PathBuf,
}

impl LogViewer {
    pub fn new(firebase_path: String, repo_root: PathBuf) -> Self {
        Self {
            firebase_path,
            repo_root,
        }
    }

    /// Fetch recent logs through the firebase CLI.
    pub async fn functions_log(&self) -> Result<String> {
        let output = Command::new(&self.firebase_path)
            .arg("functions:log")
            .arg("--limit")
            .arg("50")
            .output()
            .await
            .map_err(|e| DubError::Tool(format!("Failed to execute firebase: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DubError::Tool(format!("functions:log failed: {}", stderr)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Newest `firebase-debug*.log` under the repo root, if any.
    pub fn latest_debug_log(&self) -> Option<PathBuf> {
        let entries = std::fs::read_dir(&self.repo_root).ok()?;
        entries
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|n| n.starts_with("firebase-debug") && n.ends_with(".log"))
            })
            .filter_map(|e| {
                let modified = e.metadata().ok()?.modified().ok()?;
                Some((modified, e.path()))
            })
            .max_by_key(|(modified, _)| *modified)
            .map(|(_, path)| path)
    }

    /// Read and filter a debug log down to the interesting recent lines.
    pub fn filtered_debug_log(&self, path: &PathBuf) -> Result<Vec<String>> {
        let content = std::fs::read_to_string(path)?;
        debug!("Filtering {} ({} bytes)", path.display(), content.len());
        Ok(filter_log_lines(&content, Utc::now()))
    }
}

fn timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d+Z)\]").expect("valid regex")
    })
}

fn extract_timestamp(line: &str) -> Option<DateTime<Utc>> {
    let captured = timestamp_regex().captures(line)?;
    DateTime::parse_from_rfc3339(captured.get(1)?.as_str())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

// Untimestamped lines pass; they are usually continuations of recent ones.
fn is_recent(line: &str, now: DateTime<Utc>) -> bool {
    match extract_timestamp(line) {
        Some(ts) => now - ts <= Duration::minutes(RECENT_WINDOW_MINUTES),
        None => true,
    }
}

fn is_noise(line: &str) -> bool {
    line.contains("Error: write EPIPE") || line.starts_with("at ")
}

/// Tail, recency-filter, and keyword-filter a raw debug log. Falls back
/// to the plain recent tail when no line matches a keyword.
pub fn filter_log_lines(content: &str, now: DateTime<Utc>) -> Vec<String> {
    let lines: Vec<&str> = content.lines().collect();
    let tail_start = lines.len().saturating_sub(TAIL_LINES);

    let recent: Vec<&str> = lines[tail_start..]
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !is_noise(l))
        .filter(|l| is_recent(l, now))
        .collect();

    let filtered: Vec<&str> = recent
        .iter()
        .copied()
        .filter(|l| KEYWORDS.iter().any(|k| l.contains(k)))
        .collect();

    let (source, limit) = if filtered.is_empty() {
        (recent, FALLBACK_DISPLAY_LINES)
    } else {
        (filtered, DISPLAY_LINES)
    };

    let start = source.len().saturating_sub(limit);
    source[start..].iter().map(|l| l.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn extracts_bracketed_iso_timestamps() {
        let ts = extract_timestamp("[2024-06-01T11:58:00.000Z] functions[dubVideo]: ok").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 6, 1, 11, 58, 0).unwrap());
        assert!(extract_timestamp("no timestamp here").is_none());
    }

    #[test]
    fn old_lines_are_dropped() {
        let content = "\
[2024-06-01T10:00:00.000Z] functions[dubVideo]: stale entry
[2024-06-01T11:58:00.000Z] functions[dubVideo]: fresh entry";
        let lines = filter_log_lines(content, now());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("fresh entry"));
    }

    #[test]
    fn noise_is_dropped_even_when_recent() {
        let content = "\
[2024-06-01T11:59:00.000Z] INFO Error: write EPIPE
at Object.<anonymous> (index.js:1:1)
[2024-06-01T11:59:01.000Z] INFO Created Murf Job abc";
        let lines = filter_log_lines(content, now());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Created Murf Job"));
    }

    #[test]
    fn keyword_filter_keeps_relevant_lines() {
        let content = "\
[2024-06-01T11:59:00.000Z] something unrelated
[2024-06-01T11:59:01.000Z] functions[dubVideo]: Downloading video";
        let lines = filter_log_lines(content, now());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Downloading video"));
    }

    #[test]
    fn falls_back_to_recent_tail_without_keyword_hits() {
        let content = "plain line one\nplain line two";
        let lines = filter_log_lines(content, now());
        assert_eq!(lines, vec!["plain line one", "plain line two"]);
    }
}
