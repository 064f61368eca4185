//! Streamed retrieval of a completed job's artifact.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::{DubError, Result};

/// A dubbed result file saved to local storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Stream `url` to `dest` in bounded chunks.
///
/// `on_progress` is called with (bytes so far, total if known) after every
/// chunk; with a `content-length` the caller can render an exact
/// percentage, without one the progress is indeterminate. The body is never
/// held in memory as a whole. A failed download aborts outright, leaving
/// only the `.part` temp file behind.
pub async fn download_artifact(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    timeout: Duration,
    on_progress: impl FnMut(u64, Option<u64>),
) -> Result<DownloadedArtifact> {
    info!("Downloading artifact to {}", dest.display());

    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| DubError::Download(e.to_string()))?;

    if !response.status().is_success() {
        return Err(DubError::Download(format!(
            "HTTP {} fetching artifact",
            response.status()
        )));
    }

    let total_bytes = response.content_length();
    write_stream_to_file(response.bytes_stream(), dest, total_bytes, on_progress).await
}

/// Write a chunked byte stream to `dest` through a temp file that is
/// renamed into place only once the stream completes.
pub async fn write_stream_to_file<S>(
    mut stream: S,
    dest: &Path,
    total_bytes: Option<u64>,
    mut on_progress: impl FnMut(u64, Option<u64>),
) -> Result<DownloadedArtifact>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin,
{
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let temp_path = dest.with_extension("part");
    let mut file = fs::File::create(&temp_path).await?;
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| DubError::Download(e.to_string()))?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        on_progress(downloaded, total_bytes);
    }

    file.flush().await?;
    drop(file);

    if let Some(total) = total_bytes {
        if downloaded != total {
            return Err(DubError::Download(format!(
                "truncated response: got {downloaded} of {total} bytes"
            )));
        }
    }

    fs::rename(&temp_path, dest).await?;
    info!("Saved {} bytes to {}", downloaded, dest.display());

    Ok(DownloadedArtifact {
        path: dest.to_path_buf(),
        size_bytes: downloaded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunk_stream(
        chunks: Vec<Vec<u8>>,
    ) -> impl Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin {
        stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<Bytes, reqwest::Error>(Bytes::from(c))),
        )
    }

    #[tokio::test]
    async fn known_length_writes_exact_size_and_reaches_full_progress() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dubbed.mp4");
        let chunks: Vec<Vec<u8>> = (0..4).map(|i| vec![i as u8; 256 * 1024]).collect();

        let mut reports = Vec::new();
        let artifact = write_stream_to_file(
            chunk_stream(chunks),
            &dest,
            Some(1_048_576),
            |done, total| reports.push((done, total)),
        )
        .await
        .unwrap();

        assert_eq!(artifact.size_bytes, 1_048_576);
        assert_eq!(std::fs::metadata(&dest).unwrap().len(), 1_048_576);
        let (done, total) = *reports.last().unwrap();
        assert_eq!((done, total), (1_048_576, Some(1_048_576)));
    }

    #[tokio::test]
    async fn unknown_length_writes_complete_stream() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dubbed.mp4");

        let chunks: Vec<Vec<u8>> = vec![
            (0u8..255).collect(),
            vec![42; 3],
            (0u8..100).rev().collect(),
        ];
        let expected: Vec<u8> = chunks.iter().flatten().copied().collect();

        let artifact = write_stream_to_file(chunk_stream(chunks), &dest, None, |_, total| {
            assert_eq!(total, None);
        })
        .await
        .unwrap();

        assert_eq!(artifact.size_bytes, expected.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), expected);
    }

    #[tokio::test]
    async fn short_body_against_content_length_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dubbed.mp4");

        let err = write_stream_to_file(
            chunk_stream(vec![vec![0; 10]]),
            &dest,
            Some(20),
            |_, _| {},
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DubError::Download(_)));
        assert!(!dest.exists());
    }
}
