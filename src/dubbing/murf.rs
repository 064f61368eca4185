//! HTTP client for the Murf dubbing jobs API.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::{DubService, JobId, PollOutcome};
use crate::config::MurfConfig;
use crate::error::{DubError, Result};
use crate::locale::Locale;

pub struct MurfClient {
    client: Client,
    config: MurfConfig,
}

#[derive(Debug, Deserialize)]
struct CreateJobResponse {
    job_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: String,
    #[serde(default)]
    download_details: Vec<DownloadDetail>,
    failure_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DownloadDetail {
    download_url: Option<String>,
}

impl MurfClient {
    pub fn new(config: MurfConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("dubkit/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| DubError::Config("MURF_API_KEY is not set".to_string()))
    }
}

#[async_trait]
impl DubService for MurfClient {
    async fn submit(&self, file: &Path, locale: &Locale) -> Result<JobId> {
        let api_key = self.api_key()?.to_string();

        if !file.exists() {
            return Err(DubError::FileNotFound(file.display().to_string()));
        }
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.mp4")
            .to_string();

        info!(
            "Submitting {} for dubbing into {}",
            file.display(),
            locale.service_code
        );

        let bytes = tokio::fs::read(file).await?;
        let part = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(guess_mime(file))?;
        let form = Form::new()
            .part("file", part)
            .text("file_name", file_name)
            .text("priority", "LOW")
            .text("target_locales", locale.service_code);

        let response = self
            .client
            .post(format!("{}/jobs/create", self.config.api_url))
            .header("api-key", api_key)
            .timeout(Duration::from_secs(self.config.submit_timeout_secs))
            .multipart(form)
            .send()
            .await
            .map_err(|e| DubError::Submission(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DubError::Submission(e.to_string()))?;
        if !status.is_success() {
            return Err(DubError::Submission(format!("HTTP {status}: {body}")));
        }

        parse_create_response(&body)
    }

    async fn poll(&self, job: &JobId) -> Result<PollOutcome> {
        debug!("Polling status of job {}", job);

        let response = self
            .client
            .get(format!("{}/jobs/{}/status", self.config.api_url, job))
            .header("api-key", self.api_key()?)
            .timeout(Duration::from_secs(self.config.poll_timeout_secs))
            .send()
            .await
            .map_err(|e| DubError::Poll(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DubError::Poll(e.to_string()))?;
        if !status.is_success() {
            return Err(DubError::Poll(format!("HTTP {status}: {body}")));
        }

        parse_status_response(&body)
    }
}

fn parse_create_response(body: &str) -> Result<JobId> {
    let response: CreateJobResponse = serde_json::from_str(body)
        .map_err(|_| DubError::Submission(format!("Unexpected response from dubbing service: {body}")))?;

    match response.job_id {
        Some(id) if !id.trim().is_empty() => Ok(JobId(id)),
        _ => Err(DubError::Submission(format!(
            "No job id in dubbing service response: {body}"
        ))),
    }
}

fn parse_status_response(body: &str) -> Result<PollOutcome> {
    let response: JobStatusResponse = serde_json::from_str(body)
        .map_err(|_| DubError::Poll(format!("Unexpected status response: {body}")))?;

    match response.status.as_str() {
        "COMPLETED" => {
            let url = response
                .download_details
                .into_iter()
                .filter_map(|d| d.download_url)
                .find(|u| !u.is_empty());
            match url {
                Some(download_url) => Ok(PollOutcome::Completed { download_url }),
                // Terminal either way: there is nothing more to wait for.
                None => Ok(PollOutcome::Failed {
                    reason: "completed, but no download details found".to_string(),
                }),
            }
        }
        "FAILED" => Ok(PollOutcome::Failed {
            reason: response
                .failure_reason
                .unwrap_or_else(|| "Unknown error".to_string()),
        }),
        // PENDING and any status we do not recognize keep the wait alive.
        _ => Ok(PollOutcome::Pending),
    }
}

fn guess_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        _ => "video/mp4",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn create_response_with_id_succeeds() {
        let id = parse_create_response(r#"{"job_id":"abc-123"}"#).unwrap();
        assert_eq!(id, JobId("abc-123".to_string()));
    }

    #[test]
    fn create_response_without_id_is_a_submission_error() {
        for body in [r#"{}"#, r#"{"job_id":""}"#, r#"{"job_id":"  "}"#, "not json"] {
            let err = parse_create_response(body).unwrap_err();
            assert!(matches!(err, DubError::Submission(_)), "body: {body}");
        }
    }

    #[test]
    fn status_completed_carries_first_usable_url() {
        let outcome = parse_status_response(
            r#"{"status":"COMPLETED","download_details":[{"download_url":null},{"download_url":"https://cdn.example/a.mp4"}]}"#,
        )
        .unwrap();
        assert_eq!(
            outcome,
            PollOutcome::Completed {
                download_url: "https://cdn.example/a.mp4".to_string()
            }
        );
    }

    #[test]
    fn status_completed_without_url_is_terminal_failure() {
        let outcome =
            parse_status_response(r#"{"status":"COMPLETED","download_details":[]}"#).unwrap();
        assert!(matches!(outcome, PollOutcome::Failed { .. }));
    }

    #[test]
    fn status_failed_carries_reason() {
        let outcome = parse_status_response(
            r#"{"status":"FAILED","failure_reason":"bad audio"}"#,
        )
        .unwrap();
        assert_eq!(
            outcome,
            PollOutcome::Failed {
                reason: "bad audio".to_string()
            }
        );
    }

    #[test]
    fn pending_and_unknown_statuses_stay_pending() {
        for body in [
            r#"{"status":"PENDING"}"#,
            r#"{"status":"QUEUED"}"#,
            r#"{"status":"PROCESSING"}"#,
        ] {
            assert_eq!(parse_status_response(body).unwrap(), PollOutcome::Pending);
        }
    }

    #[test]
    fn mime_guess_follows_extension() {
        assert_eq!(guess_mime(&PathBuf::from("a.mov")), "video/quicktime");
        assert_eq!(guess_mime(&PathBuf::from("a.WEBM")), "video/webm");
        assert_eq!(guess_mime(&PathBuf::from("a.mp4")), "video/mp4");
        assert_eq!(guess_mime(&PathBuf::from("noext")), "video/mp4");
    }
}
