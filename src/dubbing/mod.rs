// Asynchronous dubbing job protocol: submit, poll, bounded wait, download.
//
// The remote service does all the actual dubbing; this module owns the one
// piece of non-trivial control flow in the harness, the bounded polling
// loop. Each poll is classified into an explicit outcome so that timeout
// and failure behavior stay independently testable.

pub mod download;
pub mod murf;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{DubError, Result};
use crate::locale::Locale;

/// Opaque identifier assigned to a job by the dubbing service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a single status poll. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Pending,
    Completed { download_url: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

/// A dubbing job as tracked by the harness. Created on submission, mutated
/// only by poll outcomes.
#[derive(Debug, Clone)]
pub struct DubJob {
    pub id: JobId,
    pub source_file: PathBuf,
    pub target_locale: &'static Locale,
    pub status: JobStatus,
    pub download_url: Option<String>,
    pub failure_reason: Option<String>,
}

impl DubJob {
    pub fn new(id: JobId, source_file: PathBuf, target_locale: &'static Locale) -> Self {
        Self {
            id,
            source_file,
            target_locale,
            status: JobStatus::Pending,
            download_url: None,
            failure_reason: None,
        }
    }

    /// Fold a poll outcome into the job. Terminal states stick.
    pub fn apply(&mut self, outcome: &PollOutcome) {
        match outcome {
            PollOutcome::Pending => {}
            PollOutcome::Completed { download_url } => {
                self.status = JobStatus::Completed;
                self.download_url = Some(download_url.clone());
            }
            PollOutcome::Failed { reason } => {
                self.status = JobStatus::Failed;
                self.failure_reason = Some(reason.clone());
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.status, JobStatus::Pending)
    }
}

/// The dubbing service seam. The HTTP implementation lives in [`murf`];
/// tests script this trait directly.
#[async_trait]
pub trait DubService: Send + Sync {
    /// Upload a local media file for dubbing into the target locale.
    async fn submit(&self, file: &Path, locale: &Locale) -> Result<JobId>;

    /// Query the current status of a previously submitted job.
    async fn poll(&self, job: &JobId) -> Result<PollOutcome>;
}

/// Poll `job` until it reaches a terminal state, up to `max_attempts` polls
/// spaced `interval` apart.
///
/// A poll that fails at the transport level is not a failed job: the error
/// is logged, the attempt is consumed, and the wait continues. Returns the
/// download URL on completion, `JobFailed` if the service reports failure,
/// and `JobTimeout` once the attempt budget is exhausted.
pub async fn await_completion(
    service: &dyn DubService,
    job: &JobId,
    max_attempts: u32,
    interval: Duration,
) -> Result<String> {
    for attempt in 1..=max_attempts {
        match service.poll(job).await {
            Ok(PollOutcome::Completed { download_url }) => {
                debug!("job {} completed after {} poll(s)", job, attempt);
                return Ok(download_url);
            }
            Ok(PollOutcome::Failed { reason }) => {
                return Err(DubError::JobFailed(reason));
            }
            Ok(PollOutcome::Pending) => {
                debug!("job {} still pending (attempt {}/{})", job, attempt, max_attempts);
            }
            Err(e) => {
                warn!("status poll {}/{} for job {} failed: {}", attempt, max_attempts, job, e);
            }
        }
        if attempt < max_attempts {
            tokio::time::sleep(interval).await;
        }
    }

    Err(DubError::JobTimeout { attempts: max_attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Plays back a fixed sequence of poll results; pending once exhausted.
    struct ScriptedService {
        script: Mutex<VecDeque<Result<PollOutcome>>>,
        polls: AtomicU32,
    }

    impl ScriptedService {
        fn new(script: Vec<Result<PollOutcome>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                polls: AtomicU32::new(0),
            }
        }

        fn poll_count(&self) -> u32 {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DubService for ScriptedService {
        async fn submit(&self, _file: &Path, _locale: &Locale) -> Result<JobId> {
            Ok(JobId("job-scripted".to_string()))
        }

        async fn poll(&self, _job: &JobId) -> Result<PollOutcome> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(PollOutcome::Pending))
        }
    }

    fn job_id() -> JobId {
        JobId("job-1".to_string())
    }

    #[tokio::test]
    async fn completes_on_third_poll() {
        let service = ScriptedService::new(vec![
            Ok(PollOutcome::Pending),
            Ok(PollOutcome::Pending),
            Ok(PollOutcome::Completed {
                download_url: "https://cdn.example/result.mp4".to_string(),
            }),
        ]);

        let url = await_completion(&service, &job_id(), 5, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.example/result.mp4");
        assert_eq!(service.poll_count(), 3);
    }

    #[tokio::test]
    async fn times_out_after_exactly_max_attempts() {
        let service = ScriptedService::new(vec![]);

        let err = await_completion(&service, &job_id(), 3, Duration::ZERO)
            .await
            .unwrap_err();

        assert!(matches!(err, DubError::JobTimeout { attempts: 3 }));
        assert_eq!(service.poll_count(), 3);
    }

    #[tokio::test]
    async fn failure_reason_is_carried() {
        let service = ScriptedService::new(vec![Ok(PollOutcome::Failed {
            reason: "bad audio".to_string(),
        })]);

        let err = await_completion(&service, &job_id(), 5, Duration::ZERO)
            .await
            .unwrap_err();

        match err {
            DubError::JobFailed(reason) => assert_eq!(reason, "bad audio"),
            other => panic!("expected JobFailed, got {other:?}"),
        }
        assert_eq!(service.poll_count(), 1);
    }

    #[tokio::test]
    async fn transient_poll_errors_do_not_abort_the_wait() {
        let service = ScriptedService::new(vec![
            Err(DubError::Poll("connection reset".to_string())),
            Err(DubError::Poll("connection reset".to_string())),
            Ok(PollOutcome::Completed {
                download_url: "https://cdn.example/after-retries.mp4".to_string(),
            }),
        ]);

        let url = await_completion(&service, &job_id(), 5, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.example/after-retries.mp4");
        assert_eq!(service.poll_count(), 3);
    }

    #[test]
    fn dub_job_tracks_poll_outcomes() {
        let locale = crate::locale::Locale::resolve("fr").unwrap();
        let mut job = DubJob::new(job_id(), PathBuf::from("clip.mp4"), locale);
        assert!(!job.is_terminal());

        job.apply(&PollOutcome::Pending);
        assert_eq!(job.status, JobStatus::Pending);

        job.apply(&PollOutcome::Failed {
            reason: "bad audio".to_string(),
        });
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.failure_reason.as_deref(), Some("bad audio"));
    }
}
