//! Concurrent meta updates across every job matching a pattern.
//!
//! One task per job, throttled only by the optional shared rate limiter.
//! Failures are recorded per job and never stop the other updates.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::locator::find_jobs;
use super::updater::MetaUpdater;
use crate::client::SchedulerApi;
use crate::error::ReloadError;
use crate::rate_limit::RateLimiter;
use crate::shutdown;

/// Per-job result of a fan-out run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobResult {
    pub job_id: String,
    #[serde(flatten)]
    pub status: JobStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Updated {
        eval_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        eval_status: Option<String>,
    },
    Failed {
        error: String,
    },
    /// `in_flight` is set when the job's requests had already started, so the
    /// scheduler may have accepted the update.
    Cancelled {
        in_flight: bool,
    },
}

/// Summary of a fan-out run, in the order the jobs were found.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FanOutReport {
    pub namespace: String,
    pub pattern: String,
    pub results: Vec<JobResult>,
}

impl FanOutReport {
    pub fn matched(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Updated { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Failed { .. }))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Cancelled { .. }))
    }

    fn count(&self, pred: impl Fn(&JobStatus) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.status)).count()
    }
}

/// Drives the meta updater across all jobs matching a pattern.
pub struct FanOut {
    api: Arc<dyn SchedulerApi>,
    updater: MetaUpdater,
    limiter: Option<Arc<RateLimiter>>,
}

impl FanOut {
    pub fn new(
        api: Arc<dyn SchedulerApi>,
        updater: MetaUpdater,
        limiter: Option<RateLimiter>,
    ) -> Self {
        Self {
            api,
            updater,
            limiter: limiter.map(Arc::new),
        }
    }

    /// Update the meta of every job in `namespace` whose ID starts with
    /// `pattern`.
    ///
    /// Only a failure to list jobs is returned as an error. Per-job failures
    /// and cancellations land in the report.
    pub async fn update_matching_jobs(
        &self,
        namespace: &str,
        pattern: &str,
        meta_updates: &BTreeMap<String, String>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<FanOutReport, ReloadError> {
        let jobs = find_jobs(self.api.as_ref(), namespace, pattern).await?;
        info!(count = jobs.len(), "Found {} jobs to update", jobs.len());

        let meta_updates = Arc::new(meta_updates.clone());
        let mut tasks = JoinSet::new();

        for (index, stub) in jobs.iter().enumerate() {
            let updater = self.updater.clone();
            let limiter = self.limiter.clone();
            let meta_updates = Arc::clone(&meta_updates);
            let namespace = namespace.to_string();
            let job_id = stub.id.clone();
            let mut shutdown_rx = shutdown_rx.clone();

            tasks.spawn(async move {
                let in_flight = AtomicBool::new(false);
                let work = async {
                    if let Some(limiter) = &limiter {
                        limiter.acquire().await;
                    }
                    in_flight.store(true, Ordering::SeqCst);
                    updater
                        .update_job_meta(&job_id, &namespace, &meta_updates)
                        .await
                };

                let status = tokio::select! {
                    biased;
                    _ = shutdown::cancelled(&mut shutdown_rx) => JobStatus::Cancelled {
                        in_flight: in_flight.load(Ordering::SeqCst),
                    },
                    result = work => match result {
                        Ok(outcome) => JobStatus::Updated {
                            eval_id: outcome.eval_id,
                            eval_status: outcome.eval_status,
                        },
                        Err(e) => {
                            error!(job_id = %job_id, error = %e, "Failed to update job");
                            JobStatus::Failed { error: e.to_string() }
                        }
                    },
                };

                (index, status)
            });
        }

        info!("Waiting for job updates to finish");

        let mut statuses: Vec<Option<JobStatus>> = vec![None; jobs.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, status)) => statuses[index] = Some(status),
                Err(e) => error!(error = %e, "Update task panicked"),
            }
        }

        let results: Vec<JobResult> = jobs
            .into_iter()
            .zip(statuses)
            .map(|(stub, status)| JobResult {
                job_id: stub.id,
                status: status.unwrap_or_else(|| JobStatus::Failed {
                    error: "update task aborted".to_string(),
                }),
            })
            .collect();

        let report = FanOutReport {
            namespace: namespace.to_string(),
            pattern: pattern.to_string(),
            results,
        };

        if report.cancelled() > 0 {
            warn!(
                cancelled = report.cancelled(),
                "Run was cancelled before every job was updated"
            );
        }
        info!(
            matched = report.matched(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            cancelled = report.cancelled(),
            "Finished sending job updates"
        );

        Ok(report)
    }
}
