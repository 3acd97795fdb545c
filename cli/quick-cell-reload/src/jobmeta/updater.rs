//! Read-modify-write of a single job's meta.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::SchedulerApi;
use crate::error::ReloadError;

/// Knobs for a meta update.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Register with `EnforceIndex` so concurrent edits surface as conflicts.
    pub enforce_index: bool,
    /// Look up the evaluation after registration.
    pub verify_eval: bool,
}

/// Result of a successful update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    pub job_id: String,
    pub namespace: String,
    /// Empty when the scheduler created no evaluation.
    pub eval_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<String>,
}

/// Updates meta tags on jobs and submits them for registration.
#[derive(Clone)]
pub struct MetaUpdater {
    api: Arc<dyn SchedulerApi>,
    options: UpdateOptions,
}

impl MetaUpdater {
    pub fn new(api: Arc<dyn SchedulerApi>, options: UpdateOptions) -> Self {
        Self { api, options }
    }

    /// Fetch `job_id`, merge `meta_updates` into its meta and register it.
    pub async fn update_job_meta(
        &self,
        job_id: &str,
        namespace: &str,
        meta_updates: &BTreeMap<String, String>,
    ) -> Result<UpdateOutcome, ReloadError> {
        let mut job = self.api.get_job(job_id, namespace).await?;
        debug!(
            job_id = %job_id,
            job_modify_index = ?job.job_modify_index,
            "Fetched job"
        );

        job.merge_meta(meta_updates);

        let response = self
            .api
            .register_job(&job, namespace, self.options.enforce_index)
            .await?;

        let warnings = Some(response.warnings.trim().to_string()).filter(|w| !w.is_empty());
        if let Some(warnings) = &warnings {
            warn!(job_id = %job_id, warnings = %warnings, "Scheduler returned warnings");
        }

        let eval_status = if self.options.verify_eval && !response.eval_id.is_empty() {
            match self.api.get_evaluation(&response.eval_id, namespace).await {
                Ok(eval) => Some(eval.status),
                Err(e) => {
                    warn!(
                        job_id = %job_id,
                        eval_id = %response.eval_id,
                        error = %e,
                        "Failed to fetch evaluation"
                    );
                    None
                }
            }
        } else {
            None
        };

        info!(
            job_id = %job_id,
            namespace = %namespace,
            eval_id = %response.eval_id,
            eval_status = eval_status.as_deref().unwrap_or("-"),
            "Job update submitted"
        );

        Ok(UpdateOutcome {
            job_id: job_id.to_string(),
            namespace: namespace.to_string(),
            eval_id: response.eval_id,
            eval_status,
            warnings,
        })
    }
}
