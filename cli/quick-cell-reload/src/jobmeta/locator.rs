//! Pattern-based job discovery.

use tracing::debug;

use crate::client::{JobStub, SchedulerApi};
use crate::error::ReloadError;

/// Whether a job ID is selected by `pattern` (case-sensitive prefix match).
pub fn matches_pattern(job_id: &str, pattern: &str) -> bool {
    job_id.starts_with(pattern)
}

/// List the jobs in `namespace` whose ID starts with `pattern`, in the order
/// the scheduler returned them.
pub async fn find_jobs(
    api: &dyn SchedulerApi,
    namespace: &str,
    pattern: &str,
) -> Result<Vec<JobStub>, ReloadError> {
    let jobs = api.list_jobs(namespace).await?;
    let total = jobs.len();

    let matching: Vec<JobStub> = jobs
        .into_iter()
        .filter(|job| matches_pattern(&job.id, pattern))
        .collect();

    debug!(
        namespace = %namespace,
        pattern = %pattern,
        total,
        matched = matching.len(),
        "Filtered job list"
    );

    Ok(matching)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("app-web", "app-", true)]
    #[case("app-", "app-", true)]
    #[case("api-gateway", "app-", false)]
    #[case("App-web", "app-", false)]
    #[case("my-app-web", "app-", false)]
    #[case("anything", "", true)]
    fn prefix_match(#[case] job_id: &str, #[case] pattern: &str, #[case] expected: bool) {
        assert_eq!(matches_pattern(job_id, pattern), expected);
    }
}
