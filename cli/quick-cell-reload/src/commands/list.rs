//! List the jobs a pattern would update.

use anyhow::Result;
use tracing::info;

use crate::jobmeta::find_jobs;
use crate::output::print_jobs;

use super::CommandContext;

pub async fn run(ctx: CommandContext, pattern: &str) -> Result<()> {
    let jobs = find_jobs(ctx.api.as_ref(), &ctx.namespace, pattern).await?;
    info!(
        namespace = %ctx.namespace,
        pattern = %pattern,
        count = jobs.len(),
        "Listed matching jobs"
    );

    print_jobs(&jobs, ctx.format);
    Ok(())
}
