//! Reload one job, or every job matching a pattern.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::error::ReloadError;
use crate::hash::generate_reload_hash;
use crate::jobmeta::{FanOut, MetaUpdater, UpdateOptions};
use crate::output::{print_report, print_update};
use crate::rate_limit::{new_rate_limiter, RateLimiter};
use crate::shutdown;

use super::{build_meta_updates, CommandContext};

pub struct ReloadArgs {
    pub job: Option<String>,
    pub pattern: String,
    pub extra_meta: Vec<String>,
    pub hash_key: String,
    pub burst: u32,
    pub limit: u32,
    pub interval: Duration,
    pub enforce_index: bool,
    pub verify_eval: bool,
}

impl ReloadArgs {
    /// Only multi-job updates are throttled.
    fn rate_limiter(&self) -> Option<RateLimiter> {
        if self.job.is_some() {
            return None;
        }
        new_rate_limiter(self.burst, self.limit, self.interval)
    }
}

pub async fn run(ctx: CommandContext, args: ReloadArgs) -> Result<()> {
    let hash = generate_reload_hash();
    let meta_updates = build_meta_updates(&args.hash_key, &hash, &args.extra_meta)
        .context("Failed to build meta updates")?;
    info!(hash_key = %args.hash_key, hash = %hash, "Generated reload hash");

    let updater = MetaUpdater::new(
        ctx.api.clone(),
        UpdateOptions {
            enforce_index: args.enforce_index,
            verify_eval: args.verify_eval,
        },
    );

    let limiter = args.rate_limiter();

    match args.job {
        Some(job_id) => {
            let mut shutdown_rx = ctx.shutdown.clone();
            let result = tokio::select! {
                biased;
                _ = shutdown::cancelled(&mut shutdown_rx) => Err(ReloadError::Cancelled),
                result = updater.update_job_meta(&job_id, &ctx.namespace, &meta_updates) => result,
            };
            let outcome =
                result.with_context(|| format!("Failed to update job '{}'", job_id))?;

            print_update(&outcome, ctx.format);
            Ok(())
        }
        None => {
            match &limiter {
                Some(limiter) => info!(
                    burst = limiter.burst(),
                    period = ?limiter.period(),
                    "Rate limiting job updates"
                ),
                None => info!("Rate limiting disabled"),
            }

            let fanout = FanOut::new(ctx.api.clone(), updater, limiter);
            let report = fanout
                .update_matching_jobs(&ctx.namespace, &args.pattern, &meta_updates, ctx.shutdown)
                .await
                .context("Failed to list jobs")?;

            print_report(&report, ctx.format);

            if report.cancelled() > 0 {
                return Err(ReloadError::Cancelled.into());
            }
            Ok(())
        }
    }
}
