//! Command-line surface.

mod list;
mod reload;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tokio::sync::watch;

use crate::client::{NomadClient, SchedulerApi};
use crate::config::Config;
use crate::duration::parse_duration;
use crate::error::ReloadError;
use crate::hash::DEFAULT_HASH_KEY;
use crate::output::OutputFormat;

/// Namespace used when neither `--namespace` nor `NOMAD_NAMESPACE` is set.
pub const DEFAULT_NAMESPACE: &str = "sites";

/// Job ID prefix used when `--pattern` is empty.
pub const DEFAULT_PATTERN: &str = "app-";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// quick-cell-reload - Roll Nomad jobs by rewriting a reload meta tag.
///
/// With --job, a single job is updated. Otherwise every job whose ID starts
/// with --pattern is updated concurrently, throttled by a token bucket.
#[derive(Debug, Parser)]
#[command(name = "quick-cell-reload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Job ID to update.
    #[arg(long)]
    job: Option<String>,

    /// Scheduler namespace.
    #[arg(long)]
    namespace: Option<String>,

    /// Job ID prefix for updating multiple jobs (defaults to "app-").
    #[arg(long, default_value = "")]
    pattern: String,

    /// List the jobs matching --pattern without updating them.
    #[arg(long, conflicts_with = "job")]
    list: bool,

    /// Number of requests allowed in a burst (0 disables rate limiting).
    #[arg(long, default_value_t = 10)]
    burst: u32,

    /// Number of requests allowed per interval (0 disables rate limiting).
    #[arg(long, default_value_t = 1)]
    limit: u32,

    /// Time interval for rate limiting (e.g. 500ms, 1s, 2m).
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    interval: Duration,

    /// Overall deadline for the run.
    #[arg(long, value_parser = parse_duration)]
    timeout: Option<Duration>,

    /// Extra meta pair written alongside the reload hash (KEY=VALUE).
    /// Can be specified multiple times.
    #[arg(long = "meta", value_name = "KEY=VALUE")]
    meta: Vec<String>,

    /// Meta key that receives the reload hash.
    #[arg(long, default_value = DEFAULT_HASH_KEY)]
    hash_key: String,

    /// Reject the update if the job changed between read and write.
    #[arg(long)]
    enforce_index: bool,

    /// Fetch the evaluation created by each registration.
    #[arg(long)]
    verify_eval: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Scheduler address (overrides NOMAD_ADDR).
    #[arg(long)]
    address: Option<String>,

    /// ACL token (overrides NOMAD_TOKEN).
    #[arg(long)]
    token: Option<String>,

    /// Region (overrides NOMAD_REGION).
    #[arg(long)]
    region: Option<String>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl Cli {
    /// Overall deadline, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Apply connection flag overrides on top of file and environment config.
    pub fn resolve_config(&self, base: Config) -> Config {
        base.with_overrides(self.address.clone(), self.token.clone(), self.region.clone())
    }

    /// Run the command.
    pub async fn run(self, config: Config, shutdown: watch::Receiver<bool>) -> Result<()> {
        let api: Arc<dyn SchedulerApi> = Arc::new(NomadClient::new(&config)?);

        let namespace = self
            .namespace
            .clone()
            .or_else(|| config.namespace.clone())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let ctx = CommandContext {
            api,
            format: self.format,
            namespace,
            shutdown,
        };

        if self.list {
            return list::run(ctx, self.effective_pattern()).await;
        }

        let args = reload::ReloadArgs {
            job: self.job_id().map(str::to_string),
            pattern: self.effective_pattern().to_string(),
            extra_meta: self.meta.clone(),
            hash_key: self.hash_key.clone(),
            burst: self.burst,
            limit: self.limit,
            interval: self.interval,
            enforce_index: self.enforce_index,
            verify_eval: self.verify_eval,
        };
        reload::run(ctx, args).await
    }

    /// `--job ""` counts as not given and selects the pattern path.
    fn job_id(&self) -> Option<&str> {
        self.job.as_deref().map(str::trim).filter(|job| !job.is_empty())
    }

    fn effective_pattern(&self) -> &str {
        if self.pattern.is_empty() {
            DEFAULT_PATTERN
        } else {
            &self.pattern
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub api: Arc<dyn SchedulerApi>,
    pub format: OutputFormat,
    pub namespace: String,
    pub shutdown: watch::Receiver<bool>,
}

/// Build the meta map written to each job: the reload hash plus any
/// `KEY=VALUE` extras (deterministic ordering).
pub fn build_meta_updates(
    hash_key: &str,
    hash: &str,
    extras: &[String],
) -> Result<BTreeMap<String, String>, ReloadError> {
    let hash_key = hash_key.trim();
    if hash_key.is_empty() {
        return Err(ReloadError::InvalidArgument(
            "hash key cannot be empty".to_string(),
        ));
    }

    let mut meta = BTreeMap::new();
    meta.insert(hash_key.to_string(), hash.to_string());

    for spec in extras {
        let Some((key_raw, value)) = spec.split_once('=') else {
            return Err(ReloadError::InvalidArgument(format!(
                "meta '{}' must use the format KEY=VALUE",
                spec
            )));
        };

        let key = key_raw.trim();
        if key.is_empty() {
            return Err(ReloadError::InvalidArgument(format!(
                "meta '{}' has an empty key",
                spec
            )));
        }
        if key == hash_key {
            return Err(ReloadError::InvalidArgument(format!(
                "meta key '{}' is reserved for the reload hash",
                key
            )));
        }
        if meta.insert(key.to_string(), value.to_string()).is_some() {
            return Err(ReloadError::InvalidArgument(format!(
                "meta key '{}' specified multiple times",
                key
            )));
        }
    }

    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_contains_hash_and_extras() {
        let meta = build_meta_updates(
            "reload-hash",
            "abc123",
            &["owner=team-a".to_string(), "reason=cert rotation".to_string()],
        )
        .unwrap();

        assert_eq!(meta.len(), 3);
        assert_eq!(meta["reload-hash"], "abc123");
        assert_eq!(meta["owner"], "team-a");
        assert_eq!(meta["reason"], "cert rotation");
    }

    #[test]
    fn meta_value_may_contain_equals() {
        let meta = build_meta_updates("h", "x", &["query=a=b".to_string()]).unwrap();
        assert_eq!(meta["query"], "a=b");
    }

    #[test]
    fn meta_rejects_bad_specs() {
        assert!(build_meta_updates("h", "x", &["novalue".to_string()]).is_err());
        assert!(build_meta_updates("h", "x", &["=v".to_string()]).is_err());
        assert!(build_meta_updates("h", "x", &["h=v".to_string()]).is_err());
        assert!(
            build_meta_updates("h", "x", &["a=1".to_string(), "a=2".to_string()]).is_err()
        );
        assert!(build_meta_updates(" ", "x", &[]).is_err());
    }

    #[test]
    fn empty_pattern_falls_back_to_default() {
        let cli = Cli::parse_from(["quick-cell-reload"]);
        assert_eq!(cli.effective_pattern(), DEFAULT_PATTERN);

        let cli = Cli::parse_from(["quick-cell-reload", "--pattern", "web-"]);
        assert_eq!(cli.effective_pattern(), "web-");
    }

    #[test]
    fn flags_parse_with_defaults() {
        let cli = Cli::parse_from(["quick-cell-reload", "--interval", "500ms", "--timeout", "2m"]);
        assert_eq!(cli.burst, 10);
        assert_eq!(cli.limit, 1);
        assert_eq!(cli.interval, Duration::from_millis(500));
        assert_eq!(cli.timeout(), Some(Duration::from_secs(120)));
        assert_eq!(cli.hash_key, DEFAULT_HASH_KEY);
        assert_eq!(cli.format, OutputFormat::Table);
    }

    #[test]
    fn out_of_range_duration_is_a_usage_error() {
        let result = Cli::try_parse_from(["quick-cell-reload", "--timeout", "99999999999999999h"]);
        assert!(result.is_err());

        let result = Cli::try_parse_from(["quick-cell-reload", "--interval", "1e20s"]);
        assert!(result.is_err());
    }

    #[test]
    fn empty_job_selects_pattern_path() {
        let cli = Cli::parse_from(["quick-cell-reload", "--job", ""]);
        assert_eq!(cli.job_id(), None);

        let cli = Cli::parse_from(["quick-cell-reload", "--job", "  "]);
        assert_eq!(cli.job_id(), None);

        let cli = Cli::parse_from(["quick-cell-reload", "--job", "app-1"]);
        assert_eq!(cli.job_id(), Some("app-1"));
    }

    #[test]
    fn list_conflicts_with_job() {
        let result = Cli::try_parse_from(["quick-cell-reload", "--list", "--job", "app-1"]);
        assert!(result.is_err());
    }
}
