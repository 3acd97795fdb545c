//! quick-cell-reload library
//!
//! Triggers rolling restarts of scheduler jobs by writing a fresh random hash
//! into a meta tag and re-registering the job. The scheduler sees a changed
//! specification and redeploys it.
//!
//! ## Modules
//!
//! - `client`: scheduler HTTP API client and the `SchedulerApi` seam
//! - `jobmeta`: job discovery, single-job meta update, fan-out coordinator
//! - `rate_limit`: token-bucket throttle shared by fan-out tasks
//! - `commands`: command-line surface

pub mod client;
pub mod commands;
pub mod config;
pub mod duration;
pub mod error;
pub mod hash;
pub mod jobmeta;
pub mod output;
pub mod rate_limit;
pub mod shutdown;

// Re-export commonly used types
pub use client::{Job, JobStub, NomadClient, SchedulerApi};
pub use error::ReloadError;
pub use jobmeta::{FanOut, FanOutReport, MetaUpdater, UpdateOptions};
pub use rate_limit::{new_rate_limiter, RateLimiter};
