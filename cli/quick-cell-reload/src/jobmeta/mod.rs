//! Job meta rewriting.
//!
//! - `locator`: find jobs in a namespace by ID prefix
//! - `updater`: read-modify-write of a single job's meta
//! - `fanout`: drive the updater across every matching job

pub mod fanout;
pub mod locator;
pub mod updater;

pub use fanout::{FanOut, FanOutReport, JobResult, JobStatus};
pub use locator::{find_jobs, matches_pattern};
pub use updater::{MetaUpdater, UpdateOptions, UpdateOutcome};
