//! Distributed job completion tracking for an analytical database frontend.
//!
//! keel is the coordination layer that dispatches a compiled plan's fragments
//! to a fleet of workers and tracks their completion under an unreliable,
//! at-least-once status report channel: a counting barrier keyed by
//! (fragment, worker) marks, a job-scoped aggregation context for report side
//! channels, an on-demand health monitor over the root fragment's workers,
//! and a bounded join loop with cooperative cancellation.
//!
//! Planning, catalog metadata, report transport, and external transaction
//! commit logic are collaborators behind traits, injected at construction.

pub mod cluster;
pub mod concurrency;
pub mod coordinator;
pub mod error;
pub mod job;
mod macros;
pub mod progress;
pub mod txn;
pub mod types;

pub use crate::cluster::{ClusterView, WorkerClient};
pub use crate::concurrency::{BarrierWaitResult, WorkUnitBarrier};
pub use crate::coordinator::{JobProcessor, JobState, LoadCoordinator, ReportHandler};
pub use crate::error::{ErrorKind, KeelError, KeelResult};
pub use crate::job::{JobContext, JobContextSnapshot};
pub use crate::progress::ProgressRegistry;
pub use crate::txn::TransactionManager;
