//! External progress registry interface for ingestion jobs.

use crate::types::{InstanceId, JobId, QueryId, WorkerId};

/// Sink for ingestion progress, owned by an external load manager.
///
/// The coordinator's obligation is at-least-once delivery of updates; the
/// registry is expected to absorb duplicates keyed by instance.
pub trait ProgressRegistry: Send + Sync {
    /// Registers a job and its fragment instances before execution starts.
    fn init_job(
        &self,
        job_id: JobId,
        query_id: QueryId,
        instances: &[InstanceId],
        workers: &[WorkerId],
    );

    /// Registers the job's total scan-range count.
    fn add_total_scan_ranges(&self, job_id: JobId, total: u64);

    /// Records loaded-row/byte progress for one fragment instance.
    #[allow(clippy::too_many_arguments)]
    fn update_progress(
        &self,
        job_id: JobId,
        worker_id: WorkerId,
        query_id: QueryId,
        instance_id: InstanceId,
        loaded_rows: u64,
        loaded_bytes: u64,
        done: bool,
    );

    /// Records how many scan ranges one fragment instance has finished.
    fn update_finished_scan_ranges(
        &self,
        job_id: JobId,
        query_id: QueryId,
        instance_id: InstanceId,
        finished: u64,
    );
}
