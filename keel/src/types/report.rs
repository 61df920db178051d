//! Status reports pushed by workers during job execution.
//!
//! Reports travel over an unreliable push channel: they may be duplicated,
//! reordered, or dropped. Every field besides the routing identifiers and the
//! `done` flag is optional; the coordinator folds whatever is present and
//! ignores the rest.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{FragmentId, InstanceId, JobId, QueryId, TransactionId, WorkerId};

/// Error descriptor reported by a worker for one unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedError {
    pub code: i32,
    pub message: String,
}

/// Per-instance progress sub-report carried by a fragment-level report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceReport {
    pub instance_id: InstanceId,
    pub loaded_rows: u64,
    pub loaded_bytes: u64,
}

/// Commit record for one native tablet written by the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub tablet_id: i64,
    pub worker_id: WorkerId,
}

/// Error record for one native tablet the job failed to write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorTabletInfo {
    pub tablet_id: i64,
    pub message: String,
}

/// The transactional sink a commit payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SinkKind {
    HivePartitionUpdates,
    IcebergCommitData,
}

/// Sink-specific commit data forwarded to the owning external transaction.
///
/// The coordinator treats the payload as opaque; only the external
/// transaction knows how to interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkCommitPayload {
    pub kind: SinkKind,
    pub data: serde_json::Value,
}

/// Asynchronous progress/completion message from one worker instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub job_id: JobId,
    pub query_id: QueryId,
    pub fragment_id: FragmentId,
    pub worker_id: WorkerId,
    pub instance_id: InstanceId,
    /// Whether the (fragment, worker) unit has finished executing.
    pub done: bool,
    pub loaded_rows: Option<u64>,
    pub loaded_bytes: Option<u64>,
    pub finished_scan_ranges: Option<u64>,
    pub load_counters: Option<HashMap<String, String>>,
    pub delta_urls: Option<Vec<String>>,
    pub tracking_url: Option<String>,
    pub transaction_id: Option<TransactionId>,
    pub label: Option<String>,
    pub export_files: Option<Vec<String>>,
    pub commit_infos: Option<Vec<CommitInfo>>,
    pub error_tablet_infos: Option<Vec<ErrorTabletInfo>>,
    /// Per-instance progress breakdown; takes precedence over the flat
    /// `loaded_rows`/`loaded_bytes` fields when present.
    pub instance_reports: Option<Vec<InstanceReport>>,
    pub sink_commit_payload: Option<SinkCommitPayload>,
    pub error: Option<ReportedError>,
}

impl StatusReport {
    /// Creates a report with only the routing fields set.
    pub fn new(
        job_id: JobId,
        query_id: QueryId,
        fragment_id: FragmentId,
        worker_id: WorkerId,
        instance_id: InstanceId,
        done: bool,
    ) -> Self {
        Self {
            job_id,
            query_id,
            fragment_id,
            worker_id,
            instance_id,
            done,
            loaded_rows: None,
            loaded_bytes: None,
            finished_scan_ranges: None,
            load_counters: None,
            delta_urls: None,
            tracking_url: None,
            transaction_id: None,
            label: None,
            export_files: None,
            commit_infos: None,
            error_tablet_infos: None,
            instance_reports: None,
            sink_commit_payload: None,
            error: None,
        }
    }
}
