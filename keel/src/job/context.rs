//! Aggregation of progress, diagnostics, and commit data for one job.
//!
//! [`JobContext`] is written only by report handling and read by callers that
//! need job status or commit data. Every mutation is merge-based or
//! append-only so that duplicated or reordered reports never lose data.
//! No method blocks or awaits; all are O(size of the delta).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use crate::types::{
    CommitInfo, ErrorTabletInfo, ReportedError, SinkCommitPayload, TransactionId, WorkerId,
};

#[derive(Debug, Default)]
struct JobContextInner {
    delta_urls: Vec<String>,
    load_counters: HashMap<String, String>,
    tracking_url: Option<String>,
    label: Option<String>,
    transaction_id: Option<TransactionId>,
    export_files: Vec<String>,
    commit_infos: Vec<CommitInfo>,
    error_tablets: Vec<ErrorTabletInfo>,
    worker_errors: HashMap<WorkerId, Vec<ReportedError>>,
    commit_payloads: HashMap<TransactionId, Vec<SinkCommitPayload>>,
}

/// Point-in-time copy of a job's aggregated state.
///
/// Snapshots decouple readers from concurrent writers; no iterator over live
/// state is ever exposed.
#[derive(Debug, Clone, Default)]
pub struct JobContextSnapshot {
    pub delta_urls: Vec<String>,
    pub load_counters: HashMap<String, String>,
    pub tracking_url: Option<String>,
    pub label: Option<String>,
    pub transaction_id: Option<TransactionId>,
    pub export_files: Vec<String>,
    pub commit_infos: Vec<CommitInfo>,
    pub error_tablets: Vec<ErrorTabletInfo>,
    pub worker_errors: HashMap<WorkerId, Vec<ReportedError>>,
    pub commit_payloads: HashMap<TransactionId, Vec<SinkCommitPayload>>,
}

/// Thread-safe accumulation of one job's report side channels.
#[derive(Debug, Clone, Default)]
pub struct JobContext {
    inner: Arc<Mutex<JobContextInner>>,
}

impl JobContext {
    /// Creates an empty job context.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, JobContextInner> {
        self.inner.lock().expect("job context lock poisoned")
    }

    /// Merges load counters, last value per counter key wins.
    pub fn merge_counters(&self, counters: &HashMap<String, String>) {
        let mut inner = self.lock();
        for (key, value) in counters {
            inner.load_counters.insert(key.clone(), value.clone());
        }
    }

    /// Appends diagnostic URLs, skipping ones already recorded.
    pub fn append_delta_urls(&self, urls: &[String]) {
        let mut inner = self.lock();
        for url in urls {
            if !inner.delta_urls.contains(url) {
                inner.delta_urls.push(url.clone());
            }
        }
    }

    /// Records the tracking URL, last write wins.
    pub fn set_tracking_url(&self, url: String) {
        self.lock().tracking_url = Some(url);
    }

    /// Records the job label, last write wins.
    ///
    /// Jobs have a single logical writer for this field; an overwrite with a
    /// different value is tolerated but logged.
    pub fn set_label(&self, label: String) {
        let mut inner = self.lock();
        if let Some(previous) = inner.label.as_deref() {
            if previous != label {
                warn!(previous, new = %label, "job label overwritten");
            }
        }
        inner.label = Some(label);
    }

    /// Records the transaction id, last write wins.
    ///
    /// Same single-writer assumption as [`JobContext::set_label`].
    pub fn set_transaction_id(&self, transaction_id: TransactionId) {
        let mut inner = self.lock();
        if let Some(previous) = inner.transaction_id {
            if previous != transaction_id {
                warn!(%previous, new = %transaction_id, "transaction id overwritten");
            }
        }
        inner.transaction_id = Some(transaction_id);
    }

    /// Appends export file paths, skipping ones already recorded.
    pub fn append_export_files(&self, files: &[String]) {
        let mut inner = self.lock();
        for file in files {
            if !inner.export_files.contains(file) {
                inner.export_files.push(file.clone());
            }
        }
    }

    /// Appends native tablet commit records, skipping duplicates.
    pub fn append_commit_infos(&self, infos: &[CommitInfo]) {
        let mut inner = self.lock();
        for info in infos {
            if !inner.commit_infos.contains(info) {
                inner.commit_infos.push(*info);
            }
        }
    }

    /// Appends per-tablet error records.
    pub fn append_error_tablets(&self, tablets: &[ErrorTabletInfo]) {
        let mut inner = self.lock();
        for tablet in tablets {
            if !inner.error_tablets.contains(tablet) {
                inner.error_tablets.push(tablet.clone());
            }
        }
    }

    /// Records an error descriptor reported by one worker.
    pub fn record_worker_error(&self, worker_id: WorkerId, error: ReportedError) {
        let mut inner = self.lock();
        let errors = inner.worker_errors.entry(worker_id).or_default();
        if !errors.contains(&error) {
            errors.push(error);
        }
    }

    /// Appends a sink commit payload under its owning transaction.
    pub fn append_commit_payload(&self, transaction_id: TransactionId, payload: SinkCommitPayload) {
        let mut inner = self.lock();
        let payloads = inner.commit_payloads.entry(transaction_id).or_default();
        if !payloads.contains(&payload) {
            payloads.push(payload);
        }
    }

    /// Returns the latest-seen transaction id, if any report carried one.
    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.lock().transaction_id
    }

    /// Takes a point-in-time snapshot of the aggregated state.
    pub fn snapshot(&self) -> JobContextSnapshot {
        let inner = self.lock();
        JobContextSnapshot {
            delta_urls: inner.delta_urls.clone(),
            load_counters: inner.load_counters.clone(),
            tracking_url: inner.tracking_url.clone(),
            label: inner.label.clone(),
            transaction_id: inner.transaction_id,
            export_files: inner.export_files.clone(),
            commit_infos: inner.commit_infos.clone(),
            error_tablets: inner.error_tablets.clone(),
            worker_errors: inner.worker_errors.clone(),
            commit_payloads: inner.commit_payloads.clone(),
        }
    }
}
