//! Load (ingestion) specialization of the job processor.
//!
//! [`LoadCoordinator`] seeds an external progress registry when the topology
//! is dispatched, folds every ingestion side channel of incoming reports into
//! the job context, forwards transactional sink commit payloads to their
//! owning external transaction, and exposes the bounded join loop that
//! interleaves barrier waits with health checks.

use std::sync::Arc;
use std::time::Duration;

use keel_config::CoordinatorConfig;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cluster::{ClusterView, WorkerClient};
use crate::concurrency::BarrierWaitResult;
use crate::coordinator::processor::{spawn_report_pump, JobProcessor, JobState, ReportHandler};
use crate::error::KeelResult;
use crate::job::{JobContext, JobContextSnapshot};
use crate::progress::ProgressRegistry;
use crate::txn::TransactionManager;
use crate::types::{JobId, QueryId, Status, StatusReport, Topology};

/// Folds ingestion report fields into the job context and fans progress and
/// commit data out to the external registries.
pub struct LoadReportHandler {
    job_id: JobId,
    progress: Arc<dyn ProgressRegistry>,
    transactions: Arc<dyn TransactionManager>,
}

impl ReportHandler for LoadReportHandler {
    fn fold_report(&self, report: &StatusReport, context: &JobContext) {
        if let Some(urls) = &report.delta_urls {
            context.append_delta_urls(urls);
        }
        if let Some(counters) = &report.load_counters {
            context.merge_counters(counters);
        }
        if let Some(url) = &report.tracking_url {
            context.set_tracking_url(url.clone());
        }
        if let Some(transaction_id) = report.transaction_id {
            context.set_transaction_id(transaction_id);
        }
        if let Some(label) = &report.label {
            context.set_label(label.clone());
        }
        if let Some(files) = &report.export_files {
            context.append_export_files(files);
        }
        if let Some(infos) = &report.commit_infos {
            context.append_commit_infos(infos);
        }
        if let Some(tablets) = &report.error_tablet_infos {
            context.append_error_tablets(tablets);
        }
        if let Some(error) = &report.error {
            context.record_worker_error(report.worker_id, error.clone());
        }

        // The payload's transaction id comes from the context so that a
        // payload in the same report as the id still finds it.
        if let Some(payload) = &report.sink_commit_payload {
            match context.transaction_id() {
                Some(transaction_id) => {
                    context.append_commit_payload(transaction_id, payload.clone());
                    if let Err(error) =
                        self.transactions.apply_commit_payload(transaction_id, payload)
                    {
                        warn!(
                            %transaction_id,
                            %error,
                            "external transaction rejected commit payload",
                        );
                    }
                }
                None => {
                    warn!(
                        worker_id = %report.worker_id,
                        "commit payload without a known transaction id, dropping",
                    );
                }
            }
        }

        self.forward_progress(report);
    }
}

impl LoadReportHandler {
    /// Forwards loaded-row/byte and scan-range progress to the registry,
    /// per instance sub-report when the breakdown is present.
    fn forward_progress(&self, report: &StatusReport) {
        if let Some(instance_reports) = &report.instance_reports {
            for instance_report in instance_reports {
                self.progress.update_progress(
                    self.job_id,
                    report.worker_id,
                    report.query_id,
                    instance_report.instance_id,
                    instance_report.loaded_rows,
                    instance_report.loaded_bytes,
                    report.done,
                );
            }
        } else if let Some(loaded_rows) = report.loaded_rows {
            self.progress.update_progress(
                self.job_id,
                report.worker_id,
                report.query_id,
                report.instance_id,
                loaded_rows,
                report.loaded_bytes.unwrap_or(0),
                report.done,
            );
        }

        if let Some(finished) = report.finished_scan_ranges {
            self.progress.update_finished_scan_ranges(
                self.job_id,
                report.query_id,
                report.instance_id,
                finished,
            );
        }
    }
}

/// Coordinator for one ingestion job.
///
/// Cheap to clone; all clones share the same underlying processor.
#[derive(Clone)]
pub struct LoadCoordinator {
    processor: Arc<JobProcessor<LoadReportHandler>>,
    progress: Arc<dyn ProgressRegistry>,
    config: CoordinatorConfig,
}

impl LoadCoordinator {
    /// Creates a load coordinator with its collaborators injected.
    pub fn new(
        job_id: JobId,
        query_id: QueryId,
        config: CoordinatorConfig,
        cluster: Arc<dyn ClusterView>,
        worker_client: Arc<dyn WorkerClient>,
        progress: Arc<dyn ProgressRegistry>,
        transactions: Arc<dyn TransactionManager>,
    ) -> KeelResult<Self> {
        config.validate()?;

        let handler = LoadReportHandler {
            job_id,
            progress: progress.clone(),
            transactions,
        };
        let processor = Arc::new(JobProcessor::new(
            job_id,
            query_id,
            handler,
            cluster,
            worker_client,
        ));

        Ok(Self {
            processor,
            progress,
            config,
        })
    }

    /// Accepts the topology, seeds the progress registry, and builds the
    /// completion barrier.
    pub fn dispatch(&self, topology: Topology) -> KeelResult<()> {
        self.progress.init_job(
            self.processor.job_id(),
            self.processor.query_id(),
            &topology.instances,
            &topology.all_workers(),
        );
        self.progress
            .add_total_scan_ranges(self.processor.job_id(), topology.scan_range_count);

        self.processor.dispatch(topology)
    }

    /// Processes one asynchronous status report from a worker.
    pub fn on_status_report(&self, report: &StatusReport) {
        self.processor.on_status_report(report);
    }

    /// Spawns a pump feeding reports from the channel into this coordinator.
    ///
    /// The channel capacity comes from the coordinator configuration.
    pub fn spawn_report_pump(&self) -> (mpsc::Sender<StatusReport>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(self.config.report_queue_capacity);
        let pump = spawn_report_pump(self.processor.clone(), rx);
        (tx, pump)
    }

    /// Waits up to `timeout_secs` for every work unit to complete.
    ///
    /// The wait runs in bounded slices of at most the configured ceiling;
    /// between slices the root-fragment workers are health-checked, so a dead
    /// worker is noticed within one slice rather than after the full timeout.
    ///
    /// Returns `true` on completion or detected unhealthiness (callers must
    /// inspect [`LoadCoordinator::status`] to tell them apart) and `false`
    /// only if the whole timeout elapsed. A job that was never dispatched
    /// joins immediately.
    pub async fn join(&self, timeout_secs: u64) -> bool {
        let Some(dispatched) = self.processor.dispatched() else {
            return true;
        };

        let ceiling_secs = self.config.join_wait_ceiling_secs;
        let mut left_secs = timeout_secs;
        while left_secs > 0 {
            let slice_secs = left_secs.min(ceiling_secs);
            let waited = dispatched
                .barrier
                .wait(Duration::from_secs(slice_secs))
                .await;
            if waited == BarrierWaitResult::Completed {
                return true;
            }

            if !dispatched.health.check(self.processor.status()) {
                // The caller observes the fatal status and is expected to
                // cancel; returning early bounds the detection latency.
                return true;
            }

            left_secs -= slice_secs;
        }

        info!(
            job_id = %self.processor.job_id(),
            query_id = %self.processor.query_id(),
            timeout_secs,
            "join timed out with work outstanding",
        );
        false
    }

    /// Cancels the job and force-drains the barrier.
    pub fn cancel(&self, reason: Status) {
        self.processor.cancel(reason);
    }

    /// Whether every work unit has completed or the barrier was drained.
    pub fn is_done(&self) -> bool {
        self.processor.is_done()
    }

    /// Derives the job's lifecycle state.
    pub fn state(&self) -> JobState {
        self.processor.state()
    }

    /// Returns a point-in-time copy of the job's status.
    pub fn status(&self) -> Status {
        self.processor.status().get()
    }

    /// Takes a snapshot of the job's aggregated side-channel state.
    pub fn context_snapshot(&self) -> JobContextSnapshot {
        self.processor.context().snapshot()
    }

    pub fn job_id(&self) -> JobId {
        self.processor.job_id()
    }

    pub fn query_id(&self) -> QueryId {
        self.processor.query_id()
    }
}
