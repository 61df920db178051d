//! Generic job processor: topology dispatch, report intake, cancellation.
//!
//! [`JobProcessor`] owns a job's completion bookkeeping and delegates the
//! folding of report side channels to an injected [`ReportHandler`], so one
//! implementation serves both load and query jobs without a subclass
//! hierarchy.
//!
//! Report intake is deliberately forgiving: reports arrive over an unreliable
//! push channel from untrusted remote peers, so anything malformed, late,
//! duplicated, or referencing unknown work is logged at debug level and
//! dropped. The job fails only through explicit health or cancel signals.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cluster::{ClusterView, WorkerClient};
use crate::concurrency::WorkUnitBarrier;
use crate::coordinator::health::HealthMonitor;
use crate::coordinator::tasks::FragmentTask;
use crate::error::{ErrorKind, KeelResult};
use crate::job::JobContext;
use crate::types::{JobId, QueryId, SharedStatus, Status, StatusReport, Topology, WorkUnit};

/// Strategy for folding report side channels into the job context.
///
/// Invoked once per accepted report, before completion bookkeeping. The
/// handler must not block: it runs on the report-delivery path.
pub trait ReportHandler: Send + Sync {
    fn fold_report(&self, report: &StatusReport, context: &JobContext);
}

/// Coarse lifecycle state of a job, derived from the processor's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// No topology accepted yet.
    Created,
    /// Topology accepted, no report seen yet.
    Dispatched,
    /// At least one report processed, work outstanding.
    Running,
    /// All work units completed with an OK status.
    Completed,
    /// Explicitly cancelled.
    Cancelled,
    /// A fatal status was recorded without an explicit cancel.
    Failed,
}

/// Per-dispatch state: the barrier, the task table, and the health monitor.
pub(crate) struct DispatchedJob {
    pub(crate) barrier: WorkUnitBarrier,
    pub(crate) tasks: HashMap<WorkUnit, FragmentTask>,
    pub(crate) health: HealthMonitor,
}

/// Coordinator for one job's completion tracking.
///
/// Safe to share across the report-delivery task, join callers, and a
/// cancelling supervisor; every entry point takes `&self`.
pub struct JobProcessor<H> {
    job_id: JobId,
    query_id: QueryId,
    context: JobContext,
    status: SharedStatus,
    handler: H,
    cluster: Arc<dyn ClusterView>,
    worker_client: Arc<dyn WorkerClient>,
    dispatched: OnceLock<DispatchedJob>,
    cancelled: AtomicBool,
    reports_seen: AtomicBool,
}

impl<H: ReportHandler> JobProcessor<H> {
    /// Creates a processor with its collaborators injected.
    pub fn new(
        job_id: JobId,
        query_id: QueryId,
        handler: H,
        cluster: Arc<dyn ClusterView>,
        worker_client: Arc<dyn WorkerClient>,
    ) -> Self {
        Self {
            job_id,
            query_id,
            context: JobContext::new(),
            status: SharedStatus::new(),
            handler,
            cluster,
            worker_client,
            dispatched: OnceLock::new(),
            cancelled: AtomicBool::new(false),
            reports_seen: AtomicBool::new(false),
        }
    }

    /// Accepts the job's topology and builds the completion barrier.
    ///
    /// One mark is registered per (fragment, worker) pair; the workers of the
    /// root fragment are captured for health checking. Dispatching twice is
    /// an error.
    pub fn dispatch(&self, topology: Topology) -> KeelResult<()> {
        topology.validate()?;

        let units: Vec<WorkUnit> = topology.work_units().collect();
        let barrier = WorkUnitBarrier::new(units.len());
        let mut tasks = HashMap::with_capacity(units.len());
        for unit in units {
            barrier.add_mark(unit);
            tasks.insert(unit, FragmentTask::new(unit));
        }

        let root_workers = topology.root_workers();
        let health = HealthMonitor::new(self.cluster.clone(), self.job_id, root_workers);

        let dispatched = DispatchedJob {
            barrier,
            tasks,
            health,
        };
        if self.dispatched.set(dispatched).is_err() {
            crate::bail!(
                ErrorKind::InvalidState,
                "Job topology already dispatched",
                format!("job {}", self.job_id)
            );
        }

        info!(
            job_id = %self.job_id,
            query_id = %self.query_id,
            workers = ?topology.all_workers(),
            "dispatched job",
        );

        Ok(())
    }

    /// Processes one asynchronous status report from a worker.
    ///
    /// Never fails: reports that cannot be attributed to a live fragment task
    /// are dropped with a debug log.
    pub fn on_status_report(&self, report: &StatusReport) {
        let Some(dispatched) = self.dispatched.get() else {
            debug!(query_id = %report.query_id, "report before dispatch, ignoring");
            return;
        };

        if report.query_id != self.query_id {
            debug!(
                query_id = %report.query_id,
                expected = %self.query_id,
                "report for another execution, ignoring",
            );
            return;
        }

        let unit = WorkUnit::new(report.fragment_id, report.worker_id);
        let Some(task) = dispatched.tasks.get(&unit) else {
            debug!(%unit, "report for unknown work unit, ignoring");
            return;
        };
        if task.is_finished() {
            debug!(%unit, "report for finished work unit, ignoring");
            return;
        }

        self.reports_seen.store(true, Ordering::Release);
        self.handler.fold_report(report, &self.context);

        if report.done {
            task.mark_finished();
            if dispatched.barrier.mark_done(unit) {
                debug!(query_id = %self.query_id, %unit, "work unit marked done");
            }
        }
    }

    /// Cancels the job: fans a cancel instruction out to every still-running
    /// fragment task and force-drains the barrier.
    ///
    /// Idempotent; only the first call issues instructions and records the
    /// reason. Does not wait for workers to acknowledge.
    pub fn cancel(&self, reason: Status) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            debug!(job_id = %self.job_id, "job already cancelled, ignoring");
            return;
        }

        self.status.update_if_ok(reason.clone());

        if let Some(dispatched) = self.dispatched.get() {
            for (unit, task) in &dispatched.tasks {
                if !task.is_finished() {
                    self.worker_client.cancel_fragment_execution(
                        unit.worker_id,
                        unit.fragment_id,
                        &reason,
                    );
                }
            }
            dispatched.barrier.force_zero(reason.clone());
        }

        info!(job_id = %self.job_id, query_id = %self.query_id, %reason, "cancelled job");
    }

    /// Whether every work unit has completed or the barrier was drained.
    ///
    /// Reflects barrier state without blocking; `false` before dispatch.
    pub fn is_done(&self) -> bool {
        self.dispatched
            .get()
            .map(|dispatched| dispatched.barrier.is_done())
            .unwrap_or(false)
    }

    /// Derives the job's lifecycle state.
    pub fn state(&self) -> JobState {
        if self.cancelled.load(Ordering::Acquire) {
            return JobState::Cancelled;
        }
        if !self.status.is_ok() {
            return JobState::Failed;
        }

        match self.dispatched.get() {
            None => JobState::Created,
            Some(dispatched) => {
                if dispatched.barrier.is_done() {
                    JobState::Completed
                } else if self.reports_seen.load(Ordering::Acquire) {
                    JobState::Running
                } else {
                    JobState::Dispatched
                }
            }
        }
    }

    /// Returns the job's shared status handle.
    pub fn status(&self) -> &SharedStatus {
        &self.status
    }

    /// Returns the job's aggregation context.
    pub fn context(&self) -> &JobContext {
        &self.context
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn query_id(&self) -> QueryId {
        self.query_id
    }

    pub(crate) fn dispatched(&self) -> Option<&DispatchedJob> {
        self.dispatched.get()
    }
}

/// Spawns a task pumping reports from a channel into the processor.
///
/// The pump exits when the channel is closed; dropping all senders is the
/// transport layer's way of signalling end of stream.
pub fn spawn_report_pump<H>(
    processor: Arc<JobProcessor<H>>,
    mut reports: mpsc::Receiver<StatusReport>,
) -> JoinHandle<()>
where
    H: ReportHandler + 'static,
{
    tokio::spawn(async move {
        while let Some(report) = reports.recv().await {
            processor.on_status_report(&report);
        }
        debug!(query_id = %processor.query_id(), "report channel closed, pump exiting");
    })
}
