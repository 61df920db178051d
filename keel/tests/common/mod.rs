//! Shared fakes for coordinator integration tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use keel::cluster::{ClusterView, WorkerClient};
use keel::error::{ErrorKind, KeelError, KeelResult};
use keel::progress::ProgressRegistry;
use keel::txn::TransactionManager;
use keel::types::{
    FragmentAssignment, FragmentId, InstanceId, JobId, QueryId, SinkCommitPayload, Status,
    StatusReport, Topology, TransactionId, WorkerId,
};
use keel::LoadCoordinator;
use keel_config::CoordinatorConfig;

/// Cluster view whose dead set is scripted by the test.
#[derive(Default)]
pub struct ScriptedCluster {
    dead: Mutex<HashSet<WorkerId>>,
}

impl ScriptedCluster {
    pub fn kill(&self, worker_id: WorkerId) {
        self.dead.lock().unwrap().insert(worker_id);
    }
}

impl ClusterView for ScriptedCluster {
    fn is_worker_alive(&self, worker_id: WorkerId) -> bool {
        !self.dead.lock().unwrap().contains(&worker_id)
    }
}

/// Worker client that records every cancel instruction it is asked to send.
#[derive(Default)]
pub struct RecordingWorkerClient {
    cancels: Mutex<Vec<(WorkerId, FragmentId, Status)>>,
}

impl RecordingWorkerClient {
    pub fn cancelled_units(&self) -> Vec<(WorkerId, FragmentId)> {
        self.cancels
            .lock()
            .unwrap()
            .iter()
            .map(|(worker_id, fragment_id, _)| (*worker_id, *fragment_id))
            .collect()
    }
}

impl WorkerClient for RecordingWorkerClient {
    fn cancel_fragment_execution(
        &self,
        worker_id: WorkerId,
        fragment_id: FragmentId,
        reason: &Status,
    ) {
        self.cancels
            .lock()
            .unwrap()
            .push((worker_id, fragment_id, reason.clone()));
    }
}

#[derive(Default)]
struct JobProgress {
    instances: Vec<InstanceId>,
    workers: Vec<WorkerId>,
    total_scan_ranges: u64,
    loaded_rows: HashMap<InstanceId, u64>,
    loaded_bytes: HashMap<InstanceId, u64>,
    finished_scan_ranges: HashMap<InstanceId, u64>,
    done: HashMap<InstanceId, bool>,
}

/// In-memory progress registry mirroring an external load manager.
#[derive(Default)]
pub struct InMemoryProgress {
    jobs: Mutex<HashMap<JobId, JobProgress>>,
}

impl InMemoryProgress {
    pub fn is_registered(&self, job_id: JobId) -> bool {
        self.jobs.lock().unwrap().contains_key(&job_id)
    }

    pub fn loaded_rows(&self, job_id: JobId, instance_id: InstanceId) -> Option<u64> {
        self.jobs
            .lock()
            .unwrap()
            .get(&job_id)
            .and_then(|job| job.loaded_rows.get(&instance_id).copied())
    }

    pub fn loaded_bytes(&self, job_id: JobId, instance_id: InstanceId) -> Option<u64> {
        self.jobs
            .lock()
            .unwrap()
            .get(&job_id)
            .and_then(|job| job.loaded_bytes.get(&instance_id).copied())
    }

    pub fn finished_scan_ranges(&self, job_id: JobId, instance_id: InstanceId) -> Option<u64> {
        self.jobs
            .lock()
            .unwrap()
            .get(&job_id)
            .and_then(|job| job.finished_scan_ranges.get(&instance_id).copied())
    }

    pub fn is_instance_done(&self, job_id: JobId, instance_id: InstanceId) -> bool {
        self.jobs
            .lock()
            .unwrap()
            .get(&job_id)
            .and_then(|job| job.done.get(&instance_id).copied())
            .unwrap_or(false)
    }

    pub fn registered_instances(&self, job_id: JobId) -> usize {
        self.jobs
            .lock()
            .unwrap()
            .get(&job_id)
            .map(|job| job.instances.len())
            .unwrap_or(0)
    }

    pub fn total_scan_ranges(&self, job_id: JobId) -> u64 {
        self.jobs
            .lock()
            .unwrap()
            .get(&job_id)
            .map(|job| job.total_scan_ranges)
            .unwrap_or(0)
    }

    pub fn registered_workers(&self, job_id: JobId) -> Vec<WorkerId> {
        self.jobs
            .lock()
            .unwrap()
            .get(&job_id)
            .map(|job| job.workers.clone())
            .unwrap_or_default()
    }
}

impl ProgressRegistry for InMemoryProgress {
    fn init_job(
        &self,
        job_id: JobId,
        _query_id: QueryId,
        instances: &[InstanceId],
        workers: &[WorkerId],
    ) {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs.entry(job_id).or_default();
        job.instances = instances.to_vec();
        job.workers = workers.to_vec();
    }

    fn add_total_scan_ranges(&self, job_id: JobId, total: u64) {
        let mut jobs = self.jobs.lock().unwrap();
        jobs.entry(job_id).or_default().total_scan_ranges = total;
    }

    fn update_progress(
        &self,
        job_id: JobId,
        _worker_id: WorkerId,
        _query_id: QueryId,
        instance_id: InstanceId,
        loaded_rows: u64,
        loaded_bytes: u64,
        done: bool,
    ) {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs.entry(job_id).or_default();
        job.loaded_rows.insert(instance_id, loaded_rows);
        job.loaded_bytes.insert(instance_id, loaded_bytes);
        job.done.insert(instance_id, done);
    }

    fn update_finished_scan_ranges(
        &self,
        job_id: JobId,
        _query_id: QueryId,
        instance_id: InstanceId,
        finished: u64,
    ) {
        let mut jobs = self.jobs.lock().unwrap();
        jobs.entry(job_id)
            .or_default()
            .finished_scan_ranges
            .insert(instance_id, finished);
    }
}

/// Transaction manager recording every payload it is handed.
#[derive(Default)]
pub struct RecordingTransactions {
    applied: Mutex<Vec<(TransactionId, SinkCommitPayload)>>,
    reject: AtomicBool,
}

impl RecordingTransactions {
    pub fn reject_payloads(&self) {
        self.reject.store(true, Ordering::Release);
    }

    pub fn applied(&self) -> Vec<(TransactionId, SinkCommitPayload)> {
        self.applied.lock().unwrap().clone()
    }
}

impl TransactionManager for RecordingTransactions {
    fn apply_commit_payload(
        &self,
        transaction_id: TransactionId,
        payload: &SinkCommitPayload,
    ) -> KeelResult<()> {
        if self.reject.load(Ordering::Acquire) {
            return Err(KeelError::from((
                ErrorKind::UnknownTransaction,
                "No such transaction",
            )));
        }

        self.applied
            .lock()
            .unwrap()
            .push((transaction_id, payload.clone()));
        Ok(())
    }
}

/// Everything a test needs to drive one load coordinator.
pub struct Harness {
    pub coordinator: LoadCoordinator,
    pub cluster: Arc<ScriptedCluster>,
    pub worker_client: Arc<RecordingWorkerClient>,
    pub progress: Arc<InMemoryProgress>,
    pub transactions: Arc<RecordingTransactions>,
    pub job_id: JobId,
    pub query_id: QueryId,
}

impl Harness {
    pub fn new(job_id: JobId) -> Self {
        Self::with_config(
            job_id,
            CoordinatorConfig {
                // Keep join slices short so health checks run quickly in tests.
                join_wait_ceiling_secs: 1,
                ..Default::default()
            },
        )
    }

    pub fn with_config(job_id: JobId, config: CoordinatorConfig) -> Self {
        let query_id = QueryId::new();
        let cluster = Arc::new(ScriptedCluster::default());
        let worker_client = Arc::new(RecordingWorkerClient::default());
        let progress = Arc::new(InMemoryProgress::default());
        let transactions = Arc::new(RecordingTransactions::default());

        let coordinator = LoadCoordinator::new(
            job_id,
            query_id,
            config,
            cluster.clone(),
            worker_client.clone(),
            progress.clone(),
            transactions.clone(),
        )
        .expect("coordinator config is valid");

        Self {
            coordinator,
            cluster,
            worker_client,
            progress,
            transactions,
            job_id,
            query_id,
        }
    }

    /// Builds a done/undone report routed to this harness's job.
    pub fn report(&self, fragment_id: i32, worker_id: i64, done: bool) -> StatusReport {
        StatusReport::new(
            self.job_id,
            self.query_id,
            FragmentId(fragment_id),
            WorkerId(worker_id),
            InstanceId::new(),
            done,
        )
    }
}

/// Builds a topology from (fragment, workers) pairs; the first fragment is
/// the root.
pub fn topology(query_id: QueryId, fragments: &[(i32, &[i64])]) -> Topology {
    Topology {
        query_id,
        fragments: fragments
            .iter()
            .map(|(fragment_id, workers)| FragmentAssignment {
                fragment_id: FragmentId(*fragment_id),
                workers: workers.iter().map(|worker_id| WorkerId(*worker_id)).collect(),
            })
            .collect(),
        root_fragment: FragmentId(fragments[0].0),
        instances: vec![InstanceId::new(), InstanceId::new()],
        scan_range_count: 16,
    }
}
