//! Liveness checking for the workers hosting a job's root fragment.

use std::sync::Arc;

use tracing::error;

use crate::cluster::ClusterView;
use crate::types::{JobId, SharedStatus, Status, WorkerId};

/// On-demand health check over a job's root-fragment workers.
///
/// Designed to be cheap and called on every bounded join iteration rather
/// than from a standing background task, so the job status has no second
/// concurrent mutator beyond report handling and cancellation.
#[derive(Clone)]
pub struct HealthMonitor {
    cluster: Arc<dyn ClusterView>,
    job_id: JobId,
    root_workers: Vec<WorkerId>,
}

impl HealthMonitor {
    /// Creates a monitor over the given root-fragment workers.
    pub fn new(cluster: Arc<dyn ClusterView>, job_id: JobId, root_workers: Vec<WorkerId>) -> Self {
        Self {
            cluster,
            job_id,
            root_workers,
        }
    }

    /// Checks every root-fragment worker against the liveness view.
    ///
    /// Returns `false` on the first dead worker found, after attaching a
    /// fatal status ("worker N is down") to the job via update-if-ok.
    pub fn check(&self, status: &SharedStatus) -> bool {
        for worker_id in &self.root_workers {
            if !self.cluster.is_worker_alive(*worker_id) {
                error!(
                    job_id = %self.job_id,
                    %worker_id,
                    "root fragment worker is unreachable",
                );
                status.update_if_ok(Status::internal_error(format!(
                    "worker {worker_id} is down"
                )));
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct ScriptedCluster {
        dead: Mutex<HashSet<WorkerId>>,
    }

    impl ClusterView for ScriptedCluster {
        fn is_worker_alive(&self, worker_id: WorkerId) -> bool {
            !self.dead.lock().unwrap().contains(&worker_id)
        }
    }

    #[test]
    fn test_healthy_workers_keep_status_ok() {
        let cluster = Arc::new(ScriptedCluster {
            dead: Mutex::new(HashSet::new()),
        });
        let monitor = HealthMonitor::new(cluster, JobId(1), vec![WorkerId(1), WorkerId(2)]);
        let status = SharedStatus::new();

        assert!(monitor.check(&status));
        assert!(status.is_ok());
    }

    #[test]
    fn test_dead_worker_sets_sticky_fatal_status() {
        let cluster = Arc::new(ScriptedCluster {
            dead: Mutex::new(HashSet::from([WorkerId(2)])),
        });
        let monitor = HealthMonitor::new(cluster, JobId(1), vec![WorkerId(1), WorkerId(2)]);
        let status = SharedStatus::new();

        assert!(!monitor.check(&status));
        let fatal = status.get();
        assert!(fatal.is_fatal());
        assert_eq!(fatal.message(), "worker 2 is down");
    }
}
