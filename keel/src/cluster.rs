//! Cluster-facing collaborator traits.
//!
//! The coordinator never reaches into ambient global state to find the
//! cluster: both the liveness view and the cancellation channel are injected
//! at construction.

use crate::types::{FragmentId, Status, WorkerId};

/// Liveness view over the cluster's workers.
///
/// Supplied by a cluster membership collaborator; the coordinator queries it
/// on every bounded join iteration instead of running a background prober.
pub trait ClusterView: Send + Sync {
    /// Whether the worker is currently reachable and alive.
    fn is_worker_alive(&self, worker_id: WorkerId) -> bool;
}

/// Outbound control channel to the workers executing a job.
pub trait WorkerClient: Send + Sync {
    /// Instructs one worker to stop executing one fragment.
    ///
    /// Best effort: implementations must not block on remote acknowledgement.
    /// The coordinator drains its local barrier regardless of delivery.
    fn cancel_fragment_execution(
        &self,
        worker_id: WorkerId,
        fragment_id: FragmentId,
        reason: &Status,
    );
}
