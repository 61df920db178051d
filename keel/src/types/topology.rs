//! Job topology: which fragments run on which workers.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, KeelResult};
use crate::types::{FragmentId, InstanceId, QueryId, WorkerId};

/// The unit of completion tracked by the barrier: one fragment on one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkUnit {
    pub fragment_id: FragmentId,
    pub worker_id: WorkerId,
}

impl WorkUnit {
    pub fn new(fragment_id: FragmentId, worker_id: WorkerId) -> Self {
        Self {
            fragment_id,
            worker_id,
        }
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fragment {} on worker {}",
            self.fragment_id, self.worker_id
        )
    }
}

/// Assignment of one plan fragment to the workers executing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentAssignment {
    pub fragment_id: FragmentId,
    pub workers: Vec<WorkerId>,
}

/// The full set of fragment-to-worker assignments for one job execution.
///
/// Produced by an external planner; the coordinator only consumes it. The
/// root fragment is the one producing job-level output, and its workers are
/// the ones whose health gates overall completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    pub query_id: QueryId,
    pub fragments: Vec<FragmentAssignment>,
    pub root_fragment: FragmentId,
    /// All fragment instances of the job, used to seed the progress registry.
    pub instances: Vec<InstanceId>,
    /// Total number of scan ranges across all fragments.
    pub scan_range_count: u64,
}

impl Topology {
    /// Returns every (fragment, worker) pair the job executes.
    pub fn work_units(&self) -> impl Iterator<Item = WorkUnit> + '_ {
        self.fragments.iter().flat_map(|assignment| {
            assignment
                .workers
                .iter()
                .map(move |worker_id| WorkUnit::new(assignment.fragment_id, *worker_id))
        })
    }

    /// Returns the deduplicated set of workers participating in the job.
    pub fn all_workers(&self) -> Vec<WorkerId> {
        let mut workers: Vec<WorkerId> = self
            .fragments
            .iter()
            .flat_map(|assignment| assignment.workers.iter().copied())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        workers.sort();
        workers
    }

    /// Returns the workers hosting the root fragment.
    pub fn root_workers(&self) -> Vec<WorkerId> {
        self.fragments
            .iter()
            .filter(|assignment| assignment.fragment_id == self.root_fragment)
            .flat_map(|assignment| assignment.workers.iter().copied())
            .collect()
    }

    /// Validates the topology before dispatch.
    ///
    /// Rejects duplicate fragment ids, fragments with no assigned workers,
    /// duplicate workers within one fragment, and a root fragment that does
    /// not appear in the assignment list.
    pub fn validate(&self) -> KeelResult<()> {
        if self.fragments.is_empty() {
            crate::bail!(ErrorKind::InvalidTopology, "Topology has no fragments");
        }

        let mut seen_fragments = HashSet::new();
        for assignment in &self.fragments {
            if !seen_fragments.insert(assignment.fragment_id) {
                crate::bail!(
                    ErrorKind::InvalidTopology,
                    "Topology contains a duplicate fragment",
                    format!("fragment {}", assignment.fragment_id)
                );
            }

            if assignment.workers.is_empty() {
                crate::bail!(
                    ErrorKind::InvalidTopology,
                    "Fragment has no assigned workers",
                    format!("fragment {}", assignment.fragment_id)
                );
            }

            let unique_workers: HashSet<_> = assignment.workers.iter().collect();
            if unique_workers.len() != assignment.workers.len() {
                crate::bail!(
                    ErrorKind::InvalidTopology,
                    "Fragment lists a worker more than once",
                    format!("fragment {}", assignment.fragment_id)
                );
            }
        }

        if !seen_fragments.contains(&self.root_fragment) {
            crate::bail!(
                ErrorKind::InvalidTopology,
                "Root fragment is not part of the topology",
                format!("fragment {}", self.root_fragment)
            );
        }

        Ok(())
    }
}
