//! Per-(fragment, worker) execution task handles.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::types::WorkUnit;

/// Local handle for one fragment's execution on one worker.
///
/// Tracks whether the remote side reported completion. The flag only moves
/// from running to finished; a finished task absorbs any further reports.
#[derive(Debug)]
pub struct FragmentTask {
    unit: WorkUnit,
    finished: AtomicBool,
}

impl FragmentTask {
    /// Creates a running task for the given work unit.
    pub fn new(unit: WorkUnit) -> Self {
        Self {
            unit,
            finished: AtomicBool::new(false),
        }
    }

    /// Returns the work unit this task executes.
    pub fn unit(&self) -> WorkUnit {
        self.unit
    }

    /// Whether the remote execution has reported completion.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Marks the task finished; returns `true` on the first transition.
    pub fn mark_finished(&self) -> bool {
        !self.finished.swap(true, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FragmentId, WorkerId};

    #[test]
    fn test_finish_transitions_once() {
        let task = FragmentTask::new(WorkUnit::new(FragmentId(1), WorkerId(7)));
        assert!(!task.is_finished());
        assert!(task.mark_finished());
        assert!(!task.mark_finished());
        assert!(task.is_finished());
    }
}
