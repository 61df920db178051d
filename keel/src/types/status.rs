//! Job status with sticky fatal semantics.
//!
//! A job's status starts out OK and can transition to a fatal code exactly
//! once. Later attempts to change it are dropped, so a late successful report
//! can never mask a cancellation or a detected worker failure.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Terminal or transient signal attached to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    /// The job is healthy.
    Ok,
    /// The job was cancelled by an explicit request.
    Cancelled,
    /// The job failed for an internal reason, e.g. an unreachable worker.
    InternalError,
}

/// Status value carried by a job: OK, or a fatal code with a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    code: StatusCode,
    message: String,
}

impl Status {
    /// Returns the OK status.
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: String::new(),
        }
    }

    /// Returns a cancellation status with the given reason.
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self {
            code: StatusCode::Cancelled,
            message: reason.into(),
        }
    }

    /// Returns an internal-error status with the given reason.
    pub fn internal_error(reason: impl Into<String>) -> Self {
        Self {
            code: StatusCode::InternalError,
            message: reason.into(),
        }
    }

    /// Returns the status code.
    pub fn code(&self) -> StatusCode {
        self.code
    }

    /// Returns the human-readable reason, empty for OK.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether this status is OK.
    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }

    /// Whether this status is a fatal signal.
    pub fn is_fatal(&self) -> bool {
        !self.is_ok()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            write!(f, "OK")
        } else {
            write!(f, "{:?}: {}", self.code, self.message)
        }
    }
}

/// Shared, update-if-ok handle to a job's status.
///
/// [`SharedStatus`] is mutated from report handling, health checks, and
/// cancellation, possibly in parallel. The first fatal status wins; every
/// later update is a no-op.
#[derive(Debug, Clone)]
pub struct SharedStatus {
    inner: Arc<Mutex<Status>>,
}

impl SharedStatus {
    /// Creates a new shared status in the OK state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Status::ok())),
        }
    }

    /// Replaces the status only if it is currently OK.
    ///
    /// Returns `true` if the update was applied. Updates with an OK status
    /// and updates after a fatal status has been recorded are dropped.
    pub fn update_if_ok(&self, status: Status) -> bool {
        if status.is_ok() {
            return false;
        }

        let mut current = self.inner.lock().expect("status lock poisoned");
        if current.is_ok() {
            *current = status;
            true
        } else {
            debug!(
                current = %*current,
                dropped = %status,
                "status already fatal, dropping update",
            );
            false
        }
    }

    /// Returns a point-in-time copy of the status.
    pub fn get(&self) -> Status {
        self.inner.lock().expect("status lock poisoned").clone()
    }

    /// Whether the status is still OK.
    pub fn is_ok(&self) -> bool {
        self.inner.lock().expect("status lock poisoned").is_ok()
    }
}

impl Default for SharedStatus {
    fn default() -> Self {
        Self::new()
    }
}
