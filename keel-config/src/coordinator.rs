use serde::Deserialize;

use crate::base::ValidationError;

const fn default_join_wait_ceiling_secs() -> u64 {
    30
}

const fn default_report_queue_capacity() -> usize {
    1024
}

/// Configuration for a job coordinator.
///
/// Contains the settings that shape the completion-tracking loop: how long a
/// single bounded wait slice inside `join` may last before worker health is
/// re-checked, and how many in-flight status reports the report pump buffers.
#[derive(Clone, Debug, Deserialize)]
pub struct CoordinatorConfig {
    /// Upper bound, in seconds, of a single wait slice inside `join`.
    ///
    /// A dead worker is noticed at most this many seconds after it stops
    /// reporting, regardless of the caller-supplied join timeout.
    #[serde(default = "default_join_wait_ceiling_secs")]
    pub join_wait_ceiling_secs: u64,
    /// Capacity of the buffered channel feeding reports into the processor.
    #[serde(default = "default_report_queue_capacity")]
    pub report_queue_capacity: usize,
}

impl CoordinatorConfig {
    /// Validates coordinator configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.join_wait_ceiling_secs == 0 {
            return Err(ValidationError::JoinWaitCeilingZero);
        }

        if self.report_queue_capacity == 0 {
            return Err(ValidationError::ReportQueueCapacityZero);
        }

        Ok(())
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            join_wait_ceiling_secs: default_join_wait_ceiling_secs(),
            report_queue_capacity: default_report_queue_capacity(),
        }
    }
}
