use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The per-iteration join wait ceiling cannot be zero.
    #[error("`join_wait_ceiling_secs` cannot be zero")]
    JoinWaitCeilingZero,
    /// The report queue must be able to hold at least one report.
    #[error("`report_queue_capacity` cannot be zero")]
    ReportQueueCapacityZero,
}
