//! External transaction manager interface for transactional sinks.

use crate::error::KeelResult;
use crate::types::{SinkCommitPayload, TransactionId};

/// Registry of external transactions (e.g. Hive or Iceberg sinks).
///
/// The coordinator forwards sink-specific commit payloads carried by status
/// reports to the transaction that owns them; the commit itself happens
/// outside the coordinator after the job joins successfully.
pub trait TransactionManager: Send + Sync {
    /// Hands a commit payload to the transaction identified by `transaction_id`.
    ///
    /// Returns an error when the transaction is unknown or rejects the
    /// payload. Errors are absorbed and logged by the report path; they never
    /// fail the job by themselves.
    fn apply_commit_payload(
        &self,
        transaction_id: TransactionId,
        payload: &SinkCommitPayload,
    ) -> KeelResult<()>;
}
