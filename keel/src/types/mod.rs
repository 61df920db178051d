//! Core data types shared across the coordinator.

mod ids;
mod report;
mod status;
mod topology;

pub use ids::{FragmentId, InstanceId, JobId, QueryId, TransactionId, WorkerId};
pub use report::{
    CommitInfo, ErrorTabletInfo, InstanceReport, ReportedError, SinkCommitPayload, SinkKind,
    StatusReport,
};
pub use status::{SharedStatus, Status, StatusCode};
pub use topology::{FragmentAssignment, Topology, WorkUnit};
