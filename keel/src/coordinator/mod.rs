//! Job coordination: dispatch, report folding, health checks, and joining.

mod health;
mod load;
mod processor;
mod tasks;

pub use health::HealthMonitor;
pub use load::{LoadCoordinator, LoadReportHandler};
pub use processor::{spawn_report_pump, JobProcessor, JobState, ReportHandler};
pub use tasks::FragmentTask;
