//! Job-scoped state shared between report handling and callers.

mod context;

pub use context::{JobContext, JobContextSnapshot};
