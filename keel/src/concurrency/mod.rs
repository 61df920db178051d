//! Concurrency utilities for tracking distributed job completion.

mod barrier;

pub use barrier::{BarrierWaitResult, WorkUnitBarrier};
