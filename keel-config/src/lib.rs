//! Shared configuration types for the keel coordinator.
//!
//! Configuration structs are plain serde-deserializable values with explicit
//! defaults and a `validate()` step, so that a misconfigured coordinator is
//! rejected at startup rather than misbehaving at runtime.

mod base;
mod coordinator;

pub use base::ValidationError;
pub use coordinator::CoordinatorConfig;
