//! Error types and result definitions for coordinator operations.
//!
//! Provides a classified error type with captured diagnostic metadata for the
//! job coordination layer. [`KeelError`] carries an [`ErrorKind`], a static
//! description, optional dynamic detail, an optional source error, and the
//! callsite location where it was created.

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for coordinator operations using [`KeelError`].
pub type KeelResult<T> = Result<T, KeelError>;

/// Specific categories of errors that can occur while coordinating a job.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Configuration errors
    ConfigError,

    // Topology & dispatch errors
    InvalidTopology,
    InvalidState,

    // Runtime failure signals
    WorkerUnreachable,
    JobCancelled,

    // External transaction errors
    UnknownTransaction,
    CommitPayloadRejected,

    // General errors
    Unknown,
}

/// Error payload holding the classified error data.
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
}

/// Main error type for coordinator operations.
#[derive(Debug, Clone)]
pub struct KeelError {
    payload: ErrorPayload,
}

impl KeelError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.payload.kind
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.payload.detail.as_deref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.payload.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the
    /// modified instance.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.payload.source = Some(Arc::new(source));
        self
    }

    /// Creates a [`KeelError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        KeelError {
            payload: ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
            },
        }
    }
}

impl PartialEq for KeelError {
    fn eq(&self, other: &KeelError) -> bool {
        self.payload.kind == other.payload.kind
    }
}

impl fmt::Display for KeelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        let location = self.payload.location;
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.payload.kind,
            self.payload.description,
            location.file(),
            location.line(),
            location.column()
        )?;

        if let Some(detail) = self.payload.detail.as_deref() {
            write!(f, "\n  Detail: {detail}")?;
        }

        Ok(())
    }
}

impl error::Error for KeelError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.payload
            .source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

/// Creates a [`KeelError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for KeelError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> KeelError {
        KeelError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`KeelError`] from an error kind, static description, and
/// dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for KeelError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> KeelError {
        KeelError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`keel_config::ValidationError`] to [`KeelError`] with
/// [`ErrorKind::ConfigError`].
impl From<keel_config::ValidationError> for KeelError {
    #[track_caller]
    fn from(err: keel_config::ValidationError) -> KeelError {
        let detail = err.to_string();
        KeelError::from_components(
            ErrorKind::ConfigError,
            Cow::Borrowed("Coordinator configuration is invalid"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_carries_kind_and_detail() {
        let err = KeelError::from((
            ErrorKind::InvalidTopology,
            "Topology rejected",
            "fragment 3 has no workers".to_string(),
        ));
        assert_eq!(err.kind(), ErrorKind::InvalidTopology);
        assert_eq!(err.detail(), Some("fragment 3 has no workers"));
    }

    #[test]
    fn test_errors_compare_by_kind() {
        let a = KeelError::from((ErrorKind::InvalidState, "first"));
        let b = KeelError::from((ErrorKind::InvalidState, "second"));
        assert_eq!(a, b);
    }
}
