//! Macros for coordinator error handling.
//!
//! Provides convenience macros for creating and returning
//! [`crate::error::KeelError`] instances with reduced boilerplate.

/// Creates a [`crate::error::KeelError`] from error kind and description.
///
/// Accepts a static description plus optional dynamic detail and an optional
/// source error.
#[macro_export]
macro_rules! keel_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::KeelError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::KeelError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::KeelError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::KeelError::from(($kind, $desc, $detail.to_string())).with_source($source)
    };
}

/// Creates and returns a [`crate::error::KeelError`] from the current function.
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return ::core::result::Result::Err($crate::keel_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::keel_error!($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::keel_error!(
            $kind,
            $desc,
            $detail,
            source: $source
        ))
    };
}
