//! Macros for outbox error handling.
//!
//! Provides convenience macros for creating and returning
//! [`crate::error::OutboxError`] instances with reduced boilerplate.

/// Creates an [`crate::error::OutboxError`] from error kind and description.
///
/// Supports an optional dynamic detail (use `detail =` to move an owned
/// [`String`]) and an optional source error.
#[macro_export]
macro_rules! outbox_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::OutboxError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::OutboxError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, detail = $detail:expr) => {
        $crate::error::OutboxError::from(($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, detail = $detail:expr, source: $source:expr) => {
        $crate::error::OutboxError::from(($kind, $desc, $detail)).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::OutboxError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::OutboxError::from(($kind, $desc, $detail.to_string())).with_source($source)
    };
}

/// Creates and returns an [`crate::error::OutboxError`] from the current function.
///
/// Combines error creation with early return for conditions that should
/// immediately terminate execution. Supports the same optional detail and
/// source arguments as [`outbox_error!`].
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return ::core::result::Result::Err($crate::outbox_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::outbox_error!($kind, $desc, source: $source))
    };
    ($kind:expr, $desc:expr, detail = $detail:expr) => {
        return ::core::result::Result::Err($crate::outbox_error!($kind, $desc, detail = $detail))
    };
    ($kind:expr, $desc:expr, detail = $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::outbox_error!(
            $kind,
            $desc,
            detail = $detail,
            source: $source
        ))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::outbox_error!($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::outbox_error!(
            $kind,
            $desc,
            $detail,
            source: $source
        ))
    };
}
