//! Error types and result definitions for outbox operations.
//!
//! Provides an error system with classification and captured diagnostic
//! metadata for outbox synchronization and producer lifecycle operations. The
//! [`OutboxError`] type carries a kind, a static description, optional dynamic
//! detail, and an optional source error.

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for outbox operations using [`OutboxError`] as the error type.
pub type OutboxResult<T> = Result<T, OutboxError>;

/// Detailed payload stored inside an [`OutboxError`].
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
}

/// Main error type for outbox operations.
///
/// [`OutboxError`] captures the error category, a human readable description,
/// optional dynamic detail, the originating error when there is one, and the
/// callsite location for debugging.
#[derive(Debug, Clone)]
pub struct OutboxError {
    payload: ErrorPayload,
}

/// Specific categories of errors that can occur during outbox operations.
///
/// Error kinds are organized by functional area and failure mode so callers
/// can choose an appropriate handling strategy.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Durable store errors
    SourceConnectionFailed,
    SourceQueryFailed,

    // Cache errors
    CacheConnectionFailed,
    CacheScriptFailed,
    CacheOperationFailed,

    // Data errors
    SerializationError,
    DeserializationError,

    // Configuration errors
    ConfigError,

    // Producer lifecycle errors
    ProducerNotInitialized,
    ProducerStartFailed,
    PublishFailed,
    PublishTimeout,
    BrokerUnreachable,

    // State and workflow errors
    InvalidState,
    PollerWorkerPanic,

    // Unknown / uncategorized
    Unknown,
}

impl OutboxError {
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
    ///
    /// The stored source is preserved across clones and exposed via
    /// [`error::Error::source`].
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.payload.source = Some(Arc::new(source));
        self
    }

    /// Creates an [`OutboxError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        let location = Location::caller();

        OutboxError {
            payload: ErrorPayload {
                kind,
                description,
                detail,
                source,
                location,
            },
        }
    }
}

impl PartialEq for OutboxError {
    fn eq(&self, other: &OutboxError) -> bool {
        self.payload.kind == other.payload.kind
    }
}

impl Hash for OutboxError {
    /// Hashes the error using only its stable identifying components.
    ///
    /// Only the error kind and static description participate, intentionally
    /// excluding location, detail, and source, so errors of the same category
    /// produce the same hash across occurrences.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.payload.kind.hash(state);
        self.payload.description.hash(state);
    }
}

impl fmt::Display for OutboxError {
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
            if detail.trim().is_empty() {
                write!(f, "\n  Detail: <empty>")?;
            } else {
                write!(f, "\n  Detail:")?;
                for line in detail.lines() {
                    write!(f, "\n    {line}")?;
                }
            }
        }

        Ok(())
    }
}

impl error::Error for OutboxError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.payload
            .source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

/// Creates an [`OutboxError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for OutboxError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> OutboxError {
        OutboxError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates an [`OutboxError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for OutboxError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> OutboxError {
        OutboxError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`sqlx::Error`] to [`OutboxError`] with the appropriate error kind.
///
/// Connection establishment failures map to [`ErrorKind::SourceConnectionFailed`],
/// everything else to [`ErrorKind::SourceQueryFailed`].
impl From<sqlx::Error> for OutboxError {
    #[track_caller]
    fn from(err: sqlx::Error) -> OutboxError {
        let detail = err.to_string();
        let kind = match &err {
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut => {
                ErrorKind::SourceConnectionFailed
            }
            _ => ErrorKind::SourceQueryFailed,
        };
        OutboxError::from_components(
            kind,
            Cow::Borrowed("A database operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`fred::error::Error`] to [`OutboxError`] with [`ErrorKind::CacheOperationFailed`].
impl From<fred::error::Error> for OutboxError {
    #[track_caller]
    fn from(err: fred::error::Error) -> OutboxError {
        let detail = err.to_string();
        OutboxError::from_components(
            ErrorKind::CacheOperationFailed,
            Cow::Borrowed("A cache operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`serde_json::Error`] to [`OutboxError`] with the appropriate error kind.
impl From<serde_json::Error> for OutboxError {
    #[track_caller]
    fn from(err: serde_json::Error) -> OutboxError {
        let detail = err.to_string();
        let kind = if err.is_data() || err.is_syntax() || err.is_eof() {
            ErrorKind::DeserializationError
        } else {
            ErrorKind::SerializationError
        };
        OutboxError::from_components(
            kind,
            Cow::Borrowed("A JSON conversion failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`rdkafka::error::KafkaError`] to [`OutboxError`] with [`ErrorKind::PublishFailed`].
impl From<rdkafka::error::KafkaError> for OutboxError {
    #[track_caller]
    fn from(err: rdkafka::error::KafkaError) -> OutboxError {
        let detail = err.to_string();
        OutboxError::from_components(
            ErrorKind::PublishFailed,
            Cow::Borrowed("A broker operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_exposes_kind_and_detail() {
        let err = OutboxError::from((
            ErrorKind::CacheScriptFailed,
            "Failed to load cache script",
            "NOSCRIPT No matching script".to_string(),
        ));

        assert_eq!(err.kind(), ErrorKind::CacheScriptFailed);
        assert_eq!(err.detail(), Some("NOSCRIPT No matching script"));
    }

    #[test]
    fn errors_compare_by_kind() {
        let a = OutboxError::from((ErrorKind::InvalidState, "one"));
        let b = OutboxError::from((ErrorKind::InvalidState, "two"));
        let c = OutboxError::from((ErrorKind::Unknown, "one"));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn display_includes_kind_and_location() {
        let err = OutboxError::from((ErrorKind::PublishTimeout, "Publish timed out"));
        let rendered = err.to_string();

        assert!(rendered.contains("PublishTimeout"));
        assert!(rendered.contains("error.rs"));
    }

    #[test]
    fn source_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = OutboxError::from((ErrorKind::Unknown, "wrapped")).with_source(io);

        assert!(error::Error::source(&err).is_some());
    }
}
