//! Error types for dependency resolution and message pipelines.

use thiserror::Error;

/// Boxed error used for failures raised by user-supplied code
/// (dispose hooks, serializers, handlers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Dependency injection errors
///
/// Covers both configuration-time failures (`InvalidLifetime`, `Conflict`),
/// which should abort startup, and resolution-time failures, which abort the
/// construction of whatever was being resolved.
///
/// # Examples
///
/// ```rust
/// use ferrous_flow::{DiError, Resolver, ServiceCollection};
///
/// let provider = ServiceCollection::new().build();
/// match provider.resolve::<String>() {
///     Err(DiError::NotFound(type_name)) => {
///         assert_eq!(type_name, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// Lifetime value that does not name Singleton, Scoped or Transient
    #[error("Invalid lifetime: {0}")]
    InvalidLifetime(String),
    /// Registration that contradicts itself or another registration
    #[error("Conflicting registration for {service}: {reason}")]
    Conflict {
        service: &'static str,
        reason: &'static str,
    },
    /// Provider option with a value that cannot be parsed
    #[error("Invalid value {value:?} for option {option}")]
    InvalidOption { option: &'static str, value: String },
    /// Service not registered
    #[error("Service not found: {0}")]
    NotFound(&'static str),
    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// Circular dependency detected (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<&'static str>),
    /// Invalid lifetime resolution (e.g., scoped from root)
    #[error("Lifetime error: {0}")]
    WrongLifetime(&'static str),
    /// Maximum recursion depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// Resolution attempted through a scope that was already released
    #[error("Scope {0} has been released")]
    ScopeReleased(u64),
}

/// Result type for DI operations
pub type DiResult<T> = Result<T, DiError>;

/// A single dispose hook that failed while a scope was being torn down.
#[derive(Debug, Error)]
#[error("failed to dispose {service}: {source}")]
pub struct DisposalError {
    /// Type name of the service whose hook failed
    pub service: &'static str,
    #[source]
    pub source: BoxError,
}

/// Every disposal failure collected while releasing one scope (and its
/// children). The scope is released regardless.
#[derive(Debug, Error)]
#[error("{} service(s) failed to dispose while releasing scope {scope}", .failures.len())]
pub struct ReleaseError {
    pub scope: u64,
    pub failures: Vec<DisposalError>,
}

/// Errors raised while a message travels through a middleware chain.
#[derive(Debug, Error)]
pub enum MiddlewareError {
    #[error("failed to serialize {message_type}: {source}")]
    Serialize {
        message_type: String,
        #[source]
        source: BoxError,
    },
    #[error("failed to deserialize {message_type}: {source}")]
    Deserialize {
        message_type: String,
        #[source]
        source: BoxError,
    },
    #[error("message type {0} is not known to the serializer")]
    UnknownMessageType(String),
    #[error("message has no {0} header")]
    MissingTypeHeader(&'static str),
    #[error("{middleware} expected {expected} payload")]
    UnexpectedPayload {
        middleware: &'static str,
        expected: &'static str,
    },
    #[error("compression failed: {0}")]
    Compression(#[from] std::io::Error),
    #[error("handler {handler} failed: {source}")]
    Handler {
        handler: &'static str,
        #[source]
        source: BoxError,
    },
}
