//! Error types for the agent relay
//!
//! Two families live here. [`ForwardError`] describes the ways a downstream
//! agent call can go wrong; the forwarder renders these into result strings
//! and never surfaces them as faults. [`RelayError`] covers failures in the
//! endpoint's own dispatch, which become HTTP 500 replies.

use std::backtrace::Backtrace;
use std::error::Error as _;
use std::fmt::Write as _;
use thiserror::Error;

/// Classified failure of a single downstream agent call
///
/// The `Display` output of each variant is the exact text placed into the
/// `result` field of the response envelope.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The HTTP exchange could not be completed (DNS, refused, reset, ...)
    #[error("Error en la solicitud HTTP: {details}")]
    Transport { details: String },

    /// The agent answered with a non-2xx status, or the call failed in an
    /// unexpected way
    #[error("Error al llamar al agente: {details}")]
    Agent { details: String },

    /// The agent answered 2xx but the body is not JSON
    #[error("Error al decodificar JSON: {details}. Contenido: {content}")]
    Decode { details: String, content: String },
}

impl ForwardError {
    /// Create transport error
    pub fn transport<S: Into<String>>(details: S) -> Self {
        Self::Transport {
            details: details.into(),
        }
    }

    /// Create agent error
    pub fn agent<S: Into<String>>(details: S) -> Self {
        Self::Agent {
            details: details.into(),
        }
    }

    /// Create decode error carrying the raw body
    pub fn decode<D: Into<String>, C: Into<String>>(details: D, content: C) -> Self {
        Self::Decode {
            details: details.into(),
            content: content.into(),
        }
    }

    /// Short outcome label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::Transport { .. } => "transport_error",
            ForwardError::Agent { .. } => "status_error",
            ForwardError::Decode { .. } => "decode_error",
        }
    }
}

/// Endpoint-level failure that cannot be folded into a result string
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Internal error: {message}")]
    Internal { message: String, trace: String },

    #[error("Orchestration task failed: {source}")]
    TaskFailed {
        #[source]
        source: tokio::task::JoinError,
        trace: String,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: warp::Error,
    },
}

impl RelayError {
    /// Create internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
            trace: capture_trace(),
        }
    }

    /// Stack trace recorded where the error was created, if any
    pub fn trace(&self) -> Option<&str> {
        match self {
            RelayError::Internal { trace, .. } | RelayError::TaskFailed { trace, .. } => {
                Some(trace.as_str())
            }
            RelayError::Config(_) | RelayError::Bind { .. } => None,
        }
    }
}

impl From<tokio::task::JoinError> for RelayError {
    fn from(source: tokio::task::JoinError) -> Self {
        Self::TaskFailed {
            source,
            trace: capture_trace(),
        }
    }
}

/// Always captured, whatever `RUST_BACKTRACE` says
fn capture_trace() -> String {
    Backtrace::force_capture().to_string()
}

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Render the `detail` text of an HTTP 500 reply
///
/// Format is `Error: <message>`, the source chain, then the stack trace
/// recorded when the error was created (or here, for errors that carry none).
pub fn error_detail(err: &RelayError) -> String {
    let mut detail = format!("Error: {err}\n");

    let mut source = err.source();
    while let Some(cause) = source {
        let _ = writeln!(detail, "Caused by: {cause}");
        source = cause.source();
    }

    detail.push_str("Stack backtrace:\n");
    match err.trace() {
        Some(trace) => detail.push_str(trace),
        None => detail.push_str(&capture_trace()),
    }

    detail
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn test_transport_error_message() {
        let error = ForwardError::transport("connection refused");
        assert_eq!(
            error.to_string(),
            "Error en la solicitud HTTP: connection refused"
        );
        assert_eq!(error.kind(), "transport_error");
    }

    #[test]
    fn test_agent_error_message() {
        let error = ForwardError::agent("HTTP status client error (404 Not Found)");
        assert_eq!(
            error.to_string(),
            "Error al llamar al agente: HTTP status client error (404 Not Found)"
        );
        assert_eq!(error.kind(), "status_error");
    }

    #[test]
    fn test_decode_error_includes_raw_content() {
        let error = ForwardError::decode("expected value at line 1 column 1", "not-json");
        assert_eq!(
            error.to_string(),
            "Error al decodificar JSON: expected value at line 1 column 1. Contenido: not-json"
        );
        assert_eq!(error.kind(), "decode_error");
    }

    #[test]
    fn test_internal_error_constructor() {
        let error = RelayError::internal("dispatch failed");
        assert!(matches!(error, RelayError::Internal { .. }));
        assert_eq!(error.to_string(), "Internal error: dispatch failed");
    }

    #[test]
    fn test_error_detail_starts_with_message() {
        let error = RelayError::internal("boom");
        let detail = error_detail(&error);
        assert!(detail.starts_with("Error: Internal error: boom\n"));
    }

    #[test]
    fn test_error_detail_includes_trace_without_rust_backtrace() {
        let error = RelayError::internal("boom");
        assert!(!error.trace().unwrap_or_default().is_empty());

        let detail = error_detail(&error);
        let (_, trace) = detail.split_once("Stack backtrace:\n").unwrap();
        assert!(!trace.trim().is_empty());
        assert!(detail.lines().count() > 2);
    }

    #[tokio::test]
    async fn test_join_error_carries_trace() {
        let join_error = tokio::spawn(async { panic!("task blew up") })
            .await
            .unwrap_err();
        let error = RelayError::from(join_error);

        assert!(matches!(error, RelayError::TaskFailed { .. }));
        assert!(error.trace().is_some());
        let detail = error_detail(&error);
        assert!(detail.starts_with("Error: Orchestration task failed"));
        assert!(detail.contains("Stack backtrace:\n"));
    }

    #[test]
    fn test_error_detail_walks_source_chain() {
        let error = RelayError::from(ConfigError::InvalidConfig("bad port".to_string()));
        let detail = error_detail(&error);

        assert!(detail.starts_with("Error: Configuration error: Invalid configuration: bad port"));
        assert!(detail.contains("Caused by: Invalid configuration: bad port"));
    }
}
