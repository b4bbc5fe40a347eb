//! Errors surfaced by backend operations.

use reqwest::StatusCode;

use crate::domain::ShapeDrift;

/// Failure of a single backend operation.
///
/// Every variant that originates from a call carries the operation label
/// used in the log line emitted when the failure happened.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Connection failure or timeout.
    #[error("{operation}: request failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response; `body` is the server body as received.
    #[error("{operation}: server returned {status}: {body}")]
    Status {
        operation: &'static str,
        status: StatusCode,
        body: String,
    },

    /// 2xx response whose body does not match the expected shape.
    #[error("{operation}: malformed response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A prediction call returned an empty array.
    #[error("{operation}: no prediction result")]
    EmptyPrediction { operation: &'static str },

    /// Response parts contradict each other.
    #[error("response shape drift: {0}")]
    ShapeDrift(#[from] ShapeDrift),

    /// Client construction or configuration failure.
    #[error("client error: {0}")]
    Client(String),
}

impl GatewayError {
    /// Operation label, when the error came from a call.
    #[must_use]
    pub const fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Transport { operation, .. }
            | Self::Status { operation, .. }
            | Self::Decode { operation, .. }
            | Self::EmptyPrediction { operation } => Some(*operation),
            Self::ShapeDrift(_) | Self::Client(_) => None,
        }
    }

    /// HTTP status of a non-2xx response.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_timeout())
    }

    /// Whether the backend could not be reached at all.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_connect() || source.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_keeps_body() {
        let err = GatewayError::Status {
            operation: "list patients",
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: r#"{"detail":"database offline"}"#.to_string(),
        };

        assert_eq!(err.operation(), Some("list patients"));
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(err.to_string().ends_with(r#"{"detail":"database offline"}"#));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_shape_drift_has_no_operation() {
        let err = GatewayError::from(ShapeDrift::NoModels);
        assert_eq!(err.operation(), None);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_empty_prediction_message() {
        let err = GatewayError::EmptyPrediction {
            operation: "predict lifestyle",
        };
        assert_eq!(err.to_string(), "predict lifestyle: no prediction result");
    }
}
