use thiserror::Error;

/// Classification of a remote-call failure.
///
/// Callers may retry `Throttling` and `TransientNetwork` (with backoff);
/// every other kind is terminal for that invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Credentials missing, expired, or rejected.
    Authentication,
    /// Rate limited by the provider.
    Throttling,
    /// The referenced entity does not exist.
    ResourceNotFound,
    /// Authenticated but not authorized for the operation.
    PermissionDenied,
    /// Connectivity failure or timeout.
    TransientNetwork,
    /// Anything we could not classify; carries the raw message for diagnostics.
    UnknownRemote,
}

impl RemoteErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Throttling | Self::TransientNetwork)
    }

    /// Wire name used in the normalized error envelope.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "AuthenticationError",
            Self::Throttling => "ThrottlingError",
            Self::ResourceNotFound => "ResourceNotFoundError",
            Self::PermissionDenied => "PermissionDeniedError",
            Self::TransientNetwork => "TransientNetworkError",
            Self::UnknownRemote => "UnknownRemoteError",
        }
    }
}

impl std::fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every failure the dispatch core can produce.
///
/// Validation variants never reach the remote call; `Remote` wraps the
/// classified outcome of one.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("operation '{0}' is already registered")]
    DuplicateOperation(String),

    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("missing required parameter '{parameter}'")]
    MissingParameter { parameter: String },

    #[error("parameter '{parameter}' expected {expected}, got {actual}")]
    TypeMismatch {
        parameter: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("unknown parameter '{parameter}'")]
    UnknownParameter { parameter: String },

    #[error("{message}")]
    Remote {
        kind: RemoteErrorKind,
        message: String,
    },
}

impl GatewayError {
    pub fn remote(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self::Remote {
            kind,
            message: message.into(),
        }
    }

    /// Wire name for the normalized error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateOperation(_) => "DuplicateOperationError",
            Self::UnknownOperation(_) => "UnknownOperationError",
            Self::MissingParameter { .. } => "MissingParameterError",
            Self::TypeMismatch { .. } => "TypeMismatchError",
            Self::UnknownParameter { .. } => "UnknownParameterError",
            Self::Remote { kind, .. } => kind.as_str(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote { kind, .. } if kind.is_retryable())
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Failures of the surrounding JSON-RPC server, distinct from the dispatch
/// taxonomy above.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(RemoteErrorKind::Throttling.is_retryable());
        assert!(RemoteErrorKind::TransientNetwork.is_retryable());
        assert!(!RemoteErrorKind::Authentication.is_retryable());
        assert!(!RemoteErrorKind::ResourceNotFound.is_retryable());
        assert!(!RemoteErrorKind::PermissionDenied.is_retryable());
        assert!(!RemoteErrorKind::UnknownRemote.is_retryable());
    }

    #[test]
    fn wire_kind_names() {
        let err = GatewayError::MissingParameter {
            parameter: "instance_id".to_string(),
        };
        assert_eq!(err.kind(), "MissingParameterError");
        assert_eq!(err.to_string(), "missing required parameter 'instance_id'");

        let err = GatewayError::remote(RemoteErrorKind::Throttling, "Rate exceeded");
        assert_eq!(err.kind(), "ThrottlingError");
        assert_eq!(err.to_string(), "Rate exceeded");
        assert!(err.is_retryable());
    }
}
