//! Remote executor adapter.
//!
//! Bridges registered operations to the provider client and maps every
//! provider-side failure into the closed `RemoteErrorKind` taxonomy. No raw
//! provider error ever crosses this boundary, and callers can rely on
//! `Throttling`/`TransientNetwork` being the only retry-eligible kinds.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{GatewayError, RemoteErrorKind, Result};
use crate::registry::OperationDescriptor;

/// A provider-side failure before classification. `code` carries the
/// provider's error code when one could be extracted (e.g. a botocore-style
/// code such as `InvalidInstanceID.NotFound`); `message` is the raw text.
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    pub code: Option<String>,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn uncoded(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderFailure>;

/// The pre-authenticated provider capability handed to the gateway at
/// construction. The core treats it as opaque: it can perform named remote
/// calls and report typed failures, nothing more.
#[async_trait]
pub trait AwsClient: Send + Sync {
    async fn call(
        &self,
        service: &str,
        operation: &str,
        region: &str,
        params: &Map<String, Value>,
    ) -> ProviderResult<Value>;
}

/// Executor bound to one registered operation. Receives the client
/// explicitly rather than through global state, plus the already-validated
/// argument mapping.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    async fn run(
        &self,
        client: &dyn AwsClient,
        args: &Map<String, Value>,
    ) -> ProviderResult<Value>;
}

/// Map a provider failure into the closed remote taxonomy.
///
/// Error codes are checked first; stderr-style substrings are the fallback
/// for failures that never reached the provider (connectivity, credential
/// file problems). Anything unmatched lands in `UnknownRemote` with the raw
/// message preserved.
pub fn classify(failure: &ProviderFailure) -> RemoteErrorKind {
    if let Some(code) = failure.code.as_deref() {
        match code {
            "Throttling"
            | "ThrottlingException"
            | "RequestLimitExceeded"
            | "TooManyRequestsException"
            | "SlowDown" => return RemoteErrorKind::Throttling,
            "AuthFailure"
            | "ExpiredToken"
            | "ExpiredTokenException"
            | "InvalidClientTokenId"
            | "UnrecognizedClientException"
            | "SignatureDoesNotMatch"
            | "MissingAuthenticationToken" => return RemoteErrorKind::Authentication,
            "AccessDenied" | "AccessDeniedException" | "UnauthorizedOperation" => {
                return RemoteErrorKind::PermissionDenied
            }
            "RequestTimeout" | "RequestTimeoutException" => {
                return RemoteErrorKind::TransientNetwork
            }
            "NoSuchBucket" | "NoSuchKey" | "NoSuchEntity" => {
                return RemoteErrorKind::ResourceNotFound
            }
            _ => {}
        }
        if code.ends_with(".NotFound") || code.ends_with("NotFoundException") {
            return RemoteErrorKind::ResourceNotFound;
        }
    }

    let message = failure.message.to_ascii_lowercase();
    if message.contains("could not connect to the endpoint url")
        || message.contains("connection refused")
        || message.contains("connection reset")
        || message.contains("connection aborted")
        || message.contains("timed out")
        || message.contains("temporary failure in name resolution")
    {
        RemoteErrorKind::TransientNetwork
    } else if message.contains("unable to locate credentials")
        || message.contains("token has expired")
        || message.contains("invalid security token")
    {
        RemoteErrorKind::Authentication
    } else {
        RemoteErrorKind::UnknownRemote
    }
}

/// Invoke the descriptor's bound executor under `timeout`.
///
/// An elapsed timeout aborts the remote call and is reported as
/// `TransientNetwork` so the caller may retry. No lock is held across the
/// await; each invocation is independent.
pub async fn execute(
    descriptor: &OperationDescriptor,
    client: &dyn AwsClient,
    args: &Map<String, Value>,
    timeout: Duration,
) -> Result<Value> {
    match tokio::time::timeout(timeout, descriptor.handler.run(client, args)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(failure)) => {
            let kind = classify(&failure);
            tracing::warn!(
                operation = %descriptor.name,
                kind = kind.as_str(),
                code = failure.code.as_deref().unwrap_or("-"),
                "remote call failed"
            );
            Err(GatewayError::remote(kind, failure.message))
        }
        Err(_) => Err(GatewayError::remote(
            RemoteErrorKind::TransientNetwork,
            format!(
                "remote call for '{}' timed out after {}ms",
                descriptor.name,
                timeout.as_millis()
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParamSchema;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn classify_by_code() {
        let cases = [
            ("Throttling", RemoteErrorKind::Throttling),
            ("RequestLimitExceeded", RemoteErrorKind::Throttling),
            ("AuthFailure", RemoteErrorKind::Authentication),
            ("ExpiredTokenException", RemoteErrorKind::Authentication),
            ("AccessDenied", RemoteErrorKind::PermissionDenied),
            ("UnauthorizedOperation", RemoteErrorKind::PermissionDenied),
            ("InvalidInstanceID.NotFound", RemoteErrorKind::ResourceNotFound),
            ("ResourceNotFoundException", RemoteErrorKind::ResourceNotFound),
            ("NoSuchBucket", RemoteErrorKind::ResourceNotFound),
            ("RequestTimeout", RemoteErrorKind::TransientNetwork),
            ("SomethingNovel", RemoteErrorKind::UnknownRemote),
        ];
        for (code, expected) in cases {
            let failure = ProviderFailure::new(Some(code.to_string()), "boom");
            assert_eq!(classify(&failure), expected, "code {code}");
        }
    }

    #[test]
    fn classify_by_message_fallback() {
        let failure =
            ProviderFailure::uncoded("Could not connect to the endpoint URL: \"https://ec2...\"");
        assert_eq!(classify(&failure), RemoteErrorKind::TransientNetwork);

        let failure = ProviderFailure::uncoded("Unable to locate credentials");
        assert_eq!(classify(&failure), RemoteErrorKind::Authentication);

        let failure = ProviderFailure::uncoded("something nobody anticipated");
        assert_eq!(classify(&failure), RemoteErrorKind::UnknownRemote);
    }

    struct FailingHandler {
        code: &'static str,
    }

    #[async_trait]
    impl OperationHandler for FailingHandler {
        async fn run(
            &self,
            _client: &dyn AwsClient,
            _args: &Map<String, Value>,
        ) -> ProviderResult<Value> {
            Err(ProviderFailure::new(
                Some(self.code.to_string()),
                "Rate exceeded",
            ))
        }
    }

    struct SlowHandler;

    #[async_trait]
    impl OperationHandler for SlowHandler {
        async fn run(
            &self,
            _client: &dyn AwsClient,
            _args: &Map<String, Value>,
        ) -> ProviderResult<Value> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(json!(null))
        }
    }

    struct NullClient;

    #[async_trait]
    impl AwsClient for NullClient {
        async fn call(
            &self,
            _service: &str,
            _operation: &str,
            _region: &str,
            _params: &Map<String, Value>,
        ) -> ProviderResult<Value> {
            Ok(json!(null))
        }
    }

    fn descriptor(handler: Arc<dyn OperationHandler>) -> OperationDescriptor {
        OperationDescriptor {
            name: "test_op".to_string(),
            description: String::new(),
            schema: ParamSchema::new(),
            handler,
        }
    }

    #[tokio::test]
    async fn consecutive_throttles_are_independent() {
        let descriptor = descriptor(Arc::new(FailingHandler { code: "Throttling" }));
        let args = Map::new();
        for _ in 0..2 {
            let err = execute(&descriptor, &NullClient, &args, Duration::from_secs(1))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), "ThrottlingError");
            assert!(err.is_retryable());
        }
    }

    #[tokio::test]
    async fn timeout_maps_to_transient_network() {
        let descriptor = descriptor(Arc::new(SlowHandler));
        let err = execute(
            &descriptor,
            &NullClient,
            &Map::new(),
            Duration::from_millis(10),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "TransientNetworkError");
        assert!(err.is_retryable());
    }
}
