//! Dispatch gateway: the sole public entry point of the core.
//!
//! Per invocation the pipeline runs lookup, validation, remote execution,
//! and normalization in order, short-circuiting on the first failure. The
//! gateway never retries; retry of billed operations is a caller decision.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::executor::{self, AwsClient};
use crate::normalize::NormalizedResult;
use crate::registry::OperationRegistry;

pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(60);

/// One incoming tool call: an operation name and its raw arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolInvocationRequest {
    pub operation: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

pub struct DispatchGateway {
    registry: Arc<OperationRegistry>,
    client: Arc<dyn AwsClient>,
    remote_timeout: Duration,
}

impl DispatchGateway {
    pub fn new(registry: Arc<OperationRegistry>, client: Arc<dyn AwsClient>) -> Self {
        Self {
            registry,
            client,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }

    /// Override the timeout applied to each remote call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Run one invocation through the pipeline. Always produces exactly one
    /// [`NormalizedResult`], success or error, never both and never neither.
    pub async fn dispatch(&self, request: &ToolInvocationRequest) -> NormalizedResult {
        match self.try_dispatch(request).await {
            Ok(data) => NormalizedResult::ok(data),
            Err(err) => {
                tracing::warn!(
                    operation = %request.operation,
                    kind = err.kind(),
                    "dispatch failed: {err}"
                );
                NormalizedResult::from(err)
            }
        }
    }

    async fn try_dispatch(&self, request: &ToolInvocationRequest) -> Result<Value> {
        let descriptor = self.registry.lookup(&request.operation)?;
        let args = descriptor.schema.validate(&request.arguments)?;
        tracing::debug!(operation = %descriptor.name, "validated, executing remote call");
        executor::execute(&descriptor, self.client.as_ref(), &args, self.remote_timeout).await
    }
}
