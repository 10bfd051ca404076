//! AWS CLI-backed implementation of [`AwsClient`].
//!
//! Shells out to `aws <service> <operation> --output json` and hands the
//! parsed response back. A non-zero exit becomes a [`ProviderFailure`]
//! carrying the error code parsed from the CLI's stderr, so the executor
//! adapter can classify it.

use std::collections::HashMap;
use std::process::Stdio;

use async_trait::async_trait;
use bstr::ByteSlice;
use convert_case::{Case, Casing};
use eyre::WrapErr;
use serde_json::{Map, Value};

use crate::executor::{AwsClient, ProviderFailure, ProviderResult};
use crate::MAX_TOOL_RESPONSE_SIZE;

/// The environment variable name where we set additional metadata for the AWS CLI user agent.
const USER_AGENT_ENV_VAR: &str = "AWS_EXECUTION_ENV";
const USER_AGENT_APP_NAME: &str = "AwsMcp-Gateway";
const USER_AGENT_VERSION_KEY: &str = "Version";
const USER_AGENT_VERSION_VALUE: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Default)]
pub struct CliClient {
    profile: Option<String>,
}

impl CliClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(profile: impl Into<String>) -> Self {
        Self {
            profile: Some(profile.into()),
        }
    }

    async fn invoke(
        &self,
        service: &str,
        operation: &str,
        region: &str,
        params: &Map<String, Value>,
    ) -> eyre::Result<std::process::Output> {
        let mut command = tokio::process::Command::new("aws");

        let mut env_vars: HashMap<String, String> = std::env::vars().collect();
        let user_agent_metadata_value = format!(
            "{} {}/{}",
            USER_AGENT_APP_NAME, USER_AGENT_VERSION_KEY, USER_AGENT_VERSION_VALUE
        );
        match env_vars.get(USER_AGENT_ENV_VAR) {
            Some(existing) if !existing.is_empty() => {
                env_vars.insert(
                    USER_AGENT_ENV_VAR.to_string(),
                    format!("{} {}", existing, user_agent_metadata_value),
                );
            }
            _ => {
                env_vars.insert(USER_AGENT_ENV_VAR.to_string(), user_agent_metadata_value);
            }
        }

        command
            .envs(env_vars)
            .arg("--region")
            .arg(region)
            .arg("--output")
            .arg("json");
        if let Some(profile) = self.profile.as_deref() {
            command.arg("--profile").arg(profile);
        }
        command.arg(service).arg(operation);
        for (name, val) in cli_parameters(params) {
            command.arg(name);
            if !val.is_empty() {
                command.arg(val);
            }
        }

        command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .wrap_err_with(|| format!("unable to spawn 'aws {service} {operation}'"))?
            .wait_with_output()
            .await
            .wrap_err_with(|| format!("unable to run 'aws {service} {operation}'"))
    }
}

#[async_trait]
impl AwsClient for CliClient {
    async fn call(
        &self,
        service: &str,
        operation: &str,
        region: &str,
        params: &Map<String, Value>,
    ) -> ProviderResult<Value> {
        tracing::debug!(service, operation, region, "invoking aws cli");

        let output = self
            .invoke(service, operation, region, params)
            .await
            .map_err(|e| ProviderFailure::uncoded(format!("{e:#}")))?;

        if output.status.success() {
            let stdout = output.stdout.to_str_lossy();
            if stdout.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&stdout).map_err(|e| {
                ProviderFailure::uncoded(format!("unparseable response from aws cli: {e}"))
            })
        } else {
            let stderr = output.stderr.to_str_lossy();
            let stderr = truncate(&stderr, MAX_TOOL_RESPONSE_SIZE / 3);
            Err(ProviderFailure::new(
                parse_error_code(&stderr),
                stderr.trim().to_string(),
            ))
        }
    }
}

/// Returns the CLI arguments properly formatted as kebab case.
fn cli_parameters(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (param_name, val) in params {
        let param_name = format!(
            "--{}",
            param_name.trim_start_matches("--").to_case(Case::Kebab)
        );
        let param_val = val.as_str().map(|s| s.to_string()).unwrap_or(val.to_string());
        out.push((param_name, param_val));
    }
    out
}

/// Extract the botocore error code from CLI stderr, e.g.
/// `An error occurred (InvalidInstanceID.NotFound) when calling the ...`.
fn parse_error_code(stderr: &str) -> Option<String> {
    const MARKER: &str = "An error occurred (";
    let start = stderr.find(MARKER)? + MARKER.len();
    let rest = &stderr[start..];
    let end = rest.find(')')?;
    let code = &rest[..end];
    if code.is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.len() > limit {
        let mut end = limit;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{} ... truncated", &text[..end])
    } else {
        text.to_string()
    }
}
