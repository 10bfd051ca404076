//! Built-in read-only AWS operations.
//!
//! Each operation pairs a declared parameter schema with an executor that
//! calls the provider client and flattens the raw response into a fixed
//! snake_case record shape. Callers depend only on these shapes; provider
//! field names (`Reservations`, `PublicIpAddress`, ...) stop here.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::executor::{AwsClient, OperationHandler, ProviderFailure, ProviderResult};
use crate::registry::{OperationDescriptor, OperationRegistry};
use crate::schema::{ParamSchema, ParamSpec, ParamType};

pub const DEFAULT_REGION: &str = "us-east-1";

/// Registry holding every built-in operation, with `default_region` baked
/// into the schema defaults.
pub fn builtin_registry(default_region: &str) -> Result<OperationRegistry> {
    let mut registry = OperationRegistry::new();
    registry.register(list_ec2_instances(default_region))?;
    registry.register(describe_ec2_instance(default_region))?;
    registry.register(list_s3_buckets(default_region))?;
    registry.register(list_lambda_functions(default_region))?;
    Ok(registry)
}

fn region_param(default_region: &str) -> ParamSpec {
    ParamSpec::optional(ParamType::String, json!(default_region)).describe("AWS region to query")
}

fn str_arg<'a>(args: &'a Map<String, Value>, name: &str, fallback: &'a str) -> &'a str {
    args.get(name).and_then(Value::as_str).unwrap_or(fallback)
}

// --- list_ec2_instances ---

pub fn list_ec2_instances(default_region: &str) -> OperationDescriptor {
    OperationDescriptor {
        name: "list_ec2_instances".to_string(),
        description: "List EC2 instances in a region, optionally filtered by state".to_string(),
        schema: ParamSchema::new()
            .param(
                "state",
                ParamSpec::optional(ParamType::String, json!("all")).describe(
                    "Instance state filter: running, stopped, pending, terminated, or all",
                ),
            )
            .param("region", region_param(default_region)),
        handler: Arc::new(ListEc2Instances),
    }
}

struct ListEc2Instances;

#[async_trait]
impl OperationHandler for ListEc2Instances {
    async fn run(
        &self,
        client: &dyn AwsClient,
        args: &Map<String, Value>,
    ) -> ProviderResult<Value> {
        let region = str_arg(args, "region", DEFAULT_REGION);
        let state = str_arg(args, "state", "all");

        let mut params = Map::new();
        if state != "all" {
            params.insert(
                "filters".to_string(),
                json!(format!("Name=instance-state-name,Values={state}")),
            );
        }

        let response = client
            .call("ec2", "describe-instances", region, &params)
            .await?;
        let instances = flatten_reservations(&response);
        tracing::info!(count = instances.len(), region, state, "listed EC2 instances");

        Ok(json!({
            "instances": instances,
            "count": instances.len(),
            "region": region,
            "state_filter": state,
        }))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InstanceSummary {
    pub instance_id: String,
    pub instance_type: String,
    pub state: String,
    pub launch_time: String,
    pub availability_zone: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<String>,
}

fn flatten_reservations(response: &Value) -> Vec<InstanceSummary> {
    let mut out = Vec::new();
    for reservation in array_of(response, "Reservations") {
        for instance in array_of(reservation, "Instances") {
            out.push(InstanceSummary {
                instance_id: str_field(instance, "InstanceId"),
                instance_type: str_field(instance, "InstanceType"),
                state: state_name(instance),
                launch_time: str_field(instance, "LaunchTime"),
                availability_zone: availability_zone(instance),
                name: name_tag(instance).unwrap_or_else(|| "N/A".to_string()),
                public_ip: opt_str_field(instance, "PublicIpAddress"),
                private_ip: opt_str_field(instance, "PrivateIpAddress"),
            });
        }
    }
    out
}

// --- describe_ec2_instance ---

pub fn describe_ec2_instance(default_region: &str) -> OperationDescriptor {
    OperationDescriptor {
        name: "describe_ec2_instance".to_string(),
        description: "Get detailed information about a specific EC2 instance".to_string(),
        schema: ParamSchema::new()
            .param(
                "instance_id",
                ParamSpec::required(ParamType::String).describe("The EC2 instance ID"),
            )
            .param("region", region_param(default_region)),
        handler: Arc::new(DescribeEc2Instance),
    }
}

struct DescribeEc2Instance;

#[async_trait]
impl OperationHandler for DescribeEc2Instance {
    async fn run(
        &self,
        client: &dyn AwsClient,
        args: &Map<String, Value>,
    ) -> ProviderResult<Value> {
        let region = str_arg(args, "region", DEFAULT_REGION);
        let instance_id = str_arg(args, "instance_id", "");

        let mut params = Map::new();
        params.insert("instance_ids".to_string(), json!(instance_id));

        let response = client
            .call("ec2", "describe-instances", region, &params)
            .await?;

        let instance = response
            .get("Reservations")
            .and_then(Value::as_array)
            .and_then(|reservations| reservations.first())
            .and_then(|reservation| reservation.get("Instances"))
            .and_then(Value::as_array)
            .and_then(|instances| instances.first())
            .ok_or_else(|| {
                ProviderFailure::new(
                    Some("InvalidInstanceID.NotFound".to_string()),
                    format!("Instance {instance_id} not found"),
                )
            })?;
        tracing::info!(instance_id, region, "retrieved instance details");

        Ok(json!({
            "instance": instance_detail(instance),
            "instance_id": instance_id,
            "region": region,
        }))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InstanceDetail {
    pub instance_id: String,
    pub instance_type: String,
    pub state: String,
    pub state_reason: String,
    pub launch_time: String,
    pub platform: String,
    pub architecture: String,
    pub availability_zone: String,
    pub security_groups: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<String>,
}

fn instance_detail(instance: &Value) -> InstanceDetail {
    InstanceDetail {
        instance_id: str_field(instance, "InstanceId"),
        instance_type: str_field(instance, "InstanceType"),
        state: state_name(instance),
        state_reason: instance
            .get("StateReason")
            .and_then(|r| r.get("Message"))
            .and_then(Value::as_str)
            .unwrap_or("N/A")
            .to_string(),
        launch_time: str_field(instance, "LaunchTime"),
        platform: instance
            .get("Platform")
            .and_then(Value::as_str)
            .unwrap_or("Linux/Unix")
            .to_string(),
        architecture: str_field(instance, "Architecture"),
        availability_zone: availability_zone(instance),
        security_groups: array_of(instance, "SecurityGroups")
            .iter()
            .filter_map(|sg| sg.get("GroupName").and_then(Value::as_str))
            .map(str::to_string)
            .collect(),
        vpc_id: opt_str_field(instance, "VpcId"),
        subnet_id: opt_str_field(instance, "SubnetId"),
        key_name: opt_str_field(instance, "KeyName"),
        name: name_tag(instance),
        public_ip: opt_str_field(instance, "PublicIpAddress"),
        private_ip: opt_str_field(instance, "PrivateIpAddress"),
    }
}

// --- list_s3_buckets ---

pub fn list_s3_buckets(default_region: &str) -> OperationDescriptor {
    OperationDescriptor {
        name: "list_s3_buckets".to_string(),
        description: "List S3 buckets in the account".to_string(),
        schema: ParamSchema::new().param("region", region_param(default_region)),
        handler: Arc::new(ListS3Buckets),
    }
}

struct ListS3Buckets;

#[async_trait]
impl OperationHandler for ListS3Buckets {
    async fn run(
        &self,
        client: &dyn AwsClient,
        args: &Map<String, Value>,
    ) -> ProviderResult<Value> {
        let region = str_arg(args, "region", DEFAULT_REGION);
        let response = client
            .call("s3api", "list-buckets", region, &Map::new())
            .await?;

        let buckets: Vec<BucketInfo> = array_of(&response, "Buckets")
            .iter()
            .map(|bucket| BucketInfo {
                name: str_field(bucket, "Name"),
                creation_date: str_field(bucket, "CreationDate"),
            })
            .collect();
        tracing::info!(count = buckets.len(), region, "listed S3 buckets");

        Ok(json!({
            "buckets": buckets,
            "count": buckets.len(),
            "region": region,
        }))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BucketInfo {
    pub name: String,
    pub creation_date: String,
}

// --- list_lambda_functions ---

pub fn list_lambda_functions(default_region: &str) -> OperationDescriptor {
    OperationDescriptor {
        name: "list_lambda_functions".to_string(),
        description: "List Lambda functions in a region".to_string(),
        schema: ParamSchema::new().param("region", region_param(default_region)),
        handler: Arc::new(ListLambdaFunctions),
    }
}

struct ListLambdaFunctions;

#[async_trait]
impl OperationHandler for ListLambdaFunctions {
    async fn run(
        &self,
        client: &dyn AwsClient,
        args: &Map<String, Value>,
    ) -> ProviderResult<Value> {
        let region = str_arg(args, "region", DEFAULT_REGION);
        let response = client
            .call("lambda", "list-functions", region, &Map::new())
            .await?;

        let functions: Vec<FunctionInfo> = array_of(&response, "Functions")
            .iter()
            .map(|function| FunctionInfo {
                function_name: str_field(function, "FunctionName"),
                runtime: str_field(function, "Runtime"),
                handler: str_field(function, "Handler"),
                last_modified: str_field(function, "LastModified"),
            })
            .collect();
        tracing::info!(count = functions.len(), region, "listed Lambda functions");

        Ok(json!({
            "functions": functions,
            "count": functions.len(),
            "region": region,
        }))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FunctionInfo {
    pub function_name: String,
    pub runtime: String,
    pub handler: String,
    pub last_modified: String,
}

// --- shared field extraction ---

fn array_of<'a>(value: &'a Value, key: &str) -> Vec<&'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().collect())
        .unwrap_or_default()
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn opt_str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn state_name(instance: &Value) -> String {
    instance
        .get("State")
        .and_then(|s| s.get("Name"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn availability_zone(instance: &Value) -> String {
    instance
        .get("Placement")
        .and_then(|p| p.get("AvailabilityZone"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn name_tag(instance: &Value) -> Option<String> {
    for tag in array_of(instance, "Tags") {
        if tag.get("Key").and_then(Value::as_str) == Some("Name") {
            return tag.get("Value").and_then(Value::as_str).map(str::to_string);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_reservations() -> Value {
        json!({
            "Reservations": [{
                "Instances": [{
                    "InstanceId": "i-1234567890abcdef0",
                    "InstanceType": "t3.micro",
                    "State": {"Name": "running"},
                    "LaunchTime": "2023-01-01T12:00:00+00:00",
                    "Placement": {"AvailabilityZone": "us-east-1a"},
                    "Architecture": "x86_64",
                    "SecurityGroups": [{"GroupName": "web", "GroupId": "sg-1"}],
                    "VpcId": "vpc-1",
                    "SubnetId": "subnet-1",
                    "PublicIpAddress": "1.2.3.4",
                    "PrivateIpAddress": "10.0.1.10",
                    "Tags": [
                        {"Key": "env", "Value": "prod"},
                        {"Key": "Name", "Value": "web-1"}
                    ]
                }, {
                    "InstanceId": "i-0987654321fedcba0",
                    "InstanceType": "t3.small",
                    "State": {"Name": "stopped"},
                    "LaunchTime": "2023-01-02T10:30:00+00:00",
                    "Placement": {"AvailabilityZone": "us-east-1b"},
                    "Architecture": "arm64",
                    "SecurityGroups": [],
                    "PrivateIpAddress": "10.0.1.20"
                }]
            }]
        })
    }

    #[test]
    fn reservations_flattened_to_summaries() {
        let instances = flatten_reservations(&sample_reservations());
        assert_eq!(instances.len(), 2);

        let first = &instances[0];
        assert_eq!(first.instance_id, "i-1234567890abcdef0");
        assert_eq!(first.state, "running");
        assert_eq!(first.availability_zone, "us-east-1a");
        assert_eq!(first.name, "web-1");
        assert_eq!(first.public_ip.as_deref(), Some("1.2.3.4"));

        let second = &instances[1];
        assert_eq!(second.name, "N/A");
        assert_eq!(second.public_ip, None);
        assert_eq!(second.private_ip.as_deref(), Some("10.0.1.20"));
    }

    #[test]
    fn summary_serialization_omits_absent_ips() {
        let instances = flatten_reservations(&sample_reservations());
        let wire = serde_json::to_value(&instances[1]).unwrap();
        assert!(wire.get("public_ip").is_none());
        assert_eq!(wire["private_ip"], "10.0.1.20");
        // no provider field names leak
        assert!(wire.get("InstanceId").is_none());
    }

    #[test]
    fn detail_defaults_for_missing_optional_fields() {
        let binding = sample_reservations();
        let instance = &binding["Reservations"][0]["Instances"][1];
        let detail = instance_detail(instance);
        assert_eq!(detail.state_reason, "N/A");
        assert_eq!(detail.platform, "Linux/Unix");
        assert_eq!(detail.name, None);
        assert_eq!(detail.vpc_id, None);
        assert!(detail.security_groups.is_empty());
    }

    #[test]
    fn detail_extracts_security_groups_and_tags() {
        let binding = sample_reservations();
        let instance = &binding["Reservations"][0]["Instances"][0];
        let detail = instance_detail(instance);
        assert_eq!(detail.security_groups, vec!["web".to_string()]);
        assert_eq!(detail.name.as_deref(), Some("web-1"));
        assert_eq!(detail.vpc_id.as_deref(), Some("vpc-1"));
        assert_eq!(detail.architecture, "x86_64");
    }

    #[test]
    fn builtin_registry_contains_all_operations() {
        let registry = builtin_registry(DEFAULT_REGION).unwrap();
        assert_eq!(registry.len(), 4);
        for name in [
            "list_ec2_instances",
            "describe_ec2_instance",
            "list_s3_buckets",
            "list_lambda_functions",
        ] {
            assert!(registry.lookup(name).is_ok(), "missing {name}");
        }
    }

    #[test]
    fn region_default_follows_construction() {
        let descriptor = list_s3_buckets("eu-central-1");
        let coerced = descriptor.schema.validate(&Map::new()).unwrap();
        assert_eq!(coerced.get("region"), Some(&json!("eu-central-1")));
    }
}
