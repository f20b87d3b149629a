// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Cloud origin and the `aws` object.
//!
//! The resource describes where the process runs (EC2, ECS, Beanstalk, EKS, App Runner) and the
//! span describes the AWS API call it made, if any. Resources from another cloud provider get
//! neither an origin nor an `aws` object.

use std::borrow::Cow;

use crate::attributes::{Attributes, WellKnown};
use crate::model::AttributeValue;
use crate::segment::{Aws, Ec2, Ecs, Eks, ElasticBeanstalk, LogGroup, XRaySdk};
use crate::util::log_group_from_arn;

use super::non_empty_text;

const PROVIDER_AWS: &str = "aws";

const PLATFORM_EC2: &str = "aws_ec2";
const PLATFORM_ECS: &str = "aws_ecs";
const PLATFORM_EKS: &str = "aws_eks";
const PLATFORM_ELASTIC_BEANSTALK: &str = "aws_elastic_beanstalk";
const PLATFORM_APP_RUNNER: &str = "aws_app_runner";

const LAUNCH_TYPE_EC2: &str = "ec2";
const LAUNCH_TYPE_FARGATE: &str = "fargate";

pub const ORIGIN_EC2: &str = "AWS::EC2::Instance";
pub const ORIGIN_ECS: &str = "AWS::ECS::Container";
pub const ORIGIN_ECS_EC2: &str = "AWS::ECS::EC2";
pub const ORIGIN_ECS_FARGATE: &str = "AWS::ECS::Fargate";
pub const ORIGIN_ELASTIC_BEANSTALK: &str = "AWS::ElasticBeanstalk::Environment";
pub const ORIGIN_EKS: &str = "AWS::EKS::Container";
pub const ORIGIN_APP_RUNNER: &str = "AWS::AppRunner::Service";

fn is_foreign_cloud(resource: &Attributes<'_, '_>) -> bool {
    resource
        .peek_str(WellKnown::CloudProvider)
        .is_some_and(|provider| !provider.is_empty() && provider != PROVIDER_AWS)
}

/// Maps the resource's cloud platform to an origin string.
pub(super) fn origin(resource: &Attributes<'_, '_>) -> Option<&'static str> {
    if is_foreign_cloud(resource) {
        return None;
    }
    match resource.peek_str(WellKnown::CloudPlatform)? {
        PLATFORM_APP_RUNNER => Some(ORIGIN_APP_RUNNER),
        PLATFORM_EKS => Some(ORIGIN_EKS),
        PLATFORM_ELASTIC_BEANSTALK => Some(ORIGIN_ELASTIC_BEANSTALK),
        PLATFORM_EC2 => Some(ORIGIN_EC2),
        PLATFORM_ECS => match resource.peek_str(WellKnown::AwsEcsLaunchType) {
            Some(LAUNCH_TYPE_EC2) => Some(ORIGIN_ECS_EC2),
            Some(LAUNCH_TYPE_FARGATE) => Some(ORIGIN_ECS_FARGATE),
            _ => Some(ORIGIN_ECS),
        },
        _ => None,
    }
}

/// Builds the `aws` object.
///
/// The span attributes describing the AWS call are consumed first, even when the resource
/// belongs to another cloud provider and nothing is written. The semantic-convention queue URL
/// and table names override the legacy keys but are only read, so they also land in metadata.
pub(super) fn write<'a>(
    attributes: &mut Attributes<'_, 'a>,
    resource: &Attributes<'_, 'a>,
    log_group_names: &'a [String],
) -> Option<Aws<'a>> {
    let operation = match attributes.get(WellKnown::AwsOperation) {
        Some(operation) => operation.to_text(),
        None => attributes.get(WellKnown::RpcMethod).and_then(AttributeValue::to_text),
    };
    // consumed even when aws.operation wins
    attributes.get(WellKnown::RpcMethod);

    let account_id = attributes
        .get(WellKnown::AwsAccountId)
        .and_then(AttributeValue::to_text);
    let region = attributes.get(WellKnown::AwsRegion).and_then(AttributeValue::to_text);
    let request_id = first_of(
        attributes,
        WellKnown::AwsRequestId,
        WellKnown::AwsRequestIdLegacy,
    );
    let mut queue_url = first_of(attributes, WellKnown::AwsQueueUrl, WellKnown::AwsQueueUrlLegacy);
    let mut table_name = first_of(
        attributes,
        WellKnown::AwsTableName,
        WellKnown::AwsTableNameLegacy,
    );
    attributes.commit();

    if is_foreign_cloud(resource) {
        return None;
    }

    if let Some(url) = attributes.peek(WellKnown::MessagingUrl) {
        queue_url = url.to_text();
    }
    if let Some(name) = attributes
        .peek(WellKnown::AwsDynamoDbTableNames)
        .and_then(single_table_name)
    {
        table_name = Some(Cow::Borrowed(name));
    }

    let text = |key: WellKnown| resource.peek(key).and_then(AttributeValue::to_text);
    let platform = resource.peek_str(WellKnown::CloudPlatform).unwrap_or_default();
    let mut aws = Aws {
        account_id: account_id.or_else(|| text(WellKnown::CloudAccountId)),
        operation,
        region,
        request_id,
        queue_url,
        table_name,
        ..Default::default()
    };

    let host_id = non_empty_text(resource.peek(WellKnown::HostId));
    if platform == PLATFORM_EC2 || host_id.is_some() {
        aws.ec2 = Some(Ec2 {
            instance_id: host_id,
            availability_zone: text(WellKnown::CloudAvailabilityZone),
            instance_size: text(WellKnown::HostType),
            ami_id: text(WellKnown::HostImageId),
        });
    }

    if platform == PLATFORM_ECS {
        aws.ecs = Some(Ecs {
            container: text(WellKnown::ContainerName),
            container_id: text(WellKnown::ContainerId),
            availability_zone: text(WellKnown::CloudAvailabilityZone),
            container_arn: text(WellKnown::AwsEcsContainerArn),
            cluster_arn: text(WellKnown::AwsEcsClusterArn),
            task_arn: text(WellKnown::AwsEcsTaskArn),
            task_family: text(WellKnown::AwsEcsTaskFamily),
            launch_type: text(WellKnown::AwsEcsLaunchType),
        });
    }

    if platform == PLATFORM_ELASTIC_BEANSTALK {
        if let Some(deployment) = non_empty_text(resource.peek(WellKnown::ServiceInstanceId)) {
            aws.elastic_beanstalk = Some(ElasticBeanstalk {
                environment_name: text(WellKnown::ServiceNamespace),
                deployment_id: deployment.trim().parse().unwrap_or(0),
                version_label: text(WellKnown::ServiceVersion),
            });
        }
    }

    let cluster_name = non_empty_text(resource.peek(WellKnown::K8sClusterName));
    if platform == PLATFORM_EKS || cluster_name.is_some() {
        aws.eks = Some(Eks {
            cluster_name,
            pod: text(WellKnown::K8sPodName),
            container_id: text(WellKnown::ContainerId),
        });
    }

    aws.cloudwatch_logs = log_groups(resource, log_group_names);
    aws.xray = sdk_info(resource);

    Some(aws)
}

/// Reads the current key, falling back to its legacy spelling. Both are marked.
fn first_of<'a>(
    attributes: &mut Attributes<'_, 'a>,
    current: WellKnown,
    legacy: WellKnown,
) -> Option<Cow<'a, str>> {
    let current = attributes.get(current);
    let legacy = attributes.get(legacy);
    current.or(legacy).and_then(AttributeValue::to_text)
}

/// `aws.dynamodb.table_names` names a single table when it is a string or a one-element array.
fn single_table_name(value: &AttributeValue) -> Option<&str> {
    match value {
        AttributeValue::String(name) => Some(name),
        AttributeValue::Array(names) if names.len() == 1 => names[0].as_str(),
        _ => None,
    }
}

/// Log groups from the resource ARNs, else the resource names, else the configured names.
fn log_groups<'a>(resource: &Attributes<'_, 'a>, configured: &'a [String]) -> Vec<LogGroup<'a>> {
    let from_arns: Vec<LogGroup<'a>> = resource
        .peek(WellKnown::AwsLogGroupArns)
        .map(string_items)
        .unwrap_or_default()
        .into_iter()
        .map(|arn| LogGroup {
            arn: Some(Cow::Borrowed(arn)),
            log_group: Cow::Borrowed(log_group_from_arn(arn)),
        })
        .collect();
    if !from_arns.is_empty() {
        return from_arns;
    }

    let from_names: Vec<LogGroup<'a>> = resource
        .peek(WellKnown::AwsLogGroupNames)
        .map(string_items)
        .unwrap_or_default()
        .into_iter()
        .map(named_log_group)
        .collect();
    if !from_names.is_empty() {
        return from_names;
    }

    configured.iter().map(|name| named_log_group(name)).collect()
}

fn named_log_group(name: &str) -> LogGroup<'_> {
    LogGroup {
        arn: None,
        log_group: Cow::Borrowed(name),
    }
}

/// The strings of an array attribute, or a lone string as a single item.
fn string_items(value: &AttributeValue) -> Vec<&str> {
    match value {
        AttributeValue::String(item) => vec![item.as_str()],
        AttributeValue::Array(items) => items.iter().filter_map(AttributeValue::as_str).collect(),
        _ => Vec::new(),
    }
}

fn sdk_info<'a>(resource: &Attributes<'_, 'a>) -> XRaySdk<'a> {
    let name = resource.peek(WellKnown::TelemetrySdkName).and_then(AttributeValue::to_text);
    let language = non_empty_text(resource.peek(WellKnown::TelemetrySdkLanguage));
    let sdk = match (name, language) {
        (Some(name), Some(language)) if !name.is_empty() => {
            Some(Cow::Owned(format!("{name} for {language}")))
        }
        (name, _) => name,
    };
    XRaySdk {
        sdk,
        sdk_version: resource
            .peek(WellKnown::TelemetrySdkVersion)
            .and_then(AttributeValue::to_text),
        auto_instrumentation: non_empty_text(resource.peek(WellKnown::TelemetryAutoVersion))
            .is_some(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::attributes::AttributeTable;
    use crate::model::KeyValue;
    use serde_json::json;

    fn origin_of(resource: Vec<KeyValue>) -> Option<&'static str> {
        let mut table = AttributeTable::default();
        let resource = table.bind(&resource);
        origin(&resource)
    }

    fn write_json(
        span_attributes: Vec<KeyValue>,
        resource_attributes: Vec<KeyValue>,
        log_group_names: &[String],
    ) -> (Option<serde_json::Value>, Vec<String>) {
        let mut span_table = AttributeTable::default();
        let mut resource_table = AttributeTable::default();
        let mut attributes = span_table.bind(&span_attributes);
        let resource = resource_table.bind(&resource_attributes);
        let aws = write(&mut attributes, &resource, log_group_names)
            .map(|aws| serde_json::to_value(aws).unwrap());
        let remaining = attributes
            .unconsumed()
            .map(|(key, _)| key.to_string())
            .collect();
        (aws, remaining)
    }

    #[test]
    fn test_origin_decision_table() {
        let platform = |platform: &str| KeyValue::new("cloud.platform", platform);
        assert_eq!(origin_of(vec![platform("aws_ec2")]), Some(ORIGIN_EC2));
        assert_eq!(origin_of(vec![platform("aws_eks")]), Some(ORIGIN_EKS));
        assert_eq!(
            origin_of(vec![platform("aws_elastic_beanstalk")]),
            Some(ORIGIN_ELASTIC_BEANSTALK)
        );
        assert_eq!(
            origin_of(vec![platform("aws_app_runner")]),
            Some(ORIGIN_APP_RUNNER)
        );
        assert_eq!(origin_of(vec![platform("aws_ecs")]), Some(ORIGIN_ECS));
        assert_eq!(
            origin_of(vec![
                platform("aws_ecs"),
                KeyValue::new("aws.ecs.launchtype", "fargate")
            ]),
            Some(ORIGIN_ECS_FARGATE)
        );
        assert_eq!(
            origin_of(vec![
                platform("aws_ecs"),
                KeyValue::new("aws.ecs.launchtype", "ec2")
            ]),
            Some(ORIGIN_ECS_EC2)
        );
        assert_eq!(origin_of(vec![platform("aws_lambda")]), None);
        assert_eq!(origin_of(vec![]), None);
        assert_eq!(
            origin_of(vec![
                KeyValue::new("cloud.provider", "gcp"),
                platform("aws_ec2")
            ]),
            None
        );
    }

    #[test]
    fn test_foreign_provider_writes_nothing() {
        let (aws, remaining) = write_json(
            vec![KeyValue::new("aws.operation", "GetItem")],
            vec![KeyValue::new("cloud.provider", "azure")],
            &[],
        );
        assert!(aws.is_none());
        assert!(remaining.is_empty());
    }

    #[test]
    fn test_ec2_resource() {
        let (aws, _) = write_json(
            vec![],
            vec![
                KeyValue::new("cloud.provider", "aws"),
                KeyValue::new("cloud.platform", "aws_ec2"),
                KeyValue::new("cloud.account.id", "123456789"),
                KeyValue::new("cloud.availability_zone", "us-east-1c"),
                KeyValue::new("host.id", "i-0123456789"),
                KeyValue::new("host.type", "m5.large"),
                KeyValue::new("host.image.id", "ami-0123"),
            ],
            &[],
        );
        assert_eq!(
            aws.unwrap(),
            json!({
                "account_id": "123456789",
                "ec2": {
                    "instance_id": "i-0123456789",
                    "availability_zone": "us-east-1c",
                    "instance_size": "m5.large",
                    "ami_id": "ami-0123"
                },
                "xray": {"auto_instrumentation": false}
            })
        );
    }

    #[test]
    fn test_ecs_and_eks_sub_objects() {
        let (aws, _) = write_json(
            vec![],
            vec![
                KeyValue::new("cloud.platform", "aws_ecs"),
                KeyValue::new("container.name", "api"),
                KeyValue::new("container.id", "abc123"),
                KeyValue::new("aws.ecs.cluster.arn", "arn:aws:ecs:us-west-2:1:cluster/main"),
                KeyValue::new("aws.ecs.launchtype", "fargate"),
                KeyValue::new("k8s.cluster.name", "prod"),
                KeyValue::new("k8s.pod.name", "api-7d9"),
            ],
            &[],
        );
        let aws = aws.unwrap();
        assert_eq!(
            aws["ecs"],
            json!({
                "container": "api",
                "container_id": "abc123",
                "cluster_arn": "arn:aws:ecs:us-west-2:1:cluster/main",
                "launch_type": "fargate"
            })
        );
        assert_eq!(
            aws["eks"],
            json!({"cluster_name": "prod", "pod": "api-7d9", "container_id": "abc123"})
        );
        assert!(aws.get("ec2").is_none());
    }

    #[test]
    fn test_elastic_beanstalk_needs_instance_id() {
        let resource = |instance_id: &str| {
            vec![
                KeyValue::new("cloud.platform", "aws_elastic_beanstalk"),
                KeyValue::new("service.namespace", "production"),
                KeyValue::new("service.instance.id", instance_id),
                KeyValue::new("service.version", "v42"),
            ]
        };
        let (aws, _) = write_json(vec![], resource("23"), &[]);
        assert_eq!(
            aws.unwrap()["elastic_beanstalk"],
            json!({"environment_name": "production", "deployment_id": 23, "version_label": "v42"})
        );

        let (aws, _) = write_json(vec![], resource("not-a-number"), &[]);
        assert_eq!(aws.unwrap()["elastic_beanstalk"]["deployment_id"], 0);

        let (aws, _) = write_json(vec![], resource(""), &[]);
        assert!(aws.unwrap().get("elastic_beanstalk").is_none());
    }

    #[test]
    fn test_log_group_sources() {
        let configured = vec!["configured".to_string()];
        let (aws, _) = write_json(
            vec![],
            vec![
                KeyValue::new(
                    "aws.log.group.arns",
                    vec!["arn:aws:logs:us-east-1:123456789123:log-group:group1:*"],
                ),
                KeyValue::new("aws.log.group.names", vec!["ignored"]),
            ],
            &configured,
        );
        assert_eq!(
            aws.unwrap()["cloudwatch_logs"],
            json!([{
                "arn": "arn:aws:logs:us-east-1:123456789123:log-group:group1:*",
                "log_group": "group1"
            }])
        );

        let (aws, _) = write_json(
            vec![],
            vec![KeyValue::new("aws.log.group.names", "single")],
            &configured,
        );
        assert_eq!(
            aws.unwrap()["cloudwatch_logs"],
            json!([{"log_group": "single"}])
        );

        let (aws, _) = write_json(vec![], vec![], &configured);
        assert_eq!(
            aws.unwrap()["cloudwatch_logs"],
            json!([{"log_group": "configured"}])
        );
    }

    #[test]
    fn test_sdk_info() {
        let (aws, _) = write_json(
            vec![],
            vec![
                KeyValue::new("telemetry.sdk.name", "opentelemetry"),
                KeyValue::new("telemetry.sdk.language", "java"),
                KeyValue::new("telemetry.sdk.version", "1.2.3"),
                KeyValue::new("telemetry.auto.version", "1.0.0"),
            ],
            &[],
        );
        assert_eq!(
            aws.unwrap()["xray"],
            json!({
                "sdk": "opentelemetry for java",
                "sdk_version": "1.2.3",
                "auto_instrumentation": true
            })
        );

        let (aws, _) = write_json(
            vec![],
            vec![KeyValue::new("telemetry.sdk.name", "opentelemetry")],
            &[],
        );
        assert_eq!(
            aws.unwrap()["xray"],
            json!({"sdk": "opentelemetry", "auto_instrumentation": false})
        );
    }

    #[test]
    fn test_span_call_attributes_are_consumed() {
        let (aws, remaining) = write_json(
            vec![
                KeyValue::new("rpc.method", "ReceiveMessage"),
                KeyValue::new("aws.region", "us-west-2"),
                KeyValue::new("aws.requestId", "req-1"),
                KeyValue::new("aws.queue_url", "https://sqs/legacy"),
                KeyValue::new("messaging.url", "https://sqs/queue"),
                KeyValue::new("aws.account_id", "987"),
                KeyValue::new("aws.table.name", "legacy-table"),
                KeyValue::new("aws.dynamodb.table_names", vec!["orders"]),
                KeyValue::new("app.flag", true),
            ],
            vec![KeyValue::new("cloud.account.id", "123")],
            &[],
        );
        let aws = aws.unwrap();
        assert_eq!(aws["account_id"], "987");
        assert_eq!(aws["operation"], "ReceiveMessage");
        assert_eq!(aws["region"], "us-west-2");
        assert_eq!(aws["request_id"], "req-1");
        assert_eq!(aws["queue_url"], "https://sqs/queue");
        assert_eq!(aws["table_name"], "orders");
        assert_eq!(
            remaining,
            vec!["messaging.url", "aws.dynamodb.table_names", "app.flag"]
        );
    }

    #[test]
    fn test_aws_operation_preferred_over_rpc_method() {
        let (aws, remaining) = write_json(
            vec![
                KeyValue::new("aws.operation", "PutItem"),
                KeyValue::new("rpc.method", "Ignored"),
                KeyValue::new("aws.dynamodb.table_names", vec!["a", "b"]),
            ],
            vec![],
            &[],
        );
        let aws = aws.unwrap();
        assert_eq!(aws["operation"], "PutItem");
        assert!(aws.get("table_name").is_none());
        assert_eq!(remaining, vec!["aws.dynamodb.table_names"]);
    }
}
