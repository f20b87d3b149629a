// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! X-Ray segment document.
//!
//! The structs borrow from the span and resource being converted and only live for the
//! duration of one conversion. Field order matches the order in which X-Ray documents are
//! usually written: identity first, then the typed sub-objects, then user data.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::borrow::Cow;

use crate::model::AttributeValue;
use crate::stacktrace::ExceptionRecord;

pub const SEGMENT_TYPE_SUBSEGMENT: &str = "subsegment";
pub const NAMESPACE_AWS: &str = "aws";
pub const NAMESPACE_REMOTE: &str = "remote";

#[derive(Debug, Serialize)]
pub struct Segment<'a> {
    pub name: Cow<'a, str>,
    pub id: String,
    pub trace_id: String,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<&'static str>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub segment_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<Http<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Cause>,
    pub error: bool,
    pub throttle: bool,
    pub fault: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws: Option<Aws<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<Service<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<Sql<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Entries<'a>>,
}

impl<'a> Segment<'a> {
    /// A segment with identity fields only; every optional part is absent.
    pub fn new(name: Cow<'a, str>, id: String, trace_id: String) -> Self {
        Segment {
            name,
            id,
            trace_id,
            start_time: 0.0,
            end_time: 0.0,
            parent_id: None,
            namespace: None,
            segment_type: None,
            http: None,
            cause: None,
            error: false,
            throttle: false,
            fault: false,
            origin: None,
            aws: None,
            service: None,
            sql: None,
            user: None,
            metadata: None,
            annotations: None,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct Http<'a> {
    #[serde(skip_serializing_if = "Request::is_empty")]
    pub request: Request<'a>,
    #[serde(skip_serializing_if = "Response::is_empty")]
    pub response: Response,
}

#[derive(Debug, Default, Serialize)]
pub struct Request<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_forwarded_for: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<Cow<'a, str>>,
}

impl Request<'_> {
    pub fn is_empty(&self) -> bool {
        self.x_forwarded_for.is_none()
            && self.method.is_none()
            && self.url.is_none()
            && self.user_agent.is_none()
            && self.client_ip.is_none()
    }
}

#[derive(Debug, Default, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<i64>,
}

impl Response {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.content_length.is_none()
    }
}

#[derive(Debug, Serialize)]
pub struct Cause {
    pub exceptions: Vec<ExceptionRecord>,
}

#[derive(Debug, Default, Serialize)]
pub struct Aws<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ec2: Option<Ec2<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ecs: Option<Ecs<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elastic_beanstalk: Option<ElasticBeanstalk<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eks: Option<Eks<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cloudwatch_logs: Vec<LogGroup<'a>>,
    pub xray: XRaySdk<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_url: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<Cow<'a, str>>,
}

#[derive(Debug, Default, Serialize)]
pub struct Ec2<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_size: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ami_id: Option<Cow<'a, str>>,
}

#[derive(Debug, Default, Serialize)]
pub struct Ecs<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_arn: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_arn: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_arn: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_family: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_type: Option<Cow<'a, str>>,
}

#[derive(Debug, Default, Serialize)]
pub struct ElasticBeanstalk<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_name: Option<Cow<'a, str>>,
    pub deployment_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_label: Option<Cow<'a, str>>,
}

#[derive(Debug, Default, Serialize)]
pub struct Eks<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<Cow<'a, str>>,
}

#[derive(Debug, Serialize)]
pub struct LogGroup<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<Cow<'a, str>>,
    pub log_group: Cow<'a, str>,
}

#[derive(Debug, Default, Serialize)]
pub struct XRaySdk<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk_version: Option<Cow<'a, str>>,
    pub auto_instrumentation: bool,
}

#[derive(Debug, Serialize)]
pub struct Service<'a> {
    pub version: Cow<'a, str>,
}

#[derive(Debug, Serialize)]
pub struct Sql<'a> {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_type: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitized_query: Option<Cow<'a, str>>,
}

/// Metadata is nested under the `default` namespace.
#[derive(Debug, Serialize)]
pub struct Metadata<'a> {
    pub default: Entries<'a>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum EntryValue<'a> {
    Attribute(&'a AttributeValue),
    Text(&'a str),
}

/// Ordered key/value pairs written as a JSON object. The first value pushed for a key wins.
#[derive(Debug, Default)]
pub struct Entries<'a>(Vec<(Cow<'a, str>, EntryValue<'a>)>);

impl<'a> Entries<'a> {
    /// Appends `key` unless it is already present.
    pub fn push(&mut self, key: impl Into<Cow<'a, str>>, value: EntryValue<'a>) {
        let key = key.into();
        if self.0.iter().any(|(existing, _)| *existing == key) {
            return;
        }
        self.0.push((key, value));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Entries<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
