// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Attribute lookup table with consume tracking.
//!
//! Every semantic-convention key the converter understands gets a slot in [`WellKnown`]. An
//! [`AttributeTable`] indexes an attribute slice once, remembering which well-known slots are
//! present in a bitmask and pushing every other key onto an overflow list. Writers then probe
//! keys through [`Attributes`], which records probed keys as *seen*:
//!
//! - [`Attributes::commit`] turns every seen key into a consumed key,
//! - [`Attributes::rollback`] forgets the seen marks,
//! - [`Attributes::unconsumed`] yields what is left for annotations and metadata.
//!
//! The table stores indices rather than references so it can be pooled between conversions.

use crate::model::{AttributeValue, KeyValue};

macro_rules! well_known_keys {
    ($($variant:ident => $key:literal,)*) => {
        /// Semantic-convention attribute keys with a dedicated slot in the lookup table.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum WellKnown {
            $($variant,)*
        }

        impl WellKnown {
            pub const ALL: &'static [WellKnown] = &[$(WellKnown::$variant,)*];
            pub const COUNT: usize = Self::ALL.len();

            pub fn from_key(key: &str) -> Option<WellKnown> {
                match key {
                    $($key => Some(WellKnown::$variant),)*
                    _ => None,
                }
            }

            pub fn key(self) -> &'static str {
                match self {
                    $(WellKnown::$variant => $key,)*
                }
            }
        }
    };
}

well_known_keys! {
    // resource
    ServiceName => "service.name",
    ServiceNamespace => "service.namespace",
    ServiceInstanceId => "service.instance.id",
    ServiceVersion => "service.version",
    CloudProvider => "cloud.provider",
    CloudPlatform => "cloud.platform",
    CloudAccountId => "cloud.account.id",
    CloudAvailabilityZone => "cloud.availability_zone",
    HostId => "host.id",
    HostType => "host.type",
    HostImageId => "host.image.id",
    HostName => "host.name",
    ContainerName => "container.name",
    ContainerId => "container.id",
    ContainerImageTag => "container.image.tag",
    K8sClusterName => "k8s.cluster.name",
    K8sPodName => "k8s.pod.name",
    AwsEcsClusterArn => "aws.ecs.cluster.arn",
    AwsEcsContainerArn => "aws.ecs.container.arn",
    AwsEcsTaskArn => "aws.ecs.task.arn",
    AwsEcsTaskFamily => "aws.ecs.task.family",
    AwsEcsLaunchType => "aws.ecs.launchtype",
    AwsLogGroupNames => "aws.log.group.names",
    AwsLogGroupArns => "aws.log.group.arns",
    TelemetrySdkName => "telemetry.sdk.name",
    TelemetrySdkLanguage => "telemetry.sdk.language",
    TelemetrySdkVersion => "telemetry.sdk.version",
    TelemetryAutoVersion => "telemetry.auto.version",
    // naming
    PeerService => "peer.service",
    AwsService => "aws.service",
    RpcSystem => "rpc.system",
    RpcService => "rpc.service",
    RpcMethod => "rpc.method",
    // aws sdk calls
    AwsOperation => "aws.operation",
    AwsAccountId => "aws.account_id",
    AwsRegion => "aws.region",
    AwsRequestId => "aws.request_id",
    AwsRequestIdLegacy => "aws.requestId",
    AwsQueueUrl => "aws.queue_url",
    AwsQueueUrlLegacy => "aws.queue.url",
    AwsTableName => "aws.table_name",
    AwsTableNameLegacy => "aws.table.name",
    MessagingUrl => "messaging.url",
    AwsDynamoDbTableNames => "aws.dynamodb.table_names",
    // database
    DbSystem => "db.system",
    DbName => "db.name",
    DbConnectionString => "db.connection_string",
    DbUser => "db.user",
    DbStatement => "db.statement",
    // http
    HttpMethod => "http.method",
    HttpClientIp => "http.client_ip",
    HttpUserAgent => "http.user_agent",
    HttpStatusCode => "http.status_code",
    HttpStatusText => "http.status_text",
    HttpUrl => "http.url",
    HttpScheme => "http.scheme",
    HttpHost => "http.host",
    HttpTarget => "http.target",
    HttpServerName => "http.server_name",
    HttpResponseContentLength => "http.response_content_length",
    NetHostPort => "net.host.port",
    NetHostName => "net.host.name",
    NetPeerName => "net.peer.name",
    NetPeerPort => "net.peer.port",
    NetPeerIp => "net.peer.ip",
    MessageType => "message.type",
    MessagingPayloadSize => "messaging.message_payload_size_bytes",
    // misc
    EndUserId => "enduser.id",
    OtelStatusCode => "otel.status_code",
    ExceptionType => "exception.type",
    ExceptionMessage => "exception.message",
    ExceptionStacktrace => "exception.stacktrace",
}

const _: () = assert!(WellKnown::COUNT <= 128);

impl WellKnown {
    fn bit(self) -> u128 {
        1u128 << (self as u8)
    }
}

/// Key index over one attribute slice.
///
/// A table must be re-bound with [`AttributeTable::bind`] for every slice; binding resets
/// every mark from the previous use.
#[derive(Debug)]
pub struct AttributeTable {
    slots: [u32; WellKnown::COUNT],
    present: u128,
    seen: u128,
    consumed: u128,
    overflow: Vec<u32>,
}

impl Default for AttributeTable {
    fn default() -> Self {
        AttributeTable {
            slots: [0; WellKnown::COUNT],
            present: 0,
            seen: 0,
            consumed: 0,
            overflow: Vec::new(),
        }
    }
}

impl AttributeTable {
    /// Indexes `source` and returns a view for probing it.
    ///
    /// A repeated well-known key keeps its last value. Repeated unknown keys are all kept.
    pub fn bind<'t, 'a>(&'t mut self, source: &'a [KeyValue]) -> Attributes<'t, 'a> {
        self.clear();
        for (index, attribute) in source.iter().enumerate() {
            let index = index as u32;
            match WellKnown::from_key(&attribute.key) {
                Some(key) => {
                    self.slots[key as usize] = index;
                    self.present |= key.bit();
                }
                None => self.overflow.push(index),
            }
        }
        Attributes {
            table: self,
            source,
        }
    }

    /// Drops every mark and overflow entry while keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.present = 0;
        self.seen = 0;
        self.consumed = 0;
        self.overflow.clear();
    }
}

/// Probing view over an attribute slice bound to an [`AttributeTable`].
pub struct Attributes<'t, 'a> {
    table: &'t mut AttributeTable,
    source: &'a [KeyValue],
}

impl<'t, 'a> Attributes<'t, 'a> {
    /// Looks up a well-known key and marks it seen.
    pub fn get(&mut self, key: WellKnown) -> Option<&'a AttributeValue> {
        let value = self.peek(key)?;
        self.table.seen |= key.bit();
        Some(value)
    }

    /// Looks up a well-known key without marking it.
    pub fn peek(&self, key: WellKnown) -> Option<&'a AttributeValue> {
        if self.table.present & key.bit() == 0 {
            return None;
        }
        let source = self.source;
        source
            .get(self.table.slots[key as usize] as usize)
            .map(|attribute| &attribute.value)
    }

    /// Looks up a well-known key as text and marks it seen.
    pub fn get_str(&mut self, key: WellKnown) -> Option<&'a str> {
        self.get(key).and_then(AttributeValue::as_str)
    }

    pub fn peek_str(&self, key: WellKnown) -> Option<&'a str> {
        self.peek(key).and_then(AttributeValue::as_str)
    }

    pub fn contains(&self, key: WellKnown) -> bool {
        self.table.present & key.bit() != 0
    }

    /// Consumes every key seen since the last commit or rollback.
    pub fn commit(&mut self) {
        self.table.consumed |= self.table.seen;
        self.table.seen = 0;
    }

    /// Forgets every key seen since the last commit or rollback.
    pub fn rollback(&mut self) {
        self.table.seen = 0;
    }

    pub fn is_consumed(&self, key: WellKnown) -> bool {
        self.table.consumed & key.bit() != 0
    }

    /// The attribute slice the view was bound to.
    pub fn raw(&self) -> &'a [KeyValue] {
        self.source
    }

    /// Every attribute not consumed yet: well-known keys first, then the overflow keys in input
    /// order.
    pub fn unconsumed(&self) -> impl Iterator<Item = (&'a str, &'a AttributeValue)> + '_ {
        let source = self.source;
        let slots = &self.table.slots;
        let remaining = self.table.present & !self.table.consumed;
        let known = WellKnown::ALL
            .iter()
            .filter(move |key| remaining & key.bit() != 0)
            .map(move |key| slots[*key as usize]);
        known
            .chain(self.table.overflow.iter().copied())
            .filter_map(move |index| source.get(index as usize))
            .map(|attribute| (attribute.key.as_str(), &attribute.value))
    }
}
