// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::borrow::Cow;

use crate::attributes::{Attributes, WellKnown};
use crate::model::{Span, SpanKind};
use crate::segment::{NAMESPACE_AWS, NAMESPACE_REMOTE};
use crate::util::sanitize_segment_name;

use super::non_empty_text;

/// Picks the segment name and namespace.
///
/// Sources in priority order: `peer.service`, `aws.service`, `db.name` (with the connection
/// string host appended), the resource `service.name` for server spans, `rpc.service`,
/// `http.host`, `net.peer.name` and finally the sanitized span name. Probed span attributes are
/// only marked seen; the caller rolls them back.
pub(super) fn resolve<'a>(
    span: &'a Span,
    attributes: &mut Attributes<'_, 'a>,
    resource: &Attributes<'_, 'a>,
) -> (Cow<'a, str>, Option<&'static str>) {
    let mut namespace = None;
    if attributes.get_str(WellKnown::RpcSystem) == Some("aws-api") {
        namespace = Some(NAMESPACE_AWS);
    }

    let mut name = non_empty_text(attributes.get(WellKnown::PeerService));

    if name.is_none() {
        name = non_empty_text(attributes.get(WellKnown::AwsService));
        if name.is_some() {
            namespace.get_or_insert(NAMESPACE_AWS);
        }
    }

    if name.is_none() {
        name = non_empty_text(attributes.get(WellKnown::DbName)).map(|db_name| {
            let host = attributes
                .get_str(WellKnown::DbConnectionString)
                .and_then(connection_host);
            match host {
                Some(host) => Cow::Owned(format!("{db_name}@{host}")),
                None => db_name,
            }
        });
    }

    if name.is_none() && span.kind == SpanKind::Server {
        name = non_empty_text(resource.peek(WellKnown::ServiceName));
    }

    for fallback in [
        WellKnown::RpcService,
        WellKnown::HttpHost,
        WellKnown::NetPeerName,
    ] {
        if name.is_some() {
            break;
        }
        name = non_empty_text(attributes.get(fallback));
    }

    let name = name.unwrap_or_else(|| Cow::Owned(sanitize_segment_name(&span.name)));

    if namespace.is_none() && span.kind == SpanKind::Client {
        namespace = Some(NAMESPACE_REMOTE);
    }

    (name, namespace)
}

/// Host of an absolute connection string such as `mysql://db.example.com:3306`.
fn connection_host(connection_string: &str) -> Option<String> {
    let url = reqwest::Url::parse(connection_string).ok()?;
    url.host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_string)
}
