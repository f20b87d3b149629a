// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::borrow::Cow;

use crate::attributes::{Attributes, WellKnown};
use crate::model::{KeyValue, Span, SpanKind};
use crate::segment::{Http, Request, Response};

use super::non_empty_text;

const MESSAGE_TYPE_RECEIVED: &str = "RECEIVED";

/// Pieces a request URL can be assembled from when `http.url` is absent.
#[derive(Default)]
struct UrlParts<'a> {
    url: Option<Cow<'a, str>>,
    scheme: Option<Cow<'a, str>>,
    host: Option<Cow<'a, str>>,
    target: Option<Cow<'a, str>>,
    server_name: Option<Cow<'a, str>>,
    host_name: Option<Cow<'a, str>>,
    net_host_name: Option<Cow<'a, str>>,
    net_host_port: Option<Cow<'a, str>>,
    net_peer_name: Option<Cow<'a, str>>,
    net_peer_port: Option<Cow<'a, str>>,
    net_peer_ip: Option<Cow<'a, str>>,
}

/// Builds the `http` object. Every probed key is consumed when at least one HTTP attribute is
/// present; otherwise nothing is written and the probes are rolled back.
pub(super) fn write<'a>(span: &'a Span, attributes: &mut Attributes<'_, 'a>) -> Option<Http<'a>> {
    let mut request = Request::default();
    let mut response = Response::default();
    let mut parts = UrlParts::default();
    let mut has_http = false;
    let mut has_url_attributes = false;

    if let Some(method) = attributes.get(WellKnown::HttpMethod) {
        request.method = method.to_text();
        has_http = true;
    }
    if let Some(client_ip) = attributes.get(WellKnown::HttpClientIp) {
        request.client_ip = client_ip.to_text();
        request.x_forwarded_for = Some(true);
        has_http = true;
    }
    if let Some(user_agent) = attributes.get(WellKnown::HttpUserAgent) {
        request.user_agent = user_agent.to_text();
        has_http = true;
    }
    if let Some(status) = attributes.get(WellKnown::HttpStatusCode) {
        response.status = status.as_i64();
        has_http = true;
    }
    if let Some(url) = attributes.get(WellKnown::HttpUrl) {
        parts.url = non_empty_text(Some(url));
        has_http = true;
        has_url_attributes = true;
    }
    if let Some(scheme) = attributes.get(WellKnown::HttpScheme) {
        parts.scheme = non_empty_text(Some(scheme));
        has_http = true;
    }
    if let Some(host) = attributes.get(WellKnown::HttpHost) {
        parts.host = non_empty_text(Some(host));
        has_http = true;
        has_url_attributes = true;
    }
    if let Some(target) = attributes.get(WellKnown::HttpTarget) {
        parts.target = non_empty_text(Some(target));
        has_http = true;
    }
    if let Some(server_name) = attributes.get(WellKnown::HttpServerName) {
        parts.server_name = non_empty_text(Some(server_name));
        has_http = true;
        has_url_attributes = true;
    }
    if let Some(port) = attributes.get(WellKnown::NetHostPort) {
        parts.net_host_port = non_empty_text(Some(port));
        has_http = true;
    }
    if let Some(host_name) = attributes.get(WellKnown::HostName) {
        parts.host_name = non_empty_text(Some(host_name));
        has_url_attributes = true;
    }
    if let Some(net_host_name) = attributes.get(WellKnown::NetHostName) {
        parts.net_host_name = non_empty_text(Some(net_host_name));
        has_url_attributes = true;
    }
    parts.net_peer_name = non_empty_text(attributes.get(WellKnown::NetPeerName));
    parts.net_peer_port = non_empty_text(attributes.get(WellKnown::NetPeerPort));
    if let Some(peer_ip) = attributes.get(WellKnown::NetPeerIp) {
        if request.client_ip.is_none() {
            request.client_ip = peer_ip.to_text();
        }
        parts.net_peer_ip = non_empty_text(Some(peer_ip));
        has_url_attributes = true;
    }

    if !has_http {
        attributes.rollback();
        return None;
    }

    if has_url_attributes {
        request.url = Some(match span.kind {
            SpanKind::Server => server_url(&parts),
            _ => client_url(&parts),
        });
    }

    response.content_length = match attributes.get(WellKnown::HttpResponseContentLength) {
        Some(length) => length.as_i64(),
        None => received_payload_size(span, attributes),
    };

    attributes.commit();
    Some(Http { request, response })
}

fn server_url(parts: &UrlParts<'_>) -> String {
    if let Some(url) = &parts.url {
        return url.to_string();
    }
    let (host, port) = match &parts.host {
        Some(host) => (Some(host), None),
        None => (
            parts
                .server_name
                .as_ref()
                .or(parts.net_host_name.as_ref())
                .or(parts.host_name.as_ref()),
            parts.net_host_port.as_ref(),
        ),
    };
    assemble_url(parts, host, port)
}

fn client_url(parts: &UrlParts<'_>) -> String {
    if let Some(url) = &parts.url {
        return url.to_string();
    }
    let (host, port) = match &parts.host {
        Some(host) => (Some(host), None),
        None => (
            parts.net_peer_name.as_ref().or(parts.net_peer_ip.as_ref()),
            parts.net_peer_port.as_ref(),
        ),
    };
    assemble_url(parts, host, port)
}

/// `scheme://host[:port]target`, dropping the default port of the scheme.
fn assemble_url(
    parts: &UrlParts<'_>,
    host: Option<&Cow<'_, str>>,
    port: Option<&Cow<'_, str>>,
) -> String {
    let scheme = parts.scheme.as_deref().unwrap_or("http");
    let mut url = format!("{scheme}://{}", host.map_or("", |host| &**host));
    if let Some(port) = port {
        let default_port = matches!((scheme, &**port), ("http", "80") | ("https", "443"));
        if !default_port {
            url.push(':');
            url.push_str(port);
        }
    }
    url.push_str(parts.target.as_deref().unwrap_or("/"));
    url
}

/// Payload size of a received message, read from the span attributes and then from the
/// events. The messaging attributes are left unconsumed.
fn received_payload_size(span: &Span, attributes: &Attributes<'_, '_>) -> Option<i64> {
    if attributes.peek_str(WellKnown::MessageType) == Some(MESSAGE_TYPE_RECEIVED) {
        if let Some(size) = attributes.peek(WellKnown::MessagingPayloadSize) {
            return size.as_i64();
        }
    }
    span.events
        .iter()
        .find_map(|event| received_payload_size_in(&event.attributes))
}

fn received_payload_size_in(attributes: &[KeyValue]) -> Option<i64> {
    let mut received = false;
    let mut size = None;
    for attribute in attributes {
        if attribute.key == WellKnown::MessageType.key() {
            received |= attribute.value.as_str() == Some(MESSAGE_TYPE_RECEIVED);
        } else if attribute.key == WellKnown::MessagingPayloadSize.key() {
            size = attribute.value.as_i64();
        }
    }
    if received {
        size
    } else {
        None
    }
}
