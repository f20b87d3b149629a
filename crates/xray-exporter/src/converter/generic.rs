// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The `user`, `metadata` and `annotations` fields.
//!
//! Everything no typed writer consumed ends up here. An indexed scalar becomes an annotation,
//! anything else goes to metadata under the `default` namespace. Resource attributes are only
//! passed in for root segments.

use std::borrow::Cow;

use crate::attributes::{Attributes, WellKnown};
use crate::model::{AttributeValue, Span};
use crate::segment::{Entries, EntryValue, Metadata};
use crate::util::sanitize_annotation_key;

use super::{Converter, ANNOTATION_RESOURCE_KEY_PREFIX, RESOURCE_KEY_PREFIX};

const ACTIVITY_DISPLAY_NAME: &str = "activity_display_name";
const ACTIVITY_OPERATION_NAME: &str = "activity_operation_name";

/// `enduser.id`, consumed when present.
pub(super) fn user<'a>(attributes: &mut Attributes<'_, 'a>) -> Option<Cow<'a, str>> {
    let user = attributes
        .get(WellKnown::EndUserId)
        .and_then(AttributeValue::to_text);
    attributes.commit();
    user
}

fn is_annotation(converter: &Converter, key: &str, value: &AttributeValue, is_resource: bool) -> bool {
    value.is_scalar() && converter.is_indexed(key, is_resource)
}

pub(super) fn metadata<'a>(
    converter: &Converter,
    attributes: &Attributes<'_, 'a>,
    resource: Option<&Attributes<'_, 'a>>,
) -> Option<Metadata<'a>> {
    let mut entries = Entries::default();
    if let Some(resource) = resource {
        for (key, value) in resource.unconsumed() {
            if !is_annotation(converter, key, value, true) {
                entries.push(format!("{RESOURCE_KEY_PREFIX}{key}"), EntryValue::Attribute(value));
            }
        }
    }
    for (key, value) in attributes.unconsumed() {
        if !is_annotation(converter, key, value, false) {
            entries.push(key, EntryValue::Attribute(value));
        }
    }
    (!entries.is_empty()).then_some(Metadata { default: entries })
}

pub(super) fn annotations<'a>(
    converter: &Converter,
    span: &'a Span,
    attributes: &Attributes<'_, 'a>,
    resource: Option<&Attributes<'_, 'a>>,
) -> Option<Entries<'a>> {
    let mut entries = Entries::default();
    if let Some(resource) = resource {
        for (key, value) in resource.unconsumed() {
            if is_annotation(converter, key, value, true) {
                let key = sanitize_annotation_key(&format!("{ANNOTATION_RESOURCE_KEY_PREFIX}{key}"));
                entries.push(key, EntryValue::Attribute(value));
            }
        }
    }
    if converter.index_activity_names {
        entries.push(ACTIVITY_DISPLAY_NAME, EntryValue::Text(&span.name));
        entries.push(ACTIVITY_OPERATION_NAME, EntryValue::Text(span.operation_name()));
    }
    for (key, value) in attributes.unconsumed() {
        if is_annotation(converter, key, value, false) {
            entries.push(sanitize_annotation_key(key), EntryValue::Attribute(value));
        }
    }
    (!entries.is_empty()).then_some(entries)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::attributes::AttributeTable;
    use crate::converter::ConverterOptions;
    use crate::model::KeyValue;
    use serde_json::json;
    use std::sync::Arc;

    struct Output {
        user: Option<String>,
        metadata: Option<serde_json::Value>,
        annotations: Option<serde_json::Value>,
    }

    fn run(
        options: ConverterOptions,
        span: &Span,
        resource_attributes: &[KeyValue],
        include_resource: bool,
    ) -> Output {
        let converter = Converter::new(options);
        let mut span_table = AttributeTable::default();
        let mut resource_table = AttributeTable::default();
        let mut attributes = span_table.bind(&span.attributes);
        let resource = resource_table.bind(resource_attributes);
        let resource_view = include_resource.then_some(&resource);

        let user = user(&mut attributes).map(Cow::into_owned);
        let metadata = metadata(&converter, &attributes, resource_view)
            .map(|metadata| serde_json::to_value(metadata).unwrap());
        let annotations = annotations(&converter, span, &attributes, resource_view)
            .map(|annotations| serde_json::to_value(annotations).unwrap());
        Output {
            user,
            metadata,
            annotations,
        }
    }

    fn span(attributes: Vec<KeyValue>) -> Span {
        Span {
            name: "GET /users".to_string(),
            operation_name: Some("Microsoft.AspNetCore.Hosting.HttpRequestIn".to_string()),
            attributes,
            ..Default::default()
        }
    }

    #[test]
    fn test_user_is_consumed() {
        let span = span(vec![
            KeyValue::new("enduser.id", "alice"),
            KeyValue::new("app.tier", "gold"),
        ]);
        let output = run(ConverterOptions::default(), &span, &[], false);
        assert_eq!(output.user.as_deref(), Some("alice"));
        assert_eq!(
            output.metadata.unwrap(),
            json!({"default": {"app.tier": "gold"}})
        );
        assert!(output.annotations.is_none());
    }

    #[test]
    fn test_explicit_index_list() {
        let span = span(vec![
            KeyValue::new("app.tenant", "acme"),
            KeyValue::new("app.retries", 3),
            KeyValue::new("app.tags", vec!["a", "b"]),
        ]);
        let resource = vec![
            KeyValue::new("host.id", "i-123"),
            KeyValue::new("service.name", "api"),
        ];
        let options = ConverterOptions {
            indexed_attributes: vec![
                "app.tenant".to_string(),
                "app.tags".to_string(),
                "otel.resource.host.id".to_string(),
            ],
            ..Default::default()
        };
        let output = run(options, &span, &resource, true);
        assert_eq!(
            output.annotations.unwrap(),
            json!({"otel_resource_host_id": "i-123", "app_tenant": "acme"})
        );
        assert_eq!(
            output.metadata.unwrap(),
            json!({"default": {
                "otel.resource.service.name": "api",
                "app.retries": 3,
                "app.tags": ["a", "b"]
            }})
        );
    }

    #[test]
    fn test_index_all_keeps_compound_values_in_metadata() {
        let span = span(vec![
            KeyValue::new("app.tenant", "acme"),
            KeyValue::new("app.tags", vec!["a"]),
        ]);
        let options = ConverterOptions {
            index_all_attributes: true,
            ..Default::default()
        };
        let output = run(options, &span, &[], false);
        assert_eq!(output.annotations.unwrap(), json!({"app_tenant": "acme"}));
        assert_eq!(
            output.metadata.unwrap(),
            json!({"default": {"app.tags": ["a"]}})
        );
    }

    #[test]
    fn test_sanitized_annotation_key_collision_keeps_first() {
        let span = span(vec![
            KeyValue::new("app.tenant", "acme"),
            KeyValue::new("app_tenant", "globex"),
        ]);
        let options = ConverterOptions {
            index_all_attributes: true,
            ..Default::default()
        };
        let output = run(options, &span, &[], false);
        assert_eq!(output.annotations.unwrap(), json!({"app_tenant": "acme"}));
        assert!(output.metadata.is_none());
    }

    #[test]
    fn test_predicate_sees_resource_flag() {
        let span = span(vec![KeyValue::new("team", "payments")]);
        let resource = vec![KeyValue::new("team", "platform")];
        let options = ConverterOptions {
            index_predicate: Some(Arc::new(|key: &str, is_resource: bool| {
                key == "team" && is_resource
            })),
            ..Default::default()
        };
        let output = run(options, &span, &resource, true);
        assert_eq!(
            output.annotations.unwrap(),
            json!({"otel_resource_team": "platform"})
        );
        assert_eq!(
            output.metadata.unwrap(),
            json!({"default": {"team": "payments"}})
        );
    }

    #[test]
    fn test_activity_names() {
        let options = ConverterOptions {
            index_activity_names: true,
            ..Default::default()
        };
        let output = run(options, &span(vec![]), &[], false);
        assert_eq!(
            output.annotations.unwrap(),
            json!({
                "activity_display_name": "GET /users",
                "activity_operation_name": "Microsoft.AspNetCore.Hosting.HttpRequestIn"
            })
        );
        assert!(output.metadata.is_none());
    }

    #[test]
    fn test_resource_skipped_without_view() {
        let resource = vec![KeyValue::new("service.name", "api")];
        let output = run(
            ConverterOptions {
                index_all_attributes: true,
                ..Default::default()
            },
            &span(vec![]),
            &resource,
            false,
        );
        assert!(output.metadata.is_none());
        assert!(output.annotations.is_none());
        assert!(output.user.is_none());
    }
}
