// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Span to X-Ray segment conversion.
//!
//! [`Converter::convert`] binds the span and resource attributes to pooled lookup tables and
//! runs the writers in document order: name resolution, HTTP, cause, origin, AWS, service,
//! SQL and finally the generic user, metadata and annotation pass. Each writer either commits
//! the span attributes it interpreted or rolls them back, so the generic pass only sees what no
//! typed sub-object claimed. Resource attributes are never consumed.

mod aws;
mod cause;
mod generic;
mod http;
mod name;
mod service;
mod sql;

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{error, warn};

use crate::model::{AttributeValue, Resource, Span, SpanKind};
use crate::pool::{Scratch, ScratchPool};
use crate::segment::{Segment, SEGMENT_TYPE_SUBSEGMENT};
use crate::trace_id::{format_span_id, is_valid_xray_trace_id, to_xray_trace_id};

pub use cause::{classify_status_code, StatusFlags};

/// Prefix of resource attribute keys in metadata and in the indexed attribute list.
pub const RESOURCE_KEY_PREFIX: &str = "otel.resource.";

/// Prefix of resource attribute keys in annotations.
pub const ANNOTATION_RESOURCE_KEY_PREFIX: &str = "otel_resource_";

/// Number of scratch values kept for reuse between conversions.
const SCRATCH_POOL_CAPACITY: usize = 16;

/// Decides whether an attribute is indexed. Receives the key and whether it belongs to the
/// resource.
pub type IndexPredicate = Arc<dyn Fn(&str, bool) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct ConverterOptions {
    /// Keys written as annotations. Resource keys carry the `otel.resource.` prefix.
    pub indexed_attributes: Vec<String>,
    pub index_predicate: Option<IndexPredicate>,
    pub index_all_attributes: bool,
    /// Adds the span display and operation names as annotations.
    pub index_activity_names: bool,
    pub validate_trace_id: bool,
    /// Log groups attached when the resource declares none.
    pub log_group_names: Vec<String>,
}

impl ConverterOptions {
    /// Sets the predicate consulted for keys missing from the indexed attribute list.
    pub fn with_index_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str, bool) -> bool + Send + Sync + 'static,
    {
        self.index_predicate = Some(Arc::new(predicate));
        self
    }
}

impl fmt::Debug for ConverterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterOptions")
            .field("indexed_attributes", &self.indexed_attributes)
            .field("index_predicate", &self.index_predicate.is_some())
            .field("index_all_attributes", &self.index_all_attributes)
            .field("index_activity_names", &self.index_activity_names)
            .field("validate_trace_id", &self.validate_trace_id)
            .field("log_group_names", &self.log_group_names)
            .finish()
    }
}

pub struct Converter {
    indexed_attributes: HashSet<String>,
    indexed_resource_attributes: HashSet<String>,
    index_predicate: Option<IndexPredicate>,
    index_all_attributes: bool,
    index_activity_names: bool,
    validate_trace_id: bool,
    log_group_names: Vec<String>,
    pool: ScratchPool,
}

impl Converter {
    pub fn new(options: ConverterOptions) -> Self {
        let indexed_resource_attributes = options
            .indexed_attributes
            .iter()
            .filter_map(|key| key.strip_prefix(RESOURCE_KEY_PREFIX))
            .map(str::to_string)
            .collect();
        Converter {
            indexed_attributes: options.indexed_attributes.into_iter().collect(),
            indexed_resource_attributes,
            index_predicate: options.index_predicate,
            index_all_attributes: options.index_all_attributes,
            index_activity_names: options.index_activity_names,
            validate_trace_id: options.validate_trace_id,
            log_group_names: options.log_group_names,
            pool: ScratchPool::new(SCRATCH_POOL_CAPACITY),
        }
    }

    /// Converts one span into a segment document.
    ///
    /// Returns `None` when trace id validation is enabled and the trace id is outside the window
    /// X-Ray accepts. The caller should drop the span.
    pub fn convert(&self, resource: &Resource, span: &Span) -> Option<String> {
        let trace_id = to_xray_trace_id(span.trace_id);
        if self.validate_trace_id && !is_valid_xray_trace_id(&trace_id, SystemTime::now()) {
            warn!(
                "Dropping span {} with invalid X-Ray trace id {trace_id}",
                format_span_id(span.span_id)
            );
            return None;
        }

        let is_subsegment = span.kind != SpanKind::Server && span.has_parent();

        let mut scratch = self.pool.checkout();
        let Scratch {
            resource: resource_table,
            span: span_table,
            buffer,
        } = &mut *scratch;
        let resource_attributes = resource_table.bind(&resource.attributes);
        let mut attributes = span_table.bind(&span.attributes);

        let (name, namespace) = name::resolve(span, &mut attributes, &resource_attributes);
        attributes.rollback();

        let mut segment = Segment::new(name, format_span_id(span.span_id), trace_id);
        segment.start_time = span.start_time_secs();
        segment.end_time = span.end_time_secs();
        if span.has_parent() {
            segment.parent_id = Some(format_span_id(span.parent_span_id));
        }
        segment.namespace = namespace;
        if is_subsegment {
            segment.segment_type = Some(SEGMENT_TYPE_SUBSEGMENT);
        }

        segment.http = http::write(span, &mut attributes);

        let (cause, flags) = cause::write(span, &mut attributes, &resource_attributes);
        segment.cause = cause;
        segment.error = flags.error;
        segment.throttle = flags.throttle;
        segment.fault = flags.fault;

        segment.origin = aws::origin(&resource_attributes);
        segment.aws = aws::write(&mut attributes, &resource_attributes, &self.log_group_names);
        segment.service = service::write(&resource_attributes);
        segment.sql = sql::write(&mut attributes);

        segment.user = generic::user(&mut attributes);
        let resource_view = (!is_subsegment).then_some(&resource_attributes);
        segment.metadata = generic::metadata(self, &attributes, resource_view);
        segment.annotations = generic::annotations(self, span, &attributes, resource_view);

        buffer.clear();
        if let Err(e) = serde_json::to_writer(&mut *buffer, &segment) {
            error!(
                "Failed to serialize segment for span {}: {e}",
                format_span_id(span.span_id)
            );
            return None;
        }
        Some(String::from_utf8_lossy(buffer.as_slice()).into_owned())
    }

    /// A key is indexed when it is listed explicitly, when the predicate accepts it, or when
    /// every attribute is indexed.
    fn is_indexed(&self, key: &str, is_resource: bool) -> bool {
        let listed = if is_resource {
            self.indexed_resource_attributes.contains(key)
        } else {
            self.indexed_attributes.contains(key)
        };
        listed
            || self
                .index_predicate
                .as_ref()
                .is_some_and(|predicate| predicate(key, is_resource))
            || self.index_all_attributes
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("indexed_attributes", &self.indexed_attributes)
            .field("index_all_attributes", &self.index_all_attributes)
            .field("index_activity_names", &self.index_activity_names)
            .field("validate_trace_id", &self.validate_trace_id)
            .finish_non_exhaustive()
    }
}

/// Text form of an attribute, treating empty strings as absent.
fn non_empty_text(value: Option<&AttributeValue>) -> Option<Cow<'_, str>> {
    value
        .and_then(AttributeValue::to_text)
        .filter(|text| !text.is_empty())
}
