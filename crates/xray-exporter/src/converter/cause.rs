// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::attributes::{Attributes, WellKnown};
use crate::model::{KeyValue, Span, Status};
use crate::segment::Cause;
use crate::stacktrace::{parse_exception, ExceptionRecord, Language};

const EXCEPTION_EVENT_NAME: &str = "exception";
const STATUS_CODE_ERROR: &str = "ERROR";

/// The `error`, `throttle` and `fault` flags of a segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusFlags {
    pub error: bool,
    pub throttle: bool,
    pub fault: bool,
}

/// Classifies the HTTP status code of a failed span.
///
/// 4xx codes are client errors, with 429 also marked as throttled. Anything else, including a
/// missing code, is a fault.
///
/// # Examples
///
/// ```
/// use xray_exporter::converter::classify_status_code;
///
/// let flags = classify_status_code(Some(429));
/// assert!(flags.error && flags.throttle && !flags.fault);
/// assert!(classify_status_code(None).fault);
/// ```
pub fn classify_status_code(status_code: Option<i64>) -> StatusFlags {
    match status_code {
        Some(code @ 400..=499) => StatusFlags {
            error: true,
            throttle: code == 429,
            fault: false,
        },
        _ => StatusFlags {
            fault: true,
            ..Default::default()
        },
    }
}

/// Builds the `cause` object and the status flags.
///
/// Exception events take precedence. Without them an error status produces a single record
/// from the status description, falling back to `http.status_text`.
pub(super) fn write(
    span: &Span,
    attributes: &mut Attributes<'_, '_>,
    resource: &Attributes<'_, '_>,
) -> (Option<Cause>, StatusFlags) {
    let is_error = match &span.status {
        Status::Error { .. } => true,
        Status::Ok => false,
        Status::Unset => attributes.peek_str(WellKnown::OtelStatusCode) == Some(STATUS_CODE_ERROR),
    };

    let has_exceptions = span
        .events
        .iter()
        .any(|event| event.name == EXCEPTION_EVENT_NAME);

    let cause = if has_exceptions {
        let language = match resource.peek_str(WellKnown::TelemetrySdkLanguage) {
            Some(language) => Language::from_sdk_language(language),
            None => Some(Language::DEFAULT),
        };
        let exceptions = span
            .events
            .iter()
            .filter(|event| event.name == EXCEPTION_EVENT_NAME)
            .flat_map(|event| exception_records(&event.attributes, language))
            .collect();
        Some(Cause { exceptions })
    } else if is_error {
        status_cause(span, attributes)
    } else {
        None
    };

    let flags = if is_error {
        classify_status_code(
            attributes
                .peek(WellKnown::HttpStatusCode)
                .and_then(|code| code.as_i64()),
        )
    } else {
        StatusFlags::default()
    };

    (cause, flags)
}

fn exception_records(event_attributes: &[KeyValue], language: Option<Language>) -> Vec<ExceptionRecord> {
    let text = |key: WellKnown| {
        event_attributes
            .iter()
            .find(|attribute| attribute.key == key.key())
            .and_then(|attribute| attribute.value.as_str())
            .unwrap_or_default()
    };
    parse_exception(
        text(WellKnown::ExceptionType),
        text(WellKnown::ExceptionMessage),
        text(WellKnown::ExceptionStacktrace),
        language,
    )
}

/// A single record carrying the status message. `http.status_text` is consumed whenever it is
/// read.
fn status_cause(span: &Span, attributes: &mut Attributes<'_, '_>) -> Option<Cause> {
    let status_text = attributes.get_str(WellKnown::HttpStatusText);
    attributes.commit();

    let description = match &span.status {
        Status::Error { description } if !description.is_empty() => Some(description.as_str()),
        _ => None,
    };
    let message = description.or(status_text).filter(|message| !message.is_empty())?;
    Some(Cause {
        exceptions: vec![ExceptionRecord::new(None, Some(message.to_string()))],
    })
}
