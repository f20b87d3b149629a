// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! PHP stack traces.
//!
//! The OpenTelemetry PHP SDK renders exceptions in the Java layout, `\tat label(path:line)`
//! with `Caused by:` sections. Plain `getTraceAsString()` output is accepted as well:
//!
//! ```text
//! #0 /app/src/Repository.php(31): Repository->find()
//! #1 {main}
//! ```

use super::{parse_line_number, parse_parenthesized_frame, split_type_and_message, ExceptionChain};

const FRAME_PREFIX: &str = "\tat ";
const CAUSED_BY_PREFIX: &str = "Caused by: ";

pub(super) fn parse(chain: &mut ExceptionChain, stacktrace: &str) {
    for line in stacktrace.lines().skip(1) {
        if let Some(frame) = line.strip_prefix(FRAME_PREFIX) {
            if let Some((label, path, line_number)) = parse_parenthesized_frame(frame) {
                chain.push_frame(path, label, line_number);
            }
        } else if let Some(frame) = line.strip_prefix('#') {
            if let Some((label, path, line_number)) = parse_numbered_frame(frame) {
                chain.push_frame(path, label, line_number);
            }
        } else if let Some(cause) = line.strip_prefix(CAUSED_BY_PREFIX) {
            let (exception_type, message) = split_type_and_message(cause);
            chain.push_cause(exception_type, message.to_string());
        }
    }
}

/// Parses `N path(line): label`, the part after the leading `#`.
fn parse_numbered_frame(frame: &str) -> Option<(&str, &str, u32)> {
    let (index, frame) = frame.split_once(' ')?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (location, label) = frame.split_once("): ")?;
    let (path, line) = location.rsplit_once('(')?;
    Some((label.trim(), path, parse_line_number(line)))
}
