// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! `Throwable.printStackTrace` output.
//!
//! ```text
//! java.lang.IllegalStateException: state is not legal
//!     at java.base/jdk.internal.reflect.NativeMethodAccessorImpl.invoke(NativeMethodAccessorImpl.java:62)
//! Caused by: java.lang.IllegalArgumentException: bad argument
//!     at org.junit.ThrowableCollector.execute(ThrowableCollector.java:73)
//!     ... 99 more
//! ```
//!
//! Suppressed exceptions are indented twice and skipped along with their frames.

use super::{parse_parenthesized_frame, split_type_and_message, ExceptionChain};

const FRAME_PREFIX: &str = "\tat ";
const CAUSED_BY_PREFIX: &str = "Caused by: ";

pub(super) fn parse(chain: &mut ExceptionChain, stacktrace: &str) {
    let mut lines = stacktrace.lines().skip(1).peekable();
    while let Some(line) = lines.next() {
        if let Some(frame) = line.strip_prefix(FRAME_PREFIX) {
            if let Some((label, path, line_number)) = parse_parenthesized_frame(frame) {
                chain.push_frame(path, strip_module(label), line_number);
            }
        } else if let Some(cause) = line.strip_prefix(CAUSED_BY_PREFIX) {
            let (exception_type, message) = split_type_and_message(cause);
            let mut message = message.to_string();
            // multi-line messages run until the next frame or cause
            while let Some(next) = lines.peek() {
                if next.starts_with('\t') || next.starts_with(CAUSED_BY_PREFIX) {
                    break;
                }
                message.push('\n');
                message.push_str(next);
                lines.next();
            }
            chain.push_cause(exception_type, message);
        }
    }
}

/// Drops the `module/` prefix of Java 9+ frames.
fn strip_module(label: &str) -> &str {
    label.split_once('/').map_or(label, |(_, rest)| rest)
}
