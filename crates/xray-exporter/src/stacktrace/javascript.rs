// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! V8 `Error.stack` output.
//!
//! ```text
//! TypeError: Cannot read properties of undefined (reading 'id')
//!     at getUser (/app/src/users.js:42:17)
//!     at /app/src/index.js:10:5
//!     at Array.forEach (native)
//! ```

use super::{parse_line_number, ExceptionChain};

const FRAME_PREFIX: &str = "    at ";

pub(super) fn parse(chain: &mut ExceptionChain, stacktrace: &str) {
    for line in stacktrace.lines().skip(1) {
        let Some(frame) = line.strip_prefix(FRAME_PREFIX) else {
            continue;
        };
        if let Some((label, path, line_number)) = parse_frame(frame.trim_end()) {
            chain.push_frame(path, label, line_number);
        }
    }
}

/// Anonymous frames carry only a location, named frames wrap it in parentheses.
fn parse_frame(frame: &str) -> Option<(&str, &str, u32)> {
    let (label, location) = match frame.strip_suffix(')').and_then(|f| f.split_once(" (")) {
        Some((label, location)) => (label, location),
        None if frame.contains(['(', ')']) => return None,
        None => ("", frame),
    };
    if location.is_empty() {
        return None;
    }
    let (path, line) = split_location(location);
    Some((label, path, line))
}

/// Splits `path:line:column` from the right since paths may contain colons themselves.
/// Locations without a numeric line, such as `native`, are kept whole.
fn split_location(location: &str) -> (&str, u32) {
    let is_number = |text: &str| !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit());

    let Some((rest, last)) = location.rsplit_once(':') else {
        return (location, 0);
    };
    if let Some((path, line)) = rest.rsplit_once(':') {
        if is_number(line) && is_number(last) {
            return (path, parse_line_number(line));
        }
    }
    if is_number(last) {
        return (rest, parse_line_number(last));
    }
    (location, 0)
}
