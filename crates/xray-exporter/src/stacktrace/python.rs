// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! `traceback.format_exception` output.
//!
//! Python prints the outermost call first and the exception summary last, and a chained
//! exception is printed *before* the one it caused. The trace is therefore read bottom-up:
//!
//! ```text
//! Traceback (most recent call last):
//!   File "main.py", line 14, in load
//!     return open(path)
//! FileNotFoundError: no such file
//!
//! During handling of the above exception, another exception occurred:
//!
//! Traceback (most recent call last):
//!   File "main.py", line 20, in <module>
//!     load("config.yaml")
//! ValueError: bad config
//! ```

use super::{split_type_and_message, ExceptionChain};

const FILE_PREFIX: &str = "  File ";
const CHAIN_MARKERS: [&str; 2] = [
    "During handling of the above exception, another exception occurred:",
    "The above exception was the direct cause of the following exception:",
];

pub(super) fn parse(chain: &mut ExceptionChain, stacktrace: &str) {
    let lines: Vec<&str> = stacktrace.lines().collect();
    let Some(summary) = lines.iter().rposition(|line| !line.trim().is_empty()) else {
        return;
    };

    let mut index = summary;
    while index > 0 {
        index -= 1;
        let line = lines[index];
        if line.starts_with(FILE_PREFIX) {
            if let Some((label, path, line_number)) = parse_frame(line) {
                chain.push_frame(path, label, line_number);
            }
        } else if CHAIN_MARKERS.contains(&line.trim()) {
            let Some(last_frame) = lines[..index]
                .iter()
                .rposition(|line| line.starts_with(FILE_PREFIX))
            else {
                return;
            };
            let summary = chained_summary(&lines[last_frame + 1..index]);
            let (exception_type, message) = split_type_and_message(&summary);
            chain.push_cause(exception_type, message.to_string());
            index = last_frame + 1;
        }
    }
}

/// The summary of a chained exception sits between its last frame and the chain marker,
/// after the indented source line of that frame.
fn chained_summary(lines: &[&str]) -> String {
    lines
        .iter()
        .filter(|line| !line.starts_with("    ") && !line.trim().is_empty())
        .map(|line| line.trim())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses `  File "path", line N, in label`.
fn parse_frame(line: &str) -> Option<(&str, &str, u32)> {
    let rest = line.strip_prefix(FILE_PREFIX)?.strip_prefix('"')?;
    let (path, rest) = rest.split_once("\", line ")?;
    let (line_number, label) = rest.split_once(", in ").unwrap_or((rest, ""));
    let line_number = line_number.trim().parse().ok()?;
    Some((label.trim(), path, line_number))
}
