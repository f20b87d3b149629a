// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Goroutine dumps, as printed by `runtime/debug.Stack` or an unrecovered panic.
//!
//! ```text
//! panic: something went wrong
//!
//! goroutine 1 [running]:
//! main.load(0x4b6f2a, 0x6)
//!         /app/main.go:14 +0x65
//! main.main()
//!         /app/main.go:9 +0x25
//! ```
//!
//! Every frame is a function line followed by a tab-indented `path:line` line. Sections of
//! several goroutines are concatenated into one stack. `panic(...)` frames are dropped.

use lazy_static::lazy_static;
use regex::Regex;

use super::{parse_line_number, ExceptionChain};

lazy_static! {
    static ref GOROUTINE_HEADER: Regex =
        Regex::new(r"^goroutine \d+ \[[^\]]*\]:$").expect("failed creating regex");
    static ref FRAME_LOCATION: Regex =
        Regex::new(r"^\t+(\S.*):(\d+)(?: \+0x[0-9a-fA-F]+)?$").expect("failed creating regex");
}

/// The runtime's own `panic(...)` call, which is not part of the failing code.
const PANIC_CALL_PREFIX: &str = "panic(";

pub(super) fn parse(chain: &mut ExceptionChain, stacktrace: &str) {
    let mut lines = stacktrace.lines().skip(1).peekable();
    while let Some(line) = lines.next() {
        let function = line.trim_end();
        if function.is_empty() || function.starts_with('\t') || GOROUTINE_HEADER.is_match(function)
        {
            continue;
        }
        let Some(location) = lines.peek().and_then(|next| FRAME_LOCATION.captures(next.trim_end()))
        else {
            continue;
        };
        if function.starts_with(PANIC_CALL_PREFIX) {
            lines.next();
            continue;
        }
        let path = location.get(1).map_or("", |m| m.as_str());
        let line_number = location.get(2).map_or(0, |m| parse_line_number(m.as_str()));
        chain.push_frame(path, function, line_number);
        lines.next();
    }
}
