// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! `Exception.ToString()` output.
//!
//! ```text
//! System.Exception: outer ---> System.IO.IOException: inner
//!    at MyNamespace.Reader.Read() in C:\apps\MyNamespace\Reader.cs:line 11
//!    --- End of inner exception stack trace ---
//!    at MyNamespace.Program.Main(String[] args)
//! ```
//!
//! Inner exceptions are announced by `--->` on the summary line or at the start of a line and
//! print their frames first. The end-of-inner marker moves collection back to the wrapping
//! exception.

use super::{parse_line_number, split_type_and_message, ExceptionChain};

const FRAME_PREFIX: &str = "at ";
const INNER_SEPARATOR: &str = " ---> ";
const INNER_PREFIX: &str = "---> ";
const END_OF_INNER: &str = "--- End of inner exception stack trace ---";

pub(super) fn parse(chain: &mut ExceptionChain, stacktrace: &str) {
    let mut lines = stacktrace.lines();
    let Some(summary) = lines.next() else {
        return;
    };
    for inner in summary.split(INNER_SEPARATOR).skip(1) {
        let (exception_type, message) = split_type_and_message(inner);
        chain.push_cause(exception_type, message.to_string());
    }

    for line in lines {
        let line = line.trim();
        if let Some(frame) = line.strip_prefix(FRAME_PREFIX) {
            if let Some((label, path, line_number)) = parse_frame(frame) {
                chain.push_frame(path, label, line_number);
            }
        } else if let Some(inner) = line.strip_prefix(INNER_PREFIX) {
            let (exception_type, message) = split_type_and_message(inner);
            chain.push_cause(exception_type, message.to_string());
        } else if line.starts_with(END_OF_INNER) {
            chain.step_out();
        }
    }
}

/// Frames with debug symbols read `label in path:line N`, frames without them end at the
/// closing parenthesis of the signature.
fn parse_frame(frame: &str) -> Option<(&str, &str, u32)> {
    if let Some((label, location)) = frame.split_once(" in ") {
        let (path, line) = match location.rfind(':') {
            Some(index) => {
                let line = &location[index + 1..];
                let line = line.strip_prefix("line").unwrap_or(line);
                (&location[..index], parse_line_number(line))
            }
            None => (location, 0),
        };
        return Some((label, path, line));
    }

    let end = frame.rfind(')')?;
    Some((&frame[..=end], "", 0))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::{parse_exception, ExceptionRecord, Language, StackFrame};

    fn parse(stacktrace: &str) -> Vec<ExceptionRecord> {
        parse_exception(
            "System.Exception",
            "test",
            stacktrace,
            Some(Language::DotNet),
        )
    }

    fn frame(label: &str, path: &str, line: u32) -> StackFrame {
        StackFrame {
            path: path.to_string(),
            label: label.to_string(),
            line,
        }
    }

    #[test]
    fn test_simple_stacktrace() {
        let stacktrace = "System.FormatException: Input string was not in a correct format.
\tat System.Number.ThrowOverflowOrFormatException(ParsingStatus status, TypeCode type)
\tat System.Int32.Parse(String s)
\tat MyNamespace.IntParser.Parse(String s) in C:\\apps\\MyNamespace\\IntParser.cs:line 11
\tat MyNamespace.Program.Main(String[] args) in C:\\apps\\MyNamespace\\Program.cs:line 12";

        let records = parse(stacktrace);
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].stack,
            vec![
                frame(
                    "System.Number.ThrowOverflowOrFormatException(ParsingStatus status, TypeCode type)",
                    "",
                    0
                ),
                frame("System.Int32.Parse(String s)", "", 0),
                frame(
                    "MyNamespace.IntParser.Parse(String s)",
                    "C:\\apps\\MyNamespace\\IntParser.cs",
                    11
                ),
                frame(
                    "MyNamespace.Program.Main(String[] args)",
                    "C:\\apps\\MyNamespace\\Program.cs",
                    12
                ),
            ]
        );
    }

    #[test]
    fn test_async_boundaries_do_not_split_the_stack() {
        let stacktrace = "System.Exception: test
\tat App.Controllers.AppController.OutgoingHttp() in /src/App/Controllers/AppController.cs:line 21
\tat lambda_method(Closure , Object , Object[] )
\t--- End of stack trace from previous location where exception was thrown ---
\tat Microsoft.AspNetCore.Routing.EndpointMiddleware.<Invoke>g__AwaitRequestTask|6_0(Endpoint endpoint, Task requestTask, ILogger logger)";

        let records = parse(stacktrace);
        assert_eq!(records.len(), 1);
        let stack = &records[0].stack;
        assert_eq!(stack.len(), 3);
        assert_eq!(
            stack[0],
            frame(
                "App.Controllers.AppController.OutgoingHttp()",
                "/src/App/Controllers/AppController.cs",
                21
            )
        );
        assert_eq!(
            stack[2].label,
            "Microsoft.AspNetCore.Routing.EndpointMiddleware.<Invoke>g__AwaitRequestTask|6_0(Endpoint endpoint, Task requestTask, ILogger logger)"
        );
    }

    #[test]
    fn test_malformed_frames_are_skipped() {
        let stacktrace = "System.Exception: test
\tat App.Controllers.AppController.OutgoingHttp() in /src/AppController.cs:line 21
\tat Microsoft.AspNetCore.Diagnostics.DeveloperExceptionPageMiddleware.Invoke(HttpContext context malformed
\tat System.Net.Http.HttpConnectionPool.ConnectAsync(HttpRequestMessage request, CancellationToken cancellationToken) non-malformed";

        let records = parse(stacktrace);
        let stack = &records[0].stack;
        assert_eq!(stack.len(), 2);
        assert_eq!(
            stack[1],
            frame(
                "System.Net.Http.HttpConnectionPool.ConnectAsync(HttpRequestMessage request, CancellationToken cancellationToken)",
                "",
                0
            )
        );
    }

    #[test]
    fn test_inner_exception_chain() {
        let stacktrace = "System.Exception: outer ---> System.IO.IOException: inner
\tat App.Reader.Read() in /src/Reader.cs:line 7
\t--- End of inner exception stack trace ---
\tat App.Program.Main(String[] args) in /src/Program.cs:line 3";

        let records = parse(stacktrace);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].cause.as_ref(), Some(&records[1].id));
        assert_eq!(
            records[1].exception_type.as_deref(),
            Some("System.IO.IOException")
        );
        assert_eq!(records[1].message.as_deref(), Some("inner"));
        assert_eq!(
            records[1].stack,
            vec![frame("App.Reader.Read()", "/src/Reader.cs", 7)]
        );
        assert_eq!(
            records[0].stack,
            vec![frame("App.Program.Main(String[] args)", "/src/Program.cs", 3)]
        );
    }

    #[test]
    fn test_inner_exception_on_its_own_line() {
        let stacktrace = "System.AggregateException: One or more errors occurred.
 ---> System.TimeoutException: timed out
\tat App.Worker.Run() in /src/Worker.cs:line 40
\t--- End of inner exception stack trace ---
\tat App.Program.Main()";

        let records = parse(stacktrace);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].message.as_deref(), Some("timed out"));
        assert_eq!(records[1].stack.len(), 1);
        assert_eq!(records[0].stack, vec![frame("App.Program.Main()", "", 0)]);
    }
}
