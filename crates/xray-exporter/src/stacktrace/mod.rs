// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Stack trace parsing for exception events.
//!
//! Each supported runtime prints stack traces differently, so every [`Language`] has its own
//! grammar. All of them follow the same rules:
//!
//! - the summary line (`Type: message`) is skipped, the type and message come from the event
//!   attributes,
//! - lines that do not match the frame syntax are skipped without aborting the parse,
//! - chained exceptions (`Caused by:`, inner exceptions, Python's "During handling" blocks)
//!   become extra records linked through their `cause` id.
//!
//! The first record in the returned chain is always the exception described by the event.

mod dotnet;
mod go;
mod java;
mod javascript;
mod php;
mod python;

use serde::Serialize;

use crate::trace_id::new_segment_id;

/// Runtimes with a stack trace grammar, selected from `telemetry.sdk.language`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Java,
    DotNet,
    Python,
    JavaScript,
    Php,
    Go,
}

impl Language {
    /// Language assumed when the resource does not declare one.
    pub const DEFAULT: Language = Language::DotNet;

    /// Maps a `telemetry.sdk.language` value to a grammar. Unknown languages have none.
    pub fn from_sdk_language(language: &str) -> Option<Language> {
        match language {
            "java" => Some(Language::Java),
            "dotnet" => Some(Language::DotNet),
            "python" => Some(Language::Python),
            "nodejs" | "javascript" | "webjs" => Some(Language::JavaScript),
            "php" => Some(Language::Php),
            "go" => Some(Language::Go),
            _ => None,
        }
    }

    fn parse(self, chain: &mut ExceptionChain, stacktrace: &str) {
        match self {
            Language::Java => java::parse(chain, stacktrace),
            Language::DotNet => dotnet::parse(chain, stacktrace),
            Language::Python => python::parse(chain, stacktrace),
            Language::JavaScript => javascript::parse(chain, stacktrace),
            Language::Php => php::parse(chain, stacktrace),
            Language::Go => go::parse(chain, stacktrace),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackFrame {
    pub path: String,
    pub label: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub line: u32,
}

fn is_zero(line: &u32) -> bool {
    *line == 0
}

/// One entry of a segment's `cause.exceptions` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionRecord {
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub exception_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stack: Vec<StackFrame>,
    /// Id of the exception that caused this one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ExceptionRecord {
    pub fn new(exception_type: Option<String>, message: Option<String>) -> Self {
        ExceptionRecord {
            id: new_segment_id(),
            exception_type,
            message,
            stack: Vec::new(),
            cause: None,
        }
    }
}

/// Parses one exception event into its chain of records.
///
/// Without a grammar for `language` the chain holds only the event's own exception.
pub fn parse_exception(
    exception_type: &str,
    message: &str,
    stacktrace: &str,
    language: Option<Language>,
) -> Vec<ExceptionRecord> {
    let mut chain = ExceptionChain::new(exception_type.to_string(), message.to_string());
    if let Some(language) = language {
        if !stacktrace.is_empty() {
            language.parse(&mut chain, stacktrace);
        }
    }
    chain.into_records()
}

/// Builder for a linked exception chain. Frames go to the current record; a new cause is
/// appended after the last record and becomes current.
pub(crate) struct ExceptionChain {
    records: Vec<ExceptionRecord>,
    current: usize,
}

impl ExceptionChain {
    fn new(exception_type: String, message: String) -> Self {
        ExceptionChain {
            records: vec![ExceptionRecord::new(Some(exception_type), Some(message))],
            current: 0,
        }
    }

    fn push_frame(&mut self, path: &str, label: &str, line: u32) {
        if let Some(record) = self.records.get_mut(self.current) {
            record.stack.push(StackFrame {
                path: path.to_string(),
                label: label.to_string(),
                line,
            });
        }
    }

    fn push_cause(&mut self, exception_type: &str, message: String) {
        let cause = ExceptionRecord::new(Some(exception_type.to_string()), Some(message));
        if let Some(last) = self.records.last_mut() {
            last.cause = Some(cause.id.clone());
        }
        self.records.push(cause);
        self.current = self.records.len() - 1;
    }

    /// Moves frame collection back to the record that wraps the current one.
    fn step_out(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    fn into_records(self) -> Vec<ExceptionRecord> {
        self.records
    }
}

/// Splits `Type: message` at the first colon. Without a colon the whole text is the type.
fn split_type_and_message(text: &str) -> (&str, &str) {
    match text.split_once(':') {
        Some((exception_type, message)) => (exception_type.trim(), message.trim()),
        None => (text.trim(), ""),
    }
}

fn parse_line_number(text: &str) -> u32 {
    text.trim().parse().unwrap_or(0)
}

/// Parses `label(path:line)` frames shared by the Java and PHP grammars.
fn parse_parenthesized_frame(frame: &str) -> Option<(&str, &str, u32)> {
    let frame = frame.strip_suffix(')')?;
    let (label, location) = frame.split_once('(')?;
    let (path, line) = match location.split_once(':') {
        Some((path, line)) => (path, parse_line_number(line)),
        None => (location, 0),
    };
    Some((label, path, line))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_sdk_language() {
        assert_eq!(Language::from_sdk_language("java"), Some(Language::Java));
        assert_eq!(
            Language::from_sdk_language("nodejs"),
            Some(Language::JavaScript)
        );
        assert_eq!(Language::from_sdk_language(""), None);
        assert_eq!(Language::from_sdk_language("cobol"), None);
    }

    #[test]
    fn test_exception_without_stacktrace() {
        let records = parse_exception(
            "com.foo.Exception",
            "Error happened",
            "",
            Some(Language::Java),
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].exception_type.as_deref(), Some("com.foo.Exception"));
        assert_eq!(records[0].message.as_deref(), Some("Error happened"));
        assert!(records[0].stack.is_empty());
        assert_eq!(records[0].id.len(), 16);
    }

    #[test]
    fn test_unknown_language_keeps_type_and_message() {
        let stacktrace = "java.lang.IllegalStateException: state is not legal\n\tat a.b.C.d(C.java:1)";
        let records = parse_exception("com.foo.Exception", "Error happened", stacktrace, None);
        assert_eq!(records.len(), 1);
        assert!(records[0].stack.is_empty());
    }

    #[test]
    fn test_record_serialization_omits_empty_parts() {
        let mut record = ExceptionRecord::new(None, Some("boom".to_string()));
        record.id = "0000000000000001".to_string();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "0000000000000001", "message": "boom"})
        );

        let frame = StackFrame {
            path: "Native Method".to_string(),
            label: "invoke0".to_string(),
            line: 0,
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"path": "Native Method", "label": "invoke0"})
        );
    }

    #[test]
    fn test_split_type_and_message() {
        assert_eq!(
            split_type_and_message("java.lang.IllegalArgumentException: bad argument"),
            ("java.lang.IllegalArgumentException", "bad argument")
        );
        assert_eq!(
            split_type_and_message("java.lang.IllegalArgumentException"),
            ("java.lang.IllegalArgumentException", "")
        );
    }
}
