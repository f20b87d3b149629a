// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Name and key sanitization for X-Ray documents.

use lazy_static::lazy_static;
use regex::Regex;

/// Name used when nothing valid is left of a segment name.
pub const DEFAULT_SEGMENT_NAME: &str = "span";

/// Longest segment name X-Ray accepts, in characters.
pub const MAX_SEGMENT_NAME_LENGTH: usize = 200;

lazy_static! {
    static ref INVALID_SEGMENT_NAME_CHARS: Regex =
        Regex::new(r"[^ 0-9\p{L}_.:/%&#=+,\\\-@]").expect("failed creating regex");
}

/// Removes the characters X-Ray rejects in segment names and caps the length.
///
/// Letters from any script, digits, spaces and `_ . : / % & # = + , \ - @` are kept. An input
/// with nothing valid left falls back to [`DEFAULT_SEGMENT_NAME`].
///
/// # Examples
///
/// ```
/// use xray_exporter::util::sanitize_segment_name;
///
/// assert_eq!(sanitize_segment_name("<subDomain>.example.com"), "subDomain.example.com");
/// assert_eq!(sanitize_segment_name("<>"), "span");
/// assert_eq!(sanitize_segment_name("GET /users"), "GET /users");
/// ```
pub fn sanitize_segment_name(name: &str) -> String {
    let cleaned = INVALID_SEGMENT_NAME_CHARS.replace_all(name, "");
    let truncated: String = cleaned.chars().take(MAX_SEGMENT_NAME_LENGTH).collect();
    if truncated.is_empty() {
        return DEFAULT_SEGMENT_NAME.to_string();
    }
    truncated
}

/// Replaces every character that is not an ASCII letter or digit with `_`.
///
/// # Examples
///
/// ```
/// use xray_exporter::util::sanitize_annotation_key;
///
/// assert_eq!(sanitize_annotation_key("Key@1"), "Key_1");
/// assert_eq!(sanitize_annotation_key("http.method"), "http_method");
/// ```
pub fn sanitize_annotation_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Extracts the log group name from a CloudWatch log group ARN.
///
/// The name is the seventh colon-separated field. ARNs with fewer fields are returned whole.
///
/// # Examples
///
/// ```
/// use xray_exporter::util::log_group_from_arn;
///
/// assert_eq!(
///     log_group_from_arn("arn:aws:logs:us-east-1:123456789123:log-group:group2:*"),
///     "group2"
/// );
/// assert_eq!(log_group_from_arn("not-an-arn"), "not-an-arn");
/// ```
pub fn log_group_from_arn(arn: &str) -> &str {
    let mut rest = arn;
    for _ in 0..6 {
        match rest.find(':') {
            Some(index) => rest = &rest[index + 1..],
            None => return arn,
        }
    }
    match rest.find(':') {
        Some(index) => &rest[..index],
        None => rest,
    }
}
