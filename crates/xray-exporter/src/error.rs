// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors that can occur while configuring the exporter or shipping segment documents
#[derive(Debug, thiserror::Error)]
pub enum XRayError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to send trace segments: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Trace segments rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = XRayError::InvalidConfig("empty endpoint".to_string());
        assert_eq!(error.to_string(), "Invalid configuration: empty endpoint");

        let error = XRayError::Rejected {
            status: 400,
            body: "bad segment".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Trace segments rejected with status 400: bad segment"
        );
    }

    #[test]
    fn test_error_from_io() {
        let error: XRayError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "spans.json").into();
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("Io"));
        assert!(error.to_string().starts_with("I/O error"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let parse_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: XRayError = parse_error.into();
        assert!(matches!(error, XRayError::Serialization(_)));
    }
}
