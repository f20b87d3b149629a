// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use core::time::Duration;
use std::env;

use crate::converter::ConverterOptions;
use crate::error::XRayError;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:2000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration for the X-Ray exporter
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Attribute keys written as annotations. Resource keys carry the `otel.resource.` prefix
    pub indexed_attributes: Vec<String>,
    /// Whether every scalar attribute is written as an annotation
    pub index_all_attributes: bool,
    /// Whether the span display and operation names are added as annotations
    pub index_activity_names: bool,
    /// Whether spans with trace ids X-Ray would reject are dropped
    pub validate_trace_id: bool,
    /// Log groups attached when the resource declares none
    pub log_group_names: Vec<String>,
    /// Base URL of the PutTraceSegments API, usually the local X-Ray daemon
    pub endpoint: String,
    /// Request timeout
    pub timeout: Duration,
    /// HTTPS proxy URL
    pub https_proxy: Option<String>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            indexed_attributes: Vec::new(),
            index_all_attributes: true,
            index_activity_names: true,
            validate_trace_id: false,
            log_group_names: Vec::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            https_proxy: None,
            log_level: "info".to_string(),
        }
    }
}

impl ExporterConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, XRayError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, XRayError> {
        let defaults = Self::default();

        let indexed_attributes = lookup("XRAY_INDEXED_ATTRIBUTES")
            .map(|val| split_list(&val))
            .unwrap_or_default();
        let index_all_attributes = lookup("XRAY_INDEX_ALL_ATTRIBUTES")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(defaults.index_all_attributes);
        let index_activity_names = lookup("XRAY_INDEX_ACTIVITY_NAMES")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(defaults.index_activity_names);
        let validate_trace_id = lookup("XRAY_VALIDATE_TRACE_ID")
            .map(|val| val.to_lowercase() == "true")
            .unwrap_or(defaults.validate_trace_id);
        let log_group_names = lookup("XRAY_LOG_GROUP_NAMES")
            .map(|val| split_list(&val))
            .unwrap_or_default();
        let endpoint = lookup("XRAY_ENDPOINT").unwrap_or(defaults.endpoint);
        let timeout = match lookup("XRAY_TIMEOUT_SECS") {
            Some(val) => Duration::from_secs(val.trim().parse::<u64>().map_err(|_| {
                XRayError::InvalidConfig(format!("Invalid XRAY_TIMEOUT_SECS '{val}'"))
            })?),
            None => defaults.timeout,
        };
        let https_proxy = lookup("XRAY_PROXY_HTTPS").or_else(|| lookup("HTTPS_PROXY"));
        let log_level = lookup("XRAY_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or(defaults.log_level);

        let config = Self {
            indexed_attributes,
            index_all_attributes,
            index_activity_names,
            validate_trace_id,
            log_group_names,
            endpoint,
            timeout,
            https_proxy,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), XRayError> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(XRayError::InvalidConfig(
                "XRAY_ENDPOINT cannot be empty".to_string(),
            ));
        }
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(XRayError::InvalidConfig(format!(
                "Invalid endpoint '{}'. Must start with http:// or https://",
                self.endpoint
            )));
        }

        if self.timeout.is_zero() {
            return Err(XRayError::InvalidConfig(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if self.indexed_attributes.iter().any(|key| key.trim().is_empty()) {
            return Err(XRayError::InvalidConfig(
                "Indexed attribute keys cannot be empty".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(XRayError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    /// Options for the span converter. The index predicate is code only and starts unset.
    pub fn converter_options(&self) -> ConverterOptions {
        ConverterOptions {
            indexed_attributes: self.indexed_attributes.clone(),
            index_predicate: None,
            index_all_attributes: self.index_all_attributes,
            index_activity_names: self.index_activity_names,
            validate_trace_id: self.validate_trace_id,
            log_group_names: self.log_group_names.clone(),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
