// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use core::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ExporterConfig;
use crate::error::XRayError;

/// Path of the PutTraceSegments API.
const PUT_TRACE_SEGMENTS_PATH: &str = "/TraceSegments";

/// Destination of serialized segment documents.
#[async_trait]
pub trait SegmentClient: Send + Sync {
    /// Sends one batch of segment documents. An error fails the whole batch.
    async fn put_trace_segments(&self, documents: Vec<String>) -> Result<(), XRayError>;
}

#[derive(Serialize)]
struct PutTraceSegmentsRequest<'a> {
    #[serde(rename = "TraceSegmentDocuments")]
    trace_segment_documents: &'a [String],
}

#[derive(Debug, Default, Deserialize)]
struct PutTraceSegmentsResponse {
    #[serde(rename = "UnprocessedTraceSegments", default)]
    unprocessed_trace_segments: Vec<UnprocessedTraceSegment>,
}

#[derive(Debug, Deserialize)]
struct UnprocessedTraceSegment {
    #[serde(rename = "Id", default)]
    id: Option<String>,
    #[serde(rename = "ErrorCode", default)]
    error_code: Option<String>,
    #[serde(rename = "Message", default)]
    message: Option<String>,
}

pub fn build_client(proxy_url: Option<&str>, timeout: Duration) -> Result<reqwest::Client, XRayError> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    if let Some(proxy) = proxy_url {
        builder = builder.proxy(reqwest::Proxy::https(proxy)?);
    }
    Ok(builder.build()?)
}

/// Posts documents to the PutTraceSegments API.
///
/// The endpoint is normally the local X-Ray daemon, which signs the request and forwards it to
/// the regional X-Ray endpoint.
#[derive(Debug, Clone)]
pub struct HttpSegmentClient {
    client: reqwest::Client,
    url: String,
}

impl HttpSegmentClient {
    pub fn new(
        endpoint: &str,
        https_proxy: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, XRayError> {
        let client = build_client(https_proxy, timeout)?;
        let url = format!(
            "{}{PUT_TRACE_SEGMENTS_PATH}",
            endpoint.trim_end_matches('/')
        );
        Ok(HttpSegmentClient { client, url })
    }

    pub fn from_config(config: &ExporterConfig) -> Result<Self, XRayError> {
        Self::new(
            &config.endpoint,
            config.https_proxy.as_deref(),
            config.timeout,
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SegmentClient for HttpSegmentClient {
    async fn put_trace_segments(&self, documents: Vec<String>) -> Result<(), XRayError> {
        let request = PutTraceSegmentsRequest {
            trace_segment_documents: &documents,
        };
        let time = std::time::Instant::now();
        let response = self.client.post(&self.url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(XRayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!(
            "Sent {} segment documents in {} ms",
            documents.len(),
            time.elapsed().as_millis()
        );

        if body.trim().is_empty() {
            return Ok(());
        }
        match serde_json::from_str::<PutTraceSegmentsResponse>(&body) {
            Ok(response) => {
                for segment in response.unprocessed_trace_segments {
                    warn!(
                        "Segment {} was not processed: {} {}",
                        segment.id.as_deref().unwrap_or("unknown"),
                        segment.error_code.as_deref().unwrap_or_default(),
                        segment.message.as_deref().unwrap_or_default()
                    );
                }
            }
            Err(e) => debug!("Ignoring unreadable PutTraceSegments response: {e}"),
        }
        Ok(())
    }
}
