// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batching exporter.
//!
//! Spans are converted in input order and the documents are grouped greedily: a group is sent
//! as soon as the next document would push it over [`MAX_BATCH_BYTES`] or once it holds
//! [`MAX_BATCH_DOCUMENTS`]. A document larger than the byte ceiling on its own is sent alone.

use tracing::{debug, error};

use crate::client::SegmentClient;
use crate::converter::Converter;
use crate::model::{Resource, Span};

/// Ceiling on the summed document length of one PutTraceSegments call.
pub const MAX_BATCH_BYTES: usize = 62 * 1024;

/// Most documents accepted by one PutTraceSegments call.
pub const MAX_BATCH_DOCUMENTS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportResult {
    Success,
    Failure,
}

/// Accumulates documents into groups bounded by byte length and count.
#[derive(Debug)]
pub struct DocumentBatcher {
    documents: Vec<String>,
    size: usize,
    max_bytes: usize,
    max_documents: usize,
}

impl Default for DocumentBatcher {
    fn default() -> Self {
        DocumentBatcher::new(MAX_BATCH_BYTES, MAX_BATCH_DOCUMENTS)
    }
}

impl DocumentBatcher {
    pub fn new(max_bytes: usize, max_documents: usize) -> Self {
        DocumentBatcher {
            documents: Vec::with_capacity(max_documents),
            size: 0,
            max_bytes,
            max_documents,
        }
    }

    /// Adds a document, returning the previous group when the document does not fit in it.
    pub fn push(&mut self, document: String) -> Option<Vec<String>> {
        let full = !self.documents.is_empty()
            && (self.size + document.len() > self.max_bytes
                || self.documents.len() >= self.max_documents);
        let flushed = if full { self.take() } else { None };
        self.size += document.len();
        self.documents.push(document);
        flushed
    }

    /// Returns the pending group, if any.
    pub fn take(&mut self) -> Option<Vec<String>> {
        if self.documents.is_empty() {
            return None;
        }
        self.size = 0;
        Some(std::mem::replace(
            &mut self.documents,
            Vec::with_capacity(self.max_documents),
        ))
    }
}

pub struct XRayExporter<C: SegmentClient> {
    converter: Converter,
    client: C,
    max_batch_bytes: usize,
    max_batch_documents: usize,
}

impl<C: SegmentClient> XRayExporter<C> {
    pub fn new(converter: Converter, client: C) -> Self {
        Self::with_limits(converter, client, MAX_BATCH_BYTES, MAX_BATCH_DOCUMENTS)
    }

    pub fn with_limits(
        converter: Converter,
        client: C,
        max_batch_bytes: usize,
        max_batch_documents: usize,
    ) -> Self {
        XRayExporter {
            converter,
            client,
            max_batch_bytes,
            max_batch_documents,
        }
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Converts and sends `spans`. Stops at the first failed call; groups sent before it stay
    /// sent.
    pub async fn export(&self, resource: &Resource, spans: &[Span]) -> ExportResult {
        let mut batcher = DocumentBatcher::new(self.max_batch_bytes, self.max_batch_documents);
        let mut skipped = 0;
        for span in spans {
            let Some(document) = self.converter.convert(resource, span) else {
                skipped += 1;
                continue;
            };
            if let Some(documents) = batcher.push(document) {
                if self.send(documents).await.is_err() {
                    return ExportResult::Failure;
                }
            }
        }
        if let Some(documents) = batcher.take() {
            if self.send(documents).await.is_err() {
                return ExportResult::Failure;
            }
        }
        if skipped > 0 {
            debug!("Skipped {skipped} of {} spans during conversion", spans.len());
        }
        ExportResult::Success
    }

    async fn send(&self, documents: Vec<String>) -> Result<(), ()> {
        let count = documents.len();
        debug!("Flushing {count} segment documents");
        self.client.put_trace_segments(documents).await.map_err(|e| {
            error!("Failed to export {count} segment documents: {e}");
        })
    }
}
