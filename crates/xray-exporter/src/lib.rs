// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # X-Ray Exporter
//!
//! Converts finished OpenTelemetry spans into AWS X-Ray segment documents and ships them to the
//! PutTraceSegments API in bounded batches.
//!
//! ## Architecture
//!
//! - [`attributes`]: well-known key lookup table with consume tracking
//! - [`converter`]: span to segment conversion, one writer per segment sub-object
//! - [`stacktrace`]: stack trace grammars for exception events
//! - [`segment`]: the serialized segment document
//! - [`exporter`]: batching of documents into PutTraceSegments calls
//! - [`client`]: the transport trait and its HTTP implementation
//! - [`config`]: environment driven configuration

#![deny(clippy::all)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![deny(unused_extern_crates)]

pub mod attributes;
pub mod client;
pub mod config;
pub mod converter;
pub mod error;
pub mod exporter;
pub mod model;
pub mod pool;
pub mod segment;
pub mod stacktrace;
pub mod trace_id;
pub mod util;

pub use client::{HttpSegmentClient, SegmentClient};
pub use config::ExporterConfig;
pub use converter::{Converter, ConverterOptions};
pub use error::XRayError;
pub use exporter::{ExportResult, XRayExporter};
pub use model::{AttributeValue, Event, ExportRequest, KeyValue, Resource, Span, SpanKind, Status};
