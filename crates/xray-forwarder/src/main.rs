// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, process::ExitCode};
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use xray_exporter::{
    Converter, ExportRequest, ExportResult, ExporterConfig, HttpSegmentClient, XRayError,
    XRayExporter,
};

/// Reads an export request from the file named by the first argument, or from stdin when no
/// argument is given.
async fn read_request() -> Result<ExportRequest, XRayError> {
    let input = match env::args().nth(1) {
        Some(path) if path != "-" => tokio::fs::read(path).await?,
        _ => {
            let mut buffer = Vec::new();
            tokio::io::stdin().read_to_end(&mut buffer).await?;
            buffer
        }
    };
    Ok(serde_json::from_slice(&input)?)
}

#[tokio::main]
pub async fn main() -> ExitCode {
    let log_level = env::var("XRAY_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match ExporterConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Error loading config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let client = match HttpSegmentClient::from_config(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Error creating X-Ray client: {e}");
            return ExitCode::FAILURE;
        }
    };
    let exporter = XRayExporter::new(Converter::new(config.converter_options()), client);

    let request = match read_request().await {
        Ok(request) => request,
        Err(e) => {
            error!("Failed to read spans: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Forwarding {} spans to {}",
        request.spans.len(),
        exporter.client().url()
    );
    match exporter.export(&request.resource, &request.spans).await {
        ExportResult::Success => ExitCode::SUCCESS,
        ExportResult::Failure => ExitCode::FAILURE,
    }
}
