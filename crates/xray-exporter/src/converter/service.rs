// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::attributes::{Attributes, WellKnown};
use crate::segment::Service;

/// `service.version`, falling back to the container image tag.
pub(super) fn write<'a>(resource: &Attributes<'_, 'a>) -> Option<Service<'a>> {
    let version = resource
        .peek(WellKnown::ServiceVersion)
        .or_else(|| resource.peek(WellKnown::ContainerImageTag))?;
    Some(Service {
        version: version.to_text()?,
    })
}
