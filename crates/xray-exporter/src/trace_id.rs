// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! X-Ray trace and segment identifiers.
//!
//! An X-Ray trace id has the text form `1-{epoch}-{random}`: the version `1`, the first 8 hex
//! digits of the 128-bit trace id (a big-endian Unix timestamp in seconds) and the remaining
//! 24 hex digits. X-Ray rejects ids whose embedded timestamp is older than 30 days or more than
//! 5 minutes in the future.

use rand::Rng;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const TRACE_ID_VERSION: char = '1';
pub const TRACE_ID_DELIMITER: char = '-';
const EPOCH_HEX_DIGITS: usize = 8;
const RANDOM_HEX_DIGITS: usize = 24;

/// Oldest embedded epoch X-Ray still accepts.
pub const MAX_TRACE_ID_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 30);

/// Furthest into the future an embedded epoch may point.
pub const MAX_TRACE_ID_SKEW: Duration = Duration::from_secs(5 * 60);

/// Formats a 128-bit trace id in the X-Ray text form.
pub fn to_xray_trace_id(trace_id: u128) -> String {
    let hex = format!("{trace_id:032x}");
    let mut xray_id = String::with_capacity(hex.len() + 2 * TRACE_ID_DELIMITER.len_utf8() + 1);
    xray_id.push(TRACE_ID_VERSION);
    xray_id.push(TRACE_ID_DELIMITER);
    xray_id.push_str(&hex[..EPOCH_HEX_DIGITS]);
    xray_id.push(TRACE_ID_DELIMITER);
    xray_id.push_str(&hex[EPOCH_HEX_DIGITS..]);
    xray_id
}

/// Checks the shape of an X-Ray trace id and that its epoch lies inside the accepted window
/// around `now`.
pub fn is_valid_xray_trace_id(xray_id: &str, now: SystemTime) -> bool {
    let mut parts = xray_id.split(TRACE_ID_DELIMITER);
    let (Some(version), Some(epoch), Some(random), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if version.len() != 1 || !version.starts_with(TRACE_ID_VERSION) {
        return false;
    }
    if epoch.len() != EPOCH_HEX_DIGITS
        || random.len() != RANDOM_HEX_DIGITS
        || !epoch.bytes().chain(random.bytes()).all(|b| b.is_ascii_hexdigit())
    {
        return false;
    }
    let Ok(epoch) = u64::from_str_radix(epoch, 16) else {
        return false;
    };

    let now = now
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let oldest = now.saturating_sub(MAX_TRACE_ID_AGE.as_secs());
    let latest = now + MAX_TRACE_ID_SKEW.as_secs();
    (oldest..=latest).contains(&epoch)
}

/// Returns the epoch seconds embedded in a 128-bit trace id.
pub fn trace_id_epoch(trace_id: u128) -> u32 {
    (trace_id >> 96) as u32
}

/// Generates X-Ray compatible trace ids: the current Unix time in the first 4 bytes, random
/// bits in the remaining 12.
#[derive(Debug, Default, Clone, Copy)]
pub struct XRayIdGenerator;

impl XRayIdGenerator {
    pub fn new_trace_id(&self) -> u128 {
        Self::trace_id_at(SystemTime::now(), &mut rand::thread_rng())
    }

    pub fn new_span_id(&self) -> u64 {
        random_span_id(&mut rand::thread_rng())
    }

    fn trace_id_at<R: Rng>(now: SystemTime, rng: &mut R) -> u128 {
        let epoch = now
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as u32;
        let random = rng.gen::<u128>() & ((1u128 << 96) - 1);
        (u128::from(epoch) << 96) | random
    }
}

fn random_span_id<R: Rng>(rng: &mut R) -> u64 {
    loop {
        let id = rng.gen::<u64>();
        if id != 0 {
            return id;
        }
    }
}

/// Formats a 64-bit id as 16 lowercase hex characters.
pub fn format_span_id(span_id: u64) -> String {
    format!("{span_id:016x}")
}

/// A fresh random id for segments and exception records.
pub fn new_segment_id() -> String {
    format_span_id(random_span_id(&mut rand::thread_rng()))
}
