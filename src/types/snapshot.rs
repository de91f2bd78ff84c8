//! Read-only views served to the presentation layer.

use std::time::Instant;

use serde::Serialize;

use crate::types::device::DeviceRecord;

/// Full measurement view of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceView {
    /// Device identity.
    pub id: u8,
    /// Whether a sample has been received since registration.
    pub seen: bool,
    /// When the last sample completed.
    #[serde(skip)]
    pub last_seen_at: Option<Instant>,
    /// Milliseconds since the last sample, `None` if never seen.
    pub age_ms: Option<u64>,
    /// Number of valid readings.
    pub measurement_count: usize,
    /// The readings.
    pub measurements: Vec<u16>,
}

impl DeviceView {
    /// Builds the view of `record` as of `now`.
    #[must_use]
    pub fn new(record: &DeviceRecord, now: Instant) -> Self {
        let measurements = record.measurements().as_slice().to_vec();
        Self {
            id: record.id(),
            seen: record.is_seen(),
            last_seen_at: record.last_seen_at(),
            age_ms: age_ms(record, now),
            measurement_count: measurements.len(),
            measurements,
        }
    }
}

/// One row of the all-devices summary.
///
/// Carries the device view fields plus `registered` and `value`. A device
/// that is not currently seen reports no readings, even when older ones are
/// still held for its device view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorSummary {
    /// Device identity.
    pub id: u8,
    /// Whether the device is currently registered.
    pub registered: bool,
    /// Whether a sample has been received since registration.
    pub seen: bool,
    /// First reading of the last sample, 0 when unseen.
    pub value: u16,
    /// When the last sample completed.
    #[serde(skip)]
    pub last_seen_at: Option<Instant>,
    /// Milliseconds since the last sample, `None` if not seen.
    pub age_ms: Option<u64>,
    /// Number of valid readings, 0 when not seen.
    pub measurement_count: usize,
    /// The readings, empty when not seen.
    pub measurements: Vec<u16>,
}

impl SensorSummary {
    /// Builds the summary row of `record` as of `now`.
    #[must_use]
    pub fn new(record: &DeviceRecord, now: Instant) -> Self {
        let readings: &[u16] = if record.is_seen() {
            record.measurements().as_slice()
        } else {
            &[]
        };
        Self {
            id: record.id(),
            registered: record.is_registered(),
            seen: record.is_seen(),
            value: readings.first().copied().unwrap_or(0),
            last_seen_at: record.last_seen_at(),
            age_ms: age_ms(record, now),
            measurement_count: readings.len(),
            measurements: readings.to_vec(),
        }
    }
}

fn age_ms(record: &DeviceRecord, now: Instant) -> Option<u64> {
    if !record.is_seen() {
        return None;
    }
    record.last_seen_at().map(|at| {
        u64::try_from(now.saturating_duration_since(at).as_millis()).unwrap_or(u64::MAX)
    })
}
