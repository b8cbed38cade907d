//! Clinical timestamp utilities
//!
//! HL7 v2 timestamps (`TS`/`DTM`) start with `yyyyMMddHHmmss`; anything after
//! the seconds (fractions, zone suffix) is ignored, and the wall-clock value is
//! interpreted in a configured zone.

use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};

/// Layout of the leading part of an HL7 timestamp
pub const HL7_TIMESTAMP_LAYOUT: &str = "%Y%m%d%H%M%S";

/// Layout used when a time point is stored as text
pub const TIME_POINT_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

const HL7_TIMESTAMP_LEN: usize = 14;

/// Zone in which message wall-clock times are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampZone {
    /// Host local time zone
    Local,
    /// Fixed offset from UTC
    Fixed(FixedOffset),
}

impl TimestampZone {
    /// Build from an optional offset in minutes east of UTC
    pub fn from_offset_minutes(minutes: Option<i32>) -> Result<Self> {
        match minutes {
            None => Ok(TimestampZone::Local),
            Some(m) => m
                .checked_mul(60)
                .and_then(FixedOffset::east_opt)
                .map(TimestampZone::Fixed)
                .ok_or_else(|| Error::Config(format!("UTC offset out of range: {} minutes", m))),
        }
    }

    fn localize(&self, naive: &NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            TimestampZone::Local => Local
                .from_local_datetime(naive)
                .earliest()
                .map(|dt| dt.fixed_offset()),
            TimestampZone::Fixed(offset) => offset.from_local_datetime(naive).single(),
        }
    }
}

/// Parse an HL7 timestamp into an absolute instant
pub fn parse_hl7_timestamp(raw: &str, zone: TimestampZone) -> Result<DateTime<FixedOffset>> {
    let trimmed = raw.trim();
    let head = trimmed
        .get(..HL7_TIMESTAMP_LEN)
        .ok_or_else(|| Error::Parse(format!("Timestamp too short: '{}'", trimmed)))?;

    let naive = NaiveDateTime::parse_from_str(head, HL7_TIMESTAMP_LAYOUT)
        .map_err(|e| Error::Parse(format!("Invalid timestamp '{}': {}", trimmed, e)))?;

    zone.localize(&naive)
        .ok_or_else(|| Error::Parse(format!("Timestamp '{}' does not exist in zone", trimmed)))
}

/// Canonical textual form of a time point (wall clock of its own offset)
pub fn format_time_point(instant: &DateTime<FixedOffset>) -> String {
    instant.format(TIME_POINT_LAYOUT).to_string()
}
