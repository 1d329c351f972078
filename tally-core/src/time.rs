//! Time utilities: timezone resolution for time-of-day bucketing.

use anyhow::Result;
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

/// Resolve an IANA timezone name like "Asia/Taipei".
pub fn parse_timezone(tz: &str) -> Result<Tz> {
    tz.parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))
}

/// Hour of day (0–23) of a UTC instant, viewed in `tz`.
pub fn local_hour(at: DateTime<Utc>, tz: Tz) -> u32 {
    at.with_timezone(&tz).hour()
}
