//! Hourly partition metadata derived from dump filenames.
//!
//! Dump files are named `<prefix>-YYYYMMDD-HH0000<suffix>`, for example
//! `pageviews-20240115-070000.gz`.

use chrono::NaiveDate;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::error::{MalformedFilenameSnafu, PartitionError};

static FILENAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<prefix>.+)-(?P<date>[0-9]{8})-(?P<hour>[0-9]{2})0000(?P<suffix>(?:[^0-9].*)?)$")
        .expect("Invalid regex pattern")
});

/// The hour a dump file covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Partition {
    pub date: NaiveDate,
    /// Hour of day, 0..=23.
    pub hour: u8,
}

impl Partition {
    /// Parse the partition encoded in `filename`.
    pub fn from_filename(filename: &str) -> Result<Self, PartitionError> {
        let malformed = |reason: &str| {
            MalformedFilenameSnafu {
                filename,
                reason,
            }
            .build()
        };

        let caps = FILENAME_PATTERN
            .captures(filename)
            .ok_or_else(|| malformed("expected <prefix>-YYYYMMDD-HH0000<suffix>"))?;

        let date = NaiveDate::parse_from_str(&caps["date"], "%Y%m%d")
            .map_err(|_| malformed("date is not a valid calendar date"))?;

        let hour = caps["hour"]
            .parse::<u8>()
            .ok()
            .filter(|h| *h <= 23)
            .ok_or_else(|| malformed("hour must be between 00 and 23"))?;

        Ok(Self { date, hour })
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T{:02}", self.date.format("%Y-%m-%d"), self.hour)
    }
}
