//! NDBC buoy feeds: station catalog, realtime text products and the
//! wave model point bulletin
//!
//! Parsers are pure functions over the raw response text. Each data row that
//! fails to parse is logged and skipped; the rest of the feed still parses.

pub mod bulletin;
pub mod latest;
pub mod realtime;
pub mod spectra;
pub mod stations;

use chrono::{DateTime, NaiveDate, Utc};

pub use bulletin::BulletinParser;
pub use stations::{Station, StationCatalog, StationType};

use crate::observation::{ExpirationPolicy, Observation};
use crate::{Result, SwellcastError};

/// Marker NDBC uses for a missing reading
pub const MISSING: &str = "MM";

/// Shared settings for the realtime buoy parsers
#[derive(Debug, Clone, Copy, Default)]
pub struct BuoyParser {
    /// Stamped onto every parsed record
    pub expires_at: Option<DateTime<Utc>>,
    /// Keep only the newest `limit` rows of a tabular feed
    pub limit: Option<usize>,
}

impl BuoyParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser whose records expire at the next refresh boundary after `now`
    #[must_use]
    pub fn expiring(policy: &ExpirationPolicy, now: DateTime<Utc>) -> Self {
        Self {
            expires_at: Some(policy.next_expiration(now)),
            limit: None,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn stamp(&self, mut observation: Observation) -> Observation {
        observation.expiration_time = self.expires_at;
        observation
    }

    /// Data lines of a tabular feed after its header, newest first as
    /// published, cut to `limit`
    fn data_lines<'a>(&self, raw: &'a str, header_lines: usize) -> Result<Vec<&'a str>> {
        let lines: Vec<&str> = raw.lines().collect();
        if lines.len() < header_lines {
            return Err(SwellcastError::parse(format!(
                "expected at least {header_lines} header lines, got {}",
                lines.len()
            )));
        }

        let data = lines[header_lines..]
            .iter()
            .copied()
            .filter(|line| !line.trim().is_empty());
        Ok(match self.limit {
            Some(limit) if limit > 0 => data.take(limit).collect(),
            _ => data.collect(),
        })
    }
}

/// Build a UTC timestamp from the leading `YY MM DD hh mm` columns
pub(crate) fn parse_row_time(columns: &[&str]) -> Result<DateTime<Utc>> {
    if columns.len() < 5 {
        return Err(SwellcastError::parse("row is missing date columns"));
    }

    let field = |i: usize| -> Result<u32> {
        columns[i]
            .parse::<u32>()
            .map_err(|_| SwellcastError::parse(format!("invalid date field '{}'", columns[i])))
    };
    let year = columns[0]
        .parse::<i32>()
        .map_err(|_| SwellcastError::parse(format!("invalid year '{}'", columns[0])))?;

    let (month, day, hour, minute) = (field(1)?, field(2)?, field(3)?, field(4)?);

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| SwellcastError::parse(format!("invalid date {}", columns[..5].join(" "))))
}

/// Sort records into ascending time order
pub(crate) fn sort_ascending(records: &mut [Observation]) {
    records.sort_by_key(|record| record.timestamp);
}
