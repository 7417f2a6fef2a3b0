//! Wave model point bulletin (`gfswave.{id}.bull`)

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tracing::{debug, info};

use crate::observation::{Observation, Provenance};
use crate::swell::Swell;
use crate::units::{Units, parse_float};
use crate::{Result, SwellcastError};

/// Index of the `Cycle : YYYYMMDD HH UTC` line
const CYCLE_LINE: usize = 2;
const MIN_COLUMNS: usize = 8;
const FIRST_PARTITION_COLUMN: usize = 3;
const LAST_PARTITION_COLUMN: usize = 8;

/// Parser for the pipe-delimited point bulletin
pub struct BulletinParser;

/// The model run a bulletin was produced from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelRun {
    pub date: NaiveDate,
    pub hour: u32,
}

impl ModelRun {
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.date.and_hms_opt(self.hour, 0, 0).map(|t| t.and_utc())
    }
}

struct Partition {
    swell: Swell,
    significant: bool,
}

fn parse_partition(column: &str) -> Option<Partition> {
    let mut tokens: Vec<&str> = column.split_whitespace().collect();
    let mut significant = false;

    if let Some(first) = tokens.first().copied() {
        if first == "*" {
            significant = true;
            tokens.remove(0);
        } else if let Some(rest) = first.strip_prefix('*') {
            significant = true;
            tokens[0] = rest;
        }
    }

    if tokens.len() < 3 {
        return None;
    }

    Some(Partition {
        swell: Swell::new(
            Units::Metric,
            parse_float(tokens[0]),
            parse_float(tokens[1]),
            parse_float(tokens[2]),
        ),
        significant,
    })
}

impl BulletinParser {
    /// Read the model run date and hour from the header
    pub fn parse_model_run(raw: &str) -> Result<ModelRun> {
        let line = raw
            .lines()
            .nth(CYCLE_LINE)
            .ok_or_else(|| SwellcastError::parse("bulletin header is too short"))?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 4 {
            return Err(SwellcastError::parse(format!(
                "invalid bulletin cycle line '{line}'"
            )));
        }

        let date = NaiveDate::parse_from_str(tokens[2], "%Y%m%d").map_err(|e| {
            SwellcastError::parse(format!("invalid model run date '{}': {e}", tokens[2]))
        })?;
        let hour = tokens[3]
            .parse::<u32>()
            .ok()
            .filter(|h| *h < 24)
            .ok_or_else(|| {
                SwellcastError::parse(format!("invalid model run hour '{}'", tokens[3]))
            })?;

        Ok(ModelRun { date, hour })
    }

    /// Timestamp of a `day hour` row, rolling into the next month (and year)
    /// when the day is before the model run's day
    fn row_time(run: &ModelRun, day: u32, hour: u32) -> Option<DateTime<Utc>> {
        let (mut year, mut month) = (run.date.year(), run.date.month());
        if day < run.date.day() {
            if month == 12 {
                month = 1;
                year += 1;
            } else {
                month += 1;
            }
        }
        NaiveDate::from_ymd_opt(year, month, day)?
            .and_hms_opt(hour, 0, 0)
            .map(|t| t.and_utc())
    }

    fn parse_row(run: &ModelRun, line: &str) -> Option<Observation> {
        let columns: Vec<&str> = line.split('|').collect();
        if columns.len() < MIN_COLUMNS {
            return None;
        }

        let when: Vec<&str> = columns[1].split_whitespace().collect();
        let [day, hour] = when.as_slice() else {
            return None;
        };
        let timestamp = Self::row_time(run, day.parse().ok()?, hour.parse().ok()?)?;

        let summary: Vec<&str> = columns[2].split_whitespace().collect();
        if summary.len() < 2 {
            return None;
        }
        let significant_height = parse_float(summary[0]);

        let mut data = Observation::new(timestamp, Units::Metric, Provenance::Bulletin);
        let last = LAST_PARTITION_COLUMN.min(columns.len() - 1);
        for column in &columns[FIRST_PARTITION_COLUMN..=last] {
            let Some(partition) = parse_partition(column) else {
                break;
            };
            if partition.significant {
                data.wave_summary = Some(Swell::new(
                    Units::Metric,
                    significant_height,
                    partition.swell.period,
                    partition.swell.direction,
                ));
            }
            data.swell_components.push(partition.swell);
        }

        if data.wave_summary.is_none() {
            let (period, direction) = data
                .swell_components
                .first()
                .map_or((f64::NAN, f64::NAN), |s| (s.period, s.direction));
            data.wave_summary = Some(Swell::new(
                Units::Metric,
                significant_height,
                period,
                direction,
            ));
        }

        Some(data)
    }

    /// Parse every hourly row of a bulletin into metric forecast records.
    ///
    /// Header, legend and footer rows are recognised by shape and skipped.
    pub fn parse(raw: &str) -> Result<Vec<Observation>> {
        let run = Self::parse_model_run(raw)?;

        let mut records = Vec::new();
        let mut skipped = 0;
        for line in raw.lines().skip(CYCLE_LINE + 1) {
            match Self::parse_row(&run, line) {
                Some(record) => records.push(record),
                None => skipped += 1,
            }
        }
        debug!("Skipped {} non-data bulletin lines", skipped);

        info!(
            "Parsed {} bulletin rows for model run {} {:02}z",
            records.len(),
            run.date,
            run.hour
        );

        records.sort_by_key(|record| record.timestamp);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const BULLETIN: &str = "\
 Location : 44097      (40.98N  71.12W)
 Model    : spectral resolution for swell partitioning
 Cycle    : 20240601 06 UTC
+-------+-----------+-----------------+-----------------+-----------------+
| day & |  Hst  n x |    Hs   Tp  dir |    Hs   Tp  dir |    Hs   Tp  dir |
|  hour |  (m)      |    (m)  (s) (d) |    (m)  (s) (d) |    (m)  (s) (d) |
+-------+-----------+-----------------+-----------------+-----------------+
|  1  6 |  1.45  2   |   0.60  5.0 200 | * 1.30 11.1  95 |                 |                 |                 |                 |
|  1  7 |  1.40  1   | * 1.38 10.9  96 |                 |                 |                 |                 |                 |
| 30 23 |  0.90  1   |   0.88  8.0 120 |                 |                 |                 |                 |                 |
+-------+-----------+-----------------+-----------------+-----------------+
| Hst : Total significant wave height                                      |
";

    #[test]
    fn test_parse_model_run() {
        let run = BulletinParser::parse_model_run(BULLETIN).unwrap();
        assert_eq!(run.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(run.hour, 6);
        assert_eq!(run.time(), Some(Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap()));
    }

    #[test]
    fn test_parse_rows() {
        let records = BulletinParser::parse(BULLETIN).unwrap();
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.provenance, Provenance::Bulletin);
        assert_eq!(first.timestamp, Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap());
        assert_eq!(first.swell_components.len(), 2);
        let summary = first.wave_summary.as_ref().unwrap();
        assert_eq!(summary.wave_height, 1.45);
        assert_eq!(summary.period, 11.1);
        assert_eq!(summary.direction, 95.0);

        assert_eq!(records[1].swell_components.len(), 1);
        assert_eq!(records[2].timestamp, Utc.with_ymd_and_hms(2024, 6, 30, 23, 0, 0).unwrap());
    }

    #[test]
    fn test_summary_falls_back_to_first_partition() {
        let records = BulletinParser::parse(BULLETIN).unwrap();
        let summary = records[2].wave_summary.as_ref().unwrap();
        assert_eq!(summary.wave_height, 0.9);
        assert_eq!(summary.period, 8.0);
        assert_eq!(summary.direction, 120.0);
    }

    #[test]
    fn test_month_and_year_rollover() {
        let run = ModelRun {
            date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            hour: 18,
        };
        assert_eq!(
            BulletinParser::row_time(&run, 1, 6),
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 6, 0, 0).unwrap())
        );
        let run = ModelRun {
            date: NaiveDate::from_ymd_opt(2024, 6, 29).unwrap(),
            hour: 0,
        };
        assert_eq!(
            BulletinParser::row_time(&run, 2, 0),
            Some(Utc.with_ymd_and_hms(2024, 7, 2, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_missing_cycle_line() {
        assert!(BulletinParser::parse("only\none line").is_err());
    }

    #[test]
    fn test_glued_asterisk() {
        let partition = parse_partition(" *1.30 11.1  95 ").unwrap();
        assert!(partition.significant);
        assert_eq!(partition.swell.wave_height, 1.3);
    }
}
