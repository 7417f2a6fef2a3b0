//! Realtime tabular feeds: standard meteorological (`.txt`) and detailed
//! wave summary (`.spec`)

use tracing::{info, warn};

use super::{BuoyParser, MISSING, parse_row_time, sort_ascending};
use crate::observation::{Observation, Provenance};
use crate::swell::Swell;
use crate::units::{self, Measurement, Units, parse_float};
use crate::{Result, SwellcastError};

const HEADER_LINES: usize = 2;
const MET_COLUMNS: usize = 19;
const DETAILED_COLUMNS: usize = 15;

fn check_columns(columns: &[&str], expected: usize) -> Result<()> {
    if columns.len() < expected {
        return Err(SwellcastError::parse(format!(
            "expected {expected} columns, got {}",
            columns.len()
        )));
    }
    Ok(())
}

fn parse_met_row(columns: &[&str]) -> Result<Observation> {
    check_columns(columns, MET_COLUMNS)?;
    let timestamp = parse_row_time(columns)?;
    let mut data = Observation::new(timestamp, Units::Metric, Provenance::Realtime);

    data.set_wind_direction(parse_float(columns[5]));
    data.wind_speed = parse_float(columns[6]);
    data.wind_gust = parse_float(columns[7]);

    let summary = Swell::new(
        Units::Metric,
        parse_float(columns[8]),
        parse_float(columns[9]),
        parse_float(columns[11]),
    );
    data.average_period = parse_float(columns[10]);
    if !summary.wave_height.is_nan() {
        data.wave_summary = Some(summary);
    }

    data.pressure = parse_float(columns[12]);
    data.air_temperature = parse_float(columns[13]);
    data.water_temperature = parse_float(columns[14]);
    data.dewpoint_temperature = parse_float(columns[15]);
    data.visibility = parse_float(columns[16]);
    data.pressure_tendency = parse_float(columns[17]);
    data.water_level = units::convert(
        parse_float(columns[18]),
        Measurement::Length,
        Units::English,
        Units::Metric,
    );

    Ok(data)
}

fn parse_detailed_row(columns: &[&str]) -> Result<Observation> {
    check_columns(columns, DETAILED_COLUMNS)?;
    let timestamp = parse_row_time(columns)?;
    let mut data = Observation::new(timestamp, Units::Metric, Provenance::Detailed);

    let mut swell = Swell::new(
        Units::Metric,
        parse_float(columns[6]),
        parse_float(columns[7]),
        f64::NAN,
    );
    swell.set_compass_direction(columns[10]);

    let mut wind_wave = Swell::new(
        Units::Metric,
        parse_float(columns[8]),
        parse_float(columns[9]),
        f64::NAN,
    );
    wind_wave.set_compass_direction(columns[11]);

    if columns[12] != MISSING {
        data.steepness = columns[12].to_string();
    }
    data.average_period = parse_float(columns[13]);
    data.wave_summary = Some(Swell::new(
        Units::Metric,
        parse_float(columns[5]),
        f64::NAN,
        parse_float(columns[14]),
    ));

    data.swell_components = vec![swell, wind_wave];
    data.interpolate_dominant_wave_period();
    data.interpolate_dominant_wave_direction();

    Ok(data)
}

impl BuoyParser {
    fn parse_table(
        &self,
        raw: &str,
        feed: &str,
        parse_row: fn(&[&str]) -> Result<Observation>,
    ) -> Result<Vec<Observation>> {
        let mut records = Vec::new();
        let mut parse_errors = 0;

        for line in self.data_lines(raw, HEADER_LINES)? {
            let columns: Vec<&str> = line.split_whitespace().collect();
            match parse_row(&columns) {
                Ok(record) => records.push(self.stamp(record)),
                Err(e) => {
                    warn!("Skipping {} row '{}': {}", feed, line.trim(), e);
                    parse_errors += 1;
                }
            }
        }

        info!(
            "Parsed {} {} rows ({} parse errors)",
            records.len(),
            feed,
            parse_errors
        );

        sort_ascending(&mut records);
        Ok(records)
    }

    /// Parse the standard meteorological table into metric records
    pub fn parse_realtime_met(&self, raw: &str) -> Result<Vec<Observation>> {
        self.parse_table(raw, "meteorological", parse_met_row)
    }

    /// Parse the detailed wave summary table into metric records with a
    /// swell and a wind-wave component each
    pub fn parse_detailed_wave(&self, raw: &str) -> Result<Vec<Observation>> {
        self.parse_table(raw, "detailed wave", parse_detailed_row)
    }
}
