//! Spectral wave density feeds (`.data_spec` energy + `.swdir` direction)

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::{BuoyParser, parse_row_time, sort_ascending};
use crate::observation::{Observation, Provenance};
use crate::spectrum::{DEFAULT_PEAK_DELTA, Spectrum};
use crate::units::{Units, parse_float};
use crate::wave_physics::steepness;
use crate::{Result, SwellcastError};

const HEADER_LINES: usize = 1;
/// Column index of the first value after the date in both files
const FIRST_VALUE_COLUMN: usize = 5;

fn tokens(line: &str) -> Vec<String> {
    line.replace(['(', ')'], " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn row_time(columns: &[String]) -> Result<DateTime<Utc>> {
    let refs: Vec<&str> = columns.iter().map(String::as_str).collect();
    parse_row_time(&refs)
}

/// Pair one energy row (`sep e1 f1 e2 f2 ...`) with its directional row
/// (`a1 f1 a2 f2 ...`) into a spectrum
fn build_spectrum(energy: &[String], directional: &[String]) -> Result<Spectrum> {
    if energy.len() <= FIRST_VALUE_COLUMN || directional.len() <= FIRST_VALUE_COLUMN {
        return Err(SwellcastError::parse("spectral row has no bins"));
    }

    let mut spectrum = Spectrum {
        separation_frequency: parse_float(&energy[FIRST_VALUE_COLUMN]),
        ..Spectrum::default()
    };

    for j in (FIRST_VALUE_COLUMN..directional.len().saturating_sub(1)).step_by(2) {
        let Some(bin_energy) = energy.get(j + 1) else {
            break;
        };
        spectrum.angle.push(parse_float(&directional[j]));
        spectrum.frequency.push(parse_float(&directional[j + 1]));
        spectrum.energy.push(parse_float(bin_energy));
    }

    if spectrum.is_empty() {
        return Err(SwellcastError::parse("spectral row has no bins"));
    }
    Ok(spectrum)
}

fn spectral_record(timestamp: DateTime<Utc>, spectrum: Spectrum) -> Observation {
    let mut data = Observation::new(timestamp, Units::Metric, Provenance::Spectral);
    data.swell_components = spectrum.swell_components(DEFAULT_PEAK_DELTA);
    data.average_period = spectrum.average_period();
    if let Some(summary) = spectrum.wave_summary() {
        data.steepness = steepness(summary.wave_height, summary.period).to_string();
        data.wave_summary = Some(summary);
    }
    data.spectrum = Some(spectrum);
    data
}

impl BuoyParser {
    /// Parse the paired energy and directional spectra into decomposed records.
    ///
    /// Rows are matched on their timestamp. The newest record takes
    /// `last_modified` as its time when given, since the data row only
    /// carries the hour of an intra-hour rerun.
    pub fn parse_spectra(
        &self,
        energy_raw: &str,
        directional_raw: &str,
        last_modified: Option<DateTime<Utc>>,
    ) -> Result<Vec<Observation>> {
        let energy_lines = self.data_lines(energy_raw, HEADER_LINES)?;
        let directional_lines = self.data_lines(directional_raw, HEADER_LINES)?;

        let mut directional_by_time: HashMap<DateTime<Utc>, Vec<String>> = HashMap::new();
        for line in directional_lines {
            let columns = tokens(line);
            match row_time(&columns) {
                Ok(time) => {
                    directional_by_time.insert(time, columns);
                }
                Err(e) => warn!("Skipping directional spectra row: {}", e),
            }
        }

        let mut records = Vec::new();
        let mut parse_errors = 0;

        for line in energy_lines {
            let energy = tokens(line);
            let parsed = row_time(&energy).and_then(|time| {
                let directional = directional_by_time.get(&time).ok_or_else(|| {
                    SwellcastError::parse(format!("no directional row for {time}"))
                })?;
                Ok((time, build_spectrum(&energy, directional)?))
            });

            match parsed {
                Ok((time, spectrum)) => records.push(self.stamp(spectral_record(time, spectrum))),
                Err(e) => {
                    warn!("Skipping spectra row: {}", e);
                    parse_errors += 1;
                }
            }
        }

        sort_ascending(&mut records);
        if let (Some(newest), Some(modified)) = (records.last_mut(), last_modified) {
            newest.timestamp = modified;
        }

        info!(
            "Parsed {} spectra rows ({} parse errors)",
            records.len(),
            parse_errors
        );
        Ok(records)
    }
}

/// Parse an HTTP `Last-Modified` value such as `Mon, 29 Jun 2020 14:50:20 GMT`
pub fn parse_last_modified(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|time| time.with_timezone(&Utc))
}
