//! Latest observation report (`latest_obs/{id}.txt`)

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, warn};

use super::BuoyParser;
use crate::observation::{Observation, Provenance};
use crate::swell::Swell;
use crate::units::{self, Measurement, Units, parse_float};
use crate::{Result, SwellcastError};

/// Index of the `HHMM TZ MM/DD/YY` line
const REPORT_TIME_LINE: usize = 4;

/// Which component the next `Period:`/`Direction:` key fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Swell,
    WindWave,
}

fn parse_report_time(line: &str) -> Result<DateTime<Utc>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(SwellcastError::parse(format!(
            "invalid report time line '{line}'"
        )));
    }

    // the zone token is informational, the report clock is UTC
    let stamp = format!("{} {}", tokens[0], tokens[2]);
    NaiveDateTime::parse_from_str(&stamp, "%H%M %m/%d/%y")
        .map(|naive| naive.and_utc())
        .map_err(|e| SwellcastError::parse(format!("invalid report time '{line}': {e}")))
}

/// Wind direction in degrees from either `SW (220°) 12.0 kt` or `N at 10 kn`
fn parse_wind_direction(tokens: &[&str]) -> f64 {
    let bracketed = tokens
        .iter()
        .find(|t| t.starts_with('('))
        .map(|t| t.chars().filter(char::is_ascii_digit).collect::<String>())
        .filter(|digits| !digits.is_empty());

    match bracketed {
        Some(digits) => parse_float(&digits),
        None => tokens
            .first()
            .and_then(|label| units::direction_to_degree(label))
            .unwrap_or(f64::NAN),
    }
}

fn first_number(tokens: &[&str]) -> f64 {
    tokens
        .iter()
        .map(|t| parse_float(t))
        .find(|v| !v.is_nan())
        .unwrap_or(f64::NAN)
}

fn pressure_tendency(value: &str) -> f64 {
    let value = value.to_lowercase();
    if value.contains("falling") {
        -1.0
    } else if value.contains("rising") {
        1.0
    } else if value.contains("steady") {
        0.0
    } else {
        f64::NAN
    }
}

impl BuoyParser {
    /// Parse the free-form latest report into one english-unit record
    pub fn parse_latest_report(&self, raw: &str) -> Result<Observation> {
        let lines: Vec<&str> = raw.lines().collect();
        if lines.len() <= REPORT_TIME_LINE + 1 {
            return Err(SwellcastError::parse("latest report is too short"));
        }

        let timestamp = parse_report_time(lines[REPORT_TIME_LINE])?;
        let mut data = Observation::new(timestamp, Units::English, Provenance::LatestReport);

        let mut summary = Swell::empty(Units::English);
        let mut swell = Swell::empty(Units::English);
        let mut wind_wave = Swell::empty(Units::English);
        let mut period_slot = Slot::Swell;
        let mut direction_slot = Slot::Swell;

        for line in &lines[REPORT_TIME_LINE + 1..] {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let tokens: Vec<&str> = value.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            let number = parse_float(tokens[0]);

            match key.as_str() {
                "wind" => {
                    data.set_wind_direction(parse_wind_direction(&tokens));
                    let knots = first_number(&tokens[1..]);
                    data.wind_speed =
                        units::convert(knots, Measurement::Speed, Units::Knots, Units::English);
                }
                "gust" => {
                    data.wind_gust =
                        units::convert(number, Measurement::Speed, Units::Knots, Units::English);
                }
                "seas" => summary.wave_height = number,
                "peak period" => summary.period = number,
                "pres" => {
                    data.pressure = number;
                    data.pressure_tendency = pressure_tendency(value);
                }
                "air temp" => data.air_temperature = number,
                "water temp" => data.water_temperature = number,
                "dew point" => data.dewpoint_temperature = number,
                "swell" => swell.wave_height = number,
                "wind wave" => wind_wave.wave_height = number,
                "period" => {
                    match period_slot {
                        Slot::Swell => swell.period = number,
                        Slot::WindWave => wind_wave.period = number,
                    }
                    period_slot = Slot::WindWave;
                }
                "direction" => {
                    match direction_slot {
                        Slot::Swell => swell.set_compass_direction(tokens[0]),
                        Slot::WindWave => wind_wave.set_compass_direction(tokens[0]),
                    }
                    direction_slot = Slot::WindWave;
                }
                other => debug!("Ignoring latest report key '{}'", other),
            }
        }

        let both_components = !swell.wave_height.is_nan() && !wind_wave.wave_height.is_nan();
        if !summary.wave_height.is_nan() {
            data.wave_summary = Some(summary);
        }
        if !swell.wave_height.is_nan() {
            data.swell_components.push(swell);
        }
        if !wind_wave.wave_height.is_nan() {
            data.swell_components.push(wind_wave);
        }
        if both_components {
            data.interpolate_dominant_wave_direction();
        }

        if data.wave_summary.is_none() && data.wind_speed.is_nan() {
            warn!("Latest report at {} carried no wave or wind reading", timestamp);
        }

        Ok(self.stamp(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const REPORT: &str = "Station 44097
40.967N 71.126W

5:26 pm EDT
2126 GMT 06/01/24
Wind: SW (220°) 12.0 kt
Gust: 15.9 kt
Seas: 4.3 ft
Peak Period: 8 sec
Pres: 30.06 falling
Air Temp: 61.0 °F
Water Temp: 58.8 °F

Wave Summary
5:00 pm EDT
2100 GMT 06/01/24
Swell: 2.6 ft
Period: 8.3 sec
Direction: SSE
Wind Wave: 3.3 ft
Period: 4.8 sec
Direction: SW
";

    #[test]
    fn test_parse_latest_report() {
        let data = BuoyParser::new().parse_latest_report(REPORT).unwrap();
        assert_eq!(data.timestamp, Utc.with_ymd_and_hms(2024, 6, 1, 21, 26, 0).unwrap());
        assert_eq!(data.unit, Units::English);
        assert_eq!(data.wind_direction, 220.0);
        assert_eq!(data.wind_compass_direction, "SW");
        assert!((data.wind_speed - 12.0 * 1.15).abs() < 1e-9);
        assert!((data.wind_gust - 15.9 * 1.15).abs() < 1e-9);
        assert_eq!(data.pressure, 30.06);
        assert_eq!(data.pressure_tendency, -1.0);
        assert_eq!(data.air_temperature, 61.0);

        assert_eq!(data.swell_components.len(), 2);
        assert_eq!(data.swell_components[0].period, 8.3);
        assert_eq!(data.swell_components[0].compass_direction, "SSE");
        assert_eq!(data.swell_components[1].period, 4.8);
        assert_eq!(data.swell_components[1].direction, 225.0);

        let summary = data.wave_summary.unwrap();
        assert_eq!(summary.wave_height, 4.3);
        assert_eq!(summary.compass_direction, "SSE");
    }

    #[test]
    fn test_wind_without_degrees() {
        assert_eq!(parse_wind_direction(&["N", "at", "10", "kn"]), 0.0);
        assert_eq!(first_number(&["at", "10", "kn"]), 10.0);
        assert_eq!(parse_wind_direction(&["W", "(270°)", "3", "kt"]), 270.0);
    }

    #[test]
    fn test_short_report_is_rejected() {
        assert!(BuoyParser::new().parse_latest_report("Station 1\n").is_err());
        let bad_time = "a\nb\nc\nd\nnot a time\nSeas: 3 ft\n";
        assert!(BuoyParser::new().parse_latest_report(bad_time).is_err());
    }

    #[test]
    fn test_pressure_tendency_words() {
        assert_eq!(pressure_tendency(" 29.92 in ( Rising )"), 1.0);
        assert_eq!(pressure_tendency(" 29.92 steady"), 0.0);
        assert!(pressure_tendency(" 29.92").is_nan());
    }
}
