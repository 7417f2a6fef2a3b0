//! Unit systems, scalar conversion and compass directions

use serde::{Deserialize, Serialize};

/// Label returned for a direction that cannot be mapped to a compass point
pub const UNKNOWN_DIRECTION: &str = "NULL";

/// The 16 compass points, clockwise from north
pub const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

const METERS_TO_FEET: f64 = 3.28;
const MPS_TO_MPH: f64 = 2.237;
const MPS_TO_KNOTS: f64 = 1.944;
const KNOTS_TO_MPH: f64 = 1.15;
const HPA_PER_INHG: f64 = 33.8638;
const KELVIN_OFFSET: f64 = 273.15;

/// Unit system tag carried by every physical record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Metric,
    English,
    Knots,
    Kelvin,
}

/// Physical quantity being converted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measurement {
    Length,
    Speed,
    Temperature,
    Pressure,
    Visibility,
    Direction,
}

fn fahrenheit_to_celsius(value: f64) -> f64 {
    (value - 32.0) * (5.0 / 9.0)
}

fn celsius_to_fahrenheit(value: f64) -> f64 {
    value * (9.0 / 5.0) + 32.0
}

/// Convert `value` of the given measurement from one unit system to another.
///
/// NaN passes through unchanged, as does any (measurement, unit) pair without
/// a defined factor.
#[must_use]
pub fn convert(value: f64, measurement: Measurement, source: Units, dest: Units) -> f64 {
    if value.is_nan() || source == dest {
        return value;
    }

    match (measurement, source, dest) {
        (Measurement::Length, Units::Metric, Units::English) => value * METERS_TO_FEET,
        (Measurement::Length, Units::English, Units::Metric) => value / METERS_TO_FEET,

        (Measurement::Speed, Units::Metric, Units::English) => value * MPS_TO_MPH,
        (Measurement::Speed, Units::English, Units::Metric) => value / MPS_TO_MPH,
        (Measurement::Speed, Units::Metric, Units::Knots) => value * MPS_TO_KNOTS,
        (Measurement::Speed, Units::Knots, Units::Metric) => value / MPS_TO_KNOTS,
        (Measurement::Speed, Units::Knots, Units::English) => value * KNOTS_TO_MPH,
        (Measurement::Speed, Units::English, Units::Knots) => value / KNOTS_TO_MPH,

        (Measurement::Temperature, Units::Metric, Units::English) => celsius_to_fahrenheit(value),
        (Measurement::Temperature, Units::English, Units::Metric) => fahrenheit_to_celsius(value),
        (Measurement::Temperature, Units::Kelvin, Units::Metric) => value - KELVIN_OFFSET,
        (Measurement::Temperature, Units::Metric, Units::Kelvin) => value + KELVIN_OFFSET,
        (Measurement::Temperature, Units::Kelvin, Units::English) => {
            celsius_to_fahrenheit(value - KELVIN_OFFSET)
        }
        (Measurement::Temperature, Units::English, Units::Kelvin) => {
            fahrenheit_to_celsius(value) + KELVIN_OFFSET
        }

        (Measurement::Pressure, Units::Metric, Units::English) => value / HPA_PER_INHG,
        (Measurement::Pressure, Units::English, Units::Metric) => value * HPA_PER_INHG,

        _ => value,
    }
}

/// Earth's radius in the length unit used for great-circle distances
#[must_use]
pub fn earths_radius(unit: Units) -> f64 {
    match unit {
        Units::Metric => 6371.0,
        Units::English => 3956.0,
        _ => 1.0,
    }
}

/// Display name for a measurement expressed in a unit system
#[must_use]
pub fn unit_name(unit: Units, measurement: Measurement, abbrev: bool) -> &'static str {
    match (unit, measurement, abbrev) {
        (Units::Metric, Measurement::Length, true) => "m",
        (Units::Metric, Measurement::Length, false) => "meters",
        (Units::Metric, Measurement::Speed, true) => "m/s",
        (Units::Metric, Measurement::Speed, false) => "meters per second",
        (Units::Metric, Measurement::Temperature, true) => "°C",
        (Units::Metric, Measurement::Temperature, false) => "° celsius",
        (Units::Metric, Measurement::Pressure, true) => "hPa",
        (Units::Metric, Measurement::Pressure, false) => "hecta pascals",
        (Units::English, Measurement::Length, true) => "ft",
        (Units::English, Measurement::Length, false) => "feet",
        (Units::English, Measurement::Speed, true) => "mph",
        (Units::English, Measurement::Speed, false) => "miles per hour",
        (Units::English, Measurement::Temperature, true) => "°F",
        (Units::English, Measurement::Temperature, false) => "° fahrenheit",
        (Units::English, Measurement::Pressure, true) => "in HG",
        (Units::English, Measurement::Pressure, false) => "inches mercury",
        (Units::Knots, Measurement::Speed, true) => "kts",
        (Units::Knots, Measurement::Speed, false) => "knots",
        (Units::Kelvin, Measurement::Temperature, true) => "K",
        (Units::Kelvin, Measurement::Temperature, false) => "kelvin",
        (Units::Metric | Units::English, Measurement::Visibility, true) => "nmi",
        (Units::Metric | Units::English, Measurement::Visibility, false) => "nautical miles",
        (_, Measurement::Direction, true) => "°",
        (_, Measurement::Direction, false) => "degrees",
        _ => "",
    }
}

/// Map a bearing in degrees to one of the 16 compass points.
///
/// Each point owns a 22.5° sector centered on it, so north covers
/// [348.75, 11.25). Non-finite input yields [`UNKNOWN_DIRECTION`].
#[must_use]
pub fn degree_to_direction(degrees: f64) -> &'static str {
    if !degrees.is_finite() {
        return UNKNOWN_DIRECTION;
    }

    let normalized = degrees.rem_euclid(360.0);
    let index = ((normalized + 11.25) / 22.5).floor() as usize % COMPASS_POINTS.len();
    COMPASS_POINTS[index]
}

/// Map a compass label ("SW", "southwest", ...) to its bearing in degrees
#[must_use]
pub fn direction_to_degree(direction: &str) -> Option<f64> {
    let degrees = match direction.trim().to_lowercase().as_str() {
        "n" | "north" => 0.0,
        "nne" | "north-northeast" => 22.5,
        "ne" | "northeast" => 45.0,
        "ene" | "east-northeast" => 67.5,
        "e" | "east" => 90.0,
        "ese" | "east-southeast" => 112.5,
        "se" | "southeast" => 135.0,
        "sse" | "south-southeast" => 157.5,
        "s" | "south" => 180.0,
        "ssw" | "south-southwest" => 202.5,
        "sw" | "southwest" => 225.0,
        "wsw" | "west-southwest" => 247.5,
        "w" | "west" => 270.0,
        "wnw" | "west-northwest" => 292.5,
        "nw" | "northwest" => 315.0,
        "nnw" | "north-northwest" => 337.5,
        _ => return None,
    };
    Some(degrees)
}

/// Parse a numeric field, treating anything unparsable (`MM`, `-`, blank) as NaN
#[must_use]
pub fn parse_float(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Measurement::Length, Units::Metric, Units::English)]
    #[case(Measurement::Speed, Units::Metric, Units::English)]
    #[case(Measurement::Speed, Units::Metric, Units::Knots)]
    #[case(Measurement::Speed, Units::Knots, Units::English)]
    #[case(Measurement::Temperature, Units::Metric, Units::English)]
    #[case(Measurement::Temperature, Units::Kelvin, Units::English)]
    #[case(Measurement::Temperature, Units::Kelvin, Units::Metric)]
    #[case(Measurement::Pressure, Units::Metric, Units::English)]
    fn test_conversion_is_involutive(
        #[case] measurement: Measurement,
        #[case] source: Units,
        #[case] dest: Units,
    ) {
        for value in [-40.0, 0.0, 1.5, 12.25, 1013.25, 300.0] {
            let there = convert(value, measurement, source, dest);
            let back = convert(there, measurement, dest, source);
            let scale = value.abs().max(1.0);
            assert!(
                ((back - value) / scale).abs() < 1e-6,
                "{measurement:?} {source:?}->{dest:?}: {value} became {back}"
            );
        }
    }

    #[test]
    fn test_known_factors() {
        assert!((convert(1.0, Measurement::Length, Units::Metric, Units::English) - 3.28).abs() < 1e-12);
        assert!((convert(10.0, Measurement::Speed, Units::Metric, Units::Knots) - 19.44).abs() < 1e-9);
        assert!((convert(100.0, Measurement::Temperature, Units::Metric, Units::English) - 212.0).abs() < 1e-9);
        assert!((convert(273.15, Measurement::Temperature, Units::Kelvin, Units::Metric)).abs() < 1e-9);
        assert!((convert(1.0, Measurement::Pressure, Units::English, Units::Metric) - 33.8638).abs() < 1e-9);
    }

    #[test]
    fn test_nan_passes_through() {
        assert!(convert(f64::NAN, Measurement::Speed, Units::Metric, Units::Knots).is_nan());
    }

    #[test]
    fn test_compass_round_trip() {
        for label in COMPASS_POINTS {
            let degrees = direction_to_degree(label).unwrap();
            assert_eq!(degree_to_direction(degrees), label);
        }
    }

    #[rstest]
    #[case(0.0, "N")]
    #[case(359.0, "N")]
    #[case(360.0, "N")]
    #[case(11.0, "N")]
    #[case(12.0, "NNE")]
    #[case(90.0, "E")]
    #[case(210.0, "SSW")]
    #[case(270.0, "W")]
    #[case(-90.0, "W")]
    fn test_degree_to_direction(#[case] degrees: f64, #[case] expected: &str) {
        assert_eq!(degree_to_direction(degrees), expected);
    }

    #[test]
    fn test_unknown_directions() {
        assert_eq!(degree_to_direction(f64::NAN), UNKNOWN_DIRECTION);
        assert_eq!(direction_to_degree("upward"), None);
        assert_eq!(direction_to_degree("Southwest"), Some(225.0));
    }

    #[test]
    fn test_parse_float_missing_marker() {
        assert!(parse_float("MM").is_nan());
        assert_eq!(parse_float(" 1.5 "), 1.5);
    }

    #[test]
    fn test_unit_names() {
        assert_eq!(unit_name(Units::English, Measurement::Length, true), "ft");
        assert_eq!(unit_name(Units::Knots, Measurement::Speed, false), "knots");
    }
}
