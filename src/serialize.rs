//! Self-describing JSON encoding for domain records.
//!
//! Every record is written as `{"classname__": ..., "modulename__": ..., ...fields}`.
//! Timestamps are epoch seconds and NaN is written as `null`. Decoding goes
//! through an explicit registry keyed on `classname__`; unknown tags are
//! rejected.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::location::Location;
use crate::ndbc::stations::Station;
use crate::observation::Observation;
use crate::spectrum::Spectrum;
use crate::swell::Swell;
use crate::tide::{TideEvent, TidePrediction};
use crate::{Result, SwellcastError};

pub const CLASS_KEY: &str = "classname__";
pub const MODULE_KEY: &str = "modulename__";

/// A record type with a stable class tag on the wire
pub trait Tagged: Serialize + DeserializeOwned {
    const CLASS_NAME: &'static str;
    const MODULE_NAME: &'static str;
}

impl Tagged for Location {
    const CLASS_NAME: &'static str = "Location";
    const MODULE_NAME: &'static str = "swellcast.location";
}

impl Tagged for Swell {
    const CLASS_NAME: &'static str = "Swell";
    const MODULE_NAME: &'static str = "swellcast.swell";
}

impl Tagged for Spectrum {
    const CLASS_NAME: &'static str = "Spectrum";
    const MODULE_NAME: &'static str = "swellcast.spectrum";
}

impl Tagged for Observation {
    const CLASS_NAME: &'static str = "Observation";
    const MODULE_NAME: &'static str = "swellcast.observation";
}

impl Tagged for TidePrediction {
    const CLASS_NAME: &'static str = "TidePrediction";
    const MODULE_NAME: &'static str = "swellcast.tide";
}

impl Tagged for TideEvent {
    const CLASS_NAME: &'static str = "TideEvent";
    const MODULE_NAME: &'static str = "swellcast.tide";
}

impl Tagged for Station {
    const CLASS_NAME: &'static str = "Station";
    const MODULE_NAME: &'static str = "swellcast.ndbc.stations";
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    #[serde(rename = "classname__")]
    class_name: &'static str,
    #[serde(rename = "modulename__")]
    module_name: &'static str,
    #[serde(flatten)]
    inner: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(rename = "classname__")]
    class_name: String,
    #[serde(rename = "modulename__", default)]
    #[allow(dead_code)]
    module_name: String,
    #[serde(flatten)]
    inner: T,
}

fn wrap<T: Tagged>(record: &T) -> EnvelopeRef<'_, T> {
    EnvelopeRef {
        class_name: T::CLASS_NAME,
        module_name: T::MODULE_NAME,
        inner: record,
    }
}

fn unwrap<T: Tagged, E: serde::de::Error>(envelope: Envelope<T>) -> std::result::Result<T, E> {
    if envelope.class_name != T::CLASS_NAME {
        return Err(E::custom(format!(
            "expected class {} but found {}",
            T::CLASS_NAME,
            envelope.class_name
        )));
    }
    Ok(envelope.inner)
}

/// Encode a record as tagged JSON
pub fn to_json<T: Tagged>(record: &T) -> Result<String> {
    Ok(serde_json::to_string(&wrap(record))?)
}

/// Encode a record as a tagged JSON value
pub fn to_value<T: Tagged>(record: &T) -> Result<Value> {
    Ok(serde_json::to_value(wrap(record))?)
}

/// Decode a record of a known type, checking its class tag
pub fn from_json<T: Tagged>(json: &str) -> Result<T> {
    let envelope: Envelope<T> = serde_json::from_str(json)?;
    unwrap::<T, serde_json::Error>(envelope).map_err(SwellcastError::from)
}

fn from_value<T: Tagged>(value: Value) -> Result<T> {
    let envelope: Envelope<T> = serde_json::from_value(value)?;
    unwrap::<T, serde_json::Error>(envelope).map_err(SwellcastError::from)
}

/// Any record that can appear on the wire
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Location(Location),
    Swell(Swell),
    Spectrum(Spectrum),
    Observation(Observation),
    TidePrediction(TidePrediction),
    TideEvent(TideEvent),
    Station(Station),
}

type Constructor = fn(Value) -> Result<Record>;

static REGISTRY: LazyLock<HashMap<&'static str, Constructor>> = LazyLock::new(|| {
    let mut registry: HashMap<&'static str, Constructor> = HashMap::new();
    registry.insert(Location::CLASS_NAME, |v| from_value(v).map(Record::Location));
    registry.insert(Swell::CLASS_NAME, |v| from_value(v).map(Record::Swell));
    registry.insert(Spectrum::CLASS_NAME, |v| from_value(v).map(Record::Spectrum));
    registry.insert(Observation::CLASS_NAME, |v| {
        from_value(v).map(Record::Observation)
    });
    registry.insert(TidePrediction::CLASS_NAME, |v| {
        from_value(v).map(Record::TidePrediction)
    });
    registry.insert(TideEvent::CLASS_NAME, |v| from_value(v).map(Record::TideEvent));
    registry.insert(Station::CLASS_NAME, |v| from_value(v).map(Record::Station));
    registry
});

impl Record {
    /// Decode any registered record, dispatching on its class tag
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let class_name = value
            .get(CLASS_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| SwellcastError::serialization(format!("missing {CLASS_KEY} tag")))?
            .to_string();

        let constructor = REGISTRY.get(class_name.as_str()).ok_or_else(|| {
            SwellcastError::serialization(format!("unknown record class {class_name}"))
        })?;
        constructor(value)
    }

    pub fn to_json(&self) -> Result<String> {
        match self {
            Record::Location(r) => to_json(r),
            Record::Swell(r) => to_json(r),
            Record::Spectrum(r) => to_json(r),
            Record::Observation(r) => to_json(r),
            Record::TidePrediction(r) => to_json(r),
            Record::TideEvent(r) => to_json(r),
            Record::Station(r) => to_json(r),
        }
    }

    /// Encode a list of records as a JSON array
    pub fn list_to_json(records: &[Record]) -> Result<String> {
        let values = records
            .iter()
            .map(|record| Ok(serde_json::from_str::<Value>(&record.to_json()?)?))
            .collect::<Result<Vec<_>>>()?;
        Ok(serde_json::to_string(&values)?)
    }

    /// Decode a JSON array of records
    pub fn list_from_json(json: &str) -> Result<Vec<Record>> {
        let values: Vec<Value> = serde_json::from_str(json)?;
        values.into_iter().map(Record::from_value).collect()
    }
}

/// `f64` fields where NaN means "not observed"; written as `null`
pub mod nan {
    use super::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }

    /// Default for a missing key
    #[must_use]
    pub fn missing() -> f64 {
        f64::NAN
    }
}

/// `Vec<f64>` with NaN entries written as `null`
pub mod nan_vec {
    use super::{Deserialize, Deserializer, Serializer};
    use serde::ser::SerializeSeq;

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            let value = if value.is_nan() { None } else { Some(value) };
            seq.serialize_element(&value)?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let values = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

/// A nested record written with its own class tag
pub mod tagged {
    use super::*;

    pub fn serialize<T: Tagged, S: Serializer>(value: &T, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        wrap(value).serialize(serializer)
    }

    pub fn deserialize<'de, T: Tagged, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<T, D::Error> {
        unwrap(Envelope::<T>::deserialize(deserializer)?)
    }
}

/// An optional nested record written with its own class tag
pub mod tagged_option {
    use super::*;

    pub fn serialize<T: Tagged, S: Serializer>(
        value: &Option<T>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match value {
            Some(record) => serializer.serialize_some(&wrap(record)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T: Tagged, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<T>, D::Error> {
        Option::<Envelope<T>>::deserialize(deserializer)?
            .map(unwrap)
            .transpose()
    }
}

/// A list of nested records, each written with its own class tag
pub mod tagged_vec {
    use super::*;
    use serde::ser::SerializeSeq;

    pub fn serialize<T: Tagged, S: Serializer>(
        values: &[T],
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&wrap(value))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, T: Tagged, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Vec<T>, D::Error> {
        Vec::<Envelope<T>>::deserialize(deserializer)?
            .into_iter()
            .map(unwrap)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ndbc::StationType;
    use crate::observation::Provenance;
    use crate::tide::{TideDatum, TideEventType};
    use crate::units::Units;
    use chrono::{DateTime, TimeZone, Utc};
    use rstest::rstest;

    fn time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn observation() -> Observation {
        let mut record = Observation::new(time(), Units::Metric, Provenance::Spectral);
        record.expiration_time = Some(Utc.with_ymd_and_hms(2024, 6, 1, 12, 35, 0).unwrap());
        record.wave_summary = Some(Swell::new(Units::Metric, 1.25, 11.0, 135.0));
        let mut component = Swell::new(Units::Metric, 0.75, 8.0, 190.0);
        component.max_energy = Some(1.5);
        component.frequency_index = Some(3);
        record.swell_components = vec![component];
        record.spectrum = Some(Spectrum::new(
            vec![0.05, 0.1, 0.15],
            vec![0.25, f64::NAN, 0.5],
            vec![180.0, 190.0, 200.0],
            0.1,
        ));
        record.steepness = "AVERAGE".to_string();
        record.wind_speed = 6.5;
        record.short_forecast = Some("Mostly Sunny".to_string());
        record
    }

    fn station() -> Station {
        let mut station = Station::new(
            "44097",
            Location::named(40.967, -71.126, "BLOCK ISLAND, RI"),
            StationType::Buoy,
        );
        station.owner = "Scripps".to_string();
        station.active = true;
        station
    }

    fn tide_prediction() -> TidePrediction {
        TidePrediction {
            timestamp: time(),
            unit: Units::English,
            water_level: 3.25,
            datum: TideDatum::MeanLowerLowWater,
        }
    }

    fn tide_event() -> TideEvent {
        TideEvent {
            timestamp: time(),
            unit: Units::English,
            water_level: f64::NAN,
            datum: TideDatum::MeanLowerLowWater,
            event: TideEventType::High,
        }
    }

    fn record(class_name: &str) -> Record {
        match class_name {
            "Location" => Record::Location(Location::named(41.4, -71.45, "Narragansett")),
            "Swell" => Record::Swell(Swell::new(Units::English, 4.5, 12.0, 157.5)),
            "Spectrum" => Record::Spectrum(Spectrum::new(vec![0.05], vec![0.25], vec![90.0], f64::NAN)),
            "Observation" => Record::Observation(observation()),
            "TidePrediction" => Record::TidePrediction(tide_prediction()),
            "TideEvent" => Record::TideEvent(tide_event()),
            "Station" => Record::Station(station()),
            other => panic!("no sample for {other}"),
        }
    }

    #[test]
    fn test_swell_is_tagged() {
        let swell = Swell::new(Units::Metric, 1.5, 10.0, 180.0);
        let value = to_value(&swell).unwrap();
        assert_eq!(value[CLASS_KEY], "Swell");
        assert_eq!(value[MODULE_KEY], "swellcast.swell");
        assert_eq!(value["wave_height"], 1.5);
    }

    #[test]
    fn test_nan_round_trips_through_null() {
        let swell = Swell::new(Units::English, f64::NAN, 9.0, 45.0);
        let json = to_json(&swell).unwrap();
        assert!(json.contains("\"wave_height\":null"));

        let decoded: Swell = from_json(&json).unwrap();
        assert!(decoded.wave_height.is_nan());
        assert_eq!(decoded.period.to_bits(), 9.0_f64.to_bits());
        assert_eq!(decoded.compass_direction, "NE");
    }

    #[test]
    fn test_registry_dispatch() {
        let location = Location::named(41.4, -71.4, "Narragansett");
        let json = to_json(&location).unwrap();
        match Record::from_json(&json).unwrap() {
            Record::Location(decoded) => {
                assert_eq!(decoded.name.as_deref(), Some("Narragansett"));
                assert!(decoded.altitude.is_nan());
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn test_unknown_class_is_rejected() {
        let err = Record::from_json(r#"{"classname__": "Teapot", "modulename__": "kitchen"}"#)
            .unwrap_err();
        assert!(matches!(err, SwellcastError::Serialization { .. }));
        assert!(err.to_string().contains("Teapot"));

        let err = Record::from_json(r#"{"wave_height": 1.0}"#).unwrap_err();
        assert!(matches!(err, SwellcastError::Serialization { .. }));
    }

    #[test]
    fn test_class_mismatch_is_rejected() {
        let json = to_json(&Location::new(1.0, 2.0)).unwrap();
        assert!(from_json::<Swell>(&json).is_err());
    }

    #[test]
    fn test_spectrum_vectors_keep_nan() {
        let spectrum = Spectrum::new(vec![0.05, 0.1], vec![f64::NAN, 0.3], vec![10.0, 20.0], 0.1);
        let decoded: Spectrum = from_json(&to_json(&spectrum).unwrap()).unwrap();
        assert!(decoded.energy[0].is_nan());
        assert_eq!(decoded.energy[1], 0.3);
        assert_eq!(decoded.frequency, spectrum.frequency);
    }

    #[test]
    fn test_observation_round_trip() {
        let original = observation();
        let decoded: Observation = from_json(&to_json(&original).unwrap()).unwrap();

        assert_eq!(decoded.timestamp, original.timestamp);
        assert_eq!(decoded.expiration_time, original.expiration_time);
        assert_eq!(decoded.provenance, Provenance::Spectral);
        assert_eq!(decoded.unit, Units::Metric);
        assert_eq!(decoded.wave_summary, original.wave_summary);
        assert_eq!(decoded.swell_components, original.swell_components);
        assert_eq!(decoded.steepness, "AVERAGE");
        assert_eq!(decoded.short_forecast.as_deref(), Some("Mostly Sunny"));
        assert_eq!(decoded.wind_speed.to_bits(), 6.5_f64.to_bits());
        assert!(decoded.wind_gust.is_nan());
        assert!(decoded.water_level.is_nan());
        assert!(decoded.maximum_breaking_height.is_nan());

        let spectrum = decoded.spectrum.unwrap();
        assert_eq!(spectrum.frequency, vec![0.05, 0.1, 0.15]);
        assert!(spectrum.energy[1].is_nan());
        assert_eq!(spectrum.energy[2].to_bits(), 0.5_f64.to_bits());
        assert_eq!(spectrum.separation_frequency.to_bits(), 0.1_f64.to_bits());
    }

    #[test]
    fn test_observation_without_expiration() {
        let record = Observation::new(time(), Units::English, Provenance::Bulletin);
        let value = to_value(&record).unwrap();
        assert!(value["expiration_time"].is_null());
        assert_eq!(value["timestamp"], time().timestamp());

        let decoded: Observation = from_value(value).unwrap();
        assert!(decoded.expiration_time.is_none());
        assert!(decoded.wave_summary.is_none());
        assert!(decoded.swell_components.is_empty());
    }

    #[test]
    fn test_station_keeps_tagged_location() {
        let original = station();
        let value = to_value(&original).unwrap();
        assert_eq!(value["location"][CLASS_KEY], "Location");

        let decoded: Station = from_value(value).unwrap();
        assert_eq!(decoded.station_id, "44097");
        assert_eq!(decoded.name, original.name);
        assert_eq!(decoded.owner, "Scripps");
        assert!(decoded.active);
        assert_eq!(decoded.location.latitude.to_bits(), 40.967_f64.to_bits());
        assert_eq!(decoded.location.name, original.location.name);
        assert!(decoded.location.altitude.is_nan());
    }

    #[test]
    fn test_tide_records_round_trip() {
        let prediction: TidePrediction = from_json(&to_json(&tide_prediction()).unwrap()).unwrap();
        assert_eq!(prediction, tide_prediction());

        let event: TideEvent = from_json(&to_json(&tide_event()).unwrap()).unwrap();
        assert_eq!(event.timestamp, time());
        assert_eq!(event.event, TideEventType::High);
        assert!(event.water_level.is_nan());
    }

    #[rstest]
    #[case("Location")]
    #[case("Swell")]
    #[case("Spectrum")]
    #[case("Observation")]
    #[case("TidePrediction")]
    #[case("TideEvent")]
    #[case("Station")]
    fn test_record_round_trips_by_class(#[case] class_name: &str) {
        let json = record(class_name).to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[CLASS_KEY], class_name);

        let decoded = Record::from_json(&json).unwrap();
        assert_eq!(decoded.to_json().unwrap(), json);
    }

    #[test]
    fn test_record_list_round_trip() {
        let classes = ["Observation", "Station", "TidePrediction", "TideEvent"];
        let records: Vec<Record> = classes.iter().map(|c| record(c)).collect();

        let json = Record::list_to_json(&records).unwrap();
        let decoded = Record::list_from_json(&json).unwrap();
        assert_eq!(decoded.len(), classes.len());
        assert!(matches!(decoded[0], Record::Observation(_)));
        assert!(matches!(decoded[1], Record::Station(_)));
        assert!(matches!(decoded[2], Record::TidePrediction(_)));
        assert!(matches!(decoded[3], Record::TideEvent(_)));
        assert_eq!(Record::list_to_json(&decoded).unwrap(), json);
    }
}
