//! Station catalog (`activestations.xml`) and nearest-station queries

use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::EndpointsConfig;
use crate::location::Location;
use crate::units::Units;
use crate::{Result, SwellcastError};

/// Platform type as listed in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationType {
    Buoy,
    Fixed,
    Oilrig,
    Dart,
    Tao,
    Other,
}

impl StationType {
    #[must_use]
    pub fn from_catalog(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "buoy" => StationType::Buoy,
            "fixed" => StationType::Fixed,
            "oilrig" => StationType::Oilrig,
            "dart" => StationType::Dart,
            "tao" => StationType::Tao,
            _ => StationType::Other,
        }
    }
}

impl std::str::FromStr for StationType {
    type Err = SwellcastError;

    fn from_str(s: &str) -> Result<Self> {
        match StationType::from_catalog(s) {
            StationType::Other if !s.eq_ignore_ascii_case("other") => Err(
                SwellcastError::parse(format!("unknown station type '{s}'")),
            ),
            station_type => Ok(station_type),
        }
    }
}

/// One observing platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub station_id: String,
    /// Position; `name` holds the raw catalog name
    #[serde(with = "crate::serialize::tagged")]
    pub location: Location,
    /// Cleaned-up display name
    pub name: String,
    pub owner: String,
    pub program: String,
    pub station_type: StationType,
    /// Reports meteorological data
    pub active: bool,
    pub currents: bool,
    pub water_quality: bool,
    pub dart: bool,
}

impl Station {
    #[must_use]
    pub fn new(station_id: impl Into<String>, location: Location, station_type: StationType) -> Self {
        let name = location
            .name
            .as_deref()
            .map(display_name)
            .unwrap_or_default();
        Self {
            station_id: station_id.into(),
            location,
            name,
            owner: String::new(),
            program: String::new(),
            station_type,
            active: false,
            currents: false,
            water_quality: false,
            dart: false,
        }
    }

    #[must_use]
    pub fn latest_reading_url(&self, endpoints: &EndpointsConfig) -> String {
        format!("{}/data/latest_obs/{}.txt", endpoints.ndbc_base_url, self.station_id)
    }

    #[must_use]
    pub fn meteorological_reading_url(&self, endpoints: &EndpointsConfig) -> String {
        realtime_url(endpoints, &self.station_id, "txt")
    }

    #[must_use]
    pub fn detailed_wave_reading_url(&self, endpoints: &EndpointsConfig) -> String {
        realtime_url(endpoints, &self.station_id, "spec")
    }

    #[must_use]
    pub fn wave_energy_reading_url(&self, endpoints: &EndpointsConfig) -> String {
        realtime_url(endpoints, &self.station_id, "data_spec")
    }

    #[must_use]
    pub fn directional_wave_reading_url(&self, endpoints: &EndpointsConfig) -> String {
        realtime_url(endpoints, &self.station_id, "swdir")
    }

    /// Point bulletin for the given model run
    #[must_use]
    pub fn wave_forecast_bulletin_url(
        &self,
        endpoints: &EndpointsConfig,
        model_run: DateTime<Utc>,
    ) -> String {
        bulletin_url(endpoints, &self.station_id, model_run)
    }
}

/// Realtime product of a station, `extension` naming the product
#[must_use]
pub fn realtime_url(endpoints: &EndpointsConfig, station_id: &str, extension: &str) -> String {
    format!("{}/data/realtime2/{station_id}.{extension}", endpoints.ndbc_base_url)
}

/// Point bulletin URL for a station id and model run
#[must_use]
pub fn bulletin_url(endpoints: &EndpointsConfig, station_id: &str, model_run: DateTime<Utc>) -> String {
    let date = model_run.format("%Y%m%d");
    let hour = model_run.format("%H");
    format!(
        "{}/pub/data/nccf/com/gfs/prod/gfs.{date}/{hour}/wave/station/bulls.t{hour}z/gfswave.{station_id}.bull",
        endpoints.nomads_base_url
    )
}

/// Derive a display name from a raw catalog name such as
/// `"44097 - Block Island, RI (154)"` or `"Ambrose Light 20 NM SE of NY"`
#[must_use]
pub fn display_name(raw: &str) -> String {
    let mut name: String = if raw.contains('-') {
        raw.split('-')
            .filter(|part| !is_number(part.trim()))
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        raw.to_string()
    };

    if let Some(index) = name.find('(') {
        name.truncate(index);
    }

    if name.contains("NM") {
        name = name
            .split(' ')
            .take_while(|word| !word.contains("NM") && !is_number(word.trim()))
            .collect::<Vec<_>>()
            .join(" ");
    }

    title_case(name.trim())
}

fn is_number(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| c.is_ascii_digit())
}

fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut start_of_word = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if start_of_word {
                result.extend(c.to_uppercase());
            } else {
                result.extend(c.to_lowercase());
            }
            start_of_word = false;
        } else {
            result.push(c);
            start_of_word = true;
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Deserialize)]
struct StationsXml {
    #[serde(rename = "station", default)]
    stations: Vec<StationXml>,
}

#[derive(Debug, Deserialize)]
struct StationXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@lat")]
    lat: String,
    #[serde(rename = "@lon")]
    lon: String,
    #[serde(rename = "@elev")]
    elev: Option<String>,
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@owner", default)]
    owner: String,
    #[serde(rename = "@pgm", default)]
    program: String,
    #[serde(rename = "@type", default)]
    station_type: String,
    #[serde(rename = "@met")]
    met: Option<String>,
    #[serde(rename = "@currents")]
    currents: Option<String>,
    #[serde(rename = "@waterquality")]
    water_quality: Option<String>,
    #[serde(rename = "@dart")]
    dart: Option<String>,
}

fn flag(value: Option<&String>) -> bool {
    value.is_some_and(|v| v.contains('y'))
}

impl StationXml {
    fn to_station(&self) -> Result<Station> {
        let coordinate = |raw: &str, axis: &str| {
            raw.trim().parse::<f64>().map_err(|_| {
                SwellcastError::parse(format!("Invalid {axis} '{raw}' for station {}", self.id))
            })
        };

        let mut location = Location::named(
            coordinate(&self.lat, "latitude")?,
            coordinate(&self.lon, "longitude")?,
            self.name.clone(),
        );
        location.validate()?;
        if let Some(elev) = &self.elev {
            location.altitude = coordinate(elev, "elevation")?;
        }

        let mut station = Station::new(
            self.id.clone(),
            location,
            StationType::from_catalog(&self.station_type),
        );
        station.owner = self.owner.clone();
        station.program = self.program.clone();
        station.active = flag(self.met.as_ref());
        station.currents = flag(self.currents.as_ref());
        station.water_quality = flag(self.water_quality.as_ref());
        station.dart = flag(self.dart.as_ref());
        Ok(station)
    }
}

/// Parsed station catalog
#[derive(Debug, Clone, Default)]
pub struct StationCatalog {
    stations: Vec<Station>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl StationCatalog {
    #[must_use]
    pub fn new(stations: Vec<Station>) -> Self {
        Self {
            stations,
            fetched_at: None,
        }
    }

    /// Parse the catalog XML, skipping stations with bad coordinates
    pub fn parse_xml(xml_content: &str) -> Result<Self> {
        let xml: StationsXml = from_str(xml_content)
            .map_err(|e| SwellcastError::parse(format!("Failed to parse station catalog: {e}")))?;

        let mut stations = Vec::new();
        let mut parse_errors = 0;

        for raw in xml.stations {
            match raw.to_station() {
                Ok(station) => stations.push(station),
                Err(e) => {
                    warn!("Failed to parse station {}: {}", raw.id, e);
                    parse_errors += 1;
                }
            }
        }

        info!(
            "Loaded {} stations from catalog ({} parse errors)",
            stations.len(),
            parse_errors
        );

        if stations.is_empty() && parse_errors > 0 {
            return Err(SwellcastError::parse(
                "No valid stations could be parsed from catalog",
            ));
        }

        Ok(Self::new(stations))
    }

    #[must_use]
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    #[must_use]
    pub fn find_by_id(&self, station_id: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.station_id == station_id)
    }

    /// Stations whose raw or display name contains `needle`, ignoring case
    #[must_use]
    pub fn find_by_name_substring(&self, needle: &str) -> Vec<&Station> {
        let needle = needle.to_lowercase();
        self.stations
            .iter()
            .filter(|s| {
                s.name.to_lowercase().contains(&needle)
                    || s.location
                        .name
                        .as_deref()
                        .is_some_and(|raw| raw.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Up to `count` active stations closest to `location`, nearest first.
    /// Equidistant stations keep catalog order.
    #[must_use]
    pub fn nearest_active_k(
        &self,
        location: &Location,
        count: usize,
        station_type: Option<StationType>,
    ) -> Vec<&Station> {
        let mut candidates: Vec<(f64, &Station)> = self
            .stations
            .iter()
            .filter(|s| s.active)
            .filter(|s| station_type.is_none_or(|t| s.station_type == t))
            .map(|s| (location.distance(&s.location, Units::Metric), s))
            .collect();

        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
        candidates.into_iter().take(count).map(|(_, s)| s).collect()
    }

    #[must_use]
    pub fn nearest_active(
        &self,
        location: &Location,
        station_type: Option<StationType>,
    ) -> Option<&Station> {
        self.nearest_active_k(location, 1, station_type)
            .into_iter()
            .next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<stations created="2024-06-01T21:15:02UTC" count="4">
<station id="44097" lat="40.967" lon="-71.126" elev="0" name="Block Island, RI  (154)" owner="Scripps" pgm="IOOS Partners" type="buoy" met="n" currents="n" waterquality="n" dart="n"/>
<station id="44017" lat="40.693" lon="-72.049" elev="0" name="MONTAUK POINT - 23 NM SSW of Montauk Point, NY" owner="NDBC" pgm="NDBC Meteorological/Ocean" type="buoy" met="y" currents="n" waterquality="n" dart="n"/>
<station id="44025" lat="40.251" lon="-73.164" name="LONG ISLAND - 30 NM SOUTH OF ISLIP, NY" owner="NDBC" pgm="NDBC Meteorological/Ocean" type="buoy" met="y" currents="n" waterquality="n" dart="n"/>
<station id="BUZM3" lat="41.397" lon="-71.033" elev="24.8" name="Buzzards Bay, MA" owner="NDBC" pgm="NDBC Meteorological/Ocean" type="fixed" met="y" currents="n" waterquality="n" dart="n"/>
<station id="BAD01" lat="north" lon="-71.0" name="Broken" owner="x" pgm="x" type="buoy" met="y"/>
</stations>"#;

    #[test]
    fn test_parse_catalog() {
        let catalog = StationCatalog::parse_xml(CATALOG).unwrap();
        assert_eq!(catalog.len(), 4);

        let block_island = catalog.find_by_id("44097").unwrap();
        assert!(!block_island.active);
        assert_eq!(block_island.station_type, StationType::Buoy);
        assert_eq!(block_island.name, "Block Island, Ri");
        assert_eq!(block_island.location.altitude, 0.0);

        let buzzards = catalog.find_by_id("BUZM3").unwrap();
        assert!(buzzards.active);
        assert_eq!(buzzards.station_type, StationType::Fixed);
        assert_eq!(buzzards.location.altitude, 24.8);

        assert!(catalog.find_by_id("nope").is_none());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(
            display_name("MONTAUK POINT - 23 NM SSW of Montauk Point, NY"),
            "Montauk Point"
        );
        assert_eq!(display_name("LONG ISLAND - 30 NM SOUTH OF ISLIP, NY"), "Long Island");
        assert_eq!(display_name("Buzzards Bay, MA"), "Buzzards Bay, Ma");
        assert_eq!(display_name(""), "");
    }

    #[test]
    fn test_name_search() {
        let catalog = StationCatalog::parse_xml(CATALOG).unwrap();
        let matches = catalog.find_by_name_substring("montauk");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].station_id, "44017");
    }

    #[test]
    fn test_nearest_active() {
        let catalog = StationCatalog::parse_xml(CATALOG).unwrap();
        let narragansett = Location::new(41.38, -71.48);

        // 44097 is closest but inactive
        let nearest = catalog.nearest_active(&narragansett, None).unwrap();
        assert_eq!(nearest.station_id, "BUZM3");

        let buoy = catalog
            .nearest_active(&narragansett, Some(StationType::Buoy))
            .unwrap();
        assert_eq!(buoy.station_id, "44017");

        let all = catalog.nearest_active_k(&narragansett, 5, None);
        let ids: Vec<&str> = all.iter().map(|s| s.station_id.as_str()).collect();
        assert_eq!(ids, vec!["BUZM3", "44017", "44025"]);
    }

    #[test]
    fn test_nearest_is_stable_when_farther_station_added() {
        let catalog = StationCatalog::parse_xml(CATALOG).unwrap();
        let query = Location::new(41.0, -71.5);
        let before: Vec<String> = catalog
            .nearest_active_k(&query, 2, None)
            .iter()
            .map(|s| s.station_id.clone())
            .collect();

        let mut stations = catalog.stations().to_vec();
        let mut far = Station::new("FAR01", Location::new(-40.0, 100.0), StationType::Buoy);
        far.active = true;
        stations.insert(0, far);
        let grown = StationCatalog::new(stations);

        let after: Vec<String> = grown
            .nearest_active_k(&query, 2, None)
            .iter()
            .map(|s| s.station_id.clone())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_station_urls() {
        let endpoints = EndpointsConfig::default();
        let station = Station::new("44097", Location::new(40.9, -71.1), StationType::Buoy);
        assert_eq!(
            station.detailed_wave_reading_url(&endpoints),
            "https://www.ndbc.noaa.gov/data/realtime2/44097.spec"
        );
        let run = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 6, 1, 6, 0, 0).unwrap();
        assert_eq!(
            station.wave_forecast_bulletin_url(&endpoints, run),
            "https://nomads.ncep.noaa.gov/pub/data/nccf/com/gfs/prod/gfs.20240601/06/wave/station/bulls.t06z/gfswave.44097.bull"
        );
    }

    #[test]
    fn test_station_type_from_str() {
        assert_eq!("oilrig".parse::<StationType>().unwrap(), StationType::Oilrig);
        assert!("submarine".parse::<StationType>().is_err());
    }
}
