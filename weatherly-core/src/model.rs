use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WeatherError};

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(WeatherError::invalid_input(format!(
                "Latitude {lat} is out of range (-90..90)"
            )));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(WeatherError::invalid_input(format!(
                "Longitude {lon} is out of range (-180..180)"
            )));
        }
        Ok(Self { lat, lon })
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lat: {:.2}, Lon: {:.2}", self.lat, self.lon)
    }
}

/// What the user asked weather for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationReference {
    Name(String),
    Qualified {
        name: String,
        country: String,
        state: Option<String>,
    },
    Coordinates {
        coord: Coord,
        /// Backfilled from a successful current-conditions response.
        id: Option<u64>,
    },
    Id(u64),
}

impl LocationReference {
    /// Free-text city name, e.g. `"London"` or `"Paris, FR"`.
    pub fn name(input: &str) -> Result<Self> {
        Ok(Self::Name(validate_city(input)?))
    }

    pub fn qualified(name: &str, country: &str, state: Option<&str>) -> Result<Self> {
        let state = match state.map(str::trim) {
            Some(s) if !s.is_empty() => Some(validate_city(s)?),
            _ => None,
        };
        Ok(Self::Qualified {
            name: validate_city(name)?,
            country: validate_city(country)?,
            state,
        })
    }

    pub fn coordinates(lat: f64, lon: f64) -> Result<Self> {
        Ok(Self::Coordinates {
            coord: Coord::new(lat, lon)?,
            id: None,
        })
    }

    pub fn id(id: u64) -> Self {
        Self::Id(id)
    }

    /// Attach a provider identifier to a coordinate reference.
    pub fn with_identifier(self, city_id: Option<u64>) -> Self {
        match (self, city_id) {
            (Self::Coordinates { coord, id }, new_id) => Self::Coordinates {
                coord,
                id: new_id.or(id),
            },
            (other, _) => other,
        }
    }

    pub fn identifier(&self) -> Option<u64> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Coordinates { id, .. } => *id,
            _ => None,
        }
    }

    pub fn coord(&self) -> Option<Coord> {
        match self {
            Self::Coordinates { coord, .. } => Some(*coord),
            _ => None,
        }
    }
}

impl fmt::Display for LocationReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Qualified {
                name,
                country,
                state: Some(state),
            } => write!(f, "{name}, {state}, {country}"),
            Self::Qualified { name, country, .. } => write!(f, "{name}, {country}"),
            Self::Coordinates { coord, .. } => write!(f, "{:.4}, {:.4}", coord.lat, coord.lon),
            Self::Id(id) => write!(f, "city #{id}"),
        }
    }
}

/// Letters, whitespace, commas and hyphens only.
fn validate_city(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(WeatherError::invalid_input("Please enter a city name"));
    }
    let allowed = |c: char| c.is_alphabetic() || c.is_whitespace() || c == ',' || c == '-';
    if !trimmed.chars().all(allowed) {
        return Err(WeatherError::invalid_input(
            "City name should contain only letters",
        ));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    /// Metres per second.
    pub speed: f64,
    pub deg: u16,
    pub gust: Option<f64>,
}

/// Instantaneous conditions for a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub city_id: Option<u64>,
    pub name: String,
    pub country: String,
    pub coord: Coord,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub humidity_pct: u8,
    pub pressure_hpa: u32,
    pub visibility_m: Option<u32>,
    pub wind: Wind,
    pub clouds_pct: u8,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub observation_time: DateTime<Utc>,
    /// Seconds east of UTC.
    pub timezone_offset: i32,
    pub icon: String,
    pub description: String,
}

impl CurrentConditions {
    pub fn location_label(&self) -> String {
        if self.country.is_empty() {
            self.name.clone()
        } else {
            format!("{}, {}", self.name, self.country)
        }
    }

    pub fn local_offset(&self) -> FixedOffset {
        offset_or_utc(self.timezone_offset)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub time: DateTime<Utc>,
    pub temperature_c: f64,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub humidity_pct: u8,
    pub pressure_hpa: u32,
    pub wind_speed_mps: f64,
    pub icon: String,
    pub description: String,
}

/// 5-day forecast at 3-hour resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub city_name: String,
    pub country: String,
    pub timezone_offset: i32,
    pub entries: Vec<ForecastEntry>,
}

pub const MAX_FORECAST_DAYS: usize = 5;
const MIDDAY_HOURS: std::ops::RangeInclusive<u32> = 11..=14;

impl Forecast {
    /// One entry per local day: the first one falling between 11:00 and 14:59.
    pub fn daily(&self) -> Vec<ForecastEntry> {
        let offset = offset_or_utc(self.timezone_offset);
        let mut seen = HashSet::new();

        self.entries
            .iter()
            .filter(|entry| {
                let local = entry.time.with_timezone(&offset);
                MIDDAY_HOURS.contains(&local.hour()) && seen.insert(local.date_naive())
            })
            .take(MAX_FORECAST_DAYS)
            .cloned()
            .collect()
    }
}

fn offset_or_utc(secs: i32) -> FixedOffset {
    FixedOffset::east_opt(secs).unwrap_or_else(|| Utc.fix())
}

/// A geocoding candidate offered while the user types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoSuggestion {
    pub name: String,
    pub state: Option<String>,
    pub country: String,
    pub coord: Coord,
}

impl GeoSuggestion {
    pub fn label(&self) -> String {
        match &self.state {
            Some(state) => format!("{}, {}, {}", self.name, state, self.country),
            None => format!("{}, {}", self.name, self.country),
        }
    }

    pub fn to_reference(&self) -> LocationReference {
        LocationReference::Coordinates {
            coord: self.coord,
            id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry_at(ts: i64) -> ForecastEntry {
        ForecastEntry {
            time: Utc.timestamp_opt(ts, 0).single().expect("valid timestamp"),
            temperature_c: 10.0,
            temp_min_c: 8.0,
            temp_max_c: 12.0,
            humidity_pct: 70,
            pressure_hpa: 1012,
            wind_speed_mps: 3.0,
            icon: "04d".into(),
            description: "broken clouds".into(),
        }
    }

    fn three_hourly(start: i64, count: i64, offset: i32) -> Forecast {
        Forecast {
            city_name: "London".into(),
            country: "GB".into(),
            timezone_offset: offset,
            entries: (0..count).map(|i| entry_at(start + i * 3 * 3600)).collect(),
        }
    }

    #[test]
    fn name_is_trimmed_and_validated() {
        assert_eq!(
            LocationReference::name("  New York ").unwrap(),
            LocationReference::Name("New York".into())
        );
        assert!(LocationReference::name("Saint-Étienne, FR").is_ok());
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = LocationReference::name("   ").unwrap_err();
        assert!(matches!(err, WeatherError::InvalidInput(_)));
        assert_eq!(err.to_string(), "Please enter a city name");
    }

    #[test]
    fn digits_in_name_are_rejected() {
        let err = LocationReference::name("London1").unwrap_err();
        assert_eq!(err.to_string(), "City name should contain only letters");
    }

    #[test]
    fn coordinates_out_of_range_are_rejected() {
        assert!(LocationReference::coordinates(91.0, 0.0).is_err());
        assert!(LocationReference::coordinates(0.0, -181.0).is_err());
        assert!(LocationReference::coordinates(51.5074, -0.1278).is_ok());
    }

    #[test]
    fn identifier_backfills_only_coordinates() {
        let coords = LocationReference::coordinates(51.5074, -0.1278)
            .unwrap()
            .with_identifier(Some(2643743));
        assert_eq!(coords.identifier(), Some(2643743));

        let name = LocationReference::Name("London".into()).with_identifier(Some(2643743));
        assert_eq!(name, LocationReference::Name("London".into()));
    }

    #[test]
    fn backfill_keeps_existing_identifier_when_response_has_none() {
        let coords = LocationReference::Coordinates {
            coord: Coord { lat: 1.0, lon: 2.0 },
            id: Some(7),
        }
        .with_identifier(None);
        assert_eq!(coords.identifier(), Some(7));
    }

    #[test]
    fn daily_picks_first_midday_entry_per_day() {
        // 2024-01-01T00:00:00Z, 40 entries = 5 days
        let forecast = three_hourly(1_704_067_200, 40, 0);
        let daily = forecast.daily();

        assert_eq!(daily.len(), 5);
        for entry in &daily {
            assert_eq!(entry.time.hour(), 12);
        }
        let days: HashSet<_> = daily.iter().map(|e| e.time.date_naive()).collect();
        assert_eq!(days.len(), 5);
    }

    #[test]
    fn daily_is_capped_at_five_days() {
        let forecast = three_hourly(1_704_067_200, 56, 0);
        assert_eq!(forecast.daily().len(), MAX_FORECAST_DAYS);
    }

    #[test]
    fn daily_uses_location_timezone() {
        // UTC+2: 09:00Z is 11:00 local and gets picked before 12:00Z.
        let forecast = three_hourly(1_704_067_200, 16, 2 * 3600);
        let daily = forecast.daily();

        assert_eq!(daily[0].time.hour(), 9);
        assert_eq!(daily.len(), 2);
    }

    #[test]
    fn suggestion_label_includes_state_when_present() {
        let s = GeoSuggestion {
            name: "Portland".into(),
            state: Some("Oregon".into()),
            country: "US".into(),
            coord: Coord { lat: 45.5, lon: -122.6 },
        };
        assert_eq!(s.label(), "Portland, Oregon, US");
        assert_eq!(s.to_reference().coord(), Some(s.coord));
    }
}
